//! Turn Orchestrator
//!
//! Runs transcription, conversation and synthesis strictly in sequence for a
//! single request. The first failing stage ends the turn; the error keeps its
//! stage for the logs, and the HTTP layer answers every failure the same way.
//!
//! A synthesis failure happens after the conversation stage has already
//! committed the new turns, so that session's history keeps them even though
//! the caller receives the fallback.

use crate::{
    conversation::ConversationAdapter,
    error::TurnError,
    synthesis::SpeechSynthesizer,
    transcription::Transcriber,
    turn::{SessionId, TurnResult},
};
use bytes::Bytes;
use std::sync::Arc;
use tracing::{error, info, instrument};

pub struct TurnOrchestrator {
    transcriber: Arc<dyn Transcriber>,
    conversation: ConversationAdapter,
    synthesizer: Arc<dyn SpeechSynthesizer>,
}

impl TurnOrchestrator {
    pub fn new(
        transcriber: Arc<dyn Transcriber>,
        conversation: ConversationAdapter,
        synthesizer: Arc<dyn SpeechSynthesizer>,
    ) -> Self {
        Self {
            transcriber,
            conversation,
            synthesizer,
        }
    }

    /// Executes one conversational turn for `session_id`.
    #[instrument(name = "turn", skip_all, fields(session_id = %session_id))]
    pub async fn run_turn(
        &self,
        session_id: &SessionId,
        audio: Bytes,
    ) -> Result<TurnResult, TurnError> {
        let outcome = self.execute(session_id, audio).await;
        if let Err(err) = &outcome {
            error!(stage = %err.stage(), error = %err, "Turn failed");
        }
        outcome
    }

    async fn execute(&self, session_id: &SessionId, audio: Bytes) -> Result<TurnResult, TurnError> {
        info!(audio_bytes = audio.len(), "Transcribing audio...");
        let user_text = self.transcriber.transcribe(audio).await?;
        info!(user_text = %user_text, "User said");

        info!("Getting LLM response...");
        let reply = self.conversation.converse(session_id, &user_text).await?;
        info!(reply = %reply, "LLM responded");

        info!("Converting text to speech...");
        let audio_url = self.synthesizer.synthesize(&reply).await?;
        info!(audio_url = %audio_url, "Turn complete");

        Ok(TurnResult {
            audio_url,
            text: reply,
        })
    }
}
