//! Typed failures for each pipeline stage.
//!
//! Adapters raise their own stage error; the orchestrator wraps whichever one
//! occurred in [`TurnError`], which keeps the originating stage for logs while
//! callers see a single degraded-mode outcome.

use std::fmt;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TranscriptionError {
    #[error("transcription provider is not configured (missing API key)")]
    Unconfigured,

    #[error("transcription request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("transcription provider returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("transcription failed: {0}")]
    Provider(String),

    #[error("transcription failed: no speech detected")]
    NoSpeech,

    #[error("transcription provider sent an unexpected response: {0}")]
    InvalidResponse(String),

    #[error("transcription timed out after {0:?}")]
    Timeout(Duration),
}

#[derive(Debug, Error)]
pub enum ConversationError {
    #[error("language model is not configured (missing API key)")]
    Unconfigured,

    #[error("language model request failed: {0}")]
    Provider(#[source] anyhow::Error),

    #[error("language model returned an empty reply")]
    EmptyReply,

    #[error("language model timed out after {0:?}")]
    Timeout(Duration),

    #[error("session store failure: {0}")]
    Store(#[from] SessionStoreError),

    #[error("session history changed concurrently; update discarded")]
    Conflict,
}

#[derive(Debug, Error)]
pub enum SynthesisError {
    #[error("speech synthesis provider is not configured (missing API key)")]
    Unconfigured,

    #[error("speech synthesis request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("speech synthesis provider returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("speech synthesis response did not include an audio file")]
    MissingAudioUrl,

    #[error("speech synthesis timed out after {0:?}")]
    Timeout(Duration),
}

#[derive(Debug, Error)]
pub enum SessionStoreError {
    #[error("session store backend error: {0}")]
    Backend(String),
}

/// The pipeline stage a failure originated from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Transcription,
    Conversation,
    Synthesis,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Transcription => write!(f, "transcription"),
            Stage::Conversation => write!(f, "conversation"),
            Stage::Synthesis => write!(f, "synthesis"),
        }
    }
}

/// Any failure of a single turn, tagged by stage.
#[derive(Debug, Error)]
pub enum TurnError {
    #[error(transparent)]
    Transcription(#[from] TranscriptionError),

    #[error(transparent)]
    Conversation(#[from] ConversationError),

    #[error(transparent)]
    Synthesis(#[from] SynthesisError),
}

impl TurnError {
    pub fn stage(&self) -> Stage {
        match self {
            TurnError::Transcription(_) => Stage::Transcription,
            TurnError::Conversation(_) => Stage::Conversation,
            TurnError::Synthesis(_) => Stage::Synthesis,
        }
    }
}
