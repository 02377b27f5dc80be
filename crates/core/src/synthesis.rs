//! Speech Synthesis Adapter backed by Murf's `speech/generate` endpoint.

use crate::error::SynthesisError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

pub const MURF_API_BASE: &str = "https://api.murf.ai";
pub const DEFAULT_MURF_VOICE: &str = "en-US-natalie";

/// Text-to-speech seam used by the orchestrator.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    /// Renders `text` and returns a URL where the audio can be fetched.
    async fn synthesize(&self, text: &str) -> Result<String, SynthesisError>;
}

#[derive(Clone, Debug)]
pub struct MurfConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    pub voice_id: String,
    pub timeout: Duration,
}

impl Default for MurfConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: MURF_API_BASE.to_string(),
            voice_id: DEFAULT_MURF_VOICE.to_string(),
            timeout: Duration::from_secs(30),
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateSpeechRequest<'a> {
    text: &'a str,
    voice_id: &'a str,
    format: &'static str,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateSpeechResponse {
    audio_file: Option<String>,
}

pub struct MurfSynthesizer {
    http: reqwest::Client,
    config: MurfConfig,
}

impl MurfSynthesizer {
    pub fn new(config: MurfConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            config,
        }
    }

    pub fn is_configured(&self) -> bool {
        self.config.api_key.is_some()
    }

    async fn generate(&self, api_key: &str, text: &str) -> Result<String, SynthesisError> {
        let url = format!(
            "{}/v1/speech/generate",
            self.config.base_url.trim_end_matches('/')
        );
        let response = self
            .http
            .post(url)
            .header("api-key", api_key)
            .json(&GenerateSpeechRequest {
                text,
                voice_id: &self.config.voice_id,
                format: "mp3",
            })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SynthesisError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let payload: GenerateSpeechResponse = response.json().await?;
        payload
            .audio_file
            .filter(|url| !url.is_empty())
            .ok_or(SynthesisError::MissingAudioUrl)
    }
}

#[async_trait]
impl SpeechSynthesizer for MurfSynthesizer {
    async fn synthesize(&self, text: &str) -> Result<String, SynthesisError> {
        let api_key = self
            .config
            .api_key
            .as_deref()
            .ok_or(SynthesisError::Unconfigured)?;

        debug!(voice = %self.config.voice_id, chars = text.len(), "Requesting speech synthesis");
        tokio::time::timeout(self.config.timeout, self.generate(api_key, text))
            .await
            .map_err(|_| SynthesisError::Timeout(self.config.timeout))?
    }
}
