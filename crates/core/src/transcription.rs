//! Transcription Adapter
//!
//! Converts a raw audio payload into text through AssemblyAI's REST API:
//! upload the bytes, submit a transcript job, then poll until the job
//! settles. The whole exchange is bounded by one deadline and never retried.

use crate::error::TranscriptionError;
use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{RequestBuilder, header::AUTHORIZATION};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use std::time::Duration;
use tracing::debug;

pub const ASSEMBLYAI_API_BASE: &str = "https://api.assemblyai.com";

/// Speech-to-text seam used by the orchestrator.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Transcriber: Send + Sync {
    /// Returns the best non-empty transcription of `audio`.
    async fn transcribe(&self, audio: Bytes) -> Result<String, TranscriptionError>;
}

#[derive(Clone, Debug)]
pub struct AssemblyAiConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    /// Upper bound for upload, submission and polling combined.
    pub timeout: Duration,
    pub poll_interval: Duration,
}

impl Default for AssemblyAiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: ASSEMBLYAI_API_BASE.to_string(),
            timeout: Duration::from_secs(30),
            poll_interval: Duration::from_secs(1),
        }
    }
}

#[derive(Deserialize)]
struct UploadResponse {
    upload_url: String,
}

#[derive(Serialize)]
struct TranscriptRequest<'a> {
    audio_url: &'a str,
}

#[derive(Deserialize, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
enum TranscriptStatus {
    Queued,
    Processing,
    Completed,
    Error,
    #[serde(other)]
    Unknown,
}

#[derive(Deserialize, Debug)]
struct TranscriptResponse {
    id: String,
    status: TranscriptStatus,
    text: Option<String>,
    error: Option<String>,
}

pub struct AssemblyAiTranscriber {
    http: reqwest::Client,
    config: AssemblyAiConfig,
}

impl AssemblyAiTranscriber {
    pub fn new(config: AssemblyAiConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            config,
        }
    }

    pub fn is_configured(&self) -> bool {
        self.config.api_key.is_some()
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url.trim_end_matches('/'), path)
    }

    async fn send<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
    ) -> Result<T, TranscriptionError> {
        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(TranscriptionError::Status {
                status: status.as_u16(),
                body,
            });
        }
        response
            .json::<T>()
            .await
            .map_err(|e| TranscriptionError::InvalidResponse(e.to_string()))
    }

    async fn run(&self, api_key: &str, audio: Bytes) -> Result<String, TranscriptionError> {
        let upload: UploadResponse = self
            .send(
                self.http
                    .post(self.url("/v2/upload"))
                    .header(AUTHORIZATION, api_key)
                    .body(audio),
            )
            .await?;

        let mut transcript: TranscriptResponse = self
            .send(
                self.http
                    .post(self.url("/v2/transcript"))
                    .header(AUTHORIZATION, api_key)
                    .json(&TranscriptRequest {
                        audio_url: &upload.upload_url,
                    }),
            )
            .await?;

        loop {
            match transcript.status {
                TranscriptStatus::Completed => {
                    return transcript
                        .text
                        .map(|text| text.trim().to_string())
                        .filter(|text| !text.is_empty())
                        .ok_or(TranscriptionError::NoSpeech);
                }
                TranscriptStatus::Error => {
                    return Err(TranscriptionError::Provider(
                        transcript
                            .error
                            .unwrap_or_else(|| "unknown provider error".to_string()),
                    ));
                }
                TranscriptStatus::Queued
                | TranscriptStatus::Processing
                | TranscriptStatus::Unknown => {
                    debug!(transcript_id = %transcript.id, status = ?transcript.status, "Transcript not ready");
                }
            }

            tokio::time::sleep(self.config.poll_interval).await;
            transcript = self
                .send(
                    self.http
                        .get(self.url(&format!("/v2/transcript/{}", transcript.id)))
                        .header(AUTHORIZATION, api_key),
                )
                .await?;
        }
    }
}

#[async_trait]
impl Transcriber for AssemblyAiTranscriber {
    async fn transcribe(&self, audio: Bytes) -> Result<String, TranscriptionError> {
        let api_key = self
            .config
            .api_key
            .as_deref()
            .ok_or(TranscriptionError::Unconfigured)?;

        tokio::time::timeout(self.config.timeout, self.run(api_key, audio))
            .await
            .map_err(|_| TranscriptionError::Timeout(self.config.timeout))?
    }
}
