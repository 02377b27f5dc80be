use std::fmt;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use tracing::Level;
use voxrelay_core::{
    llm_client::{ChatModelConfig, DEFAULT_CHAT_MODEL, GEMINI_OPENAI_API_BASE},
    synthesis::{DEFAULT_MURF_VOICE, MURF_API_BASE, MurfConfig},
    transcription::{ASSEMBLYAI_API_BASE, AssemblyAiConfig},
};

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Holds all configuration loaded from the environment at startup.
///
/// Provider credentials are optional: a missing key still yields a working
/// server whose turns touching that provider degrade to the fallback audio.
#[derive(Clone)]
pub struct Config {
    pub bind_address: SocketAddr,
    pub assemblyai_api_key: Option<String>,
    pub gemini_api_key: Option<String>,
    pub murf_api_key: Option<String>,
    pub assemblyai_base_url: String,
    pub gemini_base_url: String,
    pub murf_base_url: String,
    pub chat_model: String,
    pub system_prompt: Option<String>,
    pub murf_voice_id: String,
    pub provider_timeout: Duration,
    pub transcript_poll_interval: Duration,
    pub max_upload_bytes: usize,
    pub fallback_audio_path: PathBuf,
    pub static_dir: PathBuf,
    pub index_page: PathBuf,
    pub log_level: Level,
}

fn redact(key: &Option<String>) -> &'static str {
    if key.is_some() {
        "[REDACTED]"
    } else {
        "<unset>"
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("bind_address", &self.bind_address)
            .field("assemblyai_api_key", &redact(&self.assemblyai_api_key))
            .field("gemini_api_key", &redact(&self.gemini_api_key))
            .field("murf_api_key", &redact(&self.murf_api_key))
            .field("assemblyai_base_url", &self.assemblyai_base_url)
            .field("gemini_base_url", &self.gemini_base_url)
            .field("murf_base_url", &self.murf_base_url)
            .field("chat_model", &self.chat_model)
            .field("murf_voice_id", &self.murf_voice_id)
            .field("provider_timeout", &self.provider_timeout)
            .field("fallback_audio_path", &self.fallback_audio_path)
            .field("log_level", &self.log_level)
            .finish_non_exhaustive()
    }
}

fn var_or(name: &str, default: &str) -> String {
    std::env::var(name).unwrap_or_else(|_| default.to_string())
}

/// Reads an optional variable, treating an empty value as unset.
fn optional_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

/// Parses a positive integer variable, falling back to `default` when unset.
fn positive_var<T>(name: &str, default: T) -> Result<T, ConfigError>
where
    T: FromStr + PartialOrd + Default,
{
    match std::env::var(name) {
        Err(_) => Ok(default),
        Ok(raw) => match raw.trim().parse::<T>() {
            Ok(value) if value > T::default() => Ok(value),
            _ => Err(ConfigError::InvalidValue(
                name.to_string(),
                format!("'{}' is not a positive integer", raw),
            )),
        },
    }
}

impl Config {
    /// Loads configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Only load from .env in non-test mode to avoid contamination
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }

        let bind_address_str = var_or("BIND_ADDRESS", "0.0.0.0:3000");
        let bind_address = bind_address_str
            .parse::<SocketAddr>()
            .map_err(|e| ConfigError::InvalidValue("BIND_ADDRESS".to_string(), e.to_string()))?;

        let provider_timeout = Duration::from_secs(positive_var("PROVIDER_TIMEOUT_SECS", 30u64)?);
        let transcript_poll_interval =
            Duration::from_millis(positive_var("TRANSCRIPT_POLL_MS", 1000u64)?);
        let max_upload_bytes = positive_var("MAX_UPLOAD_BYTES", 25 * 1024 * 1024usize)?;

        let log_level_str = var_or("RUST_LOG", "INFO");
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        Ok(Self {
            bind_address,
            assemblyai_api_key: optional_var("ASSEMBLYAI_API_KEY"),
            gemini_api_key: optional_var("GEMINI_API_KEY"),
            murf_api_key: optional_var("MURF_API_KEY"),
            assemblyai_base_url: var_or("ASSEMBLYAI_BASE_URL", ASSEMBLYAI_API_BASE),
            gemini_base_url: var_or("GEMINI_BASE_URL", GEMINI_OPENAI_API_BASE),
            murf_base_url: var_or("MURF_BASE_URL", MURF_API_BASE),
            chat_model: var_or("CHAT_MODEL", DEFAULT_CHAT_MODEL),
            system_prompt: optional_var("SYSTEM_PROMPT"),
            murf_voice_id: var_or("MURF_VOICE_ID", DEFAULT_MURF_VOICE),
            provider_timeout,
            transcript_poll_interval,
            max_upload_bytes,
            fallback_audio_path: PathBuf::from(var_or("FALLBACK_AUDIO_PATH", "static/fallback.mp3")),
            static_dir: PathBuf::from(var_or("STATIC_DIR", "static")),
            index_page: PathBuf::from(var_or("INDEX_PAGE", "templates/index.html")),
            log_level,
        })
    }

    pub fn assemblyai_config(&self) -> AssemblyAiConfig {
        AssemblyAiConfig {
            api_key: self.assemblyai_api_key.clone(),
            base_url: self.assemblyai_base_url.clone(),
            timeout: self.provider_timeout,
            poll_interval: self.transcript_poll_interval,
        }
    }

    pub fn chat_model_config(&self) -> ChatModelConfig {
        ChatModelConfig {
            api_key: self.gemini_api_key.clone(),
            api_base: self.gemini_base_url.clone(),
            model: self.chat_model.clone(),
            system_prompt: self.system_prompt.clone(),
            timeout: self.provider_timeout,
        }
    }

    pub fn murf_config(&self) -> MurfConfig {
        MurfConfig {
            api_key: self.murf_api_key.clone(),
            base_url: self.murf_base_url.clone(),
            voice_id: self.murf_voice_id.clone(),
            timeout: self.provider_timeout,
        }
    }
}
