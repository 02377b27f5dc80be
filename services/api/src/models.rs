//! API Models
//!
//! Wire shapes of the chat endpoint, annotated for OpenAPI generation with
//! `utoipa`.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use voxrelay_core::TurnResult;

/// Body of a completed turn.
#[derive(Serialize, Deserialize, ToSchema, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ChatResponse {
    #[schema(example = "https://cdn.example/audio123.mp3")]
    pub audio_url: String,
    #[schema(example = "I don't have real-time weather access.")]
    pub text: String,
}

impl From<TurnResult> for ChatResponse {
    fn from(result: TurnResult) -> Self {
        Self {
            audio_url: result.audio_url,
            text: result.text,
        }
    }
}

/// Multipart form accepted by the chat endpoint. Only used for documentation.
#[derive(ToSchema)]
pub struct ChatUpload {
    /// The recorded utterance.
    #[schema(value_type = String, format = Binary)]
    pub audio_file: Vec<u8>,
}

#[derive(Serialize, ToSchema)]
pub struct ErrorResponse {
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chat_response_uses_camel_case() {
        let response = ChatResponse::from(TurnResult {
            audio_url: "https://cdn.example/audio123.mp3".to_string(),
            text: "I don't have real-time weather access.".to_string(),
        });

        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "audioUrl": "https://cdn.example/audio123.mp3",
                "text": "I don't have real-time weather access."
            })
        );
    }

    #[test]
    fn test_chat_response_rejects_snake_case_field() {
        let json = r#"{"audio_url": "x", "text": "y"}"#;
        let result: Result<ChatResponse, _> = serde_json::from_str(json);
        assert!(result.is_err());
    }

    #[test]
    fn test_error_response_serialization() {
        let error = ErrorResponse {
            message: "audio_file part is required".to_string(),
        };

        let json = serde_json::to_string(&error).unwrap();
        assert_eq!(json, r#"{"message":"audio_file part is required"}"#);
    }
}
