use crate::{
    error::ConversationError,
    turn::{Role, Turn},
};
use async_openai::{
    Client,
    config::OpenAIConfig,
    error::OpenAIError,
    types::{
        ChatCompletionRequestAssistantMessageArgs, ChatCompletionRequestMessage,
        ChatCompletionRequestSystemMessageArgs, ChatCompletionRequestUserMessageArgs,
        CreateChatCompletionRequestArgs, CreateChatCompletionResponse,
    },
};
use async_trait::async_trait;
use std::time::Duration;
use tracing::debug;

/// Gemini's OpenAI-compatible endpoint.
pub const GEMINI_OPENAI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/openai";
pub const DEFAULT_CHAT_MODEL: &str = "gemini-1.5-flash";

/// A generic client for interacting with an LLM.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LLMClient: Send + Sync {
    /// Makes a single, non-streaming call with the prior turns as context and
    /// returns the assistant's reply text.
    async fn reply(&self, history: &[Turn], user_text: &str) -> Result<String, ConversationError>;
}

/// Settings for [`OpenAICompatibleClient`].
#[derive(Clone, Debug)]
pub struct ChatModelConfig {
    pub api_key: Option<String>,
    pub api_base: String,
    pub model: String,
    pub system_prompt: Option<String>,
    pub timeout: Duration,
}

impl Default for ChatModelConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_base: GEMINI_OPENAI_API_BASE.to_string(),
            model: DEFAULT_CHAT_MODEL.to_string(),
            system_prompt: None,
            timeout: Duration::from_secs(30),
        }
    }
}

/// An implementation of `LLMClient` for any OpenAI-compatible API.
///
/// Built without an API key it stays usable but every call fails with
/// [`ConversationError::Unconfigured`] before touching the network.
pub struct OpenAICompatibleClient {
    client: Option<Client<OpenAIConfig>>,
    model: String,
    system_prompt: Option<String>,
    timeout: Duration,
}

impl OpenAICompatibleClient {
    /// Creates a new client for an OpenAI-compatible service.
    pub fn new(config: ChatModelConfig) -> Self {
        let ChatModelConfig {
            api_key,
            api_base,
            model,
            system_prompt,
            timeout,
        } = config;
        let client = api_key.map(|key| {
            Client::with_config(
                OpenAIConfig::new()
                    .with_api_key(key)
                    .with_api_base(api_base),
            )
        });
        Self {
            client,
            model,
            system_prompt,
            timeout,
        }
    }

    pub fn is_configured(&self) -> bool {
        self.client.is_some()
    }

    /// Builds the request messages: optional system prompt, the prior turns in
    /// order, then the new user utterance.
    fn build_messages(
        &self,
        history: &[Turn],
        user_text: &str,
    ) -> Result<Vec<ChatCompletionRequestMessage>, OpenAIError> {
        let mut messages = Vec::with_capacity(history.len() + 2);
        if let Some(prompt) = &self.system_prompt {
            messages.push(
                ChatCompletionRequestSystemMessageArgs::default()
                    .content(prompt.clone())
                    .build()?
                    .into(),
            );
        }
        for turn in history {
            match turn.role {
                Role::User => messages.push(
                    ChatCompletionRequestUserMessageArgs::default()
                        .content(turn.content.clone())
                        .build()?
                        .into(),
                ),
                Role::Assistant => messages.push(
                    ChatCompletionRequestAssistantMessageArgs::default()
                        .content(turn.content.clone())
                        .build()?
                        .into(),
                ),
            };
        }
        messages.push(
            ChatCompletionRequestUserMessageArgs::default()
                .content(user_text.to_string())
                .build()?
                .into(),
        );
        Ok(messages)
    }
}

fn provider_error(err: OpenAIError) -> ConversationError {
    ConversationError::Provider(err.into())
}

#[async_trait]
impl LLMClient for OpenAICompatibleClient {
    async fn reply(&self, history: &[Turn], user_text: &str) -> Result<String, ConversationError> {
        let client = self.client.as_ref().ok_or(ConversationError::Unconfigured)?;

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages(self.build_messages(history, user_text).map_err(provider_error)?)
            .build()
            .map_err(provider_error)?;

        debug!(model = %self.model, prior_turns = history.len(), "Sending chat completion request");
        let response: CreateChatCompletionResponse =
            tokio::time::timeout(self.timeout, client.chat().create(request))
                .await
                .map_err(|_| ConversationError::Timeout(self.timeout))?
                .map_err(provider_error)?;

        response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|text| !text.trim().is_empty())
            .ok_or(ConversationError::EmptyReply)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_string_contains, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer, system_prompt: Option<&str>) -> OpenAICompatibleClient {
        OpenAICompatibleClient::new(ChatModelConfig {
            api_key: Some("test-key".to_string()),
            api_base: server.uri(),
            model: "gemini-test".to_string(),
            system_prompt: system_prompt.map(str::to_string),
            timeout: Duration::from_secs(5),
        })
    }

    fn completion(content: Option<&str>) -> serde_json::Value {
        json!({
            "id": "chatcmpl-1",
            "object": "chat.completion",
            "created": 1_700_000_000,
            "model": "gemini-test",
            "choices": [{
                "index": 0,
                "message": { "role": "assistant", "content": content },
                "finish_reason": "stop"
            }]
        })
    }

    #[tokio::test]
    async fn test_reply_sends_history_and_returns_text() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(header("authorization", "Bearer test-key"))
            .and(body_string_contains("Earlier question"))
            .and(body_string_contains("Earlier answer"))
            .and(body_string_contains("What is the weather today?"))
            .and(body_string_contains("\"role\":\"system\""))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(completion(Some("I don't have real-time weather access."))),
            )
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server, Some("Be brief."));
        let history = vec![Turn::user("Earlier question"), Turn::assistant("Earlier answer")];
        let reply = client
            .reply(&history, "What is the weather today?")
            .await
            .expect("reply should succeed");

        assert_eq!(reply, "I don't have real-time weather access.");
    }

    #[tokio::test]
    async fn test_reply_without_content_is_empty_reply() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(completion(None)))
            .mount(&server)
            .await;

        let err = client_for(&server, None)
            .reply(&[], "hello")
            .await
            .unwrap_err();
        assert!(matches!(err, ConversationError::EmptyReply));
    }

    #[tokio::test]
    async fn test_reply_client_error_is_provider_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "error": {
                    "message": "API key not valid",
                    "type": "invalid_request_error",
                    "param": null,
                    "code": null
                }
            })))
            .mount(&server)
            .await;

        let err = client_for(&server, None)
            .reply(&[], "hello")
            .await
            .unwrap_err();
        assert!(matches!(err, ConversationError::Provider(_)));
    }

    #[tokio::test]
    async fn test_unreachable_provider_is_provider_error() {
        let client = OpenAICompatibleClient::new(ChatModelConfig {
            api_key: Some("test-key".to_string()),
            api_base: "http://127.0.0.1:9".to_string(),
            ..ChatModelConfig::default()
        });

        let err = client.reply(&[], "hello").await.unwrap_err();
        assert!(matches!(err, ConversationError::Provider(_)));
    }

    #[tokio::test]
    async fn test_slow_provider_times_out() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(completion(Some("too late")))
                    .set_delay(Duration::from_secs(3)),
            )
            .mount(&server)
            .await;

        let client = OpenAICompatibleClient::new(ChatModelConfig {
            api_key: Some("test-key".to_string()),
            api_base: server.uri(),
            timeout: Duration::from_millis(200),
            ..ChatModelConfig::default()
        });
        let err = client.reply(&[], "hello").await.unwrap_err();
        assert!(matches!(err, ConversationError::Timeout(t) if t == Duration::from_millis(200)));
    }

    #[tokio::test]
    async fn test_unconfigured_client_fails_fast() {
        let client = OpenAICompatibleClient::new(ChatModelConfig::default());
        assert!(!client.is_configured());

        let err = client.reply(&[], "hello").await.unwrap_err();
        assert!(matches!(err, ConversationError::Unconfigured));
    }
}
