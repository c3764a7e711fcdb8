use async_trait::async_trait;
use reqwest::StatusCode;
use serde_json::{json, Value};

use super::base::{Provider, Usage};
use super::client::CredentialedClient;
use super::configs::OpenAiProviderConfig;
use super::utils::check_context_length_error;
use super::variant::ApiVariant;
use crate::errors::{ProviderError, ProviderResult};
use crate::interrupt::InterruptSignal;
use crate::models::message::Message;
use crate::models::tool::Tool;

/// Transport provider for the OpenAI-compatible protocols. The variant
/// selector picks chat vs structured-response per call from the configured
/// model id; everything wire-shaped comes from the pure compile/parse
/// functions.
pub struct OpenAiProvider {
    client: CredentialedClient,
    config: OpenAiProviderConfig,
}

impl OpenAiProvider {
    pub fn new(config: OpenAiProviderConfig) -> Self {
        Self {
            client: CredentialedClient::new(),
            config,
        }
    }

    pub fn from_env() -> anyhow::Result<Self> {
        Ok(Self::new(OpenAiProviderConfig::from_env()?))
    }

    async fn post(
        &self,
        path: &str,
        payload: Value,
        interrupt: Option<&InterruptSignal>,
    ) -> ProviderResult<Value> {
        let url = format!("{}{}", self.config.host.trim_end_matches('/'), path);

        let client = self.client.for_credential(&self.config.api_key)?;
        let request = client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.config.api_key))
            .json(&payload)
            .send();

        let response = match interrupt {
            Some(signal) => tokio::select! {
                _ = signal.interrupted() => return Err(ProviderError::Interrupted),
                result = request => result?,
            },
            None => request.await?,
        };

        match response.status() {
            StatusCode::OK => Ok(response.json().await?),
            status if status == StatusCode::TOO_MANY_REQUESTS || status.as_u16() >= 500 => {
                Err(ProviderError::Api(format!("Server error: {}", status)))
            }
            status => {
                let body = response.text().await.unwrap_or_default();
                Err(ProviderError::Api(format!(
                    "Request failed: {} - {}",
                    status, body
                )))
            }
        }
    }
}

#[async_trait]
impl Provider for OpenAiProvider {
    async fn complete(
        &self,
        system: &str,
        messages: &[Message],
        tools: &[Tool],
        interrupt: Option<&InterruptSignal>,
    ) -> ProviderResult<(Message, Usage)> {
        let variant = ApiVariant::detect(&self.config.model);
        let mut payload = variant.build_request(
            &self.config.model,
            system,
            messages,
            tools,
            !tools.is_empty(),
        );

        // Config-level overrides on top of the compiled defaults
        if let Some(temperature) = self.config.temperature {
            payload["temperature"] = json!(temperature);
        }
        if let Some(max_tokens) = self.config.max_tokens {
            let key = match variant {
                ApiVariant::Chat => "max_tokens",
                ApiVariant::Responses => "max_output_tokens",
            };
            payload[key] = json!(max_tokens);
        }

        let response = self
            .post(variant.endpoint_path(), payload, interrupt)
            .await?;

        if let Some(error) = response.get("error") {
            if let Some(err) = check_context_length_error(error) {
                return Err(err);
            }
            return Err(ProviderError::Api(error.to_string()));
        }

        let (blocks, usage) = variant.parse_response(&response);
        let mut message = Message::assistant();
        message.content = blocks;
        Ok((message, usage))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn provider_for(mock_server: &MockServer, model: &str) -> OpenAiProvider {
        OpenAiProvider::new(OpenAiProviderConfig {
            host: mock_server.uri(),
            api_key: "test_api_key".to_string(),
            model: model.to_string(),
            temperature: None,
            max_tokens: None,
        })
    }

    #[tokio::test]
    async fn test_complete_chat_basic() -> Result<()> {
        let response_body = json!({
            "id": "chatcmpl-123",
            "object": "chat.completion",
            "choices": [{
                "index": 0,
                "message": {
                    "role": "assistant",
                    "content": "Hello! How can I assist you today?",
                    "tool_calls": null
                },
                "finish_reason": "stop"
            }],
            "usage": {
                "prompt_tokens": 12,
                "completion_tokens": 15,
                "total_tokens": 27
            }
        });

        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(response_body))
            .mount(&mock_server)
            .await;

        let provider = provider_for(&mock_server, "gpt-4o");
        let messages = vec![Message::user().with_text("Hello?")];
        let (message, usage) = provider
            .complete("You are a helpful assistant.", &messages, &[], None)
            .await?;

        assert_eq!(message.content[0].as_text(), Some("Hello! How can I assist you today?"));
        assert_eq!(usage.input_tokens, Some(12));
        assert_eq!(usage.output_tokens, Some(15));
        assert_eq!(usage.total_tokens, Some(27));
        Ok(())
    }

    #[tokio::test]
    async fn test_complete_chat_tool_use() -> Result<()> {
        let response_body = json!({
            "choices": [{
                "index": 0,
                "message": {
                    "role": "assistant",
                    "content": null,
                    "tool_calls": [{
                        "id": "call_123",
                        "type": "function",
                        "function": {
                            "name": "screenshot",
                            "arguments": "{\"display\":0}"
                        }
                    }]
                },
                "finish_reason": "tool_calls"
            }],
            "usage": {
                "prompt_tokens": 20,
                "completion_tokens": 15,
                "total_tokens": 35
            }
        });

        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(response_body))
            .mount(&mock_server)
            .await;

        let provider = provider_for(&mock_server, "gpt-4o");
        let tool = Tool::new(
            "screenshot",
            "Take a screenshot of the display",
            json!({
                "type": "object",
                "properties": {
                    "display": { "type": "integer", "description": "Display index" }
                },
                "required": ["display"]
            }),
        );

        let messages = vec![Message::user().with_text("What's on screen?")];
        let (message, _) = provider
            .complete("You are an agent.", &messages, &[tool], None)
            .await?;

        let tool_use = message.content[0].as_tool_use().unwrap();
        assert_eq!(tool_use.id, "call_123");
        assert_eq!(tool_use.name, "screenshot");
        assert_eq!(tool_use.input, json!({"display": 0}));
        Ok(())
    }

    #[tokio::test]
    async fn test_complete_responses_variant_routes_and_parses() -> Result<()> {
        let response_body = json!({
            "output": [
                { "type": "reasoning", "id": "rs_1", "encrypted_content": "opaque" },
                {
                    "type": "message",
                    "role": "assistant",
                    "content": [{ "type": "output_text", "text": "Done." }]
                }
            ],
            "usage": { "input_tokens": 9, "output_tokens": 4, "total_tokens": 13 }
        });

        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/responses"))
            .and(body_partial_json(json!({
                "model": "o3-2025-04-16",
                "store": false,
                "reasoning": { "effort": "medium" }
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(response_body))
            .mount(&mock_server)
            .await;

        let provider = provider_for(&mock_server, "o3-2025-04-16");
        let messages = vec![Message::user().with_text("Go.")];
        let (message, usage) = provider
            .complete("You are an agent.", &messages, &[], None)
            .await?;

        assert_eq!(message.content.len(), 2);
        let thinking = message.content[0].as_thinking().unwrap();
        assert_eq!(thinking.signature, "rs_1");
        assert_eq!(message.content[1].as_text(), Some("Done."));
        assert_eq!(usage.total_tokens, Some(13));
        Ok(())
    }

    #[tokio::test]
    async fn test_context_length_error() -> Result<()> {
        let response_body = json!({
            "error": {
                "code": "context_length_exceeded",
                "message": "This message is too long"
            }
        });

        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(response_body))
            .mount(&mock_server)
            .await;

        let provider = provider_for(&mock_server, "gpt-4o");
        let messages = vec![Message::user().with_text("hi")];
        let result = provider.complete("sys", &messages, &[], None).await;

        assert!(matches!(
            result,
            Err(ProviderError::ContextLengthExceeded(_))
        ));
        Ok(())
    }

    #[tokio::test]
    async fn test_interrupt_surfaces_as_interrupted() -> Result<()> {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"choices": []}))
                    .set_delay(std::time::Duration::from_secs(30)),
            )
            .mount(&mock_server)
            .await;

        let provider = provider_for(&mock_server, "gpt-4o");
        let signal = InterruptSignal::new();
        signal.interrupt();

        let messages = vec![Message::user().with_text("hi")];
        let result = provider
            .complete("sys", &messages, &[], Some(&signal))
            .await;

        assert!(matches!(result, Err(ProviderError::Interrupted)));
        Ok(())
    }
}
