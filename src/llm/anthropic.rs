//! Direct Anthropic Messages API client.

use async_trait::async_trait;
use reqwest::{
    Client,
    header::{CONTENT_TYPE, HeaderMap, HeaderValue},
};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use super::{CompletionRequest, CompletionResponse, LlmProvider, LlmRole};
use crate::error::LlmError;

const DEFAULT_ENDPOINT: &str = "https://api.anthropic.com/v1";
const ANTHROPIC_VERSION: &str = "2023-06-01";

pub struct AnthropicProvider {
    client: Client,
    api_key: SecretString,
    model: String,
    endpoint: String,
}

impl AnthropicProvider {
    pub fn new(api_key: SecretString, model: &str) -> Self {
        Self {
            client: Client::new(),
            api_key,
            model: model.to_string(),
            endpoint: DEFAULT_ENDPOINT.to_string(),
        }
    }

    #[cfg(test)]
    pub fn with_endpoint(mut self, endpoint: &str) -> Self {
        self.endpoint = endpoint.to_string();
        self
    }

    fn api_url(&self, path: &str) -> String {
        format!("{}{}", self.endpoint.trim_end_matches('/'), path)
    }

    fn auth_headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-api-key",
            HeaderValue::from_str(self.api_key.expose_secret())
                .unwrap_or_else(|_| HeaderValue::from_static("")),
        );
        headers.insert(
            "anthropic-version",
            HeaderValue::from_static(ANTHROPIC_VERSION),
        );
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers
    }
}

#[derive(Debug, Serialize)]
struct MessagesRequest {
    model: String,
    messages: Vec<WireMessage>,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
}

#[derive(Debug, Serialize)]
struct WireMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    block_type: String,
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Usage {
    input_tokens: Option<u32>,
    output_tokens: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    #[serde(rename = "type")]
    error_type: String,
    message: String,
}

#[async_trait]
impl LlmProvider for AnthropicProvider {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
        let url = self.api_url("/messages");

        // Anthropic takes the system prompt as a separate field, not a message.
        let mut system: Option<String> = None;
        let mut messages: Vec<WireMessage> = Vec::new();
        for msg in request.messages {
            match msg.role {
                LlmRole::System => system = Some(msg.content),
                LlmRole::User => messages.push(WireMessage {
                    role: "user".to_string(),
                    content: msg.content,
                }),
                LlmRole::Assistant => messages.push(WireMessage {
                    role: "assistant".to_string(),
                    content: msg.content,
                }),
            }
        }

        let body = MessagesRequest {
            model: self.model.clone(),
            messages,
            max_tokens: request.max_tokens,
            temperature: request.temperature,
            system,
        };

        let response = self
            .client
            .post(&url)
            .headers(self.auth_headers())
            .json(&body)
            .send()
            .await
            .map_err(|e| LlmError::RequestFailed {
                provider: "anthropic".to_string(),
                reason: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            if let Ok(api_error) = serde_json::from_str::<ApiError>(&text) {
                let error_type = &api_error.error.error_type;
                if status.as_u16() == 401 || error_type == "authentication_error" {
                    return Err(LlmError::AuthFailed {
                        provider: "anthropic".to_string(),
                    });
                }
                if status.as_u16() == 429 || error_type == "rate_limit_error" {
                    return Err(LlmError::RateLimited {
                        provider: "anthropic".to_string(),
                    });
                }
                return Err(LlmError::RequestFailed {
                    provider: "anthropic".to_string(),
                    reason: api_error.error.message,
                });
            }
            return Err(LlmError::RequestFailed {
                provider: "anthropic".to_string(),
                reason: format!("HTTP {status}: {text}"),
            });
        }

        let parsed: MessagesResponse = response
            .json()
            .await
            .map_err(|e| LlmError::InvalidResponse {
                provider: "anthropic".to_string(),
                reason: e.to_string(),
            })?;

        let content = parsed
            .content
            .iter()
            .filter(|c| c.block_type == "text")
            .filter_map(|c| c.text.clone())
            .collect::<Vec<_>>()
            .join("");

        if content.is_empty() {
            return Err(LlmError::InvalidResponse {
                provider: "anthropic".to_string(),
                reason: "response contained no text blocks".to_string(),
            });
        }

        let (input_tokens, output_tokens) = parsed
            .usage
            .map(|u| (u.input_tokens.unwrap_or(0), u.output_tokens.unwrap_or(0)))
            .unwrap_or((0, 0));

        Ok(CompletionResponse {
            content,
            input_tokens,
            output_tokens,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_provider() -> AnthropicProvider {
        AnthropicProvider::new(
            SecretString::from("test-key"),
            "claude-3-5-haiku-latest",
        )
    }

    #[test]
    fn api_url_joins_without_double_slash() {
        let provider = test_provider().with_endpoint("https://api.anthropic.com/v1/");
        assert_eq!(
            provider.api_url("/messages"),
            "https://api.anthropic.com/v1/messages"
        );
    }

    #[test]
    fn model_name_is_exposed() {
        assert_eq!(test_provider().model_name(), "claude-3-5-haiku-latest");
    }

    #[test]
    fn system_messages_serialize_to_separate_field() {
        let body = MessagesRequest {
            model: "m".to_string(),
            messages: vec![WireMessage {
                role: "user".to_string(),
                content: "hi".to_string(),
            }],
            max_tokens: 16,
            temperature: None,
            system: Some("be brief".to_string()),
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["system"], "be brief");
        assert!(json.get("temperature").is_none());
    }
}
