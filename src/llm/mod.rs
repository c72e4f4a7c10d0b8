//! LLM integration.
//!
//! A single `LlmProvider` trait seam with a direct Anthropic Messages API
//! client behind it, plus the `AiGenerator` built on top for question
//! generation and fact extraction.

pub mod anthropic;
pub mod generator;

pub use anthropic::AnthropicProvider;
pub use generator::{AiGenerator, LlmGenerator};

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::LlmError;

/// Role of one chat message sent to the provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LlmRole {
    System,
    User,
    Assistant,
}

/// One message in a completion request.
#[derive(Debug, Clone)]
pub struct ChatMessage {
    pub role: LlmRole,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: LlmRole::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: LlmRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: LlmRole::Assistant,
            content: content.into(),
        }
    }
}

/// A text completion request.
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub messages: Vec<ChatMessage>,
    pub max_tokens: u32,
    pub temperature: Option<f32>,
}

impl CompletionRequest {
    pub fn new(messages: Vec<ChatMessage>) -> Self {
        Self {
            messages,
            max_tokens: 4096,
            temperature: None,
        }
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }
}

/// A completion response.
#[derive(Debug, Clone)]
pub struct CompletionResponse {
    pub content: String,
    pub input_tokens: u32,
    pub output_tokens: u32,
}

/// Backend-agnostic LLM provider.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    fn model_name(&self) -> &str;
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError>;
}

/// Configuration for creating an LLM provider.
#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub api_key: secrecy::SecretString,
    pub model: String,
}

impl LlmConfig {
    /// Read provider settings from the environment.
    ///
    /// `ANTHROPIC_API_KEY` is required; `BIZ_ONBOARD_MODEL` falls back to a
    /// fast default model.
    pub fn from_env() -> Result<Self, crate::error::ConfigError> {
        let api_key = std::env::var("ANTHROPIC_API_KEY")
            .map_err(|_| crate::error::ConfigError::MissingEnvVar("ANTHROPIC_API_KEY".into()))?;
        let model = std::env::var("BIZ_ONBOARD_MODEL")
            .unwrap_or_else(|_| "claude-3-5-haiku-latest".to_string());
        Ok(Self {
            api_key: secrecy::SecretString::from(api_key),
            model,
        })
    }
}

/// Create the default (Anthropic) provider from configuration.
pub fn create_provider(config: &LlmConfig) -> Arc<dyn LlmProvider> {
    tracing::info!("Using Anthropic (model: {})", config.model);
    Arc::new(AnthropicProvider::new(config.api_key.clone(), &config.model))
}
