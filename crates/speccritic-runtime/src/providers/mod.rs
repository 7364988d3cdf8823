//! LLM Provider abstractions for speccritic-runtime.
//!
//! This module defines the trait for LLM providers and includes
//! implementations for Anthropic and OpenAI.
//!
//! ## Security
//!
//! All providers use the [`secrets`] module for secure credential handling.
//! See [`ApiCredential`] for the recommended patterns.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

mod factory;
pub mod secrets;

#[cfg(feature = "anthropic")]
mod anthropic;

#[cfg(feature = "openai")]
mod openai;

pub use factory::{ProviderFactory, ProviderRegistry};
pub use secrets::{ApiCredential, CredentialBuilder, CredentialSet, CredentialSource};

#[cfg(feature = "anthropic")]
pub use anthropic::{AnthropicProvider, AnthropicProviderFactory};

#[cfg(feature = "openai")]
pub use openai::{OpenAiProvider, OpenAiProviderFactory};

/// Upper bound on a provider response body.
pub const MAX_RESPONSE_BYTES: usize = 10 * 1024 * 1024;

/// Errors from LLM providers.
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("HTTP request failed: {0}")]
    HttpError(String),

    #[error("Rate limit exceeded, retry after {retry_after:?}")]
    RateLimited { retry_after: Option<Duration> },

    #[error("API error: {status} - {message}")]
    ApiError { status: u16, message: String },

    #[error("JSON parse error: {0}")]
    ParseError(String),

    #[error("Timeout after {0:?}")]
    Timeout(Duration),

    #[error("Request cancelled")]
    Cancelled,

    #[error("Provider not configured: {0}")]
    NotConfigured(String),
}

/// Configuration for a completion request.
#[derive(Debug, Clone)]
pub struct CompletionConfig {
    /// Model name without the provider prefix
    pub model: String,

    /// Maximum tokens to generate
    pub max_tokens: u32,

    /// Sampling temperature (0.0 - 2.0)
    pub temperature: f32,

    /// Request timeout
    pub timeout: Duration,
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            model: "claude-sonnet-4-6".to_string(),
            max_tokens: 4096,
            temperature: 0.2,
            timeout: Duration::from_secs(300),
        }
    }
}

/// A chat message for LLM completion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Role: "system" or "user"
    pub role: String,

    /// Message content
    pub content: String,
}

impl ChatMessage {
    /// Create a system message.
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    /// Create a user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

/// Response from an LLM completion.
#[derive(Debug, Clone)]
pub struct CompletionResponse {
    /// Generated content
    pub content: String,

    /// Token usage
    pub usage: TokenUsage,

    /// Model that produced the response, as `provider:model`
    pub model: String,

    /// Stop reason
    pub stop_reason: Option<String>,
}

/// Token usage from a completion.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TokenUsage {
    /// Tokens in the prompt
    pub prompt_tokens: u32,

    /// Tokens in the completion
    pub completion_tokens: u32,
}

impl TokenUsage {
    /// Total tokens used.
    pub fn total(&self) -> u32 {
        self.prompt_tokens + self.completion_tokens
    }
}

impl std::ops::AddAssign for TokenUsage {
    fn add_assign(&mut self, other: Self) {
        self.prompt_tokens += other.prompt_tokens;
        self.completion_tokens += other.completion_tokens;
    }
}

/// Provider abstraction allows swapping LLM backends.
///
/// This is the ONLY place where LLM calls are made. Nothing in
/// `speccritic-core` ever calls it.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Execute a chat completion.
    async fn complete(
        &self,
        messages: Vec<ChatMessage>,
        config: &CompletionConfig,
    ) -> Result<CompletionResponse, ProviderError>;

    /// Get provider name for logs.
    fn name(&self) -> &str;

    /// Estimate tokens for a prompt.
    fn estimate_tokens(&self, text: &str) -> u32 {
        // Simple estimate: ~4 chars per token
        (text.len() / 4) as u32
    }
}

/// A `provider:model` identifier such as `anthropic:claude-sonnet-4-6`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelSpec {
    pub provider: String,
    pub model: String,
}

impl ModelSpec {
    pub fn parse(raw: &str) -> Result<Self, ProviderError> {
        match raw.split_once(':') {
            Some((provider, model)) if !provider.is_empty() && !model.is_empty() => Ok(Self {
                provider: provider.to_string(),
                model: model.to_string(),
            }),
            _ => Err(ProviderError::NotConfigured(format!(
                "invalid model format {:?}: expected provider:model (e.g. anthropic:claude-sonnet-4-6)",
                raw
            ))),
        }
    }
}

impl fmt::Display for ModelSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.provider, self.model)
    }
}

/// Shorten provider error bodies for messages, on a char boundary.
#[cfg_attr(not(any(feature = "anthropic", feature = "openai")), allow(dead_code))]
pub(crate) fn truncate(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}

/// Response body accumulator that refuses to grow past a byte limit.
#[cfg_attr(not(any(feature = "anthropic", feature = "openai")), allow(dead_code))]
pub(crate) struct CappedBody {
    provider: &'static str,
    limit: usize,
    bytes: Vec<u8>,
}

#[cfg_attr(not(any(feature = "anthropic", feature = "openai")), allow(dead_code))]
impl CappedBody {
    pub(crate) fn new(provider: &'static str, limit: usize) -> Self {
        Self {
            provider,
            limit,
            bytes: Vec::new(),
        }
    }

    fn too_large(&self) -> ProviderError {
        ProviderError::ParseError(format!(
            "{}: response body exceeds {} bytes",
            self.provider, self.limit
        ))
    }

    /// Reject a declared `Content-Length` over the limit before reading.
    pub(crate) fn check_declared(&self, content_length: Option<u64>) -> Result<(), ProviderError> {
        match content_length {
            Some(len) if len > self.limit as u64 => Err(self.too_large()),
            _ => Ok(()),
        }
    }

    pub(crate) fn push(&mut self, chunk: &[u8]) -> Result<(), ProviderError> {
        if self.bytes.len() + chunk.len() > self.limit {
            return Err(self.too_large());
        }
        self.bytes.extend_from_slice(chunk);
        Ok(())
    }

    pub(crate) fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }
}

/// Read a response body chunk by chunk, stopping at [`MAX_RESPONSE_BYTES`].
#[cfg(any(feature = "anthropic", feature = "openai"))]
pub(crate) async fn read_body(
    mut response: reqwest::Response,
    provider: &'static str,
) -> Result<Vec<u8>, ProviderError> {
    let mut body = CappedBody::new(provider, MAX_RESPONSE_BYTES);
    body.check_declared(response.content_length())?;

    while let Some(chunk) = response
        .chunk()
        .await
        .map_err(|e| ProviderError::HttpError(e.to_string()))?
    {
        body.push(&chunk)?;
    }

    Ok(body.into_bytes())
}
