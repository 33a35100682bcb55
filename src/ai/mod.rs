//! Completion-service abstraction shared by the synthesizer and the retrieval source.
//!
//! Concrete clients: chat-completions protocol (OpenAI, Perplexity) and the Anthropic
//! messages protocol. Clients never retry.

pub mod anthropic;
pub mod chat;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub use anthropic::MessagesClient;
pub use chat::ChatCompletionsClient;

pub const USER_AGENT: &str = concat!("trend-digest/", env!("CARGO_PKG_VERSION"));

/// One request to a completion service.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    pub model: String,
    pub system: Option<String>,
    pub prompt: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Usage {
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
}

impl Usage {
    pub fn total(&self) -> u64 {
        self.prompt_tokens + self.completion_tokens
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Completion {
    pub text: String,
    pub usage: Option<Usage>,
}

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("transport: {0}")]
    Transport(String),
    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },
    #[error("malformed response: {0}")]
    Malformed(String),
}

#[async_trait]
pub trait CompletionService: Send + Sync {
    async fn complete(&self, request: &CompletionRequest) -> Result<Completion, ServiceError>;

    /// Provider name for diagnostics.
    fn name(&self) -> &'static str;
}

pub type DynCompletionService = Arc<dyn CompletionService>;

/// Shared HTTP client for API calls.
pub fn build_http_client(timeout: Duration) -> reqwest::Result<reqwest::Client> {
    reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .connect_timeout(Duration::from_secs(10))
        .timeout(timeout)
        .build()
}

/// Reads an error body for diagnostics, capped so logs stay short.
pub(crate) async fn status_error(resp: reqwest::Response) -> ServiceError {
    let status = resp.status().as_u16();
    let body: String = resp
        .text()
        .await
        .unwrap_or_default()
        .chars()
        .take(300)
        .collect();
    ServiceError::Status { status, body }
}

/// Returns the same completion for every request.
#[derive(Clone)]
pub struct FixedService {
    pub text: String,
    pub usage: Option<Usage>,
}

#[async_trait]
impl CompletionService for FixedService {
    async fn complete(&self, _request: &CompletionRequest) -> Result<Completion, ServiceError> {
        Ok(Completion {
            text: self.text.clone(),
            usage: self.usage,
        })
    }

    fn name(&self) -> &'static str {
        "fixed"
    }
}
