// src/ai/anthropic.rs
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::{status_error, Completion, CompletionRequest, CompletionService, ServiceError, Usage};

pub const ANTHROPIC_BASE: &str = "https://api.anthropic.com/v1";
pub const ANTHROPIC_VERSION: &str = "2023-06-01";

#[derive(Serialize)]
struct Msg<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct Req<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<&'a str>,
    messages: Vec<Msg<'a>>,
}

#[derive(Deserialize)]
struct Resp {
    #[serde(default)]
    content: Vec<Block>,
    usage: Option<RespUsage>,
}

#[derive(Deserialize)]
struct Block {
    #[serde(rename = "type")]
    kind: String,
    text: Option<String>,
}

#[derive(Deserialize)]
struct RespUsage {
    #[serde(default)]
    input_tokens: u64,
    #[serde(default)]
    output_tokens: u64,
}

/// Anthropic Messages API client.
pub struct MessagesClient {
    http: reqwest::Client,
    api_key: String,
    endpoint: String,
}

impl MessagesClient {
    pub fn new(base: &str, api_key: &str, http: reqwest::Client) -> Self {
        Self {
            http,
            api_key: api_key.to_string(),
            endpoint: format!("{}/messages", base.trim_end_matches('/')),
        }
    }
}

#[async_trait]
impl CompletionService for MessagesClient {
    async fn complete(&self, request: &CompletionRequest) -> Result<Completion, ServiceError> {
        let req = Req {
            model: &request.model,
            max_tokens: request.max_tokens,
            temperature: request.temperature,
            system: request.system.as_deref(),
            messages: vec![Msg {
                role: "user",
                content: &request.prompt,
            }],
        };

        let resp = self
            .http
            .post(&self.endpoint)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&req)
            .send()
            .await
            .map_err(|e| ServiceError::Transport(e.to_string()))?;

        if !resp.status().is_success() {
            return Err(status_error(resp).await);
        }

        let body: Resp = resp
            .json()
            .await
            .map_err(|e| ServiceError::Malformed(e.to_string()))?;
        let text = body
            .content
            .into_iter()
            .find(|b| b.kind == "text")
            .and_then(|b| b.text)
            .ok_or_else(|| ServiceError::Malformed("no text block in content".into()))?;

        Ok(Completion {
            text,
            usage: body.usage.map(|u| Usage {
                prompt_tokens: u.input_tokens,
                completion_tokens: u.output_tokens,
            }),
        })
    }

    fn name(&self) -> &'static str {
        "anthropic"
    }
}
