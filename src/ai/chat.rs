// src/ai/chat.rs
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::{status_error, Completion, CompletionRequest, CompletionService, ServiceError, Usage};

pub const OPENAI_BASE: &str = "https://api.openai.com/v1";
pub const PERPLEXITY_BASE: &str = "https://api.perplexity.ai";

#[derive(Serialize)]
struct Msg<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct Req<'a> {
    model: &'a str,
    messages: Vec<Msg<'a>>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Deserialize)]
struct Resp {
    #[serde(default)]
    choices: Vec<Choice>,
    usage: Option<RespUsage>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMsg,
}

#[derive(Deserialize)]
struct ChoiceMsg {
    content: Option<String>,
}

#[derive(Deserialize)]
struct RespUsage {
    #[serde(default)]
    prompt_tokens: u64,
    #[serde(default)]
    completion_tokens: u64,
}

/// Chat Completions protocol client, spoken by OpenAI and Perplexity.
/// `base` is the API root up to (not including) `/chat/completions`.
pub struct ChatCompletionsClient {
    http: reqwest::Client,
    api_key: String,
    endpoint: String,
    provider: &'static str,
}

impl ChatCompletionsClient {
    pub fn new(provider: &'static str, base: &str, api_key: &str, http: reqwest::Client) -> Self {
        Self {
            http,
            api_key: api_key.to_string(),
            endpoint: format!("{}/chat/completions", base.trim_end_matches('/')),
            provider,
        }
    }

    pub fn openai(base: &str, api_key: &str, http: reqwest::Client) -> Self {
        Self::new("openai", base, api_key, http)
    }

    pub fn perplexity(base: &str, api_key: &str, http: reqwest::Client) -> Self {
        Self::new("perplexity", base, api_key, http)
    }
}

#[async_trait]
impl CompletionService for ChatCompletionsClient {
    async fn complete(&self, request: &CompletionRequest) -> Result<Completion, ServiceError> {
        let mut messages = Vec::with_capacity(2);
        if let Some(sys) = request.system.as_deref() {
            messages.push(Msg {
                role: "system",
                content: sys,
            });
        }
        messages.push(Msg {
            role: "user",
            content: &request.prompt,
        });

        let req = Req {
            model: &request.model,
            messages,
            temperature: request.temperature,
            max_tokens: request.max_tokens,
        };

        let resp = self
            .http
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
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
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| ServiceError::Malformed("no choices[0].message.content".into()))?;

        Ok(Completion {
            text,
            usage: body.usage.map(|u| Usage {
                prompt_tokens: u.prompt_tokens,
                completion_tokens: u.completion_tokens,
            }),
        })
    }

    fn name(&self) -> &'static str {
        self.provider
    }
}
