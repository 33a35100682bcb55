// src/dispatch/resend.rs
use async_trait::async_trait;
use serde::Deserialize;

use super::{MailTransport, OutgoingEmail};
use crate::error::{PipelineError, Result};

pub const RESEND_BASE: &str = "https://api.resend.com";

#[derive(Deserialize)]
struct SendResp {
    id: Option<String>,
}

/// Resend transactional email API.
pub struct ResendTransport {
    api_key: String,
    endpoint: String,
    client: reqwest::Client,
}

impl ResendTransport {
    pub fn new(base: &str, api_key: &str, client: reqwest::Client) -> Self {
        Self {
            api_key: api_key.to_string(),
            endpoint: format!("{}/emails", base.trim_end_matches('/')),
            client,
        }
    }
}

#[async_trait]
impl MailTransport for ResendTransport {
    async fn send(&self, email: &OutgoingEmail) -> Result<Option<String>> {
        let resp = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(email)
            .send()
            .await
            .map_err(|e| PipelineError::Delivery(format!("resend post: {e}")))?;

        let status = resp.status();
        if !status.is_success() {
            let body: String = resp
                .text()
                .await
                .unwrap_or_default()
                .chars()
                .take(300)
                .collect();
            return Err(PipelineError::Delivery(format!("resend HTTP {status}: {body}")));
        }

        // A 2xx without a parsable id still means the message was accepted.
        let id = resp.json::<SendResp>().await.ok().and_then(|r| r.id);
        Ok(id)
    }

    fn name(&self) -> &'static str {
        "resend"
    }
}
