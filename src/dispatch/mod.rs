// src/dispatch/mod.rs
//! Delivery of the rendered document. One attempt per run: no retry, no queue.

pub mod resend;
pub mod smtp;

use async_trait::async_trait;
use chrono::NaiveDate;
use metrics::counter;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::render::RenderedDocument;

pub use resend::ResendTransport;
pub use smtp::SmtpTransport;

/// What goes over the wire, independent of the transport.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct OutgoingEmail {
    pub from: String,
    pub to: Vec<String>,
    pub subject: String,
    pub html: String,
    pub text: String,
}

#[async_trait]
pub trait MailTransport: Send + Sync {
    /// Returns the provider-assigned message id, if the provider reports one.
    async fn send(&self, email: &OutgoingEmail) -> Result<Option<String>>;
    fn name(&self) -> &'static str;
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct DeliveryReceipt {
    pub success: bool,
    pub provider_response_id: Option<String>,
    pub error_detail: Option<String>,
    /// Nothing was sent because there was nothing to send.
    #[serde(default)]
    pub skipped: bool,
}

impl DeliveryReceipt {
    pub fn delivered(id: Option<String>) -> Self {
        Self {
            success: true,
            provider_response_id: id,
            ..Self::default()
        }
    }

    pub fn failed(detail: impl Into<String>) -> Self {
        Self {
            error_detail: Some(detail.into()),
            ..Self::default()
        }
    }

    pub fn skipped(detail: impl Into<String>) -> Self {
        Self {
            error_detail: Some(detail.into()),
            skipped: true,
            ..Self::default()
        }
    }
}

/// `"[{label}] {YYYY-MM-DD} - {tagline}"`; the tagline part is omitted when empty.
pub fn compose_subject(label: &str, tagline: &str, date: NaiveDate) -> String {
    let date = date.format("%Y-%m-%d");
    if tagline.trim().is_empty() {
        format!("[{label}] {date}")
    } else {
        format!("[{label}] {date} - {tagline}")
    }
}

pub struct Dispatcher {
    transport: Box<dyn MailTransport>,
}

impl Dispatcher {
    pub fn new(transport: Box<dyn MailTransport>) -> Self {
        Self { transport }
    }

    pub fn transport_name(&self) -> &'static str {
        self.transport.name()
    }

    pub async fn deliver(
        &self,
        document: &RenderedDocument,
        subject: &str,
        recipients: &[String],
        sender: &str,
    ) -> DeliveryReceipt {
        if document.plain_text.trim().is_empty() {
            tracing::warn!(target: "dispatch", "empty document, nothing sent");
            counter!("dispatch_total", "outcome" => "skipped").increment(1);
            return DeliveryReceipt::skipped("empty document");
        }
        if recipients.is_empty() {
            tracing::error!(target: "dispatch", "no recipients configured");
            counter!("dispatch_total", "outcome" => "failed").increment(1);
            return DeliveryReceipt::failed("no recipients");
        }

        let email = OutgoingEmail {
            from: sender.to_string(),
            to: recipients.to_vec(),
            subject: subject.to_string(),
            html: document.html.clone(),
            text: document.plain_text.clone(),
        };

        match self.transport.send(&email).await {
            Ok(id) => {
                tracing::info!(
                    target: "dispatch",
                    transport = self.transport.name(),
                    recipients = recipients.len(),
                    id = id.as_deref().unwrap_or("-"),
                    "email sent"
                );
                counter!("dispatch_total", "outcome" => "sent").increment(1);
                DeliveryReceipt::delivered(id)
            }
            Err(e) => {
                tracing::error!(
                    target: "dispatch",
                    transport = self.transport.name(),
                    error = %e,
                    "email failed"
                );
                counter!("dispatch_total", "outcome" => "failed").increment(1);
                DeliveryReceipt::failed(e.to_string())
            }
        }
    }
}
