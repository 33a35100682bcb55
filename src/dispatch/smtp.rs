// src/dispatch/smtp.rs
use async_trait::async_trait;
use lettre::message::{Mailbox, Message, MultiPart};
use lettre::transport::smtp::{authentication::Credentials, AsyncSmtpTransport};
use lettre::{AsyncTransport, Tokio1Executor};

use super::{MailTransport, OutgoingEmail};
use crate::error::{PipelineError, Result};

/// SMTP relay with credentials (STARTTLS/TLS per lettre's `relay`).
pub struct SmtpTransport {
    mailer: AsyncSmtpTransport<Tokio1Executor>,
}

impl SmtpTransport {
    pub fn new(host: &str, user: &str, pass: &str) -> Result<Self> {
        let creds = Credentials::new(user.to_string(), pass.to_string());
        let mailer = AsyncSmtpTransport::<Tokio1Executor>::relay(host)
            .map_err(|e| PipelineError::config(format!("invalid SMTP host {host}: {e}")))?
            .credentials(creds)
            .build();
        Ok(Self { mailer })
    }
}

fn parse_mailbox(addr: &str) -> Result<Mailbox> {
    addr.trim()
        .parse()
        .map_err(|e| PipelineError::Delivery(format!("invalid address {addr:?}: {e}")))
}

pub(crate) fn build_message(email: &OutgoingEmail) -> Result<Message> {
    let mut builder = Message::builder()
        .from(parse_mailbox(&email.from)?)
        .subject(email.subject.clone());
    for to in &email.to {
        builder = builder.to(parse_mailbox(to)?);
    }
    builder
        .multipart(MultiPart::alternative_plain_html(
            email.text.clone(),
            email.html.clone(),
        ))
        .map_err(|e| PipelineError::Delivery(format!("build email: {e}")))
}

#[async_trait]
impl MailTransport for SmtpTransport {
    async fn send(&self, email: &OutgoingEmail) -> Result<Option<String>> {
        let msg = build_message(email)?;
        let resp = self
            .mailer
            .send(msg)
            .await
            .map_err(|e| PipelineError::Delivery(format!("smtp send: {e}")))?;
        Ok(resp.first_line().map(str::to_string))
    }

    fn name(&self) -> &'static str {
        "smtp"
    }
}
