//! Reqwest-backed mail relay adapter.
//!
//! Owns transport details only: the relay's JSON envelope, request timeout,
//! and HTTP error mapping. The relay accepts
//! `POST { from, to, subject, html }` and answers 2xx on acceptance.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};
use serde::Serialize;
use tracing::info;

use crate::domain::ports::{Mailer, MailerError, OutboundEmail};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// JSON envelope the relay expects.
#[derive(Debug, Serialize)]
struct RelayEnvelope<'a> {
    from: &'a str,
    to: &'a str,
    subject: &'a str,
    html: &'a str,
}

/// Mailer adapter that hands emails to an HTTP relay service.
pub struct RelayMailer {
    client: Client,
    endpoint: Url,
    sender: String,
}

impl RelayMailer {
    /// Build an adapter with the default request timeout.
    ///
    /// # Errors
    ///
    /// Returns an error when the reqwest client cannot be constructed.
    pub fn new(endpoint: Url, sender: impl Into<String>) -> Result<Self, reqwest::Error> {
        Self::with_timeout(endpoint, sender, DEFAULT_TIMEOUT)
    }

    /// Build an adapter with an explicit request timeout.
    ///
    /// # Errors
    ///
    /// Returns an error when the reqwest client cannot be constructed.
    pub fn with_timeout(
        endpoint: Url,
        sender: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            endpoint,
            sender: sender.into(),
        })
    }
}

#[async_trait]
impl Mailer for RelayMailer {
    async fn send(&self, email: &OutboundEmail) -> Result<(), MailerError> {
        let envelope = RelayEnvelope {
            from: self.sender.as_str(),
            to: email.to.as_str(),
            subject: email.subject.as_str(),
            html: email.html_body.as_str(),
        };
        let response = self
            .client
            .post(self.endpoint.clone())
            .json(&envelope)
            .send()
            .await
            .map_err(|error| MailerError::delivery(error.to_string()))?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        let body = response.bytes().await.unwrap_or_default();
        Err(map_status_error(status, body.as_ref()))
    }
}

fn map_status_error(status: StatusCode, body: &[u8]) -> MailerError {
    let preview = body_preview(body);
    if preview.is_empty() {
        MailerError::delivery(format!("relay answered status {}", status.as_u16()))
    } else {
        MailerError::delivery(format!(
            "relay answered status {}: {preview}",
            status.as_u16()
        ))
    }
}

fn body_preview(body: &[u8]) -> String {
    const PREVIEW_CHAR_LIMIT: usize = 160;

    let compact = String::from_utf8_lossy(body)
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");
    let preview = compact.chars().take(PREVIEW_CHAR_LIMIT).collect::<String>();
    if compact.chars().count() > PREVIEW_CHAR_LIMIT {
        format!("{preview}...")
    } else {
        preview
    }
}

/// Mailer that logs instead of delivering.
///
/// Used when no relay endpoint is configured, so local environments run
/// without mail infrastructure.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopMailer;

#[async_trait]
impl Mailer for NoopMailer {
    async fn send(&self, email: &OutboundEmail) -> Result<(), MailerError> {
        info!(to = %email.to, subject = %email.subject, "mail relay disabled; dropping email");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    fn envelope_serialises_the_relay_contract() {
        let envelope = RelayEnvelope {
            from: "noreply@doorstep.example",
            to: "jane@example.com",
            subject: "Payment receipt",
            html: "<p>Thanks</p>",
        };
        let value = serde_json::to_value(&envelope).expect("serialises");
        assert_eq!(value["from"], "noreply@doorstep.example");
        assert_eq!(value["to"], "jane@example.com");
        assert_eq!(value["subject"], "Payment receipt");
        assert_eq!(value["html"], "<p>Thanks</p>");
    }

    #[rstest]
    fn status_errors_carry_a_body_preview() {
        let error = map_status_error(StatusCode::BAD_GATEWAY, b"{\"error\":\"upstream down\"}");
        let message = error.to_string();
        assert!(message.contains("502"));
        assert!(message.contains("upstream down"));
    }

    #[rstest]
    fn long_bodies_are_truncated() {
        let body = "x".repeat(400);
        let preview = body_preview(body.as_bytes());
        assert!(preview.ends_with("..."));
        assert!(preview.chars().count() <= 163);
    }

    #[tokio::test]
    async fn noop_mailer_accepts_everything() {
        let email = OutboundEmail {
            to: "jane@example.com".to_owned(),
            subject: "Payment receipt".to_owned(),
            html_body: "<p>Thanks</p>".to_owned(),
        };
        assert!(NoopMailer.send(&email).await.is_ok());
    }
}
