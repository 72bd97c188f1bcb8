//! Webhook notifier: POSTs the notification as JSON.

use async_trait::async_trait;
use std::time::Duration;
use tracing::{info, warn};

use super::{Notification, Notifier};
use crate::errors::DigestError;
use crate::utils::text::{ERROR_BODY_LIMIT, LOG_BODY_LIMIT};
use crate::utils::truncate_chars;

/// Delivers notifications to an HTTP endpoint.
#[derive(Debug, Clone)]
pub struct WebhookNotifier {
    client: reqwest::Client,
    url: String,
}

impl WebhookNotifier {
    /// Creates a notifier posting to `url`.
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, DigestError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| {
                DigestError::config("notify", format!("failed to build HTTP client: {e}"))
            })?;

        Ok(Self {
            client,
            url: url.into(),
        })
    }

    /// Returns the target URL.
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn send(&self, notification: &Notification) -> Result<(), DigestError> {
        let recipient = notification.recipient.as_str();

        let response = self
            .client
            .post(&self.url)
            .json(notification)
            .send()
            .await
            .map_err(|e| {
                DigestError::delivery(recipient, format!("request failed: {}", e.without_url()))
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(
                recipient,
                status = status.as_u16(),
                body = truncate_chars(&body, LOG_BODY_LIMIT),
                "Notification webhook rejected the message"
            );
            return Err(DigestError::delivery(
                recipient,
                format!(
                    "HTTP {} - {}",
                    status.as_u16(),
                    truncate_chars(&body, ERROR_BODY_LIMIT)
                ),
            ));
        }

        info!(
            recipient,
            attachment = %notification.attachment.file_name,
            attachment_bytes = notification.attachment.len(),
            "Notification sent"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Artifact;
    use crate::testing::{StubHttpServer, StubResponse};

    fn notification() -> Notification {
        Notification::new(
            "ops@example.com",
            "Digest Bot",
            "Document summary",
            "要約: hello",
            Artifact::pdf(b"%PDF".to_vec()),
        )
    }

    fn notifier(server: &StubHttpServer) -> WebhookNotifier {
        WebhookNotifier::new(format!("{}/notify", server.url()), Duration::from_secs(5)).unwrap()
    }

    #[tokio::test]
    async fn test_send_posts_notification_json() {
        let server = StubHttpServer::start(vec![StubResponse::new(204, "")])
            .await
            .unwrap();

        notifier(&server).send(&notification()).await.unwrap();

        let request = &server.requests()[0];
        assert_eq!(request.method, "POST");
        assert_eq!(request.path(), "/notify");
        let body = request.body_json().unwrap();
        assert_eq!(body["recipient"], "ops@example.com");
        assert_eq!(body["subject"], "Document summary");
        assert_eq!(body["attachment"]["mime_type"], "application/pdf");
        assert_eq!(body["attachment"]["content_base64"], "JVBERg==");
    }

    #[tokio::test]
    async fn test_rejected_notification_is_delivery_error() {
        let server = StubHttpServer::start(vec![StubResponse::new(500, "mailbox unavailable")])
            .await
            .unwrap();

        let err = notifier(&server).send(&notification()).await.unwrap_err();

        assert_eq!(err.kind(), "DeliveryError");
        let message = err.to_string();
        assert!(message.contains("ops@example.com"));
        assert!(message.contains("HTTP 500 - mailbox unavailable"));
    }
}
