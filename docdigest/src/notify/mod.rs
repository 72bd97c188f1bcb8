//! Notification channel.
//!
//! A notification goes to a single recipient and carries a single
//! attachment. Delivery is fire-and-forget: a failure is reported once and
//! never retried.

mod webhook;

pub use webhook::WebhookNotifier;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::document::Artifact;
use crate::errors::DigestError;

/// A message announcing a finished summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    /// Identity receiving the message.
    pub recipient: String,
    /// Display name of the sender.
    pub sender_name: String,
    /// Subject line.
    pub subject: String,
    /// Plain-text body.
    pub body: String,
    /// The converted document.
    pub attachment: Artifact,
}

impl Notification {
    /// Creates a notification.
    #[must_use]
    pub fn new(
        recipient: impl Into<String>,
        sender_name: impl Into<String>,
        subject: impl Into<String>,
        body: impl Into<String>,
        attachment: Artifact,
    ) -> Self {
        Self {
            recipient: recipient.into(),
            sender_name: sender_name.into(),
            subject: subject.into(),
            body: body.into(),
            attachment,
        }
    }
}

/// Renders the notification body, substituting `{summary}`.
#[must_use]
pub fn render_body(template: &str, summary: &str) -> String {
    template.replace("{summary}", summary)
}

/// Delivers notifications.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Sends one notification.
    async fn send(&self, notification: &Notification) -> Result<(), DigestError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_body() {
        let body = render_body("[Summary]\n{summary}\n", "要約: hello");
        assert_eq!(body, "[Summary]\n要約: hello\n");
    }

    #[test]
    fn test_wire_shape() {
        let notification = Notification::new(
            "me@example.com",
            "Document Summary System",
            "Document summary completed",
            "body",
            Artifact::pdf(vec![1, 2, 3]),
        );
        let json = serde_json::to_value(&notification).unwrap();

        assert_eq!(json["recipient"], "me@example.com");
        assert_eq!(json["attachment"]["file_name"], "summary-document.pdf");
        assert_eq!(json["attachment"]["content_base64"], "AQID");
    }
}
