//! Error types for the docdigest pipeline.
//!
//! Every failure a pipeline run can hit is one variant of [`DigestError`].
//! The orchestrator turns the terminal error of a run into the detail text of
//! its execution record, so the `Display` output of each variant is what
//! operators read in the status location.

use std::collections::HashMap;
use std::time::Duration;
use thiserror::Error;

/// The main error type for docdigest operations.
#[derive(Debug, Error)]
pub enum DigestError {
    /// No source document id was configured.
    #[error("Document id is empty: set pipeline.document_id before running")]
    MissingDocumentId,

    /// The source document could not be read.
    #[error("Failed to fetch document '{document_id}': {message}")]
    Fetch {
        /// The document that was requested.
        document_id: String,
        /// What went wrong.
        message: String,
    },

    /// A single attempt was answered with HTTP 429.
    #[error("Rate limited (429): quota exceeded")]
    RateLimited {
        /// Server supplied `Retry-After` hint, if any.
        retry_after: Option<Duration>,
    },

    /// A single attempt failed at the transport level or with a non-429 status.
    #[error("{0}")]
    Transport(String),

    /// Every attempt was consumed and the last one was rate limited.
    #[error("Summary generation failed (rate limit retries exhausted after {attempts} attempts): {message}")]
    RateLimitExhausted {
        /// Number of attempts made.
        attempts: usize,
        /// Message of the last observed error.
        message: String,
    },

    /// Every attempt was consumed and the last one failed with a non-429 error.
    #[error("Summary generation failed (retries exhausted after {attempts} attempts): {message}")]
    TransientCallFailure {
        /// Number of attempts made.
        attempts: usize,
        /// Message of the last observed error.
        message: String,
    },

    /// A successful response carried a body that could not be used.
    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    /// The document could not be converted to the output format.
    #[error("Failed to convert document '{document_id}' to PDF: {message}")]
    Conversion {
        /// The document being converted.
        document_id: String,
        /// What went wrong.
        message: String,
    },

    /// The notification could not be delivered.
    #[error("Failed to deliver notification to {recipient}: {message}")]
    Delivery {
        /// The intended recipient.
        recipient: String,
        /// What went wrong.
        message: String,
    },

    /// Installing or removing a recurring trigger failed.
    #[error("Scheduler error: {0}")]
    Scheduler(String),

    /// Configuration is missing or invalid.
    #[error("Configuration error for '{key}': {reason}")]
    Config {
        /// The offending configuration key.
        key: String,
        /// Why it was rejected.
        reason: String,
    },

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl DigestError {
    /// Creates a fetch error.
    #[must_use]
    pub fn fetch(document_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Fetch {
            document_id: document_id.into(),
            message: message.into(),
        }
    }

    /// Creates a conversion error.
    #[must_use]
    pub fn conversion(document_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Conversion {
            document_id: document_id.into(),
            message: message.into(),
        }
    }

    /// Creates a delivery error.
    #[must_use]
    pub fn delivery(recipient: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Delivery {
            recipient: recipient.into(),
            message: message.into(),
        }
    }

    /// Creates a configuration error.
    #[must_use]
    pub fn config(key: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Config {
            key: key.into(),
            reason: reason.into(),
        }
    }

    /// Creates a scheduler error.
    #[must_use]
    pub fn scheduler(message: impl Into<String>) -> Self {
        Self::Scheduler(message.into())
    }

    /// Returns a stable machine-readable name for the error kind.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::MissingDocumentId => "MissingDocumentId",
            Self::Fetch { .. } => "FetchError",
            Self::RateLimited { .. } => "RateLimited",
            Self::Transport(_) => "TransportError",
            Self::RateLimitExhausted { .. } => "RateLimitExhausted",
            Self::TransientCallFailure { .. } => "TransientCallFailure",
            Self::MalformedResponse(_) => "MalformedResponse",
            Self::Conversion { .. } => "ConversionError",
            Self::Delivery { .. } => "DeliveryError",
            Self::Scheduler(_) => "SchedulerError",
            Self::Config { .. } => "ConfigError",
            Self::Io(_) => "IoError",
            Self::Serialization(_) => "SerializationError",
        }
    }

    /// Returns true for a single rate-limited attempt.
    #[must_use]
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, Self::RateLimited { .. })
    }

    /// Converts to a dictionary representation for event payloads.
    #[must_use]
    pub fn to_dict(&self) -> HashMap<String, serde_json::Value> {
        let mut map = HashMap::new();
        map.insert("type".to_string(), serde_json::json!(self.kind()));
        map.insert("message".to_string(), serde_json::json!(self.to_string()));

        match self {
            Self::RateLimitExhausted { attempts, .. }
            | Self::TransientCallFailure { attempts, .. } => {
                map.insert("attempts".to_string(), serde_json::json!(attempts));
            }
            Self::Fetch { document_id, .. } | Self::Conversion { document_id, .. } => {
                map.insert("document_id".to_string(), serde_json::json!(document_id));
            }
            Self::Delivery { recipient, .. } => {
                map.insert("recipient".to_string(), serde_json::json!(recipient));
            }
            _ => {}
        }

        map
    }
}

impl From<serde_json::Error> for DigestError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fetch_error_display() {
        let err = DigestError::fetch("doc-1", "not found");
        assert_eq!(err.to_string(), "Failed to fetch document 'doc-1': not found");
        assert_eq!(err.kind(), "FetchError");
    }

    #[test]
    fn test_rate_limit_exhausted_mentions_quota() {
        let err = DigestError::RateLimitExhausted {
            attempts: 3,
            message: DigestError::RateLimited { retry_after: None }.to_string(),
        };

        let text = err.to_string();
        assert!(text.contains("rate limit retries exhausted"));
        assert!(text.contains("quota exceeded"));
        assert!(text.contains("3 attempts"));
    }

    #[test]
    fn test_is_rate_limited() {
        assert!(DigestError::RateLimited { retry_after: None }.is_rate_limited());
        assert!(!DigestError::Transport("boom".into()).is_rate_limited());
    }

    #[test]
    fn test_to_dict() {
        let err = DigestError::delivery("ops@example.com", "HTTP 502");
        let dict = err.to_dict();

        assert_eq!(dict.get("type").unwrap(), "DeliveryError");
        assert_eq!(dict.get("recipient").unwrap(), "ops@example.com");
        assert!(dict.get("message").unwrap().as_str().unwrap().contains("HTTP 502"));
    }

    #[test]
    fn test_from_serde_json_error() {
        let parse_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err: DigestError = parse_err.into();
        assert_eq!(err.kind(), "SerializationError");
    }
}
