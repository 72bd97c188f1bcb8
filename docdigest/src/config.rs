//! Application configuration.
//!
//! Configuration is layered: built-in defaults, then an optional TOML file,
//! then a `.env` file and the process environment. Only the secrets and the
//! handful of values that differ per deployment have environment overrides.
//!
//! ```toml
//! [pipeline]
//! document_id = "1AbC..."
//! recipient = "me@example.com"
//!
//! [retry]
//! max_attempts = 3
//! rate_limit_base_secs = 10
//!
//! [schedule]
//! period_minutes = 5
//! ```

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

use crate::errors::DigestError;
use crate::invoker::{BackoffSchedule, RetryPolicy};

/// Default values for configuration.
mod defaults {
    use std::path::PathBuf;

    pub fn prompt_template() -> String {
        "以下のテキストを日本語で簡潔に要約してください:\n\n{text}".to_string()
    }

    pub fn generation_base_url() -> String {
        "https://generativelanguage.googleapis.com/v1beta".to_string()
    }

    pub fn generation_model() -> String {
        "gemini-2.5-flash".to_string()
    }

    pub fn documents_base_url() -> String {
        "https://www.googleapis.com/drive/v3".to_string()
    }

    pub fn output_file_name() -> String {
        "summary-document.pdf".to_string()
    }

    pub const fn documents_timeout_secs() -> u64 {
        60
    }

    pub fn subject() -> String {
        "Document summary completed".to_string()
    }

    pub fn sender_name() -> String {
        "Document Summary System".to_string()
    }

    pub fn body_template() -> String {
        "The document summary is ready.\n\n[Summary]\n{summary}\n\nThe PDF file is attached."
            .to_string()
    }

    pub const fn max_attempts() -> usize {
        3
    }

    pub const fn rate_limit_base_secs() -> u64 {
        10
    }

    pub const fn generic_base_secs() -> u64 {
        5
    }

    pub const fn backoff_factor() -> u32 {
        2
    }

    pub const fn request_timeout_secs() -> u64 {
        60
    }

    pub const fn period_minutes() -> u64 {
        5
    }

    pub fn status_path() -> PathBuf {
        "./data/status.json".into()
    }
}

/// Longest accepted trigger period: one week.
pub const MAX_PERIOD_MINUTES: u64 = 7 * 24 * 60;

/// Environment variable names.
pub mod env_keys {
    /// Source document id.
    pub const DOCUMENT_ID: &str = "DOCDIGEST_DOCUMENT_ID";
    /// Text-generation api key.
    pub const API_KEY: &str = "DOCDIGEST_API_KEY";
    /// Fallback name for the api key.
    pub const GEMINI_API_KEY: &str = "GEMINI_API_KEY";
    /// Notification recipient.
    pub const RECIPIENT: &str = "DOCDIGEST_RECIPIENT";
    /// Bearer token for the document store.
    pub const ACCESS_TOKEN: &str = "DOCDIGEST_ACCESS_TOKEN";
    /// Notification webhook URL.
    pub const WEBHOOK_URL: &str = "DOCDIGEST_WEBHOOK_URL";
    /// Status file path.
    pub const STATUS_PATH: &str = "DOCDIGEST_STATUS_PATH";
    /// Trigger period in minutes.
    pub const PERIOD_MINUTES: &str = "DOCDIGEST_PERIOD_MINUTES";
}

/// A string that never appears in `Debug` or `Display` output.
#[derive(Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct SecretString(String);

impl SecretString {
    /// Wraps a secret.
    #[must_use]
    pub fn new(secret: impl Into<String>) -> Self {
        Self(secret.into())
    }

    /// Returns the secret value.
    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }

    /// Returns true if the secret is empty or whitespace.
    #[must_use]
    pub fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl std::fmt::Debug for SecretString {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("[REDACTED]")
    }
}

impl std::fmt::Display for SecretString {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("[REDACTED]")
    }
}

/// Per-run pipeline inputs. Immutable for the duration of a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineConfig {
    /// Document to summarize.
    pub source_document_id: String,
    /// Text-generation api key.
    pub api_key: SecretString,
    /// Identity receiving the notification.
    pub recipient: String,
}

/// Pipeline configuration section.
#[derive(Debug, Clone, Deserialize)]
pub struct PipelineSection {
    /// Document to summarize. An empty id makes every run fail with a status record.
    #[serde(default)]
    pub document_id: String,
    /// Text-generation api key.
    #[serde(default)]
    pub api_key: Option<SecretString>,
    /// Identity receiving the notification.
    #[serde(default)]
    pub recipient: String,
    /// Instruction template; `{text}` is replaced by the document text.
    #[serde(default = "defaults::prompt_template")]
    pub prompt_template: String,
}

impl Default for PipelineSection {
    fn default() -> Self {
        Self {
            document_id: String::new(),
            api_key: None,
            recipient: String::new(),
            prompt_template: defaults::prompt_template(),
        }
    }
}

/// Text-generation service section.
#[derive(Debug, Clone, Deserialize)]
pub struct GenerationSection {
    /// API base URL.
    #[serde(default = "defaults::generation_base_url")]
    pub base_url: String,
    /// Model name.
    #[serde(default = "defaults::generation_model")]
    pub model: String,
}

impl Default for GenerationSection {
    fn default() -> Self {
        Self {
            base_url: defaults::generation_base_url(),
            model: defaults::generation_model(),
        }
    }
}

/// Document store section.
#[derive(Debug, Clone, Deserialize)]
pub struct DocumentsSection {
    /// API base URL.
    #[serde(default = "defaults::documents_base_url")]
    pub base_url: String,
    /// Bearer token.
    #[serde(default)]
    pub access_token: Option<SecretString>,
    /// File name given to the converted artifact.
    #[serde(default = "defaults::output_file_name")]
    pub output_file_name: String,
    /// Per-request timeout in seconds.
    #[serde(default = "defaults::documents_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for DocumentsSection {
    fn default() -> Self {
        Self {
            base_url: defaults::documents_base_url(),
            access_token: None,
            output_file_name: defaults::output_file_name(),
            timeout_secs: defaults::documents_timeout_secs(),
        }
    }
}

/// Notification section.
#[derive(Debug, Clone, Deserialize)]
pub struct NotifySection {
    /// Webhook receiving notifications.
    #[serde(default)]
    pub webhook_url: Option<String>,
    /// Message subject.
    #[serde(default = "defaults::subject")]
    pub subject: String,
    /// Display name of the sender.
    #[serde(default = "defaults::sender_name")]
    pub sender_name: String,
    /// Body template; `{summary}` is replaced by the summary text.
    #[serde(default = "defaults::body_template")]
    pub body_template: String,
}

impl Default for NotifySection {
    fn default() -> Self {
        Self {
            webhook_url: None,
            subject: defaults::subject(),
            sender_name: defaults::sender_name(),
            body_template: defaults::body_template(),
        }
    }
}

/// Retry section.
#[derive(Debug, Clone, Deserialize)]
pub struct RetrySection {
    /// Attempts including the first.
    #[serde(default = "defaults::max_attempts")]
    pub max_attempts: usize,
    /// First wait after a 429, in seconds.
    #[serde(default = "defaults::rate_limit_base_secs")]
    pub rate_limit_base_secs: u64,
    /// First wait after any other failure, in seconds.
    #[serde(default = "defaults::generic_base_secs")]
    pub generic_base_secs: u64,
    /// Multiplier between consecutive waits.
    #[serde(default = "defaults::backoff_factor")]
    pub backoff_factor: u32,
    /// Timeout of each generation call, in seconds.
    #[serde(default = "defaults::request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl Default for RetrySection {
    fn default() -> Self {
        Self {
            max_attempts: defaults::max_attempts(),
            rate_limit_base_secs: defaults::rate_limit_base_secs(),
            generic_base_secs: defaults::generic_base_secs(),
            backoff_factor: defaults::backoff_factor(),
            request_timeout_secs: defaults::request_timeout_secs(),
        }
    }
}

impl RetrySection {
    /// Builds the invoker policy.
    ///
    /// The rate-limit table has one entry per attempt, the generic table one
    /// per retry.
    #[must_use]
    pub fn policy(&self) -> RetryPolicy {
        let attempts = self.max_attempts.max(1);
        RetryPolicy::new()
            .with_max_attempts(attempts)
            .with_rate_limit_backoff(BackoffSchedule::exponential(
                Duration::from_secs(self.rate_limit_base_secs),
                self.backoff_factor,
                attempts,
            ))
            .with_generic_backoff(BackoffSchedule::exponential(
                Duration::from_secs(self.generic_base_secs),
                self.backoff_factor,
                attempts - 1,
            ))
            .with_request_timeout(Duration::from_secs(self.request_timeout_secs))
    }
}

/// Schedule section.
#[derive(Debug, Clone, Deserialize)]
pub struct ScheduleSection {
    /// Trigger period in minutes.
    #[serde(default = "defaults::period_minutes")]
    pub period_minutes: u64,
}

impl Default for ScheduleSection {
    fn default() -> Self {
        Self {
            period_minutes: defaults::period_minutes(),
        }
    }
}

impl ScheduleSection {
    /// Trigger period.
    #[must_use]
    pub fn period(&self) -> Duration {
        Duration::from_secs(self.period_minutes.saturating_mul(60))
    }
}

/// Status storage section.
#[derive(Debug, Clone, Deserialize)]
pub struct StatusSection {
    /// File holding the two status cells.
    #[serde(default = "defaults::status_path")]
    pub path: PathBuf,
}

impl Default for StatusSection {
    fn default() -> Self {
        Self {
            path: defaults::status_path(),
        }
    }
}

/// Complete application configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    /// Pipeline inputs.
    #[serde(default)]
    pub pipeline: PipelineSection,
    /// Text-generation service.
    #[serde(default)]
    pub generation: GenerationSection,
    /// Document store.
    #[serde(default)]
    pub documents: DocumentsSection,
    /// Notification channel.
    #[serde(default)]
    pub notify: NotifySection,
    /// Invoker retry policy.
    #[serde(default)]
    pub retry: RetrySection,
    /// Recurring trigger.
    #[serde(default)]
    pub schedule: ScheduleSection,
    /// Status storage.
    #[serde(default)]
    pub status: StatusSection,
}

impl AppConfig {
    /// Loads defaults, the optional TOML file, `.env` and the process environment.
    pub fn load(path: Option<&Path>) -> Result<Self, DigestError> {
        // a missing .env is fine
        let _ = dotenvy::dotenv();

        let mut config = match path {
            Some(path) => {
                info!("Loading configuration from file: {}", path.display());
                Self::from_toml_file(path)?
            }
            None => Self::default(),
        };

        config.apply_env_with(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Parses a TOML file.
    pub fn from_toml_file(path: &Path) -> Result<Self, DigestError> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            DigestError::config("config_file", format!("failed to read {}: {e}", path.display()))
        })?;
        Self::from_toml_str(&contents)
    }

    /// Parses TOML text.
    pub fn from_toml_str(contents: &str) -> Result<Self, DigestError> {
        toml::from_str(contents)
            .map_err(|e| DigestError::config("config_file", format!("failed to parse TOML: {e}")))
    }

    /// Applies environment overrides read through `lookup`.
    pub fn apply_env_with<F>(&mut self, lookup: F) -> Result<(), DigestError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(id) = lookup(env_keys::DOCUMENT_ID) {
            self.pipeline.document_id = id;
        }
        if let Some(key) = lookup(env_keys::API_KEY).or_else(|| lookup(env_keys::GEMINI_API_KEY)) {
            self.pipeline.api_key = Some(SecretString::new(key));
        }
        if let Some(recipient) = lookup(env_keys::RECIPIENT) {
            self.pipeline.recipient = recipient;
        }
        if let Some(token) = lookup(env_keys::ACCESS_TOKEN) {
            self.documents.access_token = Some(SecretString::new(token));
        }
        if let Some(url) = lookup(env_keys::WEBHOOK_URL) {
            self.notify.webhook_url = Some(url);
        }
        if let Some(path) = lookup(env_keys::STATUS_PATH) {
            self.status.path = PathBuf::from(path);
        }
        if let Some(raw) = lookup(env_keys::PERIOD_MINUTES) {
            self.schedule.period_minutes = raw.trim().parse::<u64>().map_err(|e| {
                DigestError::config(
                    env_keys::PERIOD_MINUTES,
                    format!("'{raw}' is not a whole number of minutes: {e}"),
                )
            })?;
        }
        Ok(())
    }

    /// Rejects values no run could succeed with.
    pub fn validate(&self) -> Result<(), DigestError> {
        if self.schedule.period_minutes == 0 {
            return Err(DigestError::config("schedule.period_minutes", "must be at least 1"));
        }
        if self.schedule.period_minutes > MAX_PERIOD_MINUTES {
            return Err(DigestError::config(
                "schedule.period_minutes",
                format!("must be at most {MAX_PERIOD_MINUTES} (one week)"),
            ));
        }
        if self.retry.request_timeout_secs == 0 {
            return Err(DigestError::config("retry.request_timeout_secs", "must be at least 1"));
        }
        if self.documents.timeout_secs == 0 {
            return Err(DigestError::config("documents.timeout_secs", "must be at least 1"));
        }
        if self.retry.max_attempts == 0 {
            return Err(DigestError::config("retry.max_attempts", "must be at least 1"));
        }
        if self.retry.backoff_factor == 0 {
            return Err(DigestError::config("retry.backoff_factor", "must be at least 1"));
        }
        if !self.pipeline.prompt_template.contains("{text}") {
            return Err(DigestError::config(
                "pipeline.prompt_template",
                "must contain the {text} placeholder",
            ));
        }
        if !self.notify.body_template.contains("{summary}") {
            return Err(DigestError::config(
                "notify.body_template",
                "must contain the {summary} placeholder",
            ));
        }
        Ok(())
    }

    /// Builds the per-run pipeline inputs.
    ///
    /// The api key and recipient are required. The document id is not: an
    /// empty id is reported through the status record of each run.
    pub fn pipeline_config(&self) -> Result<PipelineConfig, DigestError> {
        let api_key = self
            .pipeline
            .api_key
            .clone()
            .filter(|key| !key.is_blank())
            .ok_or_else(|| {
                DigestError::config(
                    "pipeline.api_key",
                    format!("missing: set {} or pipeline.api_key", env_keys::API_KEY),
                )
            })?;

        if self.pipeline.recipient.trim().is_empty() {
            return Err(DigestError::config(
                "pipeline.recipient",
                format!("missing: set {} or pipeline.recipient", env_keys::RECIPIENT),
            ));
        }

        Ok(PipelineConfig {
            source_document_id: self.pipeline.document_id.trim().to_string(),
            api_key,
            recipient: self.pipeline.recipient.trim().to_string(),
        })
    }
}
