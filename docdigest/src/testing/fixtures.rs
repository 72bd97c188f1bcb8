//! Test fixtures for pipeline testing.

use std::sync::Arc;
use std::time::Duration;

use super::mocks::{FakeDocumentSource, RecordingNotifier, RecordingSleeper, ScriptedTransport};
use crate::config::{PipelineConfig, SecretString};
use crate::errors::DigestError;
use crate::events::CollectingEventSink;
use crate::invoker::{ResilientInvoker, RetryPolicy, TransportResponse};
use crate::pipeline::SummaryPipeline;
use crate::status::{InMemoryStatusStore, StatusReporter};

/// Document id used by [`TestHarness::config`].
pub const TEST_DOCUMENT_ID: &str = "doc-123";
/// Recipient used by [`TestHarness::config`].
pub const TEST_RECIPIENT: &str = "me@example.com";
/// Api key used by [`TestHarness::config`].
pub const TEST_API_KEY: &str = "test-key";

/// Builds a `generateContent` 200 body whose first candidate carries `text`.
#[must_use]
pub fn generate_response_body(text: &str) -> String {
    serde_json::json!({
        "candidates": [{
            "content": { "parts": [{ "text": text }], "role": "model" },
            "finishReason": "STOP"
        }]
    })
    .to_string()
}

/// Every fake a pipeline needs, wired together.
///
/// The fakes stay reachable through the public fields so tests can script
/// them and inspect what the pipeline did.
#[derive(Debug)]
pub struct TestHarness {
    /// Document source.
    pub documents: Arc<FakeDocumentSource>,
    /// Generation transport.
    pub transport: Arc<ScriptedTransport>,
    /// Notification channel.
    pub notifier: Arc<RecordingNotifier>,
    /// Invoker sleeper.
    pub sleeper: Arc<RecordingSleeper>,
    /// Status storage.
    pub status: Arc<InMemoryStatusStore>,
    /// Pipeline and invoker events.
    pub events: Arc<CollectingEventSink>,
}

impl TestHarness {
    /// Creates a harness whose document contains `text`.
    #[must_use]
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            documents: Arc::new(FakeDocumentSource::new(text)),
            transport: Arc::new(ScriptedTransport::new()),
            notifier: Arc::new(RecordingNotifier::new()),
            sleeper: Arc::new(RecordingSleeper::new()),
            status: Arc::new(InMemoryStatusStore::new()),
            events: Arc::new(CollectingEventSink::new()),
        }
    }

    /// Creates a harness whose fetch step fails with `message`.
    #[must_use]
    pub fn failing_fetch(message: impl Into<String>) -> Self {
        let harness = Self::new("");
        harness.documents.set_fetch_error(message);
        harness
    }

    /// Appends generation responses to the script.
    #[must_use]
    pub fn with_responses(self, responses: Vec<Result<TransportResponse, DigestError>>) -> Self {
        for response in responses {
            self.transport.push(response);
        }
        self
    }

    /// Delays every document call.
    #[must_use]
    pub fn with_document_latency(self, latency: Duration) -> Self {
        self.documents.set_latency(latency);
        self
    }

    /// Makes conversion fail.
    #[must_use]
    pub fn with_conversion_error(self, message: impl Into<String>) -> Self {
        self.documents.set_conversion_error(message);
        self
    }

    /// Makes delivery fail.
    #[must_use]
    pub fn with_delivery_error(self, message: impl Into<String>) -> Self {
        self.notifier.set_failure(message);
        self
    }

    /// Per-run inputs pointing at the fake document.
    #[must_use]
    pub fn config(&self) -> PipelineConfig {
        PipelineConfig {
            source_document_id: TEST_DOCUMENT_ID.to_string(),
            api_key: SecretString::new(TEST_API_KEY),
            recipient: TEST_RECIPIENT.to_string(),
        }
    }

    /// Builds a pipeline over the fakes with the default retry policy.
    #[must_use]
    pub fn pipeline(&self) -> SummaryPipeline {
        let invoker = ResilientInvoker::new(RetryPolicy::default())
            .with_sleeper(self.sleeper.clone())
            .with_event_sink(self.events.clone());

        SummaryPipeline::new(
            self.documents.clone(),
            self.transport.clone(),
            self.notifier.clone(),
            StatusReporter::new(self.status.clone()),
        )
        .with_invoker(invoker)
        .with_event_sink(self.events.clone())
    }
}
