//! Pipeline orchestrator: fetch, summarize, convert, notify.
//!
//! Steps run in order and the run halts at the first failure. Whatever
//! happens, a run ends in exactly one [`ExecutionRecord`], which is handed to
//! the status reporter before [`SummaryPipeline::run`] returns.

mod settings;

pub use settings::PipelineSettings;

use serde_json::json;
use std::future::Future;
use std::sync::Arc;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use crate::config::{PipelineConfig, SecretString};
use crate::document::DocumentSource;
use crate::errors::DigestError;
use crate::events::{
    EventSink, NoOpEventSink, RunEvent, PIPELINE_COMPLETED, PIPELINE_STARTED, STEP_COMPLETED,
    STEP_FAILED, STEP_STARTED,
};
use crate::generation::{parse_generate_response, GenerateRequest, GenerationTransport};
use crate::invoker::{ResilientInvoker, RetryPolicy};
use crate::notify::{render_body, Notification, Notifier};
use crate::status::{ExecutionRecord, StatusReporter};

/// Detail written for a run where every step succeeded.
pub const SUCCESS_DETAIL: &str = "success: summary generated, PDF converted, notification sent";

/// Step names used in logs and events.
pub mod steps {
    /// Input validation.
    pub const VALIDATE: &str = "validate";
    /// Reading the document text.
    pub const FETCH: &str = "fetch";
    /// Generating the summary.
    pub const SUMMARIZE: &str = "summarize";
    /// Converting the document to PDF.
    pub const CONVERT: &str = "convert";
    /// Sending the notification.
    pub const NOTIFY: &str = "notify";
}

/// Runs one summary pipeline per call.
pub struct SummaryPipeline {
    documents: Arc<dyn DocumentSource>,
    transport: Arc<dyn GenerationTransport>,
    notifier: Arc<dyn Notifier>,
    reporter: StatusReporter,
    invoker: ResilientInvoker,
    events: Arc<dyn EventSink>,
    settings: PipelineSettings,
}

impl std::fmt::Debug for SummaryPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SummaryPipeline")
            .field("invoker", &self.invoker)
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

impl SummaryPipeline {
    /// Creates a pipeline with the default retry policy and templates.
    #[must_use]
    pub fn new(
        documents: Arc<dyn DocumentSource>,
        transport: Arc<dyn GenerationTransport>,
        notifier: Arc<dyn Notifier>,
        reporter: StatusReporter,
    ) -> Self {
        Self {
            documents,
            transport,
            notifier,
            reporter,
            invoker: ResilientInvoker::new(RetryPolicy::default()),
            events: Arc::new(NoOpEventSink),
            settings: PipelineSettings::default(),
        }
    }

    /// Replaces the invoker used for the summarize step.
    #[must_use]
    pub fn with_invoker(mut self, invoker: ResilientInvoker) -> Self {
        self.invoker = invoker;
        self
    }

    /// Sets the event sink for step lifecycle events.
    #[must_use]
    pub fn with_event_sink(mut self, events: Arc<dyn EventSink>) -> Self {
        self.events = events;
        self
    }

    /// Replaces the prompt and notification templates.
    #[must_use]
    pub fn with_settings(mut self, settings: PipelineSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Executes one run and reports its record.
    pub async fn run(&self, config: &PipelineConfig) -> ExecutionRecord {
        let started = Instant::now();
        info!(document_id = %config.source_document_id, "Pipeline run started");
        self.events.record(RunEvent::new(
            PIPELINE_STARTED,
            json!({ "document_id": config.source_document_id }),
        ));

        let result = self.execute(config).await;
        let duration_seconds = started.elapsed().as_secs_f64();

        let record = match result {
            Ok(()) => {
                info!(duration_seconds, "Pipeline run completed");
                ExecutionRecord::success(SUCCESS_DETAIL, duration_seconds)
            }
            Err(err) => {
                error!(error = %err, kind = err.kind(), duration_seconds, "Pipeline run failed");
                ExecutionRecord::failure(err.to_string(), duration_seconds)
            }
        };

        self.events.record(RunEvent::new(
            PIPELINE_COMPLETED,
            json!({
                "outcome": record.outcome,
                "detail": record.detail,
                "duration_seconds": record.duration_seconds,
            }),
        ));
        self.reporter.report(&record).await;
        record
    }

    async fn execute(&self, config: &PipelineConfig) -> Result<(), DigestError> {
        let document_id = config.source_document_id.trim();
        self.step(steps::VALIDATE, async {
            if document_id.is_empty() {
                Err(DigestError::MissingDocumentId)
            } else {
                Ok(())
            }
        })
        .await?;

        let text = self.step(steps::FETCH, self.documents.get_text(document_id)).await?;
        debug!(chars = text.chars().count(), "Fetched document text");

        let summary = self.step(steps::SUMMARIZE, self.summarize(&text, &config.api_key)).await?;

        let artifact = self
            .step(steps::CONVERT, self.documents.convert_to_output_format(document_id))
            .await?;

        let notification = Notification::new(
            config.recipient.clone(),
            self.settings.sender_name.clone(),
            self.settings.subject.clone(),
            render_body(&self.settings.body_template, &summary),
            artifact,
        );
        self.step(steps::NOTIFY, self.notifier.send(&notification)).await
    }

    async fn summarize(&self, text: &str, api_key: &SecretString) -> Result<String, DigestError> {
        let request = GenerateRequest::from_prompt(self.settings.render_prompt(text));

        self.invoker
            .invoke_with(
                "generate_summary",
                || self.transport.send(&request, api_key),
                |body| {
                    let response = parse_generate_response(body)?;
                    response.first_text().map(str::to_owned)
                },
            )
            .await
            .into_result()
    }

    async fn step<T, Fut>(&self, name: &str, fut: Fut) -> Result<T, DigestError>
    where
        Fut: Future<Output = Result<T, DigestError>>,
    {
        self.events
            .record(RunEvent::new(STEP_STARTED, json!({ "step": name })));
        let started = Instant::now();

        let result = fut.await;
        let duration_ms = started.elapsed().as_secs_f64() * 1000.0;

        match &result {
            Ok(_) => {
                debug!(step = name, duration_ms, "Step completed");
                self.events.record(RunEvent::new(
                    STEP_COMPLETED,
                    json!({ "step": name, "duration_ms": duration_ms }),
                ));
            }
            Err(err) => {
                warn!(step = name, error = %err, "Step failed");
                self.events.record(RunEvent::new(
                    STEP_FAILED,
                    json!({
                        "step": name,
                        "duration_ms": duration_ms,
                        "error": err.to_dict(),
                    }),
                ));
            }
        }
        result
    }
}
