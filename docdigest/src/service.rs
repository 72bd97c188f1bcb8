//! Entry points: `run_pipeline_once`, `start` and `stop`.
//!
//! [`DigestService::from_config`] wires the HTTP adapters, the file status
//! store and the tokio scheduler together. Tests build the same service over
//! fakes with [`DigestService::new`].

use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use crate::config::{env_keys, AppConfig, PipelineConfig};
use crate::document::DriveDocumentSource;
use crate::errors::DigestError;
use crate::events::{EventSink, LoggingEventSink, NoOpEventSink, RunEvent, RUN_SKIPPED};
use crate::generation::HttpGenerationTransport;
use crate::invoker::ResilientInvoker;
use crate::notify::WebhookNotifier;
use crate::pipeline::{PipelineSettings, SummaryPipeline};
use crate::scheduler::{entry_point, TokioScheduler};
use crate::status::{ExecutionRecord, FileStatusStore, StatusReporter};
use crate::trigger::{TriggerManager, TriggerState, PIPELINE_ENTRY_POINT};

/// Runs the pipeline, never more than one run at a time.
pub struct PipelineRunner {
    pipeline: SummaryPipeline,
    config: PipelineConfig,
    in_flight: tokio::sync::Mutex<()>,
    events: Arc<dyn EventSink>,
}

impl std::fmt::Debug for PipelineRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipelineRunner")
            .field("pipeline", &self.pipeline)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl PipelineRunner {
    /// Creates a runner for `config`.
    #[must_use]
    pub fn new(pipeline: SummaryPipeline, config: PipelineConfig) -> Self {
        Self {
            pipeline,
            config,
            in_flight: tokio::sync::Mutex::new(()),
            events: Arc::new(NoOpEventSink),
        }
    }

    /// Sets the sink receiving skipped-run events.
    #[must_use]
    pub fn with_event_sink(mut self, events: Arc<dyn EventSink>) -> Self {
        self.events = events;
        self
    }

    /// Executes one run, or returns `None` if another run is in flight.
    ///
    /// A skipped call writes no execution record.
    pub async fn run_once(&self) -> Option<ExecutionRecord> {
        let Ok(_guard) = self.in_flight.try_lock() else {
            warn!(
                document_id = %self.config.source_document_id,
                "Pipeline run already in progress; skipping"
            );
            self.events.record(RunEvent::new(
                RUN_SKIPPED,
                json!({ "document_id": self.config.source_document_id }),
            ));
            return None;
        };

        Some(self.pipeline.run(&self.config).await)
    }
}

/// The document digest service.
#[derive(Debug)]
pub struct DigestService {
    runner: Arc<PipelineRunner>,
    triggers: TriggerManager,
}

impl DigestService {
    /// Creates a service whose trigger runs `runner` every `period`.
    #[must_use]
    pub fn new(runner: Arc<PipelineRunner>, period: Duration) -> Self {
        let scheduler = TokioScheduler::new();
        let entry_runner = runner.clone();
        scheduler.register(
            PIPELINE_ENTRY_POINT,
            entry_point(move || {
                let runner = entry_runner.clone();
                async move {
                    runner.run_once().await;
                }
            }),
        );

        Self {
            runner,
            triggers: TriggerManager::new(Arc::new(scheduler)).with_period(period),
        }
    }

    /// Builds the production service from configuration.
    pub fn from_config(config: &AppConfig) -> Result<Self, DigestError> {
        config.validate()?;
        let pipeline_config = config.pipeline_config()?;
        let events: Arc<dyn EventSink> = Arc::new(LoggingEventSink::info());

        let webhook_url = config.notify.webhook_url.clone().ok_or_else(|| {
            DigestError::config(
                "notify.webhook_url",
                format!("missing: set {} or notify.webhook_url", env_keys::WEBHOOK_URL),
            )
        })?;
        let http_timeout = Duration::from_secs(config.documents.timeout_secs);

        let documents = DriveDocumentSource::new(
            config.documents.base_url.clone(),
            config.documents.access_token.clone(),
            http_timeout,
        )?
        .with_output_file_name(config.documents.output_file_name.clone());
        let policy = config.retry.policy();
        let transport = HttpGenerationTransport::new(
            &config.generation.base_url,
            &config.generation.model,
            policy.request_timeout,
        )?;
        let notifier = WebhookNotifier::new(webhook_url, http_timeout)?;
        let store = FileStatusStore::new(config.status.path.clone());
        let reporter = StatusReporter::new(Arc::new(store));

        let pipeline = SummaryPipeline::new(
            Arc::new(documents),
            Arc::new(transport),
            Arc::new(notifier),
            reporter,
        )
        .with_invoker(ResilientInvoker::new(policy).with_event_sink(events.clone()))
        .with_event_sink(events.clone())
        .with_settings(PipelineSettings::from_config(config));

        info!(
            document_id = %pipeline_config.source_document_id,
            model = %config.generation.model,
            status_path = %config.status.path.display(),
            period_minutes = config.schedule.period_minutes,
            "Digest service configured"
        );

        let runner = PipelineRunner::new(pipeline, pipeline_config).with_event_sink(events);
        Ok(Self::new(Arc::new(runner), config.schedule.period()))
    }

    /// Runs the pipeline once. Returns `None` if a run was already in flight.
    pub async fn run_pipeline_once(&self) -> Option<ExecutionRecord> {
        self.runner.run_once().await
    }

    /// Installs the recurring trigger, replacing any existing one.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(&self) -> Result<(), DigestError> {
        self.triggers.start()
    }

    /// Removes the recurring trigger. A run already in flight finishes.
    pub fn stop(&self) -> Result<(), DigestError> {
        self.triggers.stop()
    }

    /// Returns whether the recurring trigger is installed.
    #[must_use]
    pub fn trigger_state(&self) -> TriggerState {
        self.triggers.state()
    }
}
