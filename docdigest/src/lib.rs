//! # Docdigest
//!
//! A scheduled pipeline that summarizes a document and delivers the result.
//!
//! Each run:
//!
//! - **Fetches** the text of a source document
//! - **Summarizes** it through a text-generation service, retrying with
//!   separate backoff tables for rate limits and other failures
//! - **Converts** the document to PDF
//! - **Notifies** a recipient with the summary and the PDF attached
//!
//! and records its outcome and duration in a status location. A trigger
//! manager keeps at most one recurring trigger installed.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use docdigest::prelude::*;
//!
//! let config = AppConfig::load(None)?;
//! let service = DigestService::from_config(&config)?;
//!
//! // One run
//! let record = service.run_pipeline_once().await;
//!
//! // Every five minutes
//! service.start()?;
//! ```

#![forbid(unsafe_code)]
#![warn(
    clippy::all,
    clippy::pedantic,
    missing_docs,
    rust_2018_idioms
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

pub mod config;
pub mod document;
pub mod errors;
pub mod events;
pub mod generation;
pub mod invoker;
pub mod notify;
pub mod observability;
pub mod pipeline;
pub mod scheduler;
pub mod service;
pub mod status;
pub mod testing;
pub mod trigger;
pub mod utils;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::config::{AppConfig, PipelineConfig, SecretString};
    pub use crate::document::{Artifact, DocumentSource, DriveDocumentSource};
    pub use crate::errors::DigestError;
    pub use crate::events::{
        CollectingEventSink, EventSink, LoggingEventSink, NoOpEventSink, RunEvent,
    };
    pub use crate::generation::{GenerationTransport, HttpGenerationTransport};
    pub use crate::invoker::{
        BackoffSchedule, ResilientInvoker, RetryPolicy, StepResult, TransportResponse,
    };
    pub use crate::notify::{Notification, Notifier, WebhookNotifier};
    pub use crate::pipeline::{PipelineSettings, SummaryPipeline};
    pub use crate::scheduler::{ScheduleHandle, Scheduler, TokioScheduler};
    pub use crate::service::{DigestService, PipelineRunner};
    pub use crate::status::{ExecutionRecord, Outcome, StatusReporter, StatusStore};
    pub use crate::trigger::{TriggerManager, TriggerState};
    pub use crate::utils::Timestamp;
}
