//! Event sink system for observability.
//!
//! The orchestrator and the resilient invoker report step and attempt
//! lifecycle as [`RunEvent`]s recorded by an [`EventSink`]. Production wiring uses
//! [`LoggingEventSink`]; tests use [`CollectingEventSink`] to assert on the
//! exact sequence of events a run produced.

mod sink;

pub use sink::{CollectingEventSink, EventSink, LoggingEventSink, NoOpEventSink, RunEvent};

/// Event emitted once when a pipeline run begins.
pub const PIPELINE_STARTED: &str = "pipeline.started";
/// Event emitted once when a pipeline run ends, on every exit path.
pub const PIPELINE_COMPLETED: &str = "pipeline.completed";
/// Event emitted before each pipeline step.
pub const STEP_STARTED: &str = "pipeline.step.started";
/// Event emitted after a step succeeds.
pub const STEP_COMPLETED: &str = "pipeline.step.completed";
/// Event emitted after a step fails.
pub const STEP_FAILED: &str = "pipeline.step.failed";
/// Event emitted after every invoker attempt.
pub const INVOKER_ATTEMPT: &str = "invoker.attempt";
/// Event emitted when a run is skipped because another one is in flight.
pub const RUN_SKIPPED: &str = "pipeline.run_skipped";
