//! Run events and the sinks that receive them.

use parking_lot::Mutex;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, trace, Level};

/// A lifecycle event from a run or from the invoker.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunEvent {
    /// Dotted event name, one of the constants in [`crate::events`].
    pub name: &'static str,
    /// Structured payload. `Value::Null` when the event carries nothing.
    pub data: Value,
}

impl RunEvent {
    /// Creates an event with a payload.
    #[must_use]
    pub const fn new(name: &'static str, data: Value) -> Self {
        Self { name, data }
    }

    /// Creates an event with no payload.
    #[must_use]
    pub const fn bare(name: &'static str) -> Self {
        Self::new(name, Value::Null)
    }

    /// Returns true if the event name starts with `prefix`.
    #[must_use]
    pub fn is(&self, prefix: &str) -> bool {
        self.name.starts_with(prefix)
    }
}

/// Receives run events.
///
/// Recording happens inline on the run's task, so implementations must not
/// block and must not fail.
pub trait EventSink: Send + Sync {
    /// Records one event.
    fn record(&self, event: RunEvent);
}

/// Discards every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpEventSink;

impl EventSink for NoOpEventSink {
    fn record(&self, _event: RunEvent) {}
}

/// Writes events to the tracing subscriber at a fixed level.
#[derive(Debug, Clone)]
pub struct LoggingEventSink {
    level: Level,
}

impl Default for LoggingEventSink {
    fn default() -> Self {
        Self::new(Level::DEBUG)
    }
}

impl LoggingEventSink {
    /// Logs at `level`. Levels above `INFO` are logged at `INFO`.
    #[must_use]
    pub const fn new(level: Level) -> Self {
        Self { level }
    }

    /// Logs at `INFO`.
    #[must_use]
    pub const fn info() -> Self {
        Self::new(Level::INFO)
    }
}

impl EventSink for LoggingEventSink {
    fn record(&self, event: RunEvent) {
        let RunEvent { name, data } = event;
        match self.level {
            Level::TRACE => trace!(event = name, data = %data, "Run event"),
            Level::DEBUG => debug!(event = name, data = %data, "Run event"),
            _ => info!(event = name, data = %data, "Run event"),
        }
    }
}

/// Keeps every event in memory, in arrival order.
#[derive(Debug, Default)]
pub struct CollectingEventSink {
    events: Mutex<Vec<RunEvent>>,
}

impl CollectingEventSink {
    /// Creates an empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of every recorded event.
    #[must_use]
    pub fn events(&self) -> Vec<RunEvent> {
        self.events.lock().clone()
    }

    /// Returns the recorded event names in order.
    #[must_use]
    pub fn names(&self) -> Vec<&'static str> {
        self.events.lock().iter().map(|e| e.name).collect()
    }

    /// Returns the recorded events whose name starts with `prefix`.
    #[must_use]
    pub fn matching(&self, prefix: &str) -> Vec<RunEvent> {
        self.events
            .lock()
            .iter()
            .filter(|e| e.is(prefix))
            .cloned()
            .collect()
    }

    /// Number of recorded events.
    #[must_use]
    pub fn len(&self) -> usize {
        self.events.lock().len()
    }

    /// Returns true if nothing was recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.lock().is_empty()
    }
}

impl EventSink for CollectingEventSink {
    fn record(&self, event: RunEvent) {
        self.events.lock().push(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{INVOKER_ATTEMPT, PIPELINE_STARTED, STEP_COMPLETED, STEP_STARTED};
    use serde_json::json;

    #[test]
    fn test_collecting_sink_keeps_order() {
        let sink = CollectingEventSink::new();
        assert!(sink.is_empty());

        sink.record(RunEvent::new(PIPELINE_STARTED, json!({ "document_id": "doc" })));
        sink.record(RunEvent::new(STEP_STARTED, json!({ "step": "fetch" })));

        assert_eq!(sink.len(), 2);
        assert_eq!(sink.names(), vec![PIPELINE_STARTED, STEP_STARTED]);
        assert_eq!(sink.events()[1].data["step"], "fetch");
    }

    #[test]
    fn test_matching_filters_by_prefix() {
        let sink = CollectingEventSink::new();
        sink.record(RunEvent::bare(STEP_STARTED));
        sink.record(RunEvent::bare(STEP_COMPLETED));
        sink.record(RunEvent::bare(INVOKER_ATTEMPT));

        assert_eq!(sink.matching("pipeline.step.").len(), 2);
        assert_eq!(sink.matching("invoker.").len(), 1);
    }

    #[test]
    fn test_bare_event_serializes_null_data() {
        let event = RunEvent::bare(PIPELINE_STARTED);
        assert_eq!(
            serde_json::to_value(&event).unwrap(),
            json!({ "name": "pipeline.started", "data": null })
        );
    }

    #[test]
    fn test_logging_and_noop_sinks_accept_events() {
        LoggingEventSink::info().record(RunEvent::bare(PIPELINE_STARTED));
        LoggingEventSink::default().record(RunEvent::new(STEP_STARTED, json!({ "step": "x" })));
        NoOpEventSink.record(RunEvent::bare(PIPELINE_STARTED));
    }
}
