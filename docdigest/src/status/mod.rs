//! Execution records and the status reporter.
//!
//! Every pipeline run ends in exactly one [`ExecutionRecord`]. The reporter
//! renders it into two overwrite-only cells:
//!
//! - summary: `completed @ 2026-10-16T09:30:00Z | success: ...`
//! - duration: `3.20s`, or `0.41s (failed)` for failed runs
//!
//! The location holds the latest run only; it is not a history.

mod store;

pub use store::{FileStatusStore, InMemoryStatusStore, StatusStore};

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tracing::{error, info};

use crate::utils::{format_status_timestamp, now_utc, Timestamp};

/// Outcome of a pipeline run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    /// Every step completed.
    Success,
    /// A step failed and the run aborted.
    Failure,
}

impl Outcome {
    /// Label written to the summary cell.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Success => "completed",
            Self::Failure => "error",
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Result of one pipeline run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionRecord {
    /// When the run finished.
    pub completed_at: Timestamp,
    /// Success or failure.
    pub outcome: Outcome,
    /// Success marker or the terminal error message.
    pub detail: String,
    /// Wall-clock duration of the run.
    pub duration_seconds: f64,
}

impl ExecutionRecord {
    /// Creates a record stamped with the current time.
    #[must_use]
    pub fn new(outcome: Outcome, detail: impl Into<String>, duration_seconds: f64) -> Self {
        Self {
            completed_at: now_utc(),
            outcome,
            detail: detail.into(),
            duration_seconds,
        }
    }

    /// Creates a success record.
    #[must_use]
    pub fn success(detail: impl Into<String>, duration_seconds: f64) -> Self {
        Self::new(Outcome::Success, detail, duration_seconds)
    }

    /// Creates a failure record.
    #[must_use]
    pub fn failure(detail: impl Into<String>, duration_seconds: f64) -> Self {
        Self::new(Outcome::Failure, detail, duration_seconds)
    }

    /// Overrides the completion time.
    #[must_use]
    pub fn with_completed_at(mut self, completed_at: Timestamp) -> Self {
        self.completed_at = completed_at;
        self
    }

    /// Returns true for a successful run.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.outcome == Outcome::Success
    }

    /// Renders the two status cells.
    #[must_use]
    pub fn cells(&self) -> StatusCells {
        let summary = format!(
            "{} @ {} | {}",
            self.outcome.label(),
            format_status_timestamp(&self.completed_at),
            self.detail
        );
        let mut duration = format!("{:.2}s", self.duration_seconds);
        if self.outcome == Outcome::Failure {
            duration.push_str(" (failed)");
        }
        StatusCells { summary, duration }
    }
}

/// The pair of cells held by the status location.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusCells {
    /// `outcome @ timestamp | detail`.
    pub summary: String,
    /// Duration with unit, plus ` (failed)` on failure.
    pub duration: String,
}

/// Persists execution records. Reporting never fails for the caller.
#[derive(Clone)]
pub struct StatusReporter {
    store: Arc<dyn StatusStore>,
}

impl fmt::Debug for StatusReporter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StatusReporter").finish_non_exhaustive()
    }
}

impl StatusReporter {
    /// Creates a reporter writing to `store`.
    #[must_use]
    pub fn new(store: Arc<dyn StatusStore>) -> Self {
        Self { store }
    }

    /// Overwrites the status cells with `record`.
    ///
    /// Storage failures are logged and swallowed.
    pub async fn report(&self, record: &ExecutionRecord) {
        let cells = record.cells();
        match self.store.write(&cells).await {
            Ok(()) => info!(
                outcome = %record.outcome,
                duration_seconds = record.duration_seconds,
                status = %cells.summary,
                "Execution status recorded"
            ),
            Err(err) => error!(
                outcome = %record.outcome,
                error = %err,
                "Failed to record execution status"
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::DigestError;
    use async_trait::async_trait;
    use chrono::{TimeZone, Utc};
    use pretty_assertions::assert_eq;

    fn at() -> Timestamp {
        Utc.with_ymd_and_hms(2026, 10, 16, 9, 30, 0).unwrap()
    }

    #[test]
    fn test_success_cells() {
        let record = ExecutionRecord::success("success: all done", 1.234).with_completed_at(at());

        assert_eq!(
            record.cells(),
            StatusCells {
                summary: "completed @ 2026-10-16T09:30:00Z | success: all done".into(),
                duration: "1.23s".into(),
            }
        );
    }

    #[test]
    fn test_failure_cells() {
        let record = ExecutionRecord::failure("Failed to fetch document 'd': not found", 0.5)
            .with_completed_at(at());
        let cells = record.cells();

        assert_eq!(
            cells.summary,
            "error @ 2026-10-16T09:30:00Z | Failed to fetch document 'd': not found"
        );
        assert_eq!(cells.duration, "0.50s (failed)");
    }

    #[test]
    fn test_outcome_serde() {
        assert_eq!(serde_json::to_string(&Outcome::Failure).unwrap(), "\"failure\"");
        assert!(ExecutionRecord::success("ok", 0.0).is_success());
    }

    #[tokio::test]
    async fn test_report_overwrites() {
        let store = Arc::new(InMemoryStatusStore::new());
        let reporter = StatusReporter::new(store.clone());

        reporter.report(&ExecutionRecord::failure("first", 1.0)).await;
        reporter.report(&ExecutionRecord::success("second", 2.0)).await;

        let cells = store.read().await.unwrap().unwrap();
        assert!(cells.summary.starts_with("completed @ "));
        assert!(cells.summary.ends_with("| second"));
        assert_eq!(cells.duration, "2.00s");
        assert_eq!(store.write_count(), 2);
    }

    struct BrokenStore;

    #[async_trait]
    impl StatusStore for BrokenStore {
        async fn write(&self, _cells: &StatusCells) -> Result<(), DigestError> {
            Err(DigestError::Io(std::io::Error::new(
                std::io::ErrorKind::PermissionDenied,
                "read-only",
            )))
        }

        async fn read(&self) -> Result<Option<StatusCells>, DigestError> {
            Ok(None)
        }
    }

    #[tokio::test]
    async fn test_report_swallows_storage_errors() {
        let reporter = StatusReporter::new(Arc::new(BrokenStore));
        reporter.report(&ExecutionRecord::success("ok", 0.1)).await;
    }
}
