//! Test assertions for execution records.

use crate::status::{ExecutionRecord, Outcome};

/// Asserts that the run succeeded.
pub fn assert_record_succeeded(record: &ExecutionRecord) {
    assert_eq!(
        record.outcome,
        Outcome::Success,
        "Expected success, got failure: {}",
        record.detail
    );
}

/// Asserts that the run failed and its detail mentions `fragment`.
pub fn assert_record_failed(record: &ExecutionRecord, fragment: &str) {
    assert_eq!(
        record.outcome,
        Outcome::Failure,
        "Expected failure, got success: {}",
        record.detail
    );
    assert!(
        record.detail.contains(fragment),
        "Expected detail to contain '{}', got '{}'",
        fragment,
        record.detail
    );
}
