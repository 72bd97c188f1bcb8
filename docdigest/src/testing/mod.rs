//! Testing utilities for docdigest pipelines.
//!
//! This module provides:
//! - Fakes for the document source, generation transport, notifier and sleeper
//! - A harness wiring them into a pipeline
//! - A loopback HTTP server for exercising the HTTP adapters
//! - Assertions for execution records

mod assertions;
mod fixtures;
mod http;
mod mocks;

pub use assertions::{assert_record_failed, assert_record_succeeded};
pub use fixtures::{
    generate_response_body, TestHarness, TEST_API_KEY, TEST_DOCUMENT_ID, TEST_RECIPIENT,
};
pub use http::{CapturedRequest, StubHttpServer, StubResponse};
pub use mocks::{FakeDocumentSource, RecordingNotifier, RecordingSleeper, ScriptedTransport};
