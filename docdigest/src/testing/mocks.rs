//! In-memory fakes for every collaborator seam.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::time::Duration;

use crate::config::SecretString;
use crate::document::{Artifact, DocumentSource};
use crate::errors::DigestError;
use crate::generation::{GenerateRequest, GenerationTransport};
use crate::invoker::{Sleeper, TransportResponse};
use crate::notify::{Notification, Notifier};

/// A document source serving fixed text and PDF bytes.
#[derive(Debug)]
pub struct FakeDocumentSource {
    text: Mutex<Result<String, String>>,
    pdf: Mutex<Result<Vec<u8>, String>>,
    latency: Mutex<Duration>,
    fetch_calls: Mutex<usize>,
    convert_calls: Mutex<usize>,
}

impl FakeDocumentSource {
    /// Creates a source returning `text` and a small PDF.
    #[must_use]
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: Mutex::new(Ok(text.into())),
            pdf: Mutex::new(Ok(b"%PDF-1.7 fake".to_vec())),
            latency: Mutex::new(Duration::ZERO),
            fetch_calls: Mutex::new(0),
            convert_calls: Mutex::new(0),
        }
    }

    /// Makes `get_text` fail with `message`.
    pub fn set_fetch_error(&self, message: impl Into<String>) {
        *self.text.lock() = Err(message.into());
    }

    /// Makes conversion fail with `message`.
    pub fn set_conversion_error(&self, message: impl Into<String>) {
        *self.pdf.lock() = Err(message.into());
    }

    /// Delays every call by `latency` on the tokio clock.
    pub fn set_latency(&self, latency: Duration) {
        *self.latency.lock() = latency;
    }

    /// Number of `get_text` calls.
    #[must_use]
    pub fn fetch_calls(&self) -> usize {
        *self.fetch_calls.lock()
    }

    /// Number of conversion calls.
    #[must_use]
    pub fn convert_calls(&self) -> usize {
        *self.convert_calls.lock()
    }

    async fn wait(&self) {
        let latency = *self.latency.lock();
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }
    }
}

#[async_trait]
impl DocumentSource for FakeDocumentSource {
    async fn get_text(&self, document_id: &str) -> Result<String, DigestError> {
        *self.fetch_calls.lock() += 1;
        self.wait().await;
        let text = self.text.lock().clone();
        text.map_err(|message| DigestError::fetch(document_id, message))
    }

    async fn convert_to_output_format(&self, document_id: &str) -> Result<Artifact, DigestError> {
        *self.convert_calls.lock() += 1;
        self.wait().await;
        let pdf = self.pdf.lock().clone();
        pdf.map(Artifact::pdf)
            .map_err(|message| DigestError::conversion(document_id, message))
    }
}

/// A generation transport replaying scripted responses in order.
///
/// Once the script runs out every call fails with a transport error.
#[derive(Debug, Default)]
pub struct ScriptedTransport {
    responses: Mutex<VecDeque<Result<TransportResponse, DigestError>>>,
    requests: Mutex<Vec<GenerateRequest>>,
    api_keys: Mutex<Vec<String>>,
}

impl ScriptedTransport {
    /// Creates a transport with an empty script.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a response to the script.
    pub fn push(&self, response: Result<TransportResponse, DigestError>) {
        self.responses.lock().push_back(response);
    }

    /// Number of calls made.
    #[must_use]
    pub fn calls(&self) -> usize {
        self.requests.lock().len()
    }

    /// Prompt text of every request, in call order.
    #[must_use]
    pub fn prompts(&self) -> Vec<String> {
        self.requests
            .lock()
            .iter()
            .filter_map(|r| r.contents.first()?.parts.first().map(|p| p.text.clone()))
            .collect()
    }

    /// Api key of every request, in call order.
    #[must_use]
    pub fn api_keys(&self) -> Vec<String> {
        self.api_keys.lock().clone()
    }
}

#[async_trait]
impl GenerationTransport for ScriptedTransport {
    async fn send(
        &self,
        request: &GenerateRequest,
        api_key: &SecretString,
    ) -> Result<TransportResponse, DigestError> {
        self.requests.lock().push(request.clone());
        self.api_keys.lock().push(api_key.expose().to_string());
        self.responses
            .lock()
            .pop_front()
            .unwrap_or_else(|| Err(DigestError::Transport("no scripted response left".into())))
    }
}

/// A notifier that records what it was asked to send.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<Notification>>,
    failure: Mutex<Option<String>>,
    calls: Mutex<usize>,
}

impl RecordingNotifier {
    /// Creates a notifier that accepts everything.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every delivery fail with `message`.
    pub fn set_failure(&self, message: impl Into<String>) {
        *self.failure.lock() = Some(message.into());
    }

    /// Successfully delivered notifications.
    #[must_use]
    pub fn sent(&self) -> Vec<Notification> {
        self.sent.lock().clone()
    }

    /// Number of delivery attempts, successful or not.
    #[must_use]
    pub fn send_count(&self) -> usize {
        *self.calls.lock()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(&self, notification: &Notification) -> Result<(), DigestError> {
        *self.calls.lock() += 1;
        if let Some(message) = self.failure.lock().clone() {
            return Err(DigestError::delivery(&notification.recipient, message));
        }
        self.sent.lock().push(notification.clone());
        Ok(())
    }
}

/// A sleeper that records requested delays and returns immediately.
#[derive(Debug, Default)]
pub struct RecordingSleeper {
    delays: Mutex<Vec<Duration>>,
}

impl RecordingSleeper {
    /// Creates an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Delays requested so far.
    #[must_use]
    pub fn recorded(&self) -> Vec<Duration> {
        self.delays.lock().clone()
    }
}

#[async_trait]
impl Sleeper for RecordingSleeper {
    async fn sleep(&self, duration: Duration) {
        self.delays.lock().push(duration);
    }
}
