//! Resilient invoker: retry with backoff around a single network call.
//!
//! Each attempt is classified into a [`StepResult`]:
//!
//! - **200**: the body is parsed and returned; a body that fails to parse
//!   ends the invocation immediately as a `Failed` result.
//! - **429**: the attempt is rate limited and waits on the rate-limit table.
//! - **anything else** (other statuses, transport errors, timeouts): waits on
//!   the generic table.
//!
//! No wait follows the final attempt. When the budget is spent the caller
//! receives `Failed` carrying the last observed error, never a raw transport
//! error.

mod policy;
mod sleeper;

pub use policy::{BackoffSchedule, RetryPolicy, RetryState, DEFAULT_MAX_ATTEMPTS};
pub use sleeper::{Sleeper, TokioSleeper};

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::errors::DigestError;
use crate::events::{EventSink, NoOpEventSink, RunEvent, INVOKER_ATTEMPT};
use crate::utils::text::{ERROR_BODY_LIMIT, LOG_BODY_LIMIT};
use crate::utils::truncate_chars;

/// HTTP status treated as success.
pub const HTTP_OK: u16 = 200;
/// HTTP status treated as a rate limit.
pub const HTTP_TOO_MANY_REQUESTS: u16 = 429;

/// Raw response of one network call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportResponse {
    /// HTTP status code.
    pub status: u16,
    /// Response body as text.
    pub body: String,
    /// Parsed `Retry-After` header, if present.
    pub retry_after: Option<Duration>,
}

impl TransportResponse {
    /// Creates a response without a retry hint.
    #[must_use]
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
            retry_after: None,
        }
    }

    /// Sets the retry hint.
    #[must_use]
    pub fn with_retry_after(mut self, retry_after: Duration) -> Self {
        self.retry_after = Some(retry_after);
        self
    }
}

/// Outcome of a pipeline step or of a single invoker attempt.
#[derive(Debug)]
pub enum StepResult<T> {
    /// The step produced its payload.
    Ok(T),
    /// The service asked the caller to slow down.
    RateLimited(Option<Duration>),
    /// The step failed.
    Failed(DigestError),
}

impl<T> StepResult<T> {
    /// Returns true for `Ok`.
    #[must_use]
    pub fn is_ok(&self) -> bool {
        matches!(self, Self::Ok(_))
    }

    /// Converts into a `Result`, mapping `RateLimited` to [`DigestError::RateLimited`].
    pub fn into_result(self) -> Result<T, DigestError> {
        match self {
            Self::Ok(value) => Ok(value),
            Self::RateLimited(retry_after) => Err(DigestError::RateLimited { retry_after }),
            Self::Failed(err) => Err(err),
        }
    }

    fn label(&self) -> &'static str {
        match self {
            Self::Ok(_) => "ok",
            Self::RateLimited(_) => "rate_limited",
            Self::Failed(_) => "error",
        }
    }
}

/// Classifies one call outcome.
///
/// Parse errors on a 200 are normalised to [`DigestError::MalformedResponse`]
/// so the retry loop can tell them apart from retryable failures.
pub fn classify_response<T, P>(
    response: Result<TransportResponse, DigestError>,
    parse: &P,
) -> StepResult<T>
where
    P: Fn(&str) -> Result<T, DigestError>,
{
    match response {
        Ok(resp) if resp.status == HTTP_OK => match parse(&resp.body) {
            Ok(value) => StepResult::Ok(value),
            Err(err @ DigestError::MalformedResponse(_)) => StepResult::Failed(err),
            Err(other) => StepResult::Failed(DigestError::MalformedResponse(other.to_string())),
        },
        Ok(resp) if resp.status == HTTP_TOO_MANY_REQUESTS => {
            warn!(
                body = truncate_chars(&resp.body, LOG_BODY_LIMIT),
                "Rate limit response details"
            );
            StepResult::RateLimited(resp.retry_after)
        }
        Ok(resp) => {
            warn!(
                status = resp.status,
                body = truncate_chars(&resp.body, LOG_BODY_LIMIT),
                "API call returned an error status"
            );
            StepResult::Failed(DigestError::Transport(format!(
                "API call error: {} - {}",
                resp.status,
                truncate_chars(&resp.body, ERROR_BODY_LIMIT)
            )))
        }
        Err(err) => StepResult::Failed(err),
    }
}

/// Retry/backoff wrapper around a single network call.
pub struct ResilientInvoker {
    policy: RetryPolicy,
    sleeper: Arc<dyn Sleeper>,
    events: Arc<dyn EventSink>,
}

impl std::fmt::Debug for ResilientInvoker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResilientInvoker")
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

impl ResilientInvoker {
    /// Creates an invoker that sleeps on the tokio timer and emits no events.
    #[must_use]
    pub fn new(policy: RetryPolicy) -> Self {
        Self {
            policy,
            sleeper: Arc::new(TokioSleeper),
            events: Arc::new(NoOpEventSink),
        }
    }

    /// Replaces the sleeper.
    #[must_use]
    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    /// Replaces the event sink.
    #[must_use]
    pub fn with_event_sink(mut self, events: Arc<dyn EventSink>) -> Self {
        self.events = events;
        self
    }

    /// Returns the active policy.
    #[must_use]
    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Runs `call` until it yields a parsable 200 or the attempt budget is spent.
    ///
    /// `operation` names the call in logs and events.
    pub async fn invoke_with<T, F, Fut, P>(
        &self,
        operation: &str,
        mut call: F,
        parse: P,
    ) -> StepResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<TransportResponse, DigestError>>,
        P: Fn(&str) -> Result<T, DigestError>,
    {
        let mut state = RetryState::new(&self.policy);

        loop {
            debug!(
                operation,
                attempt = state.attempts_made(),
                max_attempts = state.max_attempts,
                "Calling remote service"
            );

            let response = match tokio::time::timeout(self.policy.request_timeout, call()).await {
                Ok(response) => response,
                Err(_) => Err(DigestError::Transport(format!(
                    "request timed out after {:.0}s",
                    self.policy.request_timeout.as_secs_f64()
                ))),
            };

            let result = classify_response(response, &parse);
            self.emit_attempt(operation, &state, &result);

            let backoff = match result {
                StepResult::Ok(value) => {
                    info!(operation, attempt = state.attempts_made(), "Remote call succeeded");
                    return StepResult::Ok(value);
                }
                StepResult::Failed(err @ DigestError::MalformedResponse(_)) => {
                    warn!(operation, error = %err, "Successful response could not be used");
                    return StepResult::Failed(err);
                }
                StepResult::RateLimited(retry_after) => {
                    warn!(
                        operation,
                        attempt = state.attempts_made(),
                        max_attempts = state.max_attempts,
                        retry_after_secs = ?retry_after.map(|d| d.as_secs()),
                        "Rate limited"
                    );
                    state.record(DigestError::RateLimited { retry_after });
                    &self.policy.rate_limit_backoff
                }
                StepResult::Failed(err) => {
                    warn!(
                        operation,
                        attempt = state.attempts_made(),
                        max_attempts = state.max_attempts,
                        error = %err,
                        "Remote call failed"
                    );
                    state.record(err);
                    &self.policy.generic_backoff
                }
            };

            if !state.has_remaining() {
                let err = Self::exhausted(state);
                warn!(operation, error = %err, "Giving up");
                return StepResult::Failed(err);
            }

            let delay = backoff.delay(state.attempt);
            info!(
                operation,
                attempt = state.attempts_made(),
                delay_secs = delay.as_secs_f64(),
                "Retrying after backoff"
            );
            self.sleeper.sleep(delay).await;
            state.advance();
        }
    }

    fn exhausted(state: RetryState) -> DigestError {
        let attempts = state.attempts_made();
        match state.last_error {
            Some(last) => {
                let message = last.to_string();
                if last.is_rate_limited() {
                    DigestError::RateLimitExhausted { attempts, message }
                } else {
                    DigestError::TransientCallFailure { attempts, message }
                }
            }
            None => DigestError::TransientCallFailure {
                attempts,
                message: "no error was recorded".to_string(),
            },
        }
    }

    fn emit_attempt<T>(&self, operation: &str, state: &RetryState, result: &StepResult<T>) {
        self.events.record(RunEvent::new(
            INVOKER_ATTEMPT,
            serde_json::json!({
                "operation": operation,
                "attempt": state.attempts_made(),
                "max_attempts": state.max_attempts,
                "outcome": result.label(),
            }),
        ));
    }
}
