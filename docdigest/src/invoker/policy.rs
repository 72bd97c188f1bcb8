//! Retry policy, backoff tables and per-invocation retry state.

use std::time::Duration;

/// Ordered wait durations, indexed by the 0-based attempt that just failed.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct BackoffSchedule(Vec<Duration>);

impl BackoffSchedule {
    /// Creates a schedule from explicit durations.
    #[must_use]
    pub fn new(delays: Vec<Duration>) -> Self {
        Self(delays)
    }

    /// delay[i] = base * factor^i, for `len` entries.
    #[must_use]
    pub fn exponential(base: Duration, factor: u32, len: usize) -> Self {
        let mut delays = Vec::with_capacity(len);
        let mut current = base;
        for _ in 0..len {
            delays.push(current);
            current = current.saturating_mul(factor);
        }
        Self(delays)
    }

    /// Returns the wait after the given attempt.
    ///
    /// Attempts past the end of the table reuse the last entry; an empty
    /// table never waits.
    #[must_use]
    pub fn delay(&self, attempt: usize) -> Duration {
        self.0
            .get(attempt)
            .or_else(|| self.0.last())
            .copied()
            .unwrap_or(Duration::ZERO)
    }

    /// Returns the configured delays.
    #[must_use]
    pub fn as_slice(&self) -> &[Duration] {
        &self.0
    }
}

/// Configuration for the resilient invoker.
///
/// Rate limits and generic failures use separate tables: a 429 is expected
/// to clear on a predictable cadence, other failures are not.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Maximum attempts, including the first one.
    pub max_attempts: usize,
    /// Waits after a 429 response.
    pub rate_limit_backoff: BackoffSchedule,
    /// Waits after any other failure.
    pub generic_backoff: BackoffSchedule,
    /// Bound on each individual network call.
    pub request_timeout: Duration,
}

/// Default maximum attempts.
pub const DEFAULT_MAX_ATTEMPTS: usize = 3;

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            rate_limit_backoff: BackoffSchedule::exponential(Duration::from_secs(10), 2, 3),
            generic_backoff: BackoffSchedule::exponential(Duration::from_secs(5), 2, 2),
            request_timeout: Duration::from_secs(60),
        }
    }
}

impl RetryPolicy {
    /// Creates a policy with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the maximum attempts. Values below one are raised to one.
    #[must_use]
    pub fn with_max_attempts(mut self, attempts: usize) -> Self {
        self.max_attempts = attempts.max(1);
        self
    }

    /// Sets the rate-limit backoff table.
    #[must_use]
    pub fn with_rate_limit_backoff(mut self, schedule: BackoffSchedule) -> Self {
        self.rate_limit_backoff = schedule;
        self
    }

    /// Sets the generic backoff table.
    #[must_use]
    pub fn with_generic_backoff(mut self, schedule: BackoffSchedule) -> Self {
        self.generic_backoff = schedule;
        self
    }

    /// Sets the per-call timeout.
    #[must_use]
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }
}

/// State tracking for one invocation.
#[derive(Debug)]
pub struct RetryState {
    /// Current attempt number (0-indexed). Never reaches `max_attempts`.
    pub attempt: usize,
    /// Attempt budget copied from the policy.
    pub max_attempts: usize,
    /// Last observed failure.
    pub last_error: Option<crate::errors::DigestError>,
}

impl RetryState {
    /// Creates the state for a fresh invocation.
    #[must_use]
    pub fn new(policy: &RetryPolicy) -> Self {
        Self {
            attempt: 0,
            max_attempts: policy.max_attempts.max(1),
            last_error: None,
        }
    }

    /// Returns true if another attempt may follow the current one.
    #[must_use]
    pub fn has_remaining(&self) -> bool {
        self.attempt + 1 < self.max_attempts
    }

    /// Moves to the next attempt. Returns false, leaving the state untouched,
    /// when the budget is spent.
    pub fn advance(&mut self) -> bool {
        if self.has_remaining() {
            self.attempt += 1;
            true
        } else {
            false
        }
    }

    /// Records the failure of the current attempt.
    pub fn record(&mut self, error: crate::errors::DigestError) {
        self.last_error = Some(error);
    }

    /// Number of attempts made so far, counting the current one.
    #[must_use]
    pub fn attempts_made(&self) -> usize {
        self.attempt + 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::DigestError;

    #[test]
    fn test_default_policy_tables() {
        let policy = RetryPolicy::default();

        assert_eq!(policy.max_attempts, 3);
        assert_eq!(
            policy.rate_limit_backoff.as_slice(),
            &[Duration::from_secs(10), Duration::from_secs(20), Duration::from_secs(40)]
        );
        assert_eq!(
            policy.generic_backoff.as_slice(),
            &[Duration::from_secs(5), Duration::from_secs(10)]
        );
    }

    #[test]
    fn test_schedule_past_end_reuses_last() {
        let schedule = BackoffSchedule::exponential(Duration::from_secs(5), 2, 2);
        assert_eq!(schedule.delay(0), Duration::from_secs(5));
        assert_eq!(schedule.delay(1), Duration::from_secs(10));
        assert_eq!(schedule.delay(7), Duration::from_secs(10));
    }

    #[test]
    fn test_empty_schedule_never_waits() {
        assert_eq!(BackoffSchedule::default().delay(0), Duration::ZERO);
    }

    #[test]
    fn test_max_attempts_floor() {
        let policy = RetryPolicy::new().with_max_attempts(0);
        assert_eq!(policy.max_attempts, 1);
    }

    #[test]
    fn test_retry_state_never_exceeds_budget() {
        let policy = RetryPolicy::new().with_max_attempts(3);
        let mut state = RetryState::new(&policy);

        assert!(state.advance()); // 1
        assert!(state.advance()); // 2
        assert!(!state.advance()); // budget spent
        assert_eq!(state.attempt, 2);
        assert_eq!(state.attempts_made(), 3);
    }

    #[test]
    fn test_retry_state_records_last_error() {
        let mut state = RetryState::new(&RetryPolicy::default());
        state.record(DigestError::Transport("first".into()));
        state.record(DigestError::RateLimited { retry_after: None });

        assert!(state.last_error.as_ref().is_some_and(DigestError::is_rate_limited));
    }
}
