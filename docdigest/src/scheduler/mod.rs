//! Scheduler boundary: recurring triggers bound to named entry points.

mod runtime;

pub use runtime::TokioScheduler;

use futures::future::{BoxFuture, FutureExt};
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

use crate::errors::DigestError;

/// Type alias for the async function a trigger invokes.
pub type EntryPoint = Arc<dyn Fn() -> BoxFuture<'static, ()> + Send + Sync>;

/// Wraps an async closure as an [`EntryPoint`].
pub fn entry_point<F, Fut>(f: F) -> EntryPoint
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    Arc::new(move || f().boxed())
}

/// Opaque identifier of an installed recurring trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ScheduleHandle(Uuid);

impl ScheduleHandle {
    /// Creates a fresh handle.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ScheduleHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ScheduleHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "trigger-{}", self.0)
    }
}

/// Installs and removes recurring triggers.
///
/// Methods are synchronous: errors surface to the caller immediately and the
/// runs themselves happen elsewhere.
#[cfg_attr(test, mockall::automock)]
pub trait Scheduler: Send + Sync {
    /// Installs a trigger calling `entry_point` every `period`.
    fn install_recurring(
        &self,
        entry_point: &str,
        period: Duration,
    ) -> Result<ScheduleHandle, DigestError>;

    /// Returns every installed trigger.
    fn list_installed(&self) -> Result<Vec<ScheduleHandle>, DigestError>;

    /// Removes one trigger. Future ticks stop; a run already in flight finishes.
    fn remove_installed(&self, handle: ScheduleHandle) -> Result<(), DigestError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handles_are_unique() {
        let a = ScheduleHandle::new();
        let b = ScheduleHandle::new();
        assert_ne!(a, b);
        assert!(a.to_string().starts_with("trigger-"));
    }
}
