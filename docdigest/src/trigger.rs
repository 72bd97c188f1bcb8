//! Trigger manager: keeps at most one recurring trigger installed.

use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use crate::errors::DigestError;
use crate::scheduler::Scheduler;

/// Name under which the pipeline entry point is registered.
pub const PIPELINE_ENTRY_POINT: &str = "run_pipeline_once";

/// Default trigger period.
pub const DEFAULT_PERIOD: Duration = Duration::from_secs(5 * 60);

/// Whether the recurring trigger is installed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TriggerState {
    /// No trigger installed.
    #[default]
    Stopped,
    /// Exactly one trigger installed.
    Running,
}

impl fmt::Display for TriggerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Stopped => write!(f, "stopped"),
            Self::Running => write!(f, "running"),
        }
    }
}

/// Installs and removes the recurring pipeline trigger.
pub struct TriggerManager {
    scheduler: Arc<dyn Scheduler>,
    entry_point: String,
    period: Duration,
    state: Mutex<TriggerState>,
}

impl fmt::Debug for TriggerManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TriggerManager")
            .field("entry_point", &self.entry_point)
            .field("period", &self.period)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

impl TriggerManager {
    /// Creates a manager for the pipeline entry point with the default period.
    #[must_use]
    pub fn new(scheduler: Arc<dyn Scheduler>) -> Self {
        Self {
            scheduler,
            entry_point: PIPELINE_ENTRY_POINT.to_string(),
            period: DEFAULT_PERIOD,
            state: Mutex::new(TriggerState::Stopped),
        }
    }

    /// Sets the trigger period.
    #[must_use]
    pub fn with_period(mut self, period: Duration) -> Self {
        self.period = period;
        self
    }

    /// Returns the current state.
    #[must_use]
    pub fn state(&self) -> TriggerState {
        *self.state.lock()
    }

    /// Returns the trigger period.
    #[must_use]
    pub fn period(&self) -> Duration {
        self.period
    }

    /// Removes every installed trigger, then installs exactly one.
    ///
    /// Calling it again replaces the trigger rather than adding a second one.
    /// The state lock is held from the listing through the install, so
    /// concurrent callers are serialised.
    pub fn start(&self) -> Result<(), DigestError> {
        let mut state = self.state.lock();
        let removed = self.clear(&mut state)?;
        let handle = self
            .scheduler
            .install_recurring(&self.entry_point, self.period)?;
        *state = TriggerState::Running;

        info!(
            %handle,
            entry_point = %self.entry_point,
            period_secs = self.period.as_secs(),
            replaced = removed,
            "Recurring trigger started"
        );
        Ok(())
    }

    /// Removes every installed trigger. A no-op when none exist.
    pub fn stop(&self) -> Result<(), DigestError> {
        let mut state = self.state.lock();
        let removed = self.clear(&mut state)?;
        info!(removed, "Recurring trigger stopped");
        Ok(())
    }

    /// Removes every listed trigger and updates `state`.
    ///
    /// On a failed removal the state stays `Running`, since that trigger and
    /// any after it are still installed.
    fn clear(&self, state: &mut TriggerState) -> Result<usize, DigestError> {
        let handles = self.scheduler.list_installed()?;
        let count = handles.len();
        for (removed, handle) in handles.into_iter().enumerate() {
            if let Err(err) = self.scheduler.remove_installed(handle) {
                *state = TriggerState::Running;
                warn!(
                    %handle,
                    removed,
                    remaining = count - removed,
                    error = %err,
                    "Failed to remove recurring trigger"
                );
                return Err(err);
            }
        }
        *state = TriggerState::Stopped;
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheduler::{entry_point, MockScheduler, ScheduleHandle, TokioScheduler};
    use mockall::predicate::eq;
    use mockall::Sequence;

    fn tokio_scheduler() -> Arc<TokioScheduler> {
        let scheduler = Arc::new(TokioScheduler::new());
        scheduler.register(PIPELINE_ENTRY_POINT, entry_point(|| async {}));
        scheduler
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_twice_leaves_one_trigger() {
        let scheduler = tokio_scheduler();
        let manager = TriggerManager::new(scheduler.clone());

        manager.start().unwrap();
        manager.start().unwrap();

        assert_eq!(scheduler.list_installed().unwrap().len(), 1);
        assert_eq!(manager.state(), TriggerState::Running);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_twice_is_noop() {
        let scheduler = tokio_scheduler();
        let manager = TriggerManager::new(scheduler.clone());

        manager.start().unwrap();
        manager.stop().unwrap();
        manager.stop().unwrap();

        assert!(scheduler.list_installed().unwrap().is_empty());
        assert_eq!(manager.state(), TriggerState::Stopped);
    }

    #[test]
    fn test_start_clears_before_install() {
        let existing = ScheduleHandle::new();
        let installed = ScheduleHandle::new();
        let mut seq = Sequence::new();
        let mut scheduler = MockScheduler::new();

        scheduler
            .expect_list_installed()
            .times(1)
            .in_sequence(&mut seq)
            .returning(move || Ok(vec![existing]));
        scheduler
            .expect_remove_installed()
            .with(eq(existing))
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(()));
        scheduler
            .expect_install_recurring()
            .with(eq(PIPELINE_ENTRY_POINT), eq(DEFAULT_PERIOD))
            .times(1)
            .in_sequence(&mut seq)
            .returning(move |_, _| Ok(installed));

        let manager = TriggerManager::new(Arc::new(scheduler));
        manager.start().unwrap();
        assert_eq!(manager.state(), TriggerState::Running);
    }

    #[test]
    fn test_stop_without_triggers_removes_nothing() {
        let mut scheduler = MockScheduler::new();
        scheduler.expect_list_installed().returning(|| Ok(Vec::new()));
        scheduler.expect_remove_installed().never();
        scheduler.expect_install_recurring().never();

        let manager = TriggerManager::new(Arc::new(scheduler));
        manager.stop().unwrap();
        manager.stop().unwrap();
        assert_eq!(manager.state(), TriggerState::Stopped);
    }

    #[test]
    fn test_install_error_surfaces() {
        let mut scheduler = MockScheduler::new();
        scheduler.expect_list_installed().returning(|| Ok(Vec::new()));
        scheduler
            .expect_install_recurring()
            .returning(|_, _| Err(DigestError::scheduler("quota of triggers reached")));

        let manager = TriggerManager::new(Arc::new(scheduler)).with_period(Duration::from_secs(60));
        let err = manager.start().unwrap_err();

        assert_eq!(err.kind(), "SchedulerError");
        assert_eq!(manager.state(), TriggerState::Stopped);
    }

    #[test]
    fn test_remove_error_surfaces() {
        let handle = ScheduleHandle::new();
        let mut scheduler = MockScheduler::new();
        scheduler
            .expect_list_installed()
            .returning(move || Ok(vec![handle]));
        scheduler
            .expect_remove_installed()
            .returning(|_| Err(DigestError::scheduler("permission denied")));

        let manager = TriggerManager::new(Arc::new(scheduler));
        assert!(manager.stop().is_err());
        assert_eq!(manager.state(), TriggerState::Running);
    }

    #[test]
    fn test_partial_removal_keeps_running_state() {
        let first = ScheduleHandle::new();
        let second = ScheduleHandle::new();
        let mut scheduler = MockScheduler::new();
        scheduler
            .expect_list_installed()
            .times(1)
            .returning(move || Ok(vec![first, second]));
        scheduler
            .expect_remove_installed()
            .with(eq(first))
            .times(1)
            .returning(|_| Ok(()));
        scheduler
            .expect_remove_installed()
            .with(eq(second))
            .times(1)
            .returning(|_| Err(DigestError::scheduler("backend unavailable")));
        scheduler.expect_install_recurring().never();

        let manager = TriggerManager::new(Arc::new(scheduler));
        let err = manager.start().unwrap_err();

        assert_eq!(err.kind(), "SchedulerError");
        assert_eq!(manager.state(), TriggerState::Running);
    }

    /// Scheduler whose listing is slow enough for two callers to overlap.
    #[derive(Default)]
    struct SlowListScheduler {
        installed: Mutex<Vec<ScheduleHandle>>,
    }

    impl Scheduler for SlowListScheduler {
        fn install_recurring(
            &self,
            _entry_point: &str,
            _period: Duration,
        ) -> Result<ScheduleHandle, DigestError> {
            let handle = ScheduleHandle::new();
            self.installed.lock().push(handle);
            Ok(handle)
        }

        fn list_installed(&self) -> Result<Vec<ScheduleHandle>, DigestError> {
            let handles = self.installed.lock().clone();
            std::thread::sleep(Duration::from_millis(50));
            Ok(handles)
        }

        fn remove_installed(&self, handle: ScheduleHandle) -> Result<(), DigestError> {
            self.installed.lock().retain(|h| *h != handle);
            Ok(())
        }
    }

    #[test]
    fn test_concurrent_start_installs_one_trigger() {
        let scheduler = Arc::new(SlowListScheduler::default());
        let manager = Arc::new(TriggerManager::new(scheduler.clone()));
        let barrier = Arc::new(std::sync::Barrier::new(2));

        let workers: Vec<_> = (0..2)
            .map(|_| {
                let manager = manager.clone();
                let barrier = barrier.clone();
                std::thread::spawn(move || {
                    barrier.wait();
                    manager.start()
                })
            })
            .collect();
        for worker in workers {
            worker.join().unwrap().unwrap();
        }

        assert_eq!(scheduler.list_installed().unwrap().len(), 1);
        assert_eq!(manager.state(), TriggerState::Running);
    }
}
