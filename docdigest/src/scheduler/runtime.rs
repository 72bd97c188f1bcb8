//! In-process scheduler backed by tokio timers.

use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::time::Duration;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::{EntryPoint, ScheduleHandle, Scheduler};
use crate::errors::DigestError;

struct InstalledTrigger {
    entry_point: String,
    cancel: CancellationToken,
}

/// Runs registered entry points on tokio intervals.
///
/// Each installed trigger is one spawned task. The first tick fires one
/// period after installation; ticks missed while a run is in flight are
/// skipped rather than bunched up.
#[derive(Default)]
pub struct TokioScheduler {
    entry_points: RwLock<HashMap<String, EntryPoint>>,
    installed: Mutex<HashMap<ScheduleHandle, InstalledTrigger>>,
}

impl std::fmt::Debug for TokioScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokioScheduler")
            .field("entry_points", &self.entry_points.read().keys().collect::<Vec<_>>())
            .field("installed", &self.installed.lock().len())
            .finish()
    }
}

impl TokioScheduler {
    /// Creates a scheduler with no entry points.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an entry point under `name`, replacing any previous one.
    pub fn register(&self, name: impl Into<String>, entry_point: EntryPoint) {
        let name = name.into();
        debug!(entry_point = %name, "Registered entry point");
        self.entry_points.write().insert(name, entry_point);
    }
}

impl Scheduler for TokioScheduler {
    fn install_recurring(
        &self,
        entry_point: &str,
        period: Duration,
    ) -> Result<ScheduleHandle, DigestError> {
        if period.is_zero() {
            return Err(DigestError::scheduler("trigger period must be greater than zero"));
        }
        let first_tick = Instant::now().checked_add(period).ok_or_else(|| {
            DigestError::scheduler(format!("trigger period of {period:?} is out of range"))
        })?;

        let entry = self
            .entry_points
            .read()
            .get(entry_point)
            .cloned()
            .ok_or_else(|| DigestError::scheduler(format!("unknown entry point '{entry_point}'")))?;

        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| DigestError::scheduler(format!("no tokio runtime available: {e}")))?;

        let handle = ScheduleHandle::new();
        let cancel = CancellationToken::new();
        runtime.spawn(run_trigger_loop(
            handle,
            entry_point.to_string(),
            entry,
            first_tick,
            period,
            cancel.clone(),
        ));

        self.installed.lock().insert(
            handle,
            InstalledTrigger {
                entry_point: entry_point.to_string(),
                cancel,
            },
        );

        info!(
            %handle,
            entry_point,
            period_secs = period.as_secs(),
            "Installed recurring trigger"
        );
        Ok(handle)
    }

    fn list_installed(&self) -> Result<Vec<ScheduleHandle>, DigestError> {
        let mut handles: Vec<_> = self.installed.lock().keys().copied().collect();
        handles.sort();
        Ok(handles)
    }

    fn remove_installed(&self, handle: ScheduleHandle) -> Result<(), DigestError> {
        let trigger = self
            .installed
            .lock()
            .remove(&handle)
            .ok_or_else(|| DigestError::scheduler(format!("unknown trigger {handle}")))?;

        trigger.cancel.cancel();
        info!(%handle, entry_point = %trigger.entry_point, "Removed recurring trigger");
        Ok(())
    }
}

impl Drop for TokioScheduler {
    fn drop(&mut self) {
        for (_, trigger) in self.installed.get_mut().drain() {
            trigger.cancel.cancel();
        }
    }
}

async fn run_trigger_loop(
    handle: ScheduleHandle,
    entry_point: String,
    entry: EntryPoint,
    first_tick: Instant,
    period: Duration,
    cancel: CancellationToken,
) {
    let mut ticker = interval_at(first_tick, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => {
                debug!(%handle, entry_point = %entry_point, "Trigger loop stopped");
                break;
            }
            _ = ticker.tick() => {
                debug!(%handle, entry_point = %entry_point, "Trigger fired");
                let started = Instant::now();
                entry().await;
                let elapsed = started.elapsed();
                if elapsed > period {
                    warn!(
                        %handle,
                        elapsed_secs = elapsed.as_secs_f64(),
                        period_secs = period.as_secs_f64(),
                        "Run outlasted the trigger period; missed ticks were skipped"
                    );
                }
            }
        }
    }
}
