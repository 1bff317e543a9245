//! Runs an update cycle immediately on start, then once per
//! period, until stopped.
//!
//! # Overlap
//!
//! Each cycle holds the owned guard of `cycle_lock` for its whole run. A tick
//! that finds the guard taken is skipped, so two cycles never submit for the
//! same token concurrently.
//!
//! # Stop
//!
//! Stopping aborts only the timer task. A cycle already in flight runs to
//! completion in its own task; [`Scheduler::drain`] waits for it.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex as AsyncMutex;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

use crate::error::UpdateError;
use crate::orchestrator::CycleReport;

#[async_trait]
pub trait CycleRunner: Send + Sync {
    async fn run_cycle(&self) -> Result<CycleReport, UpdateError>;
}

enum SchedulerState {
    Stopped,
    Running { timer: JoinHandle<()> },
}

pub struct Scheduler {
    runner: Arc<dyn CycleRunner>,
    period: Duration,
    cycle_lock: Arc<AsyncMutex<()>>,
    skipped_ticks: Arc<AtomicU64>,
    state: Mutex<SchedulerState>,
}

impl Scheduler {
    pub fn new(runner: Arc<dyn CycleRunner>, period: Duration) -> Self {
        Self {
            runner,
            // tokio's interval panics on a zero period
            period: period.max(Duration::from_millis(1)),
            cycle_lock: Arc::new(AsyncMutex::new(())),
            skipped_ticks: Arc::new(AtomicU64::new(0)),
            state: Mutex::new(SchedulerState::Stopped),
        }
    }

    fn state(&self) -> MutexGuard<'_, SchedulerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Arms the timer. The first cycle starts in the background right away.
    /// Returns `false` when already running.
    pub fn start(&self) -> bool {
        let mut state = self.state();
        if matches!(*state, SchedulerState::Running { .. }) {
            debug!("Scheduler already running, start ignored");
            return false;
        }

        let timer = tokio::spawn(run_timer(
            self.runner.clone(),
            self.cycle_lock.clone(),
            self.skipped_ticks.clone(),
            self.period,
        ));
        *state = SchedulerState::Running { timer };
        info!("⏱️ Scheduler started | period={:?}", self.period);
        true
    }

    /// Disarms the timer without cancelling an in-flight cycle. Returns
    /// `false` when already stopped.
    pub fn stop(&self) -> bool {
        let mut state = self.state();
        match std::mem::replace(&mut *state, SchedulerState::Stopped) {
            SchedulerState::Stopped => {
                debug!("Scheduler already stopped, stop ignored");
                false
            }
            SchedulerState::Running { timer } => {
                timer.abort();
                info!(
                    "⏹️ Scheduler stopped | cycle_in_progress={}",
                    self.cycle_in_progress()
                );
                true
            }
        }
    }

    pub fn is_running(&self) -> bool {
        matches!(*self.state(), SchedulerState::Running { .. })
    }

    pub fn cycle_in_progress(&self) -> bool {
        self.cycle_lock.try_lock().is_err()
    }

    /// Ticks dropped because the previous cycle was still running.
    pub fn skipped_ticks(&self) -> u64 {
        self.skipped_ticks.load(Ordering::Relaxed)
    }

    /// Waits up to `grace` for an in-flight cycle to finish. Returns `true`
    /// when no cycle is running anymore.
    pub async fn drain(&self, grace: Duration) -> bool {
        tokio::time::timeout(grace, self.cycle_lock.lock()).await.is_ok()
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        if let SchedulerState::Running { timer } = &*self.state() {
            timer.abort();
        }
    }
}

async fn run_timer(
    runner: Arc<dyn CycleRunner>,
    cycle_lock: Arc<AsyncMutex<()>>,
    skipped_ticks: Arc<AtomicU64>,
    period: Duration,
) {
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        ticker.tick().await;

        let guard = match cycle_lock.clone().try_lock_owned() {
            Ok(guard) => guard,
            Err(_) => {
                skipped_ticks.fetch_add(1, Ordering::Relaxed);
                warn!("Previous cycle still running, skipping this tick");
                continue;
            }
        };

        let runner = runner.clone();
        tokio::spawn(async move {
            let _guard = guard;
            match runner.run_cycle().await {
                Ok(report) => info!("🏁 {}", report.summary()),
                Err(e) => error!("🚨 cycle failed [{}]: {}", e.kind(), e),
            }
        });
    }
}
