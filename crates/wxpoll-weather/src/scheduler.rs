//! Periodic trigger for the collection job.
//!
//! Runs are serialised: a trigger is only considered after the previous
//! run has returned. The interval is a single atomic scalar so it can be
//! changed from any thread while the driver task reads it.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Longest interval a scheduler will honour (30 days).
pub const MAX_INTERVAL_SECS: u64 = 30 * 24 * 60 * 60;

/// Bring an interval into the supported range of 1 s to [`MAX_INTERVAL_SECS`].
pub fn clamp_interval(interval_secs: u64) -> u64 {
    interval_secs.clamp(1, MAX_INTERVAL_SECS)
}

/// `start + interval`, saturating at the longest supported interval.
fn due_after(start: Instant, interval: Duration) -> Instant {
    start
        .checked_add(interval)
        .unwrap_or_else(|| start + Duration::from_secs(MAX_INTERVAL_SECS))
}

/// Work fired on every trigger. Runs must absorb their own failures.
#[async_trait]
pub trait Job: Send + Sync + 'static {
    fn name(&self) -> &str;

    async fn run(&self);
}

#[derive(Debug, thiserror::Error)]
pub enum SchedulerError {
    #[error("No job registered")]
    NotRegistered,
    #[error("Scheduler already started")]
    AlreadyStarted,
    #[error("Scheduler is closed")]
    Closed,
    #[error("No async runtime available: {0}")]
    NoRuntime(String),
}

/// Fires a registered job at a fixed interval.
pub trait Scheduler: Send + Sync {
    /// Register the job to fire every `interval_secs`. With `persist`, the
    /// pending trigger survives a process restart where supported.
    fn register(
        &self,
        interval_secs: u64,
        job: Arc<dyn Job>,
        persist: bool,
    ) -> Result<(), SchedulerError>;

    /// Begin firing. Starting twice is a no-op.
    fn start(&self) -> Result<(), SchedulerError>;

    /// Change the interval; takes effect when the next trigger is computed.
    fn set_interval(&self, interval_secs: u64);

    /// Stop future triggers. A run already in progress completes.
    fn close(&self);
}

/// Next due trigger, persisted between runs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct PendingTrigger {
    job: String,
    /// Epoch seconds
    due_at: i64,
}

fn read_pending(path: &Path, job: &str) -> Option<i64> {
    let contents = std::fs::read_to_string(path).ok()?;
    match serde_json::from_str::<PendingTrigger>(&contents) {
        Ok(pending) if pending.job == job => Some(pending.due_at),
        Ok(pending) => {
            tracing::debug!("Ignoring pending trigger for other job '{}'", pending.job);
            None
        }
        Err(e) => {
            tracing::warn!("Ignoring unreadable scheduler state {}: {}", path.display(), e);
            None
        }
    }
}

fn write_pending(path: &Path, job: &str, due_at: i64) {
    let pending = PendingTrigger {
        job: job.to_string(),
        due_at,
    };
    let result = serde_json::to_string(&pending)
        .map_err(|e| e.to_string())
        .and_then(|json| std::fs::write(path, json).map_err(|e| e.to_string()));
    if let Err(e) = result {
        tracing::warn!("Failed to persist scheduler state to {}: {}", path.display(), e);
    }
}

/// Delay before the first trigger after start.
///
/// A persisted due time in the future is honoured, capped at one interval;
/// anything else fires immediately.
fn initial_delay(due_at: Option<i64>, now: i64, interval_secs: u64) -> Duration {
    match due_at {
        Some(due) if due > now => {
            let remaining = u64::try_from(due - now).unwrap_or(0);
            Duration::from_secs(remaining.min(interval_secs))
        }
        _ => Duration::ZERO,
    }
}

fn epoch_secs() -> i64 {
    chrono::Utc::now().timestamp()
}

struct Registration {
    job: Arc<dyn Job>,
    persist: bool,
}

struct Driver {
    job: Arc<dyn Job>,
    interval_secs: Arc<AtomicU64>,
    interval_changed: Arc<Notify>,
    cancel: CancellationToken,
    state_path: Option<PathBuf>,
}

impl Driver {
    fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs.load(Ordering::SeqCst))
    }

    async fn drive(self) {
        let name = self.job.name().to_string();
        let first_delay = match &self.state_path {
            Some(path) => initial_delay(
                read_pending(path, &name),
                epoch_secs(),
                self.interval_secs.load(Ordering::SeqCst),
            ),
            None => Duration::ZERO,
        };
        tracing::info!("Scheduling '{}', first trigger in {:?}", name, first_delay);

        let mut last_run: Option<Instant> = None;
        let mut next_due = due_after(Instant::now(), first_delay);

        loop {
            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => break,
                _ = self.interval_changed.notified() => {
                    if let Some(last) = last_run {
                        next_due = due_after(last, self.interval());
                    }
                    continue;
                }
                _ = tokio::time::sleep_until(next_due) => {}
            }

            let started = Instant::now();
            tracing::debug!("Triggering '{}'", name);
            self.job.run().await;

            let interval = self.interval();
            last_run = Some(started);
            next_due = due_after(started, interval);

            if let Some(path) = &self.state_path {
                let remaining = next_due.saturating_duration_since(Instant::now());
                let remaining = i64::try_from(remaining.as_secs()).unwrap_or(i64::MAX / 2);
                write_pending(path, &name, epoch_secs() + remaining);
            }
        }

        tracing::info!("Scheduler for '{}' stopped", name);
    }
}

/// Tokio-backed [`Scheduler`] with one driver task per registration.
pub struct IntervalScheduler {
    interval_secs: Arc<AtomicU64>,
    interval_changed: Arc<Notify>,
    registration: Mutex<Option<Registration>>,
    task: Mutex<Option<JoinHandle<()>>>,
    cancel: CancellationToken,
    state_path: Option<PathBuf>,
}

impl IntervalScheduler {
    pub fn new() -> Self {
        Self {
            interval_secs: Arc::new(AtomicU64::new(1)),
            interval_changed: Arc::new(Notify::new()),
            registration: Mutex::new(None),
            task: Mutex::new(None),
            cancel: CancellationToken::new(),
            state_path: None,
        }
    }

    /// Persist pending triggers of `persist` registrations to `path`.
    pub fn with_state_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.state_path = Some(path.into());
        self
    }

    pub fn interval_secs(&self) -> u64 {
        self.interval_secs.load(Ordering::SeqCst)
    }

    pub fn is_running(&self) -> bool {
        self.task.lock().as_ref().is_some_and(|t| !t.is_finished())
    }
}

impl Default for IntervalScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl Scheduler for IntervalScheduler {
    fn register(
        &self,
        interval_secs: u64,
        job: Arc<dyn Job>,
        persist: bool,
    ) -> Result<(), SchedulerError> {
        if self.cancel.is_cancelled() {
            return Err(SchedulerError::Closed);
        }
        if self.task.lock().is_some() {
            return Err(SchedulerError::AlreadyStarted);
        }

        tracing::debug!(
            "Registered '{}' every {} s (persist: {})",
            job.name(),
            interval_secs,
            persist
        );
        self.interval_secs.store(clamp_interval(interval_secs), Ordering::SeqCst);
        *self.registration.lock() = Some(Registration { job, persist });
        Ok(())
    }

    fn start(&self) -> Result<(), SchedulerError> {
        if self.cancel.is_cancelled() {
            return Err(SchedulerError::Closed);
        }

        let mut task = self.task.lock();
        if task.is_some() {
            tracing::debug!("Scheduler already running");
            return Ok(());
        }

        let (job, persist) = match self.registration.lock().as_ref() {
            Some(r) => (Arc::clone(&r.job), r.persist),
            None => return Err(SchedulerError::NotRegistered),
        };

        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| SchedulerError::NoRuntime(e.to_string()))?;

        let driver = Driver {
            job,
            interval_secs: Arc::clone(&self.interval_secs),
            interval_changed: Arc::clone(&self.interval_changed),
            cancel: self.cancel.clone(),
            state_path: if persist { self.state_path.clone() } else { None },
        };
        *task = Some(runtime.spawn(driver.drive()));
        Ok(())
    }

    fn set_interval(&self, interval_secs: u64) {
        let interval_secs = clamp_interval(interval_secs);
        let previous = self.interval_secs.swap(interval_secs, Ordering::SeqCst);
        if previous != interval_secs {
            tracing::info!("Interval changed from {} s to {} s", previous, interval_secs);
            self.interval_changed.notify_one();
        }
    }

    fn close(&self) {
        self.cancel.cancel();
        // Detach rather than abort so an in-flight run finishes.
        if self.task.lock().take().is_some() {
            tracing::info!("Scheduler closed");
        }
    }
}
