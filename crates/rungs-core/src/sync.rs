//! Debounced push of local progression to an external system of record.
//!
//! Each user gets one [`SyncDebouncer`]. Every committed mutation re-arms its
//! quiet-period timer; when the timer finally fires, the injected
//! [`ProgressionSync`] runs once in a detached task. Failures are logged and
//! never reach the mutating caller.

use crate::error::ErrorCode;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use thiserror::Error;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Outbound sync for one aggregate. Takes no arguments: the target already
/// knows which aggregate it pushes.
#[async_trait]
pub trait ProgressionSync: Send + Sync {
    async fn sync_progression(&self) -> anyhow::Result<()>;
}

/// Produces the sync target for a given user.
pub trait SyncBinder: Send + Sync {
    fn bind(&self, user_id: &str) -> Arc<dyn ProgressionSync>;
}

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("failed to spawn sync command: {0}")]
    Spawn(#[from] std::io::Error),
    #[error("sync command exited with {status}: {stderr}")]
    CommandFailed { status: String, stderr: String },
}

impl SyncError {
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        ErrorCode::SyncFailed
    }
}

/// Runs a shell command per sync with `RUNGS_USER` set to the user id.
#[derive(Debug, Clone)]
pub struct CommandSync {
    command: String,
    user_id: String,
}

impl CommandSync {
    #[must_use]
    pub fn new(command: impl Into<String>, user_id: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            user_id: user_id.into(),
        }
    }
}

#[async_trait]
impl ProgressionSync for CommandSync {
    async fn sync_progression(&self) -> anyhow::Result<()> {
        let output = tokio::process::Command::new("sh")
            .arg("-c")
            .arg(&self.command)
            .env("RUNGS_USER", &self.user_id)
            .kill_on_drop(true)
            .output()
            .await
            .map_err(SyncError::from)?;
        if !output.status.success() {
            return Err(SyncError::CommandFailed {
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            }
            .into());
        }
        Ok(())
    }
}

/// Binds every user to the same shell command.
#[derive(Debug, Clone)]
pub struct CommandSyncBinder {
    command: String,
}

impl CommandSyncBinder {
    #[must_use]
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
        }
    }
}

impl SyncBinder for CommandSyncBinder {
    fn bind(&self, user_id: &str) -> Arc<dyn ProgressionSync> {
        Arc::new(CommandSync::new(self.command.clone(), user_id))
    }
}

#[derive(Default)]
struct DebounceState {
    /// Bumped on every schedule, flush and cancel so a superseded timer that
    /// already woke up can tell it lost the race.
    generation: u64,
    timer: Option<JoinHandle<()>>,
    in_flight: Vec<JoinHandle<()>>,
}

struct DebounceInner {
    user_id: String,
    target: Arc<dyn ProgressionSync>,
    delay: Duration,
    state: Mutex<DebounceState>,
}

impl DebounceInner {
    fn lock(&self) -> MutexGuard<'_, DebounceState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Single cancellable quiet-period timer for one aggregate.
pub struct SyncDebouncer {
    inner: Arc<DebounceInner>,
    handle: Handle,
}

impl std::fmt::Debug for SyncDebouncer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncDebouncer")
            .field("user_id", &self.inner.user_id)
            .field("delay", &self.inner.delay)
            .finish_non_exhaustive()
    }
}

async fn run_sync(user_id: String, target: Arc<dyn ProgressionSync>) {
    match target.sync_progression().await {
        Ok(()) => debug!(user_id = %user_id, "progression synced"),
        Err(error) => warn!(
            user_id = %user_id,
            code = ErrorCode::SyncFailed.code(),
            error = %format!("{error:#}"),
            "progression sync failed"
        ),
    }
}

impl SyncDebouncer {
    #[must_use]
    pub fn new(
        user_id: impl Into<String>,
        target: Arc<dyn ProgressionSync>,
        delay: Duration,
        handle: Handle,
    ) -> Self {
        Self {
            inner: Arc::new(DebounceInner {
                user_id: user_id.into(),
                target,
                delay,
                state: Mutex::new(DebounceState::default()),
            }),
            handle,
        }
    }

    /// Cancel any pending timer and arm a fresh one.
    pub fn schedule(&self) {
        let mut state = self.inner.lock();
        state.generation += 1;
        let generation = state.generation;
        if let Some(timer) = state.timer.take() {
            timer.abort();
        }
        state.in_flight.retain(|task| !task.is_finished());

        let inner = Arc::clone(&self.inner);
        let handle = self.handle.clone();
        state.timer = Some(self.handle.spawn(async move {
            tokio::time::sleep(inner.delay).await;
            let mut state = inner.lock();
            if state.generation != generation {
                return;
            }
            state.timer = None;
            let task = handle.spawn(run_sync(inner.user_id.clone(), Arc::clone(&inner.target)));
            state.in_flight.push(task);
        }));
    }

    /// Whether a timer is armed and has not fired yet.
    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.inner.lock().timer.is_some()
    }

    /// Disarm the pending timer without syncing. Returns whether one was
    /// armed.
    pub fn cancel(&self) -> bool {
        let mut state = self.inner.lock();
        state.generation += 1;
        state.timer.take().is_some_and(|timer| {
            timer.abort();
            true
        })
    }

    /// Fire a pending timer immediately and wait for every in-flight sync.
    /// Returns whether a pending sync was fired.
    pub async fn flush(&self) -> bool {
        let (fire, in_flight) = {
            let mut state = self.inner.lock();
            state.generation += 1;
            let fire = state.timer.take().is_some_and(|timer| {
                timer.abort();
                true
            });
            (fire, std::mem::take(&mut state.in_flight))
        };

        for task in in_flight {
            if let Err(error) = task.await {
                warn!(user_id = %self.inner.user_id, %error, "sync task did not complete");
            }
        }
        if fire {
            run_sync(self.inner.user_id.clone(), Arc::clone(&self.inner.target)).await;
        }
        fire
    }
}

/// Per-user debouncers created on demand.
pub struct SyncScheduler {
    binder: Arc<dyn SyncBinder>,
    delay: Duration,
    handle: Handle,
    debouncers: Mutex<HashMap<String, Arc<SyncDebouncer>>>,
}

impl std::fmt::Debug for SyncScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncScheduler")
            .field("delay", &self.delay)
            .finish_non_exhaustive()
    }
}

impl SyncScheduler {
    #[must_use]
    pub fn new(binder: Arc<dyn SyncBinder>, delay: Duration, handle: Handle) -> Self {
        Self {
            binder,
            delay,
            handle,
            debouncers: Mutex::new(HashMap::new()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Arc<SyncDebouncer>>> {
        self.debouncers.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn debouncer(&self, user_id: &str) -> Arc<SyncDebouncer> {
        let mut debouncers = self.lock();
        Arc::clone(debouncers.entry(user_id.to_string()).or_insert_with(|| {
            Arc::new(SyncDebouncer::new(
                user_id,
                self.binder.bind(user_id),
                self.delay,
                self.handle.clone(),
            ))
        }))
    }

    pub fn schedule(&self, user_id: &str) {
        self.debouncer(user_id).schedule();
    }

    #[must_use]
    pub fn is_pending(&self, user_id: &str) -> bool {
        self.lock()
            .get(user_id)
            .is_some_and(|debouncer| debouncer.is_pending())
    }

    /// Flush every user's debouncer; returns how many pending syncs fired.
    pub async fn flush_all(&self) -> usize {
        let debouncers: Vec<Arc<SyncDebouncer>> = self.lock().values().cloned().collect();
        let mut fired = 0;
        for debouncer in debouncers {
            if debouncer.flush().await {
                fired += 1;
            }
        }
        fired
    }
}
