use super::{dispatcher::Dispatcher,
            mode::{ExecutionMode, ExecutionResult},
            operation::Operation,
            worker::WorkerLoop};
use crate::{browser::Launcher,
            config::ScraperConfig,
            error::{BrowserError, Result}};
use serde::Serialize;
use std::{fmt,
          sync::{Arc, Mutex, MutexGuard, PoisonError,
                 atomic::{AtomicU64, Ordering}},
          thread::ThreadId,
          time::Duration};

static NEXT_SESSION: AtomicU64 = AtomicU64::new(1);

/// Process-unique session identifier, used in log lines
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct SessionId(pub(crate) u64);

impl SessionId {
    fn next() -> Self {
        SessionId(NEXT_SESSION.fetch_add(1, Ordering::Relaxed))
    }

    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SessionState {
    Idle,
    Starting,
    Running,
    Stopping,
    Stopped,
}

/// Wait bounds used by a session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    /// Default dispatch wait for operations without their own timeout
    pub operation: Duration,
    pub startup: Duration,
    pub shutdown: Duration,
}

impl From<&ScraperConfig> for Timeouts {
    fn from(config: &ScraperConfig) -> Self {
        Self {
            operation: Duration::from_millis(config.timeout_ms),
            startup: Duration::from_millis(config.startup_timeout_ms),
            shutdown: Duration::from_millis(config.shutdown_timeout_ms),
        }
    }
}

/// Dispatch counters, kept across restarts
#[derive(Debug, Default)]
struct Counters {
    dispatched: AtomicU64,
    succeeded: AtomicU64,
    failed: AtomicU64,
    timed_out: AtomicU64,
    suppressed: AtomicU64,
}

/// Snapshot of a session's dispatch counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SessionStats {
    pub dispatched: u64,
    pub succeeded: u64,
    pub failed: u64,
    pub timed_out: u64,
    /// Failures and timeouts swallowed by resilient mode
    pub suppressed: u64,
}

struct Inner<E> {
    state: SessionState,
    worker: Option<WorkerLoop<E>>,
}

/// One logical automation context: a worker loop, its lifecycle state and
/// the execution mode chosen at construction.
pub struct Session<L: Launcher> {
    id: SessionId,
    mode: ExecutionMode,
    timeouts: Timeouts,
    launcher: Arc<L>,
    inner: Mutex<Inner<L::Engine>>,
    counters: Counters,
}

impl<L: Launcher> Session<L> {
    pub fn new(launcher: L, mode: ExecutionMode, timeouts: Timeouts) -> Self {
        Self {
            id: SessionId::next(),
            mode,
            timeouts,
            launcher: Arc::new(launcher),
            inner: Mutex::new(Inner { state: SessionState::Idle, worker: None }),
            counters: Counters::default(),
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn mode(&self) -> ExecutionMode {
        self.mode
    }

    pub fn timeouts(&self) -> Timeouts {
        self.timeouts
    }

    pub fn state(&self) -> SessionState {
        self.lock().state
    }

    pub fn is_running(&self) -> bool {
        self.state() == SessionState::Running
    }

    /// Thread running the current worker loop, if any
    pub fn worker_thread(&self) -> Option<ThreadId> {
        self.lock().worker.as_ref().and_then(|w| w.thread_id())
    }

    pub fn stats(&self) -> SessionStats {
        SessionStats {
            dispatched: self.counters.dispatched.load(Ordering::Relaxed),
            succeeded: self.counters.succeeded.load(Ordering::Relaxed),
            failed: self.counters.failed.load(Ordering::Relaxed),
            timed_out: self.counters.timed_out.load(Ordering::Relaxed),
            suppressed: self.counters.suppressed.load(Ordering::Relaxed),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner<L::Engine>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Spawn the worker loop and wait for it to become ready.
    /// A no-op on a running session.
    pub fn start(&self) -> Result<()> {
        let mut inner = self.lock();
        if inner.state == SessionState::Running {
            return Ok(());
        }

        let previous = inner.state;
        inner.state = SessionState::Starting;
        log::info!("session {}: starting ({} mode)", self.id, self.mode);

        match WorkerLoop::spawn(Arc::clone(&self.launcher), self.id, self.timeouts.startup) {
            Ok(worker) => {
                inner.worker = Some(worker);
                inner.state = SessionState::Running;
                log::info!("session {}: running", self.id);
                Ok(())
            }
            Err(e) => {
                inner.state = previous;
                log::error!("session {}: {}", self.id, e);
                Err(e)
            }
        }
    }

    /// Tear the worker loop down and join it within the shutdown bound.
    /// A no-op on an idle or stopped session; never fails.
    pub fn stop(&self) {
        let mut inner = self.lock();
        let Some(worker) = self.begin_stop(&mut inner) else {
            return;
        };

        worker.shutdown(self.timeouts.shutdown);
        inner.state = SessionState::Stopped;
        log::info!("session {}: stopped", self.id);
    }

    /// Like [`Session::stop`], but returns immediately and joins the worker on a
    /// reaper thread. Used when the worker may still be busy with an abandoned
    /// operation.
    pub(crate) fn retire(&self) {
        let mut inner = self.lock();
        let Some(worker) = self.begin_stop(&mut inner) else {
            return;
        };

        worker.shutdown_in_background(self.timeouts.shutdown);
        inner.state = SessionState::Stopped;
        log::info!("session {}: retired", self.id);
    }

    fn begin_stop(&self, inner: &mut Inner<L::Engine>) -> Option<WorkerLoop<L::Engine>> {
        match inner.state {
            SessionState::Idle | SessionState::Stopped => return None,
            _ => {}
        }

        inner.state = SessionState::Stopping;
        log::info!("session {}: stopping", self.id);
        let worker = inner.worker.take();
        if worker.is_none() {
            inner.state = SessionState::Stopped;
        }
        worker
    }

    /// Submit an operation and block until it completes or its timeout elapses.
    ///
    /// Fails with [`BrowserError::SessionNotStarted`] unless the session is running,
    /// whatever the execution mode.
    pub fn dispatch<T: Send + 'static>(&self, operation: Operation<L::Engine, T>) -> Result<ExecutionResult<T>> {
        let dispatcher = {
            let inner = self.lock();
            match (&inner.state, &inner.worker) {
                (SessionState::Running, Some(worker)) => Dispatcher::new(self.id, worker.sender()),
                _ => return Err(BrowserError::SessionNotStarted),
            }
        };

        let timeout = operation.timeout().unwrap_or(self.timeouts.operation);
        self.counters.dispatched.fetch_add(1, Ordering::Relaxed);

        let outcome = dispatcher.dispatch(operation, timeout);
        let counter = match &outcome {
            ExecutionResult::Success(_) => &self.counters.succeeded,
            ExecutionResult::Failure(_) => &self.counters.failed,
            ExecutionResult::TimedOut { .. } => &self.counters.timed_out,
        };
        counter.fetch_add(1, Ordering::Relaxed);
        Ok(outcome)
    }

    /// Dispatch and settle the outcome according to the execution mode
    pub fn execute<T: Send + 'static>(&self, operation: Operation<L::Engine, T>) -> Result<Option<T>> {
        let description = operation.description().to_string();
        let outcome = self.dispatch(operation)?;
        let failed = !outcome.is_success();

        let settled = self.mode.settle(self.id, &description, outcome);
        if failed && settled.is_ok() {
            self.counters.suppressed.fetch_add(1, Ordering::Relaxed);
        }
        settled
    }
}

impl<L: Launcher> fmt::Debug for Session<L> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("mode", &self.mode)
            .field("state", &self.state())
            .field("timeouts", &self.timeouts)
            .finish()
    }
}
