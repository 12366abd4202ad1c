//! The worker loop: one dedicated thread per running session, driving a
//! single-threaded tokio runtime that owns the engine.
//!
//! ```text
//! caller threads ──► UnboundedSender<Command> ──► worker thread
//!                                                  ├─ current_thread runtime
//!                                                  ├─ Rc<Engine>
//!                                                  └─ one Job at a time, FIFO
//! ```

use super::{operation::Job, session::SessionId};
use crate::{browser::{Engine, Launcher},
            error::{BrowserError, Result}};
use std::{rc::Rc,
          sync::{Arc,
                 atomic::{AtomicBool, Ordering},
                 mpsc as std_mpsc},
          thread::{self, JoinHandle, ThreadId},
          time::Duration};
use tokio::sync::mpsc;

pub(crate) enum Command<E> {
    Run(Job<E>),
    Shutdown,
}

pub(crate) struct WorkerLoop<E> {
    session: SessionId,
    commands: mpsc::UnboundedSender<Command<E>>,
    closing: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
    exited: std_mpsc::Receiver<()>,
}

impl<E: Engine> WorkerLoop<E> {
    /// Spawn the worker thread and block until the engine is launched or
    /// `startup_timeout` elapses.
    pub(crate) fn spawn<L>(launcher: Arc<L>, session: SessionId, startup_timeout: Duration) -> Result<Self>
    where
        L: Launcher<Engine = E>,
    {
        let (commands, receiver) = mpsc::unbounded_channel();
        let (ready_tx, ready_rx) = std_mpsc::channel();
        let (exit_tx, exited) = std_mpsc::channel();
        let closing = Arc::new(AtomicBool::new(false));

        let thread = {
            let closing = Arc::clone(&closing);
            thread::Builder::new()
                .name(format!("ga-scrap-worker-{}", session.0))
                .spawn(move || {
                    run(launcher, session, receiver, ready_tx, closing);
                    let _ = exit_tx.send(());
                })
                .map_err(|e| BrowserError::StartupFailed(format!("Failed to spawn worker thread: {}", e)))?
        };

        match ready_rx.recv_timeout(startup_timeout) {
            Ok(Ok(())) => {
                log::debug!("session {}: worker loop ready", session);
                Ok(Self { session, commands, closing, thread: Some(thread), exited })
            }
            Ok(Err(e)) => {
                // The worker returns right after reporting a failed launch
                let _ = thread.join();
                Err(match e {
                    BrowserError::StartupFailed(reason) => BrowserError::StartupFailed(reason),
                    other => BrowserError::StartupFailed(other.to_string()),
                })
            }
            Err(std_mpsc::RecvTimeoutError::Timeout) => {
                // Dropping the sender makes the worker tear down as soon as launch returns
                closing.store(true, Ordering::Release);
                drop(commands);
                log::error!("session {}: worker not ready after {:?}, abandoning it", session, startup_timeout);
                Err(BrowserError::StartupFailed(format!(
                    "worker loop not ready within {}ms",
                    startup_timeout.as_millis()
                )))
            }
            Err(std_mpsc::RecvTimeoutError::Disconnected) => {
                let _ = thread.join();
                Err(BrowserError::StartupFailed("worker thread exited before signalling readiness".to_string()))
            }
        }
    }
}

impl<E> WorkerLoop<E> {
    pub(crate) fn sender(&self) -> mpsc::UnboundedSender<Command<E>> {
        self.commands.clone()
    }

    pub(crate) fn thread_id(&self) -> Option<ThreadId> {
        self.thread.as_ref().map(|t| t.thread().id())
    }

    /// Stop accepting work: anything still queued is discarded, then the
    /// engine is torn down.
    fn request_shutdown(&self) {
        self.closing.store(true, Ordering::Release);
        if self.commands.send(Command::Shutdown).is_err() {
            log::debug!("session {}: worker already gone", self.session);
        }
    }

    /// Request shutdown and join the worker, giving up after `bound`
    pub(crate) fn shutdown(mut self, bound: Duration) {
        self.request_shutdown();

        match self.exited.recv_timeout(bound) {
            Ok(()) | Err(std_mpsc::RecvTimeoutError::Disconnected) => {
                if let Some(thread) = self.thread.take() {
                    if thread.join().is_err() {
                        log::error!("session {}: worker thread panicked", self.session);
                    }
                }
                log::debug!("session {}: worker joined", self.session);
            }
            Err(std_mpsc::RecvTimeoutError::Timeout) => {
                let error = BrowserError::ShutdownJoinTimeout { timeout_ms: bound.as_millis() as u64 };
                log::error!("session {}: {}", self.session, error);
                // Dropping the handle detaches the thread
                self.thread.take();
            }
        }
    }
}

impl<E: 'static> WorkerLoop<E> {
    /// Request shutdown and leave the bounded join to a reaper thread
    pub(crate) fn shutdown_in_background(self, bound: Duration) {
        self.request_shutdown();

        let session = self.session;
        let reaper = thread::Builder::new()
            .name(format!("ga-scrap-reaper-{}", session.0))
            .spawn(move || self.shutdown(bound));
        if let Err(e) = reaper {
            log::error!("session {}: failed to spawn reaper thread: {}", session, e);
        }
    }
}

fn run<L: Launcher>(
    launcher: Arc<L>,
    session: SessionId,
    mut commands: mpsc::UnboundedReceiver<Command<L::Engine>>,
    ready: std_mpsc::Sender<Result<()>>,
    closing: Arc<AtomicBool>,
) {
    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(e) => {
            let _ = ready.send(Err(BrowserError::StartupFailed(format!("Failed to build worker runtime: {}", e))));
            return;
        }
    };

    // Jobs run as local tasks: a panicking action only takes its own task down
    let local = tokio::task::LocalSet::new();
    local.block_on(&runtime, async move {
        let engine = match launcher.launch().await {
            Ok(engine) => Rc::new(engine),
            Err(e) => {
                log::error!("session {}: engine launch failed: {}", session, e);
                let _ = ready.send(Err(e));
                return;
            }
        };

        if ready.send(Ok(())).is_err() {
            log::warn!("session {}: caller gave up during startup, closing engine", session);
            teardown(session, &*engine).await;
            return;
        }

        while let Some(command) = commands.recv().await {
            match command {
                Command::Run(job) => {
                    if closing.load(Ordering::Acquire) {
                        log::debug!("session {}: discarding queued '{}'", session, job.description);
                        continue;
                    }
                    log::trace!("session {}: running '{}'", session, job.description);
                    job.run(Rc::clone(&engine)).await;
                }
                Command::Shutdown => break,
            }
        }

        // Drain without running so queued callers are released promptly
        commands.close();
        while let Ok(command) = commands.try_recv() {
            if let Command::Run(job) = command {
                log::debug!("session {}: discarding queued '{}'", session, job.description);
            }
        }

        teardown(session, &*engine).await;
    });
}

/// Close pages, then the session-level context, then the engine itself.
/// Each step is attempted even if an earlier one failed.
async fn teardown<E: Engine>(session: SessionId, engine: &E) {
    for page in engine.pages() {
        if let Err(e) = engine.close_page(page).await {
            log::warn!("session {}: failed to close {}: {}", session, page, e);
        }
    }

    if let Err(e) = engine.close_context().await {
        log::warn!("session {}: failed to close browser context: {}", session, e);
    }

    if let Err(e) = engine.close().await {
        log::warn!("session {}: failed to close engine: {}", session, e);
    }

    log::info!("session {}: engine closed", session);
}
