use crate::error::{BrowserError, Result};
use std::{any::Any, fmt, future::Future, pin::Pin, rc::Rc, sync::mpsc, time::Duration};

/// A future that stays on the worker thread
pub type LocalBoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + 'a>>;

type Action<E, T> = Box<dyn FnOnce(Rc<E>) -> LocalBoxFuture<'static, Result<T>> + Send>;

/// A unit of work for the worker loop.
///
/// The action is built on the calling thread and only invoked on the worker,
/// where it receives the engine. Its future therefore does not need to be `Send`.
/// Operations are consumed by a single dispatch and never retried.
pub struct Operation<E, T> {
    description: String,
    timeout: Option<Duration>,
    action: Action<E, T>,
}

impl<E: 'static, T: 'static> Operation<E, T> {
    pub fn new<F, Fut>(description: impl Into<String>, action: F) -> Self
    where
        F: FnOnce(Rc<E>) -> Fut + Send + 'static,
        Fut: Future<Output = Result<T>> + 'static,
    {
        Self {
            description: description.into(),
            timeout: None,
            action: Box::new(move |engine| -> LocalBoxFuture<'static, Result<T>> { Box::pin(action(engine)) }),
        }
    }

    /// Override the session's default wait bound for this operation
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Run the action in place. Only meaningful where the engine lives, e.g. to
    /// compose operations inside another operation.
    pub async fn run(self, engine: Rc<E>) -> Result<T> {
        (self.action)(engine).await
    }

    /// Chain a synchronous transformation of the result, still run on the worker
    pub fn map<U, F>(self, f: F) -> Operation<E, U>
    where
        U: 'static,
        F: FnOnce(T) -> U + Send + 'static,
    {
        let action = self.action;
        Operation {
            description: self.description,
            timeout: self.timeout,
            action: Box::new(move |engine| -> LocalBoxFuture<'static, Result<U>> {
                Box::pin(async move {
                    let value = action(engine).await?;
                    Ok(f(value))
                })
            }),
        }
    }
}

impl<E: 'static, T: Send + 'static> Operation<E, T> {
    /// Erase the result type. The job posts its result to `reply`; if the caller
    /// has stopped waiting the result is dropped.
    pub(crate) fn into_job(self, reply: mpsc::Sender<Result<T>>) -> Job<E> {
        let Operation { description, action, .. } = self;
        let label = description.clone();
        let fallback = reply.clone();

        Job {
            description,
            run: Box::new(move |engine| -> LocalBoxFuture<'static, ()> {
                Box::pin(async move {
                    let result = action(engine).await;
                    if reply.send(result).is_err() {
                        log::debug!("Discarding late result of '{}': caller stopped waiting", label);
                    }
                })
            }),
            panicked: Box::new(move |error| {
                let _ = fallback.send(Err(error));
            }),
        }
    }
}

impl<E, T> fmt::Debug for Operation<E, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Operation")
            .field("description", &self.description)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

/// A type-erased operation as it travels to the worker
pub(crate) struct Job<E> {
    pub(crate) description: String,
    run: Box<dyn FnOnce(Rc<E>) -> LocalBoxFuture<'static, ()> + Send>,
    panicked: Box<dyn FnOnce(BrowserError) + Send>,
}

impl<E: 'static> Job<E> {
    /// Run the action as a local task. Must be called inside a `LocalSet`.
    ///
    /// A panic in the action is reported to the caller as
    /// [`BrowserError::OperationPanicked`] instead of unwinding into the worker.
    pub(crate) async fn run(self, engine: Rc<E>) {
        let Job { description, run, panicked } = self;

        match tokio::task::spawn_local(run(engine)).await {
            Ok(()) => {}
            Err(e) if e.is_panic() => {
                let message = panic_message(e.into_panic());
                log::error!("Operation '{}' panicked: {}", description, message);
                panicked(BrowserError::OperationPanicked { operation: description, message });
            }
            Err(e) => log::debug!("Operation '{}' was cancelled: {}", description, e),
        }
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    match payload.downcast::<String>() {
        Ok(message) => *message,
        Err(payload) => payload
            .downcast_ref::<&str>()
            .map(|message| message.to_string())
            .unwrap_or_else(|| "unknown panic".to_string()),
    }
}
