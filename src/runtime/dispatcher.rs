use super::{mode::ExecutionResult,
            operation::Operation,
            session::SessionId,
            worker::Command};
use crate::error::BrowserError;
use std::{sync::mpsc as std_mpsc, time::Duration};
use tokio::sync::mpsc;

/// Hands operations to a worker loop and waits for them with a deadline.
///
/// The deadline bounds the caller's wait only. An operation that outlives it
/// keeps running on the worker and its result is dropped when it lands.
pub(crate) struct Dispatcher<E> {
    session: SessionId,
    commands: mpsc::UnboundedSender<Command<E>>,
}

impl<E: 'static> Dispatcher<E> {
    pub(crate) fn new(session: SessionId, commands: mpsc::UnboundedSender<Command<E>>) -> Self {
        Self { session, commands }
    }

    pub(crate) fn dispatch<T: Send + 'static>(&self, operation: Operation<E, T>, timeout: Duration) -> ExecutionResult<T> {
        let description = operation.description().to_string();
        let (reply, completion) = std_mpsc::channel();

        if self.commands.send(Command::Run(operation.into_job(reply))).is_err() {
            log::error!("session {}: worker closed its queue, cannot run '{}'", self.session, description);
            return ExecutionResult::Failure(BrowserError::WorkerUnavailable);
        }

        match completion.recv_timeout(timeout) {
            Ok(Ok(value)) => ExecutionResult::Success(value),
            Ok(Err(error)) => ExecutionResult::Failure(error),
            Err(std_mpsc::RecvTimeoutError::Timeout) => {
                log::debug!("session {}: gave up waiting for '{}' after {:?}", self.session, description, timeout);
                ExecutionResult::TimedOut { timeout }
            }
            // The job was dropped without running: the worker is shutting down
            Err(std_mpsc::RecvTimeoutError::Disconnected) => ExecutionResult::Failure(BrowserError::Discarded(description)),
        }
    }
}
