//! Synchronous bridge to a single-threaded automation engine.
//!
//! A [`Session`] owns one worker thread running a cooperative scheduler. Callers on
//! any thread submit [`Operation`]s; the dispatcher queues them FIFO and blocks the
//! caller until the worker reports back or the operation's timeout elapses. The
//! session's [`ExecutionMode`] then decides whether a failure is raised or logged
//! and replaced by the "no value" sentinel.

mod dispatcher;
pub mod mode;
pub mod operation;
pub mod session;
mod worker;

pub use mode::{ExecutionMode, ExecutionResult, RESILIENT_LOG_TARGET};
pub use operation::{LocalBoxFuture, Operation};
pub use session::{Session, SessionId, SessionState, SessionStats, Timeouts};
