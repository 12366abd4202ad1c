use super::session::SessionId;
use crate::error::{BrowserError, Result};
use serde::{Deserialize, Serialize};
use std::{fmt, time::Duration};

/// Log target of suppressed failures in resilient mode
pub const RESILIENT_LOG_TARGET: &str = "ga_scrap::resilient";

/// Outcome of a single dispatch
#[derive(Debug)]
pub enum ExecutionResult<T> {
    /// The action completed and produced a value
    Success(T),
    /// The action itself failed
    Failure(BrowserError),
    /// The caller stopped waiting. The action may still be running on the worker.
    TimedOut { timeout: Duration },
}

impl<T> ExecutionResult<T> {
    pub fn is_success(&self) -> bool {
        matches!(self, ExecutionResult::Success(_))
    }

    pub fn is_timed_out(&self) -> bool {
        matches!(self, ExecutionResult::TimedOut { .. })
    }
}

/// How operational failures are surfaced. Fixed for the lifetime of a session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionMode {
    /// Failures and timeouts are raised to the caller
    #[default]
    Strict,
    /// Failures and timeouts are logged and replaced by `None`; the session stays usable
    Resilient,
}

impl ExecutionMode {
    /// Turn a dispatch outcome into what the facade returns.
    ///
    /// `Ok(None)` is the "no value" sentinel and is only produced in resilient mode.
    pub fn settle<T>(self, session: SessionId, operation: &str, outcome: ExecutionResult<T>) -> Result<Option<T>> {
        match (self, outcome) {
            (_, ExecutionResult::Success(value)) => Ok(Some(value)),
            (ExecutionMode::Strict, ExecutionResult::Failure(error)) => Err(error),
            (ExecutionMode::Strict, ExecutionResult::TimedOut { timeout }) => {
                Err(BrowserError::Timeout { operation: operation.to_string(), timeout_ms: timeout.as_millis() as u64 })
            }
            (ExecutionMode::Resilient, ExecutionResult::Failure(error)) => {
                log::warn!(
                    target: RESILIENT_LOG_TARGET,
                    "session {}: suppressed failure in '{}': {}",
                    session,
                    operation,
                    error
                );
                Ok(None)
            }
            (ExecutionMode::Resilient, ExecutionResult::TimedOut { timeout }) => {
                log::warn!(
                    target: RESILIENT_LOG_TARGET,
                    "session {}: suppressed timeout in '{}' after {}ms",
                    session,
                    operation,
                    timeout.as_millis()
                );
                Ok(None)
            }
        }
    }
}

impl fmt::Display for ExecutionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExecutionMode::Strict => f.write_str("strict"),
            ExecutionMode::Resilient => f.write_str("resilient"),
        }
    }
}
