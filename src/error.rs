use thiserror::Error;

/// Errors raised by sessions, the dispatcher and browser operations
#[derive(Debug, Error)]
pub enum BrowserError {
    /// A facade call was made while the session was not running
    #[error("Session not started: call start() first")]
    SessionNotStarted,

    /// The worker loop did not become ready
    #[error("Session startup failed: {0}")]
    StartupFailed(String),

    #[error("Failed to launch browser: {0}")]
    LaunchFailed(String),

    #[error("Failed to connect to browser: {0}")]
    ConnectionFailed(String),

    #[error("Navigation failed: {0}")]
    NavigationFailed(String),

    #[error("Element not found: {0}")]
    ElementNotFound(String),

    #[error("JavaScript evaluation failed: {0}")]
    EvaluationFailed(String),

    #[error("Screenshot failed: {0}")]
    ScreenshotFailed(String),

    #[error("Tab operation failed: {0}")]
    TabOperationFailed(String),

    /// The dispatcher gave up waiting for an operation
    #[error("Operation '{operation}' timed out after {timeout_ms}ms")]
    Timeout { operation: String, timeout_ms: u64 },

    /// The operation was still queued when the worker shut down
    #[error("Operation '{0}' was discarded before it ran")]
    Discarded(String),

    /// The action panicked on the worker; the worker itself keeps running
    #[error("Operation '{operation}' panicked: {message}")]
    OperationPanicked { operation: String, message: String },

    #[error("Worker loop is no longer accepting operations")]
    WorkerUnavailable,

    /// Only ever logged by `stop()`
    #[error("Worker thread did not exit within {timeout_ms}ms and was abandoned")]
    ShutdownJoinTimeout { timeout_ms: u64 },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl BrowserError {
    /// Whether the error is a caller contract or environment failure rather than
    /// an operational one. These are never suppressed by resilient execution.
    pub fn is_contract_violation(&self) -> bool {
        matches!(self, BrowserError::SessionNotStarted | BrowserError::StartupFailed(_))
    }
}

/// Result type alias for browser operations
pub type Result<T> = std::result::Result<T, BrowserError>;
