//! Error types for the agent runtime

use thiserror::Error;

/// Main error type for the agent runtime
#[derive(Error, Debug)]
pub enum RuntimeError {
    /// Spawn attempted while the background agent limit is reached
    #[error(
        "Maximum concurrent background agents reached ({max}). Wait for a running agent to finish or abort one before spawning another."
    )]
    CapacityExceeded {
        /// The configured limit
        max: usize,
    },

    /// Spawn attempted after the manager was shut down
    #[error("Background agent manager is shut down")]
    ShutDown,

    /// Agent name did not resolve to a known agent type
    #[error("Unknown agent type: {0}")]
    UnknownAgent(String),

    /// Background task id is not registered
    #[error("Background agent task not found: {0}")]
    TaskNotFound(String),

    /// Permission request id is unknown or already resolved
    #[error("Permission request not found or already resolved: {0}")]
    PermissionNotFound(String),

    /// A request for the same session and tool call is still open
    #[error("Permission request already pending for session {session_id} (call {call_id})")]
    PermissionPending {
        /// Session owning the open request
        session_id: String,
        /// Tool call the open request belongs to
        call_id: String,
    },

    /// The approver rejected the tool invocation
    #[error("Permission rejected: {message}")]
    PermissionRejected {
        /// Explanation surfaced to the agent
        message: String,
    },

    /// Session-scoped work was cancelled
    #[error("Aborted: {0}")]
    Aborted(String),

    /// BiDi override characters in text destined for display or execution
    #[error(
        "Refusing command: BiDi override characters can make the displayed text differ from what executes ({})",
        code_points.join(", ")
    )]
    SecurityViolation {
        /// Offending code points formatted as `U+XXXX`
        code_points: Vec<String>,
    },

    /// Session collaborator failure
    #[error("Session error: {0}")]
    Session(String),

    /// Prompt continuation failure
    #[error("Prompt error: {0}")]
    Prompt(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// JSON encode/decode error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for runtime operations
pub type Result<T> = std::result::Result<T, RuntimeError>;

impl RuntimeError {
    /// Create a capacity error
    #[must_use]
    pub fn capacity_exceeded(max: usize) -> Self {
        Self::CapacityExceeded { max }
    }

    /// Create an unknown agent error
    pub fn unknown_agent(name: impl Into<String>) -> Self {
        Self::UnknownAgent(name.into())
    }

    /// Create a task not found error
    pub fn task_not_found(id: impl Into<String>) -> Self {
        Self::TaskNotFound(id.into())
    }

    /// Create a permission not found error
    pub fn permission_not_found(id: impl Into<String>) -> Self {
        Self::PermissionNotFound(id.into())
    }

    /// Create a permission rejected error
    pub fn permission_rejected(message: impl Into<String>) -> Self {
        Self::PermissionRejected {
            message: message.into(),
        }
    }

    /// Create an aborted error
    pub fn aborted(msg: impl Into<String>) -> Self {
        Self::Aborted(msg.into())
    }

    /// Create a session collaborator error
    pub fn session(msg: impl Into<String>) -> Self {
        Self::Session(msg.into())
    }

    /// Create a prompt error
    pub fn prompt(msg: impl Into<String>) -> Self {
        Self::Prompt(msg.into())
    }

    /// Create an invalid configuration error
    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Self::InvalidConfig(msg.into())
    }

    /// True when the error reports cancellation rather than a failure
    #[must_use]
    pub fn is_aborted(&self) -> bool {
        matches!(self, Self::Aborted(_))
    }
}
