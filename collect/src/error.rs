//! Error types for inventory collection.

use std::time::Duration;

use thiserror::Error;

/// Failure to run an external command to completion.
#[derive(Debug, Error)]
pub enum RunError {
    /// The program does not exist.
    #[error("{program} not found")]
    NotFound { program: String },

    /// The program exists but may not be executed.
    #[error("permission denied running {program}")]
    PermissionDenied { program: String },

    /// Any other spawn failure.
    #[error("failed to spawn {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// The program did not exit within its timeout and was killed.
    #[error("{program} timed out after {} ms", .timeout.as_millis())]
    TimedOut { program: String, timeout: Duration },

    /// Waiting on the child failed.
    #[error("failed to wait on {program}: {source}")]
    Wait {
        program: String,
        #[source]
        source: std::io::Error,
    },
}

/// Errors surfaced by collection, snapshot storage and signalling.
#[derive(Debug, Error)]
pub enum CollectError {
    /// The socket listing could not be produced. Fatal for a refresh cycle.
    #[error("socket listing unavailable: {0}")]
    SourceUnavailable(String),

    /// A secondary lookup (`ps`, cwd) failed. Never fatal for a refresh.
    #[error("lookup failed: {0}")]
    LookupFailed(String),

    /// Running an external command failed.
    #[error(transparent)]
    Run(#[from] RunError),

    /// Another refresh is still running on the same refresher.
    #[error("a refresh is already in progress")]
    RefreshInProgress,

    /// Sending a signal to a process failed.
    #[error("failed to signal process {pid}: {reason}")]
    Signal { pid: u32, reason: String },

    /// Filesystem I/O failure.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing or serialization failure.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Convenience alias for results with [`CollectError`].
pub type Result<T> = std::result::Result<T, CollectError>;
