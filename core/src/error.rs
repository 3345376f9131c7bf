use std::path::PathBuf;

use thiserror::Error;

// ---------------------------------------------------------------------------
// Dispatch errors
// ---------------------------------------------------------------------------

/// Per-request failures. None of these are fatal to the session: the
/// dispatcher turns each one into a single line of output, and the
/// `Display` text is exactly that line.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DispatchError {
    #[error("'{0}' is not a recognized command.")]
    UnknownCommand(String),

    #[error("You are not authorized to use that command.")]
    Unauthorized,

    #[error("{0}")]
    ArgumentParse(String),

    #[error("An error occurred: {0}")]
    HandlerRuntime(String),
}

impl DispatchError {
    pub fn parse(message: impl Into<String>) -> Self {
        DispatchError::ArgumentParse(message.into())
    }

    pub fn runtime(message: impl Into<String>) -> Self {
        DispatchError::HandlerRuntime(message.into())
    }
}


/// Failure inside a variable or user store.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{0}")]
pub struct StoreError(pub String);

impl From<StoreError> for DispatchError {
    fn from(e: StoreError) -> Self {
        DispatchError::HandlerRuntime(e.0)
    }
}


// ---------------------------------------------------------------------------
// Plumbing errors
// ---------------------------------------------------------------------------

/// Errors from the transport, session pool, settings and daemon layers.
#[derive(Debug, Error)]
pub enum TerminalError {
    #[error("I/O error while {operation} at {path}: {source}")]
    Io {
        operation: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("socket error while {operation}: {source}")]
    Socket {
        operation: &'static str,
        #[source]
        source: std::io::Error,
    },

    #[error("empty frame")]
    EmptyFrame,

    #[error("frame too large: {len} bytes (limit {limit})")]
    FrameTooLarge { len: usize, limit: usize },

    #[error("malformed frame: {0}")]
    MalformedFrame(#[source] serde_json::Error),

    #[error("failed to parse settings {path}: {source}")]
    Settings {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("unknown session {0}")]
    UnknownSession(u64),

    #[error("session {0} is closed")]
    SessionClosed(u64),

    #[error("session {0} did not answer in time")]
    Timeout(u64),

    #[error("failed to spawn worker thread: {0}")]
    Spawn(#[source] std::io::Error),

    #[error("protocol error: {0}")]
    Protocol(String),

    #[error("command '{0}' is registered twice")]
    DuplicateCommand(String),

    #[error("daemon already running with pid {0}")]
    AlreadyRunning(u32),

    #[error("server error: {0}")]
    Remote(String),
}

impl TerminalError {
    #[must_use]
    pub fn io(operation: &'static str, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        TerminalError::Io {
            operation,
            path: path.into(),
            source,
        }
    }

    #[must_use]
    pub fn socket(operation: &'static str, source: std::io::Error) -> Self {
        TerminalError::Socket { operation, source }
    }
}
