//! Error types for shexpect.

use std::io;
use std::time::Duration;
use thiserror::Error;

/// Errors returned by [`ShellSession`](crate::ShellSession) operations.
#[derive(Error, Debug)]
pub enum SessionError {
    /// The child process could not be started
    #[error("Spawn error: {0}")]
    Spawn(#[from] SpawnError),

    /// An expect ran out of budget before a matching line arrived
    #[error("Timed out because of: {cause} (timeout={timeout:?}, session={session_id})")]
    Timeout {
        cause: String,
        timeout: Duration,
        session_id: String,
    },

    /// The session has already been stopped
    #[error("Session '{session_id}' is stopped")]
    Stopped { session_id: String },

    /// Invalid regex pattern
    #[error("Invalid regex pattern: {0}")]
    InvalidPattern(#[from] regex::Error),

    /// Writing to the child's input failed
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Invalid session configuration
    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),
}

impl SessionError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, SessionError::Timeout { .. })
    }
}

/// Process creation failures. These are never retried.
#[derive(Error, Debug)]
pub enum SpawnError {
    /// The operating system refused to start the program
    #[error("Failed to spawn '{program}': {source}")]
    Io {
        program: String,
        #[source]
        source: io::Error,
    },

    /// PTY allocation or spawn failed
    #[error("PTY error: {0}")]
    Pty(String),

    /// A requested stdio pipe was not set up
    #[error("Child process has no {0} stream")]
    MissingStream(&'static str),

    /// The capture thread could not be started
    #[error("Failed to start capture thread: {0}")]
    Thread(#[source] io::Error),
}

/// Rejected [`SessionConfig`](crate::SessionConfig) values.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("line buffer capacity must be at least 1")]
    ZeroCapacity,

    #[error("prompt budget must allow at least one attempt")]
    ZeroPromptAttempts,

    /// `read_line` and `read_all` would never block on a live child
    #[error("default budget must allow a non-zero wait")]
    ZeroDefaultBudget,
}

/// Result type alias using [`SessionError`].
pub type Result<T> = std::result::Result<T, SessionError>;
