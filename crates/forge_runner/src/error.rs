//! Error types for the runner module.

use thiserror::Error;

/// Result type alias for sandbox operations.
pub type SandboxResult<T> = Result<T, SandboxError>;

/// Errors that can occur during sandbox operations.
#[derive(Error, Debug)]
pub enum SandboxError {
    #[error("Sandbox not available: {0}")]
    NotAvailable(String),

    #[error("Sandbox creation failed: {0}")]
    CreateFailed(String),

    #[error("Command execution failed: {0}")]
    ExecutionFailed(String),

    #[error("Command timeout after {0} seconds")]
    Timeout(u64),

    #[error("Session not found: {0}")]
    SessionNotFound(String),

    #[error("Session already destroyed: {0}")]
    SessionDestroyed(String),

    #[error("Path escapes the session root: {0}")]
    InvalidPath(String),

    #[error("Image pull failed: {0}")]
    ImagePullFailed(String),

    #[error("Docker API error: {0}")]
    DockerApi(#[from] bollard::errors::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
