//! Error types for the validation gate.

use thiserror::Error;

/// Result type alias for gate operations.
pub type GateResult<T> = Result<T, GateError>;

/// Errors that can occur while configuring the gate.
///
/// Running the gate never fails: check failures, including checks that
/// could not run, are part of the [`crate::ValidationResult`].
#[derive(Error, Debug)]
pub enum GateError {
    #[error("Invalid gate configuration: {0}")]
    InvalidConfiguration(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}
