//! Error types for the oracle module.

use thiserror::Error;

/// Result type alias for oracle operations.
pub type OracleResult<T> = Result<T, OracleError>;

/// Errors that can occur while querying an oracle.
#[derive(Error, Debug)]
pub enum OracleError {
    #[error("Oracle not configured. Set ANTHROPIC_API_KEY or OPENAI_API_KEY")]
    NotConfigured,

    #[error("Oracle unavailable: {0}")]
    Unavailable(String),

    #[error("Oracle request failed: {0}")]
    Request(String),

    #[error("Oracle timed out after {0} seconds")]
    Timeout(u64),

    #[error("Invalid oracle response: {0}")]
    InvalidResponse(String),

    #[error("Turn budget must be at least 1")]
    InvalidTurnBudget,
}
