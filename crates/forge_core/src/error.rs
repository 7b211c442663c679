//! Error types for the core module.

use thiserror::Error;

/// Result type alias for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors that can occur while generating a project.
///
/// Only [`CoreError::ServiceUnavailable`] ever escapes
/// [`GenerationOrchestrator::generate`](crate::GenerationOrchestrator::generate);
/// everything else is recorded into the result as text.
#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    #[error("Generation timed out after {0}s")]
    GenerationTimeout(u64),

    #[error("Validation failed: {0}")]
    ValidationFailure(String),

    #[error("Sandbox execution failed: {0}")]
    SandboxExecution(String),

    #[error("Maximum iterations exceeded: gate still failing after {0} iteration(s)")]
    MaxIterationsExceeded(u32),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Unsafe artifact path: {0}")]
    UnsafePath(String),

    #[error("Request error: {0}")]
    Spec(#[from] forge_spec::SpecError),

    #[error("Sandbox error: {0}")]
    Sandbox(#[from] forge_runner::SandboxError),

    #[error("Oracle error: {0}")]
    Oracle(#[from] forge_oracle::OracleError),

    #[error("Template error: {0}")]
    Template(#[from] forge_templates::TemplateError),

    #[error("Gate error: {0}")]
    Gate(#[from] forge_policy::GateError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}
