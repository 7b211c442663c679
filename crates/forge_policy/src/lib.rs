//! # forge_policy
//!
//! Validation gate for generated projects.
//!
//! The gate runs a fixed sequence of checks inside a sandbox session:
//!
//! - **install**: dependency installation
//! - **lint**: linter over the sources
//! - **typecheck**: compiler without emit
//! - **build**: full build
//! - **test**: test runner
//! - **security**: review of the sources by the generation oracle
//!
//! Each check has its own timeout. A check that fails, cannot start, or
//! runs out of time is recorded as failed; the gate itself never errors.
//! The aggregate verdict is the AND of every configured check.
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use forge_policy::{GateConfig, ValidationGate};
//! use forge_runner::{LocalSandbox, SandboxProvider};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let sandbox = Arc::new(LocalSandbox::new());
//!     let session = sandbox.attach("./my-plugin")?;
//!
//!     let gate = ValidationGate::new(GateConfig::default(), sandbox.clone());
//!     let result = gate.validate(&session).await;
//!     println!("{}", result.report());
//!     Ok(())
//! }
//! ```

pub mod check;
pub mod diagnostics;
pub mod error;
pub mod gate;
pub mod security;

pub use check::{CheckKind, CheckResult, ValidationResult};
pub use diagnostics::{DiagnosticParser, MAX_DIAGNOSTICS};
pub use error::{GateError, GateResult};
pub use gate::{CheckSpec, GateConfig, ValidationGate};
pub use security::{collect_sources, parse_issues, ReviewSources, DEFAULT_REVIEW_BYTES};
