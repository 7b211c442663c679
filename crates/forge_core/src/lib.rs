//! # forge_core
//!
//! Generation orchestrator for Forge.
//!
//! This crate turns an accepted [`GenerationRequest`](forge_spec::GenerationRequest)
//! into a project by iterating an oracle against the validation gate inside a
//! sandbox session, and degrades instead of failing when it cannot.
//!
//! # Architecture
//!
//! - **Orchestrator**: strategy selection, the iterate/validate loop, the
//!   whole-run timeout and session cleanup
//! - **Brief**: the task brief written into the session and the prompts built from it
//! - **Research**: concurrent API research and PRD composition
//! - **Collector**: reads the finished project back out of the session
//! - **Fallback**: degraded (unsandboxed) and chunked (template-only) generation
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use forge_core::{GenerationOrchestrator, OrchestratorConfig};
//! use forge_oracle::LlmOracle;
//! use forge_runner::LocalSandbox;
//! use forge_spec::{GenerationRequest, KeywordClassifier, TargetType};
//!
//! let orchestrator = GenerationOrchestrator::builder()
//!     .oracle(Arc::new(LlmOracle::from_env()?))
//!     .sandbox(Arc::new(LocalSandbox::new()))
//!     .classifier(Arc::new(KeywordClassifier::new()))
//!     .config(OrchestratorConfig::default())
//!     .build()?;
//!
//! let request = GenerationRequest::new("weather", "A weather plugin using OpenWeatherMap", TargetType::Plugin);
//! let result = orchestrator.generate(request).await?;
//! println!("{}", result.summary());
//! ```

pub mod brief;
pub mod collector;
pub mod config;
pub mod error;
pub mod fallback;
pub mod orchestrator;
pub mod research;
pub mod result;

pub use brief::{fix_prompt, initial_prompt, write_feedback, TaskBrief};
pub use collector::{collect, materialize, SKIPPED_DIRS};
pub use config::{Environment, OrchestratorConfig, CONFIG_FILE};
pub use error::{CoreError, CoreResult};
pub use fallback::{chunked_generate, degraded_generate, DegradedOutput, ESSENTIAL_FILES, UNVERIFIED_WARNING};
pub use orchestrator::{GenerationOrchestrator, OrchestratorBuilder};
pub use research::{compose_prd, research_apis, research_targets, ApiResearch, ResearchReport, ResearchTarget, PRD_FILE};
pub use result::{GenerationResult, GenerationStrategy, Iteration};
