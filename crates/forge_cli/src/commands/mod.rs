//! CLI command definitions.
//!
//! Each subcommand maps to one entry point of the generation pipeline.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use tracing::{info, warn};

use forge_core::{OrchestratorConfig, CONFIG_FILE};
use forge_oracle::{GenerationOracle, LlmOracle};
use forge_runner::{DockerSandbox, DockerSandboxOptions, LocalSandbox, NullSandbox, SandboxProvider};

pub mod classify;
pub mod generate;
pub mod research;
pub mod validate;

/// Forge - generate, validate and repair TypeScript projects from a description
#[derive(Parser)]
#[command(name = "forge")]
#[command(version, about = "Forge - generate validated projects from a description")]
#[command(long_about = r#"
Forge turns a free-text description into a TypeScript project. It drafts the
project with a language model, then builds, lints, typechecks, tests and
reviews it inside a sandbox, feeding failures back until the gate passes.

COMMANDS:
  generate   → Run the full pipeline and write the project to disk
  classify   → Show the requirement model derived from a description
  validate   → Re-run the validation gate against a project on disk
  research   → Research the APIs a description needs and print a PRD

ENVIRONMENT:
  ANTHROPIC_API_KEY / OPENAI_API_KEY   Oracle credentials (Anthropic first)
  FORGE_LLM_MODEL                      Model override
  FORGE_ENV                            production | development
  FORGE_MAX_ITERATIONS                 Iteration budget
  FORGE_TIMEOUT_SECS                   Whole-run timeout
  FORGE_RESEARCH                       Enable API research (true/false)

EXIT CODES:
  0 - Success
  1 - General error
  2 - Invalid arguments
  3 - Validation failure
  4 - Template error
  5 - Service unavailable
"#)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Generate a project from a description
    Generate(generate::GenerateArgs),

    /// Classify a description into a requirement model
    Classify(classify::ClassifyArgs),

    /// Run the validation gate against a project on disk
    Validate(validate::ValidateArgs),

    /// Research APIs for a description and compose a PRD
    Research(research::ResearchArgs),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SandboxKind {
    /// Child processes in a temporary directory
    Local,
    /// One Docker container per session
    Docker,
    /// No sandbox: unverified generation
    None,
}

/// Load configuration from `path`, else `./forge.yaml` if present, else
/// defaults; `FORGE_*` overrides apply last.
pub fn load_config(path: Option<&Path>) -> Result<OrchestratorConfig> {
    let config = match path {
        Some(path) => OrchestratorConfig::load(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => {
            let default_path = PathBuf::from(CONFIG_FILE);
            if default_path.is_file() {
                info!("Using {}", CONFIG_FILE);
                OrchestratorConfig::load(&default_path).with_context(|| format!("Failed to load {}", CONFIG_FILE))?
            } else {
                OrchestratorConfig::default()
            }
        }
    };

    config
        .with_env_overrides()
        .context("Invalid FORGE_* environment override")
}

pub fn build_oracle() -> Result<Arc<dyn GenerationOracle>> {
    let oracle = LlmOracle::from_env().context("Failed to create generation oracle")?;
    info!("Oracle: {} ({})", oracle.provider().as_str(), oracle.model());
    Ok(Arc::new(oracle))
}

/// Sandbox provider for `kind`. A Docker daemon that cannot be reached
/// yields the null provider, which selects the degraded path.
pub async fn build_sandbox(kind: SandboxKind) -> Arc<dyn SandboxProvider> {
    match kind {
        SandboxKind::Local => Arc::new(LocalSandbox::new()),
        SandboxKind::Docker => match DockerSandbox::new(DockerSandboxOptions::default()).await {
            Ok(docker) => Arc::new(docker),
            Err(e) => {
                warn!("Docker unavailable ({}); continuing without a sandbox", e);
                Arc::new(NullSandbox)
            }
        },
        SandboxKind::None => Arc::new(NullSandbox),
    }
}

/// Resolve a possibly relative path against the current directory.
pub fn absolute(path: &Path) -> Result<PathBuf> {
    if path.is_absolute() {
        Ok(path.to_path_buf())
    } else {
        Ok(std::env::current_dir()?.join(path))
    }
}
