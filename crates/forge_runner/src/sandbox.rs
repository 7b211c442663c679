//! Sandbox provider trait and session types.

use std::fs;
use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::command::Command;
use crate::error::{SandboxError, SandboxResult};

/// Lifecycle state of a session.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SandboxState {
    Active,
    Destroyed,
}

/// An ephemeral execution environment owned by one generation request.
///
/// `working_directory` is a host path. Providers that isolate execution
/// (containers) mount it; file helpers below always operate on the host.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SandboxSession {
    pub id: String,
    pub working_directory: PathBuf,
    pub created_at: DateTime<Utc>,
    pub state: SandboxState,
    /// Name of the provider that created the session
    pub provider: String,
}

impl SandboxSession {
    pub fn new(id: impl Into<String>, working_directory: PathBuf, provider: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            working_directory,
            created_at: Utc::now(),
            state: SandboxState::Active,
            provider: provider.into(),
        }
    }

    pub fn is_active(&self) -> bool {
        self.state == SandboxState::Active
    }

    pub fn ensure_active(&self) -> SandboxResult<()> {
        if self.is_active() {
            Ok(())
        } else {
            Err(SandboxError::SessionDestroyed(self.id.clone()))
        }
    }

    /// Resolve a relative path inside the session root.
    ///
    /// Absolute paths and `..` components are rejected.
    pub fn resolve(&self, relative: impl AsRef<Path>) -> SandboxResult<PathBuf> {
        let relative = relative.as_ref();
        let escapes = relative.components().any(|c| {
            matches!(
                c,
                Component::ParentDir | Component::RootDir | Component::Prefix(_)
            )
        });
        if escapes || relative.as_os_str().is_empty() {
            return Err(SandboxError::InvalidPath(relative.display().to_string()));
        }
        Ok(self.working_directory.join(relative))
    }

    /// Write a file relative to the session root, creating parent directories.
    pub fn write_file(&self, relative: impl AsRef<Path>, content: &str) -> SandboxResult<PathBuf> {
        self.ensure_active()?;
        let path = self.resolve(relative)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, content)?;
        Ok(path)
    }

    pub fn read_file(&self, relative: impl AsRef<Path>) -> SandboxResult<String> {
        self.ensure_active()?;
        let path = self.resolve(relative)?;
        Ok(fs::read_to_string(path)?)
    }

    pub fn exists(&self, relative: impl AsRef<Path>) -> bool {
        self.resolve(relative).map(|p| p.exists()).unwrap_or(false)
    }
}

/// Captured output of one command.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecOutput {
    /// Exit code from the process
    pub exit_code: i64,
    /// Captured stdout
    pub stdout: String,
    /// Captured stderr
    pub stderr: String,
    /// Execution start time
    pub started_at: DateTime<Utc>,
    /// Execution end time
    pub finished_at: DateTime<Utc>,
    /// Duration in milliseconds
    pub duration_ms: u64,
}

impl ExecOutput {
    /// Check if execution was successful (exit code 0).
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }

    /// Get combined output (stdout + stderr).
    pub fn combined_output(&self) -> String {
        if self.stdout.is_empty() {
            self.stderr.clone()
        } else if self.stderr.is_empty() {
            self.stdout.clone()
        } else {
            format!("{}\n{}", self.stdout, self.stderr)
        }
    }
}

/// Sandbox provider capability.
///
/// A failed `execute` is an ordinary error for the caller to record; it
/// never invalidates the session.
#[async_trait]
pub trait SandboxProvider: Send + Sync {
    /// Provider name used in logs and session records.
    fn name(&self) -> &str;

    /// Whether sessions can currently be created.
    async fn is_available(&self) -> bool;

    /// Create a fresh session with an empty working directory.
    async fn create(&self) -> SandboxResult<SandboxSession>;

    /// Run a command inside the session and capture its output.
    async fn execute(&self, session: &SandboxSession, command: &Command) -> SandboxResult<ExecOutput>;

    /// Tear the session down and mark it destroyed.
    async fn destroy(&self, session: &mut SandboxSession) -> SandboxResult<()>;
}

/// Provider that is never available.
///
/// Handing this to the orchestrator selects the degraded (unsandboxed)
/// generation path.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSandbox;

#[async_trait]
impl SandboxProvider for NullSandbox {
    fn name(&self) -> &str {
        "none"
    }

    async fn is_available(&self) -> bool {
        false
    }

    async fn create(&self) -> SandboxResult<SandboxSession> {
        Err(SandboxError::NotAvailable("no sandbox provider configured".to_string()))
    }

    async fn execute(&self, _session: &SandboxSession, _command: &Command) -> SandboxResult<ExecOutput> {
        Err(SandboxError::NotAvailable("no sandbox provider configured".to_string()))
    }

    async fn destroy(&self, session: &mut SandboxSession) -> SandboxResult<()> {
        session.state = SandboxState::Destroyed;
        Ok(())
    }
}
