//! Local process sandbox.
//!
//! Each session is a fresh temporary directory; commands run as child
//! processes with that directory as their working directory. This provides
//! filesystem separation between requests, not process isolation.

use std::collections::HashMap;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Instant;

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use tempfile::TempDir;
use tokio::process::Command as ProcessCommand;
use tokio::time::timeout;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::command::Command;
use crate::error::{SandboxError, SandboxResult};
use crate::sandbox::{ExecOutput, SandboxProvider, SandboxSession, SandboxState};

/// Directory behind a local session.
enum SessionDir {
    /// Created by the sandbox, removed on destroy
    Owned(TempDir),
    /// An existing directory, left in place on destroy
    Attached(PathBuf),
}

/// Sandbox backed by temp directories and local child processes.
pub struct LocalSandbox {
    /// Parent directory for session directories (system temp if unset)
    base_dir: Option<PathBuf>,
    sessions: Mutex<HashMap<String, SessionDir>>,
}

impl Default for LocalSandbox {
    fn default() -> Self {
        Self::new()
    }
}

impl LocalSandbox {
    pub fn new() -> Self {
        Self {
            base_dir: None,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    /// Create session directories under `dir` instead of the system temp dir.
    pub fn in_dir(dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: Some(dir.into()),
            sessions: Mutex::new(HashMap::new()),
        }
    }

    /// Number of sessions that have not been destroyed yet.
    pub fn live_sessions(&self) -> usize {
        self.sessions.lock().len()
    }

    /// Open a session over an existing directory.
    ///
    /// Commands run in `dir`; destroying the session leaves it on disk.
    pub fn attach(&self, dir: impl Into<PathBuf>) -> SandboxResult<SandboxSession> {
        let dir = dir.into();
        if !dir.is_dir() {
            return Err(SandboxError::CreateFailed(format!("{} is not a directory", dir.display())));
        }
        let dir = dir.canonicalize()?;

        let id = Uuid::new_v4().to_string();
        let session = SandboxSession::new(&id, dir.clone(), self.name());
        info!("Attached local sandbox {} to {:?}", id, dir);
        self.sessions.lock().insert(id, SessionDir::Attached(dir));
        Ok(session)
    }

    fn make_dir(&self, id: &str) -> SandboxResult<TempDir> {
        let prefix = format!("forge-{}-", &id[..8]);
        let mut builder = tempfile::Builder::new();
        builder.prefix(&prefix);
        let dir = match &self.base_dir {
            Some(base) => {
                std::fs::create_dir_all(base)?;
                builder.tempdir_in(base)
            }
            None => builder.tempdir(),
        };
        dir.map_err(|e| SandboxError::CreateFailed(e.to_string()))
    }
}

#[async_trait]
impl SandboxProvider for LocalSandbox {
    fn name(&self) -> &str {
        "local"
    }

    async fn is_available(&self) -> bool {
        true
    }

    async fn create(&self) -> SandboxResult<SandboxSession> {
        let id = Uuid::new_v4().to_string();
        let dir = self.make_dir(&id)?;
        let session = SandboxSession::new(&id, dir.path().to_path_buf(), self.name());

        info!("Created local sandbox {} at {:?}", id, session.working_directory);
        self.sessions.lock().insert(id, SessionDir::Owned(dir));
        Ok(session)
    }

    async fn execute(&self, session: &SandboxSession, command: &Command) -> SandboxResult<ExecOutput> {
        session.ensure_active()?;
        if !self.sessions.lock().contains_key(&session.id) {
            return Err(SandboxError::SessionNotFound(session.id.clone()));
        }

        let cwd = match &command.working_dir {
            Some(dir) => session.resolve(dir)?,
            None => session.working_directory.clone(),
        };

        debug!("[{}] $ {}", session.id, command.display());

        let mut process = ProcessCommand::new(&command.program);
        process
            .args(&command.args)
            .envs(&command.env)
            .current_dir(&cwd)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let started_at = Utc::now();
        let start = Instant::now();

        let output = match command.timeout() {
            Some(limit) => match timeout(limit, process.output()).await {
                Ok(result) => result,
                Err(_) => {
                    warn!("[{}] '{}' timed out", session.id, command.display());
                    return Err(SandboxError::Timeout(limit.as_secs()));
                }
            },
            None => process.output().await,
        }
        .map_err(|e| SandboxError::ExecutionFailed(format!("{}: {}", command.program, e)))?;

        Ok(ExecOutput {
            exit_code: output.status.code().map(i64::from).unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            started_at,
            finished_at: Utc::now(),
            duration_ms: start.elapsed().as_millis() as u64,
        })
    }

    async fn destroy(&self, session: &mut SandboxSession) -> SandboxResult<()> {
        let dir = self
            .sessions
            .lock()
            .remove(&session.id)
            .ok_or_else(|| SandboxError::SessionNotFound(session.id.clone()))?;

        session.state = SandboxState::Destroyed;
        match dir {
            SessionDir::Owned(dir) => dir.close()?,
            SessionDir::Attached(path) => debug!("Leaving attached directory {:?} in place", path),
        }
        info!("Destroyed local sandbox {}", session.id);
        Ok(())
    }
}
