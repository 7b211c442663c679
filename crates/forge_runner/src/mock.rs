//! Mock sandbox for testing.
//!
//! Sessions are real temp directories so that generated files can be
//! written and collected, but commands never run. Each command is matched
//! against registered patterns and answered with a scripted response.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::RwLock;
use tempfile::TempDir;
use uuid::Uuid;

use crate::command::Command;
use crate::error::{SandboxError, SandboxResult};
use crate::sandbox::{ExecOutput, SandboxProvider, SandboxSession, SandboxState};

/// Predefined response for a matched command.
#[derive(Debug, Clone)]
pub struct MockResponse {
    pub exit_code: i64,
    pub stdout: String,
    pub stderr: String,
    /// Simulated run time; a command timeout shorter than this fails
    pub delay_ms: u64,
    /// Return an execution error instead of output
    pub error: Option<String>,
}

impl MockResponse {
    pub fn success(stdout: impl Into<String>) -> Self {
        Self {
            exit_code: 0,
            stdout: stdout.into(),
            stderr: String::new(),
            delay_ms: 0,
            error: None,
        }
    }

    pub fn failure(exit_code: i64, stderr: impl Into<String>) -> Self {
        Self {
            exit_code,
            stdout: String::new(),
            stderr: stderr.into(),
            delay_ms: 0,
            error: None,
        }
    }

    /// The command could not be started at all.
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            exit_code: -1,
            stdout: String::new(),
            stderr: String::new(),
            delay_ms: 0,
            error: Some(message.into()),
        }
    }

    pub fn with_delay(mut self, ms: u64) -> Self {
        self.delay_ms = ms;
        self
    }
}

/// A command seen by the mock, for verification.
#[derive(Debug, Clone)]
pub struct CapturedCommand {
    pub session_id: String,
    pub command: Command,
}

struct Rule {
    pattern: String,
    responses: Vec<MockResponse>,
    hits: usize,
}

/// Mock sandbox provider.
///
/// Clones share state, so a test can keep one handle while the
/// orchestrator owns another.
#[derive(Clone)]
pub struct MockSandbox {
    available: Arc<RwLock<bool>>,
    /// First rule whose pattern is contained in the command line wins.
    rules: Arc<RwLock<Vec<Rule>>>,
    captured: Arc<RwLock<Vec<CapturedCommand>>>,
    sessions: Arc<RwLock<HashMap<String, TempDir>>>,
    create_failure: Arc<RwLock<Option<String>>>,
    created: Arc<AtomicUsize>,
    destroyed: Arc<AtomicUsize>,
    max_active: Arc<AtomicUsize>,
}

impl Default for MockSandbox {
    fn default() -> Self {
        Self::new()
    }
}

impl MockSandbox {
    pub fn new() -> Self {
        Self {
            available: Arc::new(RwLock::new(true)),
            rules: Arc::new(RwLock::new(Vec::new())),
            captured: Arc::new(RwLock::new(Vec::new())),
            sessions: Arc::new(RwLock::new(HashMap::new())),
            create_failure: Arc::new(RwLock::new(None)),
            created: Arc::new(AtomicUsize::new(0)),
            destroyed: Arc::new(AtomicUsize::new(0)),
            max_active: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Set whether the provider reports as available.
    pub fn set_available(self, available: bool) -> Self {
        *self.available.write() = available;
        self
    }

    /// Answer commands containing `pattern` with `responses` in order.
    ///
    /// The last response repeats once the list is exhausted. Commands that
    /// match no rule succeed with empty output.
    pub fn respond_to(self, pattern: impl Into<String>, responses: Vec<MockResponse>) -> Self {
        self.rules.write().push(Rule {
            pattern: pattern.into(),
            responses,
            hits: 0,
        });
        self
    }

    /// Make every `create` call fail.
    pub fn fail_create(self, message: impl Into<String>) -> Self {
        *self.create_failure.write() = Some(message.into());
        self
    }

    pub fn create_count(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }

    pub fn destroy_count(&self) -> usize {
        self.destroyed.load(Ordering::SeqCst)
    }

    pub fn active_sessions(&self) -> usize {
        self.sessions.read().len()
    }

    /// Highest number of simultaneously live sessions observed.
    pub fn max_active_sessions(&self) -> usize {
        self.max_active.load(Ordering::SeqCst)
    }

    pub fn commands(&self) -> Vec<CapturedCommand> {
        self.captured.read().clone()
    }

    /// Check if any executed command line contains `pattern`.
    pub fn was_executed(&self, pattern: &str) -> bool {
        self.captured
            .read()
            .iter()
            .any(|c| c.command.display().contains(pattern))
    }

    /// Number of executed commands whose line contains `pattern`.
    pub fn execution_count(&self, pattern: &str) -> usize {
        self.captured
            .read()
            .iter()
            .filter(|c| c.command.display().contains(pattern))
            .count()
    }

    fn next_response(&self, line: &str) -> MockResponse {
        let mut rules = self.rules.write();
        match rules.iter_mut().find(|r| line.contains(&r.pattern)) {
            Some(rule) if !rule.responses.is_empty() => {
                let index = rule.hits.min(rule.responses.len() - 1);
                rule.hits += 1;
                rule.responses[index].clone()
            }
            _ => MockResponse::success(""),
        }
    }
}

#[async_trait]
impl SandboxProvider for MockSandbox {
    fn name(&self) -> &str {
        "mock"
    }

    async fn is_available(&self) -> bool {
        *self.available.read()
    }

    async fn create(&self) -> SandboxResult<SandboxSession> {
        if let Some(message) = self.create_failure.read().clone() {
            return Err(SandboxError::CreateFailed(message));
        }

        let id = Uuid::new_v4().to_string();
        let dir = tempfile::Builder::new()
            .prefix("forge-mock-")
            .tempdir()
            .map_err(|e| SandboxError::CreateFailed(e.to_string()))?;
        let session = SandboxSession::new(&id, dir.path().to_path_buf(), self.name());

        let active = {
            let mut sessions = self.sessions.write();
            sessions.insert(id, dir);
            sessions.len()
        };
        self.created.fetch_add(1, Ordering::SeqCst);
        self.max_active.fetch_max(active, Ordering::SeqCst);
        Ok(session)
    }

    async fn execute(&self, session: &SandboxSession, command: &Command) -> SandboxResult<ExecOutput> {
        session.ensure_active()?;
        if !self.sessions.read().contains_key(&session.id) {
            return Err(SandboxError::SessionNotFound(session.id.clone()));
        }

        self.captured.write().push(CapturedCommand {
            session_id: session.id.clone(),
            command: command.clone(),
        });

        let response = self.next_response(&command.display());
        let started_at = Utc::now();

        if response.delay_ms > 0 {
            let delay = Duration::from_millis(response.delay_ms);
            match command.timeout() {
                Some(limit) if limit < delay => {
                    tokio::time::sleep(limit).await;
                    return Err(SandboxError::Timeout(limit.as_secs()));
                }
                _ => tokio::time::sleep(delay).await,
            }
        }

        if let Some(message) = response.error {
            return Err(SandboxError::ExecutionFailed(message));
        }

        Ok(ExecOutput {
            exit_code: response.exit_code,
            stdout: response.stdout,
            stderr: response.stderr,
            started_at,
            finished_at: Utc::now(),
            duration_ms: response.delay_ms,
        })
    }

    async fn destroy(&self, session: &mut SandboxSession) -> SandboxResult<()> {
        let dir = self
            .sessions
            .write()
            .remove(&session.id)
            .ok_or_else(|| SandboxError::SessionNotFound(session.id.clone()))?;

        session.state = SandboxState::Destroyed;
        self.destroyed.fetch_add(1, Ordering::SeqCst);
        dir.close()?;
        Ok(())
    }
}
