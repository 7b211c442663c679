//! The validation gate.

use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use forge_oracle::GenerationOracle;
use forge_runner::{Command, SandboxError, SandboxProvider, SandboxSession};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::check::{CheckKind, CheckResult, ValidationResult};
use crate::diagnostics::DiagnosticParser;
use crate::error::{GateError, GateResult};
use crate::security::{self, DEFAULT_REVIEW_BYTES};

/// Configuration of one check.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CheckSpec {
    pub kind: CheckKind,
    /// Shell command run in the session root. Unused for `security`.
    #[serde(default)]
    pub command: Option<String>,
    /// Per-check timeout; the kind's default when unset
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

impl CheckSpec {
    pub fn new(kind: CheckKind, command: impl Into<String>) -> Self {
        Self {
            kind,
            command: Some(command.into()),
            timeout_secs: None,
        }
    }

    /// The oracle-backed security review.
    pub fn security() -> Self {
        Self {
            kind: CheckKind::Security,
            command: None,
            timeout_secs: None,
        }
    }

    pub fn timeout_secs(mut self, seconds: u64) -> Self {
        self.timeout_secs = Some(seconds);
        self
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.unwrap_or_else(|| self.kind.default_timeout_secs()))
    }

    /// The sandbox command for this check, if it has one.
    pub fn to_command(&self) -> Option<Command> {
        self.command
            .as_deref()
            .map(|script| Command::shell(script).env("CI", "true"))
    }
}

fn default_review_bytes() -> usize {
    DEFAULT_REVIEW_BYTES
}

/// Gate configuration: which checks run and how.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GateConfig {
    pub checks: Vec<CheckSpec>,
    /// Source bytes sent to the security review
    #[serde(default = "default_review_bytes")]
    pub review_bytes: usize,
}

impl Default for GateConfig {
    /// The npm / TypeScript toolchain.
    fn default() -> Self {
        Self {
            checks: vec![
                CheckSpec::new(CheckKind::Install, "npm install --no-audit --no-fund"),
                CheckSpec::new(CheckKind::Lint, "npm run lint"),
                CheckSpec::new(CheckKind::Typecheck, "npm run typecheck"),
                CheckSpec::new(CheckKind::Build, "npm run build"),
                CheckSpec::new(CheckKind::Test, "npm test"),
                CheckSpec::security(),
            ],
            review_bytes: DEFAULT_REVIEW_BYTES,
        }
    }
}

impl GateConfig {
    pub fn empty() -> Self {
        Self {
            checks: Vec::new(),
            review_bytes: DEFAULT_REVIEW_BYTES,
        }
    }

    /// Add a check, replacing any existing check of the same kind.
    pub fn with_check(mut self, spec: CheckSpec) -> Self {
        self.checks.retain(|c| c.kind != spec.kind);
        self.checks.push(spec);
        self
    }

    /// Drop the check of the given kind.
    pub fn without(mut self, kind: CheckKind) -> Self {
        self.checks.retain(|c| c.kind != kind);
        self
    }

    pub fn has(&self, kind: CheckKind) -> bool {
        self.checks.iter().any(|c| c.kind == kind)
    }

    pub fn get(&self, kind: CheckKind) -> Option<&CheckSpec> {
        self.checks.iter().find(|c| c.kind == kind)
    }

    /// Checks in execution order.
    pub fn ordered(&self) -> Vec<&CheckSpec> {
        let mut checks: Vec<&CheckSpec> = self.checks.iter().collect();
        checks.sort_by_key(|c| c.kind);
        checks
    }

    /// Fill in the default spec for every kind not configured.
    pub fn with_defaults(mut self) -> Self {
        for default in GateConfig::default().checks {
            if !self.has(default.kind) {
                self.checks.push(default);
            }
        }
        self
    }

    /// Every kind must be configured exactly once with a runnable command.
    pub fn validate(&self) -> GateResult<()> {
        for (i, check) in self.checks.iter().enumerate() {
            if self.checks[..i].iter().any(|c| c.kind == check.kind) {
                return Err(GateError::InvalidConfiguration(format!(
                    "check '{}' configured more than once",
                    check.kind
                )));
            }
            if check.kind != CheckKind::Security && check.command.as_deref().map_or(true, str::is_empty) {
                return Err(GateError::InvalidConfiguration(format!(
                    "check '{}' has no command",
                    check.kind
                )));
            }
            if check.timeout_secs == Some(0) {
                return Err(GateError::InvalidConfiguration(format!(
                    "check '{}' has a zero timeout",
                    check.kind
                )));
            }
        }
        if let Some(missing) = CheckKind::all().into_iter().find(|kind| !self.has(*kind)) {
            return Err(GateError::InvalidConfiguration(format!(
                "check '{}' is not configured",
                missing
            )));
        }
        Ok(())
    }

    /// Parse YAML; kinds the file leaves out keep their defaults.
    pub fn from_yaml(content: &str) -> GateResult<Self> {
        let config = serde_yaml::from_str::<Self>(content)?.with_defaults();
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> GateResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }
}

/// Runs the configured checks inside a sandbox session.
pub struct ValidationGate {
    config: GateConfig,
    sandbox: Arc<dyn SandboxProvider>,
    oracle: Option<Arc<dyn GenerationOracle>>,
    parser: DiagnosticParser,
}

impl ValidationGate {
    pub fn new(config: GateConfig, sandbox: Arc<dyn SandboxProvider>) -> Self {
        Self {
            config,
            sandbox,
            oracle: None,
            parser: DiagnosticParser::new(),
        }
    }

    /// Oracle used for the security review.
    pub fn with_oracle(mut self, oracle: Arc<dyn GenerationOracle>) -> Self {
        self.oracle = Some(oracle);
        self
    }

    pub fn config(&self) -> &GateConfig {
        &self.config
    }

    /// Run every configured check in order.
    ///
    /// Never fails: a check that cannot run is recorded as failed and the
    /// remaining checks still run. A kind missing from the configuration is
    /// recorded as failed too, so a pass always covers all six checks.
    pub async fn validate(&self, session: &SandboxSession) -> ValidationResult {
        info!(
            "Running validation gate ({} checks) in session {}",
            self.config.checks.len(),
            session.id
        );

        let mut result = ValidationResult::new();
        for spec in self.config.ordered() {
            let check = match spec.kind {
                CheckKind::Security => self.run_security(session, spec).await,
                _ => self.run_check(session, spec).await,
            };

            if check.passed {
                info!("  ✓ {} ({}ms)", check.check, check.duration_ms);
            } else {
                info!("  ✗ {} - {} error(s)", check.check, check.error_count);
            }
            result.add_result(check);
        }
        for kind in CheckKind::all() {
            if !self.config.has(kind) {
                warn!("  ✗ {} - not configured", kind);
                result.add_result(CheckResult::could_not_run(kind, format!("{} is not configured", kind), 0));
            }
        }
        result.finalize();

        info!(
            "Validation {}: {}/{} checks passed",
            if result.all_passed { "passed" } else { "failed" },
            result.passed_count(),
            result.checks.len()
        );
        result
    }

    async fn run_check(&self, session: &SandboxSession, spec: &CheckSpec) -> CheckResult {
        let kind = spec.kind;
        let Some(command) = spec.to_command() else {
            return CheckResult::could_not_run(kind, format!("{} could not run: no command configured", kind), 0);
        };

        let limit = spec.timeout();
        debug!("[{}] {} $ {}", session.id, kind, command.display());
        let start = Instant::now();

        let outcome = tokio::time::timeout(limit, self.sandbox.execute(session, &command)).await;
        let elapsed = start.elapsed().as_millis() as u64;

        match outcome {
            Err(_) | Ok(Err(SandboxError::Timeout(_))) => {
                warn!("{} abandoned after {}s", kind, limit.as_secs());
                CheckResult::could_not_run(
                    kind,
                    format!("{} timed out after {}s", kind, limit.as_secs()),
                    elapsed,
                )
            }
            Ok(Err(e)) => {
                warn!("{} could not run: {}", kind, e);
                CheckResult::could_not_run(kind, format!("{} could not run: {}", kind, e), elapsed)
            }
            Ok(Ok(output)) if output.success() => CheckResult::pass(kind, elapsed),
            Ok(Ok(output)) => {
                let combined = output.combined_output();
                let count = self.parser.count_errors(kind, output.exit_code, &combined);
                let mut diagnostics = self.parser.extract(&combined);
                if diagnostics.is_empty() {
                    diagnostics.push(format!("{} exited with code {}", command.display(), output.exit_code));
                }
                CheckResult::fail(kind, count, diagnostics, elapsed)
            }
        }
    }

    async fn run_security(&self, session: &SandboxSession, spec: &CheckSpec) -> CheckResult {
        match &self.oracle {
            Some(oracle) => {
                security::review(
                    oracle.as_ref(),
                    &session.working_directory,
                    spec.timeout(),
                    self.config.review_bytes,
                )
                .await
            }
            None => CheckResult::could_not_run(
                CheckKind::Security,
                "security could not run: no oracle configured",
                0,
            ),
        }
    }
}
