//! The generation orchestrator.
//!
//! One request drives one sandbox session sequentially:
//! scaffold, brief, optional research, install, then iterate
//! (oracle, write files, gate) until the gate passes or the iteration
//! budget runs out. Everything after classification, fallbacks included,
//! races one wall-clock timeout.
//!
//! Failure degrades instead of propagating: an unavailable sandbox or an
//! error inside the sandboxed path falls back to per-file oracle
//! completions, and a lost race falls back to the chunked template set.
//! Only a missing oracle is returned as an error.

use std::path::Path;
use std::sync::Arc;

use chrono::Utc;
use forge_oracle::{ask, extract_file_blocks, GenerationOracle};
use forge_policy::{CheckKind, ValidationGate, ValidationResult};
use forge_runner::{NullSandbox, SandboxProvider, SandboxSession};
use forge_spec::{GeneratedFile, GenerationRequest, RequirementClassifier, RequirementModel};
use parking_lot::Mutex;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::brief::{fix_prompt, initial_prompt, write_feedback, TaskBrief, FORGE_DIR};
use crate::collector::collect;
use crate::config::OrchestratorConfig;
use crate::error::{CoreError, CoreResult};
use crate::fallback::{chunked_generate, degraded_generate};
use crate::research::{compose_prd, research_apis, research_targets, PRD_FILE};
use crate::result::{GenerationResult, GenerationStrategy, Iteration};

/// Everything the run has produced so far.
///
/// Lives outside the raced future so it survives a timeout.
#[derive(Default)]
struct RunState {
    session: Option<SandboxSession>,
    iterations: Vec<Iteration>,
    warnings: Vec<String>,
    errors: Vec<String>,
}

/// What the sandboxed path returns when it runs to completion.
struct SandboxedOutcome {
    files: Vec<GeneratedFile>,
    validation: Option<ValidationResult>,
}

/// Builder for [`GenerationOrchestrator`].
pub struct OrchestratorBuilder {
    oracle: Option<Arc<dyn GenerationOracle>>,
    sandbox: Option<Arc<dyn SandboxProvider>>,
    classifier: Option<Arc<dyn RequirementClassifier>>,
    config: OrchestratorConfig,
}

impl OrchestratorBuilder {
    pub fn oracle(mut self, oracle: Arc<dyn GenerationOracle>) -> Self {
        self.oracle = Some(oracle);
        self
    }

    /// Sandbox provider. Defaults to [`NullSandbox`], which selects the
    /// degraded path.
    pub fn sandbox(mut self, sandbox: Arc<dyn SandboxProvider>) -> Self {
        self.sandbox = Some(sandbox);
        self
    }

    pub fn classifier(mut self, classifier: Arc<dyn RequirementClassifier>) -> Self {
        self.classifier = Some(classifier);
        self
    }

    pub fn config(mut self, config: OrchestratorConfig) -> Self {
        self.config = config;
        self
    }

    pub fn build(self) -> CoreResult<GenerationOrchestrator> {
        let oracle = self
            .oracle
            .ok_or_else(|| CoreError::ServiceUnavailable("no generation oracle configured".to_string()))?;
        let classifier = self
            .classifier
            .ok_or_else(|| CoreError::ServiceUnavailable("no requirement classifier configured".to_string()))?;
        self.config.validate()?;

        Ok(GenerationOrchestrator {
            oracle,
            sandbox: self.sandbox.unwrap_or_else(|| Arc::new(NullSandbox)),
            classifier,
            config: self.config,
        })
    }
}

/// Drives a [`GenerationRequest`] to a [`GenerationResult`].
pub struct GenerationOrchestrator {
    oracle: Arc<dyn GenerationOracle>,
    sandbox: Arc<dyn SandboxProvider>,
    classifier: Arc<dyn RequirementClassifier>,
    config: OrchestratorConfig,
}

impl GenerationOrchestrator {
    pub fn builder() -> OrchestratorBuilder {
        OrchestratorBuilder {
            oracle: None,
            sandbox: None,
            classifier: None,
            config: OrchestratorConfig::default(),
        }
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    /// Classify a description with the configured classifier.
    pub fn classify(&self, description: &str) -> RequirementModel {
        self.classifier.parse(description)
    }

    /// Run the pipeline for one request.
    ///
    /// Returns `Err` only for [`CoreError::ServiceUnavailable`]; every other
    /// condition is recorded in the result.
    pub async fn generate(&self, request: GenerationRequest) -> CoreResult<GenerationResult> {
        if !self.oracle.is_available().await {
            return Err(CoreError::ServiceUnavailable(format!(
                "generation oracle '{}' is not reachable",
                self.oracle.name()
            )));
        }

        let request_id = Uuid::new_v4();
        let started_at = Utc::now();
        info!("Generation {} started for '{}'", request_id, request.project_name);

        if let Err(e) = request.validate() {
            warn!("Rejected request: {}", e);
            let mut result = GenerationResult::new(request_id, GenerationStrategy::Degraded, started_at);
            result.errors.push(format!("Invalid request: {}", e));
            result.completed_at = Utc::now();
            return Ok(result);
        }

        let model = self.classifier.parse(&request.description);
        debug!(
            "Classified '{}' as {} ({} capabilities)",
            model.name,
            model.complexity,
            model.capability_count()
        );

        let state = Mutex::new(RunState::default());
        let limit = self.config.whole_run_timeout();
        let outcome = tokio::time::timeout(
            limit,
            self.run_strategy(&request, &model, request_id, started_at, &state),
        )
        .await;

        // Every exit path passes through here; a session is destroyed once.
        self.release_session(&state).await;

        let mut result = match outcome {
            Ok(result) => result,
            Err(_) => {
                let timeout = CoreError::GenerationTimeout(limit.as_secs());
                warn!("{}; switching to chunked generation", timeout);
                let RunState {
                    iterations,
                    warnings,
                    errors,
                    ..
                } = state.into_inner();
                let mut result = self.generate_chunked(&request, &model, request_id, started_at, warnings);
                result
                    .warnings
                    .push(format!("{}; returned the chunked fallback project", timeout));
                result.errors.extend(errors);
                result.iterations = iterations;
                result
            }
        };

        result.completed_at = Utc::now();
        info!(
            "Generation {} finished: success={}, strategy={}, {} file(s) in {}ms",
            request_id,
            result.success,
            result.strategy,
            result.files.len(),
            result.duration_ms()
        );
        Ok(result)
    }

    async fn run_strategy(
        &self,
        request: &GenerationRequest,
        model: &RequirementModel,
        request_id: Uuid,
        started_at: chrono::DateTime<Utc>,
        state: &Mutex<RunState>,
    ) -> GenerationResult {
        if self.sandbox.is_available().await {
            info!("Strategy: sandboxed ({})", self.sandbox.name());
            self.generate_sandboxed(request, model, request_id, started_at, state).await
        } else {
            info!("Strategy: degraded (sandbox '{}' unavailable)", self.sandbox.name());
            self.generate_degraded(request, model, request_id, started_at, Vec::new()).await
        }
    }

    async fn generate_sandboxed(
        &self,
        request: &GenerationRequest,
        model: &RequirementModel,
        request_id: Uuid,
        started_at: chrono::DateTime<Utc>,
        state: &Mutex<RunState>,
    ) -> GenerationResult {
        // The session stays in `state` until `generate` releases it after
        // the race, so a cancelled run cannot skip the destroy.
        let outcome = self.run_sandboxed(request, model, state).await;

        match outcome {
            Ok(outcome) => {
                let (iterations, warnings) = {
                    let state = state.lock();
                    (state.iterations.clone(), state.warnings.clone())
                };
                let mut result = GenerationResult::new(request_id, GenerationStrategy::Sandboxed, started_at);
                result.success = true;
                result.warnings = warnings;
                result.files = outcome.files;
                result.iterations = iterations;

                match &outcome.validation {
                    Some(validation) if !validation.all_passed => {
                        let unresolved: Vec<&str> =
                            validation.failed_checks().iter().map(|c| c.check.as_str()).collect();
                        let exhausted = CoreError::MaxIterationsExceeded(result.iterations.len() as u32);
                        warn!("{}", exhausted);
                        result.warnings.push(format!("{}; unresolved checks: {}", exhausted, unresolved.join(", ")));
                    }
                    Some(_) => {}
                    None => result.warnings.push("No validation ran".to_string()),
                }
                result.execution_results = outcome.validation;
                result
            }
            Err(e) => {
                error!("Sandboxed generation failed: {}", e);
                // Recorded in the shared state first so a timeout during the
                // fallback still reports the cause.
                let (iterations, warnings) = {
                    let mut state = state.lock();
                    state.errors.push(e.to_string());
                    state
                        .warnings
                        .push("Sandboxed generation failed; fell back to unsandboxed generation".to_string());
                    (state.iterations.clone(), state.warnings.clone())
                };
                let mut result = self
                    .generate_degraded(request, model, request_id, started_at, warnings)
                    .await;
                result.errors.push(e.to_string());
                result.iterations = iterations;
                result
            }
        }
    }

    async fn release_session(&self, state: &Mutex<RunState>) {
        let session = state.lock().session.take();
        if let Some(mut session) = session {
            match self.sandbox.destroy(&mut session).await {
                Ok(()) => info!("Sandbox session {} destroyed", session.id),
                Err(e) => {
                    warn!("Failed to destroy session {}: {}", session.id, e);
                    state.lock().warnings.push(format!("Failed to destroy sandbox session: {}", e));
                }
            }
        }
    }

    async fn run_sandboxed(
        &self,
        request: &GenerationRequest,
        model: &RequirementModel,
        state: &Mutex<RunState>,
    ) -> CoreResult<SandboxedOutcome> {
        let session = self.sandbox.create().await?;
        info!("Sandbox session {} created at {}", session.id, session.working_directory.display());
        state.lock().session = Some(session.clone());

        let scaffold = forge_templates::scaffold(request, model)?;
        for file in &scaffold {
            session.write_file(&file.path, &file.content)?;
        }
        debug!("Scaffolded {} file(s)", scaffold.len());

        let brief = TaskBrief::new(request, model, &self.config.gate);
        brief.write(&session)?;

        let prd = if self.config.research_enabled {
            let targets = research_targets(request, model);
            let report = research_apis(self.oracle.as_ref(), &targets, self.config.research_timeout()).await;
            state.lock().warnings.extend(report.warnings);
            let prd = compose_prd(request, model, &report.findings, &self.config.gate);
            session.write_file(PRD_FILE, &prd)?;
            Some(prd)
        } else {
            None
        };

        self.install_base_dependencies(&session, state).await;

        let gate = ValidationGate::new(self.config.gate.clone(), self.sandbox.clone()).with_oracle(self.oracle.clone());
        let oracle_limit = self.config.oracle_timeout(model.complexity);
        let max = self.config.max_iterations;
        let mut last: Option<ValidationResult> = None;

        for index in 1..=max {
            info!("Iteration {}/{}", index, max);
            let prompt = match &last {
                None => initial_prompt(&brief, prd.as_deref()),
                Some(previous) => fix_prompt(index, previous),
            };

            let oracle_output = match ask(self.oracle.as_ref(), &prompt, self.config.oracle_turn_budget, oracle_limit).await {
                Ok(reply) => reply.text,
                Err(e) => {
                    warn!("Iteration {}: oracle call failed: {}", index, e);
                    state
                        .lock()
                        .warnings
                        .push(format!("Iteration {}: oracle call failed: {}", index, e));
                    String::new()
                }
            };

            let mut files_written = Vec::new();
            for file in extract_file_blocks(&oracle_output) {
                if Path::new(&file.path).starts_with(FORGE_DIR) {
                    debug!("Ignoring oracle write to {}", file.path);
                    continue;
                }
                match session.write_file(&file.path, &file.content) {
                    Ok(_) => files_written.push(file.path),
                    Err(e) => {
                        let failure = CoreError::SandboxExecution(format!("writing {}: {}", file.path, e));
                        warn!("{}", failure);
                        state.lock().warnings.push(failure.to_string());
                    }
                }
            }
            debug!("Iteration {} wrote {} file(s)", index, files_written.len());

            let validation = gate.validate(&session).await;
            let passed = validation.all_passed;
            if passed {
                info!("Iteration {}: validation passed", index);
            } else {
                let failed: Vec<&str> = validation.failed_checks().iter().map(|c| c.check.as_str()).collect();
                info!("Iteration {}: {}", index, CoreError::ValidationFailure(failed.join(", ")));
                write_feedback(&session, index, &validation)?;
            }

            state.lock().iterations.push(Iteration {
                index,
                prompt,
                oracle_output,
                files_written,
                validation: validation.clone(),
            });
            last = Some(validation);

            if passed {
                break;
            }
        }

        let files = collect(&session.working_directory)?;
        Ok(SandboxedOutcome { files, validation: last })
    }

    /// Install base dependencies once before the loop. Failure is a warning;
    /// the gate's own install check reports it properly.
    async fn install_base_dependencies(&self, session: &SandboxSession, state: &Mutex<RunState>) {
        let Some(check) = self.config.gate.get(CheckKind::Install) else {
            return;
        };
        let Some(command) = check.to_command() else {
            return;
        };

        info!("Installing base dependencies");
        let limit = check.timeout();
        let warning = match tokio::time::timeout(limit, self.sandbox.execute(session, &command)).await {
            Ok(Ok(output)) if output.success() => None,
            Ok(Ok(output)) => Some(format!("Base dependency install exited with code {}", output.exit_code)),
            Ok(Err(e)) => Some(CoreError::SandboxExecution(e.to_string()).to_string()),
            Err(_) => Some(format!("Base dependency install timed out after {}s", limit.as_secs())),
        };
        if let Some(warning) = warning {
            warn!("{}", warning);
            state.lock().warnings.push(warning);
        }
    }

    async fn generate_degraded(
        &self,
        request: &GenerationRequest,
        model: &RequirementModel,
        request_id: Uuid,
        started_at: chrono::DateTime<Utc>,
        mut warnings: Vec<String>,
    ) -> GenerationResult {
        let output = degraded_generate(
            self.oracle.as_ref(),
            request,
            model,
            self.config.degraded_oracle_timeout(),
        )
        .await;
        warnings.extend(output.warnings);

        if output.files.is_empty() {
            warn!("Degraded generation produced no files; using chunked fallback");
            return self.generate_chunked(request, model, request_id, started_at, warnings);
        }

        let mut result = GenerationResult::new(request_id, GenerationStrategy::Degraded, started_at);
        result.success = true;
        result.files = output.files;
        result.warnings = warnings;
        result
    }

    fn generate_chunked(
        &self,
        request: &GenerationRequest,
        model: &RequirementModel,
        request_id: Uuid,
        started_at: chrono::DateTime<Utc>,
        warnings: Vec<String>,
    ) -> GenerationResult {
        let mut result = GenerationResult::new(request_id, GenerationStrategy::Chunked, started_at);
        result.warnings = warnings;
        match chunked_generate(request, model) {
            Ok(files) => {
                result.success = true;
                result.files = files;
                result
                    .warnings
                    .push("Chunked fallback project: generated from templates without the oracle or validation".to_string());
            }
            Err(e) => {
                error!("Chunked generation failed: {}", e);
                result.errors.push(e.to_string());
            }
        }
        result
    }
}
