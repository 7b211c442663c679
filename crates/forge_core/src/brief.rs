//! Task brief and iteration prompts.
//!
//! The brief is the standing context for a run. It is written into the
//! session once and embedded in the first prompt only; later prompts carry
//! nothing but the previous gate failures.

use std::path::PathBuf;

use forge_policy::{CheckKind, GateConfig, ValidationResult};
use forge_runner::SandboxSession;
use forge_spec::{ApiIntegration, Complexity, EnvVar, GenerationRequest, RequirementModel};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{CoreError, CoreResult};

/// Directory inside the session for orchestrator bookkeeping.
pub const FORGE_DIR: &str = ".forge";
pub const TASK_JSON: &str = ".forge/task.json";
pub const TASK_MD: &str = "TASK.md";

const FILE_FORMAT_INSTRUCTIONS: &str = "Emit every file you create or change as a `### FILE: <relative path>` \
heading followed by one fenced code block holding the complete file content. \
Do not emit partial files or diffs.";

/// Machine-readable description of the task handed to the oracle.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TaskBrief {
    pub request: GenerationRequest,
    pub requirements: RequirementModel,
    pub complexity: Complexity,
    pub env_vars: Vec<EnvVar>,
    pub api_integrations: Vec<ApiIntegration>,
    /// Checks the project must pass, in order
    pub checks: Vec<CheckKind>,
}

impl TaskBrief {
    pub fn new(request: &GenerationRequest, model: &RequirementModel, gate: &GateConfig) -> Self {
        Self {
            request: request.clone(),
            requirements: model.clone(),
            complexity: model.complexity,
            env_vars: model.env_vars.clone(),
            api_integrations: model.api_integrations.clone(),
            checks: gate.ordered().iter().map(|c| c.kind).collect(),
        }
    }

    pub fn to_json(&self) -> CoreResult<String> {
        serde_json::to_string_pretty(self).map_err(|e| CoreError::Serialization(e.to_string()))
    }

    pub fn to_markdown(&self) -> String {
        let request = &self.request;
        let mut md = format!("# Task: {}\n\n", request.project_name);
        md.push_str(&format!("Target: {}\n", request.target_type));
        md.push_str(&format!("Complexity: {}\n\n", self.complexity));
        md.push_str("## Description\n\n");
        md.push_str(request.description.trim());
        md.push_str("\n\n");

        if !request.requirements.is_empty() {
            md.push_str("## Requirements\n\n");
            for requirement in &request.requirements {
                md.push_str(&format!("- {}\n", requirement));
            }
            md.push('\n');
        }

        let capabilities = [
            ("Actions", &self.requirements.actions),
            ("Providers", &self.requirements.providers),
            ("Services", &self.requirements.services),
            ("Evaluators", &self.requirements.evaluators),
        ];
        if capabilities.iter().any(|(_, c)| !c.is_empty()) {
            md.push_str("## Capabilities\n\n");
            for (heading, list) in capabilities {
                for capability in list {
                    md.push_str(&format!("- {} `{}`: {}\n", heading, capability.name, capability.description));
                }
            }
            md.push('\n');
        }

        if !self.api_integrations.is_empty() || !request.external_apis.is_empty() {
            md.push_str("## External APIs\n\n");
            for api in &self.api_integrations {
                md.push_str(&format!("- {} ({}, auth: {})\n", api.name, api.base_url, api.auth_type));
            }
            for name in &request.external_apis {
                if !self.api_integrations.iter().any(|a| a.name.eq_ignore_ascii_case(name)) {
                    md.push_str(&format!("- {}\n", name));
                }
            }
            md.push('\n');
        }

        if !self.env_vars.is_empty() {
            md.push_str("## Environment Variables\n\n");
            for var in &self.env_vars {
                md.push_str(&format!(
                    "- `{}`{}: {}\n",
                    var.name,
                    if var.required { " (required)" } else { "" },
                    var.description
                ));
            }
            md.push('\n');
        }

        if !request.scenarios().is_empty() {
            md.push_str("## Test Scenarios\n\n");
            for scenario in request.scenarios() {
                md.push_str(&format!("- {}\n", scenario));
            }
            md.push('\n');
        }

        if !self.checks.is_empty() {
            let names: Vec<&str> = self.checks.iter().map(|c| c.as_str()).collect();
            md.push_str(&format!("## Acceptance\n\nThe project must pass: {}.\n", names.join(", ")));
        }

        md
    }

    /// Write `.forge/task.json` and `TASK.md` into the session.
    pub fn write(&self, session: &SandboxSession) -> CoreResult<()> {
        session.write_file(TASK_JSON, &self.to_json()?)?;
        session.write_file(TASK_MD, &self.to_markdown())?;
        debug!("Task brief written to session {}", session.id);
        Ok(())
    }
}

/// Prompt for the first iteration: the full brief.
pub fn initial_prompt(brief: &TaskBrief, prd: Option<&str>) -> String {
    let mut prompt = String::from(
        "You are implementing a TypeScript project inside an existing scaffold. \
The scaffold already contains package.json, tsconfig.json and the source layout.\n\n",
    );
    prompt.push_str(&brief.to_markdown());
    if let Some(prd) = prd {
        prompt.push_str("\n## Product Requirements\n\n");
        prompt.push_str(prd.trim());
        prompt.push('\n');
    }
    prompt.push_str("\n## Output Format\n\n");
    prompt.push_str(FILE_FORMAT_INSTRUCTIONS);
    prompt.push('\n');
    prompt
}

/// Prompt for iteration `index` (2 or later): only the failures to fix.
pub fn fix_prompt(index: u32, previous: &ValidationResult) -> String {
    format!(
        "Iteration {}: the project failed validation. Fix these failures without \
rewriting working code. The task is described in TASK.md.\n\n{}\n\n## Output Format\n\n{}\n",
        index,
        previous.failure_summary(),
        FILE_FORMAT_INSTRUCTIONS
    )
}

/// Persist gate feedback for an iteration under `.forge/feedback/`.
pub fn write_feedback(session: &SandboxSession, index: u32, validation: &ValidationResult) -> CoreResult<PathBuf> {
    let relative = format!("{}/feedback/iteration-{}.md", FORGE_DIR, index);
    let content = format!(
        "# Iteration {} feedback\n\n{}\n\n{}\n",
        index,
        validation.report(),
        validation.failure_summary()
    );
    Ok(session.write_file(&relative, &content)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use forge_policy::CheckResult;
    use forge_spec::{KeywordClassifier, RequirementClassifier, TargetType};
    use tempfile::TempDir;

    fn brief() -> TaskBrief {
        let request = GenerationRequest::new("weather-bot", "Create a weather plugin using OpenWeatherMap", TargetType::Plugin)
            .requirement("Cache responses for ten minutes")
            .test_scenario("returns the forecast for Paris");
        let model = KeywordClassifier::new().parse(&request.description);
        TaskBrief::new(&request, &model, &GateConfig::default())
    }

    #[test]
    fn test_markdown_covers_request() {
        let md = brief().to_markdown();
        assert!(md.starts_with("# Task: weather-bot"));
        assert!(md.contains("Cache responses for ten minutes"));
        assert!(md.contains("`GET_WEATHER`"));
        assert!(md.contains("`OPENWEATHER_API_KEY` (required)"));
        assert!(md.contains("returns the forecast for Paris"));
        assert!(md.contains("install, lint, typecheck, build, test, security"));
    }

    #[test]
    fn test_write_brief() {
        let dir = TempDir::new().unwrap();
        let session = SandboxSession::new("s1", dir.path().to_path_buf(), "test");
        brief().write(&session).unwrap();

        let json: serde_json::Value = serde_json::from_str(&session.read_file(TASK_JSON).unwrap()).unwrap();
        assert_eq!(json["request"]["project_name"], "weather-bot");
        assert!(json["complexity"].is_string());
        assert!(session.exists(TASK_MD));
    }

    #[test]
    fn test_fix_prompt_carries_only_failures() {
        let mut validation = ValidationResult::new();
        validation.add_result(CheckResult::fail(
            CheckKind::Lint,
            1,
            vec!["src/index.ts:1:1 error no-var".to_string()],
            3,
        ));
        validation.finalize();

        let prompt = fix_prompt(2, &validation);
        assert!(prompt.starts_with("Iteration 2"));
        assert!(prompt.contains("## lint failed (1 error)"));
        assert!(!prompt.contains("OpenWeatherMap"));

        let first = initial_prompt(&brief(), Some("# PRD"));
        assert!(first.contains("OpenWeatherMap"));
        assert!(first.contains("## Product Requirements"));
    }

    #[test]
    fn test_feedback_path() {
        let dir = TempDir::new().unwrap();
        let session = SandboxSession::new("s1", dir.path().to_path_buf(), "test");
        let path = write_feedback(&session, 3, &ValidationResult::new()).unwrap();
        assert!(path.ends_with(".forge/feedback/iteration-3.md"));
    }
}
