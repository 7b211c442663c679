//! Generation results.

use chrono::{DateTime, Utc};
use forge_policy::ValidationResult;
use forge_spec::GeneratedFile;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// How the files in a result were produced.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum GenerationStrategy {
    /// Iterated against the validation gate in a sandbox
    Sandboxed,
    /// Oracle completions without any sandboxed verification
    Degraded,
    /// Template-only fallback project
    Chunked,
}

impl GenerationStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sandboxed => "sandboxed",
            Self::Degraded => "degraded",
            Self::Chunked => "chunked",
        }
    }
}

impl std::fmt::Display for GenerationStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One pass of the iterate/validate loop.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Iteration {
    /// 1-based
    pub index: u32,
    pub prompt: String,
    pub oracle_output: String,
    /// Files the oracle emitted and the orchestrator wrote this pass
    #[serde(default)]
    pub files_written: Vec<String>,
    pub validation: ValidationResult,
}

/// Outcome of a generation request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationResult {
    pub request_id: Uuid,
    pub success: bool,
    pub strategy: GenerationStrategy,
    pub files: Vec<GeneratedFile>,
    /// Last gate verdict; absent when no gate ran
    pub execution_results: Option<ValidationResult>,
    pub iterations: Vec<Iteration>,
    pub warnings: Vec<String>,
    pub errors: Vec<String>,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
}

impl GenerationResult {
    pub(crate) fn new(request_id: Uuid, strategy: GenerationStrategy, started_at: DateTime<Utc>) -> Self {
        Self {
            request_id,
            success: false,
            strategy,
            files: Vec::new(),
            execution_results: None,
            iterations: Vec::new(),
            warnings: Vec::new(),
            errors: Vec::new(),
            started_at,
            completed_at: started_at,
        }
    }

    pub fn file(&self, path: &str) -> Option<&GeneratedFile> {
        self.files.iter().find(|f| f.path == path)
    }

    pub fn duration_ms(&self) -> i64 {
        (self.completed_at - self.started_at).num_milliseconds()
    }

    /// Whether the gate ran and passed.
    pub fn verified(&self) -> bool {
        self.execution_results.as_ref().is_some_and(|r| r.all_passed)
    }

    /// Human-readable summary.
    pub fn summary(&self) -> String {
        let mut out = String::new();
        out.push_str(&format!(
            "Status: {}\n",
            if self.success { "✅ SUCCESS" } else { "❌ FAILED" }
        ));
        out.push_str(&format!("Strategy: {}\n", self.strategy));
        out.push_str(&format!("Files: {}\n", self.files.len()));
        out.push_str(&format!("Iterations: {}\n", self.iterations.len()));

        match &self.execution_results {
            Some(validation) => out.push_str(&format!(
                "Validation: {}/{} checks passed\n",
                validation.passed_count(),
                validation.checks.len()
            )),
            None => out.push_str("Validation: not run\n"),
        }

        if !self.warnings.is_empty() {
            out.push_str("\nWarnings:\n");
            for warning in &self.warnings {
                out.push_str(&format!("  ⚠ {}\n", warning));
            }
        }
        if !self.errors.is_empty() {
            out.push_str("\nErrors:\n");
            for error in &self.errors {
                out.push_str(&format!("  ❌ {}\n", error));
            }
        }
        out.trim_end().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use forge_policy::{CheckKind, CheckResult};

    #[test]
    fn test_verified_requires_passing_gate() {
        let mut result = GenerationResult::new(Uuid::new_v4(), GenerationStrategy::Sandboxed, Utc::now());
        assert!(!result.verified());

        let mut validation = ValidationResult::new();
        validation.add_result(CheckResult::pass(CheckKind::Build, 1));
        validation.finalize();
        result.execution_results = Some(validation);
        assert!(result.verified());
    }

    #[test]
    fn test_summary_lists_warnings() {
        let mut result = GenerationResult::new(Uuid::new_v4(), GenerationStrategy::Degraded, Utc::now());
        result.success = true;
        result.warnings.push("produced without sandboxed verification".to_string());
        result.files.push(GeneratedFile::new("README.md", "# demo"));

        let summary = result.summary();
        assert!(summary.contains("Strategy: degraded"));
        assert!(summary.contains("Validation: not run"));
        assert!(summary.contains("⚠ produced without sandboxed verification"));
        assert_eq!(result.file("README.md").map(|f| f.content.as_str()), Some("# demo"));
    }

    #[test]
    fn test_strategy_serializes_snake_case() {
        let json = serde_json::to_string(&GenerationStrategy::Chunked).unwrap();
        assert_eq!(json, "\"chunked\"");
    }
}
