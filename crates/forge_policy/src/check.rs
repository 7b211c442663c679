//! Check kinds and validation results.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A gate check. Declaration order is execution order.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum CheckKind {
    Install,
    Lint,
    Typecheck,
    Build,
    Test,
    Security,
}

impl CheckKind {
    pub fn all() -> [CheckKind; 6] {
        [
            Self::Install,
            Self::Lint,
            Self::Typecheck,
            Self::Build,
            Self::Test,
            Self::Security,
        ]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Install => "install",
            Self::Lint => "lint",
            Self::Typecheck => "typecheck",
            Self::Build => "build",
            Self::Test => "test",
            Self::Security => "security",
        }
    }

    /// Default per-check timeout in seconds.
    pub fn default_timeout_secs(&self) -> u64 {
        match self {
            Self::Install => 120,
            Self::Lint => 60,
            Self::Typecheck => 120,
            Self::Build => 180,
            Self::Test => 240,
            Self::Security => 30,
        }
    }
}

impl std::fmt::Display for CheckKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Outcome of one check.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CheckResult {
    pub check: CheckKind,
    pub passed: bool,
    pub error_count: u32,
    pub diagnostics: Vec<String>,
    /// Duration of the check in milliseconds
    #[serde(default)]
    pub duration_ms: u64,
}

impl CheckResult {
    pub fn pass(check: CheckKind, duration_ms: u64) -> Self {
        Self {
            check,
            passed: true,
            error_count: 0,
            diagnostics: Vec::new(),
            duration_ms,
        }
    }

    pub fn fail(check: CheckKind, error_count: u32, diagnostics: Vec<String>, duration_ms: u64) -> Self {
        Self {
            check,
            passed: false,
            error_count: error_count.max(1),
            diagnostics,
            duration_ms,
        }
    }

    /// The check could not run or did not finish.
    pub fn could_not_run(check: CheckKind, message: impl Into<String>, duration_ms: u64) -> Self {
        Self::fail(check, 1, vec![message.into()], duration_ms)
    }
}

/// Per-check results of one gate run plus the aggregate verdict.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ValidationResult {
    pub checks: BTreeMap<CheckKind, CheckResult>,
    pub all_passed: bool,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
}

impl Default for ValidationResult {
    fn default() -> Self {
        Self::new()
    }
}

impl ValidationResult {
    pub fn new() -> Self {
        let now = Utc::now();
        Self {
            checks: BTreeMap::new(),
            all_passed: true,
            started_at: now,
            completed_at: now,
        }
    }

    /// Add a check result. A failing check fails the whole result.
    pub fn add_result(&mut self, result: CheckResult) {
        if !result.passed {
            self.all_passed = false;
        }
        self.checks.insert(result.check, result);
    }

    /// Recompute the verdict and stamp completion time.
    pub fn finalize(&mut self) {
        self.completed_at = Utc::now();
        self.all_passed = self.checks.values().all(|c| c.passed);
    }

    pub fn get(&self, check: CheckKind) -> Option<&CheckResult> {
        self.checks.get(&check)
    }

    pub fn failed_checks(&self) -> Vec<&CheckResult> {
        self.checks.values().filter(|c| !c.passed).collect()
    }

    pub fn passed_count(&self) -> usize {
        self.checks.values().filter(|c| c.passed).count()
    }

    pub fn total_errors(&self) -> u32 {
        self.checks.values().map(|c| c.error_count).sum()
    }

    /// Diagnostics of failed checks, formatted for a fix prompt.
    pub fn failure_summary(&self) -> String {
        let failed = self.failed_checks();
        if failed.is_empty() {
            return "All checks passed.".to_string();
        }

        let mut summary = String::new();
        for check in failed {
            summary.push_str(&format!(
                "## {} failed ({} error{})\n",
                check.check,
                check.error_count,
                if check.error_count == 1 { "" } else { "s" }
            ));
            for line in &check.diagnostics {
                summary.push_str(&format!("- {}\n", line));
            }
            summary.push('\n');
        }
        summary.trim_end().to_string()
    }

    /// Generate a human-readable report.
    pub fn report(&self) -> String {
        let mut report = String::new();

        report.push_str(&format!(
            "Status: {}\n\n",
            if self.all_passed { "✅ PASSED" } else { "❌ FAILED" }
        ));

        report.push_str("Checks:\n");
        for result in self.checks.values() {
            let status = if result.passed { "✅" } else { "❌" };
            let detail = if result.passed && result.diagnostics.is_empty() {
                "ok".to_string()
            } else if result.passed {
                format!("ok, {}", result.diagnostics.join("; "))
            } else {
                format!("{} error(s)", result.error_count)
            };
            report.push_str(&format!(
                "  {} {} - {} ({}ms)\n",
                status, result.check, detail, result.duration_ms
            ));
        }

        let failed = self.failed_checks();
        if !failed.is_empty() {
            report.push_str("\nBlocking Issues:\n");
            for failure in failed {
                for line in failure.diagnostics.iter().take(5) {
                    report.push_str(&format!("  ❌ {}: {}\n", failure.check, line));
                }
            }
        }

        report.push_str(&format!(
            "\nSummary: {}/{} checks passed",
            self.passed_count(),
            self.checks.len()
        ));

        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_order() {
        let mut kinds = vec![CheckKind::Security, CheckKind::Install, CheckKind::Test, CheckKind::Lint];
        kinds.sort();
        assert_eq!(
            kinds,
            vec![CheckKind::Install, CheckKind::Lint, CheckKind::Test, CheckKind::Security]
        );
    }

    #[test]
    fn test_single_failure_fails_gate() {
        let mut result = ValidationResult::new();
        result.add_result(CheckResult::pass(CheckKind::Install, 10));
        result.add_result(CheckResult::fail(
            CheckKind::Lint,
            2,
            vec!["src/index.ts:3:1 error no-unused-vars".to_string()],
            5,
        ));
        result.finalize();

        assert!(!result.all_passed);
        assert_eq!(result.failed_checks().len(), 1);
        assert_eq!(result.total_errors(), 2);
    }

    #[test]
    fn test_failure_summary_only_lists_failures() {
        let mut result = ValidationResult::new();
        result.add_result(CheckResult::pass(CheckKind::Build, 0));
        result.add_result(CheckResult::could_not_run(CheckKind::Test, "test timed out after 240s", 0));
        result.finalize();

        let summary = result.failure_summary();
        assert!(summary.contains("## test failed (1 error)"));
        assert!(summary.contains("- test timed out after 240s"));
        assert!(!summary.contains("build"));
    }

    #[test]
    fn test_report_shows_notes_on_passing_checks() {
        let mut security = CheckResult::pass(CheckKind::Security, 0);
        security
            .diagnostics
            .push("security review truncated: 1 file(s) over the review budget were not reviewed: src/big.ts".to_string());
        let mut result = ValidationResult::new();
        result.add_result(security);
        result.finalize();

        assert!(result.all_passed);
        assert!(result.report().contains("security - ok, security review truncated"));
        assert_eq!(result.failure_summary(), "All checks passed.");
    }

    #[test]
    fn test_empty_result_passes() {
        let mut result = ValidationResult::new();
        result.finalize();
        assert!(result.all_passed);
        assert_eq!(result.failure_summary(), "All checks passed.");
    }

    #[test]
    fn test_serializes_check_names() {
        let mut result = ValidationResult::new();
        result.add_result(CheckResult::pass(CheckKind::Typecheck, 0));
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["checks"]["typecheck"]["passed"], true);
        assert_eq!(json["all_passed"], true);
    }
}
