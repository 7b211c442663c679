//! Security review through the generation oracle.
//!
//! Unlike the other checks there is no deterministic tool here: the source
//! is handed to the oracle with a fixed answer format, and every reported
//! issue fails the check.

use std::fs;
use std::path::Path;
use std::time::{Duration, Instant};

use forge_oracle::{ask, GenerationOracle, OracleError};
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::check::{CheckKind, CheckResult};
use crate::diagnostics::MAX_DIAGNOSTICS;

/// Default cap on source bytes sent for review.
pub const DEFAULT_REVIEW_BYTES: usize = 48 * 1024;

const REVIEW_INSTRUCTIONS: &str = "Review the following TypeScript project for security issues: \
hard-coded secrets, injection, unsafe eval, missing input validation on external data, and \
credentials written to logs.\n\n\
Answer with one line per issue in the form `ISSUE: <file>: <problem>`. \
If there are no issues, answer with the single word NONE.\n";

/// Source bundle handed to the reviewer.
#[derive(Debug, Default)]
pub struct ReviewSources {
    pub text: String,
    /// Files left out because they did not fit in the byte budget.
    pub skipped: Vec<String>,
}

impl ReviewSources {
    /// Diagnostic noting which files the review never saw.
    pub fn truncation_note(&self) -> Option<String> {
        if self.skipped.is_empty() {
            return None;
        }
        Some(format!(
            "security review truncated: {} file(s) over the review budget were not reviewed: {}",
            self.skipped.len(),
            self.skipped.join(", ")
        ))
    }
}

/// Collect reviewable sources under `root`: the manifest and everything in `src/`.
///
/// A file that would overflow `max_bytes` is skipped and recorded; smaller
/// files after it are still taken.
pub fn collect_sources(root: &Path, max_bytes: usize) -> ReviewSources {
    let mut paths = Vec::new();
    if root.join("package.json").is_file() {
        paths.push(root.join("package.json"));
    }
    let src = root.join("src");
    if src.is_dir() {
        let mut found: Vec<_> = WalkDir::new(&src)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .map(|e| e.into_path())
            .collect();
        found.sort();
        paths.extend(found);
    }

    let mut bundle = ReviewSources::default();
    for path in paths {
        let Ok(content) = fs::read_to_string(&path) else {
            continue;
        };
        let relative = path.strip_prefix(root).unwrap_or(&path).display().to_string();
        let section = format!("### {}\n```\n{}\n```\n\n", relative, content.trim_end());
        if bundle.text.len() + section.len() > max_bytes {
            debug!("Skipping {} from review: over budget", relative);
            bundle.skipped.push(relative);
            continue;
        }
        bundle.text.push_str(&section);
    }
    bundle
}

/// Parse the oracle's answer into a list of issues.
///
/// `NONE` (alone) means no issues. Otherwise `ISSUE:` lines are taken;
/// if there are none, `- ` bullets are.
pub fn parse_issues(answer: &str) -> Vec<String> {
    let trimmed = answer.trim();
    if trimmed.is_empty() || trimmed.trim_matches(['*', '`', '.']).eq_ignore_ascii_case("none") {
        return Vec::new();
    }

    let issues: Vec<String> = trimmed
        .lines()
        .filter_map(|line| {
            let line = line.trim();
            let prefix = line.get(..6)?;
            prefix
                .eq_ignore_ascii_case("issue:")
                .then(|| line[6..].trim().to_string())
        })
        .filter(|issue| !issue.is_empty())
        .collect();

    if !issues.is_empty() {
        return issues;
    }

    trimmed
        .lines()
        .filter_map(|line| line.trim().strip_prefix("- "))
        .map(|issue| issue.trim().to_string())
        .filter(|issue| !issue.is_empty())
        .collect()
}

/// Run the security review for the project at `root`.
pub async fn review(oracle: &dyn GenerationOracle, root: &Path, limit: Duration, max_bytes: usize) -> CheckResult {
    let start = Instant::now();
    let sources = collect_sources(root, max_bytes);
    let note = sources.truncation_note();
    if let Some(note) = &note {
        warn!("{}", note);
    }
    if sources.text.is_empty() {
        return CheckResult::could_not_run(
            CheckKind::Security,
            "security could not run: no sources to review",
            0,
        );
    }

    let prompt = format!("{}\n{}", REVIEW_INSTRUCTIONS, sources.text);
    let outcome = ask(oracle, &prompt, 1, limit).await;
    let elapsed = start.elapsed().as_millis() as u64;

    let mut result = match outcome {
        Ok(reply) => {
            let issues = parse_issues(&reply.text);
            if issues.is_empty() {
                CheckResult::pass(CheckKind::Security, elapsed)
            } else {
                let count = issues.len() as u32;
                let diagnostics = issues.into_iter().take(MAX_DIAGNOSTICS).collect();
                CheckResult::fail(CheckKind::Security, count, diagnostics, elapsed)
            }
        }
        Err(OracleError::Timeout(secs)) => {
            warn!("Security review timed out after {}s", secs);
            CheckResult::could_not_run(
                CheckKind::Security,
                format!("security timed out after {}s", secs),
                elapsed,
            )
        }
        Err(e) => {
            warn!("Security review failed: {}", e);
            CheckResult::could_not_run(CheckKind::Security, format!("security could not run: {}", e), elapsed)
        }
    };
    if let Some(note) = note {
        result.diagnostics.push(note);
    }
    result
}
