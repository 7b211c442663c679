//! Error counting and diagnostic extraction from tool output.

use regex::Regex;

use crate::check::CheckKind;

/// Maximum diagnostic lines kept per check.
pub const MAX_DIAGNOSTICS: usize = 20;

/// Parses compiler, linter and test-runner output.
pub struct DiagnosticParser {
    ts_error: Regex,
    eslint_summary: Regex,
    test_failures: Regex,
    relevant: Regex,
}

impl Default for DiagnosticParser {
    fn default() -> Self {
        Self::new()
    }
}

impl DiagnosticParser {
    pub fn new() -> Self {
        Self {
            ts_error: Regex::new(r"error TS\d+").expect("valid regex"),
            eslint_summary: Regex::new(r"(\d+) problems? \((\d+) errors?").expect("valid regex"),
            test_failures: Regex::new(r"(?i)(\d+) fail(?:ed|ing|s|ures?)?\b").expect("valid regex"),
            relevant: Regex::new(r"(?i)\b(?:error|fail(?:ed|ure)?|cannot|unexpected|not found)\b|[✗×✖]")
                .expect("valid regex"),
        }
    }

    /// Number of errors reported in `output`.
    ///
    /// A non-zero exit with nothing parseable counts as one error; a zero
    /// exit counts as none regardless of output.
    pub fn count_errors(&self, check: CheckKind, exit_code: i64, output: &str) -> u32 {
        if exit_code == 0 {
            return 0;
        }

        let parsed = match check {
            CheckKind::Typecheck | CheckKind::Build => self.ts_error.find_iter(output).count() as u32,
            CheckKind::Lint => self.lint_errors(output),
            CheckKind::Test => self
                .test_failures
                .captures_iter(output)
                .filter_map(|caps| caps[1].parse::<u32>().ok())
                .max()
                .unwrap_or(0),
            CheckKind::Install | CheckKind::Security => 0,
        };

        parsed.max(1)
    }

    fn lint_errors(&self, output: &str) -> u32 {
        if let Some(caps) = self.eslint_summary.captures(output) {
            return caps[2].parse().unwrap_or(0);
        }
        output
            .lines()
            .filter(|line| line.split_whitespace().any(|word| word == "error"))
            .count() as u32
    }

    /// Lines worth showing to whoever has to fix the failure.
    ///
    /// Prefers lines that look like errors; falls back to the tail of the
    /// output. At most [`MAX_DIAGNOSTICS`] lines are kept.
    pub fn extract(&self, output: &str) -> Vec<String> {
        let lines: Vec<&str> = output
            .lines()
            .map(str::trim_end)
            .filter(|line| !line.trim().is_empty())
            .collect();

        let relevant: Vec<String> = lines
            .iter()
            .filter(|line| self.relevant.is_match(line))
            .take(MAX_DIAGNOSTICS)
            .map(|line| line.trim().to_string())
            .collect();

        if !relevant.is_empty() {
            return relevant;
        }

        let start = lines.len().saturating_sub(MAX_DIAGNOSTICS);
        lines[start..].iter().map(|line| line.trim().to_string()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_typescript_errors() {
        let parser = DiagnosticParser::new();
        let output = "src/index.ts(3,5): error TS2304: Cannot find name 'foo'.\n\
                      src/index.ts(7,1): error TS2322: Type 'string' is not assignable to type 'number'.\n";
        assert_eq!(parser.count_errors(CheckKind::Typecheck, 2, output), 2);
        assert_eq!(parser.extract(output).len(), 2);
    }

    #[test]
    fn test_eslint_summary() {
        let parser = DiagnosticParser::new();
        let output = "/app/src/index.ts\n  3:7  error  'x' is assigned a value but never used  no-unused-vars\n\n\
                      ✖ 4 problems (3 errors, 1 warning)\n";
        assert_eq!(parser.count_errors(CheckKind::Lint, 1, output), 3);
    }

    #[test]
    fn test_eslint_without_summary_counts_error_lines() {
        let parser = DiagnosticParser::new();
        let output = "  1:1  error  Unexpected var  no-var\n  2:1  error  Missing semicolon  semi\n  3:1  warning  x\n";
        assert_eq!(parser.count_errors(CheckKind::Lint, 1, output), 2);
    }

    #[test]
    fn test_test_runner_failures() {
        let parser = DiagnosticParser::new();
        assert_eq!(parser.count_errors(CheckKind::Test, 1, " Tests  3 failed | 5 passed (8)"), 3);
        assert_eq!(parser.count_errors(CheckKind::Test, 1, "# fail 2"), 1);
        assert_eq!(parser.count_errors(CheckKind::Test, 1, "2 failing"), 2);
    }

    #[test]
    fn test_unparseable_nonzero_exit_counts_one() {
        let parser = DiagnosticParser::new();
        assert_eq!(parser.count_errors(CheckKind::Build, 1, "Segmentation fault"), 1);
        assert_eq!(parser.count_errors(CheckKind::Install, 127, ""), 1);
    }

    #[test]
    fn test_zero_exit_counts_nothing() {
        let parser = DiagnosticParser::new();
        assert_eq!(parser.count_errors(CheckKind::Typecheck, 0, "error TS1005"), 0);
    }

    #[test]
    fn test_extract_caps_and_falls_back_to_tail() {
        let parser = DiagnosticParser::new();

        let noisy: String = (0..50).map(|i| format!("error line {}\n", i)).collect();
        assert_eq!(parser.extract(&noisy).len(), MAX_DIAGNOSTICS);

        let quiet: String = (0..30).map(|i| format!("step {}\n", i)).collect();
        let tail = parser.extract(&quiet);
        assert_eq!(tail.len(), MAX_DIAGNOSTICS);
        assert_eq!(tail.last().map(String::as_str), Some("step 29"));
    }
}
