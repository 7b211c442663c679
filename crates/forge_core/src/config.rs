//! Orchestrator configuration.

use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use forge_policy::GateConfig;
use forge_spec::Complexity;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{CoreError, CoreResult};

/// Default config file name looked up by the CLI.
pub const CONFIG_FILE: &str = "forge.yaml";

/// Deployment environment. Only sizes the whole-run timeout.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum Environment {
    #[default]
    Production,
    Development,
}

impl Environment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Production => "production",
            Self::Development => "development",
        }
    }

    /// Default whole-run timeout in seconds.
    pub fn whole_run_timeout_secs(&self) -> u64 {
        match self {
            Self::Production => 300,
            Self::Development => 600,
        }
    }
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Environment {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "production" | "prod" => Ok(Self::Production),
            "development" | "dev" | "local" => Ok(Self::Development),
            other => Err(CoreError::InvalidConfig(format!("unknown environment '{}'", other))),
        }
    }
}

/// Configuration for a [`GenerationOrchestrator`](crate::GenerationOrchestrator).
///
/// Every field has a default, so a partial `forge.yaml` is valid.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct OrchestratorConfig {
    pub environment: Environment,
    /// Overrides the environment's whole-run timeout
    pub whole_run_timeout_secs: Option<u64>,
    pub max_iterations: u32,
    /// Turns granted to the oracle per iteration
    pub oracle_turn_budget: u32,
    /// Per-call oracle timeout; sized by complexity when unset
    pub oracle_timeout_secs: Option<u64>,
    pub research_enabled: bool,
    pub research_timeout_secs: u64,
    /// Per-file oracle timeout on the degraded path
    pub degraded_oracle_timeout_secs: u64,
    pub gate: GateConfig,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            environment: Environment::Production,
            whole_run_timeout_secs: None,
            max_iterations: 10,
            oracle_turn_budget: 1,
            oracle_timeout_secs: None,
            research_enabled: false,
            research_timeout_secs: 30,
            degraded_oracle_timeout_secs: 60,
            gate: GateConfig::default(),
        }
    }
}

impl OrchestratorConfig {
    pub fn environment(mut self, environment: Environment) -> Self {
        self.environment = environment;
        self
    }

    pub fn max_iterations(mut self, iterations: u32) -> Self {
        self.max_iterations = iterations;
        self
    }

    pub fn whole_run_timeout_secs(mut self, seconds: u64) -> Self {
        self.whole_run_timeout_secs = Some(seconds);
        self
    }

    pub fn oracle_timeout_secs(mut self, seconds: u64) -> Self {
        self.oracle_timeout_secs = Some(seconds);
        self
    }

    pub fn research(mut self, enabled: bool) -> Self {
        self.research_enabled = enabled;
        self
    }

    pub fn gate(mut self, gate: GateConfig) -> Self {
        self.gate = gate;
        self
    }

    pub fn whole_run_timeout(&self) -> Duration {
        Duration::from_secs(
            self.whole_run_timeout_secs
                .unwrap_or_else(|| self.environment.whole_run_timeout_secs()),
        )
    }

    /// Timeout for one oracle call on the sandboxed path.
    pub fn oracle_timeout(&self, complexity: Complexity) -> Duration {
        Duration::from_secs(
            self.oracle_timeout_secs
                .unwrap_or_else(|| complexity.budget().oracle_timeout_secs),
        )
    }

    pub fn research_timeout(&self) -> Duration {
        Duration::from_secs(self.research_timeout_secs)
    }

    pub fn degraded_oracle_timeout(&self) -> Duration {
        Duration::from_secs(self.degraded_oracle_timeout_secs)
    }

    pub fn validate(&self) -> CoreResult<()> {
        if self.max_iterations == 0 {
            return Err(CoreError::InvalidConfig("max_iterations must be at least 1".to_string()));
        }
        if self.oracle_turn_budget == 0 {
            return Err(CoreError::InvalidConfig("oracle_turn_budget must be at least 1".to_string()));
        }
        if self.whole_run_timeout_secs == Some(0) || self.oracle_timeout_secs == Some(0) {
            return Err(CoreError::InvalidConfig("timeouts must be non-zero".to_string()));
        }
        self.gate.validate()?;
        Ok(())
    }

    /// Parse YAML. Gate checks the file leaves out keep their defaults.
    pub fn from_yaml(content: &str) -> CoreResult<Self> {
        let mut config: Self = serde_yaml::from_str(content)?;
        config.gate = config.gate.with_defaults();
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> CoreResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Apply `FORGE_*` overrides from the process environment.
    pub fn with_env_overrides(self) -> CoreResult<Self> {
        self.with_overrides_from(|key| std::env::var(key).ok())
    }

    /// Apply `FORGE_*` overrides from an arbitrary lookup.
    pub fn with_overrides_from(mut self, lookup: impl Fn(&str) -> Option<String>) -> CoreResult<Self> {
        if let Some(value) = lookup("FORGE_ENV") {
            self.environment = value.parse()?;
        }
        if let Some(value) = lookup("FORGE_MAX_ITERATIONS") {
            self.max_iterations = parse_number("FORGE_MAX_ITERATIONS", &value)?;
        }
        if let Some(value) = lookup("FORGE_TIMEOUT_SECS") {
            self.whole_run_timeout_secs = Some(parse_number("FORGE_TIMEOUT_SECS", &value)?);
        }
        if let Some(value) = lookup("FORGE_RESEARCH") {
            self.research_enabled = matches!(value.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on");
        }
        debug!(
            "Effective config: env={}, max_iterations={}, whole_run={}s",
            self.environment,
            self.max_iterations,
            self.whole_run_timeout().as_secs()
        );
        self.validate()?;
        Ok(self)
    }
}

fn parse_number<T: FromStr>(key: &str, value: &str) -> CoreResult<T> {
    value
        .trim()
        .parse()
        .map_err(|_| CoreError::InvalidConfig(format!("{} is not a number: '{}'", key, value)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use forge_policy::CheckKind;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let config = OrchestratorConfig::default();
        config.validate().unwrap();
        assert_eq!(config.max_iterations, 10);
        assert_eq!(config.oracle_turn_budget, 1);
        assert_eq!(config.whole_run_timeout(), Duration::from_secs(300));
        assert!(!config.research_enabled);
    }

    #[test]
    fn test_development_timeout_and_override() {
        let config = OrchestratorConfig::default().environment(Environment::Development);
        assert_eq!(config.whole_run_timeout(), Duration::from_secs(600));

        let config = config.whole_run_timeout_secs(42);
        assert_eq!(config.whole_run_timeout(), Duration::from_secs(42));
    }

    #[test]
    fn test_oracle_timeout_sized_by_complexity() {
        let config = OrchestratorConfig::default();
        assert_eq!(config.oracle_timeout(Complexity::Simple), Duration::from_secs(60));
        assert_eq!(config.oracle_timeout(Complexity::Complex), Duration::from_secs(180));

        let fixed = config.oracle_timeout_secs(15);
        assert_eq!(fixed.oracle_timeout(Complexity::Complex), Duration::from_secs(15));
    }

    #[test]
    fn test_partial_yaml() {
        let yaml = r#"
environment: development
max_iterations: 3
gate:
  checks:
    - kind: build
      command: make
"#;
        let config = OrchestratorConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.environment, Environment::Development);
        assert_eq!(config.max_iterations, 3);
        assert_eq!(config.research_timeout_secs, 30);
        assert_eq!(config.gate.get(CheckKind::Build).unwrap().command.as_deref(), Some("make"));
        assert!(config.gate.has(CheckKind::Security));
        assert_eq!(config.gate.checks.len(), 6);
    }

    #[test]
    fn test_invalid_yaml_rejected() {
        assert!(OrchestratorConfig::from_yaml("max_iterations: 0").is_err());
        assert!(OrchestratorConfig::from_yaml("environment: staging").is_err());
        assert!(OrchestratorConfig::default()
            .gate(GateConfig::default().without(CheckKind::Security))
            .validate()
            .is_err());
    }

    #[test]
    fn test_env_overrides() {
        let vars: HashMap<&str, &str> = [
            ("FORGE_ENV", "dev"),
            ("FORGE_MAX_ITERATIONS", "4"),
            ("FORGE_TIMEOUT_SECS", "90"),
            ("FORGE_RESEARCH", "true"),
        ]
        .into_iter()
        .collect();

        let config = OrchestratorConfig::default()
            .with_overrides_from(|key| vars.get(key).map(|v| v.to_string()))
            .unwrap();

        assert_eq!(config.environment, Environment::Development);
        assert_eq!(config.max_iterations, 4);
        assert_eq!(config.whole_run_timeout(), Duration::from_secs(90));
        assert!(config.research_enabled);
    }

    #[test]
    fn test_bad_env_override() {
        let result = OrchestratorConfig::default().with_overrides_from(|key| {
            (key == "FORGE_MAX_ITERATIONS").then(|| "many".to_string())
        });
        assert!(matches!(result, Err(CoreError::InvalidConfig(_))));
    }
}
