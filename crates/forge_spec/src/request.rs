//! Generation request types.

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{SpecError, SpecResult};

/// Kind of project the pipeline is asked to produce.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum TargetType {
    Plugin,
    Agent,
    Workflow,
    Integration,
    FullStack,
}

impl TargetType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Plugin => "plugin",
            Self::Agent => "agent",
            Self::Workflow => "workflow",
            Self::Integration => "integration",
            Self::FullStack => "full-stack",
        }
    }

    /// All target types in declaration order.
    pub fn all() -> [TargetType; 5] {
        [
            Self::Plugin,
            Self::Agent,
            Self::Workflow,
            Self::Integration,
            Self::FullStack,
        ]
    }
}

impl Default for TargetType {
    fn default() -> Self {
        Self::Plugin
    }
}

impl fmt::Display for TargetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for TargetType {
    type Err = SpecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "plugin" => Ok(Self::Plugin),
            "agent" => Ok(Self::Agent),
            "workflow" => Ok(Self::Workflow),
            "integration" => Ok(Self::Integration),
            "full-stack" | "fullstack" | "full_stack" => Ok(Self::FullStack),
            other => Err(SpecError::UnknownTarget(other.to_string())),
        }
    }
}

/// An accepted request for one pipeline run.
///
/// Requests are immutable once handed to the orchestrator; the builder
/// methods below are only used while assembling one.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GenerationRequest {
    pub project_name: String,
    pub description: String,
    #[serde(default)]
    pub target_type: TargetType,
    #[serde(default)]
    pub requirements: Vec<String>,
    #[serde(default)]
    pub external_apis: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub test_scenarios: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub publish_target: Option<String>,
}

impl GenerationRequest {
    pub fn new(
        project_name: impl Into<String>,
        description: impl Into<String>,
        target_type: TargetType,
    ) -> Self {
        Self {
            project_name: project_name.into(),
            description: description.into(),
            target_type,
            requirements: Vec::new(),
            external_apis: Vec::new(),
            test_scenarios: None,
            publish_target: None,
        }
    }

    pub fn requirement(mut self, requirement: impl Into<String>) -> Self {
        self.requirements.push(requirement.into());
        self
    }

    pub fn external_api(mut self, api: impl Into<String>) -> Self {
        self.external_apis.push(api.into());
        self
    }

    pub fn test_scenario(mut self, scenario: impl Into<String>) -> Self {
        self.test_scenarios
            .get_or_insert_with(Vec::new)
            .push(scenario.into());
        self
    }

    pub fn publish_to(mut self, target: impl Into<String>) -> Self {
        self.publish_target = Some(target.into());
        self
    }

    /// Test scenarios, or an empty slice when none were given.
    pub fn scenarios(&self) -> &[String] {
        self.test_scenarios.as_deref().unwrap_or(&[])
    }

    /// Package-safe form of the project name (lowercase kebab-case).
    pub fn slug(&self) -> String {
        slugify(&self.project_name)
    }

    /// Check that the request can be handed to the pipeline.
    pub fn validate(&self) -> SpecResult<()> {
        if self.project_name.trim().is_empty() {
            return Err(SpecError::MissingField("project_name".to_string()));
        }
        if self.description.trim().is_empty() {
            return Err(SpecError::MissingField("description".to_string()));
        }
        if self.slug().is_empty() {
            return Err(SpecError::InvalidRequest(format!(
                "project name '{}' has no usable characters",
                self.project_name
            )));
        }
        Ok(())
    }

    /// Load and validate a request from a JSON file.
    pub fn from_json_file(path: &Path) -> SpecResult<Self> {
        let content = std::fs::read_to_string(path)?;
        let request: Self = serde_json::from_str(&content)?;
        request.validate()?;
        Ok(request)
    }
}

/// A file produced by the pipeline, addressed relative to the project root.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GeneratedFile {
    pub path: String,
    pub content: String,
}

impl GeneratedFile {
    pub fn new(path: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            content: content.into(),
        }
    }
}

/// Lowercase kebab-case, ASCII alphanumerics only.
pub fn slugify(input: &str) -> String {
    let mut slug = String::with_capacity(input.len());
    let mut pending_dash = false;

    for c in input.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(c.to_ascii_lowercase());
        } else {
            pending_dash = true;
        }
    }

    slug
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_target_type_parsing() {
        assert_eq!("plugin".parse::<TargetType>().unwrap(), TargetType::Plugin);
        assert_eq!("Full-Stack".parse::<TargetType>().unwrap(), TargetType::FullStack);
        assert_eq!("fullstack".parse::<TargetType>().unwrap(), TargetType::FullStack);
        assert!("mobile".parse::<TargetType>().is_err());
    }

    #[test]
    fn test_target_type_serde() {
        let json = serde_json::to_string(&TargetType::FullStack).unwrap();
        assert_eq!(json, "\"full-stack\"");
    }

    #[test]
    fn test_request_builder() {
        let request = GenerationRequest::new("Weather Plugin", "Fetch weather", TargetType::Plugin)
            .requirement("Current conditions")
            .external_api("OpenWeatherMap")
            .test_scenario("returns temperature");

        assert_eq!(request.slug(), "weather-plugin");
        assert_eq!(request.requirements.len(), 1);
        assert_eq!(request.scenarios(), &["returns temperature".to_string()]);
        assert!(request.validate().is_ok());
    }

    #[test]
    fn test_request_validation() {
        let empty_name = GenerationRequest::new("  ", "something", TargetType::Agent);
        assert!(matches!(empty_name.validate(), Err(SpecError::MissingField(_))));

        let symbols = GenerationRequest::new("!!!", "something", TargetType::Agent);
        assert!(matches!(symbols.validate(), Err(SpecError::InvalidRequest(_))));
    }

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("My  Cool__App!"), "my-cool-app");
        assert_eq!(slugify("--already-kebab--"), "already-kebab");
    }
}
