//! Structured requirement model derived from free text.

use serde::{Deserialize, Serialize};

use crate::complexity::Complexity;
use crate::request::{GenerationRequest, TargetType};

/// A single named capability (action, provider, service or evaluator).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Capability {
    pub name: String,
    pub description: String,
}

impl Capability {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
        }
    }
}

/// How an external API authenticates callers.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AuthType {
    None,
    ApiKey,
    Bearer,
    OAuth,
    BotToken,
}

impl AuthType {
    /// Whether the integration needs a secret to be configured.
    pub fn requires_secret(&self) -> bool {
        !matches!(self, Self::None)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::ApiKey => "api_key",
            Self::Bearer => "bearer",
            Self::OAuth => "oauth",
            Self::BotToken => "bot_token",
        }
    }
}

impl std::fmt::Display for AuthType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// An external API the generated project talks to.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ApiIntegration {
    pub name: String,
    pub base_url: String,
    pub auth_type: AuthType,
    pub endpoints: Vec<String>,
}

/// An environment variable the generated project reads.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EnvVar {
    pub name: String,
    pub description: String,
    pub required: bool,
    pub sensitive: bool,
}

impl EnvVar {
    pub fn secret(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            required: true,
            sensitive: true,
        }
    }

    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }
}

/// Structured description of what must be built.
///
/// Produced by a [`RequirementClassifier`](crate::RequirementClassifier) and
/// consumed read-only by the pipeline.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RequirementModel {
    pub name: String,
    pub description: String,
    pub target_type: TargetType,
    pub actions: Vec<Capability>,
    pub providers: Vec<Capability>,
    pub services: Vec<Capability>,
    pub evaluators: Vec<Capability>,
    pub api_integrations: Vec<ApiIntegration>,
    pub env_vars: Vec<EnvVar>,
    pub complexity: Complexity,
}

impl RequirementModel {
    /// Create an empty model; complexity is recomputed by [`Self::refresh_complexity`].
    pub fn new(name: impl Into<String>, description: impl Into<String>, target_type: TargetType) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            target_type,
            actions: Vec::new(),
            providers: Vec::new(),
            services: Vec::new(),
            evaluators: Vec::new(),
            api_integrations: Vec::new(),
            env_vars: Vec::new(),
            complexity: Complexity::Simple,
        }
    }

    pub fn has_action(&self, name: &str) -> bool {
        self.actions.iter().any(|a| a.name == name)
    }

    pub fn env_var(&self, name: &str) -> Option<&EnvVar> {
        self.env_vars.iter().find(|v| v.name == name)
    }

    /// Total number of capabilities across all buckets.
    pub fn capability_count(&self) -> usize {
        self.actions.len() + self.providers.len() + self.services.len() + self.evaluators.len()
    }

    /// Environment variables that must be set before the project can run.
    pub fn required_secrets(&self) -> impl Iterator<Item = &EnvVar> {
        self.env_vars.iter().filter(|v| v.required && v.sensitive)
    }

    pub fn refresh_complexity(&mut self) {
        self.complexity = Complexity::score(self);
    }

    /// Turn the model into a request for the pipeline.
    pub fn to_request(&self) -> GenerationRequest {
        let mut request = GenerationRequest::new(&self.name, &self.description, self.target_type);

        let buckets = [
            ("Action", &self.actions),
            ("Provider", &self.providers),
            ("Service", &self.services),
            ("Evaluator", &self.evaluators),
        ];
        for (kind, capabilities) in buckets {
            for capability in capabilities {
                request = request.requirement(format!(
                    "{} {}: {}",
                    kind, capability.name, capability.description
                ));
            }
        }

        for api in &self.api_integrations {
            request = request.external_api(&api.name);
        }

        request
    }

    pub(crate) fn push_action(&mut self, capability: Capability) {
        push_unique(&mut self.actions, capability);
    }

    pub(crate) fn push_provider(&mut self, capability: Capability) {
        push_unique(&mut self.providers, capability);
    }

    pub(crate) fn push_service(&mut self, capability: Capability) {
        push_unique(&mut self.services, capability);
    }

    pub(crate) fn push_evaluator(&mut self, capability: Capability) {
        push_unique(&mut self.evaluators, capability);
    }

    pub(crate) fn push_api(&mut self, api: ApiIntegration) {
        if !self.api_integrations.iter().any(|a| a.name == api.name) {
            self.api_integrations.push(api);
        }
    }

    pub(crate) fn push_env(&mut self, var: EnvVar) {
        if !self.env_vars.iter().any(|v| v.name == var.name) {
            self.env_vars.push(var);
        }
    }
}

fn push_unique(bucket: &mut Vec<Capability>, capability: Capability) {
    if !bucket.iter().any(|c| c.name == capability.name) {
        bucket.push(capability);
    }
}
