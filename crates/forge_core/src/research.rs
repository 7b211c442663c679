//! API research and PRD composition.

use std::time::Duration;

use forge_oracle::{ask, GenerationOracle};
use forge_policy::{CheckKind, GateConfig};
use forge_spec::{GenerationRequest, RequirementModel};
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// File name of the composed product requirements document.
pub const PRD_FILE: &str = "PRD.md";

/// Something to research: an API and what is known about it up front.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResearchTarget {
    pub name: String,
    pub base_url: Option<String>,
    pub auth: Option<String>,
}

/// Research notes for one API.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ApiResearch {
    pub api: String,
    pub notes: String,
}

/// Outcome of a research round.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResearchReport {
    pub findings: Vec<ApiResearch>,
    pub warnings: Vec<String>,
}

/// APIs worth researching: the model's integrations plus any extra APIs
/// named on the request.
pub fn research_targets(request: &GenerationRequest, model: &RequirementModel) -> Vec<ResearchTarget> {
    let mut targets: Vec<ResearchTarget> = model
        .api_integrations
        .iter()
        .map(|api| ResearchTarget {
            name: api.name.clone(),
            base_url: Some(api.base_url.clone()),
            auth: Some(api.auth_type.to_string()),
        })
        .collect();

    for name in &request.external_apis {
        if !targets.iter().any(|t| t.name.eq_ignore_ascii_case(name)) {
            targets.push(ResearchTarget {
                name: name.clone(),
                base_url: None,
                auth: None,
            });
        }
    }
    targets
}

fn research_prompt(target: &ResearchTarget) -> String {
    let mut prompt = format!(
        "Summarize how a TypeScript client should call the {} API",
        target.name
    );
    if let Some(url) = &target.base_url {
        prompt.push_str(&format!(" (base URL {})", url));
    }
    prompt.push_str(". Cover authentication");
    if let Some(auth) = &target.auth {
        prompt.push_str(&format!(" ({})", auth));
    }
    prompt.push_str(", the main endpoints and their response shapes, rate limits, and error handling. Be concise.");
    prompt
}

/// Research every target concurrently, each call under its own timeout.
///
/// Failures become warnings; the round itself never fails.
pub async fn research_apis(oracle: &dyn GenerationOracle, targets: &[ResearchTarget], limit: Duration) -> ResearchReport {
    if targets.is_empty() {
        return ResearchReport::default();
    }
    info!("Researching {} API(s)", targets.len());

    let calls = targets.iter().map(|target| async move {
        let prompt = research_prompt(target);
        (target, ask(oracle, &prompt, 1, limit).await)
    });

    let mut report = ResearchReport::default();
    for (target, outcome) in join_all(calls).await {
        match outcome {
            Ok(reply) if !reply.text.trim().is_empty() => report.findings.push(ApiResearch {
                api: target.name.clone(),
                notes: reply.text.trim().to_string(),
            }),
            Ok(_) => report
                .warnings
                .push(format!("Research for {} returned nothing", target.name)),
            Err(e) => {
                warn!("Research for {} failed: {}", target.name, e);
                report.warnings.push(format!("Research for {} failed: {}", target.name, e));
            }
        }
    }
    report
}

/// Compose the PRD from the request, the requirement model and research notes.
pub fn compose_prd(
    request: &GenerationRequest,
    model: &RequirementModel,
    research: &[ApiResearch],
    gate: &GateConfig,
) -> String {
    let mut prd = format!("# Product Requirements: {}\n\n", request.project_name);

    prd.push_str("## Overview\n\n");
    prd.push_str(request.description.trim());
    prd.push_str(&format!(
        "\n\nDeliverable: a TypeScript {} ({} complexity, about {} minutes of generation).\n\n",
        request.target_type,
        model.complexity,
        model.complexity.budget().estimated_minutes
    ));

    prd.push_str("## Functional Requirements\n\n");
    let mut numbered = 0;
    for requirement in &request.requirements {
        numbered += 1;
        prd.push_str(&format!("{}. {}\n", numbered, requirement));
    }
    for action in &model.actions {
        numbered += 1;
        prd.push_str(&format!("{}. Action `{}`: {}\n", numbered, action.name, action.description));
    }
    for capability in model.providers.iter().chain(&model.services).chain(&model.evaluators) {
        numbered += 1;
        prd.push_str(&format!("{}. `{}`: {}\n", numbered, capability.name, capability.description));
    }
    if numbered == 0 {
        prd.push_str("1. Implement the behaviour described in the overview.\n");
    }
    prd.push('\n');

    if !research.is_empty() {
        prd.push_str("## API Integrations\n\n");
        for finding in research {
            prd.push_str(&format!("### {}\n\n{}\n\n", finding.api, finding.notes));
        }
    }

    if !model.env_vars.is_empty() {
        prd.push_str("## Configuration\n\n| Variable | Required | Description |\n|----------|----------|-------------|\n");
        for var in &model.env_vars {
            prd.push_str(&format!(
                "| `{}` | {} | {} |\n",
                var.name,
                if var.required { "yes" } else { "no" },
                var.description
            ));
        }
        prd.push('\n');
    }

    if !request.scenarios().is_empty() {
        prd.push_str("## Test Scenarios\n\n");
        for scenario in request.scenarios() {
            prd.push_str(&format!("- {}\n", scenario));
        }
        prd.push('\n');
    }

    prd.push_str("## Acceptance Criteria\n\n");
    for check in gate.ordered() {
        let line = match check.kind {
            CheckKind::Security => "No issues reported by the security review".to_string(),
            kind => format!(
                "`{}` succeeds",
                check.command.as_deref().unwrap_or(kind.as_str())
            ),
        };
        prd.push_str(&format!("- [ ] {}\n", line));
    }

    prd
}

#[cfg(test)]
mod tests {
    use super::*;
    use forge_oracle::ScriptedOracle;
    use forge_spec::{KeywordClassifier, RequirementClassifier, TargetType};

    fn weather() -> (GenerationRequest, RequirementModel) {
        let request = GenerationRequest::new("weather", "Create a weather plugin using OpenWeatherMap", TargetType::Plugin)
            .external_api("Stripe");
        let model = KeywordClassifier::new().parse(&request.description);
        (request, model)
    }

    #[test]
    fn test_targets_merge_request_apis() {
        let (request, model) = weather();
        let targets = research_targets(&request, &model);
        let names: Vec<&str> = targets.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["OpenWeatherMap", "Stripe"]);
        assert!(targets[1].base_url.is_none());
    }

    #[tokio::test]
    async fn test_failures_become_warnings() {
        let (request, model) = weather();
        let oracle = ScriptedOracle::new()
            .route("OpenWeatherMap", "Use the appid query parameter.")
            .route_failure("Stripe", "rate limited");

        let report = research_apis(&oracle, &research_targets(&request, &model), Duration::from_secs(5)).await;

        assert_eq!(report.findings.len(), 1);
        assert_eq!(report.findings[0].api, "OpenWeatherMap");
        assert_eq!(report.warnings.len(), 1);
        assert!(report.warnings[0].contains("Stripe"));
    }

    #[tokio::test]
    async fn test_calls_run_concurrently() {
        let targets: Vec<ResearchTarget> = ["A", "B", "C"]
            .iter()
            .map(|name| ResearchTarget {
                name: name.to_string(),
                base_url: None,
                auth: None,
            })
            .collect();
        let oracle = ScriptedOracle::new()
            .reply("notes")
            .with_delay(Duration::from_millis(400));

        let start = std::time::Instant::now();
        let report = research_apis(&oracle, &targets, Duration::from_secs(5)).await;
        assert_eq!(report.findings.len(), 3);
        assert!(start.elapsed() < Duration::from_millis(1000));
    }

    #[test]
    fn test_prd_sections() {
        let (request, model) = weather();
        let findings = vec![ApiResearch {
            api: "OpenWeatherMap".to_string(),
            notes: "Use the appid query parameter.".to_string(),
        }];
        let prd = compose_prd(&request, &model, &findings, &GateConfig::default());

        assert!(prd.starts_with("# Product Requirements: weather"));
        assert!(prd.contains("Action `GET_WEATHER`"));
        assert!(prd.contains("### OpenWeatherMap"));
        assert!(prd.contains("| `OPENWEATHER_API_KEY` | yes |"));
        assert!(prd.contains("- [ ] `npm test` succeeds"));
        assert!(prd.contains("security review"));
    }
}
