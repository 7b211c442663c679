//! Fallback generation paths.
//!
//! Both paths exist so a request always ends with some artifact. The
//! degraded path asks the oracle for each essential file directly; the
//! chunked path renders a fixed template set and never calls the oracle.

use std::time::Duration;

use forge_oracle::{ask, extract_file_blocks, GenerationOracle};
use forge_spec::{GeneratedFile, GenerationRequest, RequirementModel};
use tracing::{info, warn};

use crate::error::CoreResult;

/// Warning attached to every degraded result.
pub const UNVERIFIED_WARNING: &str =
    "No sandbox was available: files were produced without sandboxed verification and have not been built or tested";

/// Files requested one by one on the degraded path.
pub const ESSENTIAL_FILES: &[(&str, &str)] = &[
    (
        "package.json",
        "the npm manifest, with build, typecheck, lint and test scripts and every dependency the code imports",
    ),
    (
        "src/index.ts",
        "the entry point implementing the described behaviour and exporting the public API",
    ),
    (
        "src/types.ts",
        "the shared type definitions, including a typed configuration object for the environment variables",
    ),
    (
        "README.md",
        "a README covering setup, configuration through environment variables, and usage",
    ),
];

/// Files and warnings from the degraded path.
#[derive(Debug, Clone, Default)]
pub struct DegradedOutput {
    pub files: Vec<GeneratedFile>,
    pub warnings: Vec<String>,
}

fn file_prompt(request: &GenerationRequest, model: &RequirementModel, path: &str, purpose: &str) -> String {
    let mut prompt = format!(
        "Project `{}` ({}): {}\n\n",
        request.slug(),
        request.target_type,
        request.description.trim()
    );
    for requirement in &request.requirements {
        prompt.push_str(&format!("- {}\n", requirement));
    }
    if !model.env_vars.is_empty() {
        let names: Vec<&str> = model.env_vars.iter().map(|v| v.name.as_str()).collect();
        prompt.push_str(&format!("Environment variables: {}\n", names.join(", ")));
    }
    prompt.push_str(&format!(
        "\nWrite `{}`: {}. Reply with the complete file content only.\n",
        path, purpose
    ));
    prompt
}

/// Strip a single surrounding code fence, if present.
fn unfence(text: &str) -> String {
    let trimmed = text.trim();
    if let Some(rest) = trimmed.strip_prefix("```") {
        let body = rest.split_once('\n').map(|(_, body)| body).unwrap_or("");
        let body = body.trim_end();
        let body = body.strip_suffix("```").unwrap_or(body);
        return format!("{}\n", body.trim_end());
    }
    format!("{}\n", trimmed)
}

/// Generate each essential file with its own oracle call and timeout.
pub async fn degraded_generate(
    oracle: &dyn GenerationOracle,
    request: &GenerationRequest,
    model: &RequirementModel,
    limit: Duration,
) -> DegradedOutput {
    info!("Degraded generation: {} essential file(s)", ESSENTIAL_FILES.len());
    let mut output = DegradedOutput::default();
    output.warnings.push(UNVERIFIED_WARNING.to_string());

    for (path, purpose) in ESSENTIAL_FILES {
        let prompt = file_prompt(request, model, path, purpose);
        match ask(oracle, &prompt, 1, limit).await {
            Ok(reply) if reply.text.trim().is_empty() => {
                output.warnings.push(format!("Oracle returned nothing for {}", path));
            }
            Ok(reply) => {
                let content = extract_file_blocks(&reply.text)
                    .into_iter()
                    .find(|f| f.path == *path)
                    .map(|f| f.content)
                    .unwrap_or_else(|| unfence(&reply.text));
                output.files.push(GeneratedFile::new(*path, content));
            }
            Err(e) => {
                warn!("Could not generate {}: {}", path, e);
                output.warnings.push(format!("Could not generate {}: {}", path, e));
            }
        }
    }

    output
}

/// The template-only fallback project.
pub fn chunked_generate(request: &GenerationRequest, model: &RequirementModel) -> CoreResult<Vec<GeneratedFile>> {
    info!("Chunked generation for {}", request.slug());
    Ok(forge_templates::chunked_project(request, model)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use forge_oracle::ScriptedOracle;
    use forge_spec::{KeywordClassifier, RequirementClassifier, TargetType};

    fn inputs() -> (GenerationRequest, RequirementModel) {
        let request = GenerationRequest::new("echo", "An agent that echoes messages", TargetType::Agent);
        let model = KeywordClassifier::new().parse(&request.description);
        (request, model)
    }

    #[test]
    fn test_unfence() {
        assert_eq!(unfence("```json\n{\"a\": 1}\n```"), "{\"a\": 1}\n");
        assert_eq!(unfence("plain text  \n"), "plain text\n");
    }

    #[tokio::test]
    async fn test_one_call_per_essential_file() {
        let (request, model) = inputs();
        let oracle = ScriptedOracle::new()
            .route("Write `package.json`", "```json\n{\"name\": \"echo\"}\n```")
            .route("Write `src/index.ts`", "### FILE: src/index.ts\n```ts\nexport const echo = (s: string) => s;\n```\n")
            .reply("content");

        let output = degraded_generate(&oracle, &request, &model, Duration::from_secs(5)).await;

        assert_eq!(oracle.call_count(), ESSENTIAL_FILES.len());
        assert_eq!(output.files.len(), ESSENTIAL_FILES.len());
        assert_eq!(output.files[0].content, "{\"name\": \"echo\"}\n");
        assert!(output.files[1].content.contains("export const echo"));
        assert_eq!(output.warnings, vec![UNVERIFIED_WARNING.to_string()]);
    }

    #[tokio::test]
    async fn test_failed_files_become_warnings() {
        let (request, model) = inputs();
        let oracle = ScriptedOracle::new()
            .route_failure("Write `README.md`", "overloaded")
            .reply("");

        let output = degraded_generate(&oracle, &request, &model, Duration::from_secs(5)).await;

        assert!(output.files.is_empty());
        assert_eq!(output.warnings.len(), ESSENTIAL_FILES.len() + 1);
        assert!(output.warnings.iter().any(|w| w.contains("README.md") && w.contains("overloaded")));
    }

    #[test]
    fn test_chunked_has_manifest_and_entry_point() {
        let (request, model) = inputs();
        let files = chunked_generate(&request, &model).unwrap();
        assert!(files.iter().any(|f| f.path == "package.json"));
        assert!(files.iter().any(|f| f.path == "src/index.ts"));
        assert!(files.iter().any(|f| f.path == "Dockerfile"));
    }
}
