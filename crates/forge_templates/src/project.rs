//! Project templates per target type.

use std::collections::HashMap;

use forge_spec::{GeneratedFile, GenerationRequest, RequirementModel, TargetType};
use tracing::info;

use crate::content::*;
use crate::error::TemplateResult;
use crate::renderer::{to_camel_case, to_pascal_case, to_snake_case, FileTemplate, TemplateRenderer};

/// The file layout for one target type.
#[derive(Debug, Clone)]
pub struct ProjectTemplate {
    pub target: TargetType,
    pub files: Vec<FileTemplate>,
}

impl ProjectTemplate {
    /// Shared files plus the layout specific to `target`.
    pub fn for_target(target: TargetType) -> Self {
        let mut files = SHARED_FILES.to_vec();
        let specific: &[FileTemplate] = match target {
            TargetType::Plugin => &[
                FileTemplate::new("src/index.ts", PLUGIN_INDEX_TS),
                FileTemplate::new("src/actions/index.ts", PLUGIN_ACTIONS_TS),
                FileTemplate::new("src/providers/index.ts", PLUGIN_PROVIDERS_TS),
                FileTemplate::new("src/services/index.ts", PLUGIN_SERVICES_TS),
                FileTemplate::new("src/evaluators/index.ts", PLUGIN_EVALUATORS_TS),
            ],
            TargetType::Agent => &[
                FileTemplate::new("src/index.ts", AGENT_INDEX_TS),
                FileTemplate::new("src/character.ts", AGENT_CHARACTER_TS),
            ],
            TargetType::Workflow => &[
                FileTemplate::new("src/index.ts", WORKFLOW_INDEX_TS),
                FileTemplate::new("src/steps/index.ts", WORKFLOW_STEPS_TS),
            ],
            TargetType::Integration => &[
                FileTemplate::new("src/index.ts", INTEGRATION_INDEX_TS),
                FileTemplate::new("src/client.ts", INTEGRATION_CLIENT_TS),
            ],
            TargetType::FullStack => &[
                FileTemplate::new("src/index.ts", FULLSTACK_INDEX_TS),
                FileTemplate::new("src/server.ts", FULLSTACK_SERVER_TS),
                FileTemplate::new("src/client/index.ts", FULLSTACK_CLIENT_TS),
            ],
        };
        files.extend_from_slice(specific);

        Self { target, files }
    }

    pub fn paths(&self) -> Vec<&'static str> {
        self.files.iter().map(|f| f.path).collect()
    }
}

/// Template variables derived from a request and its requirement model.
pub fn project_variables(request: &GenerationRequest, model: &RequirementModel) -> HashMap<String, String> {
    let name = request.slug();
    let mut vars = HashMap::new();

    vars.insert("name".to_string(), name.clone());
    vars.insert("name_snake".to_string(), to_snake_case(&name));
    vars.insert("name_pascal".to_string(), to_pascal_case(&name));
    vars.insert("name_camel".to_string(), identifier(&to_camel_case(&name)));
    vars.insert("description".to_string(), request.description.clone());
    vars.insert("description_json".to_string(), json_escape(&request.description));
    vars.insert("target".to_string(), request.target_type.to_string());
    vars.insert("dependencies_json".to_string(), "{}".to_string());

    let env_lines: String = model
        .env_vars
        .iter()
        .map(|var| {
            let marker = if var.required { "required" } else { "optional" };
            format!("# {} ({})\n{}=\n", var.description, marker, var.name)
        })
        .collect();
    vars.insert("env_lines".to_string(), env_lines);

    let env_table = if model.env_vars.is_empty() {
        "No environment variables are required.".to_string()
    } else {
        let mut table = String::from("| Variable | Required | Description |\n|----------|----------|-------------|\n");
        for var in &model.env_vars {
            table.push_str(&format!(
                "| `{}` | {} | {} |\n",
                var.name,
                if var.required { "yes" } else { "no" },
                var.description
            ));
        }
        table
    };
    vars.insert("env_table".to_string(), env_table);

    let required: Vec<&str> = model
        .env_vars
        .iter()
        .filter(|v| v.required)
        .map(|v| v.name.as_str())
        .collect();
    vars.insert(
        "required_env_json".to_string(),
        serde_json::to_string(&required).unwrap_or_else(|_| "[]".to_string()),
    );

    vars
}

/// Render the project skeleton for the request's target type.
pub fn scaffold(request: &GenerationRequest, model: &RequirementModel) -> TemplateResult<Vec<GeneratedFile>> {
    request.validate()?;
    let template = ProjectTemplate::for_target(request.target_type);
    let vars = project_variables(request, model);

    let files = TemplateRenderer::new().render_files(&template.files, &vars)?;
    info!(
        "Scaffolded {} files for {} ({})",
        files.len(),
        request.slug(),
        request.target_type
    );
    Ok(files)
}

/// Render the minimal-but-complete project used when the iterative loop
/// cannot run to completion.
///
/// Contains a manifest, an entry point with one stub per action, the
/// environment template, a smoke test, a Dockerfile and a README.
pub fn chunked_project(request: &GenerationRequest, model: &RequirementModel) -> TemplateResult<Vec<GeneratedFile>> {
    let renderer = TemplateRenderer::new();
    let mut vars = project_variables(request, model);

    let mut stubs = String::new();
    let mut names = Vec::new();
    for action in &model.actions {
        let camel = identifier(&to_camel_case(&action.name));
        let mut action_vars = HashMap::new();
        action_vars.insert("action_camel".to_string(), camel.clone());
        action_vars.insert("action_name".to_string(), action.name.clone());
        action_vars.insert("action_description".to_string(), json_escape(&action.description));
        stubs.push_str(&renderer.render_content(ACTION_STUB_TS, &action_vars));
        stubs.push('\n');
        names.push(camel);
    }

    vars.insert("action_stubs".to_string(), stubs);
    vars.insert("action_list".to_string(), names.join(", "));
    vars.insert("action_count".to_string(), names.len().to_string());

    let templates = [
        FileTemplate::new("package.json", PACKAGE_JSON),
        FileTemplate::new("tsconfig.json", TSCONFIG_JSON),
        FileTemplate::new("src/types.ts", TYPES_TS),
        FileTemplate::new("src/index.ts", CHUNKED_INDEX_TS),
        FileTemplate::new(".env.example", ENV_EXAMPLE),
        FileTemplate::new("tests/smoke.test.ts", SMOKE_TEST_TS),
        FileTemplate::new("Dockerfile", DOCKERFILE),
        FileTemplate::new("README.md", README_MD),
    ];

    let files = renderer.render_files(&templates, &vars)?;
    info!("Rendered chunked project for {} ({} files)", request.slug(), files.len());
    Ok(files)
}

/// Escape a value for embedding inside a JSON or TypeScript string literal.
fn json_escape(value: &str) -> String {
    let quoted = serde_json::to_string(value).unwrap_or_default();
    quoted
        .strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .unwrap_or_default()
        .to_string()
}

fn identifier(candidate: &str) -> String {
    match candidate.chars().next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => candidate.to_string(),
        Some(_) => format!("_{}", candidate),
        None => "project".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use forge_spec::{KeywordClassifier, RequirementClassifier};

    fn weather() -> (GenerationRequest, RequirementModel) {
        let request = GenerationRequest::new(
            "weather-plugin",
            "Create a weather plugin using OpenWeatherMap",
            TargetType::Plugin,
        );
        let model = KeywordClassifier::new().parse(&request.description);
        (request, model)
    }

    fn find<'a>(files: &'a [GeneratedFile], path: &str) -> &'a GeneratedFile {
        files
            .iter()
            .find(|f| f.path == path)
            .unwrap_or_else(|| panic!("missing {}", path))
    }

    #[test]
    fn test_target_layouts() {
        let plugin = ProjectTemplate::for_target(TargetType::Plugin).paths();
        assert!(plugin.contains(&"src/actions/index.ts"));
        assert!(plugin.contains(&"src/evaluators/index.ts"));
        assert!(plugin.contains(&"package.json"));

        let agent = ProjectTemplate::for_target(TargetType::Agent).paths();
        assert!(agent.contains(&"src/character.ts"));

        let full_stack = ProjectTemplate::for_target(TargetType::FullStack).paths();
        assert!(full_stack.contains(&"src/server.ts"));
        assert!(full_stack.contains(&"src/client/index.ts"));
    }

    #[test]
    fn test_scaffold_renders_manifest() {
        let (request, model) = weather();
        let files = scaffold(&request, &model).unwrap();

        let manifest: serde_json::Value =
            serde_json::from_str(&find(&files, "package.json").content).unwrap();
        assert_eq!(manifest["name"], "weather-plugin");
        assert_eq!(manifest["scripts"]["typecheck"], "tsc --noEmit");

        let env = &find(&files, ".env.example").content;
        assert!(env.contains("OPENWEATHER_API_KEY="));

        assert!(files.iter().all(|f| !f.content.contains("{{")));
    }

    #[test]
    fn test_scaffold_rejects_invalid_request() {
        let request = GenerationRequest::new("", "", TargetType::Plugin);
        let model = RequirementModel::new("x", "", TargetType::Plugin);
        assert!(scaffold(&request, &model).is_err());
    }

    #[test]
    fn test_chunked_project_contents() {
        let (request, model) = weather();
        let files = chunked_project(&request, &model).unwrap();

        for path in ["package.json", "src/index.ts", ".env.example", "tests/smoke.test.ts", "Dockerfile", "README.md"] {
            find(&files, path);
        }

        let index = &find(&files, "src/index.ts").content;
        assert!(index.contains("name: \"GET_WEATHER\""));
        assert!(index.contains("export const actions: Action[] = [getWeather];"));
        assert!(index.contains("\"OPENWEATHER_API_KEY\""));

        let smoke = &find(&files, "tests/smoke.test.ts").content;
        assert!(smoke.contains("expect(actions.length).toBe(1)"));
    }

    #[test]
    fn test_description_is_escaped() {
        let request = GenerationRequest::new("quotes", "Say \"hello\"\nthen stop", TargetType::Agent);
        let model = RequirementModel::new("quotes", &request.description, TargetType::Agent);
        let files = scaffold(&request, &model).unwrap();

        let manifest: serde_json::Value =
            serde_json::from_str(&find(&files, "package.json").content).unwrap();
        assert_eq!(manifest["description"], "Say \"hello\"\nthen stop");
    }
}
