//! Template rendering.

use std::collections::HashMap;

use forge_spec::GeneratedFile;
use regex::Regex;
use tracing::debug;

use crate::error::{TemplateError, TemplateResult};

/// A file in a project template: a path and content, both of which may
/// contain `{{variable}}` placeholders.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileTemplate {
    pub path: &'static str,
    pub content: &'static str,
}

impl FileTemplate {
    pub const fn new(path: &'static str, content: &'static str) -> Self {
        Self { path, content }
    }
}

/// Template renderer substituting `{{variable}}` placeholders.
pub struct TemplateRenderer {
    variable_pattern: Regex,
}

impl Default for TemplateRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl TemplateRenderer {
    /// Create a new template renderer.
    pub fn new() -> Self {
        Self {
            // Match {{variable_name}} pattern
            variable_pattern: Regex::new(r"\{\{([a-zA-Z_][a-zA-Z0-9_]*)\}\}")
                .expect("variable pattern is a valid regex"),
        }
    }

    /// Render content by replacing variables. Unknown variables are left as-is.
    pub fn render_content(&self, content: &str, variables: &HashMap<String, String>) -> String {
        self.variable_pattern
            .replace_all(content, |caps: &regex::Captures| {
                let var_name = &caps[1];
                variables
                    .get(var_name)
                    .cloned()
                    .unwrap_or_else(|| format!("{{{{{}}}}}", var_name))
            })
            .to_string()
    }

    /// Names of variables referenced in `content` but absent from `variables`.
    pub fn missing_variables(&self, content: &str, variables: &HashMap<String, String>) -> Vec<String> {
        let mut missing: Vec<String> = self
            .variable_pattern
            .captures_iter(content)
            .map(|caps| caps[1].to_string())
            .filter(|name| !variables.contains_key(name))
            .collect();
        missing.sort();
        missing.dedup();
        missing
    }

    /// Render a set of file templates.
    ///
    /// Paths must resolve completely; an unresolved variable in a path is an
    /// error since it would leave braces in the file name.
    pub fn render_files(
        &self,
        templates: &[FileTemplate],
        variables: &HashMap<String, String>,
    ) -> TemplateResult<Vec<GeneratedFile>> {
        templates
            .iter()
            .map(|template| {
                if let Some(name) = self.missing_variables(template.path, variables).into_iter().next() {
                    return Err(TemplateError::MissingVariable(name));
                }
                let path = self.render_content(template.path, variables);
                debug!("Rendered: {}", path);
                Ok(GeneratedFile::new(path, self.render_content(template.content, variables)))
            })
            .collect()
    }
}

/// Convert to snake_case.
pub fn to_snake_case(s: &str) -> String {
    let mut result = String::new();
    for (i, c) in s.chars().enumerate() {
        if c.is_uppercase() && i > 0 {
            result.push('_');
        }
        result.push(c.to_lowercase().next().unwrap_or(c));
    }
    result.replace(['-', ' '], "_")
}

/// Convert to PascalCase.
pub fn to_pascal_case(s: &str) -> String {
    s.split(['-', '_', ' '])
        .filter(|part| !part.is_empty())
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                None => String::new(),
                Some(first) => first.to_uppercase().collect::<String>() + &chars.as_str().to_lowercase(),
            }
        })
        .collect()
}

/// Convert to camelCase.
pub fn to_camel_case(s: &str) -> String {
    let pascal = to_pascal_case(s);
    let mut chars = pascal.chars();
    match chars.next() {
        None => String::new(),
        Some(first) => first.to_lowercase().collect::<String>() + chars.as_str(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_render_content() {
        let renderer = TemplateRenderer::new();
        let vars = vars(&[("name", "weather-plugin"), ("version", "1.0.0")]);

        let rendered = renderer.render_content("App: {{name}}, Version: {{version}}", &vars);
        assert_eq!(rendered, "App: weather-plugin, Version: 1.0.0");
    }

    #[test]
    fn test_unknown_variables_left_verbatim() {
        let renderer = TemplateRenderer::new();
        let rendered = renderer.render_content("{{known}} {{unknown}}", &vars(&[("known", "k")]));
        assert_eq!(rendered, "k {{unknown}}");
    }

    #[test]
    fn test_render_files_requires_path_variables() {
        let renderer = TemplateRenderer::new();
        let templates = [FileTemplate::new("src/{{name_snake}}.ts", "export {}")];

        let err = renderer.render_files(&templates, &HashMap::new()).unwrap_err();
        assert!(matches!(err, TemplateError::MissingVariable(name) if name == "name_snake"));

        let files = renderer
            .render_files(&templates, &vars(&[("name_snake", "weather")]))
            .unwrap();
        assert_eq!(files[0].path, "src/weather.ts");
    }

    #[test]
    fn test_case_conversions() {
        assert_eq!(to_snake_case("MyApp"), "my_app");
        assert_eq!(to_snake_case("my-app"), "my_app");
        assert_eq!(to_pascal_case("my-app"), "MyApp");
        assert_eq!(to_pascal_case("my_app"), "MyApp");
        assert_eq!(to_camel_case("GET_WEATHER"), "getWeather");
    }
}
