//! Classify command - Show the requirement model for a description.

use anyhow::{Context, Result};
use clap::Args;

use forge_spec::{Capability, KeywordClassifier, RequirementClassifier, RequirementModel};

use super::OutputFormat;

#[derive(Args)]
pub struct ClassifyArgs {
    /// Free-text description to classify
    description: String,

    /// Output format
    #[arg(long, value_enum, default_value = "text")]
    format: OutputFormat,
}

pub async fn execute(args: ClassifyArgs) -> Result<()> {
    let model = KeywordClassifier::new().parse(&args.description);

    match args.format {
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(&model).context("Failed to serialize requirement model")?;
            println!("{}", json);
        }
        OutputFormat::Text => println!("{}", render(&model)),
    }
    Ok(())
}

fn render(model: &RequirementModel) -> String {
    let mut out = format!("📋 {}\n", model.name);
    out.push_str(&format!("   Target:     {}\n", model.target_type));
    let budget = model.complexity.budget();
    out.push_str(&format!(
        "   Complexity: {} (~{} min, oracle timeout {}s)\n",
        model.complexity, budget.estimated_minutes, budget.oracle_timeout_secs
    ));

    section(&mut out, "Actions", &model.actions);
    section(&mut out, "Providers", &model.providers);
    section(&mut out, "Services", &model.services);
    section(&mut out, "Evaluators", &model.evaluators);

    if !model.api_integrations.is_empty() {
        out.push_str("\nAPI integrations:\n");
        for api in &model.api_integrations {
            out.push_str(&format!("   - {} ({}, auth: {})\n", api.name, api.base_url, api.auth_type));
        }
    }

    if !model.env_vars.is_empty() {
        out.push_str("\nEnvironment variables:\n");
        for var in &model.env_vars {
            let mut flags = Vec::new();
            if var.required {
                flags.push("required");
            }
            if var.sensitive {
                flags.push("secret");
            }
            let flags = if flags.is_empty() {
                String::new()
            } else {
                format!(" [{}]", flags.join(", "))
            };
            out.push_str(&format!("   - {}{}: {}\n", var.name, flags, var.description));
        }
    }

    out.trim_end().to_string()
}

fn section(out: &mut String, title: &str, list: &[Capability]) {
    if list.is_empty() {
        return;
    }
    out.push_str(&format!("\n{}:\n", title));
    for capability in list {
        out.push_str(&format!("   - {}: {}\n", capability.name, capability.description));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_weather_plugin() {
        let model = KeywordClassifier::new().parse("Create a weather plugin using OpenWeatherMap");
        let text = render(&model);

        assert!(text.starts_with("📋 weather-plugin"));
        assert!(text.contains("GET_WEATHER"));
        assert!(text.contains("OPENWEATHER_API_KEY [required, secret]"));
        assert!(text.contains("OpenWeatherMap (https://api.openweathermap.org/data/2.5, auth: api_key)"));
    }
}
