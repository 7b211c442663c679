//! Generate command - Run the pipeline and write the project to disk.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use tracing::info;

use forge_core::{materialize, GenerationOrchestrator};
use forge_spec::{GenerationRequest, KeywordClassifier, RequirementClassifier, TargetType};

use super::{absolute, build_oracle, build_sandbox, load_config, OutputFormat, SandboxKind};

#[derive(Args)]
pub struct GenerateArgs {
    /// What the project should do
    #[arg(short, long, required_unless_present = "request")]
    description: Option<String>,

    /// Project name (derived from the description when omitted)
    #[arg(short, long)]
    name: Option<String>,

    /// Target type: plugin, agent, workflow, integration, full-stack
    #[arg(short, long)]
    target: Option<TargetType>,

    /// Additional requirement (repeatable)
    #[arg(short, long = "requirement")]
    requirements: Vec<String>,

    /// External API the project must call (repeatable)
    #[arg(long = "api")]
    apis: Vec<String>,

    /// Test scenario (repeatable)
    #[arg(long = "scenario")]
    scenarios: Vec<String>,

    /// Load the whole request from a JSON file
    #[arg(long, conflicts_with = "description")]
    request: Option<PathBuf>,

    /// Config file (defaults to ./forge.yaml when present)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Execution sandbox
    #[arg(short, long, value_enum, default_value = "local")]
    sandbox: SandboxKind,

    /// Override the iteration budget
    #[arg(long)]
    max_iterations: Option<u32>,

    /// Output directory (defaults to ./<project-slug>)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Write into an existing output directory
    #[arg(long)]
    force: bool,

    /// Output format
    #[arg(long, value_enum, default_value = "text")]
    format: OutputFormat,
}

fn build_request(args: &GenerateArgs) -> Result<GenerationRequest> {
    let request = match (&args.request, &args.description) {
        (Some(path), _) => GenerationRequest::from_json_file(path)
            .with_context(|| format!("Failed to load request from {}", path.display()))?,
        (None, Some(description)) => {
            let model = KeywordClassifier::new().parse(description);
            let name = args.name.clone().unwrap_or(model.name);
            let target = args.target.unwrap_or(model.target_type);

            let mut request = GenerationRequest::new(name, description.clone(), target);
            for requirement in &args.requirements {
                request = request.requirement(requirement);
            }
            for api in &args.apis {
                request = request.external_api(api);
            }
            for scenario in &args.scenarios {
                request = request.test_scenario(scenario);
            }
            request
        }
        (None, None) => anyhow::bail!("Invalid arguments: --description or --request is required"),
    };

    request.validate().context("Invalid request")?;
    Ok(request)
}

pub async fn execute(args: GenerateArgs) -> Result<()> {
    let request = build_request(&args)?;
    info!("Generating project: {} ({})", request.project_name, request.target_type);

    let output_path = absolute(&args.output.clone().unwrap_or_else(|| PathBuf::from(request.slug())))?;
    if output_path.exists() && !args.force {
        anyhow::bail!(
            "Output directory already exists: {} (use --force to write into it)",
            output_path.display()
        );
    }

    let mut config = load_config(args.config.as_deref())?;
    if let Some(iterations) = args.max_iterations {
        config = config.max_iterations(iterations);
    }

    let orchestrator = GenerationOrchestrator::builder()
        .oracle(build_oracle()?)
        .sandbox(build_sandbox(args.sandbox).await)
        .classifier(std::sync::Arc::new(KeywordClassifier::new()))
        .config(config)
        .build()
        .context("Failed to set up the generation pipeline")?;

    let result = orchestrator.generate(request).await?;

    if !result.files.is_empty() {
        let written = materialize(&result.files, &output_path)
            .with_context(|| format!("Failed to write files to {}", output_path.display()))?;
        info!("Wrote {} file(s) to {}", written, output_path.display());
    }

    match args.format {
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(&result).context("Failed to serialize result")?;
            println!("{}", json);
        }
        OutputFormat::Text => {
            println!("{}", result.summary());
            if let Some(validation) = &result.execution_results {
                println!();
                println!("{}", validation.report());
            }
            println!();
            println!("📁 {}", output_path.display());
        }
    }

    if !result.success {
        anyhow::bail!("Generation failed: {}", result.errors.join("; "));
    }
    Ok(())
}
