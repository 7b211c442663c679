//! Research command - Research the APIs a description needs and print a PRD.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use tracing::{info, warn};

use forge_core::{compose_prd, research_apis, research_targets};
use forge_spec::{KeywordClassifier, RequirementClassifier};

use super::{build_oracle, load_config};

#[derive(Args)]
pub struct ResearchArgs {
    /// Free-text description of the project
    description: String,

    /// Additional API to research (repeatable)
    #[arg(long = "api")]
    apis: Vec<String>,

    /// Config file (defaults to ./forge.yaml when present)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Write the PRD to a file instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,
}

pub async fn execute(args: ResearchArgs) -> Result<()> {
    let config = load_config(args.config.as_deref())?;
    let oracle = build_oracle()?;

    let model = KeywordClassifier::new().parse(&args.description);
    let mut request = model.to_request();
    for api in &args.apis {
        request = request.external_api(api);
    }

    let targets = research_targets(&request, &model);
    if targets.is_empty() {
        info!("No external APIs detected; composing PRD from the description only");
    }
    let report = research_apis(oracle.as_ref(), &targets, config.research_timeout()).await;
    for warning in &report.warnings {
        warn!("{}", warning);
    }

    let prd = compose_prd(&request, &model, &report.findings, &config.gate);
    match &args.output {
        Some(path) => {
            std::fs::write(path, &prd).with_context(|| format!("Failed to write {}", path.display()))?;
            println!("📝 PRD written to {}", path.display());
        }
        None => println!("{}", prd),
    }
    Ok(())
}
