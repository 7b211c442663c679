//! Forge CLI - Main entry point.
//!
//! Exit codes:
//! - 0: Success
//! - 1: General error
//! - 2: Invalid arguments
//! - 3: Validation failure
//! - 4: Template error
//! - 5: Service unavailable

use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod commands;

use commands::{Cli, Commands};

/// CI-friendly exit codes
pub struct ExitCodes;

impl ExitCodes {
    pub const SUCCESS: u8 = 0;
    pub const GENERAL_ERROR: u8 = 1;
    pub const INVALID_ARGS: u8 = 2;
    pub const VALIDATION_FAILURE: u8 = 3;
    pub const TEMPLATE_ERROR: u8 = 4;
    pub const SERVICE_UNAVAILABLE: u8 = 5;
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet);

    let result = match cli.command {
        Commands::Generate(args) => commands::generate::execute(args).await,
        Commands::Classify(args) => commands::classify::execute(args).await,
        Commands::Validate(args) => commands::validate::execute(args).await,
        Commands::Research(args) => commands::research::execute(args).await,
    };

    match result {
        Ok(()) => ExitCode::from(ExitCodes::SUCCESS),
        Err(e) => {
            let exit_code = categorize_error(&e);
            eprintln!("❌ Error: {:#}", e);
            ExitCode::from(exit_code)
        }
    }
}

/// Logs go to stderr so `--format json` output stays parseable.
fn init_logging(verbose: bool, quiet: bool) {
    let level = if verbose {
        "debug"
    } else if quiet {
        "warn"
    } else {
        "info"
    };

    let mut filter = EnvFilter::from_default_env();
    for directive in [format!("forge={}", level), "warn".to_string()] {
        if let Ok(directive) = directive.parse() {
            filter = filter.add_directive(directive);
        }
    }

    // Already initialized is fine
    let _ = tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(filter)
        .try_init();
}

/// Categorize error to determine exit code
fn categorize_error(e: &anyhow::Error) -> u8 {
    let msg = format!("{:#}", e).to_lowercase();

    if msg.contains("unavailable") || msg.contains("not configured") {
        ExitCodes::SERVICE_UNAVAILABLE
    } else if msg.contains("validation") {
        ExitCodes::VALIDATION_FAILURE
    } else if msg.contains("template") {
        ExitCodes::TEMPLATE_ERROR
    } else if ["argument", "invalid request", "invalid generation request", "missing required field", "unknown target"]
        .iter()
        .any(|needle| msg.contains(needle))
    {
        ExitCodes::INVALID_ARGS
    } else {
        ExitCodes::GENERAL_ERROR
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_categorize_error() {
        let unavailable = anyhow::anyhow!("Service unavailable: no generation oracle configured");
        assert_eq!(categorize_error(&unavailable), ExitCodes::SERVICE_UNAVAILABLE);

        let failed = anyhow::anyhow!("Validation failed: 2 check(s) failed");
        assert_eq!(categorize_error(&failed), ExitCodes::VALIDATION_FAILURE);

        let template = anyhow::anyhow!("Template error: missing variable");
        assert_eq!(categorize_error(&template), ExitCodes::TEMPLATE_ERROR);

        let args = anyhow::anyhow!("Invalid request: description is empty");
        assert_eq!(categorize_error(&args), ExitCodes::INVALID_ARGS);

        let other = anyhow::anyhow!("disk full");
        assert_eq!(categorize_error(&other), ExitCodes::GENERAL_ERROR);
    }

    #[test]
    fn test_context_is_categorized() {
        let inner = anyhow::anyhow!("Oracle not configured: set ANTHROPIC_API_KEY or OPENAI_API_KEY");
        let wrapped = inner.context("Failed to create generation oracle");
        assert_eq!(categorize_error(&wrapped), ExitCodes::SERVICE_UNAVAILABLE);
    }
}
