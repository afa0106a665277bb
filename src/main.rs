mod cli;
mod settings;
mod workflow;

use anyhow::Result;
use cli::{CliArgs, OutputFormat, parse_cli, print_json, print_plain};
use presearch::logging;
use settings::ResolvedConfig;
use workflow::{SearchWorkflow, SessionScript};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = parse_cli();
    let resolved = settings::load(&cli)?;
    logging::initialize(&resolved.log_level)?;

    if cli.print_config {
        resolved.print_summary();
    }

    run_session(&cli, resolved).await
}

/// Replay the scripted session and print output in the chosen format.
async fn run_session(cli: &CliArgs, settings: ResolvedConfig) -> Result<()> {
    let format: OutputFormat = cli.output;
    let workflow = SearchWorkflow::from_config(settings, SessionScript::from_cli(cli))?;
    let outcome = workflow.run().await?;

    match format {
        OutputFormat::Plain => print_plain(&outcome),
        OutputFormat::Json => print_json(&outcome)?,
    }

    Ok(())
}
