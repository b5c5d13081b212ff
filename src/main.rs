mod cli;
mod settings;
mod workflow;

use anyhow::Result;
use cli::{Action, OutputFormat, parse_cli, print_json, print_plain};
use cots_index::logging::{self, LogOptions};
use settings::ResolvedConfig;
use workflow::Workflow;

fn main() -> Result<()> {
	let cli = parse_cli();
	let resolved = settings::load(&cli)?;

	logging::initialize(LogOptions {
		verbose: cli.verbose,
		log_file: resolved.log_file.as_deref(),
	})?;

	if cli.print_config {
		resolved.print_summary();
	}

	run_action(&cli.action, cli.output, resolved)
}

/// Execute the requested action and print output in the chosen format.
fn run_action(action: &Action, format: OutputFormat, settings: ResolvedConfig) -> Result<()> {
	let outcome = Workflow::from_config(settings).run(action)?;

	match format {
		OutputFormat::Plain => print_plain(&outcome),
		OutputFormat::Json => print_json(&outcome)?,
	}

	Ok(())
}
