//! Tracing setup for the `cots-index` binary and embedders.
//!
//! Events go to stderr and, when a log file is configured, are appended to
//! that file without ANSI colours. `RUST_LOG` overrides the default filter.

use std::fs::{self, OpenOptions};
use std::path::Path;
use std::sync::Mutex;

use anyhow::{Context, Result, anyhow};
use tracing_subscriber::{EnvFilter, Layer, layer::SubscriberExt, util::SubscriberInitExt};

const DEFAULT_LOG_FILTER: &str = "cots_index=info,cots_store_fs=info";
const VERBOSE_LOG_FILTER: &str = "cots_index=debug,cots_store_fs=debug";

/// Logging options resolved from the command line and settings.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogOptions<'a> {
	pub verbose: bool,
	pub log_file: Option<&'a Path>,
}

fn filter(verbose: bool) -> EnvFilter {
	EnvFilter::try_from_default_env().unwrap_or_else(|_| {
		EnvFilter::new(if verbose {
			VERBOSE_LOG_FILTER
		} else {
			DEFAULT_LOG_FILTER
		})
	})
}

/// Install the global subscriber. Fails if one is already installed.
pub fn initialize(options: LogOptions<'_>) -> Result<()> {
	let file_layer = match options.log_file {
		Some(path) => {
			if let Some(parent) = path.parent() {
				fs::create_dir_all(parent)
					.with_context(|| format!("failed to create log directory: {}", parent.display()))?;
			}
			let file = OpenOptions::new()
				.create(true)
				.append(true)
				.open(path)
				.with_context(|| format!("failed to open log file: {}", path.display()))?;
			Some(
				tracing_subscriber::fmt::layer()
					.with_writer(Mutex::new(file))
					.with_ansi(false)
					.with_filter(filter(options.verbose)),
			)
		}
		None => None,
	};

	tracing_subscriber::registry()
		.with(file_layer)
		.with(
			tracing_subscriber::fmt::layer()
				.with_writer(std::io::stderr)
				.with_filter(filter(options.verbose)),
		)
		.try_init()
		.map_err(|err| anyhow!("failed to install log subscriber: {err}"))
}
