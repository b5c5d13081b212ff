use std::fmt::Write;
use std::path::PathBuf;

use clap::{
	ArgAction, ColorChoice, CommandFactory, FromArgMatches, Parser, Subcommand, ValueEnum,
	builder::{
		BoolishValueParser, Styles,
		styling::{AnsiColor, Effects},
	},
};
use cots_index::app_dirs;

/// Produce the full version banner including config and data directories.
fn long_version() -> &'static str {
	let describe = |dir: anyhow::Result<PathBuf>| match dir {
		Ok(path) => path.display().to_string(),
		Err(err) => format!("unavailable ({err})"),
	};

	let mut details = format!("cots-index {}", env!("CARGO_PKG_VERSION"));
	let _ = writeln!(details);
	let _ = writeln!(details, "config directory: {}", describe(app_dirs::get_config_dir()));
	let _ = writeln!(details, "data directory: {}", describe(app_dirs::get_data_dir()));
	let _ = writeln!(details, "cache directory: {}", describe(app_dirs::get_cache_dir()));

	Box::leak(details.into_boxed_str())
}

/// Create the clap styles used for custom colour output.
fn cli_styles() -> Styles {
	Styles::styled()
		.header(AnsiColor::Green.on_default().effects(Effects::BOLD))
		.usage(AnsiColor::Green.on_default().effects(Effects::BOLD))
		.literal(AnsiColor::Cyan.on_default())
		.placeholder(AnsiColor::Yellow.on_default())
}

/// Parse command line arguments into the strongly typed [`CliArgs`] structure.
pub(crate) fn parse_cli() -> CliArgs {
	let mut matches = CliArgs::command().get_matches();
	CliArgs::from_arg_matches_mut(&mut matches).unwrap_or_else(|err| err.exit())
}

#[derive(Parser, Debug)]
#[command(
	name = "cots-index",
	version,
	long_version = long_version(),
	about = "Index and browse a library of COTS part files",
	color = ColorChoice::Auto,
	styles = cli_styles()
)]
/// Command-line arguments accepted by the `cots-index` binary.
pub(crate) struct CliArgs {
	#[arg(
		short,
		long = "config",
		value_name = "FILE",
		env = "COTS_CONFIG",
		action = ArgAction::Append,
		global = true,
		help = "Additional configuration file to merge (default: none)"
	)]
	pub(crate) config: Vec<PathBuf>,
	#[arg(
		short = 'n',
		long = "no-config",
		global = true,
		help = "Skip loading default configuration files (default: disabled)"
	)]
	pub(crate) no_config: bool,
	#[arg(
		short = 'P',
		long,
		value_name = "NAME",
		global = true,
		help = "Name of the project to index (default: FRC_COTS)"
	)]
	pub(crate) project: Option<String>,
	#[arg(
		short = 'r',
		long = "source-root",
		value_name = "PATH",
		global = true,
		help = "Directory holding the projects (default: current directory)"
	)]
	pub(crate) source_root: Option<PathBuf>,
	#[arg(
		long = "storage-root",
		value_name = "PATH",
		global = true,
		help = "Existing directory that receives the database folder (default: home directory)"
	)]
	pub(crate) storage_root: Option<PathBuf>,
	#[arg(
		long = "storage-folder",
		value_name = "NAME",
		global = true,
		help = "Name of the database folder (default: FRC-COTS_db)"
	)]
	pub(crate) storage_folder: Option<String>,
	#[arg(
		long = "extension",
		value_name = "EXT",
		global = true,
		help = "Extension of the files that count as parts (default: f3d)"
	)]
	pub(crate) extension: Option<String>,
	#[arg(
		short = 'H',
		long = "hidden",
		value_parser = BoolishValueParser::new(),
		global = true,
		help = "Include hidden folders and files (default: disabled)"
	)]
	pub(crate) hidden: Option<bool>,
	#[arg(
		long = "respect-ignore-files",
		value_parser = BoolishValueParser::new(),
		global = true,
		help = "Respect .ignore and .gitignore files (default: enabled)"
	)]
	pub(crate) respect_ignore_files: Option<bool>,
	#[arg(
		long = "log-file",
		value_name = "FILE",
		global = true,
		help = "Append log output to a file (default: none)"
	)]
	pub(crate) log_file: Option<PathBuf>,
	#[arg(
		short = 'v',
		long,
		global = true,
		help = "Log debug details to stderr (default: disabled)"
	)]
	pub(crate) verbose: bool,
	#[arg(
		short = 'p',
		long = "print-config",
		global = true,
		help = "Print the resolved configuration before running (default: disabled)"
	)]
	pub(crate) print_config: bool,
	#[arg(
		short = 'o',
		long = "output",
		value_enum,
		default_value_t = OutputFormat::Plain,
		global = true,
		help = "Choose how to print the result"
	)]
	pub(crate) output: OutputFormat,
	#[command(subcommand)]
	pub(crate) action: Action,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub(crate) enum Action {
	/// Bring the index up to date with the project and print a summary.
	Sync {
		/// Crawl every folder even if the stored index is complete.
		#[arg(long)]
		full: bool,
		/// Give up after this many seconds.
		#[arg(long, value_name = "SECS", default_value_t = 600)]
		timeout: u64,
	},
	/// Print the stored index without contacting the project.
	List {
		/// Only show entries at or below this folder.
		#[arg(long, value_name = "PATH")]
		folder: Option<String>,
		/// Include the markers of empty folders.
		#[arg(long)]
		placeholders: bool,
	},
	/// Fuzzy search part names in the stored index.
	Find {
		query: String,
		#[arg(short = 'l', long, value_name = "NUM", default_value_t = 20)]
		limit: usize,
	},
	/// Sync a single folder and print what it contains.
	Browse {
		path: String,
		#[arg(long, value_name = "SECS", default_value_t = 120)]
		timeout: u64,
	},
	/// Look up one part file of a folder in the project.
	Get { path: String, id: String },
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
/// Output formats supported by the CLI utility.
pub(crate) enum OutputFormat {
	Plain,
	Json,
}
