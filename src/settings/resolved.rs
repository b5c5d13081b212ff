use std::path::PathBuf;

use cots_index::EngineConfig;
use cots_store_fs::FsStoreOptions;

/// Application-ready configuration derived from user input, config files and
/// defaults.
#[derive(Debug, Clone)]
pub(crate) struct ResolvedConfig {
	pub source_root: PathBuf,
	pub store: FsStoreOptions,
	pub engine: EngineConfig,
	pub log_file: Option<PathBuf>,
}

impl ResolvedConfig {
	/// Print a human readable summary of the effective configuration.
	pub(crate) fn print_summary(&self) {
		println!("Effective configuration:");
		println!("  Project: {}", self.engine.project);
		println!("  Source root: {}", self.source_root.display());
		println!("  Part extension: .{}", self.engine.part_extension);
		println!(
			"  Thumbnail extension: .{}",
			self.store.thumbnail_extension
		);
		println!("  Include hidden: {}", bool_to_word(self.store.include_hidden));
		println!(
			"  Respect ignore files: {}",
			bool_to_word(self.store.respect_ignore_files)
		);
		println!("  Database: {}", self.engine.database_dir().display());
		println!("  Index file: {}", self.engine.index_file().display());
		println!("  Icons: {}", self.engine.icons_dir().display());
		let timing = &self.engine.timing;
		println!(
			"  Scheduler: step {:?}, idle {:?}, updates every {:?}",
			timing.step_pause, timing.idle_pause, timing.update_interval
		);
		println!("  Thumbnail budget: {:?}", timing.thumbnails.budget);
		match &self.log_file {
			Some(path) => println!("  Log file: {}", path.display()),
			None => println!("  Log file: (stderr only)"),
		}
	}
}

fn bool_to_word(value: bool) -> &'static str {
	if value { "yes" } else { "no" }
}
