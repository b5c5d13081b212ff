use std::env;
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result, ensure};
use serde::Deserialize;

use cots_index::{
	DEFAULT_PART_EXTENSION, DEFAULT_PROJECT, DEFAULT_STORAGE_FOLDER, EngineConfig, SchedulerTiming,
	ServiceBudget, app_dirs,
};
use cots_store_fs::FsStoreOptions;

use crate::cli::CliArgs;

use super::resolved::ResolvedConfig;
use super::util::{expand_home, sanitize_extension};

const LOG_FILE_NAME: &str = "cots-index.log";

/// Mirror of the configuration file representation before CLI overrides and
/// validation are applied.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub(super) struct RawConfig {
	source: SourceSection,
	storage: StorageSection,
	scheduler: SchedulerSection,
	logging: LoggingSection,
}

/// Where the projects live and which files count as parts.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
struct SourceSection {
	project: Option<String>,
	root: Option<PathBuf>,
	extension: Option<String>,
	include_hidden: Option<bool>,
	respect_ignore_files: Option<bool>,
	thumbnail_extension: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
struct StorageSection {
	root: Option<PathBuf>,
	folder: Option<String>,
}

/// Scheduler pacing, all in milliseconds.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
struct SchedulerSection {
	step_pause_ms: Option<u64>,
	idle_pause_ms: Option<u64>,
	busy_interval_ms: Option<u64>,
	update_interval_ms: Option<u64>,
	thumbnail_budget_ms: Option<u64>,
	thumbnail_poll_ms: Option<u64>,
	signal_capacity: Option<usize>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
struct LoggingSection {
	file: Option<PathBuf>,
	to_file: Option<bool>,
}

fn millis_or(value: Option<u64>, default: Duration) -> Duration {
	value.map(Duration::from_millis).unwrap_or(default)
}

impl SchedulerSection {
	fn timing(&self) -> SchedulerTiming {
		let defaults = SchedulerTiming::default();
		SchedulerTiming {
			step_pause: millis_or(self.step_pause_ms, defaults.step_pause),
			idle_pause: millis_or(self.idle_pause_ms, defaults.idle_pause),
			busy_interval: millis_or(self.busy_interval_ms, defaults.busy_interval),
			update_interval: millis_or(self.update_interval_ms, defaults.update_interval),
			thumbnails: ServiceBudget {
				budget: millis_or(self.thumbnail_budget_ms, defaults.thumbnails.budget),
				poll_interval: millis_or(self.thumbnail_poll_ms, defaults.thumbnails.poll_interval),
			},
		}
	}
}

impl RawConfig {
	/// Apply CLI overrides on top of the raw configuration values.
	pub(super) fn apply_cli_overrides(&mut self, cli: &CliArgs) {
		if let Some(project) = cli.project.clone() {
			self.source.project = Some(project);
		}
		if let Some(root) = cli.source_root.clone() {
			self.source.root = Some(root);
		}
		if let Some(extension) = cli.extension.clone() {
			self.source.extension = Some(extension);
		}
		if let Some(value) = cli.hidden {
			self.source.include_hidden = Some(value);
		}
		if let Some(value) = cli.respect_ignore_files {
			self.source.respect_ignore_files = Some(value);
		}
		if let Some(root) = cli.storage_root.clone() {
			self.storage.root = Some(root);
		}
		if let Some(folder) = cli.storage_folder.clone() {
			self.storage.folder = Some(folder);
		}
		if let Some(file) = cli.log_file.clone() {
			self.logging.file = Some(file);
		}
	}

	/// Convert the raw configuration into a [`ResolvedConfig`], validating and
	/// filling defaults where required.
	pub(super) fn resolve(self) -> Result<ResolvedConfig> {
		let current_dir = env::current_dir().context("failed to determine working directory")?;

		let mut source_root = match self.source.root {
			Some(path) => expand_home(path)?,
			None => current_dir.clone(),
		};
		if source_root.is_relative() {
			source_root = current_dir.join(source_root);
		}
		source_root = fs::canonicalize(&source_root).with_context(|| {
			format!("failed to canonicalize source root {}", source_root.display())
		})?;
		ensure!(source_root.is_dir(), "source root must be a directory");

		let mut storage_root = match self.storage.root {
			Some(path) => expand_home(path)?,
			None => app_dirs::get_home_dir()?,
		};
		if storage_root.is_relative() {
			storage_root = current_dir.join(storage_root);
		}
		ensure!(
			storage_root.is_dir(),
			"storage root {} must be an existing directory",
			storage_root.display()
		);

		let project = self
			.source
			.project
			.map(|name| name.trim().to_string())
			.filter(|name| !name.is_empty())
			.unwrap_or_else(|| DEFAULT_PROJECT.to_string());
		let storage_folder = self
			.storage
			.folder
			.map(|name| name.trim().to_string())
			.filter(|name| !name.is_empty())
			.unwrap_or_else(|| DEFAULT_STORAGE_FOLDER.to_string());
		ensure!(
			!storage_folder.contains(['/', '\\']),
			"storage folder must be a single directory name"
		);
		let part_extension = self
			.source
			.extension
			.map(|ext| sanitize_extension(&ext))
			.filter(|ext| !ext.is_empty())
			.unwrap_or_else(|| DEFAULT_PART_EXTENSION.to_string());

		let mut engine = EngineConfig::new(project, storage_root);
		engine.storage_folder = storage_folder;
		engine.part_extension = part_extension;
		engine.timing = self.scheduler.timing();
		if let Some(capacity) = self.scheduler.signal_capacity {
			ensure!(capacity > 0, "scheduler.signal_capacity must be positive");
			engine.signal_capacity = capacity;
		}

		let mut store = FsStoreOptions::default();
		if let Some(value) = self.source.include_hidden {
			store.include_hidden = value;
		}
		if let Some(value) = self.source.respect_ignore_files {
			store.respect_ignore_files = value;
		}
		if let Some(ext) = self.source.thumbnail_extension.map(|ext| sanitize_extension(&ext)) {
			ensure!(!ext.is_empty(), "source.thumbnail_extension must not be empty");
			store.thumbnail_extension = ext;
		}

		let log_file = match self.logging.file {
			Some(path) => Some(expand_home(path)?),
			None if self.logging.to_file.unwrap_or(false) => {
				Some(app_dirs::get_data_dir()?.join(LOG_FILE_NAME))
			}
			None => None,
		};

		Ok(ResolvedConfig {
			source_root,
			store,
			engine,
			log_file,
		})
	}
}

#[cfg(test)]
mod tests {
	use clap::Parser;

	use super::*;

	#[test]
	fn cli_overrides_take_precedence() {
		let cli = CliArgs::parse_from([
			"cots-index",
			"list",
			"--project",
			"Demo",
			"--source-root",
			"/tmp/projects",
			"--storage-folder",
			"db",
			"--extension",
			"step",
			"--hidden",
			"true",
		]);
		let mut config = RawConfig::default();
		config.source.project = Some("FromFile".into());
		config.apply_cli_overrides(&cli);

		assert_eq!(config.source.project.as_deref(), Some("Demo"));
		assert_eq!(config.source.root, Some(PathBuf::from("/tmp/projects")));
		assert_eq!(config.storage.folder.as_deref(), Some("db"));
		assert_eq!(config.source.extension.as_deref(), Some("step"));
		assert_eq!(config.source.include_hidden, Some(true));
		assert_eq!(config.storage.root, None);
	}

	#[test]
	fn resolve_fills_defaults_and_validates_roots() {
		let temp = tempfile::tempdir().expect("tempdir");
		let mut config = RawConfig::default();
		config.source.root = Some(temp.path().to_path_buf());
		config.storage.root = Some(temp.path().to_path_buf());
		config.source.extension = Some(" .F3D ".into());
		config.scheduler.idle_pause_ms = Some(20);

		let resolved = config.resolve().expect("resolves");
		assert_eq!(resolved.engine.project, DEFAULT_PROJECT);
		assert_eq!(resolved.engine.storage_folder, DEFAULT_STORAGE_FOLDER);
		assert_eq!(resolved.engine.part_extension, "f3d");
		assert_eq!(resolved.engine.timing.idle_pause, Duration::from_millis(20));
		assert_eq!(resolved.engine.timing.step_pause, SchedulerTiming::default().step_pause);
		assert!(resolved.log_file.is_none());
	}

	#[test]
	fn missing_storage_root_is_rejected() {
		let temp = tempfile::tempdir().expect("tempdir");
		let mut config = RawConfig::default();
		config.source.root = Some(temp.path().to_path_buf());
		config.storage.root = Some(temp.path().join("absent"));
		let err = config.resolve().unwrap_err();
		assert!(err.to_string().contains("storage root"));
	}

	#[test]
	fn sections_deserialize_from_toml() {
		let source = config::Config::builder()
			.add_source(config::File::from_str(
				"[source]\nproject = \"FRC_COTS\"\nextension = \"f3d\"\n[scheduler]\nstep_pause_ms = 1\n",
				config::FileFormat::Toml,
			))
			.build()
			.expect("config");
		let raw: RawConfig = source.try_deserialize().expect("deserialize");
		assert_eq!(raw.source.project.as_deref(), Some("FRC_COTS"));
		assert_eq!(raw.scheduler.step_pause_ms, Some(1));
	}
}
