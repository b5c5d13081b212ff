use std::path::PathBuf;
use std::time::Duration;

use crate::systems::thumbnails::ServiceBudget;

pub const INDEX_FILE_NAME: &str = "parts_db.json";
pub const ICONS_DIR_NAME: &str = "icons";
pub const DEFAULT_PROJECT: &str = "FRC_COTS";
pub const DEFAULT_STORAGE_FOLDER: &str = "FRC-COTS_db";
pub const DEFAULT_PART_EXTENSION: &str = "f3d";
pub const DEFAULT_SIGNAL_CAPACITY: usize = 256;

/// Pacing of the index builder loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchedulerTiming {
	/// Pause after every job step.
	pub step_pause: Duration,
	/// Pause when there is nothing to do.
	pub idle_pause: Duration,
	/// Minimum spacing of "syncing" status updates.
	pub busy_interval: Duration,
	/// Minimum spacing of update notifications after the first job.
	pub update_interval: Duration,
	/// Budget and poll interval of each thumbnail service call.
	pub thumbnails: ServiceBudget,
}

impl Default for SchedulerTiming {
	fn default() -> Self {
		Self {
			step_pause: Duration::from_millis(5),
			idle_pause: Duration::from_millis(100),
			busy_interval: Duration::from_millis(500),
			update_interval: Duration::from_secs(1),
			thumbnails: ServiceBudget::default(),
		}
	}
}

/// Everything the engine needs to index one project.
#[derive(Debug, Clone)]
pub struct EngineConfig {
	/// Name of the project to open through the store provider.
	pub project: String,
	/// Existing directory under which the database folder is created.
	pub storage_root: PathBuf,
	/// Name of the database folder below `storage_root`.
	pub storage_folder: String,
	/// Extension, without dot, of the files that count as parts.
	pub part_extension: String,
	/// Crawl the whole project even if the stored index is complete.
	pub force_full: bool,
	pub timing: SchedulerTiming,
	/// Capacity of the signal channel to the consumer.
	pub signal_capacity: usize,
}

impl EngineConfig {
	pub fn new(project: impl Into<String>, storage_root: impl Into<PathBuf>) -> Self {
		Self {
			project: project.into(),
			storage_root: storage_root.into(),
			storage_folder: DEFAULT_STORAGE_FOLDER.to_string(),
			part_extension: DEFAULT_PART_EXTENSION.to_string(),
			force_full: false,
			timing: SchedulerTiming::default(),
			signal_capacity: DEFAULT_SIGNAL_CAPACITY,
		}
	}

	#[must_use]
	pub fn database_dir(&self) -> PathBuf {
		self.storage_root.join(&self.storage_folder)
	}

	#[must_use]
	pub fn index_file(&self) -> PathBuf {
		self.database_dir().join(INDEX_FILE_NAME)
	}

	#[must_use]
	pub fn icons_dir(&self) -> PathBuf {
		self.database_dir().join(ICONS_DIR_NAME)
	}
}

#[cfg(test)]
mod tests {
	use std::path::Path;

	use super::*;

	#[test]
	fn storage_layout_hangs_off_the_root() {
		let config = EngineConfig::new("FRC_COTS", "/home/me");
		assert_eq!(config.database_dir(), Path::new("/home/me/FRC-COTS_db"));
		assert_eq!(config.index_file(), Path::new("/home/me/FRC-COTS_db/parts_db.json"));
		assert_eq!(config.icons_dir(), Path::new("/home/me/FRC-COTS_db/icons"));
	}
}
