use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, OnceLock, PoisonError};

use cots_store_api::RemoteFile;
use tracing::trace;

use super::config::EngineConfig;
use crate::systems::index::PartIndex;
use crate::systems::jobs::JobQueue;
use crate::systems::thumbnails::{Lane, ThumbnailCache, ThumbnailJob, thumbnail_path};
use crate::systems::tree::{FolderId, FolderTree, TreeResult};

/// State shared by the builder thread and every consumer handle.
#[derive(Debug)]
pub struct EngineContext {
	config: EngineConfig,
	icons_dir: PathBuf,
	index: Mutex<PartIndex>,
	jobs: JobQueue,
	thumbnails: ThumbnailCache,
	tree: OnceLock<FolderTree>,
	stop: AtomicBool,
	busy: AtomicBool,
	failure: Mutex<Option<String>>,
}

impl EngineContext {
	pub fn new(config: EngineConfig) -> Self {
		Self {
			icons_dir: config.icons_dir(),
			thumbnails: ThumbnailCache::new(config.timing.thumbnails),
			config,
			index: Mutex::new(PartIndex::default()),
			jobs: JobQueue::default(),
			tree: OnceLock::new(),
			stop: AtomicBool::new(false),
			busy: AtomicBool::new(false),
			failure: Mutex::new(None),
		}
	}

	pub fn config(&self) -> &EngineConfig {
		&self.config
	}

	pub fn lock_index(&self) -> MutexGuard<'_, PartIndex> {
		self.index.lock().unwrap_or_else(PoisonError::into_inner)
	}

	pub fn jobs(&self) -> &JobQueue {
		&self.jobs
	}

	pub fn thumbnails(&self) -> &ThumbnailCache {
		&self.thumbnails
	}

	/// The folder tree, once the builder has opened the project.
	pub fn tree(&self) -> Option<&FolderTree> {
		self.tree.get()
	}

	pub(crate) fn install_tree(&self, tree: FolderTree) -> &FolderTree {
		self.tree.get_or_init(|| tree)
	}

	pub fn request_stop(&self) {
		self.stop.store(true, Ordering::Release);
	}

	pub fn stop_requested(&self) -> bool {
		self.stop.load(Ordering::Acquire)
	}

	pub fn set_busy(&self, busy: bool) {
		self.busy.store(busy, Ordering::Release);
	}

	pub fn is_busy(&self) -> bool {
		self.busy.load(Ordering::Acquire)
	}

	pub(crate) fn record_failure(&self, message: String) {
		*self.failure.lock().unwrap_or_else(PoisonError::into_inner) = Some(message);
	}

	pub fn failure(&self) -> Option<String> {
		self.failure
			.lock()
			.unwrap_or_else(PoisonError::into_inner)
			.clone()
	}

	/// Icon location recorded in the index for the part `name` in `path`.
	pub fn icon_for(&self, path: &str, name: &str) -> String {
		thumbnail_path(&self.icons_dir, path, name)
			.to_string_lossy()
			.into_owned()
	}

	/// Refresh the part files of `folder` and queue thumbnails for the ones
	/// whose icon is missing or whose indexed version is out of date.
	pub fn refresh_parts(&self, tree: &FolderTree, folder: FolderId, lane: Lane) -> TreeResult<Vec<RemoteFile>> {
		let files = tree.refresh_files(folder)?;
		let path = tree.path_of(folder)?;

		let wanted: Vec<(&RemoteFile, PathBuf)> = {
			let index = self.lock_index();
			files
				.iter()
				.filter_map(|file| {
					let destination = thumbnail_path(&self.icons_dir, &path, &file.name);
					let outdated = index
						.get(&file.id)
						.is_none_or(|entry| entry.version != file.version);
					(outdated || !destination.exists()).then_some((file, destination))
				})
				.collect()
		};

		for (file, destination) in wanted {
			if self.thumbnails.is_in_flight(&destination) {
				if lane == Lane::Priority && self.thumbnails.promote(&destination) {
					trace!(part = %file.name, path = %path, "viewed folder thumbnail promoted");
				}
				continue;
			}
			let fetch = tree.store().fetch_thumbnail(file);
			let label = format!("{path}{}", file.name);
			trace!(part = %label, ?lane, "queueing thumbnail");
			self.thumbnails
				.enqueue(ThumbnailJob::new(destination, label, fetch), lane);
		}

		Ok(files)
	}
}
