//! Thread-safe handle the consumer uses to query and steer the indexer.

use std::sync::Arc;
use std::thread::JoinHandle;

use anyhow::{Result, anyhow};
use cots_store_api::{RemoteFile, StoreProvider};
use thiserror::Error;
use tracing::{debug, warn};

use super::builder::{self, EngineConfig, EngineContext, SignalReceiver, Signals};
use super::index::{PartIndex, PartListing, PartRecord, sort_listing};
use super::jobs::FolderSyncJob;
use super::thumbnails::Lane;
use super::tree::{FolderTree, TreeError};

#[derive(Debug, Error)]
pub enum LibraryError {
	#[error("the project has not been opened yet")]
	NotReady,
	#[error(transparent)]
	Remote(#[from] TreeError),
}

/// Cloneable query surface over a running indexer.
#[derive(Debug, Clone)]
pub struct PartsQuery {
	cx: Arc<EngineContext>,
}

impl PartsQuery {
	fn tree(&self) -> Result<&FolderTree, LibraryError> {
		self.cx.tree().ok_or(LibraryError::NotReady)
	}

	/// Every indexed entry sorted by location. Empty until the index has
	/// been loaded.
	#[must_use]
	pub fn sorted_parts(&self) -> Vec<PartListing> {
		let mut rows = self.cx.lock_index().listing();
		sort_listing(&mut rows);
		rows
	}

	#[must_use]
	pub fn part(&self, id: &str) -> Option<PartRecord> {
		self.cx.lock_index().get(id).cloned()
	}

	/// Copy of the whole index.
	#[must_use]
	pub fn snapshot(&self) -> PartIndex {
		self.cx.lock_index().clone()
	}

	/// Look up file `id` in the folder at `path`, fetching the folder from
	/// the store when it is not cached. Returns `None` when either is absent.
	///
	/// Blocks on remote I/O when the answer is not cached.
	pub fn data_file(&self, path: &str, id: &str) -> Result<Option<RemoteFile>, LibraryError> {
		let tree = self.tree()?;
		if let Some(file) = tree.cached_file(path, id) {
			return Ok(Some(file));
		}

		let folder = match tree.resolve(path) {
			Ok(folder) => folder,
			Err(err) if err.is_not_found() => {
				debug!(path, error = %err, "data file folder not found");
				return Ok(None);
			}
			Err(err) => return Err(err.into()),
		};
		let files = match self.cx.refresh_parts(tree, folder, Lane::Priority) {
			Ok(files) => files,
			Err(err) if err.is_not_found() => return Ok(None),
			Err(err) => return Err(err.into()),
		};
		Ok(files.into_iter().find(|file| file.id == id))
	}

	/// Queue a priority sync of the folder at `path`. Returns `false` when
	/// the folder does not exist.
	pub fn load_folder(&self, path: &str) -> Result<bool, LibraryError> {
		let tree = self.tree()?;
		let folder = match tree.resolve(path) {
			Ok(folder) => folder,
			Err(err) if err.is_not_found() => {
				warn!(path, "requested folder does not exist");
				return Ok(false);
			}
			Err(err) => return Err(err.into()),
		};
		let resolved = tree.path_of(folder)?;
		debug!(path = %resolved, "queueing viewed folder");
		self.cx.jobs().push_front(FolderSyncJob::viewed(folder, resolved));
		Ok(true)
	}

	/// Whether the initial crawl is still on its first job.
	#[must_use]
	pub fn is_busy(&self) -> bool {
		self.cx.is_busy()
	}

	/// Whether a full crawl has completed at least once.
	#[must_use]
	pub fn is_built(&self) -> bool {
		self.cx.lock_index().is_built()
	}

	/// Ask the builder thread to flush and exit.
	pub fn stop(&self) {
		self.cx.request_stop();
	}
}

/// Owner of the builder thread. Dropping it stops and joins the thread.
#[derive(Debug)]
pub struct PartsLibrary {
	query: PartsQuery,
	worker: Option<JoinHandle<()>>,
}

impl PartsLibrary {
	/// Start indexing `config.project` as served by `provider`.
	pub fn spawn(config: EngineConfig, provider: Arc<dyn StoreProvider>) -> Result<(Self, SignalReceiver)> {
		let (sender, receiver) = cots_stream::bridge(config.signal_capacity);
		let cx = Arc::new(EngineContext::new(config));
		let worker = builder::spawn(Arc::clone(&cx), provider, Signals::new(sender))?;
		let library = Self {
			query: PartsQuery { cx },
			worker: Some(worker),
		};
		Ok((library, receiver))
	}

	/// Handle usable from other threads.
	#[must_use]
	pub fn query(&self) -> PartsQuery {
		self.query.clone()
	}

	#[must_use]
	pub fn sorted_parts(&self) -> Vec<PartListing> {
		self.query.sorted_parts()
	}

	#[must_use]
	pub fn part(&self, id: &str) -> Option<PartRecord> {
		self.query.part(id)
	}

	pub fn data_file(&self, path: &str, id: &str) -> Result<Option<RemoteFile>, LibraryError> {
		self.query.data_file(path, id)
	}

	pub fn load_folder(&self, path: &str) -> Result<bool, LibraryError> {
		self.query.load_folder(path)
	}

	#[must_use]
	pub fn is_busy(&self) -> bool {
		self.query.is_busy()
	}

	#[must_use]
	pub fn is_built(&self) -> bool {
		self.query.is_built()
	}

	pub fn stop(&self) {
		self.query.stop();
	}

	/// Stop the builder, wait for its final flush and report whether it
	/// failed.
	pub fn join(mut self) -> Result<()> {
		self.shutdown();
		match self.query.cx.failure() {
			Some(message) => Err(anyhow!(message)),
			None => Ok(()),
		}
	}

	fn shutdown(&mut self) {
		self.query.stop();
		if let Some(worker) = self.worker.take() {
			if worker.join().is_err() {
				warn!("index builder thread panicked outside its guard");
			}
		}
	}
}

impl Drop for PartsLibrary {
	fn drop(&mut self) {
		self.shutdown();
	}
}
