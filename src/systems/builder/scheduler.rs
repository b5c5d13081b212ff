use std::fs;
use std::thread;
use std::time::Instant;

use anyhow::{Context, Result, ensure};
use cots_store_api::StoreProvider;
use tracing::{debug, info, warn};

use super::context::EngineContext;
use super::signal::{STATUS_IDLE, Signal, Signals};
use crate::systems::index::{IndexFile, LoadOutcome};
use crate::systems::jobs::FolderSyncJob;
use crate::systems::tree::path::ROOT_PATH;
use crate::systems::tree::{FolderTree, ROOT_ID};

const FRAMES: [char; 4] = ['|', '/', '-', '\\'];

/// Open the project and drive the job queue until a stop is requested.
pub(crate) fn run(cx: &EngineContext, provider: &dyn StoreProvider, signals: &Signals) -> Result<()> {
	let tree = startup(cx, provider, signals)?;
	Scheduler::new(cx, tree, signals).run();
	Ok(())
}

fn startup<'cx>(
	cx: &'cx EngineContext,
	provider: &dyn StoreProvider,
	signals: &Signals,
) -> Result<&'cx FolderTree> {
	let config = cx.config();
	ensure!(
		config.storage_root.is_dir(),
		"storage root {} does not exist",
		config.storage_root.display()
	);
	let icons_dir = config.icons_dir();
	fs::create_dir_all(&icons_dir)
		.with_context(|| format!("failed to create database directory: {}", icons_dir.display()))?;

	let store = provider
		.open_project(&config.project)
		.with_context(|| format!("failed to open project '{}'", config.project))?;
	let project = store.project();
	let tree = FolderTree::new(store, &config.part_extension)
		.with_context(|| format!("failed to read the root of project '{}'", project.name))?;

	let index_file = IndexFile::new(config.index_file());
	let outcome = index_file.load(&project);
	match &outcome {
		LoadOutcome::Loaded(index) => {
			info!(parts = index.len(), built = index.is_built(), "loaded part index");
		}
		LoadOutcome::Missing => info!(path = %index_file.path().display(), "no part index yet"),
		LoadOutcome::Malformed(reason) => {
			warn!(path = %index_file.path().display(), %reason, "discarding unreadable part index");
		}
		LoadOutcome::ProjectMismatch { found } => {
			warn!(found = %found.name, found_id = %found.id, "part index belongs to another project; rebuilding");
		}
	}
	let index = outcome.into_index(&project);
	let full = config.force_full || !index.is_built();
	*cx.lock_index() = index;

	let tree = cx.install_tree(tree);
	let root = if full {
		FolderSyncJob::full(ROOT_ID, ROOT_PATH)
	} else {
		FolderSyncJob::viewed(ROOT_ID, ROOT_PATH)
	};
	info!(project = %project.name, full, "starting index builder");
	cx.jobs().push_back(root);

	cx.set_busy(true);
	signals.emit(Signal::SetBusy(true));
	Ok(tree)
}

struct Scheduler<'a> {
	cx: &'a EngineContext,
	tree: &'a FolderTree,
	signals: &'a Signals,
	index_file: IndexFile,
	current: Option<FolderSyncJob>,
	first_job: bool,
	flushed_revision: u64,
	updated_revision: u64,
	last_update: Instant,
	last_status: Instant,
	frame: usize,
}

impl<'a> Scheduler<'a> {
	fn new(cx: &'a EngineContext, tree: &'a FolderTree, signals: &'a Signals) -> Self {
		let mut scheduler = Self {
			cx,
			tree,
			signals,
			index_file: IndexFile::new(cx.config().index_file()),
			current: None,
			first_job: true,
			flushed_revision: 0,
			updated_revision: 0,
			last_update: Instant::now(),
			last_status: Instant::now(),
			frame: 0,
		};
		scheduler.flush();
		scheduler.update();
		scheduler
	}

	fn run(mut self) {
		while !self.cx.stop_requested() {
			self.turn();
		}
		self.flush();
		info!("index builder stopped");
	}

	fn turn(&mut self) {
		let timing = self.cx.config().timing;

		let serviced = self.cx.thumbnails().service();
		if serviced.priority_completed > 0 {
			self.update();
		}

		match self.current.take() {
			Some(mut job) if !job.is_done() => {
				job.step(self.cx, self.tree);
				thread::sleep(timing.step_pause);
				if self.last_status.elapsed() >= timing.busy_interval {
					self.frame = (self.frame + 1) % FRAMES.len();
					self.signals
						.status(format!("syncing {} {}", job.path(), FRAMES[self.frame]));
					self.last_status = Instant::now();
				}
				self.current = Some(job);
			}
			Some(job) => self.finish(&job),
			None => match self.cx.jobs().pop() {
				Some(job) => self.begin(job),
				None => thread::sleep(timing.idle_pause),
			},
		}
	}

	fn begin(&mut self, job: FolderSyncJob) {
		self.signals.status(format!("syncing {}", job.path()));
		self.last_status = Instant::now();
		self.current = Some(job);
	}

	fn finish(&mut self, job: &FolderSyncJob) {
		debug!(path = job.path(), kind = ?job.kind(), "folder job finished");
		self.flush_if_dirty();

		if self.first_job {
			self.first_job = false;
			self.cx.set_busy(false);
			self.signals.emit(Signal::SetBusy(false));
			self.update_if_changed();
		} else if self.last_update.elapsed() >= self.cx.config().timing.update_interval {
			self.update_if_changed();
		}

		match self.cx.jobs().pop() {
			Some(next) => self.begin(next),
			None => self.settle(),
		}
	}

	/// The queue drained: the index now reflects a complete crawl.
	fn settle(&mut self) {
		self.cx.lock_index().mark_built();
		self.flush_if_dirty();
		self.update_if_changed();
		let parts = self.cx.lock_index().len();
		info!(parts, folders = self.tree.len(), "index up to date");
		self.signals.status(STATUS_IDLE);
	}

	fn revision(&self) -> u64 {
		self.cx.lock_index().revision()
	}

	fn update(&mut self) {
		self.updated_revision = self.revision();
		self.last_update = Instant::now();
		self.signals.emit(Signal::Update);
	}

	fn update_if_changed(&mut self) {
		if self.revision() != self.updated_revision {
			self.update();
		}
	}

	fn flush_if_dirty(&mut self) {
		if self.revision() != self.flushed_revision {
			self.flush();
		}
	}

	/// Write the index to disk. The document is copied under the lock and
	/// written after releasing it; a failed write is retried at the next
	/// flush while the in-memory index stays authoritative.
	fn flush(&mut self) {
		let (document, revision) = {
			let index = self.cx.lock_index();
			(index.to_document(), index.revision())
		};
		match self.index_file.save(&document) {
			Ok(()) => {
				debug!(parts = document.parts.len(), "flushed part index");
				self.flushed_revision = revision;
			}
			Err(err) => warn!(error = ?err, "failed to write part index"),
		}
	}
}
