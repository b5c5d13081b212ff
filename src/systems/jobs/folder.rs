use tracing::{debug, warn};

use crate::systems::builder::EngineContext;
use crate::systems::index::{FolderContents, reconcile};
use crate::systems::thumbnails::Lane;
use crate::systems::tree::{FolderId, FolderTree, RefreshPolicy, TreeResult};

/// Whether a job crawls the whole subtree or only its own folder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobKind {
	/// Recursive crawl; queues a job for every child folder.
	Full,
	/// Single folder a consumer is looking at; thumbnails go to the
	/// priority lane.
	Viewed,
}

/// Position of a job in its state machine. Phases advance strictly in
/// order, one per step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
	ProcessFolders,
	ProcessFiles,
	SyncWithDatabase,
	Done,
}

#[derive(Debug, Clone)]
pub struct FolderSyncJob {
	folder: FolderId,
	path: String,
	kind: JobKind,
	phase: Phase,
}

impl FolderSyncJob {
	pub fn full(folder: FolderId, path: impl Into<String>) -> Self {
		Self::new(folder, path.into(), JobKind::Full)
	}

	pub fn viewed(folder: FolderId, path: impl Into<String>) -> Self {
		Self::new(folder, path.into(), JobKind::Viewed)
	}

	fn new(folder: FolderId, path: String, kind: JobKind) -> Self {
		Self {
			folder,
			path,
			kind,
			phase: Phase::ProcessFolders,
		}
	}

	#[must_use]
	pub fn path(&self) -> &str {
		&self.path
	}

	#[must_use]
	pub fn kind(&self) -> JobKind {
		self.kind
	}

	#[must_use]
	pub fn phase(&self) -> Phase {
		self.phase
	}

	#[must_use]
	pub fn is_done(&self) -> bool {
		self.phase == Phase::Done
	}

	/// Run the current phase and advance. A failed phase ends the job and
	/// leaves the index untouched.
	pub fn step(&mut self, cx: &EngineContext, tree: &FolderTree) {
		let outcome = match self.phase {
			Phase::ProcessFolders => self.process_folders(cx, tree).map(|()| Phase::ProcessFiles),
			Phase::ProcessFiles => self.process_files(cx, tree).map(|()| Phase::SyncWithDatabase),
			Phase::SyncWithDatabase => self.sync_with_database(cx, tree).map(|()| Phase::Done),
			Phase::Done => Ok(Phase::Done),
		};

		self.phase = match outcome {
			Ok(next) => next,
			Err(err) if err.is_not_found() => {
				debug!(path = %self.path, phase = ?self.phase, error = %err, "folder vanished; skipping");
				Phase::Done
			}
			Err(err) => {
				warn!(path = %self.path, phase = ?self.phase, error = %err, "folder sync failed; skipping");
				Phase::Done
			}
		};
	}

	fn process_folders(&self, cx: &EngineContext, tree: &FolderTree) -> TreeResult<()> {
		// The first listing of a record only adds; later visits reload so
		// deletions made on the remote side are noticed.
		let policy = if tree.children_refreshed(self.folder)? {
			RefreshPolicy::Reload
		} else {
			RefreshPolicy::Merge
		};
		let children = tree.refresh_children(self.folder, policy)?;
		if self.kind == JobKind::Full {
			for (child, path) in children {
				cx.jobs().push_back(Self::full(child, path));
			}
		}
		Ok(())
	}

	fn process_files(&self, cx: &EngineContext, tree: &FolderTree) -> TreeResult<()> {
		let lane = match self.kind {
			JobKind::Full => Lane::Background,
			JobKind::Viewed => Lane::Priority,
		};
		cx.refresh_parts(tree, self.folder, lane)?;
		Ok(())
	}

	fn sync_with_database(&self, cx: &EngineContext, tree: &FolderTree) -> TreeResult<()> {
		let snapshot = tree.snapshot(self.folder)?;
		let contents = FolderContents {
			path: &snapshot.path,
			children: &snapshot.children,
			files: &snapshot.files,
		};
		let report = {
			let mut index = cx.lock_index();
			reconcile(&mut index, contents, |path, name| cx.icon_for(path, name))
		};
		if report.changed() {
			debug!(path = %self.path, ?report, "synced folder into index");
		}
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use std::sync::Arc;

	use cots_store_api::RemoteStore;
	use cots_store_api::memory::MemoryStore;

	use super::*;
	use crate::systems::builder::EngineConfig;
	use crate::systems::tree::ROOT_ID;

	struct Fixture {
		_temp: tempfile::TempDir,
		store: Arc<MemoryStore>,
		cx: EngineContext,
		tree: FolderTree,
	}

	fn fixture() -> Fixture {
		let temp = tempfile::tempdir().expect("tempdir");
		let store = Arc::new(MemoryStore::new("P", "1"));
		let cx = EngineContext::new(EngineConfig::new("P", temp.path()));
		let tree = FolderTree::new(Arc::clone(&store) as Arc<dyn RemoteStore>, "f3d").expect("tree");
		Fixture {
			_temp: temp,
			store,
			cx,
			tree,
		}
	}

	fn run(job: &mut FolderSyncJob, fixture: &Fixture) {
		while !job.is_done() {
			job.step(&fixture.cx, &fixture.tree);
		}
	}

	#[test]
	fn phases_advance_one_step_at_a_time() {
		let fixture = fixture();
		fixture.store.add_part("/", "a", "A", 1);
		let mut job = FolderSyncJob::full(ROOT_ID, "/");
		job.step(&fixture.cx, &fixture.tree);
		assert_eq!(job.phase(), Phase::ProcessFiles);
		job.step(&fixture.cx, &fixture.tree);
		assert_eq!(job.phase(), Phase::SyncWithDatabase);
		assert!(fixture.cx.lock_index().is_empty());
		job.step(&fixture.cx, &fixture.tree);
		assert!(job.is_done());
		assert!(fixture.cx.lock_index().get("a").is_some());
	}

	#[test]
	fn full_job_queues_children_and_viewed_job_does_not() {
		let fixture = fixture();
		fixture.store.add_folder("/A/");
		fixture.store.add_folder("/B/");

		run(&mut FolderSyncJob::viewed(ROOT_ID, "/"), &fixture);
		assert!(fixture.cx.jobs().is_empty());

		run(&mut FolderSyncJob::full(ROOT_ID, "/"), &fixture);
		let queued: Vec<String> = std::iter::from_fn(|| fixture.cx.jobs().pop())
			.map(|job| job.path().to_string())
			.collect();
		assert_eq!(queued, vec!["/A/", "/B/"]);
	}

	#[test]
	fn viewed_job_uses_priority_lane_for_thumbnails() {
		let fixture = fixture();
		fixture.store.add_part("/", "a", "A", 1);
		run(&mut FolderSyncJob::viewed(ROOT_ID, "/"), &fixture);
		assert_eq!(fixture.cx.thumbnails().pending(Lane::Priority), 1);
		assert_eq!(fixture.cx.thumbnails().pending(Lane::Background), 0);
	}

	#[test]
	fn remote_failure_ends_job_without_touching_index() {
		let fixture = fixture();
		fixture.store.add_part("/A/", "a", "A", 1);
		let a = fixture.tree.resolve("/A/").expect("resolve");
		fixture.store.set_unavailable("/A/", true);

		let mut job = FolderSyncJob::full(a, "/A/");
		job.step(&fixture.cx, &fixture.tree);
		assert!(job.is_done());
		let index = fixture.cx.lock_index();
		assert!(index.is_empty());
		assert_eq!(index.revision(), 0);
	}

	#[test]
	fn pruned_record_makes_the_job_a_no_op() {
		let fixture = fixture();
		fixture.store.add_folder("/A/");
		run(&mut FolderSyncJob::viewed(ROOT_ID, "/"), &fixture);
		let a = fixture.tree.folder_id("/A/").expect("A cached");

		fixture.store.remove_folder("/A/");
		run(&mut FolderSyncJob::viewed(ROOT_ID, "/"), &fixture);
		assert!(fixture.tree.folder_id("/A/").is_none());

		let revision = fixture.cx.lock_index().revision();
		let mut job = FolderSyncJob::full(a, "/A/");
		job.step(&fixture.cx, &fixture.tree);
		assert!(job.is_done());
		assert_eq!(fixture.cx.lock_index().revision(), revision);
		assert!(fixture.cx.jobs().is_empty());
	}
}
