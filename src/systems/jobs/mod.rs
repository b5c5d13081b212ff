//! Resumable per-folder sync work and the queue that orders it.

mod folder;

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};

pub use folder::{FolderSyncJob, JobKind, Phase};

/// FIFO of pending folder jobs. Consumer requests may jump the line.
#[derive(Debug, Default)]
pub struct JobQueue {
	jobs: Mutex<VecDeque<FolderSyncJob>>,
}

impl JobQueue {
	fn lock(&self) -> MutexGuard<'_, VecDeque<FolderSyncJob>> {
		self.jobs.lock().unwrap_or_else(PoisonError::into_inner)
	}

	pub fn push_back(&self, job: FolderSyncJob) {
		self.lock().push_back(job);
	}

	pub fn push_front(&self, job: FolderSyncJob) {
		self.lock().push_front(job);
	}

	pub fn pop(&self) -> Option<FolderSyncJob> {
		self.lock().pop_front()
	}

	#[must_use]
	pub fn len(&self) -> usize {
		self.lock().len()
	}

	#[must_use]
	pub fn is_empty(&self) -> bool {
		self.lock().is_empty()
	}
}
