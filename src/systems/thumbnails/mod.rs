//! Queues of in-flight thumbnail fetches and the loop that drains them.
//!
//! Jobs sit in one of two lanes. The priority lane serves folders a consumer
//! is looking at and is always drained first; the background lane serves the
//! crawl. [`ThumbnailCache::service`] only ever polls, so one call is bounded
//! by its time budget no matter how slow the store is.

mod naming;

use std::collections::{HashSet, VecDeque};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use cots_store_api::{FetchState, ThumbnailFetch};
use tracing::{debug, trace, warn};

pub use naming::{THUMBNAIL_EXTENSION, flatten_path, sanitize_part_name, thumbnail_file_name, thumbnail_path};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lane {
	Priority,
	Background,
}

/// A pending fetch and where its image goes.
pub struct ThumbnailJob {
	destination: PathBuf,
	label: String,
	fetch: Box<dyn ThumbnailFetch>,
}

impl ThumbnailJob {
	pub fn new(destination: PathBuf, label: impl Into<String>, fetch: Box<dyn ThumbnailFetch>) -> Self {
		Self {
			destination,
			label: label.into(),
			fetch,
		}
	}

	#[must_use]
	pub fn destination(&self) -> &Path {
		&self.destination
	}
}

impl std::fmt::Debug for ThumbnailJob {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("ThumbnailJob")
			.field("destination", &self.destination)
			.field("label", &self.label)
			.finish_non_exhaustive()
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServiceBudget {
	/// Upper bound on one [`ThumbnailCache::service`] call.
	pub budget: Duration,
	/// Sleep after a pass over a lane in which every fetch was still pending.
	pub poll_interval: Duration,
}

impl Default for ServiceBudget {
	fn default() -> Self {
		Self {
			budget: Duration::from_secs(2),
			poll_interval: Duration::from_millis(10),
		}
	}
}

/// What one service call achieved.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ServiceReport {
	pub priority_completed: usize,
	pub background_completed: usize,
	pub failed: usize,
}

impl ServiceReport {
	fn completed(&mut self, lane: Lane) {
		match lane {
			Lane::Priority => self.priority_completed += 1,
			Lane::Background => self.background_completed += 1,
		}
	}
}

#[derive(Debug, Default)]
pub struct ThumbnailCache {
	priority: Mutex<VecDeque<ThumbnailJob>>,
	background: Mutex<VecDeque<ThumbnailJob>>,
	in_flight: Mutex<HashSet<PathBuf>>,
	limits: ServiceBudget,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
	mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl ThumbnailCache {
	#[must_use]
	pub fn new(limits: ServiceBudget) -> Self {
		Self {
			limits,
			..Self::default()
		}
	}

	fn queue(&self, lane: Lane) -> &Mutex<VecDeque<ThumbnailJob>> {
		match lane {
			Lane::Priority => &self.priority,
			Lane::Background => &self.background,
		}
	}

	/// Whether a fetch for `destination` is already queued.
	#[must_use]
	pub fn is_in_flight(&self, destination: &Path) -> bool {
		lock(&self.in_flight).contains(destination)
	}

	/// Queue `job` on `lane`. Returns `false` when a fetch for the same
	/// destination is already queued.
	pub fn enqueue(&self, job: ThumbnailJob, lane: Lane) -> bool {
		if !lock(&self.in_flight).insert(job.destination.clone()) {
			trace!(destination = %job.destination.display(), "thumbnail already queued");
			return false;
		}
		lock(self.queue(lane)).push_back(job);
		true
	}

	/// Move the queued background fetch for `destination` to the back of
	/// the priority lane. Returns `false` when no such fetch is waiting, which
	/// includes one that is being polled right now.
	pub fn promote(&self, destination: &Path) -> bool {
		let job = {
			let mut background = lock(&self.background);
			let Some(position) = background
				.iter()
				.position(|job| job.destination == destination)
			else {
				return false;
			};
			background.remove(position)
		};
		match job {
			Some(job) => {
				trace!(part = %job.label, "promoted thumbnail to the priority lane");
				lock(&self.priority).push_back(job);
				true
			}
			None => false,
		}
	}

	/// Jobs waiting on `lane`.
	#[must_use]
	pub fn pending(&self, lane: Lane) -> usize {
		lock(self.queue(lane)).len()
	}

	/// Poll queued fetches, priority lane first, until both lanes are empty or
	/// the time budget runs out.
	pub fn service(&self) -> ServiceReport {
		let deadline = Instant::now() + self.limits.budget;
		let mut report = ServiceReport::default();
		self.drain(Lane::Priority, deadline, &mut report);
		self.drain(Lane::Background, deadline, &mut report);
		if report != ServiceReport::default() {
			debug!(?report, "serviced thumbnails");
		}
		report
	}

	fn drain(&self, lane: Lane, deadline: Instant, report: &mut ServiceReport) {
		let queue = self.queue(lane);
		let mut pending_streak = 0usize;
		loop {
			let now = Instant::now();
			if now >= deadline {
				break;
			}
			let Some(mut job) = lock(queue).pop_front() else {
				break;
			};

			match job.fetch.poll() {
				FetchState::Pending => {
					let waiting = {
						let mut queue = lock(queue);
						queue.push_back(job);
						queue.len()
					};
					pending_streak += 1;
					if pending_streak >= waiting {
						pending_streak = 0;
						thread::sleep(self.limits.poll_interval.min(deadline - now));
					}
				}
				FetchState::Ready(bytes) => {
					pending_streak = 0;
					match write_image(&job.destination, &bytes) {
						Ok(()) => {
							trace!(part = %job.label, destination = %job.destination.display(), "saved thumbnail");
							report.completed(lane);
						}
						Err(err) => {
							warn!(part = %job.label, error = ?err, "failed to save thumbnail");
							report.failed += 1;
						}
					}
					self.release(&job.destination);
				}
				FetchState::Failed(reason) => {
					pending_streak = 0;
					warn!(part = %job.label, %reason, "thumbnail fetch failed");
					report.failed += 1;
					self.release(&job.destination);
				}
			}
		}
	}

	fn release(&self, destination: &Path) {
		lock(&self.in_flight).remove(destination);
	}
}

/// Replace whatever sits at `destination` with `bytes`.
fn write_image(destination: &Path, bytes: &[u8]) -> Result<()> {
	if let Some(parent) = destination.parent() {
		fs::create_dir_all(parent)
			.with_context(|| format!("failed to create icon directory: {}", parent.display()))?;
	}
	match fs::remove_file(destination) {
		Ok(()) => {}
		Err(err) if err.kind() == ErrorKind::NotFound => {}
		Err(err) => {
			return Err(err)
				.with_context(|| format!("failed to replace icon: {}", destination.display()));
		}
	}
	fs::write(destination, bytes)
		.with_context(|| format!("failed to write icon: {}", destination.display()))
}
