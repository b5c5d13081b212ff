//! In-memory mirror of the remote folder hierarchy.
//!
//! Records live in an arena addressed by [`FolderId`] and are looked up by
//! path through a side table. The tree never holds its lock across a remote
//! call: listings are fetched first and the resulting records are published
//! afterwards in one short critical section, so readers always see either the
//! previous or the next complete shape of a folder.

pub mod path;

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use cots_store_api::{FolderHandle, RemoteFile, RemoteStore, StoreError};
use thiserror::Error;
use tracing::{debug, trace};

use self::path::ROOT_PATH;

/// Arena index of a cached folder record.
pub type FolderId = usize;

pub const ROOT_ID: FolderId = 0;

#[derive(Debug, Error)]
pub enum TreeError {
	#[error("folder '{path}' does not exist in the project")]
	NotFound { path: String },
	#[error("folder record {id} was dropped from the tree")]
	Stale { id: FolderId },
	#[error(transparent)]
	Store(#[from] StoreError),
}

impl TreeError {
	/// Whether the error means the folder is simply absent.
	#[must_use]
	pub fn is_not_found(&self) -> bool {
		match self {
			Self::NotFound { .. } | Self::Stale { .. } => true,
			Self::Store(err) => err.is_not_found(),
		}
	}
}

pub type TreeResult<T> = Result<T, TreeError>;

/// How a child listing is merged into an existing record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshPolicy {
	/// Add newly listed children and keep the ones already cached.
	Merge,
	/// Replace the children with the listing and drop vanished subtrees.
	Reload,
}

#[derive(Debug)]
struct FolderRecord {
	name: String,
	path: String,
	handle: FolderHandle,
	children: Vec<FolderId>,
	files: BTreeMap<String, RemoteFile>,
	children_refreshed: bool,
	files_refreshed: bool,
}

impl FolderRecord {
	fn new(name: String, path: String, handle: FolderHandle) -> Self {
		Self {
			name,
			path,
			handle,
			children: Vec::new(),
			files: BTreeMap::new(),
			children_refreshed: false,
			files_refreshed: false,
		}
	}
}

/// Copy of one folder's cached state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FolderSnapshot {
	pub id: FolderId,
	pub name: String,
	pub path: String,
	/// Paths of the cached child folders in store order.
	pub children: Vec<String>,
	/// Cached part files.
	pub files: Vec<RemoteFile>,
	pub children_refreshed: bool,
	pub files_refreshed: bool,
}

#[derive(Debug, Default)]
struct TreeInner {
	records: Vec<Option<FolderRecord>>,
	by_path: HashMap<String, FolderId>,
}

impl TreeInner {
	fn record(&self, id: FolderId) -> TreeResult<&FolderRecord> {
		self.records
			.get(id)
			.and_then(Option::as_ref)
			.ok_or(TreeError::Stale { id })
	}

	fn record_mut(&mut self, id: FolderId) -> TreeResult<&mut FolderRecord> {
		self.records
			.get_mut(id)
			.and_then(Option::as_mut)
			.ok_or(TreeError::Stale { id })
	}

	fn insert(&mut self, record: FolderRecord) -> FolderId {
		let id = self.records.len();
		self.by_path.insert(record.path.clone(), id);
		self.records.push(Some(record));
		id
	}

	/// Adopt `name` as a child of `parent`, reusing a cached record for the
	/// same path.
	fn adopt(&mut self, parent: FolderId, name: String, handle: FolderHandle) -> TreeResult<FolderId> {
		let child_path = path::join(&self.record(parent)?.path, &name);
		if let Some(&existing) = self.by_path.get(&child_path) {
			self.record_mut(existing)?.handle = handle;
			return Ok(existing);
		}
		Ok(self.insert(FolderRecord::new(name, child_path, handle)))
	}

	fn prune(&mut self, id: FolderId) {
		let mut pending = vec![id];
		while let Some(next) = pending.pop() {
			let Some(record) = self.records.get_mut(next).and_then(Option::take) else {
				continue;
			};
			trace!(path = %record.path, "dropping folder record");
			self.by_path.remove(&record.path);
			pending.extend(record.children);
		}
	}
}

/// Lazily populated cache of the remote folder hierarchy of one project.
pub struct FolderTree {
	store: Arc<dyn RemoteStore>,
	part_extension: String,
	inner: Mutex<TreeInner>,
}

impl std::fmt::Debug for FolderTree {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("FolderTree")
			.field("project", &self.store.project())
			.field("part_extension", &self.part_extension)
			.finish_non_exhaustive()
	}
}

impl FolderTree {
	/// Create a tree holding only the project root.
	pub fn new(store: Arc<dyn RemoteStore>, part_extension: impl Into<String>) -> TreeResult<Self> {
		let handle = store.root()?;
		let mut inner = TreeInner::default();
		let root = inner.insert(FolderRecord::new(String::new(), ROOT_PATH.to_string(), handle));
		debug_assert_eq!(root, ROOT_ID);
		Ok(Self {
			store,
			part_extension: part_extension.into(),
			inner: Mutex::new(inner),
		})
	}

	fn lock(&self) -> MutexGuard<'_, TreeInner> {
		self.inner.lock().unwrap_or_else(PoisonError::into_inner)
	}

	#[must_use]
	pub fn store(&self) -> &Arc<dyn RemoteStore> {
		&self.store
	}

	/// Cached record for an already resolved path.
	#[must_use]
	pub fn folder_id(&self, path: &str) -> Option<FolderId> {
		self.lock().by_path.get(&path::normalize(path)).copied()
	}

	pub fn path_of(&self, id: FolderId) -> TreeResult<String> {
		Ok(self.lock().record(id)?.path.clone())
	}

	/// Resolve `path` to a record, walking the remote store from the nearest
	/// cached ancestor one segment at a time.
	pub fn resolve(&self, path: &str) -> TreeResult<FolderId> {
		let path = path::normalize(path);
		if path::segments(&path).any(path::is_relative_segment) {
			return Err(TreeError::NotFound { path });
		}
		let (mut current, base) = {
			let inner = self.lock();
			if let Some(&id) = inner.by_path.get(&path) {
				return Ok(id);
			}
			let mut probe = path.clone();
			loop {
				match path::parent(&probe) {
					Some(parent) => {
						if let Some(&id) = inner.by_path.get(&parent) {
							break (id, parent);
						}
						probe = parent;
					}
					None => break (ROOT_ID, ROOT_PATH.to_string()),
				}
			}
		};

		let remaining: Vec<String> = path::segments(&path[base.len()..])
			.map(str::to_string)
			.collect();
		for name in remaining {
			let handle = self.handle_of(current)?;
			let Some(child) = self.store.find_folder(&handle, &name)? else {
				return Err(TreeError::NotFound { path });
			};
			let mut inner = self.lock();
			let adopted = inner.adopt(current, name, child)?;
			let parent = inner.record_mut(current)?;
			if !parent.children.contains(&adopted) {
				parent.children.push(adopted);
			}
			current = adopted;
		}

		Ok(current)
	}

	fn handle_of(&self, id: FolderId) -> TreeResult<FolderHandle> {
		Ok(self.lock().record(id)?.handle.clone())
	}

	pub fn children_refreshed(&self, id: FolderId) -> TreeResult<bool> {
		Ok(self.lock().record(id)?.children_refreshed)
	}

	/// List the child folders of `id` and publish them under `policy`.
	///
	/// Returns the children now cached for the folder as `(id, path)` pairs.
	pub fn refresh_children(
		&self,
		id: FolderId,
		policy: RefreshPolicy,
	) -> TreeResult<Vec<(FolderId, String)>> {
		let handle = self.handle_of(id)?;
		let listing = self.store.list_folders(&handle)?;

		let mut inner = self.lock();
		let mut listed = Vec::with_capacity(listing.len());
		for folder in listing {
			listed.push(inner.adopt(id, folder.name, folder.handle)?);
		}

		let record = inner.record_mut(id)?;
		record.children_refreshed = true;
		let children = match policy {
			RefreshPolicy::Merge => {
				for child in &listed {
					if !record.children.contains(child) {
						record.children.push(*child);
					}
				}
				record.children.clone()
			}
			RefreshPolicy::Reload => {
				let previous = std::mem::replace(&mut record.children, listed.clone());
				for stale in previous.into_iter().filter(|child| !listed.contains(child)) {
					inner.prune(stale);
				}
				listed
			}
		};
		debug!(folder = %inner.record(id)?.path, children = children.len(), ?policy, "refreshed child folders");

		children
			.into_iter()
			.map(|child| Ok((child, inner.record(child)?.path.clone())))
			.collect()
	}

	/// List the files of `id`, keep the part files and publish them.
	pub fn refresh_files(&self, id: FolderId) -> TreeResult<Vec<RemoteFile>> {
		let handle = self.handle_of(id)?;
		let parts: Vec<RemoteFile> = self
			.store
			.list_files(&handle)?
			.into_iter()
			.filter(|file| file.has_extension(&self.part_extension))
			.collect();

		let mut inner = self.lock();
		let record = inner.record_mut(id)?;
		record.files = parts
			.iter()
			.map(|file| (file.id.clone(), file.clone()))
			.collect();
		record.files_refreshed = true;
		Ok(parts)
	}

	/// Copy the cached state of `id`.
	pub fn snapshot(&self, id: FolderId) -> TreeResult<FolderSnapshot> {
		let inner = self.lock();
		let record = inner.record(id)?;
		let children = record
			.children
			.iter()
			.map(|child| inner.record(*child).map(|child| child.path.clone()))
			.collect::<TreeResult<Vec<_>>>()?;
		Ok(FolderSnapshot {
			id,
			name: record.name.clone(),
			path: record.path.clone(),
			children,
			files: record.files.values().cloned().collect(),
			children_refreshed: record.children_refreshed,
			files_refreshed: record.files_refreshed,
		})
	}

	/// Cached file `id` inside the folder at `path`, without remote calls.
	#[must_use]
	pub fn cached_file(&self, path: &str, id: &str) -> Option<RemoteFile> {
		let inner = self.lock();
		let folder = *inner.by_path.get(&path::normalize(path))?;
		inner.record(folder).ok()?.files.get(id).cloned()
	}

	/// Number of live folder records.
	#[must_use]
	pub fn len(&self) -> usize {
		self.lock().by_path.len()
	}

	#[must_use]
	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}
}
