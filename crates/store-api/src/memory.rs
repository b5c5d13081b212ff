//! In-memory [`RemoteStore`] whose tree can be edited while an indexer is
//! reading it. Used by tests and demos.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::error::{StoreError, StoreResult};
use crate::store::{RemoteStore, StoreProvider};
use crate::types::{FetchState, FolderHandle, ProjectInfo, RemoteFile, RemoteFolder, ThumbnailFetch};

const ROOT: &str = "/";

/// Scripted behaviour of a thumbnail fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ThumbnailScript {
	/// Ready on the first poll.
	Ready(Vec<u8>),
	/// Pending for `polls` polls, then ready.
	Delayed { polls: usize, bytes: Vec<u8> },
	/// Failed on the first poll.
	Fail(String),
	/// Never completes.
	Stalled,
}

#[derive(Debug, Default)]
struct MemoryFolder {
	children: Vec<String>,
	files: Vec<RemoteFile>,
	unavailable: bool,
}

#[derive(Debug, Default)]
struct MemoryState {
	folders: BTreeMap<String, MemoryFolder>,
	thumbnails: HashMap<String, ThumbnailScript>,
}

/// Editable in-memory project tree.
#[derive(Debug)]
pub struct MemoryStore {
	project: ProjectInfo,
	state: Mutex<MemoryState>,
	listing_calls: AtomicUsize,
	thumbnail_calls: AtomicUsize,
}

impl MemoryStore {
	pub fn new(name: impl Into<String>, id: impl Into<String>) -> Self {
		let mut state = MemoryState::default();
		state.folders.insert(ROOT.to_string(), MemoryFolder::default());
		Self {
			project: ProjectInfo::new(name, id),
			state: Mutex::new(state),
			listing_calls: AtomicUsize::new(0),
			thumbnail_calls: AtomicUsize::new(0),
		}
	}

	fn state(&self) -> MutexGuard<'_, MemoryState> {
		self.state.lock().unwrap_or_else(PoisonError::into_inner)
	}

	/// Create `path` and any missing ancestors.
	pub fn add_folder(&self, path: &str) {
		let mut state = self.state();
		ensure_folder(&mut state, &normalize(path));
	}

	/// Remove `path` and everything below it.
	pub fn remove_folder(&self, path: &str) {
		let path = normalize(path);
		if path == ROOT {
			return;
		}
		let mut state = self.state();
		state.folders.retain(|key, _| !key.starts_with(&path));
		let (parent, name) = split_last(&path);
		if let Some(parent) = state.folders.get_mut(&parent) {
			parent.children.retain(|child| child != &name);
		}
	}

	/// Add a file with the given extension to `folder`, creating the folder.
	pub fn add_file(&self, folder: &str, id: &str, name: &str, extension: &str, version: u64) {
		let folder = normalize(folder);
		let mut state = self.state();
		ensure_folder(&mut state, &folder);
		let entry = state.folders.entry(folder.clone()).or_default();
		entry.files.retain(|file| file.id != id);
		entry.files.push(RemoteFile {
			id: id.to_string(),
			name: name.to_string(),
			extension: Some(extension.to_string()),
			version,
			locator: format!("{folder}{name}.{extension}"),
		});
	}

	/// Add a part file (`f3d`) to `folder`.
	pub fn add_part(&self, folder: &str, id: &str, name: &str, version: u64) {
		self.add_file(folder, id, name, "f3d", version);
	}

	/// Remove the file with identity `id` wherever it lives.
	pub fn remove_file(&self, id: &str) {
		let mut state = self.state();
		for folder in state.folders.values_mut() {
			folder.files.retain(|file| file.id != id);
		}
	}

	/// Change the version number of file `id`.
	pub fn set_version(&self, id: &str, version: u64) {
		let mut state = self.state();
		for folder in state.folders.values_mut() {
			for file in folder.files.iter_mut().filter(|file| file.id == id) {
				file.version = version;
			}
		}
	}

	/// Script how thumbnail fetches for file `id` behave.
	pub fn set_thumbnail(&self, id: &str, script: ThumbnailScript) {
		self.state().thumbnails.insert(id.to_string(), script);
	}

	/// Make listings of `path` fail until cleared.
	pub fn set_unavailable(&self, path: &str, unavailable: bool) {
		let path = normalize(path);
		if let Some(folder) = self.state().folders.get_mut(&path) {
			folder.unavailable = unavailable;
		}
	}

	/// Number of folder and file listings served so far.
	#[must_use]
	pub fn listing_calls(&self) -> usize {
		self.listing_calls.load(Ordering::Relaxed)
	}

	/// Number of thumbnail fetches started so far.
	#[must_use]
	pub fn thumbnail_calls(&self) -> usize {
		self.thumbnail_calls.load(Ordering::Relaxed)
	}

	fn with_folder<T>(
		&self,
		handle: &FolderHandle,
		read: impl FnOnce(&MemoryFolder) -> T,
	) -> StoreResult<T> {
		self.listing_calls.fetch_add(1, Ordering::Relaxed);
		let state = self.state();
		let folder = state
			.folders
			.get(handle.locator())
			.ok_or_else(|| StoreError::folder_not_found(handle.locator()))?;
		if folder.unavailable {
			return Err(StoreError::unavailable(format!(
				"listing of '{}' refused",
				handle.locator()
			)));
		}
		Ok(read(folder))
	}
}

impl RemoteStore for MemoryStore {
	fn project(&self) -> ProjectInfo {
		self.project.clone()
	}

	fn root(&self) -> StoreResult<FolderHandle> {
		Ok(FolderHandle::new(ROOT))
	}

	fn list_folders(&self, folder: &FolderHandle) -> StoreResult<Vec<RemoteFolder>> {
		let base = folder.locator().to_string();
		self.with_folder(folder, |entry| {
			entry
				.children
				.iter()
				.map(|name| RemoteFolder::new(name.clone(), FolderHandle::new(format!("{base}{name}/"))))
				.collect()
		})
	}

	fn list_files(&self, folder: &FolderHandle) -> StoreResult<Vec<RemoteFile>> {
		self.with_folder(folder, |entry| entry.files.clone())
	}

	fn fetch_thumbnail(&self, file: &RemoteFile) -> Box<dyn ThumbnailFetch> {
		self.thumbnail_calls.fetch_add(1, Ordering::Relaxed);
		let script = self
			.state()
			.thumbnails
			.get(&file.id)
			.cloned()
			.unwrap_or_else(|| {
				ThumbnailScript::Ready(format!("png:{}:{}", file.id, file.version).into_bytes())
			});
		Box::new(MemoryFetch { script })
	}
}

struct MemoryFetch {
	script: ThumbnailScript,
}

impl ThumbnailFetch for MemoryFetch {
	fn poll(&mut self) -> FetchState {
		match &mut self.script {
			ThumbnailScript::Ready(bytes) => FetchState::Ready(std::mem::take(bytes)),
			ThumbnailScript::Delayed { polls, bytes } => {
				if *polls == 0 {
					FetchState::Ready(std::mem::take(bytes))
				} else {
					*polls -= 1;
					FetchState::Pending
				}
			}
			ThumbnailScript::Fail(reason) => FetchState::Failed(reason.clone()),
			ThumbnailScript::Stalled => FetchState::Pending,
		}
	}
}

/// Provider serving a fixed set of [`MemoryStore`] projects.
#[derive(Debug, Default, Clone)]
pub struct MemoryProvider {
	projects: Vec<Arc<MemoryStore>>,
}

impl MemoryProvider {
	pub fn new() -> Self {
		Self::default()
	}

	#[must_use]
	pub fn with_project(mut self, store: Arc<MemoryStore>) -> Self {
		self.projects.push(store);
		self
	}
}

impl StoreProvider for MemoryProvider {
	fn open_project(&self, name: &str) -> StoreResult<Arc<dyn RemoteStore>> {
		self.projects
			.iter()
			.find(|store| store.project.name == name)
			.map(|store| Arc::clone(store) as Arc<dyn RemoteStore>)
			.ok_or_else(|| StoreError::ProjectNotFound {
				name: name.to_string(),
			})
	}
}

fn normalize(path: &str) -> String {
	let trimmed = path.trim_matches('/');
	if trimmed.is_empty() {
		ROOT.to_string()
	} else {
		format!("/{trimmed}/")
	}
}

fn split_last(path: &str) -> (String, String) {
	let trimmed = path.trim_end_matches('/');
	match trimmed.rfind('/') {
		Some(index) => (
			trimmed[..=index].to_string(),
			trimmed[index + 1..].to_string(),
		),
		None => (ROOT.to_string(), trimmed.to_string()),
	}
}

fn ensure_folder(state: &mut MemoryState, path: &str) {
	if state.folders.contains_key(path) {
		return;
	}
	let (parent, name) = split_last(path);
	ensure_folder(state, &parent);
	if let Some(parent) = state.folders.get_mut(&parent) {
		parent.children.push(name);
	}
	state
		.folders
		.insert(path.to_string(), MemoryFolder::default());
}
