//! Project store backed by a directory on the local filesystem.
//!
//! Each immediate subdirectory of the provider root is one project. Folders
//! map to directories and files map to files; a part's preview image is the
//! sibling file with the same stem and the configured thumbnail extension
//! (`Gear16T.f3d` is previewed by `Gear16T.png`).

use std::ffi::OsStr;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::UNIX_EPOCH;

use cots_store_api::{
	FetchState, FolderHandle, ProjectInfo, RemoteFile, RemoteFolder, RemoteStore, StoreError,
	StoreProvider, StoreResult, ThumbnailFetch,
};
use ignore::WalkBuilder;
use tracing::{debug, warn};

const ROOT: &str = "/";
const IDENTITY_LEN: usize = 16;

/// Listing behaviour shared by every project the provider opens.
#[derive(Debug, Clone)]
pub struct FsStoreOptions {
	pub include_hidden: bool,
	pub respect_ignore_files: bool,
	pub thumbnail_extension: String,
}

impl Default for FsStoreOptions {
	fn default() -> Self {
		Self {
			include_hidden: false,
			respect_ignore_files: true,
			thumbnail_extension: "png".to_string(),
		}
	}
}

/// Opens projects stored as subdirectories of `root`.
#[derive(Debug, Clone)]
pub struct FsProvider {
	root: PathBuf,
	options: FsStoreOptions,
}

impl FsProvider {
	pub fn new(root: impl Into<PathBuf>, options: FsStoreOptions) -> Self {
		Self {
			root: root.into(),
			options,
		}
	}

	/// Directory that holds the projects.
	#[must_use]
	pub fn root(&self) -> &Path {
		&self.root
	}
}

impl StoreProvider for FsProvider {
	fn open_project(&self, name: &str) -> StoreResult<Arc<dyn RemoteStore>> {
		let dir = self.root.join(name);
		if !is_plain_name(name) || !dir.is_dir() {
			return Err(StoreError::ProjectNotFound {
				name: name.to_string(),
			});
		}
		let canonical = fs::canonicalize(&dir)?;
		let id = short_hash(canonical.to_string_lossy().as_bytes());
		debug!(project = name, dir = %canonical.display(), "opened filesystem project");
		Ok(Arc::new(FsStore {
			project: ProjectInfo::new(name, id),
			dir: canonical,
			options: self.options.clone(),
		}))
	}
}

/// A single project directory.
#[derive(Debug)]
pub struct FsStore {
	project: ProjectInfo,
	dir: PathBuf,
	options: FsStoreOptions,
}

enum Entry {
	Folder(String),
	File(PathBuf),
}

impl FsStore {
	fn disk_path(&self, locator: &str) -> PathBuf {
		let relative = locator.trim_matches('/');
		if relative.is_empty() {
			self.dir.clone()
		} else {
			self.dir.join(relative)
		}
	}

	fn entries(&self, folder: &FolderHandle) -> StoreResult<Vec<Entry>> {
		let dir = self.disk_path(folder.locator());
		if !dir.is_dir() {
			return Err(StoreError::folder_not_found(folder.locator()));
		}

		let mut entries = Vec::new();
		let walker = WalkBuilder::new(&dir)
			.max_depth(Some(1))
			.hidden(!self.options.include_hidden)
			.git_ignore(self.options.respect_ignore_files)
			.ignore(self.options.respect_ignore_files)
			.parents(false)
			.sort_by_file_name(|a: &OsStr, b: &OsStr| a.cmp(b))
			.build();

		for result in walker {
			let entry = match result {
				Ok(entry) => entry,
				Err(err) => {
					warn!(folder = folder.locator(), error = %err, "skipping unreadable entry");
					continue;
				}
			};
			if entry.depth() == 0 {
				continue;
			}
			let Some(file_type) = entry.file_type() else {
				continue;
			};
			if file_type.is_dir() {
				entries.push(Entry::Folder(entry.file_name().to_string_lossy().into_owned()));
			} else if file_type.is_file() {
				entries.push(Entry::File(entry.into_path()));
			}
		}

		Ok(entries)
	}

	fn describe_file(&self, folder: &FolderHandle, path: &Path) -> StoreResult<RemoteFile> {
		let file_name = path
			.file_name()
			.map(|name| name.to_string_lossy().into_owned())
			.unwrap_or_default();
		let name = path
			.file_stem()
			.map(|stem| stem.to_string_lossy().into_owned())
			.unwrap_or_else(|| file_name.clone());
		let extension = path
			.extension()
			.map(|ext| ext.to_string_lossy().into_owned());
		let locator = format!("{}{file_name}", folder.locator());
		let version = match fs::metadata(path) {
			Ok(metadata) => metadata
				.modified()
				.ok()
				.and_then(|time| time.duration_since(UNIX_EPOCH).ok())
				.map(|age| age.as_secs())
				.unwrap_or_default(),
			Err(err) if err.kind() == ErrorKind::NotFound => {
				return Err(StoreError::folder_not_found(folder.locator()));
			}
			Err(err) => return Err(err.into()),
		};

		Ok(RemoteFile {
			id: short_hash(locator.as_bytes()),
			name,
			extension,
			version,
			locator,
		})
	}
}

impl RemoteStore for FsStore {
	fn project(&self) -> ProjectInfo {
		self.project.clone()
	}

	fn root(&self) -> StoreResult<FolderHandle> {
		Ok(FolderHandle::new(ROOT))
	}

	fn list_folders(&self, folder: &FolderHandle) -> StoreResult<Vec<RemoteFolder>> {
		Ok(self
			.entries(folder)?
			.into_iter()
			.filter_map(|entry| match entry {
				Entry::Folder(name) => {
					let handle = FolderHandle::new(format!("{}{name}/", folder.locator()));
					Some(RemoteFolder::new(name, handle))
				}
				Entry::File(_) => None,
			})
			.collect())
	}

	fn find_folder(&self, folder: &FolderHandle, name: &str) -> StoreResult<Option<FolderHandle>> {
		if !is_plain_name(name) {
			debug!(folder = folder.locator(), name, "rejecting folder name that leaves the project");
			return Ok(None);
		}
		let locator = format!("{}{name}/", folder.locator());
		if self.disk_path(&locator).is_dir() {
			Ok(Some(FolderHandle::new(locator)))
		} else if self.disk_path(folder.locator()).is_dir() {
			Ok(None)
		} else {
			Err(StoreError::folder_not_found(folder.locator()))
		}
	}

	fn list_files(&self, folder: &FolderHandle) -> StoreResult<Vec<RemoteFile>> {
		let mut files = Vec::new();
		for entry in self.entries(folder)? {
			if let Entry::File(path) = entry {
				files.push(self.describe_file(folder, &path)?);
			}
		}
		Ok(files)
	}

	fn fetch_thumbnail(&self, file: &RemoteFile) -> Box<dyn ThumbnailFetch> {
		let source = self
			.disk_path(&file.locator)
			.with_extension(&self.options.thumbnail_extension);
		Box::new(SidecarFetch { source })
	}
}

/// Reads the preview image that sits next to a part file.
struct SidecarFetch {
	source: PathBuf,
}

impl ThumbnailFetch for SidecarFetch {
	fn poll(&mut self) -> FetchState {
		match fs::read(&self.source) {
			Ok(bytes) => FetchState::Ready(bytes),
			Err(err) => FetchState::Failed(format!("{}: {err}", self.source.display())),
		}
	}
}

/// A single directory entry name: no separators, not `.` or `..`.
fn is_plain_name(name: &str) -> bool {
	!name.is_empty() && name != "." && name != ".." && !name.contains(['/', '\\'])
}

fn short_hash(bytes: &[u8]) -> String {
	let hex = blake3::hash(bytes).to_hex();
	hex.as_str()[..IDENTITY_LEN].to_string()
}

#[cfg(test)]
mod tests {
	use super::*;

	fn project_with_parts() -> (tempfile::TempDir, Arc<dyn RemoteStore>) {
		let temp = tempfile::tempdir().expect("tempdir");
		let project = temp.path().join("COTS");
		fs::create_dir_all(project.join("Gears/Spur")).expect("dirs");
		fs::create_dir_all(project.join("Bearings")).expect("dirs");
		fs::write(project.join("Gears/Gear16T.f3d"), b"part").expect("part");
		fs::write(project.join("Gears/Gear16T.png"), b"image").expect("thumb");
		fs::write(project.join("Gears/notes.txt"), b"notes").expect("notes");

		let provider = FsProvider::new(temp.path(), FsStoreOptions::default());
		let store = provider.open_project("COTS").expect("project");
		(temp, store)
	}

	#[test]
	fn missing_project_is_reported() {
		let temp = tempfile::tempdir().expect("tempdir");
		let provider = FsProvider::new(temp.path(), FsStoreOptions::default());
		let err = provider.open_project("nope").err().expect("missing");
		assert!(matches!(err, StoreError::ProjectNotFound { .. }));
	}

	#[test]
	fn folders_are_listed_one_level_deep_in_name_order() {
		let (_temp, store) = project_with_parts();
		let root = store.root().expect("root");
		let names: Vec<String> = store
			.list_folders(&root)
			.expect("folders")
			.into_iter()
			.map(|folder| folder.name)
			.collect();
		assert_eq!(names, vec!["Bearings".to_string(), "Gears".to_string()]);
	}

	#[test]
	fn files_carry_stem_extension_and_stable_identity() {
		let (_temp, store) = project_with_parts();
		let gears = FolderHandle::new("/Gears/");
		let files = store.list_files(&gears).expect("files");
		let part = files
			.iter()
			.find(|file| file.has_extension("f3d"))
			.expect("part file");
		assert_eq!(part.name, "Gear16T");
		assert_eq!(part.locator, "/Gears/Gear16T.f3d");

		let again = store.list_files(&gears).expect("files");
		assert!(again.iter().any(|file| file.id == part.id));
	}

	#[test]
	fn thumbnail_reads_sidecar_image() {
		let (_temp, store) = project_with_parts();
		let files = store.list_files(&FolderHandle::new("/Gears/")).expect("files");
		let part = files.into_iter().find(|file| file.has_extension("f3d")).expect("part");
		let mut fetch = store.fetch_thumbnail(&part);
		assert_eq!(fetch.poll(), FetchState::Ready(b"image".to_vec()));
	}

	#[test]
	fn find_folder_distinguishes_missing_child_from_missing_parent() {
		let (_temp, store) = project_with_parts();
		let root = store.root().expect("root");
		assert!(store.find_folder(&root, "Gears").expect("lookup").is_some());
		assert!(store.find_folder(&root, "Motors").expect("lookup").is_none());
		let gone = FolderHandle::new("/Motors/");
		assert!(store.find_folder(&gone, "X").unwrap_err().is_not_found());
	}

	#[test]
	fn relative_segments_never_leave_the_project() {
		let (temp, store) = project_with_parts();
		fs::create_dir_all(temp.path().join("Secret")).expect("outside dir");
		fs::write(temp.path().join("Outside.f3d"), b"part").expect("outside part");

		let root = store.root().expect("root");
		for name in ["..", ".", "../Secret", "Gears/Spur", "Gears\\Spur", ""] {
			assert!(
				store.find_folder(&root, name).expect("lookup").is_none(),
				"{name:?} resolved"
			);
		}
		let gears = store.find_folder(&root, "Gears").expect("lookup").expect("gears");
		assert!(store.find_folder(&gears, "..").expect("lookup").is_none());
	}

	#[test]
	fn project_names_must_be_plain_directory_names() {
		let (temp, _store) = project_with_parts();
		let provider = FsProvider::new(temp.path().join("COTS"), FsStoreOptions::default());
		for name in ["..", ".", "../COTS", "Gears/Spur"] {
			let err = provider.open_project(name).err().expect("rejected");
			assert!(matches!(err, StoreError::ProjectNotFound { .. }), "{name:?} opened");
		}
		assert!(provider.open_project("Gears").is_ok());
	}
}
