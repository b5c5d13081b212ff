use std::sync::Arc;

use crate::error::StoreResult;
use crate::types::{FolderHandle, ProjectInfo, RemoteFile, RemoteFolder, ThumbnailFetch};

/// Read-only cursor over a remote hierarchical project.
///
/// Every call may block on network or disk I/O. Listings are lazy: a call
/// returns exactly one level of the tree and never recurses.
pub trait RemoteStore: Send + Sync {
	/// Identity of the project this store exposes.
	fn project(&self) -> ProjectInfo;

	/// Handle of the project's root folder.
	fn root(&self) -> StoreResult<FolderHandle>;

	/// Child folders of `folder`, in store order.
	fn list_folders(&self, folder: &FolderHandle) -> StoreResult<Vec<RemoteFolder>>;

	/// Look up a single child folder by name.
	fn find_folder(&self, folder: &FolderHandle, name: &str) -> StoreResult<Option<FolderHandle>> {
		Ok(self
			.list_folders(folder)?
			.into_iter()
			.find(|child| child.name == name)
			.map(|child| child.handle))
	}

	/// Files directly inside `folder`, in store order and of every extension.
	fn list_files(&self, folder: &FolderHandle) -> StoreResult<Vec<RemoteFile>>;

	/// Start fetching the preview image of `file`.
	fn fetch_thumbnail(&self, file: &RemoteFile) -> Box<dyn ThumbnailFetch>;
}

/// Opens projects by their configured name.
pub trait StoreProvider: Send + Sync {
	fn open_project(&self, name: &str) -> StoreResult<Arc<dyn RemoteStore>>;
}
