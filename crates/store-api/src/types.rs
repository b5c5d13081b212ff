use serde::{Deserialize, Serialize};

/// Name and identity of the remote project an index was built from.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProjectInfo {
	pub name: String,
	pub id: String,
}

impl ProjectInfo {
	pub fn new(name: impl Into<String>, id: impl Into<String>) -> Self {
		Self {
			name: name.into(),
			id: id.into(),
		}
	}
}

/// Opaque store-specific locator for a remote folder.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FolderHandle {
	locator: String,
}

impl FolderHandle {
	pub fn new(locator: impl Into<String>) -> Self {
		Self {
			locator: locator.into(),
		}
	}

	/// Raw locator understood by the store that issued the handle.
	#[must_use]
	pub fn locator(&self) -> &str {
		&self.locator
	}
}

/// A child folder as listed by the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteFolder {
	pub name: String,
	pub handle: FolderHandle,
}

impl RemoteFolder {
	pub fn new(name: impl Into<String>, handle: FolderHandle) -> Self {
		Self {
			name: name.into(),
			handle,
		}
	}
}

/// A file as listed by the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteFile {
	/// Globally unique identity assigned by the store.
	pub id: String,
	/// Display name without extension.
	pub name: String,
	/// File extension without the leading dot, if the store reports one.
	pub extension: Option<String>,
	/// Version number, increasing whenever the remote file changes.
	pub version: u64,
	/// Store-specific locator used to fetch the file or its thumbnail.
	pub locator: String,
}

impl RemoteFile {
	/// Whether the file carries `extension`, compared case-insensitively.
	#[must_use]
	pub fn has_extension(&self, extension: &str) -> bool {
		self.extension
			.as_deref()
			.is_some_and(|ext| ext.eq_ignore_ascii_case(extension))
	}
}

/// Poll result of an in-flight thumbnail fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchState {
	/// The store is still producing the image.
	Pending,
	/// Raw image bytes are available.
	Ready(Vec<u8>),
	/// The fetch failed terminally and will never produce an image.
	Failed(String),
}

/// Handle on an asynchronous thumbnail fetch that can only be polled.
pub trait ThumbnailFetch: Send {
	/// Check the fetch without blocking.
	///
	/// Once `Ready` or `Failed` has been returned the fetch is spent; callers
	/// must not poll it again.
	fn poll(&mut self) -> FetchState;
}

#[cfg(test)]
mod tests {
	use super::*;

	fn file(extension: Option<&str>) -> RemoteFile {
		RemoteFile {
			id: "abc".into(),
			name: "Gear".into(),
			extension: extension.map(str::to_string),
			version: 1,
			locator: "/Gear.f3d".into(),
		}
	}

	#[test]
	fn extension_match_ignores_case() {
		assert!(file(Some("F3D")).has_extension("f3d"));
		assert!(!file(Some("step")).has_extension("f3d"));
		assert!(!file(None).has_extension("f3d"));
	}

	#[test]
	fn project_info_round_trips_through_json() {
		let project = ProjectInfo::new("FRC_COTS", "p-1");
		let json = serde_json::to_string(&project).expect("serialize");
		assert_eq!(json, r#"{"name":"FRC_COTS","id":"p-1"}"#);
	}
}
