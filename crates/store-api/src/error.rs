use thiserror::Error;

/// Errors reported by a [`RemoteStore`](crate::RemoteStore) or
/// [`StoreProvider`](crate::StoreProvider).
#[derive(Debug, Error)]
pub enum StoreError {
	/// No project with the configured name exists in the store.
	#[error("project '{name}' was not found")]
	ProjectNotFound { name: String },

	/// A folder path or handle no longer resolves to a remote folder.
	#[error("folder '{path}' was not found")]
	FolderNotFound { path: String },

	/// The remote side refused or failed the request.
	#[error("remote store unavailable: {reason}")]
	Unavailable { reason: String },

	/// Local I/O failed while talking to the store.
	#[error("store I/O error: {0}")]
	Io(#[from] std::io::Error),
}

impl StoreError {
	pub fn folder_not_found(path: impl Into<String>) -> Self {
		Self::FolderNotFound { path: path.into() }
	}

	pub fn unavailable(reason: impl Into<String>) -> Self {
		Self::Unavailable {
			reason: reason.into(),
		}
	}

	/// Whether the error means the requested item does not exist.
	#[must_use]
	pub fn is_not_found(&self) -> bool {
		matches!(
			self,
			Self::ProjectNotFound { .. } | Self::FolderNotFound { .. }
		)
	}
}

pub type StoreResult<T> = Result<T, StoreError>;
