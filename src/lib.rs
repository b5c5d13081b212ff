//! Background indexer for libraries of COTS part files kept in a remote
//! project tree.
//!
//! [`PartsLibrary::spawn`] opens a project through a
//! [`StoreProvider`](cots_store_api::StoreProvider), loads the persisted
//! index and keeps it in step with the store from a dedicated thread. The
//! returned [`SignalReceiver`] tells the consumer when to re-read the
//! listing; everything else goes through the thread-safe query methods.

pub mod app_dirs;
pub mod logging;
mod systems;

pub use systems::builder::{
	DEFAULT_PART_EXTENSION, DEFAULT_PROJECT, DEFAULT_SIGNAL_CAPACITY, DEFAULT_STORAGE_FOLDER,
	EngineConfig, ICONS_DIR_NAME, INDEX_FILE_NAME, STATUS_IDLE, SchedulerTiming, Signal,
	SignalReceiver,
};
pub use systems::find::{FoundPart, find_parts};
pub use systems::index::{
	IndexDocument, IndexFile, LoadOutcome, PLACEHOLDER_NAME, PartIndex, PartListing, PartRecord,
	placeholder_id, sort_listing,
};
pub use systems::library::{LibraryError, PartsLibrary, PartsQuery};
pub use systems::thumbnails::{ServiceBudget, thumbnail_file_name, thumbnail_path};
pub use systems::tree::TreeError;
pub use systems::tree::path::normalize as normalize_folder_path;
