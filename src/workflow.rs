use std::path::PathBuf;
use std::sync::Arc;
use std::sync::mpsc::RecvTimeoutError;
use std::time::{Duration, Instant};

use anyhow::{Context, Result, anyhow, bail};
use cots_index::{
	EngineConfig, FoundPart, IndexFile, PartIndex, PartListing, PartsLibrary, Signal,
	SignalReceiver, find_parts, normalize_folder_path, sort_listing,
};
use cots_store_api::RemoteFile;
use cots_store_fs::FsProvider;
use serde::Serialize;
use tracing::{debug, info};

use crate::cli::Action;
use crate::settings::ResolvedConfig;

/// Counts reported after a sync.
#[derive(Debug, Clone, Serialize)]
pub(crate) struct SyncSummary {
	pub project: String,
	pub parts: usize,
	pub empty_folders: usize,
	pub folders: usize,
	pub built: bool,
	pub index_file: PathBuf,
}

/// One folder as shown by `browse`.
#[derive(Debug, Clone, Serialize)]
pub(crate) struct FolderView {
	pub path: String,
	pub folders: Vec<String>,
	pub parts: Vec<PartListing>,
}

/// Result of a CLI action, ready to be printed.
#[derive(Debug)]
pub(crate) enum Outcome {
	Synced(SyncSummary),
	Listing(Vec<PartListing>),
	Found(Vec<FoundPart>),
	Folder(FolderView),
	File {
		path: String,
		id: String,
		file: Option<RemoteFile>,
	},
}

/// Runs one CLI action against the resolved configuration.
pub(crate) struct Workflow {
	config: ResolvedConfig,
}

impl Workflow {
	pub(crate) fn from_config(config: ResolvedConfig) -> Self {
		Self { config }
	}

	pub(crate) fn run(self, action: &Action) -> Result<Outcome> {
		match action {
			Action::Sync { full, timeout } => self.sync(*full, Duration::from_secs(*timeout)),
			Action::List {
				folder,
				placeholders,
			} => self.list(folder.as_deref(), *placeholders),
			Action::Find { query, limit } => self.find(query, *limit),
			Action::Browse { path, timeout } => self.browse(path, Duration::from_secs(*timeout)),
			Action::Get { path, id } => self.get(path, id),
		}
	}

	fn spawn(&self, engine: EngineConfig) -> Result<(PartsLibrary, SignalReceiver)> {
		let provider = FsProvider::new(self.config.source_root.clone(), self.config.store.clone());
		PartsLibrary::spawn(engine, Arc::new(provider))
	}

	fn sync(self, full: bool, timeout: Duration) -> Result<Outcome> {
		let mut engine = self.config.engine.clone();
		engine.force_full |= full;
		let index_file = engine.index_file();
		let project = engine.project.clone();

		let (library, signals) = self.spawn(engine)?;
		wait_for(&signals, timeout, Signal::is_idle)?;
		let index = library.query().snapshot();
		library.join()?;

		let empty_folders = index
			.listing()
			.iter()
			.filter(|row| row.is_placeholder())
			.count();
		Ok(Outcome::Synced(SyncSummary {
			project,
			parts: index.len() - empty_folders,
			empty_folders,
			folders: index.folder_count(),
			built: index.is_built(),
			index_file,
		}))
	}

	fn stored_index(&self) -> Result<PartIndex> {
		let file = IndexFile::new(self.config.engine.index_file());
		file.read()?.ok_or_else(|| {
			anyhow!(
				"no index at {}; run `cots-index sync` first",
				file.path().display()
			)
		})
	}

	fn list(self, folder: Option<&str>, placeholders: bool) -> Result<Outcome> {
		let index = self.stored_index()?;
		let prefix = folder.map(normalize_folder_path);
		let mut rows: Vec<PartListing> = index
			.listing()
			.into_iter()
			.filter(|row| placeholders || !row.is_placeholder())
			.filter(|row| prefix.as_deref().is_none_or(|prefix| row.path.starts_with(prefix)))
			.collect();
		sort_listing(&mut rows);
		Ok(Outcome::Listing(rows))
	}

	fn find(self, query: &str, limit: usize) -> Result<Outcome> {
		let index = self.stored_index()?;
		let mut rows = index.listing();
		sort_listing(&mut rows);
		Ok(Outcome::Found(find_parts(&rows, query, limit)))
	}

	fn browse(self, path: &str, timeout: Duration) -> Result<Outcome> {
		let path = normalize_folder_path(path);
		let (library, signals) = self.spawn(self.config.engine.clone())?;
		let deadline = Instant::now() + timeout;

		wait_for(&signals, remaining(deadline), Signal::is_idle)?;
		if !library.load_folder(&path)? {
			library.join()?;
			bail!("folder '{path}' does not exist in the project");
		}
		wait_for(&signals, remaining(deadline), Signal::is_idle)?;

		let index = library.query().snapshot();
		library.join()?;

		let folders = index.child_paths(&path).into_iter().collect();
		let mut parts: Vec<PartListing> = index
			.ids_at(&path)
			.iter()
			.filter_map(|id| {
				let record = index.get(id)?;
				(!record.is_placeholder()).then(|| PartListing {
					path: record.path.clone(),
					name: record.name.clone(),
					id: id.clone(),
					icon: record.icon.clone(),
				})
			})
			.collect();
		sort_listing(&mut parts);
		Ok(Outcome::Folder(FolderView {
			path,
			folders,
			parts,
		}))
	}

	fn get(self, path: &str, id: &str) -> Result<Outcome> {
		let (library, signals) = self.spawn(self.config.engine.clone())?;
		wait_for(&signals, Duration::from_secs(60), |signal| {
			matches!(signal, Signal::Update)
		})?;
		let file = library
			.data_file(path, id)
			.with_context(|| format!("failed to look up '{id}' in '{path}'"))?;
		library.join()?;
		Ok(Outcome::File {
			path: normalize_folder_path(path),
			id: id.to_string(),
			file,
		})
	}
}

fn remaining(deadline: Instant) -> Duration {
	deadline.saturating_duration_since(Instant::now())
}

/// Consume signals until one satisfies `done`. Builder failures and
/// timeouts are errors.
fn wait_for(
	signals: &SignalReceiver,
	timeout: Duration,
	done: impl Fn(&Signal) -> bool,
) -> Result<()> {
	let deadline = Instant::now() + timeout;
	loop {
		let envelope = match signals.next_timeout(remaining(deadline)) {
			Ok(envelope) => envelope,
			Err(RecvTimeoutError::Timeout) => {
				bail!("timed out after {}s waiting for the indexer", timeout.as_secs())
			}
			Err(RecvTimeoutError::Disconnected) => bail!("index builder stopped unexpectedly"),
		};
		let signal = envelope.message;
		if let Signal::Error(message) = &signal {
			bail!("index builder failed: {message}");
		}
		if done(&signal) {
			return Ok(());
		}
		match &signal {
			Signal::Status(text) => info!(seq = envelope.seq, "{text}"),
			other => debug!(seq = envelope.seq, signal = ?other, "indexer signal"),
		}
	}
}
