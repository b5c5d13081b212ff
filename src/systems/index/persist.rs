use std::collections::BTreeMap;
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use cots_store_api::ProjectInfo;
use serde::{Deserialize, Serialize};

use super::{PartIndex, PartRecord};

/// On-disk shape of the index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexDocument {
	pub built: bool,
	pub project: ProjectInfo,
	pub parts: BTreeMap<String, PartRecord>,
	#[serde(default)]
	pub paths: BTreeMap<String, Vec<String>>,
}

impl PartIndex {
	#[must_use]
	pub fn to_document(&self) -> IndexDocument {
		IndexDocument {
			built: self.built,
			project: self.project.clone(),
			parts: self.parts.clone(),
			paths: self
				.paths
				.iter()
				.map(|(path, ids)| (path.clone(), ids.iter().cloned().collect()))
				.collect(),
		}
	}

	/// Rebuild an index from a document. The path table is derived from the
	/// part records so the two can never disagree after loading.
	#[must_use]
	pub fn from_document(document: IndexDocument) -> Self {
		let mut index = Self::empty(document.project);
		for (id, record) in document.parts {
			index.upsert(&id, record);
		}
		index.built = document.built;
		index.revision = 0;
		index
	}
}

/// Result of reading the index file for a given project.
#[derive(Debug)]
pub enum LoadOutcome {
	Loaded(PartIndex),
	Missing,
	Malformed(String),
	ProjectMismatch { found: ProjectInfo },
}

impl LoadOutcome {
	/// The loaded index, or a fresh one for `project` in every other case.
	#[must_use]
	pub fn into_index(self, project: &ProjectInfo) -> PartIndex {
		match self {
			Self::Loaded(index) => index,
			_ => PartIndex::empty(project.clone()),
		}
	}
}

/// Location of the persisted index.
#[derive(Debug, Clone)]
pub struct IndexFile {
	path: PathBuf,
}

impl IndexFile {
	pub fn new(path: impl Into<PathBuf>) -> Self {
		Self { path: path.into() }
	}

	#[must_use]
	pub fn path(&self) -> &Path {
		&self.path
	}

	/// Load the index if it exists, parses and belongs to `project`.
	#[must_use]
	pub fn load(&self, project: &ProjectInfo) -> LoadOutcome {
		let document = match self.read_document() {
			Ok(Some(document)) => document,
			Ok(None) => return LoadOutcome::Missing,
			Err(err) => return LoadOutcome::Malformed(format!("{err:#}")),
		};
		if &document.project != project {
			return LoadOutcome::ProjectMismatch {
				found: document.project,
			};
		}
		LoadOutcome::Loaded(PartIndex::from_document(document))
	}

	/// Read the index without checking which project it belongs to.
	pub fn read(&self) -> Result<Option<PartIndex>> {
		Ok(self.read_document()?.map(PartIndex::from_document))
	}

	fn read_document(&self) -> Result<Option<IndexDocument>> {
		let bytes = match fs::read(&self.path) {
			Ok(bytes) => bytes,
			Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
			Err(err) => {
				return Err(err)
					.with_context(|| format!("failed to read index file: {}", self.path.display()));
			}
		};
		let document = serde_json::from_slice(&bytes)
			.with_context(|| format!("failed to parse index file: {}", self.path.display()))?;
		Ok(Some(document))
	}

	/// Replace the index file with `document`, writing through a temporary
	/// sibling so a crash never leaves a truncated file behind.
	pub fn save(&self, document: &IndexDocument) -> Result<()> {
		if let Some(parent) = self.path.parent() {
			fs::create_dir_all(parent)
				.with_context(|| format!("failed to create index directory: {}", parent.display()))?;
		}
		let data = serde_json::to_vec(document).context("failed to serialize part index")?;
		let tmp_path = self.path.with_extension("tmp");
		{
			let mut file = fs::File::create(&tmp_path)
				.with_context(|| format!("failed to create index file: {}", tmp_path.display()))?;
			file.write_all(&data)
				.with_context(|| format!("failed to write index file: {}", tmp_path.display()))?;
			file.sync_all()
				.with_context(|| format!("failed to sync index file: {}", tmp_path.display()))?;
		}

		fs::rename(&tmp_path, &self.path).with_context(|| {
			format!(
				"failed to move index file from {} to {}",
				tmp_path.display(),
				self.path.display()
			)
		})?;

		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn project() -> ProjectInfo {
		ProjectInfo::new("FRC_COTS", "p1")
	}

	fn populated() -> PartIndex {
		let mut index = PartIndex::empty(project());
		index.upsert(
			"abc123",
			PartRecord {
				path: "/Gears/".into(),
				name: "Gear16T".into(),
				version: 3,
				icon: "icons/_Gears_Gear16T.png".into(),
			},
		);
		index.add_placeholder("/Empty/");
		index.mark_built();
		index
	}

	#[test]
	fn saved_index_loads_back_for_same_project() {
		let temp = tempfile::tempdir().expect("tempdir");
		let file = IndexFile::new(temp.path().join("db").join("parts_db.json"));
		let index = populated();
		file.save(&index.to_document()).expect("save");

		let LoadOutcome::Loaded(loaded) = file.load(&project()) else {
			panic!("expected a loaded index");
		};
		assert!(loaded.is_built());
		assert_eq!(loaded.get("abc123"), index.get("abc123"));
		assert!(loaded.has_placeholder("/Empty/"));
		assert_eq!(loaded.revision(), 0);
		loaded.verify().expect("consistent");
		assert!(!temp.path().join("db").join("parts_db.tmp").exists());
	}

	#[test]
	fn failed_writes_are_reported() {
		let temp = tempfile::tempdir().expect("tempdir");
		let occupied = temp.path().join("parts_db.json");
		fs::create_dir_all(occupied.join("keep")).expect("blocking directory");
		let err = IndexFile::new(&occupied)
			.save(&populated().to_document())
			.unwrap_err();
		assert!(format!("{err:#}").contains("failed to move index file"), "{err:#}");

		let blocked = temp.path().join("file");
		fs::write(&blocked, b"not a directory").expect("blocking file");
		let err = IndexFile::new(blocked.join("db").join("parts_db.json"))
			.save(&populated().to_document())
			.unwrap_err();
		assert!(format!("{err:#}").contains("failed to create index directory"), "{err:#}");
	}

	#[test]
	fn other_project_is_rejected() {
		let temp = tempfile::tempdir().expect("tempdir");
		let file = IndexFile::new(temp.path().join("parts_db.json"));
		file.save(&populated().to_document()).expect("save");

		let other = ProjectInfo::new("FRC_COTS", "p2");
		let outcome = file.load(&other);
		assert!(matches!(outcome, LoadOutcome::ProjectMismatch { ref found } if found.id == "p1"));
		let fresh = outcome.into_index(&other);
		assert!(fresh.is_empty());
		assert!(!fresh.is_built());
		assert_eq!(fresh.project(), &other);
	}

	#[test]
	fn unreadable_documents_are_reported_as_malformed() {
		let temp = tempfile::tempdir().expect("tempdir");
		let path = temp.path().join("parts_db.json");
		fs::write(&path, b"{ not json").expect("write");
		let file = IndexFile::new(&path);
		assert!(matches!(file.load(&project()), LoadOutcome::Malformed(_)));
		assert!(matches!(
			IndexFile::new(temp.path().join("absent.json")).load(&project()),
			LoadOutcome::Missing
		));
	}

	#[test]
	fn stale_path_table_is_rebuilt_from_parts() {
		let mut document = populated().to_document();
		document
			.paths
			.insert("/Ghost/".into(), vec!["nobody".into()]);
		document.paths.remove("/Gears/");
		let index = PartIndex::from_document(document);
		index.verify().expect("consistent");
		assert_eq!(index.ids_at("/Gears/"), vec!["abc123".to_string()]);
		assert!(index.ids_at("/Ghost/").is_empty());
	}
}
