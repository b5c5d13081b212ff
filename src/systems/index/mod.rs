//! The persisted part index.
//!
//! Two maps are kept in step: `parts` from file identity to its record and
//! `paths` from folder path to the identities listed there. Every mutation
//! goes through methods that update both, and each change bumps a revision
//! counter the scheduler uses to decide when to flush or notify.

mod persist;
mod reconcile;

use std::collections::{BTreeMap, BTreeSet};
use std::ops::Bound;

use cots_store_api::ProjectInfo;
use serde::{Deserialize, Serialize};

use super::tree::path;

pub use persist::{IndexDocument, IndexFile, LoadOutcome};
pub use reconcile::{FolderContents, ReconcileReport, reconcile};

/// Name given to the marker that keeps an empty folder visible.
pub const PLACEHOLDER_NAME: &str = "_placeholder_";

/// One indexed part, or a placeholder for an empty folder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartRecord {
	pub path: String,
	pub name: String,
	pub version: u64,
	/// Local image path for the part; empty for placeholders.
	pub icon: String,
}

impl PartRecord {
	#[must_use]
	pub fn is_placeholder(&self) -> bool {
		self.name == PLACEHOLDER_NAME
	}
}

/// Row of the sorted listing handed to consumers.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct PartListing {
	pub path: String,
	pub name: String,
	pub id: String,
	pub icon: String,
}

impl PartListing {
	#[must_use]
	pub fn is_placeholder(&self) -> bool {
		self.name == PLACEHOLDER_NAME
	}

	/// Full display location, `path` followed by `name`.
	#[must_use]
	pub fn location(&self) -> String {
		format!("{}{}", self.path, self.name)
	}
}

/// Identity of the placeholder entry for the folder at `path`.
#[must_use]
pub fn placeholder_id(path: &str) -> String {
	format!("{path}{PLACEHOLDER_NAME}")
}

#[derive(Debug, Clone, Default)]
pub struct PartIndex {
	built: bool,
	project: ProjectInfo,
	parts: BTreeMap<String, PartRecord>,
	paths: BTreeMap<String, BTreeSet<String>>,
	revision: u64,
}

impl PartIndex {
	/// Empty, unbuilt index for `project`.
	#[must_use]
	pub fn empty(project: ProjectInfo) -> Self {
		Self {
			project,
			..Self::default()
		}
	}

	#[must_use]
	pub fn project(&self) -> &ProjectInfo {
		&self.project
	}

	/// Whether a full crawl has completed at least once.
	#[must_use]
	pub fn is_built(&self) -> bool {
		self.built
	}

	pub fn mark_built(&mut self) {
		if !self.built {
			self.built = true;
			self.touch();
		}
	}

	/// Counter bumped by every effective mutation. Not persisted.
	#[must_use]
	pub fn revision(&self) -> u64 {
		self.revision
	}

	fn touch(&mut self) {
		self.revision = self.revision.wrapping_add(1);
	}

	#[must_use]
	pub fn len(&self) -> usize {
		self.parts.len()
	}

	#[must_use]
	pub fn is_empty(&self) -> bool {
		self.parts.is_empty()
	}

	#[must_use]
	pub fn get(&self, id: &str) -> Option<&PartRecord> {
		self.parts.get(id)
	}

	/// Insert or replace the record for `id`, moving it between folders if
	/// its path changed. Returns whether anything changed.
	pub fn upsert(&mut self, id: &str, record: PartRecord) -> bool {
		if self.parts.get(id) == Some(&record) {
			return false;
		}
		let moved_from = self
			.parts
			.get(id)
			.map(|previous| previous.path.clone())
			.filter(|previous| *previous != record.path);
		if let Some(old_path) = moved_from {
			self.unlink(&old_path, id);
		}
		self.paths
			.entry(record.path.clone())
			.or_default()
			.insert(id.to_string());
		self.parts.insert(id.to_string(), record);
		self.touch();
		true
	}

	pub fn remove(&mut self, id: &str) -> Option<PartRecord> {
		let record = self.parts.remove(id)?;
		self.unlink(&record.path, id);
		self.touch();
		Some(record)
	}

	fn unlink(&mut self, path: &str, id: &str) {
		if let Some(ids) = self.paths.get_mut(path) {
			ids.remove(id);
			if ids.is_empty() {
				self.paths.remove(path);
			}
		}
	}

	pub fn add_placeholder(&mut self, path: &str) -> bool {
		self.upsert(
			&placeholder_id(path),
			PartRecord {
				path: path.to_string(),
				name: PLACEHOLDER_NAME.to_string(),
				version: 0,
				icon: String::new(),
			},
		)
	}

	pub fn remove_placeholder(&mut self, path: &str) -> bool {
		self.remove(&placeholder_id(path)).is_some()
	}

	#[must_use]
	pub fn has_placeholder(&self, path: &str) -> bool {
		self.parts.contains_key(&placeholder_id(path))
	}

	/// Identities recorded directly at `path`.
	#[must_use]
	pub fn ids_at(&self, path: &str) -> Vec<String> {
		self.paths
			.get(path)
			.map(|ids| ids.iter().cloned().collect())
			.unwrap_or_default()
	}

	/// Whether anything, placeholders included, is recorded at or below
	/// `prefix`.
	#[must_use]
	pub fn has_entries_under(&self, prefix: &str) -> bool {
		self.paths
			.range::<str, _>(starting_at(prefix))
			.next()
			.is_some_and(|(key, _)| path::is_within(prefix, key))
	}

	/// Immediate child folders of `parent` that have entries in the index.
	#[must_use]
	pub fn child_paths(&self, parent: &str) -> BTreeSet<String> {
		self.paths
			.range::<str, _>(starting_at(parent))
			.map(|(key, _)| key)
			.take_while(|key| path::is_within(parent, key))
			.filter_map(|key| path::immediate_child(parent, key))
			.collect()
	}

	/// Drop every entry at or below `prefix`. Returns how many were removed.
	pub fn remove_subtree(&mut self, prefix: &str) -> usize {
		let doomed: Vec<String> = self
			.paths
			.range::<str, _>(starting_at(prefix))
			.take_while(|(key, _)| path::is_within(prefix, key))
			.flat_map(|(_, ids)| ids.iter().cloned())
			.collect();
		for id in &doomed {
			self.remove(id);
		}
		doomed.len()
	}

	/// Every entry as a listing row, in identity order.
	#[must_use]
	pub fn listing(&self) -> Vec<PartListing> {
		self.parts
			.iter()
			.map(|(id, record)| PartListing {
				path: record.path.clone(),
				name: record.name.clone(),
				id: id.clone(),
				icon: record.icon.clone(),
			})
			.collect()
	}

	/// Number of distinct folders with entries.
	#[must_use]
	pub fn folder_count(&self) -> usize {
		self.paths.len()
	}

	/// Check that both maps describe the same entries.
	pub fn verify(&self) -> Result<(), String> {
		for (id, record) in &self.parts {
			let linked = self
				.paths
				.get(&record.path)
				.is_some_and(|ids| ids.contains(id));
			if !linked {
				return Err(format!("part '{id}' is missing from path '{}'", record.path));
			}
		}
		for (folder, ids) in &self.paths {
			if ids.is_empty() {
				return Err(format!("path '{folder}' has an empty identity set"));
			}
			for id in ids {
				match self.parts.get(id) {
					Some(record) if &record.path == folder => {}
					Some(record) => {
						return Err(format!(
							"part '{id}' listed under '{folder}' but recorded at '{}'",
							record.path
						));
					}
					None => return Err(format!("path '{folder}' lists unknown part '{id}'")),
				}
			}
		}
		Ok(())
	}
}

fn starting_at(start: &str) -> (Bound<&str>, Bound<&str>) {
	(Bound::Included(start), Bound::Unbounded)
}

/// Sort listing rows by location, then identity.
pub fn sort_listing(rows: &mut [PartListing]) {
	rows.sort_by(|a, b| {
		a.path
			.cmp(&b.path)
			.then_with(|| a.name.cmp(&b.name))
			.then_with(|| a.id.cmp(&b.id))
	});
}

#[cfg(test)]
mod tests {
	use super::*;

	fn record(path: &str, name: &str, version: u64) -> PartRecord {
		PartRecord {
			path: path.to_string(),
			name: name.to_string(),
			version,
			icon: format!("icons/{name}.png"),
		}
	}

	fn index() -> PartIndex {
		PartIndex::empty(ProjectInfo::new("FRC_COTS", "p1"))
	}

	#[test]
	fn identical_upsert_is_not_a_change() {
		let mut index = index();
		assert!(index.upsert("a", record("/Gears/", "Gear", 1)));
		let revision = index.revision();
		assert!(!index.upsert("a", record("/Gears/", "Gear", 1)));
		assert_eq!(index.revision(), revision);
		assert!(index.upsert("a", record("/Gears/", "Gear", 2)));
		assert!(index.revision() > revision);
	}

	#[test]
	fn moving_a_part_relinks_its_path() {
		let mut index = index();
		index.upsert("a", record("/Gears/", "Gear", 1));
		index.upsert("a", record("/Spur/", "Gear", 1));
		assert!(index.ids_at("/Gears/").is_empty());
		assert_eq!(index.ids_at("/Spur/"), vec!["a".to_string()]);
		assert_eq!(index.folder_count(), 1);
		index.verify().expect("consistent");
	}

	#[test]
	fn placeholder_uses_path_derived_identity() {
		let mut index = index();
		assert!(index.add_placeholder("/Empty/"));
		let entry = index.get("/Empty/_placeholder_").expect("placeholder");
		assert!(entry.is_placeholder());
		assert_eq!(entry.version, 0);
		assert!(entry.icon.is_empty());
		assert!(index.remove_placeholder("/Empty/"));
		assert!(!index.has_entries_under("/Empty/"));
	}

	#[test]
	fn subtree_removal_respects_segment_boundaries() {
		let mut index = index();
		index.upsert("a", record("/Gears/", "A", 1));
		index.upsert("b", record("/Gears/Spur/", "B", 1));
		index.upsert("c", record("/GearsExtra/", "C", 1));
		assert_eq!(index.remove_subtree("/Gears/"), 2);
		assert!(index.get("c").is_some());
		assert!(!index.has_entries_under("/Gears/"));
		assert!(index.has_entries_under("/GearsExtra/"));
		index.verify().expect("consistent");
	}

	#[test]
	fn child_paths_collapse_to_immediate_children() {
		let mut index = index();
		index.upsert("a", record("/Gears/Spur/Big/", "A", 1));
		index.upsert("b", record("/Gears/Bevel/", "B", 1));
		index.upsert("c", record("/Gears/", "C", 1));
		index.upsert("d", record("/Motors/", "D", 1));
		let children: Vec<String> = index.child_paths("/Gears/").into_iter().collect();
		assert_eq!(children, vec!["/Gears/Bevel/".to_string(), "/Gears/Spur/".to_string()]);
		assert_eq!(index.child_paths("/").len(), 2);
	}

	#[test]
	fn listing_sorts_by_location() {
		let mut index = index();
		index.upsert("z", record("/B/", "Alpha", 1));
		index.upsert("y", record("/A/", "Zed", 1));
		index.upsert("x", record("/A/", "Bolt", 1));
		let mut rows = index.listing();
		sort_listing(&mut rows);
		let names: Vec<String> = rows.iter().map(PartListing::location).collect();
		assert_eq!(names, vec!["/A/Bolt", "/A/Zed", "/B/Alpha"]);
	}
}
