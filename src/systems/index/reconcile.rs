use std::collections::HashSet;

use cots_store_api::RemoteFile;

use super::{PartIndex, PartRecord};

/// Freshly listed contents of one folder.
#[derive(Debug, Clone, Copy)]
pub struct FolderContents<'a> {
	pub path: &'a str,
	/// Paths of the immediate child folders.
	pub children: &'a [String],
	/// Part files directly inside the folder.
	pub files: &'a [RemoteFile],
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileReport {
	pub upserted: usize,
	pub removed: usize,
	pub placeholders_added: usize,
	pub placeholders_removed: usize,
}

impl ReconcileReport {
	#[must_use]
	pub fn changed(&self) -> bool {
		*self != Self::default()
	}
}

/// Bring the index entries for one folder in line with its listing.
///
/// `icon_for` maps a `(path, name)` pair to the icon location stored with the
/// part. Entries for files that vanished from the folder, and every entry
/// below a child folder that vanished, are removed. Child folders with nothing
/// indexed receive a placeholder, and the folder itself carries one exactly
/// when it has neither files nor child folders.
pub fn reconcile(
	index: &mut PartIndex,
	contents: FolderContents<'_>,
	icon_for: impl Fn(&str, &str) -> String,
) -> ReconcileReport {
	let mut report = ReconcileReport::default();
	let path = contents.path;

	for file in contents.files {
		let record = PartRecord {
			path: path.to_string(),
			name: file.name.clone(),
			version: file.version,
			icon: icon_for(path, &file.name),
		};
		if index.upsert(&file.id, record) {
			report.upserted += 1;
		}
	}

	let listed: HashSet<&str> = contents.files.iter().map(|file| file.id.as_str()).collect();
	for id in index.ids_at(path) {
		let is_placeholder = index.get(&id).is_some_and(PartRecord::is_placeholder);
		if !is_placeholder && !listed.contains(id.as_str()) && index.remove(&id).is_some() {
			report.removed += 1;
		}
	}

	let children: HashSet<&str> = contents.children.iter().map(String::as_str).collect();
	for child in index.child_paths(path) {
		if !children.contains(child.as_str()) {
			report.removed += index.remove_subtree(&child);
		}
	}

	for child in contents.children {
		if !index.has_entries_under(child) && index.add_placeholder(child) {
			report.placeholders_added += 1;
		}
	}

	if contents.files.is_empty() && contents.children.is_empty() {
		if index.add_placeholder(path) {
			report.placeholders_added += 1;
		}
	} else if index.remove_placeholder(path) {
		report.placeholders_removed += 1;
	}

	report
}

#[cfg(test)]
mod tests {
	use cots_store_api::ProjectInfo;

	use super::*;

	fn part(id: &str, name: &str, version: u64) -> RemoteFile {
		RemoteFile {
			id: id.to_string(),
			name: name.to_string(),
			extension: Some("f3d".to_string()),
			version,
			locator: format!("/{name}.f3d"),
		}
	}

	fn icon(path: &str, name: &str) -> String {
		format!("icons{}{name}.png", path.replace('/', "_"))
	}

	fn index() -> PartIndex {
		PartIndex::empty(ProjectInfo::new("P", "1"))
	}

	#[test]
	fn files_are_indexed_and_reapplying_is_a_no_op() {
		let mut index = index();
		let files = vec![part("abc123", "Gear16T", 3)];
		let contents = FolderContents {
			path: "/Gears/",
			children: &[],
			files: &files,
		};
		let first = reconcile(&mut index, contents, icon);
		assert_eq!(first.upserted, 1);
		let entry = index.get("abc123").expect("indexed");
		assert_eq!(entry.path, "/Gears/");
		assert_eq!(entry.version, 3);
		assert_eq!(entry.icon, "icons_Gears_Gear16T.png");

		let revision = index.revision();
		assert!(!reconcile(&mut index, contents, icon).changed());
		assert_eq!(index.revision(), revision);
	}

	#[test]
	fn vanished_files_are_removed_but_placeholders_are_managed_separately() {
		let mut index = index();
		let files = vec![part("a", "A", 1), part("b", "B", 1)];
		reconcile(
			&mut index,
			FolderContents { path: "/X/", children: &[], files: &files },
			icon,
		);
		let remaining = vec![part("a", "A", 1)];
		let report = reconcile(
			&mut index,
			FolderContents { path: "/X/", children: &[], files: &remaining },
			icon,
		);
		assert_eq!(report.removed, 1);
		assert!(index.get("b").is_none());
		assert!(!index.has_placeholder("/X/"));

		let report = reconcile(
			&mut index,
			FolderContents { path: "/X/", children: &[], files: &[] },
			icon,
		);
		assert_eq!(report.removed, 1);
		assert_eq!(report.placeholders_added, 1);
		assert_eq!(index.ids_at("/X/"), vec!["/X/_placeholder_".to_string()]);
	}

	#[test]
	fn empty_children_get_placeholders_and_vanished_children_are_pruned() {
		let mut index = index();
		index.upsert(
			"deep",
			PartRecord {
				path: "/Old/Deeper/".into(),
				name: "Deep".into(),
				version: 1,
				icon: String::new(),
			},
		);
		let children = vec!["/New/".to_string()];
		let report = reconcile(
			&mut index,
			FolderContents { path: "/", children: &children, files: &[] },
			icon,
		);
		assert_eq!(report.removed, 1);
		assert_eq!(report.placeholders_added, 1);
		assert!(index.get("deep").is_none());
		assert!(index.has_placeholder("/New/"));
		assert!(!index.has_placeholder("/"));
		index.verify().expect("consistent");
	}

	#[test]
	fn placeholder_disappears_once_content_arrives() {
		let mut index = index();
		reconcile(
			&mut index,
			FolderContents { path: "/Y/", children: &[], files: &[] },
			icon,
		);
		assert!(index.has_placeholder("/Y/"));

		let files = vec![part("p", "P", 1)];
		let report = reconcile(
			&mut index,
			FolderContents { path: "/Y/", children: &[], files: &files },
			icon,
		);
		assert_eq!(report.placeholders_removed, 1);
		assert!(!index.has_placeholder("/Y/"));
		assert!(index.get("p").is_some());
	}

	#[test]
	fn moved_file_follows_its_new_folder() {
		let mut index = index();
		let files = vec![part("m", "Motor", 1)];
		reconcile(
			&mut index,
			FolderContents { path: "/A/", children: &[], files: &files },
			icon,
		);
		reconcile(
			&mut index,
			FolderContents { path: "/B/", children: &[], files: &files },
			icon,
		);
		assert_eq!(index.get("m").map(|entry| entry.path.as_str()), Some("/B/"));
		assert!(index.ids_at("/A/").is_empty());
		index.verify().expect("consistent");
	}
}
