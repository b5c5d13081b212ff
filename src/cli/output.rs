use anyhow::Result;
use serde_json::{Value, json};

use crate::workflow::Outcome;

/// Print a plain-text representation of the outcome.
pub(crate) fn print_plain(outcome: &Outcome) {
	match outcome {
		Outcome::Synced(summary) => {
			println!("Project: {}", summary.project);
			println!("  Parts: {}", summary.parts);
			println!("  Empty folders: {}", summary.empty_folders);
			println!("  Folders with entries: {}", summary.folders);
			println!("  Complete: {}", if summary.built { "yes" } else { "no" });
			println!("  Index: {}", summary.index_file.display());
		}
		Outcome::Listing(rows) => {
			if rows.is_empty() {
				println!("No parts indexed");
			}
			for row in rows {
				println!("{}\t{}", row.location(), row.id);
			}
		}
		Outcome::Found(hits) => {
			if hits.is_empty() {
				println!("No matches");
			}
			for hit in hits {
				println!("{:>5}  {}\t{}", hit.score, hit.part.location(), hit.part.id);
			}
		}
		Outcome::Folder(view) => {
			println!("{}", view.path);
			for folder in &view.folders {
				println!("  [dir] {folder}");
			}
			for part in &view.parts {
				println!("  {}\t{}", part.name, part.id);
			}
		}
		Outcome::File { path, id, file } => match file {
			Some(file) => println!("{}\t{}\tv{}", file.locator, file.id, file.version),
			None => println!("No part '{id}' in {path}"),
		},
	}
}

/// Format the outcome as a JSON value.
pub(crate) fn outcome_json(outcome: &Outcome) -> Result<Value> {
	let value = match outcome {
		Outcome::Synced(summary) => json!({ "type": "sync", "summary": summary }),
		Outcome::Listing(rows) => json!({ "type": "list", "parts": rows }),
		Outcome::Found(hits) => {
			let matches: Vec<Value> = hits
				.iter()
				.map(|hit| json!({ "score": hit.score, "part": hit.part }))
				.collect();
			json!({ "type": "find", "matches": matches })
		}
		Outcome::Folder(view) => json!({ "type": "browse", "folder": view }),
		Outcome::File { path, id, file } => json!({
			"type": "get",
			"path": path,
			"id": id,
			"file": serde_json::to_value(file)?,
		}),
	};
	Ok(value)
}

/// Print the JSON representation of the outcome.
pub(crate) fn print_json(outcome: &Outcome) -> Result<()> {
	println!("{}", serde_json::to_string_pretty(&outcome_json(outcome)?)?);
	Ok(())
}

#[cfg(test)]
mod tests {
	use cots_index::{FoundPart, PartListing};
	use cots_store_api::RemoteFile;

	use super::*;

	fn gear() -> PartListing {
		PartListing {
			path: "/Gears/".into(),
			name: "Gear16T".into(),
			id: "abc123".into(),
			icon: "icons/_Gears_Gear16T.png".into(),
		}
	}

	#[test]
	fn json_find_includes_score_and_part() {
		let outcome = Outcome::Found(vec![FoundPart {
			score: 42,
			part: gear(),
		}]);
		let value = outcome_json(&outcome).expect("json");
		assert_eq!(value["type"], "find");
		assert_eq!(value["matches"][0]["score"], 42);
		assert_eq!(value["matches"][0]["part"]["id"], "abc123");
	}

	#[test]
	fn json_get_reports_missing_file_as_null() {
		let outcome = Outcome::File {
			path: "/Gears/".into(),
			id: "nope".into(),
			file: None,
		};
		let value = outcome_json(&outcome).expect("json");
		assert!(value["file"].is_null());

		let outcome = Outcome::File {
			path: "/Gears/".into(),
			id: "abc123".into(),
			file: Some(RemoteFile {
				id: "abc123".into(),
				name: "Gear16T".into(),
				extension: Some("f3d".into()),
				version: 3,
				locator: "/Gears/Gear16T.f3d".into(),
			}),
		};
		let value = outcome_json(&outcome).expect("json");
		assert_eq!(value["file"]["version"], 3);
	}
}
