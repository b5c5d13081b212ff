//! Helpers for the slash-delimited folder paths used as index keys.
//!
//! A normalized path starts and ends with `/`; the root is `/` and a folder
//! `Gears` below it is `/Gears/`. Joining a child name onto a normalized path
//! therefore never needs separator bookkeeping.

pub const ROOT_PATH: &str = "/";

/// Normalize `path` into the `/A/B/` form, accepting backslashes and missing
/// leading or trailing separators. `.` segments are dropped; `..` is kept so
/// that [`is_relative_segment`] can reject it.
#[must_use]
pub fn normalize(path: &str) -> String {
	let segments: Vec<&str> = path
		.split(['/', '\\'])
		.filter(|segment| !segment.is_empty() && *segment != ".")
		.collect();
	if segments.is_empty() {
		ROOT_PATH.to_string()
	} else {
		format!("/{}/", segments.join("/"))
	}
}

/// Whether `segment` refers to the current or parent folder instead of a
/// child by name.
#[must_use]
pub fn is_relative_segment(segment: &str) -> bool {
	segment == "." || segment == ".."
}

/// Path of the child folder `name` below the normalized `parent`.
#[must_use]
pub fn join(parent: &str, name: &str) -> String {
	format!("{parent}{name}/")
}

/// Segments of a normalized path, outermost first.
pub fn segments(path: &str) -> impl Iterator<Item = &str> {
	path.split('/').filter(|segment| !segment.is_empty())
}

/// Parent of a normalized path, `None` for the root.
#[must_use]
pub fn parent(path: &str) -> Option<String> {
	let trimmed = path.trim_end_matches('/');
	if trimmed.is_empty() {
		return None;
	}
	trimmed
		.rfind('/')
		.map(|index| trimmed[..=index].to_string())
}

/// Last segment of a normalized path, empty for the root.
#[must_use]
pub fn leaf_name(path: &str) -> &str {
	segments(path).last().unwrap_or_default()
}

/// The immediate child of `parent` that contains `path`.
///
/// Returns `None` when `path` is `parent` itself or lies outside it.
#[must_use]
pub fn immediate_child(parent: &str, path: &str) -> Option<String> {
	let rest = path.strip_prefix(parent)?;
	let name = rest.split('/').next().filter(|name| !name.is_empty())?;
	Some(join(parent, name))
}

/// Whether `path` is `prefix` or lies below it.
#[must_use]
pub fn is_within(prefix: &str, path: &str) -> bool {
	path.starts_with(prefix)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn normalize_accepts_loose_input() {
		assert_eq!(normalize(""), "/");
		assert_eq!(normalize("/"), "/");
		assert_eq!(normalize("Gears"), "/Gears/");
		assert_eq!(normalize("/Gears/Spur"), "/Gears/Spur/");
		assert_eq!(normalize("\\Gears\\Spur\\"), "/Gears/Spur/");
		assert_eq!(normalize("//Gears//"), "/Gears/");
		assert_eq!(normalize("/./Gears/./Spur/"), "/Gears/Spur/");
		assert_eq!(normalize("/Gears/../"), "/Gears/../");
		assert!(segments(&normalize("/../Secret")).any(is_relative_segment));
	}

	#[test]
	fn parent_walks_towards_root() {
		assert_eq!(parent("/Gears/Spur/").as_deref(), Some("/Gears/"));
		assert_eq!(parent("/Gears/").as_deref(), Some("/"));
		assert_eq!(parent("/"), None);
	}

	#[test]
	fn immediate_child_picks_first_segment_below_parent() {
		assert_eq!(
			immediate_child("/", "/Gears/Spur/").as_deref(),
			Some("/Gears/")
		);
		assert_eq!(
			immediate_child("/Gears/", "/Gears/Spur/Big/").as_deref(),
			Some("/Gears/Spur/")
		);
		assert_eq!(immediate_child("/Gears/", "/Gears/"), None);
		assert_eq!(immediate_child("/Gears/", "/Motors/"), None);
	}

	#[test]
	fn prefix_match_respects_segment_boundaries() {
		assert!(is_within("/Gears/", "/Gears/Spur/"));
		assert!(!is_within("/Gear/", "/Gears/"));
		assert_eq!(leaf_name("/Gears/Spur/"), "Spur");
		assert_eq!(leaf_name("/"), "");
	}
}
