use std::path::{Path, PathBuf};

const DIGEST_LEN: usize = 16;
pub const THUMBNAIL_EXTENSION: &str = "png";

/// Keep only ASCII alphanumerics and underscores.
#[must_use]
pub fn sanitize_part_name(name: &str) -> String {
	name.chars()
		.filter(|ch| ch.is_ascii_alphanumeric() || *ch == '_')
		.collect()
}

/// Replace path separators with underscores and drop every other character
/// [`sanitize_part_name`] would drop.
#[must_use]
pub fn flatten_path(path: &str) -> String {
	path.chars()
		.filter_map(|ch| match ch {
			'/' | '\\' => Some('_'),
			ch if ch.is_ascii_alphanumeric() || ch == '_' => Some(ch),
			_ => None,
		})
		.collect()
}

/// File name of the cached image for the part `name` in folder `path`.
///
/// The readable prefix is lossy, so a digest of the untouched inputs is
/// appended to keep distinct parts from sharing a file.
#[must_use]
pub fn thumbnail_file_name(path: &str, name: &str) -> String {
	let mut hasher = blake3::Hasher::new();
	hasher.update(path.as_bytes());
	hasher.update(&[0]);
	hasher.update(name.as_bytes());
	let digest = hasher.finalize().to_hex();
	format!(
		"{}{}-{}.{THUMBNAIL_EXTENSION}",
		flatten_path(path),
		sanitize_part_name(name),
		&digest.as_str()[..DIGEST_LEN]
	)
}

/// Full location of the cached image inside `icons_dir`.
#[must_use]
pub fn thumbnail_path(icons_dir: &Path, path: &str, name: &str) -> PathBuf {
	icons_dir.join(thumbnail_file_name(path, name))
}
