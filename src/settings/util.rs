use std::path::PathBuf;

use anyhow::Result;
use cots_index::app_dirs;

/// Normalize a user supplied file extension: no leading dot, lowercase.
pub(super) fn sanitize_extension(value: &str) -> String {
	value.trim().trim_start_matches('.').to_ascii_lowercase()
}

/// Replace a leading `~` with the user's home directory.
pub(super) fn expand_home(path: PathBuf) -> Result<PathBuf> {
	let Ok(rest) = path.strip_prefix("~") else {
		return Ok(path);
	};
	Ok(app_dirs::get_home_dir()?.join(rest))
}
