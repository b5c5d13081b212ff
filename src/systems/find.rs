//! Fuzzy lookup of parts by name over a listing snapshot.

use frizbee::{Options, match_list};

use super::index::PartListing;

/// Listings at least this long are prefiltered with a typo budget.
const PREFILTER_ENABLE_THRESHOLD: usize = 1_000;

/// A listing row that matched a query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FoundPart {
	pub score: u16,
	pub part: PartListing,
}

/// Matching options for `query` against `dataset_len` names.
fn options_for_query(query: &str, dataset_len: usize) -> Options {
	let length = query.chars().count();
	let mut allowed_typos: u16 = match length {
		0 | 1 => 0,
		2..=4 => 1,
		5..=7 => 2,
		_ => 3,
	};
	if let Ok(max_reasonable) = u16::try_from(length.saturating_sub(1)) {
		allowed_typos = allowed_typos.min(max_reasonable);
	}

	let prefilter = dataset_len >= PREFILTER_ENABLE_THRESHOLD;
	Options {
		prefilter,
		max_typos: prefilter.then_some(allowed_typos),
		sort: false,
		..Options::default()
	}
}

/// Rank the non-placeholder rows of `rows` by how well their name matches
/// `query`, best first. An empty query keeps the listing order.
#[must_use]
pub fn find_parts(rows: &[PartListing], query: &str, limit: usize) -> Vec<FoundPart> {
	let parts: Vec<&PartListing> = rows.iter().filter(|row| !row.is_placeholder()).collect();
	let query = query.trim();
	if query.is_empty() {
		return parts
			.into_iter()
			.take(limit)
			.map(|part| FoundPart {
				score: 0,
				part: part.clone(),
			})
			.collect();
	}

	let haystacks: Vec<&str> = parts.iter().map(|part| part.name.as_str()).collect();
	let options = options_for_query(query, haystacks.len());
	let mut found: Vec<FoundPart> = match_list(query, &haystacks, options)
		.into_iter()
		.filter(|entry| entry.score > 0)
		.map(|entry| FoundPart {
			score: entry.score,
			part: parts[entry.index_in_haystack as usize].clone(),
		})
		.collect();

	found.sort_by(|a, b| {
		b.score
			.cmp(&a.score)
			.then_with(|| a.part.path.cmp(&b.part.path))
			.then_with(|| a.part.name.cmp(&b.part.name))
	});
	found.truncate(limit);
	found
}
