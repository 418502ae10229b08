//! Location matching inside free-form lines.

use std::ops::Range;

use crate::services::locations::{LocationIndex, LocationTarget, normalize_key};

/// Find the entities a line talks about.
///
/// Keys are tried longest first. Each key claims at most its first occurrence
/// that stands as a whole word and does not overlap a span claimed earlier,
/// so "Київська область" shadows "Київ" inside the same text.
pub fn match_locations(line: &str, index: &LocationIndex) -> Vec<LocationTarget> {
    let haystack = normalize_key(line);
    let mut matches = Vec::new();
    if haystack.is_empty() {
        return matches;
    }

    let mut claimed: Vec<Range<usize>> = Vec::new();

    for key in index.keys_by_length() {
        let Some(span) = first_free_occurrence(&haystack, key, &claimed) else {
            continue;
        };
        if let Some(targets) = index.lookup(key) {
            matches.extend(targets.iter().cloned());
        }
        claimed.push(span);
    }

    matches
}

fn first_free_occurrence(haystack: &str, key: &str, claimed: &[Range<usize>]) -> Option<Range<usize>> {
    let mut from = 0;
    while from <= haystack.len() {
        let start = from + haystack[from..].find(key)?;
        let end = start + key.len();

        if is_word_bounded(haystack, start, end) && !overlaps(claimed, start, end) {
            return Some(start..end);
        }

        // Step one character past the rejected start.
        from = start + haystack[start..].chars().next().map_or(1, char::len_utf8);
    }
    None
}

fn is_word_bounded(haystack: &str, start: usize, end: usize) -> bool {
    let before = haystack[..start].chars().next_back();
    let after = haystack[end..].chars().next();
    !before.is_some_and(char::is_alphabetic) && !after.is_some_and(char::is_alphabetic)
}

fn overlaps(claimed: &[Range<usize>], start: usize, end: usize) -> bool {
    claimed
        .iter()
        .any(|span| start < span.end && end > span.start)
}
