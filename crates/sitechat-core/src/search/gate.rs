//! Client-side keyword gate
//!
//! Keyword matching here is a precision aid, not a hard filter: when no
//! candidate passes, the ungated candidates go through unchanged.

use super::Candidate;

/// With at least this many terms every term must appear (AND); below it one
/// hit suffices (OR). Kept for compatibility with existing deployments; tune
/// with care.
pub const REQUIRE_ALL_MIN_TERMS: usize = 2;

/// Keep candidates whose text contains the query terms.
///
/// Matching is a case-insensitive substring test. Order is preserved and the
/// result is never empty when `candidates` is non-empty.
pub fn keyword_gate(candidates: Vec<Candidate>, terms: &[String]) -> Vec<Candidate> {
    if candidates.is_empty() || terms.is_empty() {
        return candidates;
    }

    let terms: Vec<String> = terms.iter().map(|t| t.to_lowercase()).collect();
    let require_all = terms.len() >= REQUIRE_ALL_MIN_TERMS;

    let keep: Vec<bool> = candidates
        .iter()
        .map(|c| {
            let text = c.text.to_lowercase();
            let hits = terms.iter().filter(|t| text.contains(t.as_str())).count();
            if require_all {
                hits == terms.len()
            } else {
                hits >= 1
            }
        })
        .collect();

    if !keep.contains(&true) {
        tracing::debug!(
            "Keyword gate matched none of {} candidates, passing all through",
            candidates.len()
        );
        return candidates;
    }

    candidates
        .into_iter()
        .zip(keep)
        .filter_map(|(c, k)| k.then_some(c))
        .collect()
}
