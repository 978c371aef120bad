//! Named, immutable stopword tables keyed by id.
//!
//! The active id is part of any fingerprint that depends on filtering (the
//! anchor engine's `BookView`/`AsrView` construction), so these tables must
//! never change shape under an existing id — add a new id instead.

use once_cell::sync::Lazy;
use std::collections::HashSet;

pub const DEFAULT_STOPWORD_SET_ID: &str = "en-basic";

static EN_BASIC: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "a", "an", "and", "are", "as", "at", "be", "but", "by", "for", "if", "in", "into", "is",
        "it", "no", "not", "of", "on", "or", "such", "that", "the", "their", "then", "there",
        "these", "they", "this", "to", "was", "will", "with", "he", "she", "his", "her", "i",
        "you", "we", "them", "had", "has", "have", "were", "been", "being", "do", "does", "did",
        "so", "up", "out", "about", "from", "its", "our", "your", "all",
    ]
    .into_iter()
    .collect()
});

/// Looks up a stopword set by id. Returns `None` for unknown ids so callers
/// can fail fast (a typo'd config value should not silently disable filtering).
pub fn stopword_set(id: &str) -> Option<&'static HashSet<&'static str>> {
    match id {
        "en-basic" => Some(&EN_BASIC),
        _ => None,
    }
}
