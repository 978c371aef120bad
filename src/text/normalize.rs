//! Deterministic, versioned token normalization.
//!
//! Algorithm (§4.1): Unicode NFKC, casefold to lower, fold curly/typographic
//! apostrophes to ASCII `'`, strip leading/trailing punctuation, drop tokens
//! that are purely punctuation.

use super::stopwords::{self, DEFAULT_STOPWORD_SET_ID};
use crate::error::PipelineError;
use unicode_normalization::UnicodeNormalization;

/// Bumped whenever the normalization algorithm changes in an
/// observable way; persisted on `BookIndex` and folded into fingerprints
/// that depend on normalized text.
pub const NORMALIZATION_VERSION: u32 = 1;

const CURLY_APOSTROPHES: [char; 4] = ['\u{2018}', '\u{2019}', '\u{201B}', '\u{FF07}'];

/// Normalizes a single token per the five-step algorithm. Returns `None` if
/// the token is purely punctuation after folding (step 5).
pub fn normalize_token(raw: &str) -> Result<Option<String>, PipelineError> {
    // `nfkc()` operates over valid `char`s already guaranteed by `&str`;
    // invalid-UTF-8 input is rejected at the I/O boundary before reaching
    // here, so `InvalidToken`-equivalent failures never occur past this
    // point in practice. The Result is kept so adapters that hand us raw
    // bytes (e.g. the document parser) have somewhere to surface that.
    let nfkc: String = raw.nfkc().collect();
    let lower = nfkc.to_lowercase();
    let folded: String = lower
        .chars()
        .map(|c| if CURLY_APOSTROPHES.contains(&c) { '\'' } else { c })
        .collect();
    let trimmed = folded
        .trim_matches(|c: char| c.is_ascii_punctuation() && c != '\'')
        .to_string();
    if trimmed.is_empty() || trimmed.chars().all(|c| !c.is_alphanumeric()) {
        return Ok(None);
    }
    Ok(Some(trimmed))
}

/// True iff `raw` normalizes to a non-empty token that is not in the given
/// stopword set — i.e. it is "content" per §4.1.
pub fn is_content_token(raw: &str, stopword_set_id: &str) -> bool {
    match normalize_token(raw) {
        Ok(Some(norm)) => {
            let set = stopwords::stopword_set(stopword_set_id).unwrap_or_else(|| {
                stopwords::stopword_set(DEFAULT_STOPWORD_SET_ID).expect("default set exists")
            });
            !set.contains(norm.as_str())
        }
        _ => false,
    }
}
