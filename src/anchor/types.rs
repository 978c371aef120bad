//! Anchor data model (§3): stable sync points between book and ASR token
//! streams used to bound the windowed DP aligner.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Anchor {
    #[serde(rename = "bookPosition", alias = "book_position")]
    pub book_position: u32,
    #[serde(rename = "asrPosition", alias = "asr_position")]
    pub asr_position: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnchorPolicyConfig {
    pub ngram_n: usize,
    /// Either an absolute token count (`target_per_tokens`) or, when set, a
    /// ratio of anchors per content token (`target_density_ratio`). Only one
    /// is consulted; `target_density_ratio` wins when both are non-zero.
    pub target_per_tokens: u32,
    pub target_density_ratio: f64,
    pub min_separation: u32,
    pub stopword_set_id: String,
    pub disallow_boundary_cross: bool,
}

impl Default for AnchorPolicyConfig {
    fn default() -> Self {
        Self {
            ngram_n: 3,
            target_per_tokens: 50,
            target_density_ratio: 0.0,
            min_separation: 5,
            stopword_set_id: crate::text::DEFAULT_STOPWORD_SET_ID.to_string(),
            disallow_boundary_cross: false,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnchorStats {
    pub candidates_found: usize,
    pub candidates_selected: usize,
    pub ngram_n_used: usize,
    pub relaxed: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WordRangeInclusive {
    pub start: u32,
    pub end: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnchorDocument {
    pub anchors: Vec<Anchor>,
    pub policy: AnchorPolicyConfig,
    pub stats: AnchorStats,
    pub section_range_words: Option<WordRangeInclusive>,
}

impl AnchorDocument {
    /// Checks the invariants from §3: strictly increasing on both axes, the
    /// synthetic `(0,0)` anchor present first, minimum separation honored.
    pub fn validate(&self) -> Result<(), String> {
        match self.anchors.first() {
            Some(a) if a.book_position == 0 && a.asr_position == 0 => {}
            _ => return Err("first anchor must be the synthetic (0,0) anchor".to_string()),
        }
        for w in self.anchors.windows(2) {
            let (a, b) = (w[0], w[1]);
            if b.book_position <= a.book_position || b.asr_position <= a.asr_position {
                return Err(format!("anchors not strictly increasing: {a:?} -> {b:?}"));
            }
            if b.book_position - a.book_position < self.policy.min_separation
                || b.asr_position - a.asr_position < self.policy.min_separation
            {
                return Err(format!("anchors {a:?} -> {b:?} violate min_separation {}", self.policy.min_separation));
            }
        }
        Ok(())
    }
}
