//! TextGrid data model (§3): Praat word-tier intervals.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextGridWord {
    pub text: String,
    pub start_sec: f64,
    pub end_sec: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TextGridDocument {
    pub words: Vec<TextGridWord>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MergeReport {
    pub textgrid_tokens: usize,
    pub book_tokens: usize,
    pub pairs: usize,
    pub matches: usize,
    pub wild_matches: usize,
    pub insertions: usize,
    pub deletions: usize,
    pub words_updated: usize,
    pub sentences_updated: usize,
}
