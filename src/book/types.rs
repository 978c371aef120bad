//! Core `BookIndex` data model: the word/sentence/paragraph/section
//! representation of a book, as described in §3.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookWord {
    pub index: u32,
    pub text: String,
    pub sentence_index: u32,
    pub paragraph_index: u32,
    pub section_index: u32,
    pub char_start: Option<u32>,
    pub char_end: Option<u32>,
    pub phoneme: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WordRange {
    pub start_word: u32,
    /// Inclusive.
    pub end_word: u32,
}

impl WordRange {
    pub fn len(&self) -> u32 {
        self.end_word.saturating_sub(self.start_word) + 1
    }

    pub fn is_empty(&self) -> bool {
        self.end_word < self.start_word
    }

    pub fn contains(&self, word_index: u32) -> bool {
        word_index >= self.start_word && word_index <= self.end_word
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookSentence {
    pub index: u32,
    pub range: WordRange,
    pub title: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookParagraph {
    pub index: u32,
    pub range: WordRange,
    pub title: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookSection {
    pub index: u32,
    pub range: WordRange,
    pub title: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookTotals {
    pub words: u32,
    pub sentences: u32,
    pub paragraphs: u32,
    pub est_duration_sec: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookIndex {
    pub source_file: String,
    pub totals: BookTotals,
    pub words: Vec<BookWord>,
    pub sentences: Vec<BookSentence>,
    pub paragraphs: Vec<BookParagraph>,
    pub sections: Vec<BookSection>,
    pub normalization_version: u32,
}

impl BookIndex {
    /// Which sentence a given global word index falls in, via binary search
    /// over sentence ranges (ranges are contiguous and non-overlapping by
    /// construction, so this is well-defined).
    pub fn sentence_for_word(&self, word_index: u32) -> Option<&BookSentence> {
        self.sentences
            .binary_search_by(|s| {
                if word_index < s.range.start_word {
                    std::cmp::Ordering::Greater
                } else if word_index > s.range.end_word {
                    std::cmp::Ordering::Less
                } else {
                    std::cmp::Ordering::Equal
                }
            })
            .ok()
            .map(|i| &self.sentences[i])
    }

    pub fn words_in_range(&self, range: WordRange) -> &[BookWord] {
        let start = range.start_word as usize;
        let end = (range.end_word as usize + 1).min(self.words.len());
        if start >= self.words.len() || start >= end {
            return &[];
        }
        &self.words[start..end]
    }
}
