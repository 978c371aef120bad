//! Builds a [`BookIndex`] from parsed book text plus structural hints (§4.2).

use super::parser::ParseResult;
use super::types::{BookIndex, BookParagraph, BookSection, BookSentence, BookTotals, BookWord, WordRange};
use crate::error::PipelineError;
use crate::text::NORMALIZATION_VERSION;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BookIndexConfig {
    pub average_wpm: f64,
    /// Fallback regexes tried, in order, when the parser supplied no
    /// heading hints at all — e.g. a plain-text manuscript with no
    /// Markdown headings and no "Chapter N" lines recognizable by the
    /// parser's own heuristics.
    pub section_fallback_patterns: Vec<String>,
}

impl Default for BookIndexConfig {
    fn default() -> Self {
        Self {
            average_wpm: 200.0,
            section_fallback_patterns: vec![
                r"(?im)^\s*(chapter|part|book)\s+[0-9ivxlc]+".to_string(),
                r"(?im)^\s*[0-9]+\s*$".to_string(),
            ],
        }
    }
}

static HONORIFICS: Lazy<HashSet<&'static str>> =
    Lazy::new(|| ["mr", "mrs", "ms", "dr", "st", "jr", "sr", "prof", "mme", "messrs", "capt", "gen", "rev"].into_iter().collect());

struct RawToken {
    text: String,
    char_start: u32,
    char_end: u32,
}

fn tokenize_with_offsets(full_text: &str) -> Vec<RawToken> {
    let mut tokens = Vec::new();
    let mut iter = full_text.char_indices().peekable();
    let mut current_start: Option<usize> = None;

    while let Some(&(i, c)) = iter.peek() {
        if c.is_whitespace() {
            if let Some(start) = current_start.take() {
                tokens.push(RawToken { text: full_text[start..i].to_string(), char_start: start as u32, char_end: i as u32 });
            }
            iter.next();
        } else {
            if current_start.is_none() {
                current_start = Some(i);
            }
            iter.next();
        }
    }
    if let Some(start) = current_start {
        tokens.push(RawToken { text: full_text[start..].to_string(), char_start: start as u32, char_end: full_text.len() as u32 });
    }
    tokens
}

/// True if `token` looks like it ends a sentence: ends with `.`/`!`/`?` and
/// is not an abbreviation (a trailing single letter + `.`, or a known
/// honorific).
fn ends_sentence(token: &str) -> bool {
    let Some(last) = token.chars().last() else { return false };
    if last != '.' && last != '!' && last != '?' {
        return false;
    }
    if last == '.' {
        let stem = token.trim_end_matches('.');
        if stem.chars().count() == 1 && stem.chars().next().map(|c| c.is_alphabetic()).unwrap_or(false) {
            return false;
        }
        let lower_stem = stem.to_lowercase();
        if HONORIFICS.contains(lower_stem.as_str()) {
            return false;
        }
    }
    true
}

fn paragraph_index_for_offset(offset: u32, breaks: &[u32]) -> u32 {
    match breaks.binary_search(&offset) {
        Ok(i) => i as u32,
        Err(0) => 0,
        Err(i) => (i - 1) as u32,
    }
}

fn section_index_for_offset(offset: u32, section_starts: &[u32]) -> u32 {
    match section_starts.binary_search(&offset) {
        Ok(i) => i as u32,
        Err(0) => 0,
        Err(i) => (i - 1) as u32,
    }
}

/// Builds the `BookIndex`. Never silently drops text: every non-whitespace
/// token in `full_text` becomes exactly one `BookWord`.
pub fn build_book_index(source_file: &str, parsed: &ParseResult, config: &BookIndexConfig) -> Result<BookIndex, PipelineError> {
    let tokens = tokenize_with_offsets(&parsed.full_text);
    if tokens.is_empty() {
        return Err(PipelineError::InputInvalid {
            source_file: source_file.to_string(),
            location: String::new(),
            message: "book text contains no words".to_string(),
        });
    }

    let mut section_starts: Vec<u32> = parsed.structure_hints.headings.iter().map(|h| h.char_offset).collect();
    if section_starts.is_empty() || section_starts[0] != 0 {
        section_starts.insert(0, 0);
    }
    section_starts.sort_unstable();
    section_starts.dedup();

    if parsed.structure_hints.headings.is_empty() {
        for pattern in &config.section_fallback_patterns {
            let re = Regex::new(pattern).map_err(|e| PipelineError::InputInvalid {
                source_file: source_file.to_string(),
                location: String::new(),
                message: format!("invalid section_fallback_patterns regex `{pattern}`: {e}"),
            })?;
            let mut found = vec![0u32];
            for m in re.find_iter(&parsed.full_text) {
                found.push(m.start() as u32);
            }
            found.sort_unstable();
            found.dedup();
            if found.len() > 1 {
                section_starts = found;
                break;
            }
        }
    }

    let mut paragraph_breaks = parsed.structure_hints.paragraph_breaks.clone();
    if paragraph_breaks.is_empty() || paragraph_breaks[0] != 0 {
        paragraph_breaks.insert(0, 0);
    }
    paragraph_breaks.sort_unstable();
    paragraph_breaks.dedup();

    let mut words = Vec::with_capacity(tokens.len());
    let mut sentences = Vec::new();
    let mut sentence_start_word = 0u32;
    let mut current_sentence_index = 0u32;

    for (i, tok) in tokens.iter().enumerate() {
        let word_index = i as u32;
        let paragraph_index = paragraph_index_for_offset(tok.char_start, &paragraph_breaks);
        let section_index = section_index_for_offset(tok.char_start, &section_starts);

        words.push(BookWord {
            index: word_index,
            text: tok.text.clone(),
            sentence_index: current_sentence_index,
            paragraph_index,
            section_index,
            char_start: Some(tok.char_start),
            char_end: Some(tok.char_end),
            phoneme: None,
        });

        let is_last_token = i + 1 == tokens.len();
        if ends_sentence(&tok.text) || is_last_token {
            sentences.push(BookSentence {
                index: current_sentence_index,
                range: WordRange { start_word: sentence_start_word, end_word: word_index },
                title: None,
            });
            sentence_start_word = word_index + 1;
            current_sentence_index += 1;
        }
    }

    let paragraphs = rollup_ranges(&words, |w| w.paragraph_index)
        .into_iter()
        .enumerate()
        .map(|(i, range)| BookParagraph { index: i as u32, range, title: None })
        .collect();

    let sections = rollup_ranges(&words, |w| w.section_index)
        .into_iter()
        .enumerate()
        .map(|(i, range)| {
            let title = parsed
                .structure_hints
                .headings
                .iter()
                .find(|h| section_index_for_offset(h.char_offset, &section_starts) == i as u32)
                .map(|h| h.title.clone());
            BookSection { index: i as u32, range, title }
        })
        .collect();

    let total_words = words.len() as u32;
    let est_duration_sec = if config.average_wpm > 0.0 { (total_words as f64 / config.average_wpm) * 60.0 } else { 0.0 };

    Ok(BookIndex {
        source_file: source_file.to_string(),
        totals: BookTotals {
            words: total_words,
            sentences: sentences.len() as u32,
            paragraphs: paragraphs.len() as u32,
            est_duration_sec,
        },
        words,
        sentences,
        paragraphs,
        sections,
        normalization_version: NORMALIZATION_VERSION,
    })
}

/// Groups consecutive words sharing the same key into contiguous,
/// non-overlapping `WordRange`s, in word-index order. Relies on `key`
/// being monotonically non-decreasing as written by the builder above.
fn rollup_ranges<F: Fn(&BookWord) -> u32>(words: &[BookWord], key: F) -> Vec<WordRange> {
    let mut ranges = Vec::new();
    let mut current_key = None;
    let mut start = 0u32;

    for w in words {
        let k = key(w);
        match current_key {
            None => {
                current_key = Some(k);
                start = w.index;
            }
            Some(prev) if prev != k => {
                ranges.push(WordRange { start_word: start, end_word: w.index - 1 });
                current_key = Some(k);
                start = w.index;
            }
            _ => {}
        }
    }
    if let Some(last) = words.last() {
        ranges.push(WordRange { start_word: start, end_word: last.index });
    }
    ranges
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::book::parser::StructureHints;

    fn parse(full_text: &str) -> ParseResult {
        ParseResult { full_text: full_text.to_string(), structure_hints: StructureHints::default() }
    }

    #[test]
    fn splits_two_sentences() {
        let parsed = parse("Hello world. Goodbye cruel world.");
        let idx = build_book_index("book.txt", &parsed, &BookIndexConfig::default()).unwrap();
        assert_eq!(idx.totals.words, 5);
        assert_eq!(idx.sentences.len(), 2);
        assert_eq!(idx.sentences[0].range, WordRange { start_word: 0, end_word: 1 });
        assert_eq!(idx.sentences[1].range, WordRange { start_word: 2, end_word: 4 });
    }

    #[test]
    fn abbreviation_does_not_split_sentence() {
        let parsed = parse("Dr. Smith arrived early. He left.");
        let idx = build_book_index("book.txt", &parsed, &BookIndexConfig::default()).unwrap();
        assert_eq!(idx.sentences.len(), 2);
        assert_eq!(idx.sentences[0].range.end_word, 3); // "Dr. Smith arrived early." (4 words, 0..3)
    }

    #[test]
    fn single_letter_initial_does_not_split_sentence() {
        let parsed = parse("J. R. Tolkien wrote it. The end.");
        let idx = build_book_index("book.txt", &parsed, &BookIndexConfig::default()).unwrap();
        assert_eq!(idx.sentences.len(), 2);
    }

    #[test]
    fn ranges_are_contiguous_and_cover_all_words() {
        let parsed = parse("One two. Three four five. Six.");
        let idx = build_book_index("book.txt", &parsed, &BookIndexConfig::default()).unwrap();
        let mut expected_next = 0;
        for s in &idx.sentences {
            assert_eq!(s.range.start_word, expected_next);
            expected_next = s.range.end_word + 1;
        }
        assert_eq!(expected_next, idx.totals.words);
    }

    #[test]
    fn paragraph_breaks_partition_sentences() {
        let mut hints = StructureHints::default();
        let full_text = "First paragraph sentence. Second paragraph sentence.";
        let break_offset = full_text.find("Second").unwrap() as u32;
        hints.paragraph_breaks = vec![0, break_offset];
        let parsed = ParseResult { full_text: full_text.to_string(), structure_hints: hints };
        let idx = build_book_index("book.txt", &parsed, &BookIndexConfig::default()).unwrap();
        assert_eq!(idx.paragraphs.len(), 2);
    }

    #[test]
    fn section_fallback_regex_detects_chapters_when_no_headings() {
        let full_text = "Chapter 1\nFirst line here.\nChapter 2\nSecond line here.";
        let parsed = parse(full_text);
        let idx = build_book_index("book.txt", &parsed, &BookIndexConfig::default()).unwrap();
        assert_eq!(idx.sections.len(), 2);
    }

    #[test]
    fn empty_text_is_input_invalid() {
        let parsed = parse("   \n  ");
        let err = build_book_index("book.txt", &parsed, &BookIndexConfig::default()).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::InputInvalid);
    }

    #[test]
    fn est_duration_uses_average_wpm() {
        let parsed = parse("one two three four five six seven eight nine ten");
        let mut config = BookIndexConfig::default();
        config.average_wpm = 100.0;
        let idx = build_book_index("book.txt", &parsed, &config).unwrap();
        assert!((idx.totals.est_duration_sec - 6.0).abs() < 1e-9);
    }
}
