//! Parses Praat "long text format" TextGrid files (UTF-8), extracting the
//! word-tier intervals (§4.6). Non-word tiers (e.g. a phone tier) are
//! ignored; silences (empty-text intervals) are dropped.

use super::types::{TextGridDocument, TextGridWord};
use crate::error::PipelineError;
use std::path::Path;

#[derive(PartialEq)]
enum Awaiting {
    None,
    Xmax,
    Text,
}

fn parse_quoted(line: &str) -> Option<String> {
    let first = line.find('"')?;
    let last = line.rfind('"')?;
    if last <= first {
        return None;
    }
    Some(line[first + 1..last].to_string())
}

fn parse_number_after_eq(line: &str) -> Option<f64> {
    let (_, rest) = line.split_once('=')?;
    rest.trim().trim_end_matches(|c: char| c == ' ').parse::<f64>().ok()
}

/// Parses a TextGrid document from its raw text. The target tier is the
/// first `IntervalTier` named (case-insensitively) "words" or "word"; if no
/// tier is so named, the first `IntervalTier` encountered is used.
pub fn parse_text_grid_str(contents: &str) -> Result<TextGridDocument, PipelineError> {
    let mut words = Vec::new();
    let mut named_target: Option<bool> = None; // Some(true) once we've locked onto a named tier.
    let mut in_candidate_tier = false;
    let mut is_interval_tier = false;

    let mut awaiting = Awaiting::None;
    let mut cur_xmin = 0.0f64;
    let mut cur_xmax = 0.0f64;

    for raw_line in contents.lines() {
        let line = raw_line.trim();

        if line.starts_with("item [") {
            in_candidate_tier = named_target != Some(true);
            is_interval_tier = false;
            awaiting = Awaiting::None;
            continue;
        }
        if line.starts_with("class") {
            is_interval_tier = parse_quoted(line).map(|c| c == "IntervalTier").unwrap_or(false);
            continue;
        }
        if line.starts_with("name") {
            if let Some(name) = parse_quoted(line) {
                let is_word_tier = name.eq_ignore_ascii_case("words") || name.eq_ignore_ascii_case("word");
                if is_word_tier && is_interval_tier {
                    named_target = Some(true);
                    in_candidate_tier = true;
                } else if named_target != Some(true) {
                    in_candidate_tier = is_interval_tier;
                } else {
                    in_candidate_tier = false;
                }
            }
            continue;
        }
        if !in_candidate_tier || !is_interval_tier {
            continue;
        }

        if line.starts_with("intervals [") {
            awaiting = Awaiting::Xmax; // next xmin belongs to this interval, then xmax, then text
            continue;
        }
        match awaiting {
            Awaiting::Xmax if line.starts_with("xmin") => {
                if let Some(v) = parse_number_after_eq(line) {
                    cur_xmin = v;
                }
            }
            Awaiting::Xmax if line.starts_with("xmax") => {
                if let Some(v) = parse_number_after_eq(line) {
                    cur_xmax = v;
                    awaiting = Awaiting::Text;
                }
            }
            Awaiting::Text if line.starts_with("text") => {
                if let Some(text) = parse_quoted(line) {
                    if !text.trim().is_empty() {
                        words.push(TextGridWord { text, start_sec: cur_xmin, end_sec: cur_xmax });
                    }
                }
                awaiting = Awaiting::None;
            }
            _ => {}
        }
    }

    Ok(TextGridDocument { words })
}

pub fn parse_text_grid(path: &Path) -> Result<TextGridDocument, PipelineError> {
    let contents = std::fs::read_to_string(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            PipelineError::InputMissing { path: path.to_path_buf() }
        } else {
            PipelineError::IOError(e)
        }
    })?;
    parse_text_grid_str(&contents)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
File type = "ooTextFile"
Object class = "TextGrid"

xmin = 0
xmax = 2
tiers? <exists>
size = 2
item []:
    item [1]:
        class = "IntervalTier"
        name = "words"
        xmin = 0
        xmax = 2
        intervals: size = 3
        intervals [1]:
            xmin = 0
            xmax = 0.4
            text = ""
        intervals [2]:
            xmin = 0.4
            xmax = 0.9
            text = "hello"
        intervals [3]:
            xmin = 0.9
            xmax = 1.5
            text = "world"
    item [2]:
        class = "IntervalTier"
        name = "phones"
        xmin = 0
        xmax = 2
        intervals: size = 1
        intervals [1]:
            xmin = 0
            xmax = 2
            text = "sil"
"#;

    #[test]
    fn parses_word_tier_and_skips_silence() {
        let doc = parse_text_grid_str(SAMPLE).unwrap();
        assert_eq!(doc.words.len(), 2);
        assert_eq!(doc.words[0].text, "hello");
        assert_eq!(doc.words[0].start_sec, 0.4);
        assert_eq!(doc.words[1].text, "world");
    }

    #[test]
    fn ignores_non_word_tiers() {
        let doc = parse_text_grid_str(SAMPLE).unwrap();
        assert!(doc.words.iter().all(|w| w.text != "sil"));
    }

    #[test]
    fn missing_file_is_input_missing() {
        let err = parse_text_grid(std::path::Path::new("/nonexistent.TextGrid")).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::InputMissing);
    }
}
