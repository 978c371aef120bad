//! Two-pointer greedy merge of TextGrid word timings into a hydrated
//! transcript (§4.6).

use super::types::{MergeReport, TextGridDocument};
use crate::book::{BookIndex, WordRange};
use crate::rollup::{HydratedTranscript, TranscriptIndex};
use crate::text::normalize_token;
use crate::timing::{enforce_monotonicity, SentenceTiming, TimingRange};

pub const DEFAULT_WILD_MATCH_WINDOW: usize = 3;

struct Pair {
    book_global_index: u32,
    start_sec: f64,
    end_sec: f64,
}

/// Greedily pairs TextGrid words against book words within `window` lookahead
/// on either side before giving up on a pair. Returns the matched pairs plus
/// match/insertion/deletion counters for the report.
fn greedy_match(tg: &TextGridDocument, book_words: &[(u32, String)], window: usize) -> (Vec<Pair>, usize, usize, usize, usize) {
    let tg_norm: Vec<Option<String>> = tg.words.iter().map(|w| normalize_token(&w.text).ok().flatten()).collect();
    let book_norm: Vec<&str> = book_words.iter().map(|(_, n)| n.as_str()).collect();

    let mut pairs = Vec::new();
    let mut matches = 0usize;
    let mut wild_matches = 0usize;
    let mut insertions = 0usize;
    let mut deletions = 0usize;

    let mut i = 0usize;
    let mut bj = 0usize;

    while i < tg.words.len() && bj < book_words.len() {
        let Some(tg_word) = tg_norm[i].as_deref() else {
            insertions += 1;
            i += 1;
            continue;
        };

        if tg_word == book_norm[bj] {
            pairs.push(Pair { book_global_index: book_words[bj].0, start_sec: tg.words[i].start_sec, end_sec: tg.words[i].end_sec });
            matches += 1;
            i += 1;
            bj += 1;
            continue;
        }

        let book_ahead = (1..=window).find(|&k| bj + k < book_words.len() && book_norm[bj + k] == tg_word);
        if let Some(k) = book_ahead {
            deletions += k;
            bj += k;
            pairs.push(Pair { book_global_index: book_words[bj].0, start_sec: tg.words[i].start_sec, end_sec: tg.words[i].end_sec });
            wild_matches += 1;
            i += 1;
            bj += 1;
            continue;
        }

        let tg_ahead = (1..=window).find(|&k| i + k < tg.words.len() && tg_norm[i + k].as_deref() == Some(book_norm[bj]));
        if let Some(k) = tg_ahead {
            insertions += k;
            i += k;
            pairs.push(Pair { book_global_index: book_words[bj].0, start_sec: tg.words[i].start_sec, end_sec: tg.words[i].end_sec });
            wild_matches += 1;
            i += 1;
            bj += 1;
            continue;
        }

        // Neither pointer finds a match within the window: give up on this
        // pair and advance the TextGrid pointer, deferring the book word's
        // fate to the end-of-scan leftover accounting below.
        insertions += 1;
        i += 1;
    }
    deletions += book_words.len() - bj;

    (pairs, matches, wild_matches, insertions, deletions)
}

/// Applies TextGrid timings to `hydrated` (always) and `transcript` (when
/// `apply_to_transcript`), restricted to `chapter_window` if given, then
/// enforces monotonicity across the full sentence sequence.
pub fn merge_text_grid(
    tg: &TextGridDocument,
    book: &BookIndex,
    hydrated: &mut HydratedTranscript,
    transcript: &mut TranscriptIndex,
    chapter_window: Option<WordRange>,
    wild_match_window: usize,
    apply_to_transcript: bool,
) -> MergeReport {
    let book_words: Vec<(u32, String)> = book
        .words
        .iter()
        .filter(|w| chapter_window.map(|r| r.contains(w.index)).unwrap_or(true))
        .filter_map(|w| normalize_token(&w.text).ok().flatten().map(|n| (w.index, n)))
        .collect();

    let (pairs, matches, wild_matches, insertions, deletions) = greedy_match(tg, &book_words, wild_match_window);

    let mut words_updated = 0usize;
    for pair in &pairs {
        for sentence in hydrated.sentences.iter_mut() {
            for word in sentence.words.iter_mut() {
                if word.op.book_idx() == Some(pair.book_global_index) {
                    word.start_sec = Some(pair.start_sec);
                    word.end_sec = Some(pair.end_sec);
                    word.duration_sec = Some((pair.end_sec - pair.start_sec).max(0.0));
                    words_updated += 1;
                }
            }
        }
    }

    let mut sentences_updated = 0usize;
    for sentence in hydrated.sentences.iter_mut() {
        let mut union = TimingRange::UNKNOWN;
        let mut touched = false;
        for word in &sentence.words {
            if let (Some(start), Some(end)) = (word.start_sec, word.end_sec) {
                union = union.union(&TimingRange::new(start, end));
                touched = true;
            }
        }
        if touched && union != sentence.timing {
            sentence.timing = union;
            sentences_updated += 1;
        }
    }

    let mut timings: Vec<SentenceTiming> = hydrated
        .sentences
        .iter()
        .map(|s| SentenceTiming { range: s.timing, fragment_backed: true, confidence: None })
        .collect();
    enforce_monotonicity(&mut timings);
    for (sentence, timing) in hydrated.sentences.iter_mut().zip(timings.iter()) {
        sentence.timing = timing.range;
    }

    if apply_to_transcript {
        for ts in transcript.sentences.iter_mut() {
            if let Some(h) = hydrated.sentences.iter().find(|h| h.id == ts.id) {
                ts.timing = h.timing;
            }
        }
    }

    MergeReport {
        textgrid_tokens: tg.words.len(),
        book_tokens: book_words.len(),
        pairs: pairs.len(),
        matches,
        wild_matches,
        insertions,
        deletions,
        words_updated,
        sentences_updated,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::align::WordOp;
    use crate::asr::{AsrResponse, AsrToken};
    use crate::book::{build_book_index, parser::ParseResult, parser::StructureHints, BookIndexConfig};
    use crate::rollup::build_transcript_index;
    use crate::rollup::hydrate;
    use crate::textgrid::types::TextGridWord;

    fn now() -> chrono::DateTime<chrono::Utc> {
        chrono::DateTime::from_timestamp(1_700_000_000, 0).unwrap()
    }

    fn setup() -> (BookIndex, AsrResponse, TranscriptIndex, HydratedTranscript) {
        let parsed = ParseResult { full_text: "hello world.".to_string(), structure_hints: StructureHints::default() };
        let book = build_book_index("book.txt", &parsed, &BookIndexConfig::default()).unwrap();
        let asr = AsrResponse {
            model_version: "t".into(),
            tokens: vec![
                AsrToken { start_sec: 0.0, duration_sec: 0.3, text: "hello".into() },
                AsrToken { start_sec: 0.3, duration_sec: 0.3, text: "world.".into() },
            ],
            segments: None,
        };
        let ops = vec![
            WordOp::Match { book_idx: 0, asr_idx: 0, score: 1.0 },
            WordOp::Match { book_idx: 1, asr_idx: 1, score: 1.0 },
        ];
        let transcript = build_transcript_index("a.wav", "s.json", "b.json", &book, &asr, ops, "dp_window", now()).unwrap();
        let hydrated = hydrate(&transcript, &book, &asr, now());
        (book, asr, transcript, hydrated)
    }

    #[test]
    fn exact_match_overwrites_word_timing() {
        let (book, _asr, mut transcript, mut hydrated) = setup();
        let tg = TextGridDocument {
            words: vec![
                TextGridWord { text: "hello".into(), start_sec: 0.05, end_sec: 0.42 },
                TextGridWord { text: "world".into(), start_sec: 0.42, end_sec: 0.91 },
            ],
        };
        let report = merge_text_grid(&tg, &book, &mut hydrated, &mut transcript, None, DEFAULT_WILD_MATCH_WINDOW, true);
        assert_eq!(report.matches, 2);
        assert_eq!(report.words_updated, 2);
        assert_eq!(hydrated.sentences[0].words[0].start_sec, Some(0.05));
        assert_eq!(transcript.sentences[0].timing.start, 0.05);
    }

    #[test]
    fn wild_match_skips_extra_textgrid_token() {
        let (book, _asr, mut transcript, mut hydrated) = setup();
        let tg = TextGridDocument {
            words: vec![
                TextGridWord { text: "uh".into(), start_sec: 0.0, end_sec: 0.05 },
                TextGridWord { text: "hello".into(), start_sec: 0.05, end_sec: 0.42 },
                TextGridWord { text: "world".into(), start_sec: 0.42, end_sec: 0.91 },
            ],
        };
        let report = merge_text_grid(&tg, &book, &mut hydrated, &mut transcript, None, DEFAULT_WILD_MATCH_WINDOW, true);
        assert_eq!(report.wild_matches, 1);
        assert_eq!(report.insertions, 1);
    }
}
