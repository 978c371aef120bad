//! Builds a [`TranscriptIndex`] from raw alignment ops (§4.5), then hydrates
//! it into the display-ready [`HydratedTranscript`].

use super::types::{
    AlignStatus, AsrRange, HydratedParagraph, HydratedSentence, HydratedTranscript, HydratedWord, ParagraphAlign,
    ParagraphMetrics, SentenceAlign, SentenceMetrics, TranscriptIndex, WordAlign,
};
use crate::align::WordOp;
use crate::asr::AsrResponse;
use crate::book::BookIndex;
use crate::error::PipelineError;
use crate::text::normalize_token;
use crate::timing::TimingRange;
use strsim::levenshtein;

/// Sentence statuses below this WER are `ok`; at or above, `flagged`.
pub const SENTENCE_FLAG_THRESHOLD: f64 = 0.35;

fn normalized_join(texts: impl Iterator<Item = impl AsRef<str>>) -> String {
    texts
        .filter_map(|t| normalize_token(t.as_ref()).ok().flatten())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Assigns every op a sentence id: ops that consume a book word take that
/// word's sentence; `Ins` ops (no book word) inherit the most recently seen
/// sentence, or the first sentence of any later book-consuming op if none
/// has been seen yet (i.e. a run of insertions before the first real word).
fn assign_sentence_ids(ops: &[WordOp], book: &BookIndex) -> Vec<u32> {
    let mut ids = vec![0u32; ops.len()];
    let mut last_seen: Option<u32> = None;
    for (i, op) in ops.iter().enumerate() {
        if let Some(book_idx) = op.book_idx() {
            let sid = book.sentence_for_word(book_idx).map(|s| s.index).unwrap_or(0);
            ids[i] = sid;
            last_seen = Some(sid);
        } else if let Some(sid) = last_seen {
            ids[i] = sid;
        }
    }
    // Backfill any leading run of Ins ops that preceded the first book-consuming op.
    if let Some(first_known) = ids.iter().zip(ops.iter()).find(|(_, op)| op.book_idx().is_some()).map(|(id, _)| *id) {
        for (i, op) in ops.iter().enumerate() {
            if op.book_idx().is_none() && last_seen.is_none() {
                ids[i] = first_known;
            }
            if op.book_idx().is_some() {
                break;
            }
        }
    }
    ids
}

fn count_runs(ops: &[&WordOp], predicate: impl Fn(&WordOp) -> bool) -> u32 {
    let mut runs = 0;
    let mut in_run = false;
    for op in ops {
        if predicate(op) {
            if !in_run {
                runs += 1;
                in_run = true;
            }
        } else {
            in_run = false;
        }
    }
    runs
}

pub fn build_transcript_index(
    audio_path: &str,
    script_path: &str,
    book_index_path: &str,
    book: &BookIndex,
    asr: &AsrResponse,
    ops: Vec<WordOp>,
    provenance: &str,
    now: chrono::DateTime<chrono::Utc>,
) -> Result<TranscriptIndex, PipelineError> {
    let sentence_ids = assign_sentence_ids(&ops, book);
    let words: Vec<WordAlign> = ops.iter().map(|op| WordAlign { op: *op, provenance: provenance.to_string() }).collect();

    let mut sentences = Vec::with_capacity(book.sentences.len());
    for sentence in &book.sentences {
        let own_ops: Vec<&WordOp> =
            ops.iter().zip(sentence_ids.iter()).filter(|(_, sid)| **sid == sentence.index).map(|(op, _)| op).collect();

        let book_word_count = sentence.range.len().max(1) as f64;
        let subs = own_ops.iter().filter(|op| matches!(op, WordOp::Sub { .. })).count();
        let inss = own_ops.iter().filter(|op| matches!(op, WordOp::Ins { .. })).count();
        let dels = own_ops.iter().filter(|op| matches!(op, WordOp::Del { .. })).count();

        let wer = (subs + inss + dels) as f64 / book_word_count;
        let missing_runs = count_runs(&own_ops, |op| matches!(op, WordOp::Del { .. }));
        let extra_runs = count_runs(&own_ops, |op| matches!(op, WordOp::Ins { .. }));

        let book_words = book.words_in_range(sentence.range);
        let book_text_norm = normalized_join(book_words.iter().map(|w| w.text.as_str()));
        let book_char_count = book_text_norm.chars().count().max(1);

        let asr_idxs: Vec<u32> = own_ops.iter().filter_map(|op| op.asr_idx()).collect();
        let script_range = match (asr_idxs.iter().min(), asr_idxs.iter().max()) {
            (Some(&lo), Some(&hi)) => Some(AsrRange { start: lo, end: hi }),
            _ => None,
        };

        // span_wer restricts the error count to the contiguous ASR span this
        // sentence covers (§4.5), rather than to whichever sentence
        // `assign_sentence_ids` attributed each op to. A `Sub`/`Ins` whose
        // `asr_idx` falls inside `script_range` counts even if a run of
        // leading/trailing insertions got attributed to a neighboring
        // sentence by that assignment; `Del` ops carry no ASR position so
        // they're scoped by book range the same way `wer` scopes them.
        let span_wer = match script_range {
            Some(range) => {
                let span_subs = ops.iter().filter(|op| matches!(op, WordOp::Sub { asr_idx, .. } if *asr_idx >= range.start && *asr_idx <= range.end)).count();
                let span_inss = ops.iter().filter(|op| matches!(op, WordOp::Ins { asr_idx } if *asr_idx >= range.start && *asr_idx <= range.end)).count();
                (span_subs + span_inss + dels) as f64 / book_word_count
            }
            None => wer,
        };
        let asr_text_norm = match &script_range {
            Some(r) => normalized_join(asr.tokens[r.start as usize..=(r.end as usize).min(asr.tokens.len().saturating_sub(1))].iter().map(|t| t.text.as_str())),
            None => String::new(),
        };
        let cer = levenshtein(&book_text_norm, &asr_text_norm) as f64 / book_char_count as f64;

        let match_timings: Vec<(f64, f64)> = own_ops
            .iter()
            .filter_map(|op| match op {
                WordOp::Match { asr_idx, .. } => asr.tokens.get(*asr_idx as usize).map(|t| (t.start_sec, t.start_sec + t.duration_sec)),
                _ => None,
            })
            .collect();

        let (timing, status) = if match_timings.is_empty() {
            (TimingRange::UNKNOWN, AlignStatus::Unaligned)
        } else {
            let start = match_timings.iter().map(|(s, _)| *s).fold(f64::INFINITY, f64::min);
            let end = match_timings.iter().map(|(_, e)| *e).fold(f64::NEG_INFINITY, f64::max);
            let status = if wer <= SENTENCE_FLAG_THRESHOLD { AlignStatus::Ok } else { AlignStatus::Flagged };
            (TimingRange::new(start, end), status)
        };

        sentences.push(SentenceAlign {
            id: sentence.index,
            book_range: sentence.range,
            script_range,
            metrics: SentenceMetrics { wer, cer, span_wer, missing_runs, extra_runs },
            timing,
            status,
        });
    }

    let paragraphs = book
        .paragraphs
        .iter()
        .map(|paragraph| {
            let member_sentences: Vec<&SentenceAlign> = sentences
                .iter()
                .filter(|s| s.book_range.start_word >= paragraph.range.start_word && s.book_range.end_word <= paragraph.range.end_word)
                .collect();
            let sentence_ids: Vec<u32> = member_sentences.iter().map(|s| s.id).collect();
            let total_words: f64 = member_sentences.iter().map(|s| s.book_range.len() as f64).sum::<f64>().max(1.0);
            let wer = member_sentences.iter().map(|s| s.metrics.wer * s.book_range.len() as f64).sum::<f64>() / total_words;
            let cer = member_sentences.iter().map(|s| s.metrics.cer * s.book_range.len() as f64).sum::<f64>() / total_words;
            let aligned_words: f64 = member_sentences
                .iter()
                .filter(|s| !matches!(s.status, AlignStatus::Unaligned))
                .map(|s| s.book_range.len() as f64)
                .sum();
            let coverage = aligned_words / total_words;
            let status = if member_sentences.iter().all(|s| matches!(s.status, AlignStatus::Unaligned)) {
                AlignStatus::Unaligned
            } else if member_sentences.iter().any(|s| matches!(s.status, AlignStatus::Flagged)) {
                AlignStatus::Flagged
            } else {
                AlignStatus::Ok
            };
            ParagraphAlign { id: paragraph.index, book_range: paragraph.range, sentence_ids, metrics: ParagraphMetrics { wer, cer, coverage }, status }
        })
        .collect();

    Ok(TranscriptIndex {
        audio_path: audio_path.to_string(),
        script_path: script_path.to_string(),
        book_index_path: book_index_path.to_string(),
        words,
        sentences,
        paragraphs,
        normalization_version: book.normalization_version,
        created_at: now,
    })
}

/// Produces the display-ready [`HydratedTranscript`]: original surface text,
/// resolved per-word timings, and unified-diff strings (display only, per
/// §4.5 — never fed back into alignment).
pub fn hydrate(transcript: &TranscriptIndex, book: &BookIndex, asr: &AsrResponse, now: chrono::DateTime<chrono::Utc>) -> HydratedTranscript {
    let mut hydrated_sentences = Vec::with_capacity(transcript.sentences.len());

    for sentence in &transcript.sentences {
        let hydrated_words: Vec<HydratedWord> = transcript
            .words
            .iter()
            .filter(|w| match w.op {
                WordOp::Match { book_idx, .. } | WordOp::Sub { book_idx, .. } | WordOp::Del { book_idx } => sentence.book_range.contains(book_idx),
                WordOp::Ins { asr_idx } => sentence.script_range.map(|r| asr_idx >= r.start && asr_idx <= r.end).unwrap_or(false),
            })
            .map(|w| hydrate_word(w, book, asr))
            .collect();

        let book_text = book
            .words_in_range(sentence.book_range)
            .iter()
            .map(|w| w.text.as_str())
            .collect::<Vec<_>>()
            .join(" ");
        let script_text = match sentence.script_range {
            Some(r) => asr.tokens[r.start as usize..=(r.end as usize).min(asr.tokens.len().saturating_sub(1))]
                .iter()
                .map(|t| t.text.as_str())
                .collect::<Vec<_>>()
                .join(" "),
            None => String::new(),
        };

        let diff = similar::TextDiff::from_words(&book_text, &script_text)
            .unified_diff()
            .header("book", "script")
            .to_string();

        hydrated_sentences.push(HydratedSentence {
            id: sentence.id,
            metrics: sentence.metrics,
            timing: sentence.timing,
            status: sentence.status,
            words: hydrated_words,
            book_text,
            script_text,
            diff,
        });
    }

    let hydrated_paragraphs = transcript
        .paragraphs
        .iter()
        .map(|p| HydratedParagraph { id: p.id, metrics: p.metrics, status: p.status, sentence_ids: p.sentence_ids.clone() })
        .collect();

    HydratedTranscript { sentences: hydrated_sentences, paragraphs: hydrated_paragraphs, created_at: now }
}

fn hydrate_word(w: &WordAlign, book: &BookIndex, asr: &AsrResponse) -> HydratedWord {
    let book_word = w.op.book_idx().and_then(|i| book.words.get(i as usize)).map(|w| w.text.clone());
    let asr_token = w.op.asr_idx().and_then(|i| asr.tokens.get(i as usize));
    let asr_word = asr_token.map(|t| t.text.clone());
    let start_sec = asr_token.map(|t| t.start_sec);
    let duration_sec = asr_token.map(|t| t.duration_sec);
    let end_sec = asr_token.map(|t| t.start_sec + t.duration_sec);
    HydratedWord { op: w.op, book_word, asr_word, start_sec, end_sec, duration_sec }
}
