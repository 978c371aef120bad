//! Stitches the per-window DP alignment (§4.4) across an entire chapter
//! using anchor boundaries as window edges, producing one `Vec<WordOp>`
//! covering the whole book/ASR range.

use super::types::{DpCostConfig, WordOp};
use super::windowed::align_window;
use crate::anchor::AnchorDocument;
use crate::asr::AsrResponse;
use crate::book::BookIndex;
use crate::error::PipelineError;

/// Runs `align_window` inside every consecutive anchor pair plus a final
/// window from the last anchor to the end of both streams, concatenating
/// the results in book-ascending order.
///
/// This preserves the alignment-coverage invariant (§8) globally: the
/// multiset of consumed book indices is `[0..book.words.len())` and of ASR
/// indices is `[0..asr.tokens.len())`, because each window's own coverage
/// invariant holds and windows partition both streams exactly.
pub fn align_chapter(book: &BookIndex, asr: &AsrResponse, anchors: &AnchorDocument, costs: &DpCostConfig) -> Result<Vec<WordOp>, PipelineError> {
    anchors.validate().map_err(|detail| PipelineError::MergeInconsistent { detail })?;

    let mut boundaries: Vec<(u32, u32)> = anchors.anchors.iter().map(|a| (a.book_position, a.asr_position)).collect();
    boundaries.push((book.words.len() as u32, asr.tokens.len() as u32));

    let mut ops = Vec::new();
    for window in boundaries.windows(2) {
        let (b_lo, a_lo) = window[0];
        let (b_hi, a_hi) = window[1];

        let book_words = &book.words[b_lo as usize..b_hi as usize];
        let asr_tokens = &asr.tokens[a_lo as usize..a_hi as usize];

        if book_words.is_empty() && asr_tokens.is_empty() {
            continue;
        }
        ops.extend(align_window(book_words, asr_tokens, a_lo, costs));
    }

    Ok(ops)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::anchor::{Anchor, AnchorPolicyConfig, AnchorStats};
    use crate::asr::AsrToken;
    use crate::book::{build_book_index, parser::ParseResult, parser::StructureHints, BookIndexConfig};

    fn book_index(text: &str) -> BookIndex {
        let parsed = ParseResult { full_text: text.to_string(), structure_hints: StructureHints::default() };
        build_book_index("book.txt", &parsed, &BookIndexConfig::default()).unwrap()
    }

    fn asr_from_words(words: &[&str]) -> AsrResponse {
        let tokens = words
            .iter()
            .enumerate()
            .map(|(i, w)| AsrToken { start_sec: i as f64 * 0.3, duration_sec: 0.25, text: w.to_string() })
            .collect();
        AsrResponse { model_version: "test".into(), tokens, segments: None }
    }

    #[test]
    fn stitched_ops_cover_every_book_and_asr_index() {
        let text = "alpha bravo charlie delta echo foxtrot golf hotel india juliet";
        let book = book_index(text);
        let words: Vec<&str> = text.split_whitespace().collect();
        let asr = asr_from_words(&words);

        let anchors = AnchorDocument {
            anchors: vec![Anchor { book_position: 0, asr_position: 0 }, Anchor { book_position: 5, asr_position: 5 }],
            policy: AnchorPolicyConfig::default(),
            stats: AnchorStats::default(),
            section_range_words: None,
        };

        let ops = align_chapter(&book, &asr, &anchors, &DpCostConfig::default()).unwrap();
        let mut book_idxs: Vec<u32> = ops.iter().filter_map(|o| o.book_idx()).collect();
        let mut asr_idxs: Vec<u32> = ops.iter().filter_map(|o| o.asr_idx()).collect();
        book_idxs.sort_unstable();
        asr_idxs.sort_unstable();
        assert_eq!(book_idxs, (0..book.words.len() as u32).collect::<Vec<_>>());
        assert_eq!(asr_idxs, (0..asr.tokens.len() as u32).collect::<Vec<_>>());
    }

    #[test]
    fn ops_remain_in_book_ascending_order_across_windows() {
        let text = "one two three four five six seven eight";
        let book = book_index(text);
        let words: Vec<&str> = text.split_whitespace().collect();
        let asr = asr_from_words(&words);
        let anchors = AnchorDocument {
            anchors: vec![Anchor { book_position: 0, asr_position: 0 }, Anchor { book_position: 4, asr_position: 4 }],
            policy: AnchorPolicyConfig::default(),
            stats: AnchorStats::default(),
            section_range_words: None,
        };
        let ops = align_chapter(&book, &asr, &anchors, &DpCostConfig::default()).unwrap();
        let mut last = -1i64;
        for op in &ops {
            if let Some(idx) = op.book_idx() {
                assert!(idx as i64 >= last);
                last = idx as i64;
            }
        }
    }

    #[test]
    fn rejects_invalid_anchor_document() {
        let book = book_index("alpha bravo charlie");
        let asr = asr_from_words(&["alpha", "bravo", "charlie"]);
        let anchors = AnchorDocument {
            anchors: vec![Anchor { book_position: 1, asr_position: 0 }],
            policy: AnchorPolicyConfig::default(),
            stats: AnchorStats::default(),
            section_range_words: None,
        };
        assert!(align_chapter(&book, &asr, &anchors, &DpCostConfig::default()).is_err());
    }
}
