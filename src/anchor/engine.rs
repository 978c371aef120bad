//! Anchor mining (§4.3): unique n-gram matching between book and ASR content
//! tokens, followed by a monotone maximum-count subsequence selection.

use super::types::{Anchor, AnchorDocument, AnchorPolicyConfig, AnchorStats, WordRangeInclusive};
use crate::asr::AsrResponse;
use crate::book::BookIndex;
use crate::error::PipelineError;
use crate::text::{is_content_token, normalize_token};
use std::collections::HashMap;

/// One content token in a view, paired with its position in the original
/// (book word / ASR token) sequence.
struct ViewToken {
    normalized: String,
    original_index: u32,
}

fn build_book_view(book: &BookIndex, range: Option<WordRangeInclusive>, stopword_set_id: &str) -> Vec<ViewToken> {
    let (lo, hi) = match range {
        Some(r) => (r.start as usize, r.end as usize),
        None => (0, book.words.len().saturating_sub(1)),
    };
    book.words
        .iter()
        .enumerate()
        .filter(|(i, _)| *i >= lo && *i <= hi)
        .filter_map(|(_, w)| {
            if !is_content_token(&w.text, stopword_set_id) {
                return None;
            }
            normalize_token(&w.text).ok().flatten().map(|normalized| ViewToken { normalized, original_index: w.index })
        })
        .collect()
}

fn build_asr_view(asr: &AsrResponse, stopword_set_id: &str) -> Vec<ViewToken> {
    asr.tokens
        .iter()
        .enumerate()
        .filter_map(|(i, t)| {
            if !is_content_token(&t.text, stopword_set_id) {
                return None;
            }
            normalize_token(&t.text).ok().flatten().map(|normalized| ViewToken { normalized, original_index: i as u32 })
        })
        .collect()
}

/// Positions (in view-local coordinates) of every n-gram that occurs exactly
/// once in `view`.
fn unique_ngram_positions(view: &[ViewToken], n: usize) -> HashMap<Vec<&str>, usize> {
    let mut counts: HashMap<Vec<&str>, (usize, usize)> = HashMap::new();
    if view.len() < n {
        return HashMap::new();
    }
    for start in 0..=(view.len() - n) {
        let key: Vec<&str> = view[start..start + n].iter().map(|t| t.normalized.as_str()).collect();
        let entry = counts.entry(key).or_insert((0, start));
        entry.0 += 1;
    }
    counts.into_iter().filter(|(_, (count, _))| *count == 1).map(|(k, (_, pos))| (k, pos)).collect()
}

fn candidate_anchors(book_view: &[ViewToken], asr_view: &[ViewToken], n: usize) -> Vec<Anchor> {
    let book_ngrams = unique_ngram_positions(book_view, n);
    let asr_ngrams = unique_ngram_positions(asr_view, n);

    let mut out = Vec::new();
    for (ngram, &book_pos) in &book_ngrams {
        if let Some(&asr_pos) = asr_ngrams.get(ngram) {
            out.push(Anchor {
                book_position: book_view[book_pos].original_index,
                asr_position: asr_view[asr_pos].original_index,
            });
        }
    }
    out.sort_by_key(|a| a.book_position);
    out
}

/// Longest chain (by count) of candidates that is strictly increasing on
/// both axes with gaps `>= min_separation`, anchored at a virtual `(0,0)`
/// start so the synthetic anchor's separation requirement is honored too.
fn select_monotone_chain(candidates: &[Anchor], min_separation: u32) -> Vec<Anchor> {
    let n = candidates.len();
    if n == 0 {
        return Vec::new();
    }
    let fits = |from: Anchor, to: Anchor| {
        to.book_position >= from.book_position + min_separation && to.asr_position >= from.asr_position + min_separation
    };

    let mut dp = vec![1usize; n];
    let mut parent = vec![None; n];
    let origin = Anchor { book_position: 0, asr_position: 0 };

    for i in 0..n {
        if !fits(origin, candidates[i]) {
            dp[i] = 0;
        }
        for j in 0..i {
            if dp[j] > 0 && fits(candidates[j], candidates[i]) && dp[j] + 1 > dp[i] {
                dp[i] = dp[j] + 1;
                parent[i] = Some(j);
            }
        }
    }

    let Some((mut idx, _)) = dp.iter().enumerate().filter(|(_, &v)| v > 0).max_by_key(|(_, &v)| v) else {
        return Vec::new();
    };
    let mut chain = Vec::new();
    loop {
        chain.push(candidates[idx]);
        match parent[idx] {
            Some(p) => idx = p,
            None => break,
        }
    }
    chain.reverse();
    chain
}

fn desired_anchor_count(policy: &AnchorPolicyConfig, content_token_count: usize) -> usize {
    if policy.target_density_ratio > 0.0 {
        ((content_token_count as f64) * policy.target_density_ratio).ceil() as usize
    } else if policy.target_per_tokens > 0 {
        (content_token_count / policy.target_per_tokens as usize).max(1)
    } else {
        1
    }
}

/// Runs the full §4.3 protocol: build views, mine unique n-grams, select a
/// monotone chain honoring `min_separation`, relax `n` once if under-dense,
/// thin the chain by raising separation if over-dense, then prepend the
/// synthetic `(0,0)` anchor.
pub fn mine_anchors(
    book: &BookIndex,
    asr: &AsrResponse,
    policy: &AnchorPolicyConfig,
    section_range_words: Option<WordRangeInclusive>,
) -> Result<AnchorDocument, PipelineError> {
    let book_view = build_book_view(book, section_range_words, &policy.stopword_set_id);
    let asr_view = build_asr_view(asr, &policy.stopword_set_id);

    let mut n = policy.ngram_n.max(2);
    let mut candidates = candidate_anchors(&book_view, &asr_view, n);
    if let Some(range) = section_range_words {
        if policy.disallow_boundary_cross {
            candidates.retain(|a| {
                section_index_for(book, a.book_position) == section_index_for(book, range.start)
            });
        }
    }
    let mut chain = select_monotone_chain(&candidates, policy.min_separation);
    let mut relaxed = false;

    let desired = desired_anchor_count(&policy, book_view.len().min(asr_view.len()).max(1));
    if chain.len() + 1 < desired && n > 2 {
        n -= 1;
        candidates = candidate_anchors(&book_view, &asr_view, n);
        chain = select_monotone_chain(&candidates, policy.min_separation);
        relaxed = true;
    }

    // Over-dense: thin by raising the effective separation until we're at or
    // under roughly twice the target, capped to a handful of doublings.
    let mut effective_separation = policy.min_separation;
    let mut iterations = 0;
    while chain.len() > desired.saturating_mul(2).max(4) && iterations < 6 {
        effective_separation = effective_separation.saturating_mul(2).max(effective_separation + 1);
        chain = select_monotone_chain(&candidates, effective_separation);
        iterations += 1;
    }

    let candidates_found = candidates.len();
    let mut anchors = Vec::with_capacity(chain.len() + 1);
    anchors.push(Anchor { book_position: 0, asr_position: 0 });
    for a in chain {
        if a.book_position == 0 && a.asr_position == 0 {
            continue;
        }
        anchors.push(a);
    }

    if anchors.len() < 2 {
        return Err(PipelineError::AlignmentInsufficient { found: anchors.len() });
    }

    let doc = AnchorDocument {
        anchors,
        policy: AnchorPolicyConfig { min_separation: effective_separation, ngram_n: n, ..policy.clone() },
        stats: AnchorStats {
            candidates_found,
            candidates_selected: 0, // filled below
            ngram_n_used: n,
            relaxed,
        },
        section_range_words,
    };
    let mut doc = doc;
    doc.stats.candidates_selected = doc.anchors.len();
    doc.validate().map_err(|detail| PipelineError::MergeInconsistent { detail })?;
    Ok(doc)
}

fn section_index_for(book: &BookIndex, word_index: u32) -> u32 {
    book.words.get(word_index as usize).map(|w| w.section_index).unwrap_or(0)
}
