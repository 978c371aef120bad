//! Benchmarks for the windowed DP word aligner (§4.4) and the rollup
//! hydration pass (§4.6) that consumes its output, across chapter sizes from
//! a short story up to a long novel chapter.

use bookcast_align::align::{align_chapter, DpCostConfig};
use bookcast_align::anchor::mine_anchors;
use bookcast_align::anchor::AnchorPolicyConfig;
use bookcast_align::asr::{AsrResponse, AsrToken};
use bookcast_align::book::{build_book_index, BookIndexConfig, ParseResult, StructureHints};
use bookcast_align::rollup::build_transcript_index;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

const VOCAB: [&str; 24] = [
    "the", "quick", "brown", "fox", "jumps", "over", "lazy", "dog", "while", "ship", "sailed", "past", "distant",
    "harbor", "lanterns", "flickered", "along", "pier", "and", "children", "laughed", "softly", "near", "water",
];

fn synthetic_text(word_count: usize) -> String {
    (0..word_count)
        .map(|i| {
            let w = VOCAB[i % VOCAB.len()];
            if i % 12 == 11 {
                format!("{w}.")
            } else {
                w.to_string()
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Reproduces the book words with a 1-in-40 word dropped, so the DP aligner
/// has a few real deletions to resolve rather than a trivial diagonal match.
fn synthetic_asr(word_count: usize) -> AsrResponse {
    let tokens = (0..word_count)
        .filter(|i| i % 40 != 39)
        .enumerate()
        .map(|(j, i)| AsrToken { start_sec: j as f64 * 0.28, duration_sec: 0.24, text: VOCAB[i % VOCAB.len()].to_string() })
        .collect();
    AsrResponse { model_version: "bench-asr".to_string(), tokens, segments: None }
}

fn bench_align_chapter(c: &mut Criterion) {
    let mut group = c.benchmark_group("align_chapter");
    for &word_count in &[500usize, 5_000, 30_000] {
        let text = synthetic_text(word_count);
        let parsed = ParseResult { full_text: text, structure_hints: StructureHints::default() };
        let book = build_book_index("bench-book.txt", &parsed, &BookIndexConfig::default()).expect("book index builds");
        let asr = synthetic_asr(word_count);
        let policy = AnchorPolicyConfig::default();
        let anchors = mine_anchors(&book, &asr, &policy, None).expect("anchor mining succeeds");
        let costs = DpCostConfig::default();

        group.bench_with_input(BenchmarkId::from_parameter(word_count), &word_count, |b, _| {
            b.iter(|| {
                let ops = align_chapter(black_box(&book), black_box(&asr), black_box(&anchors), black_box(&costs)).expect("alignment succeeds");
                black_box(ops.len());
            });
        });
    }
    group.finish();
}

fn bench_build_transcript_index(c: &mut Criterion) {
    let word_count = 5_000;
    let text = synthetic_text(word_count);
    let parsed = ParseResult { full_text: text, structure_hints: StructureHints::default() };
    let book = build_book_index("bench-book.txt", &parsed, &BookIndexConfig::default()).expect("book index builds");
    let asr = synthetic_asr(word_count);
    let policy = AnchorPolicyConfig::default();
    let anchors = mine_anchors(&book, &asr, &policy, None).expect("anchor mining succeeds");
    let costs = DpCostConfig::default();
    let ops = align_chapter(&book, &asr, &anchors, &costs).expect("alignment succeeds");
    let now = chrono::DateTime::<chrono::Utc>::from_timestamp(1_700_000_000, 0).expect("valid timestamp");

    c.bench_function("build_transcript_index_5000_words", |b| {
        b.iter(|| {
            let index = build_transcript_index(
                black_box("bench-audio.wav"),
                black_box("bench-asr.json"),
                black_box("bench-book.json"),
                black_box(&book),
                black_box(&asr),
                black_box(ops.clone()),
                black_box("dp_window"),
                now,
            )
            .expect("hydration succeeds");
            black_box(index.sentences.len());
        });
    });
}

criterion_group!(benches, bench_align_chapter, bench_build_transcript_index);
criterion_main!(benches);
