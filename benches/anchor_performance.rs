//! Benchmarks for anchor mining (§4.3): unique n-gram matching plus the
//! monotone-chain selection pass, across book/ASR sizes representative of a
//! short story chapter up to a long novel chapter.

use bookcast_align::anchor::{mine_anchors, AnchorPolicyConfig};
use bookcast_align::asr::{AsrResponse, AsrToken};
use bookcast_align::book::{build_book_index, BookIndexConfig, ParseResult, StructureHints};
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

fn synthetic_asr(word_count: usize) -> AsrResponse {
    let tokens = (0..word_count)
        .map(|i| AsrToken { start_sec: i as f64 * 0.28, duration_sec: 0.24, text: VOCAB[i % VOCAB.len()].to_string() })
        .collect();
    AsrResponse { model_version: "bench-asr".to_string(), tokens, segments: None }
}

fn bench_mine_anchors(c: &mut Criterion) {
    let mut group = c.benchmark_group("mine_anchors");
    for &word_count in &[500usize, 5_000, 30_000] {
        let text = synthetic_text(word_count);
        let parsed = ParseResult { full_text: text, structure_hints: StructureHints::default() };
        let book = build_book_index("bench-book.txt", &parsed, &BookIndexConfig::default()).expect("book index builds");
        let asr = synthetic_asr(word_count);
        let policy = AnchorPolicyConfig::default();

        group.bench_with_input(BenchmarkId::from_parameter(word_count), &word_count, |b, _| {
            b.iter(|| {
                let doc = mine_anchors(black_box(&book), black_box(&asr), black_box(&policy), None).expect("mining succeeds");
                black_box(doc.anchors.len());
            });
        });
    }
    group.finish();
}

fn bench_mine_anchors_relaxed_density(c: &mut Criterion) {
    let word_count = 10_000;
    let text = synthetic_text(word_count);
    let parsed = ParseResult { full_text: text, structure_hints: StructureHints::default() };
    let book = build_book_index("bench-book.txt", &parsed, &BookIndexConfig::default()).expect("book index builds");
    let asr = synthetic_asr(word_count);
    let policy = AnchorPolicyConfig { target_per_tokens: 10, min_separation: 2, ..AnchorPolicyConfig::default() };

    c.bench_function("mine_anchors_dense_target", |b| {
        b.iter(|| {
            let doc = mine_anchors(black_box(&book), black_box(&asr), black_box(&policy), None).expect("mining succeeds");
            black_box(doc.stats.candidates_selected);
        });
    });
}

criterion_group!(benches, bench_mine_anchors, bench_mine_anchors_relaxed_density);
criterion_main!(benches);
