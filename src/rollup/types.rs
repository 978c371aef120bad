//! Transcript-level rollup types (§3): sentence/paragraph metrics derived
//! from the raw word alignment ops.

use crate::align::WordOp;
use crate::book::WordRange;
use crate::timing::TimingRange;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WordAlign {
    pub op: WordOp,
    pub provenance: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AsrRange {
    pub start: u32,
    pub end: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum AlignStatus {
    Ok,
    Flagged,
    Unaligned,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SentenceMetrics {
    pub wer: f64,
    pub cer: f64,
    pub span_wer: f64,
    pub missing_runs: u32,
    pub extra_runs: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SentenceAlign {
    pub id: u32,
    pub book_range: WordRange,
    pub script_range: Option<AsrRange>,
    pub metrics: SentenceMetrics,
    pub timing: TimingRange,
    pub status: AlignStatus,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ParagraphMetrics {
    pub wer: f64,
    pub cer: f64,
    pub coverage: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParagraphAlign {
    pub id: u32,
    pub book_range: WordRange,
    pub sentence_ids: Vec<u32>,
    pub metrics: ParagraphMetrics,
    pub status: AlignStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptIndex {
    pub audio_path: String,
    pub script_path: String,
    pub book_index_path: String,
    pub words: Vec<WordAlign>,
    pub sentences: Vec<SentenceAlign>,
    pub paragraphs: Vec<ParagraphAlign>,
    pub normalization_version: u32,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HydratedWord {
    pub op: WordOp,
    pub book_word: Option<String>,
    pub asr_word: Option<String>,
    pub start_sec: Option<f64>,
    pub end_sec: Option<f64>,
    pub duration_sec: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HydratedSentence {
    pub id: u32,
    pub metrics: SentenceMetrics,
    pub timing: TimingRange,
    pub status: AlignStatus,
    pub words: Vec<HydratedWord>,
    pub book_text: String,
    pub script_text: String,
    pub diff: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HydratedParagraph {
    pub id: u32,
    pub metrics: ParagraphMetrics,
    pub status: AlignStatus,
    pub sentence_ids: Vec<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HydratedTranscript {
    pub sentences: Vec<HydratedSentence>,
    pub paragraphs: Vec<HydratedParagraph>,
    pub created_at: chrono::DateTime<chrono::Utc>,
}
