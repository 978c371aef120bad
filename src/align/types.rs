//! Alignment operation types (§3): the output of the windowed DP aligner.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op")]
pub enum WordOp {
    Match { book_idx: u32, asr_idx: u32, score: f64 },
    Sub { book_idx: u32, asr_idx: u32, score: f64 },
    Ins { asr_idx: u32 },
    Del { book_idx: u32 },
}

impl WordOp {
    pub fn book_idx(&self) -> Option<u32> {
        match self {
            WordOp::Match { book_idx, .. } | WordOp::Sub { book_idx, .. } | WordOp::Del { book_idx } => Some(*book_idx),
            WordOp::Ins { .. } => None,
        }
    }

    pub fn asr_idx(&self) -> Option<u32> {
        match self {
            WordOp::Match { asr_idx, .. } | WordOp::Sub { asr_idx, .. } | WordOp::Ins { asr_idx } => Some(*asr_idx),
            WordOp::Del { .. } => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DpCostConfig {
    pub cost_sub: f64,
    pub cost_ins: f64,
    pub cost_del: f64,
    pub min_band_width: u32,
    pub band_width_ratio: f64,
}

impl Default for DpCostConfig {
    fn default() -> Self {
        Self { cost_sub: 1.0, cost_ins: 1.0, cost_del: 1.0, min_band_width: 32, band_width_ratio: 0.25 }
    }
}

impl DpCostConfig {
    pub fn band_width(&self, window_book_len: usize, window_asr_len: usize) -> usize {
        let widest = window_book_len.max(window_asr_len) as f64;
        (self.min_band_width as f64).max(self.band_width_ratio * widest).ceil() as usize
    }
}
