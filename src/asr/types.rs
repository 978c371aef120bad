//! ASR-related type definitions (§3): the wire shape produced by the
//! speech-to-text external collaborator.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AsrToken {
    #[serde(rename = "t", alias = "start_sec")]
    pub start_sec: f64,
    #[serde(rename = "d", alias = "duration_sec")]
    pub duration_sec: f64,
    #[serde(rename = "w", alias = "text")]
    pub text: String,
}

impl AsrToken {
    pub fn end_sec(&self) -> f64 {
        self.start_sec + self.duration_sec
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AsrSegment {
    pub start_sec: f64,
    pub end_sec: f64,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AsrResponse {
    #[serde(rename = "modelVersion", alias = "model_version")]
    pub model_version: String,
    pub tokens: Vec<AsrToken>,
    pub segments: Option<Vec<AsrSegment>>,
}

impl AsrResponse {
    /// Validates the invariants from §3: non-negative durations, tokens in
    /// chronological order of `start_sec`.
    pub fn validate(&self) -> Result<(), String> {
        for (i, tok) in self.tokens.iter().enumerate() {
            if tok.duration_sec < 0.0 {
                return Err(format!("token {i} has negative duration_sec ({})", tok.duration_sec));
            }
            if i > 0 && tok.start_sec < self.tokens[i - 1].start_sec {
                return Err(format!("token {i} is out of chronological order (start_sec {} < previous {})", tok.start_sec, self.tokens[i - 1].start_sec));
            }
        }
        Ok(())
    }
}
