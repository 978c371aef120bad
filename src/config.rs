//! Top-level configuration (§3.1): one `PipelineConfig` aggregating every
//! component's tunables, loadable from TOML and overridable by CLI flags,
//! in the manner of the teacher's `DiarizationConfig`/`WhisperConfig` pair.

use crate::align::DpCostConfig;
use crate::anchor::AnchorPolicyConfig;
use crate::book::BookIndexConfig;
use crate::error::PipelineError;
use crate::stage::StageTimeouts;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TokenizerConfig {
    pub stopword_set_id: String,
    pub fold_apostrophes: bool,
}

impl Default for TokenizerConfig {
    fn default() -> Self {
        Self { stopword_set_id: crate::text::DEFAULT_STOPWORD_SET_ID.to_string(), fold_apostrophes: true }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConcurrencyConfig {
    pub asr_concurrency: usize,
    pub mfa_concurrency: usize,
    pub mfa_workspace_count: usize,
}

impl Default for ConcurrencyConfig {
    fn default() -> Self {
        Self { asr_concurrency: 2, mfa_concurrency: 1, mfa_workspace_count: 2 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeoutConfig {
    pub asr_secs: u64,
    pub mfa_secs: u64,
    pub cpu_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        let d = StageTimeouts::default();
        Self { asr_secs: d.asr.as_secs(), mfa_secs: d.mfa.as_secs(), cpu_secs: d.cpu.as_secs() }
    }
}

impl TimeoutConfig {
    pub fn to_stage_timeouts(&self) -> StageTimeouts {
        StageTimeouts { asr: Duration::from_secs(self.asr_secs), mfa: Duration::from_secs(self.mfa_secs), cpu: Duration::from_secs(self.cpu_secs) }
    }
}

/// Every component's defaults in one place (§3.1). Every field is optional
/// in the TOML source (`#[serde(default)]` throughout), so a user supplies
/// only the overrides they care about.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub tokenizer: TokenizerConfig,
    pub book_index: BookIndexConfig,
    pub anchor_policy: AnchorPolicyConfig,
    pub dp_costs: DpCostConfig,
    pub concurrency: ConcurrencyConfig,
    pub timeouts: TimeoutConfig,
    pub dictionary_name: String,
    pub acoustic_model_name: String,
    pub asr_model_version: String,
}

impl PipelineConfig {
    pub fn from_toml_str(raw: &str) -> Result<Self, PipelineError> {
        toml::from_str(raw).map_err(|e| PipelineError::InputInvalid { source_file: "pipeline config".to_string(), location: String::new(), message: e.to_string() })
    }

    pub fn load(path: &Path) -> Result<Self, PipelineError> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                PipelineError::InputMissing { path: path.to_path_buf() }
            } else {
                PipelineError::IOError(e)
            }
        })?;
        Self::from_toml_str(&raw)
    }
}

/// Per-chapter outcome of a batch run, aggregated and printed once the
/// whole book finishes (§7: "user sees aggregated per-chapter success/failure
/// status").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchOutcome {
    pub chapter_id: String,
    pub result: ChapterResult,
    pub duration_ms: u128,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ChapterResult {
    Ok,
    Failed { kind: String, stage: String, message: String },
}

pub type BatchReport = Vec<BatchOutcome>;
