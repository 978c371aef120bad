//! Per-stage parameter records (§4.9): each stage's `params_hash` input.
//! Keeping these as their own small structs (rather than one God-config)
//! means changing one stage's tuning never perturbs another stage's
//! fingerprint.

use crate::align::DpCostConfig;
use crate::anchor::AnchorPolicyConfig;
use crate::book::BookIndexConfig;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BookIndexStageParams {
    pub book_index: BookIndexConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AsrStageParams {}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnchorsStageParams {
    pub policy: AnchorPolicyConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptStageParams {
    pub costs: DpCostConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HydrateStageParams {}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MfaStageParams {
    pub dictionary_name: String,
    pub acoustic_model_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MergeStageParams {
    pub wild_match_window: usize,
    pub apply_to_transcript: bool,
}
