//! The stage orchestrator (§4.8): fingerprinted, skip-aware execution of the
//! seven pipeline stages over one chapter at a time.

pub mod orchestrator;
pub mod params;
pub mod resource;
pub mod types;

pub use orchestrator::{run_chapter, ChapterRunInputs, DEFAULT_MERGE_WILD_MATCH_WINDOW};
pub use params::{AnchorsStageParams, AsrStageParams, BookIndexStageParams, HydrateStageParams, MergeStageParams, MfaStageParams, TranscriptStageParams};
pub use resource::{ResourcePools, StageTimeouts};
pub use types::StageRange;
