//! Manifest data model (§3): the authoritative per-chapter stage skip
//! record.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageName {
    BookIndex,
    Asr,
    Anchors,
    Transcript,
    Hydrate,
    Mfa,
    Merge,
}

impl StageName {
    pub const ORDER: [StageName; 7] = [
        StageName::BookIndex,
        StageName::Asr,
        StageName::Anchors,
        StageName::Transcript,
        StageName::Hydrate,
        StageName::Mfa,
        StageName::Merge,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            StageName::BookIndex => "book_index",
            StageName::Asr => "asr",
            StageName::Anchors => "anchors",
            StageName::Transcript => "transcript",
            StageName::Hydrate => "hydrate",
            StageName::Mfa => "mfa",
            StageName::Merge => "merge",
        }
    }

    pub fn ordinal(self) -> usize {
        Self::ORDER.iter().position(|s| *s == self).expect("StageName::ORDER is exhaustive")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageStatus {
    Pending,
    InProgress,
    Completed,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fingerprint {
    pub input_hash: String,
    pub params_hash: String,
    pub tool_versions: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageError {
    pub kind: String,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageEntry {
    pub status: StageStatus,
    pub started_at: Option<chrono::DateTime<chrono::Utc>>,
    pub ended_at: Option<chrono::DateTime<chrono::Utc>>,
    pub attempts: u32,
    pub error: Option<StageError>,
    pub artifacts: BTreeMap<String, String>,
    pub fingerprint: Option<Fingerprint>,
}

impl StageEntry {
    pub fn pending() -> Self {
        Self { status: StageStatus::Pending, started_at: None, ended_at: None, attempts: 0, error: None, artifacts: BTreeMap::new(), fingerprint: None }
    }

    /// True iff this entry is `Completed` and its stored fingerprint matches
    /// the freshly computed one for the current inputs/params/tool versions.
    pub fn is_up_to_date(&self, fresh: &Fingerprint) -> bool {
        self.status == StageStatus::Completed && self.fingerprint.as_ref() == Some(fresh)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestV2 {
    pub chapter_id: String,
    pub audio_path: String,
    pub transcript_index_path: String,
    pub stages: BTreeMap<String, StageEntry>,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub modified_at: chrono::DateTime<chrono::Utc>,
}

impl ManifestV2 {
    pub fn new(chapter_id: impl Into<String>, audio_path: impl Into<String>, transcript_index_path: impl Into<String>, now: chrono::DateTime<chrono::Utc>) -> Self {
        let mut stages = BTreeMap::new();
        for stage in StageName::ORDER {
            stages.insert(stage.as_str().to_string(), StageEntry::pending());
        }
        Self { chapter_id: chapter_id.into(), audio_path: audio_path.into(), transcript_index_path: transcript_index_path.into(), stages, created_at: now, modified_at: now }
    }

    pub fn stage(&self, name: StageName) -> &StageEntry {
        self.stages.get(name.as_str()).expect("ManifestV2::new populates every StageName")
    }

    pub fn stage_mut(&mut self, name: StageName) -> &mut StageEntry {
        self.stages.get_mut(name.as_str()).expect("ManifestV2::new populates every StageName")
    }
}
