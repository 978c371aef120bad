//! `ChapterContext` (§4.7): owns every per-chapter artifact slot and
//! coordinates their save order. `ChapterContextHandle` guarantees
//! `save_changes()` runs on every exit path, including panics.

use super::descriptor::ChapterDescriptor;
use super::slot::DocumentSlot;
use crate::anchor::AnchorDocument;
use crate::asr::AsrResponse;
use crate::error::PipelineError;
use crate::rollup::{HydratedTranscript, TranscriptIndex};
use crate::textgrid::TextGridDocument;
use serde::{de::DeserializeOwned, Serialize};
use std::path::Path;

fn load_json<T: DeserializeOwned>(path: &Path) -> Result<T, PipelineError> {
    let raw = std::fs::read_to_string(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            PipelineError::InputMissing { path: path.to_path_buf() }
        } else {
            PipelineError::IOError(e)
        }
    })?;
    serde_json::from_str(&raw).map_err(|e| PipelineError::InputInvalid {
        source_file: path.display().to_string(),
        location: String::new(),
        message: e.to_string(),
    })
}

/// Writes `value` as JSON, via a temp file in the same directory followed by
/// an atomic rename, so a crash mid-write never leaves a truncated artifact.
fn save_json_atomic<T: Serialize>(path: &Path, value: &T) -> Result<(), PipelineError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(PipelineError::IOError)?;
    }
    let tmp_path = path.with_extension("json.tmp");
    let body = serde_json::to_vec_pretty(value).map_err(|e| PipelineError::InputInvalid {
        source_file: path.display().to_string(),
        location: String::new(),
        message: e.to_string(),
    })?;
    std::fs::write(&tmp_path, body).map_err(PipelineError::IOError)?;
    std::fs::rename(&tmp_path, path).map_err(PipelineError::IOError)?;
    Ok(())
}

/// Every per-chapter artifact the orchestrator's stages read and write.
/// `BookIndex` deliberately has no slot here: it is owned by the book-wide
/// context and is never saved per chapter.
pub struct ChapterContext {
    pub descriptor: ChapterDescriptor,
    pub asr: DocumentSlot<AsrResponse>,
    pub anchors: DocumentSlot<AnchorDocument>,
    pub transcript: DocumentSlot<TranscriptIndex>,
    pub hydrated: DocumentSlot<HydratedTranscript>,
    pub text_grid: DocumentSlot<TextGridDocument>,
}

impl ChapterContext {
    pub fn open(descriptor: ChapterDescriptor, artifacts_dir: &Path) -> Self {
        Self {
            descriptor,
            asr: DocumentSlot::new(artifacts_dir.join("asr.json")),
            anchors: DocumentSlot::new(artifacts_dir.join("anchors.json")),
            transcript: DocumentSlot::new(artifacts_dir.join("transcript.json")),
            hydrated: DocumentSlot::new(artifacts_dir.join("hydrated.json")),
            text_grid: DocumentSlot::new(artifacts_dir.join("textgrid.json")),
        }
    }

    pub fn load_asr(&mut self) -> Result<&AsrResponse, PipelineError> {
        self.asr.get(load_json)
    }

    pub fn load_anchors(&mut self) -> Result<&AnchorDocument, PipelineError> {
        self.anchors.get(load_json)
    }

    pub fn load_transcript(&mut self) -> Result<&TranscriptIndex, PipelineError> {
        self.transcript.get(load_json)
    }

    pub fn load_hydrated(&mut self) -> Result<&HydratedTranscript, PipelineError> {
        self.hydrated.get(load_json)
    }

    pub fn load_text_grid(&mut self) -> Result<&TextGridDocument, PipelineError> {
        self.text_grid.get(load_json)
    }

    /// Mutable access for stages that patch an existing artifact in place
    /// (the Merge stage's TextGrid-timing overwrite) rather than replacing
    /// it wholesale.
    pub fn hydrated_mut(&mut self) -> Result<&mut HydratedTranscript, PipelineError> {
        self.hydrated.get_mut(load_json)
    }

    pub fn transcript_mut(&mut self) -> Result<&mut TranscriptIndex, PipelineError> {
        self.transcript.get_mut(load_json)
    }

    /// Both artifacts the Merge stage patches in one call, as two disjoint
    /// field borrows, since [`Self::hydrated_mut`] and [`Self::transcript_mut`]
    /// cannot be held simultaneously (each borrows all of `self`).
    pub fn hydrated_and_transcript_mut(&mut self) -> Result<(&mut HydratedTranscript, &mut TranscriptIndex), PipelineError> {
        let hydrated = self.hydrated.get_mut(load_json)?;
        let transcript = self.transcript.get_mut(load_json)?;
        Ok((hydrated, transcript))
    }

    /// Writes every dirty slot, in the fixed order the stages run in:
    /// ASR, Anchors, Transcript, Hydrated, TextGrid.
    pub fn save_changes(&mut self) -> Result<(), PipelineError> {
        self.asr.save_if_dirty(save_json_atomic)?;
        self.anchors.save_if_dirty(save_json_atomic)?;
        self.transcript.save_if_dirty(save_json_atomic)?;
        self.hydrated.save_if_dirty(save_json_atomic)?;
        self.text_grid.save_if_dirty(save_json_atomic)?;
        Ok(())
    }
}

/// Scoped ownership wrapper: `drop` always attempts `save_changes()`, even
/// when unwinding from a panic, so an interrupted stage never leaves dirty
/// in-memory state unflushed to disk.
pub struct ChapterContextHandle {
    context: Option<ChapterContext>,
}

impl ChapterContextHandle {
    pub fn new(context: ChapterContext) -> Self {
        Self { context: Some(context) }
    }

    pub fn get_mut(&mut self) -> &mut ChapterContext {
        self.context.as_mut().expect("context taken before handle dropped")
    }
}

impl Drop for ChapterContextHandle {
    fn drop(&mut self) {
        if let Some(mut ctx) = self.context.take() {
            if let Err(e) = ctx.save_changes() {
                tracing::error!(chapter_id = %ctx.descriptor.chapter_id, error = %e, "failed to save chapter changes on context release");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::anchor::{Anchor, AnchorPolicyConfig, AnchorStats};
    use tempfile::tempdir;

    #[test]
    fn save_changes_writes_only_dirty_slots() {
        let dir = tempdir().unwrap();
        let descriptor = ChapterDescriptor {
            chapter_id: "ch01".into(),
            root_path: dir.path().to_path_buf(),
            aliases: vec![],
            buffer_descriptors: vec![],
            book_start_word: None,
            book_end_word: None,
        };
        let mut ctx = ChapterContext::open(descriptor, dir.path());
        let anchors = AnchorDocument {
            anchors: vec![Anchor { book_position: 0, asr_position: 0 }],
            policy: AnchorPolicyConfig::default(),
            stats: AnchorStats::default(),
            section_range_words: None,
        };
        ctx.anchors.set(anchors);
        ctx.save_changes().unwrap();

        assert!(dir.path().join("anchors.json").exists());
        assert!(!dir.path().join("asr.json").exists());
    }

    #[test]
    fn handle_drop_flushes_dirty_state() {
        let dir = tempdir().unwrap();
        let descriptor = ChapterDescriptor {
            chapter_id: "ch01".into(),
            root_path: dir.path().to_path_buf(),
            aliases: vec![],
            buffer_descriptors: vec![],
            book_start_word: None,
            book_end_word: None,
        };
        {
            let ctx = ChapterContext::open(descriptor, dir.path());
            let mut handle = ChapterContextHandle::new(ctx);
            handle.get_mut().anchors.set(AnchorDocument {
                anchors: vec![Anchor { book_position: 0, asr_position: 0 }],
                policy: AnchorPolicyConfig::default(),
                stats: AnchorStats::default(),
                section_range_words: None,
            });
        }
        assert!(dir.path().join("anchors.json").exists());
    }
}
