//! `ChapterDescriptor` (§3): where a chapter's buffers live on disk.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BufferRole {
    Raw,
    Treated,
    Filtered,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BufferDescriptor {
    pub role: BufferRole,
    pub path: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChapterDescriptor {
    pub chapter_id: String,
    pub root_path: PathBuf,
    #[serde(default)]
    pub aliases: Vec<String>,
    pub buffer_descriptors: Vec<BufferDescriptor>,
    pub book_start_word: Option<u32>,
    pub book_end_word: Option<u32>,
}

impl ChapterDescriptor {
    /// The audio buffer to feed the ASR/MFA stages: prefers `Treated`, falls
    /// back to `Filtered`, falls back to `Raw` — the same "best available
    /// buffer" fallback order the workspace discovery step establishes.
    pub fn preferred_audio_path(&self) -> Option<&PathBuf> {
        for role in [BufferRole::Treated, BufferRole::Filtered, BufferRole::Raw] {
            if let Some(b) = self.buffer_descriptors.iter().find(|b| b.role == role) {
                return Some(&b.path);
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefers_treated_over_raw() {
        let descriptor = ChapterDescriptor {
            chapter_id: "ch01".into(),
            root_path: "/book/ch01".into(),
            aliases: vec![],
            buffer_descriptors: vec![
                BufferDescriptor { role: BufferRole::Raw, path: "/book/ch01/raw.wav".into() },
                BufferDescriptor { role: BufferRole::Treated, path: "/book/ch01/treated.wav".into() },
            ],
            book_start_word: None,
            book_end_word: None,
        };
        assert_eq!(descriptor.preferred_audio_path().unwrap(), &PathBuf::from("/book/ch01/treated.wav"));
    }

    #[test]
    fn falls_back_to_raw_when_nothing_else_present() {
        let descriptor = ChapterDescriptor {
            chapter_id: "ch01".into(),
            root_path: "/book/ch01".into(),
            aliases: vec![],
            buffer_descriptors: vec![BufferDescriptor { role: BufferRole::Raw, path: "/book/ch01/raw.wav".into() }],
            book_start_word: None,
            book_end_word: None,
        };
        assert_eq!(descriptor.preferred_audio_path().unwrap(), &PathBuf::from("/book/ch01/raw.wav"));
    }
}
