//! Workspace discovery and the book/chapter managers (§4.10).

pub mod book_manager;
pub mod chapter_manager;
pub mod mfa_pool;

pub use book_manager::BookManager;
pub use chapter_manager::{ChapterLease, ChapterManager, OpenPolicy};
pub use mfa_pool::{MfaWorkspaceGuard, MfaWorkspacePool};

use crate::chapter::{BufferDescriptor, BufferRole, ChapterDescriptor};
use crate::error::PipelineError;
use std::path::Path;
use walkdir::WalkDir;

const ROLE_SUFFIXES: [(BufferRole, &str); 3] = [(BufferRole::Raw, "raw"), (BufferRole::Treated, "treated"), (BufferRole::Filtered, "filtered")];

/// Enumerates the immediate subdirectories of `book_root` as chapters and
/// assigns role-tagged audio buffers: `{id}.raw.wav`/`{id}.treated.wav`/
/// `{id}.filtered.wav` if present, else a bare `{id}.wav` tagged `Raw`,
/// tried chapter-local first and the book root second.
pub fn discover(book_root: &Path) -> Result<Vec<ChapterDescriptor>, PipelineError> {
    if !book_root.is_dir() {
        return Err(PipelineError::InputMissing { path: book_root.to_path_buf() });
    }

    let mut chapter_dirs: Vec<_> = WalkDir::new(book_root)
        .min_depth(1)
        .max_depth(1)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_dir())
        .map(|e| e.into_path())
        .collect();
    chapter_dirs.sort();

    let mut descriptors = Vec::with_capacity(chapter_dirs.len());
    for dir in chapter_dirs {
        let chapter_id = dir.file_name().map(|n| n.to_string_lossy().to_string()).unwrap_or_default();

        let mut buffer_descriptors: Vec<BufferDescriptor> = ROLE_SUFFIXES
            .iter()
            .filter_map(|(role, suffix)| {
                let path = dir.join(format!("{chapter_id}.{suffix}.wav"));
                path.exists().then_some(BufferDescriptor { role: *role, path })
            })
            .collect();

        if buffer_descriptors.is_empty() {
            let chapter_local = dir.join(format!("{chapter_id}.wav"));
            let book_root_fallback = book_root.join(format!("{chapter_id}.wav"));
            if chapter_local.exists() {
                buffer_descriptors.push(BufferDescriptor { role: BufferRole::Raw, path: chapter_local });
            } else if book_root_fallback.exists() {
                buffer_descriptors.push(BufferDescriptor { role: BufferRole::Raw, path: book_root_fallback });
            }
        }

        descriptors.push(ChapterDescriptor {
            chapter_id,
            root_path: dir,
            aliases: Vec::new(),
            buffer_descriptors,
            book_start_word: None,
            book_end_word: None,
        });
    }

    Ok(descriptors)
}
