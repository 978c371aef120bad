//! `ChapterManager` (§4.10): mediates concurrent `ChapterContext` opens with
//! a per-chapter mutex, matching the teacher's `Arc<Mutex<Option<WhisperEngine>>>`
//! single-writer pattern generalized to one lock per chapter id.

use crate::chapter::{ChapterContext, ChapterContextHandle, ChapterDescriptor};
use crate::error::PipelineError;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenPolicy {
    /// Wait for any concurrent opener of the same chapter to finish.
    WaitForLock,
    /// Return `ToolUnavailable` immediately if the chapter is already open.
    FailFast,
}

/// Held for the duration the caller has the chapter open; dropping it
/// releases the per-chapter lock for the next opener.
pub struct ChapterLease {
    pub handle: ChapterContextHandle,
    _guard: OwnedMutexGuard<()>,
}

pub struct ChapterManager {
    artifacts_root: PathBuf,
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl ChapterManager {
    pub fn new(artifacts_root: PathBuf) -> Self {
        Self { artifacts_root, locks: Mutex::new(HashMap::new()) }
    }

    async fn lock_for(&self, chapter_id: &str) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().await;
        locks.entry(chapter_id.to_string()).or_insert_with(|| Arc::new(Mutex::new(()))).clone()
    }

    pub async fn open(&self, descriptor: ChapterDescriptor, policy: OpenPolicy) -> Result<ChapterLease, PipelineError> {
        let lock = self.lock_for(&descriptor.chapter_id).await;
        let guard = match policy {
            OpenPolicy::WaitForLock => lock.lock_owned().await,
            OpenPolicy::FailFast => lock.try_lock_owned().map_err(|_| PipelineError::ToolUnavailable {
                tool: "chapter_manager".to_string(),
                message: format!("chapter `{}` is already open by another caller", descriptor.chapter_id),
            })?,
        };

        let artifacts_dir = self.artifacts_root.join(&descriptor.chapter_id);
        let context = ChapterContext::open(descriptor, &artifacts_dir);
        Ok(ChapterLease { handle: ChapterContextHandle::new(context), _guard: guard })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn descriptor(chapter_id: &str) -> ChapterDescriptor {
        ChapterDescriptor {
            chapter_id: chapter_id.to_string(),
            root_path: PathBuf::from(format!("/book/{chapter_id}")),
            aliases: vec![],
            buffer_descriptors: vec![],
            book_start_word: None,
            book_end_word: None,
        }
    }

    #[tokio::test]
    async fn fail_fast_rejects_second_concurrent_open() {
        let dir = tempdir().unwrap();
        let manager = ChapterManager::new(dir.path().to_path_buf());
        let first = manager.open(descriptor("ch01"), OpenPolicy::FailFast).await.unwrap();
        let second = manager.open(descriptor("ch01"), OpenPolicy::FailFast).await;
        assert!(second.is_err());
        drop(first);
        let third = manager.open(descriptor("ch01"), OpenPolicy::FailFast).await;
        assert!(third.is_ok());
    }

    #[tokio::test]
    async fn different_chapters_never_contend() {
        let dir = tempdir().unwrap();
        let manager = ChapterManager::new(dir.path().to_path_buf());
        let a = manager.open(descriptor("ch01"), OpenPolicy::FailFast).await;
        let b = manager.open(descriptor("ch02"), OpenPolicy::FailFast).await;
        assert!(a.is_ok());
        assert!(b.is_ok());
    }
}
