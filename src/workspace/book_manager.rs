//! `BookManager` (§4.10): memoizes the parsed `BookIndex` per book, guarded
//! by the single-permit `BookIndexSemaphore` (§5) so the first build of a
//! given book's index is never raced.

use crate::book::{build_book_index, BookIndex, BookIndexConfig, DocumentParser};
use crate::error::PipelineError;
use crate::manifest::hash_file;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::{Mutex, Semaphore};

pub struct BookManager {
    semaphore: Arc<Semaphore>,
    cache: Mutex<HashMap<String, Arc<BookIndex>>>,
}

impl Default for BookManager {
    fn default() -> Self {
        Self::new()
    }
}

impl BookManager {
    pub fn new() -> Self {
        Self { semaphore: Arc::new(Semaphore::new(1)), cache: Mutex::new(HashMap::new()) }
    }

    /// Returns the cached `BookIndex` for `source_file` if present, otherwise
    /// parses and builds it under the single-permit semaphore, re-checking
    /// the cache after acquiring the permit in case a racing caller won.
    pub async fn get_or_build(
        &self,
        source_file: &Path,
        parser: &dyn DocumentParser,
        config: &BookIndexConfig,
    ) -> Result<Arc<BookIndex>, PipelineError> {
        let source_hash = hash_file(source_file)?;

        if let Some(existing) = self.cache.lock().await.get(&source_hash) {
            return Ok(existing.clone());
        }

        let _permit = self.semaphore.acquire().await.expect("BookManager semaphore is never closed");

        if let Some(existing) = self.cache.lock().await.get(&source_hash) {
            return Ok(existing.clone());
        }

        let parsed = parser.parse(source_file)?;
        let index = Arc::new(build_book_index(&source_file.display().to_string(), &parsed, config)?);
        self.cache.lock().await.insert(source_hash, index.clone());
        Ok(index)
    }
}
