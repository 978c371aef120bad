//! `MfaWorkspacePool` (§5): a finite pool of isolated working directories for
//! concurrent MFA invocations. Acquiring a permit also reserves a specific
//! workspace directory; release returns the workspace to the pool.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

pub struct MfaWorkspacePool {
    semaphore: Arc<Semaphore>,
    available: Arc<Mutex<Vec<PathBuf>>>,
}

impl MfaWorkspacePool {
    /// Creates `count` workspace directories under `base_dir` named
    /// `MFA_1`..`MFA_count`. Directories are created lazily by callers that
    /// actually write into them; the pool only tracks paths.
    pub fn new(base_dir: &Path, count: usize) -> Self {
        let dirs: Vec<PathBuf> = (1..=count.max(1)).map(|i| base_dir.join(format!("MFA_{i}"))).collect();
        Self { semaphore: Arc::new(Semaphore::new(dirs.len())), available: Arc::new(Mutex::new(dirs)) }
    }

    pub async fn acquire(&self) -> MfaWorkspaceGuard {
        let permit = self.semaphore.clone().acquire_owned().await.expect("MfaWorkspacePool semaphore is never closed");
        let path = self.available.lock().expect("workspace pool lock poisoned").pop().expect("pool size matches semaphore permit count");
        MfaWorkspaceGuard { available: self.available.clone(), path: Some(path), _permit: permit }
    }
}

pub struct MfaWorkspaceGuard {
    available: Arc<Mutex<Vec<PathBuf>>>,
    path: Option<PathBuf>,
    _permit: OwnedSemaphorePermit,
}

impl MfaWorkspaceGuard {
    pub fn path(&self) -> &Path {
        self.path.as_deref().expect("path taken only on drop")
    }
}

impl Drop for MfaWorkspaceGuard {
    fn drop(&mut self) {
        if let Some(path) = self.path.take() {
            self.available.lock().expect("workspace pool lock poisoned").push(path);
        }
    }
}
