//! Named, fair semaphores and the MFA workspace pool (§5). `BookIndexSemaphore`
//! lives on [`crate::workspace::BookManager`] since it guards a book-wide
//! cache, not a per-chapter resource; the pools gathered here are the ones
//! the stage orchestrator itself acquires permits from.

use crate::workspace::MfaWorkspacePool;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;

#[derive(Debug, Clone)]
pub struct StageTimeouts {
    pub asr: Duration,
    pub mfa: Duration,
    pub cpu: Duration,
}

impl Default for StageTimeouts {
    fn default() -> Self {
        Self { asr: Duration::from_secs(15 * 60), mfa: Duration::from_secs(30 * 60), cpu: Duration::from_secs(10 * 60) }
    }
}

/// Resource pools shared across every concurrently-running chapter pipeline
/// in one process (§5). Constructed once by the caller (CLI batch driver)
/// and passed by reference into each chapter's orchestration.
pub struct ResourcePools {
    pub asr_semaphore: Arc<Semaphore>,
    pub mfa_pool: Arc<MfaWorkspacePool>,
    pub timeouts: StageTimeouts,
}

impl ResourcePools {
    pub fn new(asr_concurrency: usize, mfa_pool: Arc<MfaWorkspacePool>, timeouts: StageTimeouts) -> Self {
        Self { asr_semaphore: Arc::new(Semaphore::new(asr_concurrency.max(1))), mfa_pool, timeouts }
    }
}
