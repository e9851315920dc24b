//! Bounded worker pool for blocking retrieval and filesystem work

use std::sync::Arc;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

use crate::error::{MarketplaceError, Result};

/// Default number of concurrent blocking jobs
pub const DEFAULT_POOL_SIZE: usize = 2;

/// Default number of repository retrievals allowed in flight
pub const DEFAULT_RETRIEVAL_SLOTS: usize = 2;

/// Caps how many blocking jobs (tree walks, copies, scans) run at once
///
/// Jobs run on tokio's blocking threads; the semaphore keeps a huge copy
/// from occupying more than `size` of them. Retrievals hold slots of a
/// separate pool for their whole duration, so a hanging remote never
/// starves validation, listing or publish scans.
#[derive(Debug, Clone)]
pub struct WorkerPool {
    permits: Arc<Semaphore>,
    size: usize,
}

impl Default for WorkerPool {
    fn default() -> Self {
        Self::new(DEFAULT_POOL_SIZE)
    }
}

impl WorkerPool {
    pub fn new(size: usize) -> Self {
        let size = size.max(1);
        Self {
            permits: Arc::new(Semaphore::new(size)),
            size,
        }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Hold a slot while running async work that blocks on something external
    pub async fn acquire(&self) -> Result<OwnedSemaphorePermit> {
        self.permits
            .clone()
            .acquire_owned()
            .await
            .map_err(|e| MarketplaceError::WorkerPool(e.to_string()))
    }

    /// Run a blocking closure on the pool
    pub async fn run<F, T>(&self, job: F) -> Result<T>
    where
        F: FnOnce() -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let permit = self.acquire().await?;
        let outcome = tokio::task::spawn_blocking(move || {
            let _permit = permit;
            job()
        })
        .await
        .map_err(|e| MarketplaceError::WorkerPool(format!("blocking job failed: {e}")))?;
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn test_run_returns_job_result() {
        let pool = WorkerPool::default();
        let value = pool.run(|| Ok(21 * 2)).await.unwrap();
        assert_eq!(value, 42);
    }

    #[tokio::test]
    async fn test_job_error_propagates() {
        let pool = WorkerPool::default();
        let err = pool
            .run::<_, ()>(|| Err(MarketplaceError::Config("bad".into())))
            .await
            .unwrap_err();
        assert!(matches!(err, MarketplaceError::Config(_)));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrency_is_bounded() {
        let pool = WorkerPool::new(2);
        let running = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..6 {
            let pool = pool.clone();
            let running = running.clone();
            let peak = peak.clone();
            handles.push(tokio::spawn(async move {
                pool.run(move || {
                    let now = running.fetch_add(1, Ordering::SeqCst) + 1;
                    peak.fetch_max(now, Ordering::SeqCst);
                    std::thread::sleep(Duration::from_millis(30));
                    running.fetch_sub(1, Ordering::SeqCst);
                    Ok(())
                })
                .await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        assert!(peak.load(Ordering::SeqCst) <= 2);
    }

    #[test]
    fn test_zero_size_is_promoted() {
        assert_eq!(WorkerPool::new(0).size(), 1);
    }
}
