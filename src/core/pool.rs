use crate::utils::error::{DataError, Result};
use std::future::Future;
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;

/// A bounded executor: at most `max_concurrent` submitted jobs run at once.
///
/// Cloning is cheap and clones share the same bound.
#[derive(Debug, Clone)]
pub struct WorkerPool {
    permits: Arc<Semaphore>,
    max_concurrent: usize,
    runtime: Handle,
}

impl WorkerPool {
    /// Creates a pool bound to the current tokio runtime.
    pub fn new(max_concurrent: usize) -> Result<Self> {
        Ok(Self::with_handle(max_concurrent, Handle::try_current()?))
    }

    pub fn with_handle(max_concurrent: usize, runtime: Handle) -> Self {
        let max_concurrent = max_concurrent.max(1);
        Self {
            permits: Arc::new(Semaphore::new(max_concurrent)),
            max_concurrent,
            runtime,
        }
    }

    pub fn max_concurrent(&self) -> usize {
        self.max_concurrent
    }

    /// Number of jobs currently holding a slot.
    pub fn active(&self) -> usize {
        self.max_concurrent - self.permits.available_permits()
    }

    /// Spawns `work`, which starts only once a slot is free and holds it until done.
    pub fn submit<F, T>(&self, work: F) -> JoinHandle<Result<T>>
    where
        F: Future<Output = Result<T>> + Send + 'static,
        T: Send + 'static,
    {
        let permits = Arc::clone(&self.permits);
        self.runtime.spawn(async move {
            let _permit = permits
                .acquire_owned()
                .await
                .map_err(|_| DataError::PoolClosed)?;
            work.await
        })
    }

    /// Stops admitting queued jobs; jobs already holding a slot run to completion.
    pub fn close(&self) {
        self.permits.close();
    }
}

/// Pool size used when none is configured: the machine's available parallelism.
pub fn default_pool_size() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4)
}
