//! Bounded worker pool for declaration generation
//!
//! The pool is created when a build run starts and shut down on every exit
//! path. `shutdown` waits for queued jobs; dropping the pool aborts them.

use crate::error::DeclarationError;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::{oneshot, Semaphore};
use tokio::task::JoinSet;

/// Semaphore-bounded task set
pub struct WorkerPool {
    permits: Arc<Semaphore>,
    tasks: Mutex<JoinSet<()>>,
    closed: AtomicBool,
    size: usize,
}

impl WorkerPool {
    /// Create a pool running at most `workers` jobs at once
    pub fn new(workers: usize) -> Self {
        let size = workers.max(1);
        Self {
            permits: Arc::new(Semaphore::new(size)),
            tasks: Mutex::new(JoinSet::new()),
            closed: AtomicBool::new(false),
            size,
        }
    }

    /// Create a pool with one worker per CPU
    pub fn with_default_size() -> Self {
        Self::new(num_cpus::get())
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Run `job` on the pool and wait for its result
    pub async fn execute<F, T>(&self, job: F) -> Result<T, DeclarationError>
    where
        F: Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        if self.closed.load(Ordering::SeqCst) {
            return Err(DeclarationError::PoolClosed);
        }

        let (tx, rx) = oneshot::channel();
        let permits = self.permits.clone();
        {
            let mut tasks = self.lock();
            while let Some(joined) = tasks.try_join_next() {
                if let Err(e) = joined {
                    log::warn!("declaration worker failed: {}", e);
                }
            }
            tasks.spawn(async move {
                let Ok(_permit) = permits.acquire_owned().await else {
                    return;
                };
                let _ = tx.send(job.await);
            });
        }

        rx.await.map_err(|_| DeclarationError::PoolClosed)
    }

    /// Refuse new jobs and wait for the queued ones
    pub async fn shutdown(&self) {
        self.closed.store(true, Ordering::SeqCst);
        let mut tasks = std::mem::take(&mut *self.lock());
        while let Some(joined) = tasks.join_next().await {
            if let Err(e) = joined {
                log::warn!("declaration worker failed: {}", e);
            }
        }
        log::debug!("worker pool shut down");
    }

    /// Jobs spawned and not yet reaped
    pub fn pending(&self) -> usize {
        self.lock().len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, JoinSet<()>> {
        self.tasks.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
