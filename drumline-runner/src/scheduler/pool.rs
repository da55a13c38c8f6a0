//! Worker pool
//!
//! Fixed number of tasks pulling job ids from a shared queue. The pool size
//! is the parallelism cap: each worker runs one job at a time and the queue
//! hands every id to exactly one worker.

use std::sync::Arc;
use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinHandle;
use tracing::{error, info};
use uuid::Uuid;

use crate::runner::JobRunner;

pub struct WorkerPool {
    handles: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    /// Spawns `size` workers consuming `queue`
    pub fn spawn(size: usize, queue: mpsc::Receiver<Uuid>, runner: Arc<JobRunner>) -> Self {
        let queue = Arc::new(Mutex::new(queue));
        let handles = (0..size)
            .map(|worker| {
                let queue = Arc::clone(&queue);
                let runner = Arc::clone(&runner);
                tokio::spawn(async move {
                    loop {
                        // The lock is held only while waiting for one id, so
                        // idle workers queue up fairly behind it.
                        let job_id = match queue.lock().await.recv().await {
                            Some(id) => id,
                            None => break,
                        };
                        if let Err(e) = runner.execute(job_id).await {
                            error!(worker, %job_id, "job execution error: {e}");
                        }
                    }
                    info!(worker, "worker stopped");
                })
            })
            .collect();
        Self { handles }
    }

    /// Waits for all workers to drain the queue and exit; call after the
    /// sending side has been dropped
    pub async fn join(self) {
        for handle in self.handles {
            if let Err(e) = handle.await {
                error!("worker task panicked: {e}");
            }
        }
    }
}
