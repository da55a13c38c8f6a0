//! Store poller
//!
//! Periodically scans the job store for Pending jobs and pushes their ids
//! into the work queue. This is the recovery path for jobs whose submission
//! wakeup was lost (full queue, runner restart); re-enqueuing an id that is
//! already in flight is safe because claiming is atomic.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::store::JobStore;

/// Pending jobs fetched per scan
const POLL_BATCH: usize = 16;

pub struct Poller {
    store: Arc<dyn JobStore>,
    queue: mpsc::Sender<Uuid>,
    interval: Duration,
}

impl Poller {
    pub fn new(store: Arc<dyn JobStore>, queue: mpsc::Sender<Uuid>, interval: Duration) -> Self {
        Self {
            store,
            queue,
            interval,
        }
    }

    /// Runs until the queue's receiving side is closed
    pub async fn run(self) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            ticker.tick().await;
            if self.queue.is_closed() {
                debug!("work queue closed, poller stopping");
                return;
            }
            self.scan().await;
        }
    }

    async fn scan(&self) {
        let pending = match self.store.list_pending(POLL_BATCH).await {
            Ok(jobs) => jobs,
            Err(e) => {
                warn!("poll failed: {e}");
                return;
            }
        };
        if pending.is_empty() {
            return;
        }

        debug!(count = pending.len(), "enqueuing pending jobs");
        for job in pending {
            // Full queue just means the workers are saturated; the job will
            // be picked up on a later scan.
            if self.queue.try_send(job.id).is_err() {
                return;
            }
        }
    }
}
