//! Job submission and status queries
//!
//! The library boundary callers use to create jobs and read their state.
//! Submission persists a Pending record first and only then nudges the work
//! queue; a full queue is not an error because the poller re-discovers
//! Pending jobs on its next scan.

use std::sync::Arc;
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{info, warn};
use uuid::Uuid;

use drumline_core::{ConversionJob, JobSnapshot, SubmitRequest};

use crate::store::{JobStore, StoreError};

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("invalid submission: {0}")]
    Invalid(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

pub struct JobService {
    store: Arc<dyn JobStore>,
    queue: mpsc::Sender<Uuid>,
}

impl JobService {
    pub fn new(store: Arc<dyn JobStore>, queue: mpsc::Sender<Uuid>) -> Self {
        Self { store, queue }
    }

    /// Accepts a conversion request and returns the new job's snapshot
    pub async fn submit(&self, req: SubmitRequest) -> Result<JobSnapshot, ServiceError> {
        if req.input_ref.trim().is_empty() {
            return Err(ServiceError::Invalid("input_ref cannot be empty".into()));
        }
        if req.tempo == 0 {
            return Err(ServiceError::Invalid("tempo must be greater than 0".into()));
        }
        if req.genre.trim().is_empty() {
            return Err(ServiceError::Invalid("genre cannot be empty".into()));
        }
        if req.level.trim().is_empty() {
            return Err(ServiceError::Invalid("level cannot be empty".into()));
        }

        let job = ConversionJob::new(
            req.input_ref,
            req.genre,
            req.tempo,
            req.level,
            req.owner_token,
        );
        let id = job.id;
        let snapshot = JobSnapshot::from(job.clone());

        self.store.create(job).await?;
        info!(%id, "job submitted");

        // Best-effort wakeup. The Pending record is already durable, so a
        // full queue only delays the run until the next poll.
        if let Err(e) = self.queue.try_send(id) {
            warn!(%id, "work queue full, job left for the poller: {e}");
        }

        Ok(snapshot)
    }

    /// Reads the current state of a job
    pub async fn query_status(&self, id: Uuid) -> Result<JobSnapshot, ServiceError> {
        let job = self.store.find(id).await?;
        Ok(JobSnapshot::from(job))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryJobStore;
    use drumline_core::JobStatus;

    fn service(capacity: usize) -> (JobService, mpsc::Receiver<Uuid>, Arc<MemoryJobStore>) {
        let store = Arc::new(MemoryJobStore::new());
        let (tx, rx) = mpsc::channel(capacity);
        (JobService::new(store.clone(), tx), rx, store)
    }

    fn request() -> SubmitRequest {
        SubmitRequest {
            input_ref: "uploads/track.wav".to_string(),
            genre: "Rock".to_string(),
            tempo: 120,
            level: "Normal".to_string(),
            owner_token: Some("session-1".to_string()),
        }
    }

    #[tokio::test]
    async fn test_submit_creates_pending_and_enqueues() {
        let (service, mut rx, store) = service(4);

        let snapshot = service.submit(request()).await.unwrap();
        assert_eq!(snapshot.status, JobStatus::Pending);
        assert!(snapshot.output_refs.is_none());

        let queued = rx.try_recv().unwrap();
        assert_eq!(queued, snapshot.job_id);

        let stored = store.find(snapshot.job_id).await.unwrap();
        assert_eq!(stored.status, JobStatus::Pending);
    }

    #[tokio::test]
    async fn test_submit_rejects_bad_input() {
        let (service, _rx, _store) = service(4);

        let mut req = request();
        req.input_ref = "  ".to_string();
        assert!(matches!(
            service.submit(req).await,
            Err(ServiceError::Invalid(_))
        ));

        let mut req = request();
        req.tempo = 0;
        assert!(matches!(
            service.submit(req).await,
            Err(ServiceError::Invalid(_))
        ));
    }

    #[tokio::test]
    async fn test_full_queue_still_persists_job() {
        let (service, _rx, store) = service(1);

        let first = service.submit(request()).await.unwrap();
        let second = service.submit(request()).await.unwrap();

        // Both records exist even though only one fit in the queue
        assert!(store.find(first.job_id).await.is_ok());
        assert!(store.find(second.job_id).await.is_ok());
    }

    #[tokio::test]
    async fn test_query_status_unknown_job() {
        let (service, _rx, _store) = service(4);
        assert!(matches!(
            service.query_status(Uuid::new_v4()).await,
            Err(ServiceError::Store(StoreError::NotFound(_)))
        ));
    }
}
