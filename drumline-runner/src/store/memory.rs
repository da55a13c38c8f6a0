//! In-memory job store
//!
//! Backs tests and database-less local runs with the same transition
//! semantics as the Postgres store.

use async_trait::async_trait;
use drumline_core::{ConversionJob, JobStatus, OutputRefs};
use std::collections::HashMap;
use std::sync::Mutex;
use uuid::Uuid;

use super::{JobStore, StoreError};

#[derive(Default)]
pub struct MemoryJobStore {
    jobs: Mutex<HashMap<Uuid, ConversionJob>>,
}

impl MemoryJobStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl JobStore for MemoryJobStore {
    async fn create(&self, job: ConversionJob) -> Result<(), StoreError> {
        let mut jobs = self.jobs.lock().unwrap();
        jobs.insert(job.id, job);
        Ok(())
    }

    async fn find(&self, id: Uuid) -> Result<ConversionJob, StoreError> {
        let jobs = self.jobs.lock().unwrap();
        jobs.get(&id).cloned().ok_or(StoreError::NotFound(id))
    }

    async fn list_pending(&self, limit: usize) -> Result<Vec<ConversionJob>, StoreError> {
        let jobs = self.jobs.lock().unwrap();
        let mut pending: Vec<ConversionJob> = jobs
            .values()
            .filter(|j| j.status == JobStatus::Pending)
            .cloned()
            .collect();
        pending.sort_by_key(|j| j.created_at);
        pending.truncate(limit);
        Ok(pending)
    }

    async fn try_start(&self, id: Uuid) -> Result<ConversionJob, StoreError> {
        let mut jobs = self.jobs.lock().unwrap();
        let job = jobs.get_mut(&id).ok_or(StoreError::NotFound(id))?;

        if job.status != JobStatus::Pending {
            return Err(StoreError::Conflict {
                id,
                status: job.status,
            });
        }

        job.status = JobStatus::Running;
        job.updated_at = chrono::Utc::now();
        Ok(job.clone())
    }

    async fn complete(&self, id: Uuid, refs: OutputRefs) -> Result<(), StoreError> {
        let mut jobs = self.jobs.lock().unwrap();
        let job = jobs.get_mut(&id).ok_or(StoreError::NotFound(id))?;

        if job.status != JobStatus::Running {
            return Err(StoreError::Conflict {
                id,
                status: job.status,
            });
        }

        job.status = JobStatus::Done;
        job.output_refs = Some(refs);
        job.error_detail = None;
        job.updated_at = chrono::Utc::now();
        Ok(())
    }

    async fn fail(&self, id: Uuid, detail: String) -> Result<(), StoreError> {
        let mut jobs = self.jobs.lock().unwrap();
        let job = jobs.get_mut(&id).ok_or(StoreError::NotFound(id))?;

        if job.status != JobStatus::Running {
            return Err(StoreError::Conflict {
                id,
                status: job.status,
            });
        }

        job.status = JobStatus::Error;
        job.error_detail = Some(detail);
        job.updated_at = chrono::Utc::now();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_job() -> ConversionJob {
        ConversionJob::new("uploads/guest/song.wav", "Rock", 120, "Normal", None)
    }

    fn sample_refs() -> OutputRefs {
        OutputRefs {
            midi: "results/j/drums.mid".to_string(),
            score: "results/j/score.pdf".to_string(),
            guide_audio: "results/j/guide.wav".to_string(),
            mix_audio: "results/j/mix.wav".to_string(),
        }
    }

    #[tokio::test]
    async fn test_create_and_find() {
        let store = MemoryJobStore::new();
        let job = sample_job();
        let id = job.id;

        store.create(job).await.unwrap();
        let found = store.find(id).await.unwrap();
        assert_eq!(found.status, JobStatus::Pending);

        let missing = store.find(Uuid::new_v4()).await;
        assert!(matches!(missing, Err(StoreError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_try_start_claims_once() {
        let store = MemoryJobStore::new();
        let job = sample_job();
        let id = job.id;
        store.create(job).await.unwrap();

        let claimed = store.try_start(id).await.unwrap();
        assert_eq!(claimed.status, JobStatus::Running);

        // Second claim must be rejected
        let second = store.try_start(id).await;
        assert!(matches!(
            second,
            Err(StoreError::Conflict {
                status: JobStatus::Running,
                ..
            })
        ));
    }

    #[tokio::test]
    async fn test_try_start_rejects_terminal() {
        let store = MemoryJobStore::new();
        let job = sample_job();
        let id = job.id;
        store.create(job).await.unwrap();

        store.try_start(id).await.unwrap();
        store.fail(id, "boom".to_string()).await.unwrap();

        let restart = store.try_start(id).await;
        assert!(matches!(restart, Err(StoreError::Conflict { .. })));
    }

    #[tokio::test]
    async fn test_complete_links_all_refs_and_clears_error() {
        let store = MemoryJobStore::new();
        let job = sample_job();
        let id = job.id;
        store.create(job).await.unwrap();
        store.try_start(id).await.unwrap();

        store.complete(id, sample_refs()).await.unwrap();

        let done = store.find(id).await.unwrap();
        assert_eq!(done.status, JobStatus::Done);
        let refs = done.output_refs.unwrap();
        assert_eq!(refs.iter().count(), 4);
        assert!(done.error_detail.is_none());
    }

    #[tokio::test]
    async fn test_fail_keeps_refs_empty() {
        let store = MemoryJobStore::new();
        let job = sample_job();
        let id = job.id;
        store.create(job).await.unwrap();
        store.try_start(id).await.unwrap();

        store.fail(id, "score render failed: mscore missing".to_string())
            .await
            .unwrap();

        let failed = store.find(id).await.unwrap();
        assert_eq!(failed.status, JobStatus::Error);
        assert!(failed.output_refs.is_none());
        assert!(failed.error_detail.unwrap().contains("mscore"));
    }

    #[tokio::test]
    async fn test_terminal_transitions_require_running() {
        let store = MemoryJobStore::new();
        let job = sample_job();
        let id = job.id;
        store.create(job).await.unwrap();

        // Neither terminal transition applies to a Pending job
        let done = store.complete(id, sample_refs()).await;
        assert!(matches!(
            done,
            Err(StoreError::Conflict {
                status: JobStatus::Pending,
                ..
            })
        ));
        let failed = store.fail(id, "boom".to_string()).await;
        assert!(matches!(failed, Err(StoreError::Conflict { .. })));

        // Nor to a job that is already terminal
        store.try_start(id).await.unwrap();
        store.complete(id, sample_refs()).await.unwrap();
        let refail = store.fail(id, "late".to_string()).await;
        assert!(matches!(
            refail,
            Err(StoreError::Conflict {
                status: JobStatus::Done,
                ..
            })
        ));

        let job = store.find(id).await.unwrap();
        assert_eq!(job.status, JobStatus::Done);
        assert!(job.error_detail.is_none());
    }

    #[tokio::test]
    async fn test_list_pending_oldest_first() {
        let store = MemoryJobStore::new();

        let mut first = sample_job();
        first.created_at = chrono::Utc::now() - chrono::Duration::seconds(60);
        let first_id = first.id;

        let second = sample_job();
        let second_id = second.id;

        store.create(second).await.unwrap();
        store.create(first).await.unwrap();

        let pending = store.list_pending(10).await.unwrap();
        assert_eq!(pending.len(), 2);
        assert_eq!(pending[0].id, first_id);
        assert_eq!(pending[1].id, second_id);

        // Running jobs drop out of the listing
        store.try_start(first_id).await.unwrap();
        let pending = store.list_pending(10).await.unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].id, second_id);
    }

    #[tokio::test]
    async fn test_updated_at_advances() {
        let store = MemoryJobStore::new();
        let job = sample_job();
        let id = job.id;
        let created = job.updated_at;
        store.create(job).await.unwrap();

        store.try_start(id).await.unwrap();
        let running = store.find(id).await.unwrap();
        assert!(running.updated_at > created);
    }
}
