//! Job store
//!
//! The durable record of conversion jobs. The runner is the only writer for
//! a job once it claims it via `try_start`; the submission boundary only
//! creates Pending records and reads snapshots.

use async_trait::async_trait;
use drumline_core::{ConversionJob, JobStatus, OutputRefs};
use thiserror::Error;
use uuid::Uuid;

pub mod memory;
pub mod postgres;

pub use memory::MemoryJobStore;
pub use postgres::PgJobStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("job {0} not found")]
    NotFound(Uuid),

    /// The job was not Pending when an execution tried to claim it: either
    /// another runner already started it or it is terminal. The caller must
    /// treat this as "do not run".
    #[error("job {id} cannot start from status {status:?}")]
    Conflict { id: Uuid, status: JobStatus },

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Persistence operations for conversion jobs
///
/// Every mutation advances `updated_at`. Status transitions are forward-only
/// and `try_start` is atomic, which is what enforces at-most-one execution
/// per job id.
#[async_trait]
pub trait JobStore: Send + Sync {
    /// Persists a freshly created Pending job
    async fn create(&self, job: ConversionJob) -> Result<(), StoreError>;

    /// Loads a job by id
    async fn find(&self, id: Uuid) -> Result<ConversionJob, StoreError>;

    /// Lists Pending jobs, oldest first
    async fn list_pending(&self, limit: usize) -> Result<Vec<ConversionJob>, StoreError>;

    /// Atomically transitions Pending -> Running and returns the claimed
    /// job. Any other current status yields `StoreError::Conflict`.
    async fn try_start(&self, id: Uuid) -> Result<ConversionJob, StoreError>;

    /// Transitions Running -> Done, linking all four output references at
    /// once and clearing any prior error detail. Any other current status
    /// yields `StoreError::Conflict`.
    async fn complete(&self, id: Uuid, refs: OutputRefs) -> Result<(), StoreError>;

    /// Transitions Running -> Error with a diagnostic; output references
    /// stay empty. Any other current status yields `StoreError::Conflict`.
    async fn fail(&self, id: Uuid, detail: String) -> Result<(), StoreError>;
}
