//! Job submission and status DTOs

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::job::{ConversionJob, JobStatus, OutputRefs};

/// Request to create a conversion job
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitRequest {
    pub input_ref: String,
    pub genre: String,
    pub tempo: u32,
    pub level: String,
    pub owner_token: Option<String>,
}

/// Read-only snapshot of a job, safe to poll repeatedly
///
/// A terminal job always yields the same snapshot (modulo nothing: no field
/// of a Done or Error job changes again).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobSnapshot {
    pub job_id: Uuid,
    pub status: JobStatus,
    pub output_refs: Option<OutputRefs>,
    pub error_detail: Option<String>,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

impl From<ConversionJob> for JobSnapshot {
    fn from(job: ConversionJob) -> Self {
        Self {
            job_id: job.id,
            status: job.status,
            output_refs: job.output_refs,
            error_detail: job.error_detail,
            created_at: job.created_at,
            updated_at: job.updated_at,
        }
    }
}
