//! Postgres job store
//!
//! Runtime-checked queries against a single `conversion_jobs` table. The
//! Pending -> Running claim is a conditional UPDATE so that two runners
//! racing on the same id can never both win.

use async_trait::async_trait;
use drumline_core::{ConversionJob, JobStatus, OutputRefs};
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use std::time::Duration;
use uuid::Uuid;

use super::{JobStore, StoreError};

pub struct PgJobStore {
    pool: PgPool,
}

impl PgJobStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connects to the database and ensures the schema exists
    pub async fn connect(database_url: &str) -> Result<Self, sqlx::Error> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .acquire_timeout(Duration::from_secs(5))
            .connect(database_url)
            .await?;

        run_migrations(&pool).await?;
        Ok(Self::new(pool))
    }
}

async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS conversion_jobs (
            id UUID PRIMARY KEY,
            owner_token VARCHAR(64),
            input_ref VARCHAR(255) NOT NULL,
            genre VARCHAR(64) NOT NULL,
            tempo INTEGER NOT NULL,
            level VARCHAR(16) NOT NULL,
            status VARCHAR(10) NOT NULL,
            midi_ref VARCHAR(255),
            score_ref VARCHAR(255),
            guide_audio_ref VARCHAR(255),
            mix_audio_ref VARCHAR(255),
            error_detail TEXT,
            created_at TIMESTAMPTZ NOT NULL,
            updated_at TIMESTAMPTZ NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_conversion_jobs_status ON conversion_jobs(status)")
        .execute(pool)
        .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_conversion_jobs_created_at ON conversion_jobs(created_at)",
    )
    .execute(pool)
    .await?;

    tracing::info!("Database migrations completed successfully");
    Ok(())
}

const SELECT_COLUMNS: &str = r#"
    SELECT id, owner_token, input_ref, genre, tempo, level, status,
           midi_ref, score_ref, guide_audio_ref, mix_audio_ref,
           error_detail, created_at, updated_at
    FROM conversion_jobs
"#;

#[async_trait]
impl JobStore for PgJobStore {
    async fn create(&self, job: ConversionJob) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO conversion_jobs
                (id, owner_token, input_ref, genre, tempo, level, status,
                 created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(job.id)
        .bind(&job.owner_token)
        .bind(&job.input_ref)
        .bind(&job.genre)
        .bind(job.tempo as i32)
        .bind(&job.level)
        .bind(status_to_string(job.status))
        .bind(job.created_at)
        .bind(job.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn find(&self, id: Uuid) -> Result<ConversionJob, StoreError> {
        let query = format!("{SELECT_COLUMNS} WHERE id = $1");
        let row = sqlx::query_as::<_, JobRow>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(ConversionJob::from).ok_or(StoreError::NotFound(id))
    }

    async fn list_pending(&self, limit: usize) -> Result<Vec<ConversionJob>, StoreError> {
        let query = format!("{SELECT_COLUMNS} WHERE status = $1 ORDER BY created_at ASC LIMIT $2");
        let rows = sqlx::query_as::<_, JobRow>(&query)
            .bind("PENDING")
            .bind(limit as i64)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().map(ConversionJob::from).collect())
    }

    async fn try_start(&self, id: Uuid) -> Result<ConversionJob, StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE conversion_jobs
            SET status = 'RUNNING', updated_at = $2
            WHERE id = $1 AND status = 'PENDING'
            "#,
        )
        .bind(id)
        .bind(chrono::Utc::now())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            // Lost the claim: distinguish a missing job from one that is
            // already running or terminal
            let current = self.find(id).await?;
            return Err(StoreError::Conflict {
                id,
                status: current.status,
            });
        }

        self.find(id).await
    }

    async fn complete(&self, id: Uuid, refs: OutputRefs) -> Result<(), StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE conversion_jobs
            SET status = 'DONE',
                midi_ref = $2,
                score_ref = $3,
                guide_audio_ref = $4,
                mix_audio_ref = $5,
                error_detail = NULL,
                updated_at = $6
            WHERE id = $1 AND status = 'RUNNING'
            "#,
        )
        .bind(id)
        .bind(&refs.midi)
        .bind(&refs.score)
        .bind(&refs.guide_audio)
        .bind(&refs.mix_audio)
        .bind(chrono::Utc::now())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            let current = self.find(id).await?;
            return Err(StoreError::Conflict {
                id,
                status: current.status,
            });
        }
        Ok(())
    }

    async fn fail(&self, id: Uuid, detail: String) -> Result<(), StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE conversion_jobs
            SET status = 'ERROR', error_detail = $2, updated_at = $3
            WHERE id = $1 AND status = 'RUNNING'
            "#,
        )
        .bind(id)
        .bind(detail)
        .bind(chrono::Utc::now())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            let current = self.find(id).await?;
            return Err(StoreError::Conflict {
                id,
                status: current.status,
            });
        }
        Ok(())
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

fn status_to_string(status: JobStatus) -> &'static str {
    match status {
        JobStatus::Pending => "PENDING",
        JobStatus::Running => "RUNNING",
        JobStatus::Done => "DONE",
        JobStatus::Error => "ERROR",
    }
}

fn string_to_status(s: &str) -> JobStatus {
    match s {
        "RUNNING" => JobStatus::Running,
        "DONE" => JobStatus::Done,
        "ERROR" => JobStatus::Error,
        _ => JobStatus::Pending,
    }
}

// =============================================================================
// Database Row Types
// =============================================================================

#[derive(sqlx::FromRow)]
struct JobRow {
    id: Uuid,
    owner_token: Option<String>,
    input_ref: String,
    genre: String,
    tempo: i32,
    level: String,
    status: String,
    midi_ref: Option<String>,
    score_ref: Option<String>,
    guide_audio_ref: Option<String>,
    mix_audio_ref: Option<String>,
    error_detail: Option<String>,
    created_at: chrono::DateTime<chrono::Utc>,
    updated_at: chrono::DateTime<chrono::Utc>,
}

impl From<JobRow> for ConversionJob {
    fn from(row: JobRow) -> Self {
        // All four refs are written in one statement, so either the whole
        // set is present or none of it is
        let output_refs = match (
            row.midi_ref,
            row.score_ref,
            row.guide_audio_ref,
            row.mix_audio_ref,
        ) {
            (Some(midi), Some(score), Some(guide_audio), Some(mix_audio)) => Some(OutputRefs {
                midi,
                score,
                guide_audio,
                mix_audio,
            }),
            _ => None,
        };

        ConversionJob {
            id: row.id,
            owner_token: row.owner_token,
            input_ref: row.input_ref,
            genre: row.genre,
            tempo: row.tempo.max(0) as u32,
            level: row.level,
            status: string_to_status(&row.status),
            output_refs,
            error_detail: row.error_detail,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}
