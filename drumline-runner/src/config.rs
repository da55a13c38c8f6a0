//! Runner configuration
//!
//! All paths and tunables are resolved from the environment once at startup;
//! nothing in the pipeline re-reads the environment per invocation.

use std::path::PathBuf;
use std::time::Duration;

/// Guide-audio formats the built-in mixer can consume
const SUPPORTED_GUIDE_FORMATS: [&str; 1] = ["wav"];

/// Runner configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Postgres connection string; when absent the runner falls back to the
    /// in-memory job store (local development only)
    pub database_url: Option<String>,

    /// Root directory of the filesystem object store
    pub storage_root: PathBuf,

    /// Base directory under which per-job working directories are created
    pub workspace_base: PathBuf,

    /// Notation executable override (otherwise resolved per platform)
    pub musescore_path: Option<PathBuf>,

    /// Sound-bank (.sf2) override (otherwise well-known defaults are probed)
    pub soundfont_path: Option<PathBuf>,

    /// File extension of the rendered guide audio
    pub guide_audio_format: String,

    /// Key prefix under which artifacts are published, per job:
    /// `<result_prefix>/<job_id>/<artifact>`
    pub result_prefix: String,

    /// How often the poller scans the store for Pending jobs
    pub poll_interval: Duration,

    /// Fixed number of worker tasks consuming the job queue
    pub max_parallel_jobs: usize,

    /// Wall-clock budget for each external-process invocation
    pub stage_timeout: Duration,

    /// Capacity of the bounded job-id queue
    pub queue_capacity: usize,
}

impl Config {
    /// Creates configuration from environment variables
    ///
    /// Recognized variables:
    /// - DATABASE_URL (optional)
    /// - STORAGE_ROOT (optional, default: ./storage)
    /// - WORKSPACE_BASE (optional, default: <tmp>/drumline)
    /// - MUSESCORE_PATH (optional)
    /// - SOUNDFONT_PATH (optional)
    /// - GUIDE_AUDIO_FORMAT (optional, default: wav)
    /// - RESULT_PREFIX (optional, default: results)
    /// - POLL_INTERVAL (optional, seconds, default: 5)
    /// - MAX_PARALLEL_JOBS (optional, default: 2)
    /// - STAGE_TIMEOUT (optional, seconds, default: 300)
    /// - QUEUE_CAPACITY (optional, default: 64)
    pub fn from_env() -> Self {
        let database_url = std::env::var("DATABASE_URL").ok();

        let storage_root = std::env::var("STORAGE_ROOT")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("./storage"));

        let workspace_base = std::env::var("WORKSPACE_BASE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| std::env::temp_dir().join("drumline"));

        let musescore_path = std::env::var("MUSESCORE_PATH").ok().map(PathBuf::from);
        let soundfont_path = std::env::var("SOUNDFONT_PATH").ok().map(PathBuf::from);

        let guide_audio_format = std::env::var("GUIDE_AUDIO_FORMAT")
            .unwrap_or_else(|_| "wav".to_string())
            .to_lowercase();

        let result_prefix =
            std::env::var("RESULT_PREFIX").unwrap_or_else(|_| "results".to_string());

        let poll_interval = std::env::var("POLL_INTERVAL")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .map(Duration::from_secs)
            .unwrap_or(Duration::from_secs(5));

        let max_parallel_jobs = std::env::var("MAX_PARALLEL_JOBS")
            .ok()
            .and_then(|s| s.parse::<usize>().ok())
            .unwrap_or(2);

        let stage_timeout = std::env::var("STAGE_TIMEOUT")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .map(Duration::from_secs)
            .unwrap_or(Duration::from_secs(300));

        let queue_capacity = std::env::var("QUEUE_CAPACITY")
            .ok()
            .and_then(|s| s.parse::<usize>().ok())
            .unwrap_or(64);

        Self {
            database_url,
            storage_root,
            workspace_base,
            musescore_path,
            soundfont_path,
            guide_audio_format,
            result_prefix,
            poll_interval,
            max_parallel_jobs,
            stage_timeout,
            queue_capacity,
        }
    }

    /// Validates the configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if !SUPPORTED_GUIDE_FORMATS.contains(&self.guide_audio_format.as_str()) {
            anyhow::bail!(
                "unsupported guide audio format '{}' (supported: {})",
                self.guide_audio_format,
                SUPPORTED_GUIDE_FORMATS.join(", ")
            );
        }

        if self.result_prefix.is_empty() {
            anyhow::bail!("result_prefix cannot be empty");
        }

        if self.poll_interval.as_secs() == 0 {
            anyhow::bail!("poll_interval must be greater than 0");
        }

        if self.max_parallel_jobs == 0 {
            anyhow::bail!("max_parallel_jobs must be greater than 0");
        }

        if self.stage_timeout.as_secs() == 0 {
            anyhow::bail!("stage_timeout must be greater than 0");
        }

        if self.queue_capacity == 0 {
            anyhow::bail!("queue_capacity must be greater than 0");
        }

        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_url: None,
            storage_root: PathBuf::from("./storage"),
            workspace_base: std::env::temp_dir().join("drumline"),
            musescore_path: None,
            soundfont_path: None,
            guide_audio_format: "wav".to_string(),
            result_prefix: "results".to_string(),
            poll_interval: Duration::from_secs(5),
            max_parallel_jobs: 2,
            stage_timeout: Duration::from_secs(300),
            queue_capacity: 64,
        }
    }
}
