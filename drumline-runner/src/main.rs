//! Drumline Runner
//!
//! A worker daemon that turns uploaded recordings into drum accompaniments.
//!
//! Architecture:
//! - Configuration: settings from environment or defaults
//! - Store: durable job records (Postgres, or in-memory for development)
//! - Pipeline: generate -> MIDI -> score/guide renders -> mix
//! - Scheduler: store poller feeding a bounded queue, fixed worker pool
//!
//! The runner claims Pending jobs atomically, executes the conversion
//! pipeline in a per-job working directory, publishes the four artifacts to
//! object storage and records the terminal status.

use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use drumline_runner::config::Config;
use drumline_runner::generate::PatternGenerator;
use drumline_runner::mix::WavMixer;
use drumline_runner::pipeline::Adapters;
use drumline_runner::render::platform_renderers;
use drumline_runner::runner::JobRunner;
use drumline_runner::scheduler::{Poller, WorkerPool};
use drumline_runner::storage::fs::FsObjectStore;
use drumline_runner::store::{JobStore, MemoryJobStore, PgJobStore};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "drumline_runner=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Drumline Runner");

    let config = Config::from_env();
    config.validate()?;
    info!(
        "Loaded configuration: workers={}, poll_interval={:?}, storage_root={}",
        config.max_parallel_jobs,
        config.poll_interval,
        config.storage_root.display()
    );

    let store: Arc<dyn JobStore> = match &config.database_url {
        Some(url) => {
            let store = PgJobStore::connect(url)
                .await
                .context("Failed to connect to the job database")?;
            info!("Connected to the job database");
            Arc::new(store)
        }
        None => {
            warn!("DATABASE_URL not set, using the in-memory job store; jobs do not survive restarts");
            Arc::new(MemoryJobStore::new())
        }
    };

    let storage = Arc::new(
        FsObjectStore::new(config.storage_root.clone())
            .context("Failed to open the object-store root")?,
    );

    let (score, audio) = platform_renderers(&config);
    let adapters = Arc::new(Adapters {
        generator: Arc::new(PatternGenerator::new()),
        score: Arc::new(score),
        audio: Arc::new(audio),
        mixer: Arc::new(WavMixer::default()),
    });

    let runner = Arc::new(JobRunner::new(
        store.clone(),
        storage,
        adapters,
        config.clone(),
    ));

    let (queue_tx, queue_rx) = tokio::sync::mpsc::channel(config.queue_capacity);
    let pool = WorkerPool::spawn(config.max_parallel_jobs, queue_rx, runner);
    let poller = Poller::new(store, queue_tx, config.poll_interval);
    let poller_handle = tokio::spawn(poller.run());

    info!("Runner initialized, waiting for jobs");

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for shutdown signal")?;
    info!("Shutdown signal received, draining workers");

    // Aborting the poller drops the queue sender; the workers drain what is
    // already queued and exit.
    poller_handle.abort();
    pool.join().await;

    info!("Runner stopped");
    Ok(())
}
