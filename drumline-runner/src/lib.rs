//! Drumline runner
//!
//! The worker side of the drum-accompaniment service: takes a Pending
//! conversion job, stages its source audio from durable storage, drives the
//! four-stage pipeline (generate drums, write MIDI, render score and guide
//! audio, mix), publishes the artifacts, and moves the job to a terminal
//! state.
//!
//! Layout:
//! - `config`: environment-resolved settings, fixed once at startup
//! - `store`: the durable job record (Postgres or in-memory)
//! - `storage`: durable object storage for inputs and artifacts
//! - `workdir`: scoped per-job scratch directory with guaranteed cleanup
//! - `generate` / `midi` / `render` / `mix`: the pipeline adapters
//! - `pipeline`: the strictly sequential stage orchestrator
//! - `runner`: staging, state transitions, publication, cleanup
//! - `service` / `scheduler`: submission boundary, work queue, worker pool
//!
//! The HTTP layer that creates jobs is a separate concern; anything that can
//! write a Pending record into the job store feeds this runner.

pub mod config;
pub mod error;
pub mod generate;
pub mod midi;
pub mod mix;
pub mod pipeline;
pub mod render;
pub mod runner;
pub mod scheduler;
pub mod service;
pub mod storage;
pub mod store;
pub mod workdir;
