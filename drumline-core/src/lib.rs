//! Core domain types and DTOs for drumline
//!
//! This crate contains:
//! - The conversion-job record and its lifecycle types
//! - The in-memory drum track produced by generation
//! - DTOs for the submission/status boundary
//!
//! Note: Persistence lives in the runner's store module, execution logic in
//! the runner's pipeline and scheduler.

pub mod domain;
pub mod dto;

pub use domain::job::{ArtifactKind, ConversionJob, JobStatus, OutputRefs};
pub use domain::track::{DrumTrack, DrumVoice, NoteEvent};
pub use dto::job::{JobSnapshot, SubmitRequest};
