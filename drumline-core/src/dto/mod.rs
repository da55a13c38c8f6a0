//! DTOs for the job submission and status-polling boundary

pub mod job;
