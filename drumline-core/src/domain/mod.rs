//! Domain types shared between the job store and the runner

pub mod job;
pub mod track;
