//! Per-job working directory
//!
//! An exclusively-owned scratch area holding the staged input and all
//! intermediate/output files for one run. Acquired at run start and removed
//! on drop, so cleanup happens on every exit path, including faults while
//! already handling an earlier error.

use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use uuid::Uuid;

pub struct Workdir {
    path: PathBuf,
}

impl Workdir {
    /// Creates a fresh directory at `<base>/<job_id>`
    ///
    /// A leftover directory from a crashed prior run is removed first; the
    /// at-most-one-execution guard in the job store ensures no live run can
    /// still own it.
    pub fn create(base: &Path, job_id: Uuid) -> std::io::Result<Self> {
        let path = base.join(job_id.to_string());
        if path.exists() {
            warn!(path = %path.display(), "removing stale working directory");
            std::fs::remove_dir_all(&path)?;
        }
        std::fs::create_dir_all(&path)?;
        debug!(path = %path.display(), "created working directory");
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for Workdir {
    fn drop(&mut self) {
        match std::fs::remove_dir_all(&self.path) {
            Ok(()) => debug!(path = %self.path.display(), "removed working directory"),
            Err(e) => warn!(
                path = %self.path.display(),
                "failed to remove working directory: {}", e
            ),
        }
    }
}
