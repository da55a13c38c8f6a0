//! Job runner
//!
//! Drives a single claimed job end to end: stage the input into a working
//! directory, run the conversion pipeline, publish the artifacts and record
//! the terminal status. The working directory is removed on every exit path
//! by the `Workdir` drop guard, so no run leaves scratch files behind.

use std::path::Path;
use std::sync::Arc;
use tracing::{error, info, warn};

use drumline_core::{ArtifactKind, ConversionJob, OutputRefs};
use uuid::Uuid;

use crate::config::Config;
use crate::error::PipelineError;
use crate::pipeline::{Adapters, PipelineOutput, PipelineParams, run_pipeline};
use crate::storage::{ObjectStore, content_type_for};
use crate::store::{JobStore, StoreError};
use crate::workdir::Workdir;

/// Published object names, one per artifact, under `<result_prefix>/<job_id>/`
fn object_name(kind: ArtifactKind, guide_format: &str) -> String {
    match kind {
        ArtifactKind::Midi => "drums.mid".to_string(),
        ArtifactKind::Score => "score.pdf".to_string(),
        ArtifactKind::GuideAudio => format!("guide.{guide_format}"),
        ArtifactKind::MixAudio => "mix.wav".to_string(),
    }
}

pub struct JobRunner {
    store: Arc<dyn JobStore>,
    storage: Arc<dyn ObjectStore>,
    adapters: Arc<Adapters>,
    config: Config,
}

impl JobRunner {
    pub fn new(
        store: Arc<dyn JobStore>,
        storage: Arc<dyn ObjectStore>,
        adapters: Arc<Adapters>,
        config: Config,
    ) -> Self {
        Self {
            store,
            storage,
            adapters,
            config,
        }
    }

    /// Runs one job to a terminal state
    ///
    /// Claiming is atomic: if the job is not Pending any more this is a
    /// logged no-op, which makes duplicate queue deliveries harmless. Store
    /// failures propagate; everything that goes wrong inside the run itself
    /// is recorded on the job instead.
    pub async fn execute(&self, job_id: Uuid) -> Result<(), StoreError> {
        let job = match self.store.try_start(job_id).await {
            Ok(job) => job,
            Err(StoreError::Conflict { id, status }) => {
                info!(%id, ?status, "job already claimed or terminal, skipping");
                return Ok(());
            }
            Err(e) => return Err(e),
        };
        info!(id = %job.id, genre = %job.genre, tempo = job.tempo, "job claimed");

        let workdir = match Workdir::create(&self.config.workspace_base, job.id) {
            Ok(dir) => dir,
            Err(e) => {
                let detail = format!("could not create working directory: {e}");
                error!(id = %job.id, "{detail}");
                return self.store.fail(job.id, detail).await;
            }
        };

        // The guard stays live across staging, pipeline and publication, so
        // the directory is removed no matter where the run stops.
        match self.run_staged(&job, workdir.path()).await {
            Ok(refs) => {
                info!(id = %job.id, "job complete");
                self.store.complete(job.id, refs).await
            }
            Err(e) => {
                warn!(id = %job.id, "job failed: {e}");
                self.store.fail(job.id, e.to_string()).await
            }
        }
    }

    /// Staging, pipeline and publication against an already-created workdir
    async fn run_staged(
        &self,
        job: &ConversionJob,
        workdir: &Path,
    ) -> Result<OutputRefs, PipelineError> {
        let input_ext = Path::new(&job.input_ref)
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("wav")
            .to_string();
        let input = workdir.join(format!("input.{input_ext}"));

        self.storage
            .fetch(&job.input_ref, &input)
            .await
            .map_err(|e| {
                PipelineError::StagingFailed(format!("could not stage '{}': {e}", job.input_ref))
            })?;

        let adapters = Arc::clone(&self.adapters);
        let genre = job.genre.clone();
        let tempo = job.tempo;
        let level = job.level.clone();
        let guide_format = self.config.guide_audio_format.clone();
        let out_dir = workdir.to_path_buf();

        // The pipeline is blocking work: decoding, file writes and external
        // process waits all happen on a blocking thread.
        let output = tokio::task::spawn_blocking(move || {
            let params = PipelineParams {
                genre: &genre,
                tempo,
                level: &level,
                guide_format: &guide_format,
            };
            run_pipeline(&adapters, &input, &params, &out_dir)
        })
        .await
        .map_err(|e| PipelineError::Internal(format!("pipeline task panicked: {e}")))??;

        self.publish_all(job.id, &output).await
    }

    /// Uploads the four artifacts; all must succeed before any reference is
    /// linked to the job
    async fn publish_all(
        &self,
        job_id: Uuid,
        output: &PipelineOutput,
    ) -> Result<OutputRefs, PipelineError> {
        let midi = self
            .publish(job_id, ArtifactKind::Midi, &output.midi)
            .await?;
        let score = self
            .publish(job_id, ArtifactKind::Score, &output.score)
            .await?;
        let guide_audio = self
            .publish(job_id, ArtifactKind::GuideAudio, &output.guide_audio)
            .await?;
        let mix_audio = self
            .publish(job_id, ArtifactKind::MixAudio, &output.mix_audio)
            .await?;

        Ok(OutputRefs {
            midi,
            score,
            guide_audio,
            mix_audio,
        })
    }

    async fn publish(
        &self,
        job_id: Uuid,
        kind: ArtifactKind,
        local: &Path,
    ) -> Result<String, PipelineError> {
        let key = format!(
            "{}/{}/{}",
            self.config.result_prefix,
            job_id,
            object_name(kind, &self.config.guide_audio_format)
        );
        let content_type = content_type_for(local);

        self.storage
            .store(local, &key, content_type)
            .await
            .map_err(|e| PipelineError::PublishFailed {
                artifact: kind,
                detail: e.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_object_names() {
        assert_eq!(object_name(ArtifactKind::Midi, "wav"), "drums.mid");
        assert_eq!(object_name(ArtifactKind::Score, "wav"), "score.pdf");
        assert_eq!(object_name(ArtifactKind::GuideAudio, "wav"), "guide.wav");
        assert_eq!(object_name(ArtifactKind::MixAudio, "wav"), "mix.wav");
    }
}
