//! Pipeline orchestrator
//!
//! Runs the four conversion stages in strict order against one working
//! directory and fails fast on the first fault. Pure coordination: all I/O
//! happens inside the adapters. The two renders are logically independent
//! but are sequenced anyway, which keeps failure attribution unambiguous.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

use crate::error::PipelineError;
use crate::generate::DrumGenerator;
use crate::midi::{midi_path_for, write_midi};
use crate::mix::AudioMixer;
use crate::render::{AudioRenderer, ScoreRenderer};

/// The pipeline's external collaborators
pub struct Adapters {
    pub generator: Arc<dyn DrumGenerator>,
    pub score: Arc<dyn ScoreRenderer>,
    pub audio: Arc<dyn AudioRenderer>,
    pub mixer: Arc<dyn AudioMixer>,
}

/// Generation parameters for one run
pub struct PipelineParams<'a> {
    pub genre: &'a str,
    pub tempo: u32,
    pub level: &'a str,
    pub guide_format: &'a str,
}

/// Local paths of the four artifacts of a completed run
#[derive(Debug, Clone)]
pub struct PipelineOutput {
    pub midi: PathBuf,
    pub score: PathBuf,
    pub guide_audio: PathBuf,
    pub mix_audio: PathBuf,
}

/// Runs generate -> write MIDI -> render score -> render guide -> mix,
/// producing all artifacts inside `out_dir`
pub fn run_pipeline(
    adapters: &Adapters,
    input: &Path,
    params: &PipelineParams<'_>,
    out_dir: &Path,
) -> Result<PipelineOutput, PipelineError> {
    info!(
        input = %input.display(),
        genre = params.genre,
        tempo = params.tempo,
        level = params.level,
        "pipeline started"
    );

    let track = adapters
        .generator
        .generate(input, params.genre, params.tempo, params.level)?;
    info!(events = track.len(), "drum track generated");

    let midi_path = midi_path_for(input, out_dir);
    write_midi(&track, &midi_path)?;
    info!(midi = %midi_path.display(), "MIDI written");

    let score_path = adapters.score.render_score(&midi_path, out_dir)?;
    let guide_path = adapters
        .audio
        .render_guide_audio(&midi_path, out_dir, params.guide_format)?;

    let mix_path = adapters.mixer.mix(input, &guide_path, out_dir)?;

    info!("pipeline complete");
    Ok(PipelineOutput {
        midi: midi_path,
        score: score_path,
        guide_audio: guide_path,
        mix_audio: mix_path,
    })
}
