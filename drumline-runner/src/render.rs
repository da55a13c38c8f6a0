//! External rendering
//!
//! Out-of-process transformation of a MIDI file into the score document
//! (notation tool) and the guide-audio rendering (synthesizer + sound
//! bank). Executable and sound-bank locations are resolved once at
//! construction; the render calls themselves only invoke and verify.

use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::PipelineError;

/// Strategy seam for score rendering
pub trait ScoreRenderer: Send + Sync {
    /// Renders `<stem>.pdf` next to the other artifacts and returns its path
    fn render_score(&self, midi: &Path, out_dir: &Path) -> Result<PathBuf, PipelineError>;
}

/// Strategy seam for guide-audio rendering
pub trait AudioRenderer: Send + Sync {
    /// Renders `<stem>(guide).<format>` and returns its path
    fn render_guide_audio(
        &self,
        midi: &Path,
        out_dir: &Path,
        format: &str,
    ) -> Result<PathBuf, PipelineError>;
}

/// Builds the platform-appropriate renderer pair from resolved configuration
pub fn platform_renderers(config: &Config) -> (MuseScoreRenderer, FluidSynthRenderer) {
    let score = MuseScoreRenderer::resolve(config.musescore_path.as_deref(), config.stage_timeout);
    let audio = FluidSynthRenderer::resolve(config.soundfont_path.as_deref(), config.stage_timeout);
    (score, audio)
}

// =============================================================================
// Notation tool
// =============================================================================

/// Known notation-tool binary names, newest first
const NOTATION_CANDIDATES: [&str; 4] = ["musescore4", "musescore3", "mscore", "mscore3"];

pub struct MuseScoreRenderer {
    exe: Option<PathBuf>,
    /// Headless virtual-display launcher; the notation tool wants a display
    /// even for batch export
    headless_wrapper: Option<PathBuf>,
    timeout: Duration,
}

impl MuseScoreRenderer {
    /// Resolves the notation executable: explicit override first, then the
    /// platform default location / PATH probe
    pub fn resolve(override_path: Option<&Path>, timeout: Duration) -> Self {
        let exe = match override_path {
            Some(path) => Some(path.to_path_buf()),
            None => default_notation_exe(),
        };

        let headless_wrapper = if cfg!(target_os = "linux") {
            find_in_path("xvfb-run")
        } else {
            None
        };

        match &exe {
            Some(path) => info!(exe = %path.display(), "notation renderer resolved"),
            None => warn!("no notation renderer executable found; score rendering will fail"),
        }

        Self {
            exe,
            headless_wrapper,
            timeout,
        }
    }
}

impl ScoreRenderer for MuseScoreRenderer {
    fn render_score(&self, midi: &Path, out_dir: &Path) -> Result<PathBuf, PipelineError> {
        let exe = self.exe.as_ref().ok_or_else(|| {
            PipelineError::ScoreRenderFailed(
                "notation renderer executable not found; install MuseScore or set MUSESCORE_PATH"
                    .to_string(),
            )
        })?;

        let score_path = out_dir.join(format!("{}.pdf", stem_of(midi)));

        let mut cmd = match &self.headless_wrapper {
            Some(wrapper) => {
                let mut c = Command::new(wrapper);
                c.arg("-a").arg(exe);
                c
            }
            None => Command::new(exe),
        };
        cmd.arg(midi).arg("-o").arg(&score_path);

        debug!(midi = %midi.display(), out = %score_path.display(), "rendering score");

        let output = run_command(cmd, self.timeout).map_err(|e| match e {
            CommandError::Io(e) => PipelineError::ScoreRenderFailed(format!(
                "failed to invoke {}: {e}",
                exe.display()
            )),
            CommandError::Timeout { secs } => PipelineError::Timeout {
                stage: "score render",
                secs,
            },
        })?;

        if !output.success {
            return Err(PipelineError::ScoreRenderFailed(format!(
                "{} exited with code {}: {}",
                exe.display(),
                output.code,
                output.stderr.trim()
            )));
        }

        if !score_path.is_file() {
            return Err(PipelineError::ScoreRenderFailed(format!(
                "notation tool succeeded but produced no file at {}",
                score_path.display()
            )));
        }

        info!(score = %score_path.display(), "score rendered");
        Ok(score_path)
    }
}

fn default_notation_exe() -> Option<PathBuf> {
    if cfg!(target_os = "windows") {
        Some(PathBuf::from("MuseScore4.exe"))
    } else if cfg!(target_os = "macos") {
        Some(PathBuf::from(
            "/Applications/MuseScore 4.app/Contents/MacOS/mscore",
        ))
    } else {
        NOTATION_CANDIDATES.iter().find_map(|name| find_in_path(name))
    }
}

// =============================================================================
// Synthesizer
// =============================================================================

/// Well-known GM sound-bank locations probed when no override is given
const SOUNDFONT_CANDIDATES: [&str; 2] = [
    "/usr/share/sounds/sf2/FluidR3_GM.sf2",
    "/usr/share/soundfonts/default.sf2",
];

pub struct FluidSynthRenderer {
    exe: Option<PathBuf>,
    soundfont: Option<PathBuf>,
    timeout: Duration,
}

impl FluidSynthRenderer {
    /// Resolves the synthesizer binary and a playable sound bank
    pub fn resolve(soundfont_override: Option<&Path>, timeout: Duration) -> Self {
        let exe = find_in_path("fluidsynth");

        let soundfont = match soundfont_override {
            Some(path) if path.is_file() => Some(path.to_path_buf()),
            Some(path) => {
                warn!(path = %path.display(), "configured sound bank does not exist");
                None
            }
            None => SOUNDFONT_CANDIDATES
                .iter()
                .map(PathBuf::from)
                .find(|p| p.is_file()),
        };

        match &soundfont {
            Some(path) => info!(soundfont = %path.display(), "sound bank resolved"),
            None => warn!("no GM sound bank found; guide audio rendering will fail"),
        }

        Self {
            exe,
            soundfont,
            timeout,
        }
    }
}

impl AudioRenderer for FluidSynthRenderer {
    fn render_guide_audio(
        &self,
        midi: &Path,
        out_dir: &Path,
        format: &str,
    ) -> Result<PathBuf, PipelineError> {
        let exe = self.exe.as_ref().ok_or_else(|| {
            PipelineError::AudioRenderFailed(
                "fluidsynth executable not found on PATH".to_string(),
            )
        })?;
        let soundfont = self.soundfont.as_ref().ok_or_else(|| {
            PipelineError::AudioRenderFailed(
                "no GM sound bank (.sf2) found; install fluid-soundfont-gm or set SOUNDFONT_PATH"
                    .to_string(),
            )
        })?;

        // The `(guide)` marker distinguishes the drum-only rendering from
        // the final mix for downstream consumers
        let audio_path = out_dir.join(format!("{}(guide).{format}", stem_of(midi)));

        let mut cmd = Command::new(exe);
        cmd.arg("-ni")
            .arg(soundfont)
            .arg(midi)
            .arg("-F")
            .arg(&audio_path)
            .arg("-r")
            .arg("44100");

        debug!(midi = %midi.display(), out = %audio_path.display(), "rendering guide audio");

        let output = run_command(cmd, self.timeout).map_err(|e| match e {
            CommandError::Io(e) => PipelineError::AudioRenderFailed(format!(
                "failed to invoke {}: {e}",
                exe.display()
            )),
            CommandError::Timeout { secs } => PipelineError::Timeout {
                stage: "guide audio render",
                secs,
            },
        })?;

        if !output.success {
            return Err(PipelineError::AudioRenderFailed(format!(
                "{} exited with code {}: {}",
                exe.display(),
                output.code,
                output.stderr.trim()
            )));
        }

        if !audio_path.is_file() {
            return Err(PipelineError::AudioRenderFailed(format!(
                "synthesizer succeeded but produced no file at {}",
                audio_path.display()
            )));
        }

        info!(audio = %audio_path.display(), "guide audio rendered");
        Ok(audio_path)
    }
}

// =============================================================================
// Subprocess plumbing
// =============================================================================

#[derive(Debug)]
enum CommandError {
    Io(std::io::Error),
    Timeout { secs: u64 },
}

#[derive(Debug)]
struct CommandOutput {
    #[allow(dead_code)]
    stdout: String,
    stderr: String,
    code: i32,
    success: bool,
}

/// Runs a command to completion, capturing output, killing the child if it
/// exceeds the wall-clock budget. Blocking; callers run on a blocking task.
fn run_command(mut cmd: Command, timeout: Duration) -> Result<CommandOutput, CommandError> {
    let mut child = cmd
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(CommandError::Io)?;

    // Drain pipes on side threads so a chatty child cannot block on a full
    // pipe buffer while we poll for exit
    let stdout_handle = child.stdout.take().map(spawn_pipe_reader);
    let stderr_handle = child.stderr.take().map(spawn_pipe_reader);

    let deadline = Instant::now() + timeout;
    let status = loop {
        match child.try_wait().map_err(CommandError::Io)? {
            Some(status) => break status,
            None if Instant::now() >= deadline => {
                warn!("child exceeded {}s budget, killing", timeout.as_secs());
                let _ = child.kill();
                let _ = child.wait();
                return Err(CommandError::Timeout {
                    secs: timeout.as_secs(),
                });
            }
            None => std::thread::sleep(Duration::from_millis(50)),
        }
    };

    let stdout = stdout_handle
        .and_then(|h| h.join().ok())
        .unwrap_or_default();
    let stderr = stderr_handle
        .and_then(|h| h.join().ok())
        .unwrap_or_default();
    let code = status.code().unwrap_or(-1);

    if !stdout.trim().is_empty() {
        debug!("child stdout: {}", stdout.trim());
    }
    if !stderr.trim().is_empty() {
        debug!("child stderr: {}", stderr.trim());
    }

    Ok(CommandOutput {
        stdout,
        stderr,
        code,
        success: status.success(),
    })
}

fn spawn_pipe_reader<R: Read + Send + 'static>(mut pipe: R) -> std::thread::JoinHandle<String> {
    std::thread::spawn(move || {
        let mut buf = String::new();
        let _ = pipe.read_to_string(&mut buf);
        buf
    })
}

fn find_in_path(name: &str) -> Option<PathBuf> {
    let path_var = std::env::var_os("PATH")?;
    std::env::split_paths(&path_var)
        .map(|dir| dir.join(name))
        .find(|candidate| candidate.is_file())
}

fn stem_of(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output".to_string())
}
