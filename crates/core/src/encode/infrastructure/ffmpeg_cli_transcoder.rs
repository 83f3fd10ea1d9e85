use std::ffi::OsString;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use crate::encode::domain::transcoder::{TranscodeOutcome, Transcoder, TranscoderLaunchError};
use crate::shared::constants::{
    DEFAULT_CRF, DEFAULT_ENCODER_PROGRAM, DEFAULT_MOVFLAGS, DEFAULT_PIXEL_FORMAT, DEFAULT_PRESET,
    DEFAULT_VIDEO_CODEC,
};

/// Encoder arguments for the delivery file.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DeliverySettings {
    pub video_codec: String,
    pub preset: String,
    /// Constant rate factor (0 = lossless, 51 = worst).
    pub crf: u32,
    pub pixel_format: String,
    pub movflags: String,
}

impl Default for DeliverySettings {
    fn default() -> Self {
        Self {
            video_codec: DEFAULT_VIDEO_CODEC.to_string(),
            preset: DEFAULT_PRESET.to_string(),
            crf: DEFAULT_CRF,
            pixel_format: DEFAULT_PIXEL_FORMAT.to_string(),
            movflags: DEFAULT_MOVFLAGS.to_string(),
        }
    }
}

/// Runs the system `ffmpeg` binary to produce H.264 / yuv420p / fast-start
/// MP4 from the intermediate clip.
pub struct FfmpegCliTranscoder {
    program: PathBuf,
    settings: DeliverySettings,
}

impl FfmpegCliTranscoder {
    pub fn new(settings: DeliverySettings) -> Self {
        Self {
            program: PathBuf::from(DEFAULT_ENCODER_PROGRAM),
            settings,
        }
    }

    /// Use a specific ffmpeg binary instead of the one on `PATH`.
    pub fn with_program(mut self, program: impl Into<PathBuf>) -> Self {
        self.program = program.into();
        self
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    /// Returns `true` when the configured binary answers `-version`.
    pub fn is_available(&self) -> bool {
        Command::new(&self.program)
            .arg("-version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map(|s| s.success())
            .unwrap_or(false)
    }

    pub fn args(&self, input: &Path, output: &Path) -> Vec<OsString> {
        let s = &self.settings;
        let mut args: Vec<OsString> = vec!["-y".into(), "-i".into()];
        args.push(input.as_os_str().to_owned());
        args.extend(
            [
                "-an".to_string(),
                "-c:v".to_string(),
                s.video_codec.clone(),
                "-preset".to_string(),
                s.preset.clone(),
                "-crf".to_string(),
                s.crf.to_string(),
                "-pix_fmt".to_string(),
                s.pixel_format.clone(),
                "-movflags".to_string(),
                s.movflags.clone(),
            ]
            .into_iter()
            .map(OsString::from),
        );
        args.push(output.as_os_str().to_owned());
        args
    }
}

impl Default for FfmpegCliTranscoder {
    fn default() -> Self {
        Self::new(DeliverySettings::default())
    }
}

impl Transcoder for FfmpegCliTranscoder {
    fn transcode(
        &self,
        input: &Path,
        output: &Path,
    ) -> Result<TranscodeOutcome, TranscoderLaunchError> {
        let args = self.args(input, output);
        log::debug!(
            "Running {} {}",
            self.program.display(),
            args.iter()
                .map(|a| a.to_string_lossy())
                .collect::<Vec<_>>()
                .join(" ")
        );

        let result = Command::new(&self.program)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .output();

        let output = match result {
            Ok(output) => output,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(TranscoderLaunchError::NotFound {
                    program: self.program.display().to_string(),
                })
            }
            Err(e) => {
                return Err(TranscoderLaunchError::Spawn {
                    program: self.program.display().to_string(),
                    source: e,
                })
            }
        };

        Ok(outcome_from(output))
    }
}

/// Keeps stderr exactly as ffmpeg printed it.
fn outcome_from(output: std::process::Output) -> TranscodeOutcome {
    TranscodeOutcome {
        exit_code: output.status.code(),
        diagnostics: String::from_utf8_lossy(&output.stderr).into_owned(),
    }
}
