use std::path::Path;

use thiserror::Error;

/// What an encoder run left behind: its exit code and whatever it printed
/// to stderr.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TranscodeOutcome {
    /// `None` when the process was killed by a signal.
    pub exit_code: Option<i32>,
    pub diagnostics: String,
}

impl TranscodeOutcome {
    pub fn succeeded(&self) -> bool {
        self.exit_code == Some(0)
    }

    /// Human-readable exit status for error messages.
    pub fn status_text(&self) -> String {
        match self.exit_code {
            Some(code) => format!("exit code {code}"),
            None => "termination by signal".to_string(),
        }
    }
}

/// The encoder could not be started at all.
#[derive(Error, Debug)]
pub enum TranscoderLaunchError {
    #[error("{program} not found")]
    NotFound { program: String },
    #[error("failed to spawn {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
}

/// Converts the intermediate clip into the delivery format.
///
/// One blocking call per clip. A non-zero exit is reported through the
/// returned outcome, not as an `Err`.
pub trait Transcoder {
    fn transcode(
        &self,
        input: &Path,
        output: &Path,
    ) -> Result<TranscodeOutcome, TranscoderLaunchError>;
}
