use std::path::{Path, PathBuf};

use thiserror::Error;

/// Failures of a single probe or retime call.
///
/// The batch driver records these per slot and moves on; none of them
/// abort a run.
#[derive(Error, Debug)]
pub enum ClipError {
    #[error("cannot read video {path}: {reason}")]
    UnreadableInput { path: PathBuf, reason: String },
    #[error("cannot create intermediate writer at {path}: {reason}")]
    WriterInit { path: PathBuf, reason: String },
    #[error("failed writing intermediate {path}: {reason}")]
    FrameWrite { path: PathBuf, reason: String },
    #[error(transparent)]
    Encode(#[from] EncodeFailure),
}

impl ClipError {
    pub fn unreadable(path: &Path, reason: impl ToString) -> Self {
        Self::UnreadableInput {
            path: path.to_path_buf(),
            reason: reason.to_string(),
        }
    }

    pub fn writer_init(path: &Path, reason: impl ToString) -> Self {
        Self::WriterInit {
            path: path.to_path_buf(),
            reason: reason.to_string(),
        }
    }

    pub fn frame_write(path: &Path, reason: impl ToString) -> Self {
        Self::FrameWrite {
            path: path.to_path_buf(),
            reason: reason.to_string(),
        }
    }
}

/// Ways the final transcode step can fail.
#[derive(Error, Debug)]
pub enum EncodeFailure {
    #[error("{program} not found on PATH; install ffmpeg (e.g. `apt install ffmpeg` or `brew install ffmpeg`) or pass --ffmpeg <path>")]
    NotInstalled { program: String },
    #[error("failed to launch {program}: {source}")]
    Launch {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("encoder exited with {status}: {stderr}")]
    Exited { status: String, stderr: String },
    #[error("failed to publish encoded output to {path}: {source}")]
    Publish {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
