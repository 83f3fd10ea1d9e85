use std::path::PathBuf;

/// Stream properties read when a clip is opened.
#[derive(Clone, Debug, PartialEq)]
pub struct VideoMetadata {
    pub width: u32,
    pub height: u32,
    /// Nominal frames per second; 0.0 when the container does not say.
    pub fps: f64,
    pub total_frames: usize,
    pub codec: String,
    pub source_path: Option<PathBuf>,
}

impl VideoMetadata {
    /// Playback length in seconds: `total_frames / fps`.
    ///
    /// A missing or non-positive frame rate yields 0.0 rather than an error.
    pub fn duration_secs(&self) -> f64 {
        if self.fps > 0.0 {
            self.total_frames as f64 / self.fps
        } else {
            0.0
        }
    }

    /// Copy of this metadata describing the same frames played at `fps`.
    pub fn with_fps(&self, fps: f64) -> Self {
        Self {
            fps,
            ..self.clone()
        }
    }
}
