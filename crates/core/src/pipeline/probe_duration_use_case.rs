use std::path::Path;

use crate::shared::clip_error::ClipError;
use crate::video::domain::video_reader::VideoReader;

/// Reads a clip's duration as `frame_count / fps`.
///
/// A clip with no usable frame rate has duration 0.0; callers pass that on
/// and let the retimer fall back to its default rate.
pub struct ProbeDurationUseCase {
    reader: Box<dyn VideoReader>,
}

impl ProbeDurationUseCase {
    pub fn new(reader: Box<dyn VideoReader>) -> Self {
        Self { reader }
    }

    pub fn execute(&mut self, path: &Path) -> Result<f64, ClipError> {
        let opened = self.reader.open(path);
        self.reader.close();
        let metadata = opened.map_err(|e| ClipError::unreadable(path, e))?;
        Ok(metadata.duration_secs())
    }
}
