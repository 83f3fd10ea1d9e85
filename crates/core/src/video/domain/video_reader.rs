use std::path::Path;

use crate::shared::frame::Frame;
use crate::shared::video_metadata::VideoMetadata;

/// Decode stream over a clip.
///
/// A reader is reusable: `open` replaces any previously opened clip and
/// `close` releases it. Callers close on every exit path, including after
/// a failed `open`.
pub trait VideoReader {
    /// Opens a clip and returns its stream properties.
    fn open(&mut self, path: &Path) -> Result<VideoMetadata, Box<dyn std::error::Error>>;

    /// Yields RGB frames in source order until end of stream.
    fn frames(
        &mut self,
    ) -> Box<dyn Iterator<Item = Result<Frame, Box<dyn std::error::Error>>> + '_>;

    fn close(&mut self);
}
