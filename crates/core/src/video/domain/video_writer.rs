use std::path::Path;

use crate::shared::frame::Frame;
use crate::shared::video_metadata::VideoMetadata;

/// Encode stream for the intermediate file.
///
/// `metadata.fps` is the playback rate the written frames are stamped
/// with; width and height fix the frame size for the whole stream.
pub trait VideoWriter {
    fn open(
        &mut self,
        path: &Path,
        metadata: &VideoMetadata,
    ) -> Result<(), Box<dyn std::error::Error>>;

    fn write(&mut self, frame: &Frame) -> Result<(), Box<dyn std::error::Error>>;

    /// Flushes pending packets and finalizes the container. Safe to call
    /// on a writer that was never opened.
    fn close(&mut self) -> Result<(), Box<dyn std::error::Error>>;
}
