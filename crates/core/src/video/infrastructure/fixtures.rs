//! Synthetic clips for tests that need real ffmpeg I/O.

use std::path::Path;

use crate::shared::frame::Frame;
use crate::shared::video_metadata::VideoMetadata;
use crate::video::domain::video_writer::VideoWriter;
use crate::video::infrastructure::ffmpeg_mjpeg_writer::FfmpegMjpegWriter;

/// Left-half gray level of fixture frame `index`; the right half is the
/// complement. Consecutive frames differ by 37 levels.
pub(crate) fn fixture_level(index: usize) -> u8 {
    16 + ((index * 37) % 224) as u8
}

/// Two flat vertical bands so mirroring swaps them.
pub(crate) fn fixture_frame(index: usize, width: u32, height: u32) -> Frame {
    let left = fixture_level(index);
    let right = 255 - left;
    let half = width as usize / 2;
    let mut data = Vec::with_capacity(width as usize * height as usize * 3);
    for _ in 0..height {
        for col in 0..width as usize {
            let value = if col < half { left } else { right };
            data.extend_from_slice(&[value; 3]);
        }
    }
    Frame::rgb(data, width, height, index)
}

pub(crate) fn fixture_metadata(width: u32, height: u32, fps: f64) -> VideoMetadata {
    VideoMetadata {
        width,
        height,
        fps,
        total_frames: 0,
        codec: String::new(),
        source_path: None,
    }
}

pub(crate) fn write_fixture_clip(path: &Path, frames: usize, width: u32, height: u32, fps: f64) {
    let mut writer = FfmpegMjpegWriter::new();
    writer
        .open(path, &fixture_metadata(width, height, fps))
        .unwrap();
    for i in 0..frames {
        writer.write(&fixture_frame(i, width, height)).unwrap();
    }
    writer.close().unwrap();
}

/// Mean channel value of the left and right halves, ignoring a 2px seam.
pub(crate) fn half_means(frame: &Frame) -> (f64, f64) {
    let width = frame.width() as usize;
    let half = width / 2;
    let (mut left, mut right) = ((0u64, 0u64), (0u64, 0u64));
    for row in frame.data().chunks_exact(frame.row_len()) {
        for (col, px) in row.chunks_exact(frame.channels() as usize).enumerate() {
            let sum: u64 = px.iter().map(|&v| v as u64).sum();
            let n = px.len() as u64;
            if col + 2 < half {
                left = (left.0 + sum, left.1 + n);
            } else if col >= half + 2 {
                right = (right.0 + sum, right.1 + n);
            }
        }
    }
    (
        left.0 as f64 / left.1.max(1) as f64,
        right.0 as f64 / right.1.max(1) as f64,
    )
}
