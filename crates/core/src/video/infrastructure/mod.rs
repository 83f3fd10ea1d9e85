pub mod ffmpeg_mjpeg_writer;
pub mod ffmpeg_reader;

#[cfg(test)]
pub(crate) mod fixtures;
