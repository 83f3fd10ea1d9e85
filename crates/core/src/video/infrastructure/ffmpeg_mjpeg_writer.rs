use std::path::Path;

use crate::shared::constants::INTERMEDIATE_GLOBAL_QUALITY;
use crate::shared::frame::Frame;
use crate::shared::frame_rate::FrameRate;
use crate::shared::video_metadata::VideoMetadata;
use crate::video::domain::video_writer::VideoWriter;

const STREAM_INDEX: usize = 0;

/// Writes the scratch clip between the frame pass and the final encode.
///
/// MJPEG is intra-only and decodable by any ffmpeg build, so the frames
/// survive at high quality until the delivery transcode. The container is
/// chosen from the output path's extension (`.avi` by default).
pub struct FfmpegMjpegWriter {
    octx: Option<ffmpeg_next::format::context::Output>,
    encoder: Option<ffmpeg_next::codec::encoder::video::Encoder>,
    scaler: Option<ffmpeg_next::software::scaling::Context>,
    time_base: ffmpeg_next::Rational,
    width: u32,
    height: u32,
    frame_count: usize,
}

impl FfmpegMjpegWriter {
    pub fn new() -> Self {
        Self {
            octx: None,
            encoder: None,
            scaler: None,
            time_base: ffmpeg_next::Rational(1, 1),
            width: 0,
            height: 0,
            frame_count: 0,
        }
    }

    /// Frames accepted since the last `open`.
    pub fn frame_count(&self) -> usize {
        self.frame_count
    }
}

impl Default for FfmpegMjpegWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl VideoWriter for FfmpegMjpegWriter {
    fn open(
        &mut self,
        path: &Path,
        metadata: &VideoMetadata,
    ) -> Result<(), Box<dyn std::error::Error>> {
        ffmpeg_next::init()?;

        if metadata.width == 0 || metadata.height == 0 {
            return Err(format!(
                "invalid frame size {}x{}",
                metadata.width, metadata.height
            )
            .into());
        }
        let rate = FrameRate::from_fps(metadata.fps)
            .ok_or_else(|| format!("invalid frame rate {}", metadata.fps))?;
        let frame_rate = ffmpeg_next::Rational(rate.numerator(), rate.denominator());
        let time_base = frame_rate.invert();

        let mut octx = ffmpeg_next::format::output(path)?;

        let global_header = octx
            .format()
            .flags()
            .contains(ffmpeg_next::format::Flags::GLOBAL_HEADER);

        let codec = ffmpeg_next::encoder::find(ffmpeg_next::codec::Id::MJPEG)
            .ok_or("MJPEG encoder not found")?;

        let mut ost = octx.add_stream(Some(codec))?;

        let mut encoder_ctx = ffmpeg_next::codec::context::Context::new_with_codec(codec)
            .encoder()
            .video()?;

        encoder_ctx.set_width(metadata.width);
        encoder_ctx.set_height(metadata.height);
        encoder_ctx.set_format(ffmpeg_next::format::Pixel::YUVJ420P);
        encoder_ctx.set_time_base(time_base);
        encoder_ctx.set_frame_rate(Some(frame_rate));

        if global_header {
            encoder_ctx.set_flags(ffmpeg_next::codec::Flags::GLOBAL_HEADER);
        }

        // Fixed quantiser instead of the default bitrate target.
        let mut options = ffmpeg_next::Dictionary::new();
        options.set("flags", "+qscale");
        options.set("global_quality", &INTERMEDIATE_GLOBAL_QUALITY.to_string());

        let encoder = encoder_ctx.open_with(options)?;
        ost.set_parameters(&encoder);
        ost.set_time_base(time_base);
        ost.set_avg_frame_rate(frame_rate);

        octx.write_header()?;

        let scaler = ffmpeg_next::software::scaling::Context::get(
            ffmpeg_next::format::Pixel::RGB24,
            metadata.width,
            metadata.height,
            ffmpeg_next::format::Pixel::YUVJ420P,
            metadata.width,
            metadata.height,
            ffmpeg_next::software::scaling::Flags::BILINEAR,
        )?;

        log::debug!(
            "Intermediate {} opened at {}/{} fps ({}x{})",
            path.display(),
            rate.numerator(),
            rate.denominator(),
            metadata.width,
            metadata.height
        );

        self.octx = Some(octx);
        self.encoder = Some(encoder);
        self.scaler = Some(scaler);
        self.time_base = time_base;
        self.width = metadata.width;
        self.height = metadata.height;
        self.frame_count = 0;

        Ok(())
    }

    fn write(&mut self, frame: &Frame) -> Result<(), Box<dyn std::error::Error>> {
        let (Some(encoder), Some(scaler), Some(octx)) = (
            self.encoder.as_mut(),
            self.scaler.as_mut(),
            self.octx.as_mut(),
        ) else {
            return Err("FfmpegMjpegWriter: not opened".into());
        };

        if frame.width() != self.width || frame.height() != self.height || frame.channels() != 3 {
            return Err(format!(
                "frame {} is {}x{}x{}, stream expects {}x{}x3",
                frame.index(),
                frame.width(),
                frame.height(),
                frame.channels(),
                self.width,
                self.height
            )
            .into());
        }

        let mut rgb_frame = ffmpeg_next::util::frame::video::Video::new(
            ffmpeg_next::format::Pixel::RGB24,
            self.width,
            self.height,
        );

        let stride = rgb_frame.stride(0);
        let row_bytes = frame.row_len();
        let dst = rgb_frame.data_mut(0);
        for (row, src_row) in frame.data().chunks_exact(row_bytes).enumerate() {
            let dst_start = row * stride;
            dst[dst_start..dst_start + row_bytes].copy_from_slice(src_row);
        }

        let mut yuv_frame = ffmpeg_next::util::frame::video::Video::empty();
        scaler.run(&rgb_frame, &mut yuv_frame)?;
        yuv_frame.set_pts(Some(self.frame_count as i64));

        encoder.send_frame(&yuv_frame)?;
        drain_packets(encoder, octx, self.time_base)?;

        self.frame_count += 1;
        Ok(())
    }

    fn close(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        let encoder = self.encoder.take();
        let octx = self.octx.take();
        self.scaler = None;

        if let (Some(mut encoder), Some(mut octx)) = (encoder, octx) {
            encoder.send_eof()?;
            drain_packets(&mut encoder, &mut octx, self.time_base)?;
            octx.write_trailer()?;
        }

        Ok(())
    }
}

fn drain_packets(
    encoder: &mut ffmpeg_next::codec::encoder::video::Encoder,
    octx: &mut ffmpeg_next::format::context::Output,
    encoder_time_base: ffmpeg_next::Rational,
) -> Result<(), ffmpeg_next::Error> {
    let ost_time_base = octx
        .stream(STREAM_INDEX)
        .map(|s| s.time_base())
        .ok_or(ffmpeg_next::Error::StreamNotFound)?;

    let mut encoded = ffmpeg_next::Packet::empty();
    while encoder.receive_packet(&mut encoded).is_ok() {
        encoded.set_stream(STREAM_INDEX);
        encoded.rescale_ts(encoder_time_base, ost_time_base);
        encoded.write_interleaved(octx)?;
    }
    Ok(())
}
