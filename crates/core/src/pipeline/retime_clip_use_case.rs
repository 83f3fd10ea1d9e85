use std::path::{Path, PathBuf};
use std::time::Instant;

use tempfile::TempPath;

use crate::encode::domain::transcoder::{Transcoder, TranscoderLaunchError};
use crate::pipeline::pipeline_logger::PipelineLogger;
use crate::shared::clip_error::{ClipError, EncodeFailure};
use crate::shared::constants::{FALLBACK_FRAME_RATE, INTERMEDIATE_EXTENSION};
use crate::shared::video_metadata::VideoMetadata;
use crate::transform::domain::horizontal_flip::flip_horizontal;
use crate::transform::domain::retiming::retimed_frame_rate;
use crate::video::domain::video_reader::VideoReader;
use crate::video::domain::video_writer::VideoWriter;

/// Knobs that stay fixed across a batch.
#[derive(Clone, Debug, PartialEq)]
pub struct RetimeSettings {
    /// Rate used when the target duration is not positive.
    pub fallback_fps: f64,
    /// Directory for intermediate files; the system temp dir when `None`.
    pub scratch_dir: Option<PathBuf>,
}

impl Default for RetimeSettings {
    fn default() -> Self {
        Self {
            fallback_fps: FALLBACK_FRAME_RATE,
            scratch_dir: None,
        }
    }
}

/// One clip to retime.
#[derive(Clone, Debug)]
pub struct RetimeRequest<'a> {
    pub source: &'a Path,
    pub output: &'a Path,
    pub target_duration: f64,
    pub flip: bool,
}

/// What a successful retime did.
#[derive(Clone, Debug, PartialEq)]
pub struct RetimeReport {
    /// Frame count the source container reported.
    pub reported_frames: usize,
    pub frames_written: usize,
    /// Playback rate the frames were stamped with.
    pub frame_rate: f64,
}

/// Flips and retimes a clip, then transcodes it to the delivery format.
///
/// Frames are written at the new rate to an MJPEG scratch file, which the
/// external encoder turns into the final output. The scratch file is gone
/// when `execute` returns, whatever the outcome, and the output path is only
/// replaced once the encoder has succeeded.
pub struct RetimeClipUseCase {
    reader: Box<dyn VideoReader>,
    writer: Box<dyn VideoWriter>,
    transcoder: Box<dyn Transcoder>,
    settings: RetimeSettings,
}

impl RetimeClipUseCase {
    pub fn new(
        reader: Box<dyn VideoReader>,
        writer: Box<dyn VideoWriter>,
        transcoder: Box<dyn Transcoder>,
        settings: RetimeSettings,
    ) -> Self {
        Self {
            reader,
            writer,
            transcoder,
            settings,
        }
    }

    pub fn execute(
        &mut self,
        request: &RetimeRequest<'_>,
        logger: &mut dyn PipelineLogger,
    ) -> Result<RetimeReport, ClipError> {
        let source = request.source;
        let metadata = match self.reader.open(source) {
            Ok(metadata) => metadata,
            Err(e) => {
                self.reader.close();
                return Err(ClipError::unreadable(source, e));
            }
        };

        let frame_rate = retimed_frame_rate(
            metadata.total_frames,
            request.target_duration,
            self.settings.fallback_fps,
        );
        logger.info(&format!("    Frame count: {}", metadata.total_frames));
        logger.info(&format!(
            "    Original dimensions: {}x{}",
            metadata.width, metadata.height
        ));
        logger.info(&format!(
            "    Calculated FPS: {frame_rate:.2} (to match duration {:.2}s)",
            request.target_duration
        ));

        let scratch = match self.create_scratch() {
            Ok(scratch) => scratch,
            Err(e) => {
                self.reader.close();
                return Err(e);
            }
        };

        let frames_start = Instant::now();
        let written = self.write_intermediate(&scratch, &metadata, frame_rate, request, logger);
        logger.timing("frames", frames_start.elapsed().as_secs_f64() * 1000.0);
        let frames_written = written?;

        if frames_written != metadata.total_frames {
            logger.warn(&format!(
                "    Decoded {frames_written} frames but container reported {}",
                metadata.total_frames
            ));
        }
        logger.info(&format!(
            "    Processed {frames_written}/{} frames - Complete!",
            metadata.total_frames
        ));

        logger.info("    Re-encoding to standard H.264 MP4 format...");
        let encode_start = Instant::now();
        let encoded = self.encode(&scratch, request.output);
        logger.timing("encode", encode_start.elapsed().as_secs_f64() * 1000.0);

        let scratch_path = scratch.to_path_buf();
        if let Err(e) = scratch.close() {
            logger.warn(&format!(
                "    Could not delete intermediate {}: {e}",
                scratch_path.display()
            ));
        }
        encoded?;

        Ok(RetimeReport {
            reported_frames: metadata.total_frames,
            frames_written,
            frame_rate,
        })
    }

    fn create_scratch(&self) -> Result<TempPath, ClipError> {
        let suffix = format!(".{INTERMEDIATE_EXTENSION}");
        let mut builder = tempfile::Builder::new();
        builder.prefix("clip-retime-").suffix(&suffix);
        let file = match &self.settings.scratch_dir {
            Some(dir) => builder.tempfile_in(dir),
            None => builder.tempfile(),
        };
        let scratch_dir = self
            .settings
            .scratch_dir
            .clone()
            .unwrap_or_else(std::env::temp_dir);
        file.map(|f| f.into_temp_path())
            .map_err(|e| ClipError::writer_init(&scratch_dir, e))
    }

    /// Copies every source frame into the scratch file at `frame_rate`.
    /// Both streams are released before this returns.
    fn write_intermediate(
        &mut self,
        scratch: &Path,
        metadata: &VideoMetadata,
        frame_rate: f64,
        request: &RetimeRequest<'_>,
        logger: &mut dyn PipelineLogger,
    ) -> Result<usize, ClipError> {
        if let Err(e) = self.writer.open(scratch, &metadata.with_fps(frame_rate)) {
            self.reader.close();
            let _ = self.writer.close();
            return Err(ClipError::writer_init(scratch, e));
        }

        let copied = copy_frames(
            self.reader.as_mut(),
            self.writer.as_mut(),
            request,
            scratch,
            metadata.total_frames,
            logger,
        );
        self.reader.close();
        let closed = self.writer.close();

        let frames_written = copied?;
        closed.map_err(|e| ClipError::frame_write(scratch, e))?;
        Ok(frames_written)
    }

    /// Transcodes into a staging file beside `output` and renames it into
    /// place on success.
    fn encode(&self, intermediate: &Path, output: &Path) -> Result<(), ClipError> {
        let staged = staging_path(output)?;

        let outcome = self
            .transcoder
            .transcode(intermediate, &staged)
            .map_err(|e| match e {
                TranscoderLaunchError::NotFound { program } => {
                    EncodeFailure::NotInstalled { program }
                }
                TranscoderLaunchError::Spawn { program, source } => {
                    EncodeFailure::Launch { program, source }
                }
            })?;

        if !outcome.succeeded() {
            return Err(EncodeFailure::Exited {
                status: outcome.status_text(),
                stderr: outcome.diagnostics,
            }
            .into());
        }

        let publish_error = |source| EncodeFailure::Publish {
            path: output.to_path_buf(),
            source,
        };
        // Replacing an existing output keeps its mode, as `ffmpeg -y` would.
        if let Ok(existing) = std::fs::metadata(output) {
            std::fs::set_permissions(&staged, existing.permissions()).map_err(publish_error)?;
        }
        staged
            .persist(output)
            .map_err(|e| publish_error(e.error))?;
        Ok(())
    }
}

fn copy_frames(
    reader: &mut dyn VideoReader,
    writer: &mut dyn VideoWriter,
    request: &RetimeRequest<'_>,
    scratch: &Path,
    reported_frames: usize,
    logger: &mut dyn PipelineLogger,
) -> Result<usize, ClipError> {
    let mut written = 0;
    for decoded in reader.frames() {
        let mut frame = decoded.map_err(|e| ClipError::unreadable(request.source, e))?;
        if request.flip {
            flip_horizontal(&mut frame);
        }
        writer
            .write(&frame)
            .map_err(|e| ClipError::frame_write(scratch, e))?;
        written += 1;
        logger.progress(written, reported_frames);
    }
    Ok(written)
}

/// Hidden temp file next to `output` with the same extension, so the
/// encoder picks the same container and the final rename stays on one
/// filesystem. On Unix it is created with mode 0666 less the umask, the
/// same mode a file created by ffmpeg itself would get.
fn staging_path(output: &Path) -> Result<TempPath, ClipError> {
    let dir = output
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let suffix = output
        .extension()
        .map(|ext| format!(".{}", ext.to_string_lossy()))
        .unwrap_or_default();

    let mut builder = tempfile::Builder::new();
    builder.prefix(".clip-retime-").suffix(&suffix);
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        builder.permissions(std::fs::Permissions::from_mode(0o666));
    }

    builder
        .tempfile_in(dir)
        .map(|f| f.into_temp_path())
        .map_err(|e| {
            EncodeFailure::Publish {
                path: output.to_path_buf(),
                source: e,
            }
            .into()
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encode::domain::transcoder::TranscodeOutcome;
    use crate::pipeline::pipeline_logger::NullPipelineLogger;
    use crate::shared::frame::Frame;
    use approx::assert_relative_eq;
    use rstest::rstest;
    use std::sync::{Arc, Mutex};

    // --- Stubs ---

    struct StubReader {
        frames: Vec<Frame>,
        fps: f64,
        fail_at: Option<usize>,
        closed: Arc<Mutex<bool>>,
    }

    impl StubReader {
        fn new(frames: Vec<Frame>) -> Self {
            Self {
                frames,
                fps: 30.0,
                fail_at: None,
                closed: Arc::new(Mutex::new(false)),
            }
        }
    }

    impl VideoReader for StubReader {
        fn open(&mut self, path: &Path) -> Result<VideoMetadata, Box<dyn std::error::Error>> {
            if path.to_string_lossy().contains("missing") {
                return Err("No such file or directory".into());
            }
            let first = self.frames.first();
            Ok(VideoMetadata {
                width: first.map_or(4, |f| f.width()),
                height: first.map_or(2, |f| f.height()),
                fps: self.fps,
                total_frames: self.frames.len(),
                codec: "h264".to_string(),
                source_path: Some(path.to_path_buf()),
            })
        }

        fn frames(
            &mut self,
        ) -> Box<dyn Iterator<Item = Result<Frame, Box<dyn std::error::Error>>> + '_> {
            let fail_at = self.fail_at;
            Box::new(self.frames.drain(..).enumerate().map(move |(i, f)| {
                if Some(i) == fail_at {
                    Err("corrupt packet".into())
                } else {
                    Ok(f)
                }
            }))
        }

        fn close(&mut self) {
            *self.closed.lock().unwrap() = true;
        }
    }

    #[derive(Default)]
    struct WriterLog {
        opened: Option<(PathBuf, VideoMetadata)>,
        written: Vec<Frame>,
        closed: bool,
    }

    struct StubWriter {
        log: Arc<Mutex<WriterLog>>,
        fail_open: bool,
        fail_write: bool,
    }

    impl StubWriter {
        fn new() -> Self {
            Self {
                log: Arc::new(Mutex::new(WriterLog::default())),
                fail_open: false,
                fail_write: false,
            }
        }
    }

    impl VideoWriter for StubWriter {
        fn open(
            &mut self,
            path: &Path,
            metadata: &VideoMetadata,
        ) -> Result<(), Box<dyn std::error::Error>> {
            self.log.lock().unwrap().opened = Some((path.to_path_buf(), metadata.clone()));
            if self.fail_open {
                return Err("Could not find tag for codec mjpeg".into());
            }
            Ok(())
        }

        fn write(&mut self, frame: &Frame) -> Result<(), Box<dyn std::error::Error>> {
            if self.fail_write {
                return Err("No space left on device".into());
            }
            self.log.lock().unwrap().written.push(frame.clone());
            Ok(())
        }

        fn close(&mut self) -> Result<(), Box<dyn std::error::Error>> {
            self.log.lock().unwrap().closed = true;
            Ok(())
        }
    }

    enum FakeBehaviour {
        Succeed,
        Exit(i32, &'static str),
        Missing,
    }

    /// Records its input and, on success, copies it to the output.
    struct FakeTranscoder {
        behaviour: FakeBehaviour,
        calls: Arc<Mutex<Vec<(PathBuf, PathBuf)>>>,
    }

    impl FakeTranscoder {
        fn new(behaviour: FakeBehaviour) -> Self {
            Self {
                behaviour,
                calls: Arc::new(Mutex::new(Vec::new())),
            }
        }
    }

    impl Transcoder for FakeTranscoder {
        fn transcode(
            &self,
            input: &Path,
            output: &Path,
        ) -> Result<TranscodeOutcome, TranscoderLaunchError> {
            self.calls
                .lock()
                .unwrap()
                .push((input.to_path_buf(), output.to_path_buf()));
            match self.behaviour {
                FakeBehaviour::Succeed => {
                    // Overwrite in place like `ffmpeg -y`, keeping the file's mode.
                    std::fs::write(output, std::fs::read(input).unwrap()).unwrap();
                    Ok(TranscodeOutcome {
                        exit_code: Some(0),
                        diagnostics: String::new(),
                    })
                }
                FakeBehaviour::Exit(code, stderr) => {
                    std::fs::write(output, b"partial").unwrap();
                    Ok(TranscodeOutcome {
                        exit_code: Some(code),
                        diagnostics: stderr.to_string(),
                    })
                }
                FakeBehaviour::Missing => Err(TranscoderLaunchError::NotFound {
                    program: "ffmpeg".to_string(),
                }),
            }
        }
    }

    // --- Helpers ---

    /// Each pixel encodes `(frame index, column, row)`.
    fn tagged_frame(index: usize, width: u32, height: u32) -> Frame {
        let mut data = Vec::new();
        for row in 0..height {
            for col in 0..width {
                data.extend_from_slice(&[index as u8, col as u8, row as u8]);
            }
        }
        Frame::rgb(data, width, height, index)
    }

    fn tagged_frames(count: usize) -> Vec<Frame> {
        (0..count).map(|i| tagged_frame(i, 4, 2)).collect()
    }

    struct Harness {
        use_case: RetimeClipUseCase,
        reader_closed: Arc<Mutex<bool>>,
        writer_log: Arc<Mutex<WriterLog>>,
        calls: Arc<Mutex<Vec<(PathBuf, PathBuf)>>>,
        dir: tempfile::TempDir,
    }

    fn harness(reader: StubReader, writer: StubWriter, behaviour: FakeBehaviour) -> Harness {
        let dir = tempfile::tempdir().unwrap();
        let reader_closed = reader.closed.clone();
        let writer_log = writer.log.clone();
        let transcoder = FakeTranscoder::new(behaviour);
        let calls = transcoder.calls.clone();
        let settings = RetimeSettings {
            scratch_dir: Some(dir.path().to_path_buf()),
            ..RetimeSettings::default()
        };
        Harness {
            use_case: RetimeClipUseCase::new(
                Box::new(reader),
                Box::new(writer),
                Box::new(transcoder),
                settings,
            ),
            reader_closed,
            writer_log,
            calls,
            dir,
        }
    }

    impl Harness {
        fn output(&self) -> PathBuf {
            self.dir.path().join("1-GT-p.mp4")
        }

        fn run(&mut self, target_duration: f64, flip: bool) -> Result<RetimeReport, ClipError> {
            let output = self.output();
            let request = RetimeRequest {
                source: Path::new("1-GT.mp4"),
                output: &output,
                target_duration,
                flip,
            };
            self.use_case.execute(&request, &mut NullPipelineLogger)
        }

        fn scratch_path(&self) -> PathBuf {
            self.writer_log.lock().unwrap().opened.clone().unwrap().0
        }

        fn configured_fps(&self) -> f64 {
            self.writer_log.lock().unwrap().opened.clone().unwrap().1.fps
        }

        /// Entries in the working dir other than the published output.
        fn leftovers(&self) -> Vec<PathBuf> {
            std::fs::read_dir(self.dir.path())
                .unwrap()
                .map(|e| e.unwrap().path())
                .filter(|p| *p != self.output())
                .collect()
        }
    }

    // --- Retiming ---

    #[rstest]
    #[case::same_length(60, 2.0, 30.0)]
    #[case::ninety_over_three(90, 3.0, 30.0)]
    #[case::stretch(30, 2.0, 15.0)]
    #[case::fractional(90, 3.2, 28.125)]
    fn test_intermediate_rate_is_frames_over_target(
        #[case] frames: usize,
        #[case] target: f64,
        #[case] expected: f64,
    ) {
        let mut h = harness(
            StubReader::new(tagged_frames(frames)),
            StubWriter::new(),
            FakeBehaviour::Succeed,
        );
        let report = h.run(target, false).unwrap();
        assert_relative_eq!(h.configured_fps(), expected, epsilon = 1e-9);
        assert_relative_eq!(report.frame_rate, expected, epsilon = 1e-9);
        assert_eq!(report.frames_written, frames);
    }

    #[rstest]
    #[case::zero(0.0)]
    #[case::negative(-3.0)]
    fn test_non_positive_target_uses_fallback_rate(#[case] target: f64) {
        let mut h = harness(
            StubReader::new(tagged_frames(12)),
            StubWriter::new(),
            FakeBehaviour::Succeed,
        );
        h.run(target, false).unwrap();
        assert_eq!(h.configured_fps(), 30.0);
    }

    #[test]
    fn test_intermediate_keeps_source_size() {
        let frames = (0..3).map(|i| tagged_frame(i, 6, 4)).collect();
        let mut h = harness(
            StubReader::new(frames),
            StubWriter::new(),
            FakeBehaviour::Succeed,
        );
        h.run(1.0, true).unwrap();
        let (_, meta) = h.writer_log.lock().unwrap().opened.clone().unwrap();
        assert_eq!((meta.width, meta.height), (6, 4));
    }

    // --- Frames ---

    #[test]
    fn test_frames_written_in_source_order_without_gaps() {
        let mut h = harness(
            StubReader::new(tagged_frames(25)),
            StubWriter::new(),
            FakeBehaviour::Succeed,
        );
        h.run(1.0, false).unwrap();

        let log = h.writer_log.lock().unwrap();
        assert_eq!(log.written.len(), 25);
        for (n, frame) in log.written.iter().enumerate() {
            assert_eq!(frame.index(), n);
            assert_eq!(frame.pixel(0, 0)[0], n as u8);
        }
    }

    #[test]
    fn test_without_flip_frames_are_identical() {
        let source = tagged_frames(5);
        let mut h = harness(
            StubReader::new(source.clone()),
            StubWriter::new(),
            FakeBehaviour::Succeed,
        );
        h.run(1.0, false).unwrap();
        assert_eq!(h.writer_log.lock().unwrap().written, source);
    }

    #[test]
    fn test_flip_mirrors_every_row() {
        let source = tagged_frames(3);
        let mut h = harness(
            StubReader::new(source.clone()),
            StubWriter::new(),
            FakeBehaviour::Succeed,
        );
        h.run(1.0, true).unwrap();

        let log = h.writer_log.lock().unwrap();
        for (out, src) in log.written.iter().zip(&source) {
            let width = src.width();
            for y in 0..src.height() {
                for x in 0..width {
                    assert_eq!(out.pixel(x, y), src.pixel(width - 1 - x, y));
                }
            }
        }
    }

    // --- Streams and scratch file ---

    #[test]
    fn test_success_publishes_output_and_removes_scratch() {
        let mut h = harness(
            StubReader::new(tagged_frames(4)),
            StubWriter::new(),
            FakeBehaviour::Succeed,
        );
        h.run(2.0, true).unwrap();

        let scratch = h.scratch_path();
        assert_eq!(
            scratch.extension().unwrap().to_string_lossy(),
            INTERMEDIATE_EXTENSION
        );
        assert!(!scratch.exists());
        assert!(h.output().exists());
        assert!(h.leftovers().is_empty(), "{:?}", h.leftovers());
        assert!(*h.reader_closed.lock().unwrap());
        assert!(h.writer_log.lock().unwrap().closed);

        let calls = h.calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, scratch);
        assert_eq!(calls[0].1.extension().unwrap(), "mp4");
        assert_ne!(calls[0].1, h.output());
    }

    #[test]
    fn test_encoder_failure_surfaces_stderr_and_cleans_up() {
        let mut h = harness(
            StubReader::new(tagged_frames(4)),
            StubWriter::new(),
            FakeBehaviour::Exit(1, "Unknown encoder 'libx264'"),
        );
        let err = h.run(2.0, false).unwrap_err();

        match err {
            ClipError::Encode(EncodeFailure::Exited { status, stderr }) => {
                assert_eq!(status, "exit code 1");
                assert_eq!(stderr, "Unknown encoder 'libx264'");
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(!h.scratch_path().exists());
        assert!(!h.output().exists());
        assert!(h.leftovers().is_empty(), "{:?}", h.leftovers());
    }

    #[test]
    fn test_missing_encoder_is_distinct_encode_error() {
        let mut h = harness(
            StubReader::new(tagged_frames(2)),
            StubWriter::new(),
            FakeBehaviour::Missing,
        );
        let err = h.run(2.0, false).unwrap_err();
        assert!(matches!(
            err,
            ClipError::Encode(EncodeFailure::NotInstalled { .. })
        ));
        assert!(err.to_string().contains("install ffmpeg"));
        assert!(!h.scratch_path().exists());
    }

    #[test]
    fn test_failed_encode_leaves_existing_output_untouched() {
        let mut h = harness(
            StubReader::new(tagged_frames(2)),
            StubWriter::new(),
            FakeBehaviour::Exit(1, "error"),
        );
        std::fs::write(h.output(), b"previous run").unwrap();
        assert!(h.run(2.0, false).is_err());
        assert_eq!(std::fs::read(h.output()).unwrap(), b"previous run");
    }

    #[test]
    fn test_writer_init_failure_releases_source_and_scratch() {
        let mut writer = StubWriter::new();
        writer.fail_open = true;
        let mut h = harness(
            StubReader::new(tagged_frames(3)),
            writer,
            FakeBehaviour::Succeed,
        );
        let err = h.run(1.0, false).unwrap_err();

        assert!(matches!(err, ClipError::WriterInit { .. }));
        assert!(*h.reader_closed.lock().unwrap());
        assert!(!h.scratch_path().exists());
        assert!(h.calls.lock().unwrap().is_empty());
    }

    #[test]
    fn test_unreadable_source_never_opens_writer() {
        let mut h = harness(
            StubReader::new(tagged_frames(3)),
            StubWriter::new(),
            FakeBehaviour::Succeed,
        );
        let output = h.output();
        let request = RetimeRequest {
            source: Path::new("missing.mp4"),
            output: &output,
            target_duration: 1.0,
            flip: false,
        };
        let err = h
            .use_case
            .execute(&request, &mut NullPipelineLogger)
            .unwrap_err();

        assert!(matches!(err, ClipError::UnreadableInput { .. }));
        assert!(*h.reader_closed.lock().unwrap());
        assert!(h.writer_log.lock().unwrap().opened.is_none());
        assert!(h.leftovers().is_empty());
    }

    #[test]
    fn test_decode_error_mid_stream_closes_streams() {
        let mut reader = StubReader::new(tagged_frames(6));
        reader.fail_at = Some(3);
        let mut h = harness(reader, StubWriter::new(), FakeBehaviour::Succeed);
        let err = h.run(1.0, false).unwrap_err();

        assert!(matches!(err, ClipError::UnreadableInput { .. }));
        assert_eq!(h.writer_log.lock().unwrap().written.len(), 3);
        assert!(h.writer_log.lock().unwrap().closed);
        assert!(*h.reader_closed.lock().unwrap());
        assert!(!h.scratch_path().exists());
        assert!(h.calls.lock().unwrap().is_empty());
    }

    #[test]
    fn test_write_error_is_frame_write() {
        let mut writer = StubWriter::new();
        writer.fail_write = true;
        let mut h = harness(
            StubReader::new(tagged_frames(2)),
            writer,
            FakeBehaviour::Succeed,
        );
        let err = h.run(1.0, false).unwrap_err();
        assert!(matches!(err, ClipError::FrameWrite { .. }));
        assert!(!h.scratch_path().exists());
        assert!(!h.output().exists());
    }

    #[test]
    fn test_use_case_is_reusable_across_clips() {
        let mut h = harness(
            StubReader::new(tagged_frames(4)),
            StubWriter::new(),
            FakeBehaviour::Succeed,
        );
        h.run(2.0, false).unwrap();
        // The stub reader is drained, so the second clip reports zero frames
        // and falls back to the default rate.
        let report = h.run(2.0, false).unwrap();
        assert_eq!(report.frames_written, 0);
        assert_eq!(report.frame_rate, 30.0);
        assert_eq!(h.calls.lock().unwrap().len(), 2);
    }

    #[test]
    fn test_staging_path_matches_output_extension() {
        let dir = tempfile::tempdir().unwrap();
        let staged = staging_path(&dir.path().join("3-GT-p.mov")).unwrap();
        assert_eq!(staged.extension().unwrap(), "mov");
        assert_eq!(staged.parent().unwrap(), dir.path());
    }

    #[test]
    fn test_staging_path_in_missing_dir_is_publish_error() {
        let err = staging_path(Path::new("/nonexistent/dir/out.mp4")).unwrap_err();
        assert!(matches!(
            err,
            ClipError::Encode(EncodeFailure::Publish { .. })
        ));
    }

    #[cfg(unix)]
    fn mode_of(path: &Path) -> u32 {
        use std::os::unix::fs::PermissionsExt;
        std::fs::metadata(path).unwrap().permissions().mode() & 0o777
    }

    #[cfg(unix)]
    #[test]
    fn test_new_output_gets_default_file_mode() {
        let mut h = harness(
            StubReader::new(tagged_frames(2)),
            StubWriter::new(),
            FakeBehaviour::Succeed,
        );
        h.run(1.0, false).unwrap();

        let plain = h.dir.path().join("plain.bin");
        std::fs::File::create(&plain).unwrap();
        assert_eq!(mode_of(&h.output()), mode_of(&plain));
    }

    #[cfg(unix)]
    #[test]
    fn test_replaced_output_keeps_its_mode() {
        use std::os::unix::fs::PermissionsExt;

        let mut h = harness(
            StubReader::new(tagged_frames(2)),
            StubWriter::new(),
            FakeBehaviour::Succeed,
        );
        std::fs::write(h.output(), b"previous run").unwrap();
        std::fs::set_permissions(h.output(), std::fs::Permissions::from_mode(0o640)).unwrap();

        h.run(1.0, false).unwrap();
        assert_eq!(mode_of(&h.output()), 0o640);
        assert_ne!(std::fs::read(h.output()).unwrap(), b"previous run");
    }

    // --- Real ffmpeg I/O with a copying encoder ---

    fn retime_fixture(frames: usize, source_fps: f64, target: f64, flip: bool) -> Vec<(f64, f64)> {
        use crate::video::infrastructure::ffmpeg_mjpeg_writer::FfmpegMjpegWriter;
        use crate::video::infrastructure::ffmpeg_reader::FfmpegReader;
        use crate::video::infrastructure::fixtures::{half_means, write_fixture_clip};

        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("1-GT.avi");
        let output = dir.path().join("1-GT-p.avi");
        write_fixture_clip(&source, frames, 64, 48, source_fps);

        let mut use_case = RetimeClipUseCase::new(
            Box::new(FfmpegReader::new()),
            Box::new(FfmpegMjpegWriter::new()),
            Box::new(FakeTranscoder::new(FakeBehaviour::Succeed)),
            RetimeSettings {
                scratch_dir: Some(dir.path().to_path_buf()),
                ..RetimeSettings::default()
            },
        );
        let request = RetimeRequest {
            source: &source,
            output: &output,
            target_duration: target,
            flip,
        };
        let report = use_case.execute(&request, &mut NullPipelineLogger).unwrap();
        assert_eq!(report.frames_written, frames);

        let mut reader = FfmpegReader::new();
        let meta = reader.open(&output).unwrap();
        assert_eq!(meta.total_frames, frames);
        assert_relative_eq!(meta.duration_secs(), target, epsilon = 0.02);
        let means = reader.frames().map(|f| half_means(&f.unwrap())).collect();
        reader.close();

        let remaining: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(remaining.len(), 2, "{remaining:?}");
        means
    }

    #[test]
    fn test_real_clip_matches_target_duration_in_order() {
        use crate::video::infrastructure::fixtures::fixture_level;

        let means = retime_fixture(60, 24.0, 2.0, false);
        assert_eq!(means.len(), 60);
        for (i, (left, right)) in means.iter().enumerate() {
            let level = fixture_level(i) as f64;
            assert!((left - level).abs() < 8.0, "frame {i}: left {left} vs {level}");
            assert!((right - (255.0 - level)).abs() < 8.0, "frame {i}: right {right}");
        }
    }

    #[test]
    fn test_real_clip_flip_swaps_halves() {
        use crate::video::infrastructure::fixtures::fixture_level;

        let means = retime_fixture(90, 30.0, 3.0, true);
        assert_eq!(means.len(), 90);
        for (i, (left, right)) in means.iter().enumerate() {
            let level = fixture_level(i) as f64;
            assert!((left - (255.0 - level)).abs() < 8.0, "frame {i}: left {left}");
            assert!((right - level).abs() < 8.0, "frame {i}: right {right}");
        }
    }

    #[test]
    fn test_real_encoder_delivers_h264_at_fractional_rate() {
        use crate::encode::infrastructure::ffmpeg_cli_transcoder::FfmpegCliTranscoder;
        use crate::video::infrastructure::ffmpeg_mjpeg_writer::FfmpegMjpegWriter;
        use crate::video::infrastructure::ffmpeg_reader::FfmpegReader;
        use crate::video::infrastructure::fixtures::{fixture_level, half_means, write_fixture_clip};

        let transcoder = FfmpegCliTranscoder::default();
        if !transcoder.is_available() {
            return;
        }

        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("2-GT.avi");
        let output = dir.path().join("2-GT-p.mp4");
        write_fixture_clip(&source, 90, 64, 48, 30.0);

        let mut use_case = RetimeClipUseCase::new(
            Box::new(FfmpegReader::new()),
            Box::new(FfmpegMjpegWriter::new()),
            Box::new(transcoder),
            RetimeSettings {
                scratch_dir: Some(dir.path().to_path_buf()),
                ..RetimeSettings::default()
            },
        );
        let request = RetimeRequest {
            source: &source,
            output: &output,
            target_duration: 3.2,
            flip: true,
        };
        let report = use_case.execute(&request, &mut NullPipelineLogger).unwrap();
        assert_relative_eq!(report.frame_rate, 28.125, epsilon = 1e-9);

        let mut reader = FfmpegReader::new();
        let meta = reader.open(&output).unwrap();
        assert_eq!(meta.codec, "h264");
        assert_eq!((meta.width, meta.height), (64, 48));
        assert_eq!(meta.total_frames, 90);
        assert_relative_eq!(meta.fps, 28.125, epsilon = 0.01);
        assert_relative_eq!(meta.duration_secs(), 3.2, epsilon = 0.02);

        let first = reader.frames().next().unwrap().unwrap();
        reader.close();
        let (left, right) = half_means(&first);
        let level = fixture_level(0) as f64;
        assert!((left - (255.0 - level)).abs() < 12.0, "left {left}");
        assert!((right - level).abs() < 12.0, "right {right}");

        let mut remaining: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        remaining.sort();
        assert_eq!(remaining, vec!["2-GT-p.mp4", "2-GT.avi"]);
    }
}
