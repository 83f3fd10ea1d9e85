use std::ops::RangeInclusive;
use std::path::{Path, PathBuf};
use std::process;

use clap::{Args, Parser, Subcommand};

use clip_retime_core::encode::infrastructure::ffmpeg_cli_transcoder::{
    DeliverySettings, FfmpegCliTranscoder,
};
use clip_retime_core::pipeline::pipeline_logger::{PipelineLogger, StdoutPipelineLogger};
use clip_retime_core::pipeline::probe_duration_use_case::ProbeDurationUseCase;
use clip_retime_core::pipeline::retime_batch_use_case::RetimeBatchUseCase;
use clip_retime_core::pipeline::retime_clip_use_case::{
    RetimeClipUseCase, RetimeRequest, RetimeSettings,
};
use clip_retime_core::shared::batch_config::BatchConfig;
use clip_retime_core::shared::constants::{
    DEFAULT_CLIP_EXTENSION, DEFAULT_CRF, DEFAULT_ENCODER_PROGRAM, DEFAULT_PRESET,
    DEFAULT_PROGRESS_EVERY,
};
use clip_retime_core::video::infrastructure::ffmpeg_mjpeg_writer::FfmpegMjpegWriter;
use clip_retime_core::video::infrastructure::ffmpeg_reader::FfmpegReader;

const BANNER_WIDTH: usize = 50;
const MAX_CRF: u32 = 51;

/// Mirror and retime video clips to match reference durations.
#[derive(Parser)]
#[command(name = "clip-retime", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Process every page{n}/{i}-GT clip under a base directory.
    Batch(BatchArgs),
    /// Print a clip's duration in seconds.
    Probe {
        /// Video file to probe.
        file: PathBuf,
    },
    /// Retime a single clip.
    Retime(RetimeArgs),
}

#[derive(Args)]
struct BatchArgs {
    /// Directory holding the page subdirectories.
    #[arg(long, default_value = ".")]
    base_dir: PathBuf,

    /// Pages to process, e.g. `1-4` or `2`.
    #[arg(long, default_value = "1-4", value_parser = parse_range)]
    pages: RangeInclusive<u32>,

    /// Slots to process within each page, e.g. `1-4`.
    #[arg(long, default_value = "1-4", value_parser = parse_range)]
    slots: RangeInclusive<u32>,

    /// Page whose clips are not mirrored.
    #[arg(long, default_value_t = 1)]
    unflipped_page: u32,

    /// Clip file extension, without the dot.
    #[arg(long, default_value = DEFAULT_CLIP_EXTENSION)]
    extension: String,

    #[command(flatten)]
    encoder: EncoderArgs,
}

#[derive(Args)]
struct RetimeArgs {
    /// Clip to retime.
    source: PathBuf,

    /// Where to write the re-encoded clip.
    output: PathBuf,

    /// Target duration in seconds.
    #[arg(long, required_unless_present = "reference", conflicts_with = "reference")]
    duration: Option<f64>,

    /// Take the target duration from this clip.
    #[arg(long)]
    reference: Option<PathBuf>,

    /// Mirror frames left-right.
    #[arg(long)]
    flip: bool,

    #[command(flatten)]
    encoder: EncoderArgs,
}

#[derive(Args)]
struct EncoderArgs {
    /// ffmpeg binary used for the final encode.
    #[arg(long, default_value = DEFAULT_ENCODER_PROGRAM)]
    ffmpeg: PathBuf,

    /// H.264 CRF quality (0=lossless, 51=worst).
    #[arg(long, default_value_t = DEFAULT_CRF)]
    crf: u32,

    /// x264 preset.
    #[arg(long, default_value = DEFAULT_PRESET)]
    preset: String,

    /// Directory for intermediate files (defaults to the system temp dir).
    #[arg(long)]
    scratch_dir: Option<PathBuf>,

    /// Log progress every N frames.
    #[arg(long, default_value_t = DEFAULT_PROGRESS_EVERY)]
    progress_every: usize,
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp(None)
        .format_target(false)
        .init();

    if let Err(e) = run() {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    validate(&cli)?;

    match cli.command {
        Command::Batch(args) => run_batch(args),
        Command::Probe { file } => run_probe(&file),
        Command::Retime(args) => run_retime(args),
    }
}

fn run_batch(args: BatchArgs) -> Result<(), Box<dyn std::error::Error>> {
    let config = BatchConfig {
        pages: args.pages,
        slots: args.slots,
        unflipped_page: args.unflipped_page,
        extension: args.extension,
        ..BatchConfig::new(args.base_dir)
    };
    let mut logger = StdoutPipelineLogger::new(args.encoder.progress_every);

    let mut use_case = RetimeBatchUseCase::new(
        config,
        ProbeDurationUseCase::new(Box::new(FfmpegReader::new())),
        build_retimer(&args.encoder),
    );
    let report = use_case.execute(&mut logger);

    log::info!("\n{}", "=".repeat(BANNER_WIDTH));
    log::info!("All video processing complete!");
    log::info!("{}", report.tally());
    log::info!("{}", "=".repeat(BANNER_WIDTH));
    logger.summary();
    Ok(())
}

fn run_probe(file: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let mut probe = ProbeDurationUseCase::new(Box::new(FfmpegReader::new()));
    let duration = probe.execute(file)?;
    println!("{duration:.3}");
    Ok(())
}

fn run_retime(args: RetimeArgs) -> Result<(), Box<dyn std::error::Error>> {
    let target_duration = match (&args.reference, args.duration) {
        (Some(reference), _) => {
            let mut probe = ProbeDurationUseCase::new(Box::new(FfmpegReader::new()));
            let duration = probe.execute(reference)?;
            log::info!(
                "Target duration from {}: {duration:.2}s",
                reference.display()
            );
            duration
        }
        (None, Some(duration)) => duration,
        (None, None) => return Err("one of --duration or --reference is required".into()),
    };

    let mut logger = StdoutPipelineLogger::new(args.encoder.progress_every);
    let mut use_case = build_retimer(&args.encoder);
    let request = RetimeRequest {
        source: &args.source,
        output: &args.output,
        target_duration,
        flip: args.flip,
    };
    let report = use_case.execute(&request, &mut logger)?;
    log::info!(
        "Output written to {} ({} frames at {:.2} fps)",
        args.output.display(),
        report.frames_written,
        report.frame_rate
    );
    logger.summary();
    Ok(())
}

fn build_retimer(encoder: &EncoderArgs) -> RetimeClipUseCase {
    let transcoder = FfmpegCliTranscoder::new(DeliverySettings {
        crf: encoder.crf,
        preset: encoder.preset.clone(),
        ..DeliverySettings::default()
    })
    .with_program(&encoder.ffmpeg);

    if !transcoder.is_available() {
        log::warn!(
            "{} not found. Please install ffmpeg: https://ffmpeg.org/download.html",
            transcoder.program().display()
        );
    }

    RetimeClipUseCase::new(
        Box::new(FfmpegReader::new()),
        Box::new(FfmpegMjpegWriter::new()),
        Box::new(transcoder),
        RetimeSettings {
            scratch_dir: encoder.scratch_dir.clone(),
            ..RetimeSettings::default()
        },
    )
}

fn validate(cli: &Cli) -> Result<(), Box<dyn std::error::Error>> {
    match &cli.command {
        Command::Batch(args) => {
            if !args.base_dir.is_dir() {
                return Err(format!(
                    "Base directory not found: {}",
                    args.base_dir.display()
                )
                .into());
            }
            if args.extension.is_empty() || args.extension.starts_with('.') {
                return Err(format!(
                    "Extension must be non-empty and given without a dot, got '{}'",
                    args.extension
                )
                .into());
            }
            validate_encoder(&args.encoder)
        }
        Command::Probe { file } => require_file(file),
        Command::Retime(args) => {
            require_file(&args.source)?;
            if let Some(reference) = &args.reference {
                require_file(reference)?;
            }
            if let Some(duration) = args.duration {
                if !duration.is_finite() {
                    return Err(format!("Duration must be a finite number, got {duration}").into());
                }
            }
            if args.source == args.output {
                return Err("Output must differ from the source clip".into());
            }
            validate_encoder(&args.encoder)
        }
    }
}

fn validate_encoder(encoder: &EncoderArgs) -> Result<(), Box<dyn std::error::Error>> {
    if encoder.crf > MAX_CRF {
        return Err(format!("CRF must be between 0 and {MAX_CRF}, got {}", encoder.crf).into());
    }
    if encoder.progress_every == 0 {
        return Err("--progress-every must be at least 1".into());
    }
    if let Some(dir) = &encoder.scratch_dir {
        if !dir.is_dir() {
            return Err(format!("Scratch directory not found: {}", dir.display()).into());
        }
    }
    Ok(())
}

fn require_file(path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    if !path.is_file() {
        return Err(format!("Input file not found: {}", path.display()).into());
    }
    Ok(())
}

/// Parses `N` or `A-B` into an inclusive range.
fn parse_range(s: &str) -> Result<RangeInclusive<u32>, String> {
    let (start, end) = match s.split_once('-') {
        Some((a, b)) => (a.trim(), b.trim()),
        None => (s.trim(), s.trim()),
    };
    let start: u32 = start
        .parse()
        .map_err(|_| format!("invalid range start '{start}'"))?;
    let end: u32 = end.parse().map_err(|_| format!("invalid range end '{end}'"))?;
    if start > end {
        return Err(format!("range {start}-{end} is empty"));
    }
    Ok(start..=end)
}
