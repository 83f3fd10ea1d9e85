/// Frame rate used when the target duration gives no usable rate.
pub const FALLBACK_FRAME_RATE: f64 = 30.0;

/// Default clip container extension for subjects, references and outputs.
pub const DEFAULT_CLIP_EXTENSION: &str = "mp4";

pub const SUBJECT_SUFFIX: &str = "-GT";
pub const OUTPUT_SUFFIX: &str = "-GT-p";

/// Page directories are named `{PAGE_DIR_PREFIX}{n}`.
pub const PAGE_DIR_PREFIX: &str = "page";

/// Container for the scratch file between the frame pass and the final encode.
pub const INTERMEDIATE_EXTENSION: &str = "avi";

/// MJPEG quantiser for the scratch file (lambda units, q=2).
pub const INTERMEDIATE_GLOBAL_QUALITY: u32 = 2 * 118;

/// Frame progress is reported every this many frames.
pub const DEFAULT_PROGRESS_EVERY: usize = 10;

pub const DEFAULT_ENCODER_PROGRAM: &str = "ffmpeg";
pub const DEFAULT_VIDEO_CODEC: &str = "libx264";
pub const DEFAULT_PRESET: &str = "medium";
pub const DEFAULT_CRF: u32 = 23;
pub const DEFAULT_PIXEL_FORMAT: &str = "yuv420p";
pub const DEFAULT_MOVFLAGS: &str = "+faststart";
