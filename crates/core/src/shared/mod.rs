pub mod batch_config;
pub mod clip_error;
pub mod clip_pair;
pub mod constants;
pub mod frame;
pub mod frame_rate;
pub mod video_metadata;
