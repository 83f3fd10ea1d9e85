pub mod pipeline_logger;
pub mod probe_duration_use_case;
pub mod retime_batch_use_case;
pub mod retime_clip_use_case;
