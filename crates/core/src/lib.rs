pub mod encode;
pub mod pipeline;
pub mod shared;
pub mod transform;
pub mod video;
