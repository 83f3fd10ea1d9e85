/// Playback rate that stretches `frame_count` frames over `target_duration`
/// seconds.
///
/// A non-positive target, or a clip with no frames, has no usable rate and
/// gets `fallback_fps` instead.
pub fn retimed_frame_rate(frame_count: usize, target_duration: f64, fallback_fps: f64) -> f64 {
    if target_duration > 0.0 && frame_count > 0 {
        frame_count as f64 / target_duration
    } else {
        fallback_fps
    }
}
