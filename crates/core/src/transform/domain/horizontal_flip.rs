use ndarray::Axis;

use crate::shared::frame::Frame;

/// Mirrors a frame left-right in place.
///
/// Pixel `(x, y)` trades places with `(width - 1 - x, y)`; channel order
/// within a pixel is untouched and rows never move.
pub fn flip_horizontal(frame: &mut Frame) {
    let mut pixels = frame.as_ndarray_mut();
    let width = pixels.len_of(Axis(1));
    let channels = pixels.len_of(Axis(2));

    for mut row in pixels.axis_iter_mut(Axis(0)) {
        for x in 0..width / 2 {
            let mirror = width - 1 - x;
            for c in 0..channels {
                row.swap([x, c], [mirror, c]);
            }
        }
    }
}
