use ndarray::ArrayViewMut3;

/// Bytes per pixel for the RGB24 layout every reader produces.
pub const RGB_CHANNELS: u8 = 3;

/// A decoded video frame: tightly packed pixels in row-major order.
///
/// Pixel format conversion happens inside the ffmpeg reader and writer;
/// everything in between sees plain interleaved bytes.
#[derive(Clone, Debug, PartialEq)]
pub struct Frame {
    data: Vec<u8>,
    width: u32,
    height: u32,
    index: usize,
}

impl Frame {
    /// Builds an RGB24 frame from `width * height * 3` bytes.
    pub fn rgb(data: Vec<u8>, width: u32, height: u32, index: usize) -> Self {
        debug_assert_eq!(
            data.len(),
            (width as usize) * (height as usize) * (RGB_CHANNELS as usize),
            "data length must equal width * height * channels"
        );
        Self {
            data,
            width,
            height,
            index,
        }
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn channels(&self) -> u8 {
        RGB_CHANNELS
    }

    /// Position of this frame in decode order, starting at 0.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Bytes in one row of pixels.
    pub fn row_len(&self) -> usize {
        self.width as usize * RGB_CHANNELS as usize
    }

    /// Channel values of the pixel at column `x` of row `y`.
    pub fn pixel(&self, x: u32, y: u32) -> &[u8] {
        let channels = RGB_CHANNELS as usize;
        let start = y as usize * self.row_len() + x as usize * channels;
        &self.data[start..start + channels]
    }

    /// `(height, width, channel)` view over the pixel buffer.
    pub fn as_ndarray_mut(&mut self) -> ArrayViewMut3<'_, u8> {
        let shape = (
            self.height as usize,
            self.width as usize,
            RGB_CHANNELS as usize,
        );
        ArrayViewMut3::from_shape(shape, &mut self.data)
            .expect("Frame data length must match dimensions")
    }
}
