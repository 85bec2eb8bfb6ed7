use ndarray::{ArrayView3, ArrayViewMut3};

/// One decoded picture plus the time it is shown at.
///
/// Pixels are interleaved 8-bit samples, row-major, `channels` per pixel
/// (3 for RGB from the decoder). `index` is the decode order within a
/// pass and `timestamp` the presentation time in seconds that captions
/// are scheduled against.
#[derive(Clone, Debug)]
pub struct Frame {
    pixels: Vec<u8>,
    width: u32,
    height: u32,
    channels: u8,
    index: usize,
    timestamp: f64,
}

impl Frame {
    /// Wraps raw pixels. The length must be `width * height * channels`;
    /// debug builds panic otherwise.
    pub fn new(pixels: Vec<u8>, width: u32, height: u32, channels: u8, index: usize) -> Self {
        debug_assert_eq!(
            pixels.len(),
            byte_len(width, height, channels),
            "pixel buffer does not match {width}x{height}x{channels}"
        );
        Self {
            pixels,
            width,
            height,
            channels,
            index,
            timestamp: 0.0,
        }
    }

    /// Stamps the presentation time in seconds.
    pub fn with_timestamp(mut self, timestamp: f64) -> Self {
        self.timestamp = timestamp;
        self
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// `(width, height)`, the canvas a caption overlay must match.
    pub fn canvas(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn channels(&self) -> u8 {
        self.channels
    }

    /// Whether the frame carries at least red, green and blue samples.
    pub fn is_color(&self) -> bool {
        self.channels >= 3
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn timestamp(&self) -> f64 {
        self.timestamp
    }

    pub fn data(&self) -> &[u8] {
        &self.pixels
    }

    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut self.pixels
    }

    /// `(row, col, channel)` view over the pixels.
    pub fn as_ndarray(&self) -> ArrayView3<'_, u8> {
        ArrayView3::from_shape(self.dims(), &self.pixels)
            .expect("Frame pixel buffer must match its dimensions")
    }

    pub fn as_ndarray_mut(&mut self) -> ArrayViewMut3<'_, u8> {
        let dims = self.dims();
        ArrayViewMut3::from_shape(dims, &mut self.pixels)
            .expect("Frame pixel buffer must match its dimensions")
    }

    fn dims(&self) -> (usize, usize, usize) {
        (
            self.height as usize,
            self.width as usize,
            self.channels as usize,
        )
    }
}

fn byte_len(width: u32, height: u32, channels: u8) -> usize {
    width as usize * height as usize * channels as usize
}
