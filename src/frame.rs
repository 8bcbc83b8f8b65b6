//! Transient frame buffer.
//!
//! A `Frame` is owned by the caller of the acquisition loop and refilled in
//! place on every grab. Pixels are tightly packed BGRA8, the layout the SDK
//! hands out for its `U8_C4` images. Nothing retains a frame across
//! iterations.

/// Bytes per BGRA pixel.
pub const BYTES_PER_PIXEL: usize = 4;

/// Capture timestamp in nanoseconds since the Unix epoch.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct Timestamp(u64);

impl Timestamp {
    pub fn from_nanos(nanos: u64) -> Self {
        Self(nanos)
    }

    pub fn as_nanos(self) -> u64 {
        self.0
    }

    pub fn as_micros(self) -> u64 {
        self.0 / 1_000
    }
}

/// A reusable BGRA8 image buffer.
#[derive(Debug, Default)]
pub struct Frame {
    width: u32,
    height: u32,
    data: Vec<u8>,
    pub timestamp: Timestamp,
}

impl Frame {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Row length in bytes (no padding).
    pub fn row_bytes(&self) -> usize {
        self.width as usize * BYTES_PER_PIXEL
    }

    /// Resize the buffer for a `width` x `height` image.
    ///
    /// Existing capacity is reused; contents are unspecified afterwards.
    pub fn reshape(&mut self, width: u32, height: u32) {
        self.width = width;
        self.height = height;
        self.data
            .resize(width as usize * height as usize * BYTES_PER_PIXEL, 0);
    }

    pub fn bgra(&self) -> &[u8] {
        &self.data
    }

    pub fn bgra_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    /// Copy the frame into `out` as packed RGB8, dropping alpha.
    pub fn to_rgb(&self, out: &mut Vec<u8>) {
        out.clear();
        out.reserve(self.width as usize * self.height as usize * 3);
        for px in self.data.chunks_exact(BYTES_PER_PIXEL) {
            out.extend_from_slice(&[px[2], px[1], px[0]]);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reshape_sizes_buffer() {
        let mut frame = Frame::new();
        frame.reshape(4, 3);
        assert_eq!(frame.bgra().len(), 4 * 3 * 4);
        assert_eq!(frame.row_bytes(), 16);

        frame.reshape(2, 2);
        assert_eq!(frame.bgra().len(), 16);
    }

    #[test]
    fn to_rgb_swaps_channels_and_drops_alpha() {
        let mut frame = Frame::new();
        frame.reshape(2, 1);
        frame
            .bgra_mut()
            .copy_from_slice(&[10, 20, 30, 255, 1, 2, 3, 0]);

        let mut rgb = Vec::new();
        frame.to_rgb(&mut rgb);
        assert_eq!(rgb, vec![30, 20, 10, 3, 2, 1]);
    }

    #[test]
    fn timestamp_truncates_to_micros() {
        let ts = Timestamp::from_nanos(1_700_000_000_123_456_789);
        assert_eq!(ts.as_micros(), 1_700_000_000_123_456);
    }
}
