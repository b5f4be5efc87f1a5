// Core pixel types shared by the capture side, the effects and the window.

/// RGBA samples, 4 per pixel, row-major. `data.len() == width * height * 4`.
/// Visual: this is the frame you will see after the effect runs on it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PixelBuffer {
    width: usize,
    height: usize,
    data: Vec<u8>,
}

impl PixelBuffer {
    /// A fully transparent black frame of the given size.
    pub fn new(width: usize, height: usize) -> Self {
        Self { width, height, data: vec![0u8; width * height * 4] }
    }

    /// Wrap existing RGBA samples. Returns `None` if the length doesn't match the size.
    #[cfg(test)]
    pub(crate) fn from_rgba(width: usize, height: usize, data: Vec<u8>) -> Option<Self> {
        if data.len() != width * height * 4 {
            return None;
        }
        Some(Self { width, height, data })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn size(&self) -> (usize, usize) {
        (self.width, self.height)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn as_bytes_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    /// Resize in place, keeping the allocation when the sample count is unchanged.
    /// Contents are unspecified afterwards; the next capture overwrites them.
    pub fn reshape(&mut self, width: usize, height: usize) {
        self.width = width;
        self.height = height;
        self.data.resize(width * height * 4, 0);
    }

    /// RGBA of the pixel at (x, y). Panics if out of bounds, like slice indexing.
    pub fn pixel(&self, x: usize, y: usize) -> [u8; 4] {
        let i = (y * self.width + x) * 4;
        [self.data[i], self.data[i + 1], self.data[i + 2], self.data[i + 3]]
    }

    /// Pack into 0x00RRGGBB words for minifb. `out` is resized to fit.
    pub fn pack_rgb_into(&self, out: &mut Vec<u32>) {
        out.clear();
        out.extend(self.data.chunks_exact(4).map(|px| {
            ((px[0] as u32) << 16) | ((px[1] as u32) << 8) | px[2] as u32
        }));
    }
}
