// Frame source adapter: takes whatever the playback surface is showing right
// now (playing, paused or mid-scrub) and copies it, scaled to the output size,
// into the pipeline's pixel buffer. It never touches playback position.

use image::RgbaImage;
use image::imageops::{self, FilterType};

use crate::error::CaptureError;
use crate::types::PixelBuffer;

/// How far along the surface is with having a readable frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReadyState {
    /// Nothing decoded yet.
    HaveNothing,
    /// A frame for the current position is available.
    HaveCurrentData,
    /// There is a frame but its pixels may not be read.
    Restricted,
}

/// Something that is currently displaying video: a webcam, a clip on disk...
pub trait PlaybackSurface {
    fn ready_state(&self) -> ReadyState;

    /// Native frame size, once known.
    fn intrinsic_size(&self) -> Option<(u32, u32)>;

    /// The frame at the current position. May decode or block for the next camera frame.
    fn current_frame(&mut self) -> Result<&RgbaImage, CaptureError>;
}

/// What the pipeline pulls a frame from each tick.
pub trait FrameSource {
    /// Fill `buf` (already sized to the output) with the current frame.
    fn capture_into(&mut self, buf: &mut PixelBuffer) -> Result<(), CaptureError>;

    /// Allocating variant of [`FrameSource::capture_into`].
    fn capture_frame(&mut self, width: usize, height: usize) -> Result<PixelBuffer, CaptureError> {
        let mut buf = PixelBuffer::new(width, height);
        self.capture_into(&mut buf)?;
        Ok(buf)
    }
}

/// Adapter from a [`PlaybackSurface`] to a [`FrameSource`].
pub struct SurfaceCapture<P> {
    surface: P,
    filter: FilterType,
}

impl<P: PlaybackSurface> SurfaceCapture<P> {
    pub fn new(surface: P) -> Self {
        Self { surface, filter: FilterType::Triangle }
    }

    pub fn surface(&self) -> &P {
        &self.surface
    }

    /// Transport controls reach the surface through here.
    pub fn surface_mut(&mut self) -> &mut P {
        &mut self.surface
    }

    /// Swap in a new surface (next clip) and return the old one.
    pub fn replace(&mut self, surface: P) -> P {
        std::mem::replace(&mut self.surface, surface)
    }
}

impl<P: PlaybackSurface> FrameSource for SurfaceCapture<P> {
    fn capture_into(&mut self, buf: &mut PixelBuffer) -> Result<(), CaptureError> {
        match self.surface.ready_state() {
            ReadyState::HaveNothing => return Err(CaptureError::NotReady),
            ReadyState::Restricted => {
                return Err(CaptureError::Restricted("surface pixels are not readable".into()));
            }
            ReadyState::HaveCurrentData => {}
        }
        if self.surface.intrinsic_size().is_none() {
            return Err(CaptureError::NotReady);
        }

        let (w, h) = (buf.width() as u32, buf.height() as u32);
        if w == 0 || h == 0 {
            return Ok(());
        }

        let filter = self.filter;
        let frame = self.surface.current_frame()?;
        if frame.dimensions() == (w, h) {
            copy_samples(buf, frame.as_raw())
        } else {
            // Stretch to the output like a canvas draw would, no letterboxing.
            let scaled = imageops::resize(frame, w, h, filter);
            copy_samples(buf, scaled.as_raw())
        }
    }
}

/// An `ImageBuffer` may own more samples than its dimensions cover; only the
/// leading `width * height * 4` belong to the frame.
fn copy_samples(buf: &mut PixelBuffer, raw: &[u8]) -> Result<(), CaptureError> {
    let dst = buf.as_bytes_mut();
    let src = raw.get(..dst.len()).ok_or_else(|| {
        CaptureError::Source(format!("frame has {} samples, need {}", raw.len(), dst.len()))
    })?;
    dst.copy_from_slice(src);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    struct StillSurface {
        state: ReadyState,
        frame: RgbaImage,
        reads: usize,
    }

    impl StillSurface {
        fn new(state: ReadyState, w: u32, h: u32, color: [u8; 4]) -> Self {
            Self { state, frame: RgbaImage::from_pixel(w, h, Rgba(color)), reads: 0 }
        }
    }

    impl PlaybackSurface for StillSurface {
        fn ready_state(&self) -> ReadyState {
            self.state
        }

        fn intrinsic_size(&self) -> Option<(u32, u32)> {
            Some(self.frame.dimensions())
        }

        fn current_frame(&mut self) -> Result<&RgbaImage, CaptureError> {
            self.reads += 1;
            Ok(&self.frame)
        }
    }

    #[test]
    fn copies_same_size_frame_verbatim() {
        let mut frame = RgbaImage::new(2, 2);
        frame.put_pixel(1, 0, Rgba([9, 8, 7, 6]));
        let surface = StillSurface { state: ReadyState::HaveCurrentData, frame, reads: 0 };
        let mut cap = SurfaceCapture::new(surface);
        let buf = cap.capture_frame(2, 2).unwrap();
        assert_eq!(buf.pixel(1, 0), [9, 8, 7, 6]);
        assert_eq!(buf.pixel(0, 0), [0, 0, 0, 0]);
    }

    #[test]
    fn scales_to_output_size() {
        let surface = StillSurface::new(ReadyState::HaveCurrentData, 8, 6, [10, 20, 30, 255]);
        let mut cap = SurfaceCapture::new(surface);
        let buf = cap.capture_frame(4, 3).unwrap();
        assert_eq!(buf.size(), (4, 3));
        // A flat color stays flat after resampling.
        assert_eq!(buf.pixel(3, 2), [10, 20, 30, 255]);
    }

    #[test]
    fn oversized_backing_store_copies_only_the_frame() {
        let frame = RgbaImage::from_raw(2, 2, vec![7; 20]).unwrap();
        let surface = StillSurface { state: ReadyState::HaveCurrentData, frame, reads: 0 };
        let mut cap = SurfaceCapture::new(surface);
        let buf = cap.capture_frame(2, 2).unwrap();
        assert_eq!(buf.as_bytes(), &[7u8; 16][..]);
    }

    #[test]
    fn short_sample_slice_is_a_source_error() {
        let mut buf = PixelBuffer::new(2, 2);
        let err = copy_samples(&mut buf, &[1; 12]).unwrap_err();
        assert!(matches!(err, CaptureError::Source(_)));
        assert_eq!(buf.as_bytes(), &[0u8; 16][..]);
    }

    #[test]
    fn not_ready_surface_is_not_read() {
        let surface = StillSurface::new(ReadyState::HaveNothing, 2, 2, [1, 1, 1, 1]);
        let mut cap = SurfaceCapture::new(surface);
        assert_eq!(cap.capture_frame(2, 2), Err(CaptureError::NotReady));
        assert_eq!(cap.surface().reads, 0);
    }

    #[test]
    fn restricted_surface_is_reported() {
        let surface = StillSurface::new(ReadyState::Restricted, 2, 2, [1, 1, 1, 1]);
        let mut cap = SurfaceCapture::new(surface);
        assert!(matches!(cap.capture_frame(2, 2), Err(CaptureError::Restricted(_))));
    }
}
