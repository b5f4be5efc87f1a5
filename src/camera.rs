// Webcam as a playback surface. Each capture pulls one fresh frame from the
// stream, so the window shows the camera live with the effect on top.

use crate::capture::{PlaybackSurface, ReadyState};
use crate::error::CaptureError;

// Bring in nokhwa types for camera control.
use nokhwa::{
    Camera,
    pixel_format::RgbFormat,
    utils::{
        CameraFormat, CameraIndex, FrameFormat, RequestedFormat, RequestedFormatType, Resolution,
    },
};

use image::RgbaImage;
use log::info;

// A small wrapper around nokhwa::Camera so the pipeline only sees RGBA frames.
pub struct CameraSurface {
    cam: Camera,
    width: u32,
    height: u32,
    latest: RgbaImage,
}

impl CameraSurface {
    /// Open camera `index` near the requested resolution (the driver may pick another).
    /// On success the stream is running but nothing has been read yet.
    pub fn open(index: u32, width: u32, height: u32) -> Result<Self, CaptureError> {
        let fmt = CameraFormat::new(
            Resolution::new(width, height),
            FrameFormat::YUYV, // uncompressed; cheap to convert to RGB
            30,
        );
        let req = RequestedFormat::new::<RgbFormat>(RequestedFormatType::Closest(fmt));

        let mut cam = Camera::new(CameraIndex::Index(index), req)
            .map_err(|e| CaptureError::Source(format!("create camera: {e}")))?;
        cam.open_stream()
            .map_err(|e| CaptureError::Source(format!("open stream: {e}")))?;

        // The actual stream might choose a slightly different resolution.
        let actual = cam.resolution();
        info!("camera {index} streaming at {}x{}", actual.width(), actual.height());

        Ok(Self {
            cam,
            width: actual.width(),
            height: actual.height(),
            latest: RgbaImage::new(actual.width(), actual.height()),
        })
    }
}

impl PlaybackSurface for CameraSurface {
    fn ready_state(&self) -> ReadyState {
        if self.cam.is_stream_open() {
            ReadyState::HaveCurrentData
        } else {
            ReadyState::HaveNothing
        }
    }

    fn intrinsic_size(&self) -> Option<(u32, u32)> {
        Some((self.width, self.height))
    }

    /// Blocks until the camera delivers the next frame.
    fn current_frame(&mut self) -> Result<&RgbaImage, CaptureError> {
        let frame = self
            .cam
            .frame()
            .map_err(|e| CaptureError::Source(format!("fetch frame: {e}")))?;
        let rgb = frame
            .decode_image::<RgbFormat>()
            .map_err(|e| CaptureError::Source(format!("decode rgb: {e}")))?;

        // Repack RGB -> RGBA (opaque) into the frame we hand out.
        let (w, h) = rgb.dimensions();
        if self.latest.dimensions() != (w, h) {
            self.latest = RgbaImage::new(w, h);
            self.width = w;
            self.height = h;
        }
        for (dst, src) in self.latest.chunks_exact_mut(4).zip(rgb.as_raw().chunks_exact(3)) {
            dst[..3].copy_from_slice(src);
            dst[3] = 255;
        }
        Ok(&self.latest)
    }
}
