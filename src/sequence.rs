// A clip on disk: either a directory of numbered frames or a single still.
// Frames are decoded lazily, one at a time, so scrubbing a long clip doesn't
// hold the whole thing in memory. Visual: the window shows whichever frame the
// playhead is on, paused or not.

use std::io;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use image::{ImageError, ImageFormat, RgbaImage};
use log::{debug, warn};

use crate::capture::{PlaybackSurface, ReadyState};
use crate::error::CaptureError;

pub struct ImageSequence {
    name: String,
    frames: Vec<PathBuf>,
    position: usize,
    size: Option<(u32, u32)>,
    cached: Option<(usize, RgbaImage)>,
    restricted: Option<(usize, Instant)>, // position we may not read, and when we found out
    retry_after: Duration,
    playing: bool,
    hold: u32, // advance() calls per frame
    held: u32,
}

impl ImageSequence {
    /// Open a directory (every decodable image in it, sorted by file name) or a single image.
    /// Nothing is decoded yet; only headers are probed for the frame size.
    pub fn open(path: &Path) -> io::Result<Self> {
        let frames = if path.is_dir() {
            let mut frames: Vec<PathBuf> = std::fs::read_dir(path)?
                .filter_map(|entry| entry.ok().map(|e| e.path()))
                .filter(|p| p.is_file() && ImageFormat::from_path(p).is_ok())
                .collect();
            frames.sort();
            frames
        } else {
            vec![path.to_path_buf()]
        };
        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        debug!("opened {name}: {} frames", frames.len());
        Ok(Self::from_frames(name, frames))
    }

    /// Build from an explicit frame list.
    pub fn from_frames(name: impl Into<String>, frames: Vec<PathBuf>) -> Self {
        let size = frames.iter().find_map(|p| image::image_dimensions(p).ok());
        if size.is_none() && !frames.is_empty() {
            warn!("no readable frame headers in clip; it will never become ready");
        }
        Self {
            name: name.into(),
            frames,
            position: 0,
            size,
            cached: None,
            restricted: None,
            retry_after: Duration::from_secs(1),
            playing: true,
            hold: 1,
            held: 0,
        }
    }

    /// Show each frame for `ticks` calls to [`ImageSequence::advance`] (stills use this).
    pub fn with_hold(mut self, ticks: u32) -> Self {
        self.hold = ticks.max(1);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn position(&self) -> usize {
        self.position
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    pub fn set_playing(&mut self, playing: bool) {
        self.playing = playing;
    }

    /// How long a restricted frame is reported as such before we try reading it again.
    pub fn with_restricted_retry(mut self, retry_after: Duration) -> Self {
        self.retry_after = retry_after;
        self
    }

    /// Jump to a frame, clamped into the clip.
    pub fn seek(&mut self, frame: usize) {
        let target = frame.min(self.frames.len().saturating_sub(1));
        if target != self.position {
            self.position = target;
            self.held = 0;
            self.restricted = None;
        }
    }

    /// Scrub by `delta` frames (negative = back).
    pub fn step(&mut self, delta: isize) {
        let target = self.position.saturating_add_signed(delta);
        self.seek(target);
    }

    /// One playback tick. Returns true when the clip has ended (playhead stays on the last frame).
    pub fn advance(&mut self) -> bool {
        if !self.playing || self.frames.is_empty() {
            return false;
        }
        self.held += 1;
        if self.held < self.hold {
            return false;
        }
        if self.position + 1 >= self.frames.len() {
            return true;
        }
        self.seek(self.position + 1);
        false
    }

    fn decode(&mut self, index: usize) -> Result<RgbaImage, CaptureError> {
        let path = &self.frames[index];
        match image::open(path) {
            Ok(img) => {
                let img = img.into_rgba8();
                self.size = Some(img.dimensions());
                if self.restricted.is_some_and(|(i, _)| i == index) {
                    debug!("{}: frame {index} readable again", self.name);
                    self.restricted = None;
                }
                Ok(img)
            }
            Err(e) => {
                let err = classify(e);
                if let CaptureError::Restricted(_) = err {
                    self.restricted = Some((index, Instant::now()));
                }
                Err(err)
            }
        }
    }
}

/// Permission problems mean "restricted"; everything else is a plain source error.
fn classify(err: ImageError) -> CaptureError {
    match err {
        ImageError::IoError(e) if e.kind() == io::ErrorKind::PermissionDenied => {
            CaptureError::Restricted(e.to_string())
        }
        other => CaptureError::Source(other.to_string()),
    }
}

impl PlaybackSurface for ImageSequence {
    fn ready_state(&self) -> ReadyState {
        if self.frames.is_empty() {
            ReadyState::HaveNothing
        } else if self
            .restricted
            .is_some_and(|(i, since)| i == self.position && since.elapsed() < self.retry_after)
        {
            ReadyState::Restricted
        } else {
            ReadyState::HaveCurrentData
        }
    }

    fn intrinsic_size(&self) -> Option<(u32, u32)> {
        self.size
    }

    fn current_frame(&mut self) -> Result<&RgbaImage, CaptureError> {
        if self.frames.is_empty() {
            return Err(CaptureError::NotReady);
        }
        let position = self.position;
        if self.cached.as_ref().map(|(i, _)| *i) != Some(position) {
            let img = self.decode(position)?;
            self.cached = Some((position, img));
        }
        match &self.cached {
            Some((_, img)) => Ok(img),
            None => Err(CaptureError::NotReady),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::{FrameSource, SurfaceCapture};
    use image::Rgba;

    /// Writes `count` 4x2 PNGs, frame i filled with gray level i*10.
    fn write_clip(dir: &Path, count: u8) {
        for i in 0..count {
            let img = RgbaImage::from_pixel(4, 2, Rgba([i * 10, i * 10, i * 10, 255]));
            img.save(dir.join(format!("frame_{i:03}.png"))).unwrap();
        }
    }

    #[test]
    fn opens_directory_in_name_order() {
        let dir = tempfile::tempdir().unwrap();
        write_clip(dir.path(), 3);
        std::fs::write(dir.path().join("notes.txt"), "not a frame").unwrap();

        let mut clip = ImageSequence::open(dir.path()).unwrap();
        assert_eq!(clip.len(), 3);
        assert_eq!(clip.intrinsic_size(), Some((4, 2)));
        assert_eq!(clip.ready_state(), ReadyState::HaveCurrentData);

        clip.seek(2);
        let frame = clip.current_frame().unwrap();
        assert_eq!(frame.get_pixel(0, 0), &Rgba([20, 20, 20, 255]));
    }

    #[test]
    fn empty_clip_is_not_ready() {
        let dir = tempfile::tempdir().unwrap();
        let clip = ImageSequence::open(dir.path()).unwrap();
        assert!(clip.is_empty());
        assert_eq!(clip.ready_state(), ReadyState::HaveNothing);

        let mut cap = SurfaceCapture::new(clip);
        assert_eq!(cap.capture_frame(4, 2), Err(CaptureError::NotReady));
    }

    #[test]
    fn scrubbing_clamps_and_capture_follows() {
        let dir = tempfile::tempdir().unwrap();
        write_clip(dir.path(), 3);
        let mut cap = SurfaceCapture::new(ImageSequence::open(dir.path()).unwrap());

        cap.surface_mut().step(-5);
        assert_eq!(cap.surface().position(), 0);
        cap.surface_mut().step(10);
        assert_eq!(cap.surface().position(), 2);
        cap.surface_mut().step(-1);

        let buf = cap.capture_frame(4, 2).unwrap();
        assert_eq!(buf.pixel(3, 1), [10, 10, 10, 255]);
    }

    #[test]
    fn advance_reports_the_end() {
        let dir = tempfile::tempdir().unwrap();
        write_clip(dir.path(), 2);
        let mut clip = ImageSequence::open(dir.path()).unwrap();
        assert!(!clip.advance());
        assert_eq!(clip.position(), 1);
        assert!(clip.advance());
        assert_eq!(clip.position(), 1);

        clip.seek(0);
        clip.set_playing(false);
        assert!(!clip.advance());
        assert_eq!(clip.position(), 0);
    }

    #[test]
    fn stills_hold_for_several_ticks() {
        let dir = tempfile::tempdir().unwrap();
        write_clip(dir.path(), 1);
        let mut clip = ImageSequence::open(&dir.path().join("frame_000.png"))
            .unwrap()
            .with_hold(3);
        assert_eq!(clip.name(), "frame_000");
        assert!(!clip.advance());
        assert!(!clip.advance());
        assert!(clip.advance());
    }

    #[test]
    fn unreadable_frame_is_a_source_error() {
        let dir = tempfile::tempdir().unwrap();
        write_clip(dir.path(), 1);
        let bogus = dir.path().join("frame_001.png");
        std::fs::write(&bogus, b"definitely not png").unwrap();

        let mut clip = ImageSequence::open(dir.path()).unwrap();
        clip.seek(1);
        assert!(matches!(clip.current_frame(), Err(CaptureError::Source(_))));
        assert_eq!(clip.ready_state(), ReadyState::HaveCurrentData);
    }

    #[test]
    fn restricted_frame_is_retried_and_recovers() {
        let dir = tempfile::tempdir().unwrap();
        write_clip(dir.path(), 2);

        let mut clip = ImageSequence::open(dir.path()).unwrap();
        clip.restricted = Some((0, Instant::now()));
        assert_eq!(clip.ready_state(), ReadyState::Restricted);

        // Once the retry window has passed, a paused clip reads the file again.
        let mut clip = ImageSequence::open(dir.path())
            .unwrap()
            .with_restricted_retry(Duration::ZERO);
        clip.set_playing(false);
        clip.restricted = Some((0, Instant::now()));
        assert_eq!(clip.ready_state(), ReadyState::HaveCurrentData);

        let mut cap = SurfaceCapture::new(clip);
        let buf = cap.capture_frame(4, 2).unwrap();
        assert_eq!(buf.pixel(0, 0), [0, 0, 0, 255]);
        assert!(cap.surface().restricted.is_none());
        assert!(!cap.surface().is_playing());
    }

    #[test]
    fn permission_denied_maps_to_restricted() {
        let err = ImageError::IoError(io::Error::from(io::ErrorKind::PermissionDenied));
        assert!(matches!(classify(err), CaptureError::Restricted(_)));
        let err = ImageError::IoError(io::Error::from(io::ErrorKind::NotFound));
        assert!(matches!(classify(err), CaptureError::Source(_)));
    }
}
