// Window + keyboard input. The window is the output surface the pipeline
// commits filtered frames to; it also paces the loop (one update per refresh).

use crate::error::PresentError;
use crate::pipeline::OutputSurface;
use crate::types::PixelBuffer;
use minifb::{Key, KeyRepeat, Window, WindowOptions};

pub struct Drawer {
    window: Window,
    width: usize,
    height: usize,
    packed: Vec<u32>, // 0x00RRGGBB scratch, reused every frame
}

impl Drawer {
    /// Create a window of the output size, refreshing at most `fps` times a second.
    /// Visual: a new black window appears with your chosen title.
    pub fn new(title: &str, width: usize, height: usize, fps: usize) -> Result<Self, PresentError> {
        let mut window = Window::new(title, width, height, WindowOptions::default())
            .map_err(|e| PresentError::WindowInit(e.to_string()))?;
        window.set_target_fps(fps);
        Ok(Self { window, width, height, packed: Vec::with_capacity(width * height) })
    }

    /// Returns false when the user closes the window (so we can stop the loop).
    pub fn is_open(&self) -> bool {
        self.window.is_open()
    }

    pub fn set_title(&mut self, title: &str) {
        self.window.set_title(title);
    }

    /// Process input and wait for the next refresh without drawing.
    /// Used on ticks where no frame was committed, so keys still work.
    pub fn pump(&mut self) {
        self.window.update();
    }

    /// True while ESC is held down (we'll exit when this is pressed).
    pub fn esc_pressed(&self) -> bool {
        self.window.is_key_down(Key::Escape)
    }

    pub fn pressed_once(&self, key: Key) -> bool {
        self.window.is_key_pressed(key, KeyRepeat::No)
    }

    /// Like [`Drawer::pressed_once`] but fires again while held (scrubbing).
    pub fn pressed_repeat(&self, key: Key) -> bool {
        self.window.is_key_pressed(key, KeyRepeat::Yes)
    }

    /// Index 0..5 of a number key 1..5 pressed this frame.
    pub fn effect_key(&self) -> Option<usize> {
        [Key::Key1, Key::Key2, Key::Key3, Key::Key4, Key::Key5]
            .iter()
            .position(|k| self.pressed_once(*k))
    }
}

impl OutputSurface for Drawer {
    fn size(&self) -> (usize, usize) {
        (self.width, self.height)
    }

    /// Visual: the window immediately displays the filtered frame.
    fn commit(&mut self, frame: &PixelBuffer) -> Result<(), PresentError> {
        if frame.size() != (self.width, self.height) {
            return Err(PresentError::SizeMismatch {
                got: frame.size(),
                want: (self.width, self.height),
            });
        }
        frame.pack_rgb_into(&mut self.packed);
        self.window
            .update_with_buffer(&self.packed, self.width, self.height)
            .map_err(|e| PresentError::WindowUpdate(e.to_string()))
    }
}
