// Error types for the player. Every variant states *where* things went wrong.
// None of these are allowed to end the render loop; the worst case is a frozen
// or unfiltered frame on screen.
use thiserror::Error;

/// The playback surface could not hand us a frame this tick.
/// Visual: the previous frame stays on screen until the next good capture.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CaptureError {
    /// No frame decoded yet (empty clip, stream not started).
    #[error("frame source not ready")]
    NotReady,

    /// The frame exists but we are not allowed to read its pixels.
    #[error("frame source is restricted: {0}")]
    Restricted(String),

    /// Grabbing or decoding the frame failed.
    #[error("frame source error: {0}")]
    Source(String),
}

/// A name outside the effect list was selected. The active effect stays.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown effect: {0:?}")]
pub struct UnknownEffectError(pub String);

/// Pushing the finished buffer to the output surface failed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PresentError {
    #[error("window init error: {0}")]
    WindowInit(String),

    #[error("window update error: {0}")]
    WindowUpdate(String),

    #[error("buffer is {got:?}, output wants {want:?}")]
    SizeMismatch {
        got: (usize, usize),
        want: (usize, usize),
    },
}

/// Playlist / settings plumbing around the pipeline.
#[derive(Error, Debug)]
pub enum SessionError {
    #[error("playlist is empty")]
    EmptyPlaylist,

    #[error("settings io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("settings json error: {0}")]
    Json(#[from] serde_json::Error),
}
