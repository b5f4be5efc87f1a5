use std::path::PathBuf;

use clap::Parser;

use crate::effects::Effect;

#[derive(Parser, Debug)]
#[command(name = "fxplayer", version, about = "Clip / webcam player with live color effects")]
pub struct Args {
    /// Clips to play, in order. Each is an image or a directory of frames.
    pub media: Vec<PathBuf>,

    /// Show webcam N instead of clips.
    #[arg(long, conflicts_with = "media")]
    pub camera: Option<u32>,

    /// Output width in pixels.
    #[arg(long, default_value_t = 640)]
    pub width: usize,

    /// Output height in pixels.
    #[arg(long, default_value_t = 360)]
    pub height: usize,

    /// Clip frame rate and window refresh target.
    #[arg(long, default_value_t = 30, value_parser = clap::value_parser!(u32).range(1..))]
    pub fps: u32,

    /// Seconds a single still image stays up before the next clip.
    #[arg(long, default_value_t = 5)]
    pub still_secs: u32,

    /// Start with this effect (overrides the saved one).
    #[arg(long)]
    pub effect: Option<Effect>,

    /// Settings file. Defaults to <config dir>/fxplayer/settings.json.
    #[arg(long)]
    pub settings: Option<PathBuf>,
}

impl Args {
    pub fn settings_path(&self) -> PathBuf {
        self.settings.clone().unwrap_or_else(|| {
            dirs::config_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("fxplayer")
                .join("settings.json")
        })
    }

    /// advance() calls a still stays on screen.
    pub fn still_hold_ticks(&self) -> u32 {
        self.still_secs.saturating_mul(self.fps).max(1)
    }
}
