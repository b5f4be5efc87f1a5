// Color effects applied to one RGBA frame in place.
// Visual outcomes:
// - green / magenta / cold tints: the whole picture leans toward that color.
// - old paper: sepia wash plus a little grain that changes every frame.
// Each pixel is handled on its own; alpha is never touched.

use std::fmt;
use std::str::FromStr;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::UnknownEffectError;

/// Grain amplitude for old paper: noise is drawn from [-12.5, 12.5).
const PAPER_NOISE: f64 = 12.5;

/// Which transform the pipeline runs on the next frame.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Effect {
    #[default]
    #[serde(alias = "normal")]
    Identity,
    GreenTint,
    MagentaTint,
    OldPaper,
    #[serde(alias = "colder_tint")]
    ColdTint,
}

impl Effect {
    /// In keyboard order (1..=5 in the player).
    pub const ALL: [Effect; 5] = [
        Effect::Identity,
        Effect::GreenTint,
        Effect::MagentaTint,
        Effect::OldPaper,
        Effect::ColdTint,
    ];

    /// Canonical name, used for settings and the window title.
    pub fn as_str(self) -> &'static str {
        match self {
            Effect::Identity => "identity",
            Effect::GreenTint => "green_tint",
            Effect::MagentaTint => "magenta_tint",
            Effect::OldPaper => "old_paper",
            Effect::ColdTint => "cold_tint",
        }
    }

    /// Run this effect over `data` (RGBA samples).
    /// `rng` is only consulted by old paper.
    pub fn apply<R: Rng + ?Sized>(self, data: &mut [u8], rng: &mut R) {
        match self {
            Effect::Identity => {}
            Effect::GreenTint => green_tint(data),
            Effect::MagentaTint => magenta_tint(data),
            Effect::OldPaper => old_paper(data, rng),
            Effect::ColdTint => cold_tint(data),
        }
    }
}

impl fmt::Display for Effect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Effect {
    type Err = UnknownEffectError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "identity" | "normal" => Ok(Effect::Identity),
            "green_tint" => Ok(Effect::GreenTint),
            "magenta_tint" => Ok(Effect::MagentaTint),
            "old_paper" => Ok(Effect::OldPaper),
            "cold_tint" | "colder_tint" => Ok(Effect::ColdTint),
            other => Err(UnknownEffectError(other.to_string())),
        }
    }
}

/// Clamp to [0,255] and truncate. Every channel write goes through here.
#[inline]
fn to_sample(v: f64) -> u8 {
    v.clamp(0.0, 255.0) as u8
}

/// Multiply R, G, B by fixed gains.
#[inline]
fn scale_rgb(data: &mut [u8], gains: [f64; 3]) {
    for px in data.chunks_exact_mut(4) {
        px[0] = to_sample(px[0] as f64 * gains[0]);
        px[1] = to_sample(px[1] as f64 * gains[1]);
        px[2] = to_sample(px[2] as f64 * gains[2]);
    }
}

/// Visual: greens pop, reds and blues dim.
pub fn green_tint(data: &mut [u8]) {
    scale_rgb(data, [0.8, 1.2, 0.8]);
}

/// Visual: pink/purple cast; greens fade.
pub fn magenta_tint(data: &mut [u8]) {
    scale_rgb(data, [1.2, 0.8, 1.2]);
}

/// Visual: bluish, slightly wintery picture.
pub fn cold_tint(data: &mut [u8]) {
    scale_rgb(data, [0.8, 0.9, 1.2]);
}

/// Sepia from the pixel's own gray level, then one grain sample added to all three channels.
/// Visual: warm brown photo with a faint flicker of noise.
pub fn old_paper<R: Rng + ?Sized>(data: &mut [u8], rng: &mut R) {
    sepia_with_grain(data, || rng.gen_range(-PAPER_NOISE..PAPER_NOISE));
}

fn sepia_with_grain(data: &mut [u8], mut grain: impl FnMut() -> f64) {
    for px in data.chunks_exact_mut(4) {
        let avg = (px[0] as f64 + px[1] as f64 + px[2] as f64) / 3.0;
        let noise = grain();
        px[0] = to_sample((avg + 50.0).min(255.0) + noise);
        px[1] = to_sample((avg + 35.0).min(255.0) + noise);
        px[2] = to_sample(avg.min(255.0) + noise);
    }
}
