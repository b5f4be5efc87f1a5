//! Clip / webcam player with live per-pixel color effects.
//!
//! The interesting part is [`pipeline::EffectPipeline`]: once per display
//! refresh it captures the frame the player is showing, filters it with the
//! selected [`effects::Effect`] and commits it to the window. Everything else
//! (window, clips on disk, webcam, playlist) plugs into it through the traits
//! in [`capture`], [`pipeline`] and [`scheduler`].

#[cfg(feature = "camera")]
pub mod camera;
pub mod capture;
pub mod config;
pub mod draw;
pub mod effects;
pub mod error;
pub mod pipeline;
pub mod scheduler;
pub mod sequence;
pub mod session;
pub mod types;
