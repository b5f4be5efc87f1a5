// What you SEE:
// • The first clip (or your webcam) plays in a window with the chosen effect on top.
// • 1..5 switch effect: normal, green, magenta, old paper, cold.
// • Space pauses, Left/Right scrub a frame (effects keep running while paused).
// • N / P jump to the next / previous clip, Delete drops the current one.
// • S sorts the playlist shortest clip first. ESC quits.
// • With no clips on the command line, last run's playlist comes back.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use anyhow::{Context as _, bail};
use clap::Parser;
use log::{debug, info, warn};
use minifb::Key;

use fxplayer::capture::{FrameSource, SurfaceCapture};
use fxplayer::config::Args;
use fxplayer::draw::Drawer;
use fxplayer::effects::Effect;
use fxplayer::pipeline::{EffectPipeline, TickOutcome};
use fxplayer::scheduler::RefreshQueue;
use fxplayer::sequence::ImageSequence;
use fxplayer::session::{Session, Settings};

type Pipeline<S> = EffectPipeline<S, Drawer, RefreshQueue>;

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    /* --- Settings ---
       Visual: the effect you had last time is back, unless --effect says otherwise. */
    let settings_path = args.settings_path();
    let settings = Settings::load(&settings_path).unwrap_or_else(|e| {
        warn!("could not read {}: {e}", settings_path.display());
        Settings::default()
    });
    let initial = args.effect.or_else(|| settings.effect()).unwrap_or_default();
    let playlist = if args.media.is_empty() {
        settings.playlist.clone()
    } else {
        args.media.clone()
    };
    let mut session = Session::new(playlist, settings);
    if args.camera.is_none() {
        info!("playlist has {} entries", session.playlist().len());
    }

    /* --- Window ---
       Visual: a black window of the output size opens. */
    let drawer = Drawer::new("fxplayer", args.width, args.height, args.fps as usize)
        .context("opening window")?;

    let effect = match args.camera {
        Some(index) => run_camera(index, &args, drawer, initial)?,
        None => run_playlist(&args, &mut session, drawer, initial)?,
    };

    session.settings.current_effect = effect.to_string();
    if args.camera.is_none() {
        session.remember_playlist();
    }
    session
        .settings
        .save(&settings_path)
        .with_context(|| format!("saving {}", settings_path.display()))?;
    Ok(())
}

#[cfg(feature = "camera")]
fn run_camera(index: u32, args: &Args, drawer: Drawer, initial: Effect) -> anyhow::Result<Effect> {
    use fxplayer::camera::CameraSurface;

    let cam = CameraSurface::open(index, args.width as u32, args.height as u32)
        .context("opening camera")?;
    let mut pipeline = EffectPipeline::new(SurfaceCapture::new(cam), drawer, RefreshQueue::new());
    pipeline.set_effect(initial);
    pipeline.start();

    let mut fps = FpsCounter::new();
    let mut title = String::new();
    while pipeline.output().is_open() && !pipeline.output().esc_pressed() {
        effect_keys(&mut pipeline);
        set_title(&mut pipeline, &mut title, &format!("camera {index}"));
        refresh(&mut pipeline, &mut fps);
    }

    pipeline.stop();
    Ok(pipeline.current_effect())
}

#[cfg(not(feature = "camera"))]
fn run_camera(_index: u32, _args: &Args, _drawer: Drawer, _initial: Effect) -> anyhow::Result<Effect> {
    bail!("built without the `camera` feature")
}

fn run_playlist(
    args: &Args,
    session: &mut Session,
    drawer: Drawer,
    initial: Effect,
) -> anyhow::Result<Effect> {
    let Some(first) = session.current() else {
        bail!("nothing to play: pass clip paths or --camera N");
    };
    let hold = args.still_hold_ticks();
    let clip = open_clip(first, hold);
    let mut pipeline = EffectPipeline::new(SurfaceCapture::new(clip), drawer, RefreshQueue::new());
    pipeline.set_effect(initial);
    pipeline.start();

    let mut fps = FpsCounter::new();
    let mut title = String::new();

    /* ------------------------------ Main loop ------------------------------ */
    while pipeline.output().is_open() && !pipeline.output().esc_pressed() {
        /* 1) Inputs: effect keys go to the pipeline, transport to the clip. */
        effect_keys(&mut pipeline);

        let keys = pipeline.output();
        let toggle = keys.pressed_once(Key::Space);
        let back = keys.pressed_repeat(Key::Left);
        let fwd = keys.pressed_repeat(Key::Right);
        let next = keys.pressed_once(Key::N);
        let prev = keys.pressed_once(Key::P);
        let delete = keys.pressed_once(Key::Delete);
        let sort = keys.pressed_once(Key::S);

        let clip = pipeline.source_mut().surface_mut();
        if toggle {
            clip.set_playing(!clip.is_playing());
        }
        if back {
            clip.step(-1); // visual: one frame back, still filtered
        }
        if fwd {
            clip.step(1);
        }

        let mut switch_to: Option<PathBuf> = None;
        if next {
            switch_to = session.next().map(Path::to_path_buf);
        } else if prev {
            switch_to = session.previous().map(Path::to_path_buf);
        } else if delete {
            match session.remove_current() {
                Ok(Some(path)) => switch_to = Some(path.to_path_buf()),
                Ok(None) => {
                    info!("playlist is empty");
                    break;
                }
                Err(e) => warn!("{e}"),
            }
            save_playlist(session, &args.settings_path());
        } else if sort {
            session.sort_by_key(|path| clip_duration(path, args));
            info!("playlist sorted by duration");
        }

        /* 2) Render whatever is due this refresh. */
        let clip = pipeline.source().surface();
        let name = if clip.is_playing() {
            clip.name().to_string()
        } else {
            format!("{} (paused)", clip.name())
        };
        set_title(&mut pipeline, &mut title, &name);
        refresh(&mut pipeline, &mut fps);

        /* 3) Playback moves on; at the end of a clip the next one starts. */
        if switch_to.is_none() && pipeline.source_mut().surface_mut().advance() {
            switch_to = session.next().map(Path::to_path_buf);
        }
        if let Some(path) = switch_to {
            let old = pipeline.source_mut().replace(open_clip(&path, hold));
            debug!("left {} at frame {}", old.name(), old.position());
        }
    }

    pipeline.stop();
    Ok(pipeline.current_effect())
}

/// Clips that can't be opened become empty sequences: the window just shows
/// nothing new until you move on.
fn open_clip(path: &Path, still_hold: u32) -> ImageSequence {
    match ImageSequence::open(path) {
        Ok(clip) if path.is_file() => clip.with_hold(still_hold),
        Ok(clip) => clip,
        Err(e) => {
            warn!("cannot open {}: {e}", path.display());
            ImageSequence::from_frames(path.display().to_string(), Vec::new())
        }
    }
}

/// How long a playlist entry plays: stills are held, clips run at the output rate.
fn clip_duration(path: &Path, args: &Args) -> Duration {
    if path.is_file() {
        return Duration::from_secs(args.still_secs.into());
    }
    let frames = ImageSequence::open(path).map(|clip| clip.len()).unwrap_or(0);
    Duration::from_secs_f64(frames as f64 / f64::from(args.fps))
}

/// Write the playlist out right away so a crash doesn't bring deleted clips back.
fn save_playlist(session: &mut Session, settings_path: &Path) {
    session.remember_playlist();
    if let Err(e) = session.settings.save(settings_path) {
        warn!("could not save {}: {e}", settings_path.display());
    }
}

fn effect_keys<S: FrameSource>(pipeline: &mut Pipeline<S>) {
    if let Some(i) = pipeline.output().effect_key() {
        pipeline.set_effect(Effect::ALL[i]);
    }
}

/// Visual: title bar reads "fxplayer · <clip> · <effect>".
fn set_title<S: FrameSource>(pipeline: &mut Pipeline<S>, current: &mut String, what: &str) {
    let title = format!("fxplayer · {what} · {}", pipeline.current_effect());
    if *current != title {
        pipeline.output_mut().set_title(&title);
        *current = title;
    }
}

/// One display refresh. When nothing was drawn the window still has to
/// process input and wait for vsync.
fn refresh<S: FrameSource>(pipeline: &mut Pipeline<S>, fps: &mut FpsCounter) {
    match pipeline.on_refresh() {
        Some(TickOutcome::Presented(_)) => fps.frame(),
        _ => pipeline.output_mut().pump(),
    }
}

/// Frames per second, logged once a second at debug level.
struct FpsCounter {
    since: Instant,
    frames: u32,
}

impl FpsCounter {
    fn new() -> Self {
        Self { since: Instant::now(), frames: 0 }
    }

    fn frame(&mut self) {
        self.frames += 1;
        let elapsed = self.since.elapsed();
        if elapsed >= Duration::from_secs(1) {
            debug!("FPS: {:.1}", self.frames as f32 / elapsed.as_secs_f32());
            self.frames = 0;
            self.since = Instant::now();
        }
    }
}
