// The render loop: once per display refresh, grab the frame the player is
// showing, run the selected effect over it, and push it to the window.
// Visual: what you see in the window is always "live frame + current effect".
//
// Only one refresh callback is ever pending. Switching effects cancels it and
// asks for a fresh one, so repeated switches can't pile up overlapping loops.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};

use log::{debug, info, warn};
use rand::SeedableRng;
use rand::rngs::StdRng;

use crate::capture::FrameSource;
use crate::effects::Effect;
use crate::error::{CaptureError, PresentError, UnknownEffectError};
use crate::scheduler::{RefreshQueue, RefreshScheduler, TickHandle};
use crate::types::PixelBuffer;

/// Where finished frames go (the window, or a recorder in tests).
pub trait OutputSurface {
    /// Output resolution; the capture is scaled to this.
    fn size(&self) -> (usize, usize);

    fn commit(&mut self, frame: &PixelBuffer) -> Result<(), PresentError>;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PipelineState {
    Idle,
    Running,
}

/// What one fired callback did.
#[derive(Debug, PartialEq)]
pub enum TickOutcome {
    /// Frame captured, filtered with this effect and committed.
    Presented(Effect),
    /// No frame this time; the old one stays on screen.
    Skipped(CaptureError),
    /// Frame was filtered but the window refused it.
    CommitFailed(PresentError),
    /// The frame blew up half way (a source or output panicked). Counted as skipped.
    Panicked(String),
    /// Handle was cancelled or the pipeline is idle; nothing ran.
    Stale,
}

pub struct EffectPipeline<S, O, R> {
    source: S,
    output: O,
    scheduler: R,
    state: PipelineState,
    effect: Effect,
    pending: Option<TickHandle>,
    buffer: PixelBuffer, // reused every tick, only reshaped when the output size changes
    rng: StdRng,
    presented: u64,
    skipped: u64,
    failing_streak: u64,
}

impl<S, O, R> EffectPipeline<S, O, R>
where
    S: FrameSource,
    O: OutputSurface,
    R: RefreshScheduler,
{
    /// Build an idle pipeline. Nothing renders until [`EffectPipeline::start`].
    pub fn new(source: S, output: O, scheduler: R) -> Self {
        let (w, h) = output.size();
        Self {
            source,
            output,
            scheduler,
            state: PipelineState::Idle,
            effect: Effect::Identity,
            pending: None,
            buffer: PixelBuffer::new(w, h),
            rng: StdRng::from_entropy(),
            presented: 0,
            skipped: 0,
            failing_streak: 0,
        }
    }

    /// Fixed noise seed, so old paper grain is reproducible.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    /// Idle -> Running and ask for the first frame. No-op if already running.
    pub fn start(&mut self) {
        if self.state == PipelineState::Running {
            return;
        }
        self.state = PipelineState::Running;
        self.reschedule();
        info!("render loop started ({})", self.effect);
    }

    /// Running -> Idle and drop the pending callback.
    pub fn stop(&mut self) {
        if self.state == PipelineState::Idle {
            return;
        }
        self.state = PipelineState::Idle;
        if let Some(handle) = self.pending.take() {
            self.scheduler.cancel(handle);
        }
        info!(
            "render loop stopped after {} frames ({} skipped)",
            self.presented, self.skipped
        );
    }

    /// Select by name. Unknown names are rejected and the current effect stays.
    pub fn select_effect(&mut self, name: &str) -> Result<Effect, UnknownEffectError> {
        let effect = name.parse::<Effect>().map_err(|e| {
            warn!("{e}; keeping {}", self.effect);
            e
        })?;
        self.set_effect(effect);
        Ok(effect)
    }

    /// Takes effect on the next frame, never on one already being drawn.
    pub fn set_effect(&mut self, effect: Effect) {
        if effect != self.effect {
            info!("effect: {} -> {}", self.effect, effect);
        }
        self.effect = effect;
        if self.state == PipelineState::Running {
            self.reschedule();
        }
    }

    /// Canonical name of the active effect, for saving settings.
    pub fn current_effect(&self) -> Effect {
        self.effect
    }

    pub fn state(&self) -> PipelineState {
        self.state
    }

    /// The one callback currently waiting to fire, if any.
    pub fn pending(&self) -> Option<TickHandle> {
        self.pending
    }

    /// Frames committed so far.
    pub fn presented(&self) -> u64 {
        self.presented
    }

    /// Ticks that had no frame to show.
    pub fn skipped(&self) -> u64 {
        self.skipped
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn source_mut(&mut self) -> &mut S {
        &mut self.source
    }

    pub fn output(&self) -> &O {
        &self.output
    }

    pub fn output_mut(&mut self) -> &mut O {
        &mut self.output
    }

    pub fn scheduler(&self) -> &R {
        &self.scheduler
    }

    pub fn scheduler_mut(&mut self) -> &mut R {
        &mut self.scheduler
    }

    /// Called by the host when a scheduled refresh fires.
    /// Stale handles are ignored. Otherwise one frame is rendered and the next
    /// one is scheduled, whatever happened to this one.
    pub fn fire(&mut self, handle: TickHandle) -> TickOutcome {
        if self.state != PipelineState::Running || self.pending != Some(handle) {
            debug!("ignoring stale tick {}", handle.id());
            return TickOutcome::Stale;
        }
        self.pending = None;

        // A panic in a source or output must not take the loop with it.
        let outcome = match panic::catch_unwind(AssertUnwindSafe(|| self.render_once())) {
            Ok(outcome) => outcome,
            Err(payload) => {
                let msg = panic_message(payload.as_ref());
                self.skipped += 1;
                self.failing_streak += 1;
                warn!("frame render panicked, skipping: {msg}");
                TickOutcome::Panicked(msg)
            }
        };
        self.reschedule();
        outcome
    }

    /// Capture -> effect -> commit. Runs to completion; never returns early
    /// with a half-filtered buffer on screen.
    fn render_once(&mut self) -> TickOutcome {
        // Effect is read once, so a frame is never a mix of two effects.
        let effect = self.effect;

        /* 1) Match the buffer to the window (reallocates only on resize). */
        let (w, h) = self.output.size();
        if self.buffer.size() != (w, h) {
            debug!("output resized to {w}x{h}");
            self.buffer.reshape(w, h);
        }

        /* 2) Pull the frame the player is showing right now. */
        if let Err(e) = self.source.capture_into(&mut self.buffer) {
            self.skipped += 1;
            self.failing_streak += 1;
            if self.failing_streak == 1 {
                warn!("capture failed, skipping frame: {e}");
            } else {
                debug!("capture still failing ({}): {e}", self.failing_streak);
            }
            return TickOutcome::Skipped(e);
        }
        if self.failing_streak > 0 {
            info!("capture recovered after {} skipped frames", self.failing_streak);
            self.failing_streak = 0;
        }

        /* 3) Filter in place. */
        effect.apply(self.buffer.as_bytes_mut(), &mut self.rng);

        /* 4) Show it. */
        match self.output.commit(&self.buffer) {
            Ok(()) => {
                self.presented += 1;
                TickOutcome::Presented(effect)
            }
            Err(e) => {
                warn!("commit failed: {e}");
                TickOutcome::CommitFailed(e)
            }
        }
    }

    /// Cancel whatever is pending, then ask for exactly one new callback.
    fn reschedule(&mut self) {
        if let Some(old) = self.pending.take() {
            debug!("cancelling tick {}", old.id());
            self.scheduler.cancel(old);
        }
        self.pending = Some(self.scheduler.schedule());
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

impl<S, O> EffectPipeline<S, O, RefreshQueue>
where
    S: FrameSource,
    O: OutputSurface,
{
    /// One display refresh: fire everything that was due. Returns the outcome
    /// of the live handle, if one fired.
    pub fn on_refresh(&mut self) -> Option<TickOutcome> {
        let mut live = None;
        for handle in self.scheduler.take_due() {
            match self.fire(handle) {
                TickOutcome::Stale => {}
                outcome => live = Some(outcome),
            }
        }
        live
    }
}
