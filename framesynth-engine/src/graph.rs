//! Frame-synchronous synthesis graph core.
//!
//! This module defines the `Generator` capability every signal source
//! implements and a lightweight `Engine<G>` wrapper that owns a generator and
//! a reusable `Frame`, tracks elapsed time and drains frames for offline
//! rendering.
//!
//! Design goals
//! - One `advance` call per frame; no allocation inside `advance`
//! - Triggers are latched by `notify` and take effect at the next frame boundary
//! - Generic over the generator type, so voices, chains and pools all render
//!   through the same wrapper without trait objects

use framesynth_core::error::{ConfigError, Result};
use framesynth_core::frame::Frame;

/// Lifecycle tag reported by every generator.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Lifecycle {
    /// Not started yet (e.g. a chain before its first frame).
    Pending,
    Active,
    /// Terminal: produces only silence from now on.
    Finished,
}

/// External event token. Delivery time is the next frame boundary.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum Trigger {
    /// Start (or restart) the sound, optionally from a seed amplitude.
    Start { seed: Option<f32> },
    /// Note-off.
    Release,
}

/// Result of advancing one frame.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Advance {
    pub lifecycle: Lifecycle,
    /// Live samples at the front of the frame. Equal to the frame length
    /// unless the generator finished inside this frame.
    pub written: usize,
}

impl Advance {
    #[inline] pub fn active(written: usize) -> Self { Self { lifecycle: Lifecycle::Active, written } }
    #[inline] pub fn finished(written: usize) -> Self { Self { lifecycle: Lifecycle::Finished, written } }
    #[inline] pub fn is_finished(&self) -> bool { self.lifecycle == Lifecycle::Finished }
}

/// Anything that can produce frames of samples.
pub trait Generator {
    /// Fill `out` with the next frame. Queued triggers are applied first.
    /// Samples after `written` are zero.
    fn advance(&mut self, out: &mut [f32]) -> Advance;

    /// Queue an external event; never applied mid-frame.
    fn notify(&mut self, trigger: Trigger);

    /// Most recent scalar output (amplitude for envelopes). Does not mutate.
    fn current_value(&self) -> f32;

    fn lifecycle(&self) -> Lifecycle;

    /// Starting condition handed over by a chain predecessor.
    /// Ignored by generators without one.
    fn seed(&mut self, _value: f32) {}
}

impl<G: Generator + ?Sized> Generator for Box<G> {
    #[inline] fn advance(&mut self, out: &mut [f32]) -> Advance { (**self).advance(out) }
    #[inline] fn notify(&mut self, trigger: Trigger) { (**self).notify(trigger) }
    #[inline] fn current_value(&self) -> f32 { (**self).current_value() }
    #[inline] fn lifecycle(&self) -> Lifecycle { (**self).lifecycle() }
    #[inline] fn seed(&mut self, value: f32) { (**self).seed(value) }
}

/// Offline renderer that owns a generator.
///
/// Call `tick()` once per frame (and read `frame()`), or `render()` to drain
/// the generator into a buffer.
pub struct Engine<G: Generator> {
    sr: f32,
    elapsed: u64,
    frame: Frame,
    gen: G,
}

impl<G: Generator> Engine<G> {
    pub fn new(gen: G, frame_size: usize, sample_rate: f32) -> Result<Self> {
        if !sample_rate.is_finite() || sample_rate <= 0.0 {
            return Err(ConfigError::InvalidSampleRate(sample_rate));
        }
        Ok(Self { sr: sample_rate, elapsed: 0, frame: Frame::new(frame_size)?, gen })
    }

    /// Advance the generator by one frame into the internal frame buffer.
    #[inline]
    pub fn tick(&mut self) -> Advance {
        let adv = self.gen.advance(self.frame.as_mut_slice());
        self.elapsed += self.frame.len() as u64;
        adv
    }

    /// Output of the most recent `tick`.
    #[inline] pub fn frame(&self) -> &Frame { &self.frame }

    /// Drain frames until the generator is Finished or `budget` samples exist.
    ///
    /// Only the live part of the final frame is kept, and the result is
    /// truncated to the budget.
    pub fn render(&mut self, budget: Option<usize>) -> Vec<f32> {
        let mut out = Vec::with_capacity(budget.unwrap_or(0));
        while self.gen.lifecycle() != Lifecycle::Finished {
            if budget.is_some_and(|b| out.len() >= b) {
                break;
            }
            let adv = self.tick();
            let live = if adv.is_finished() { adv.written } else { self.frame.len() };
            out.extend_from_slice(&self.frame.as_slice()[..live]);
            if adv.is_finished() {
                break;
            }
        }
        if let Some(b) = budget {
            out.truncate(b);
        }
        log::debug!("rendered {} samples ({} ticked)", out.len(), self.elapsed);
        out
    }

    #[inline] pub fn sample_rate(&self) -> f32 { self.sr }

    #[inline] pub fn frame_size(&self) -> usize { self.frame.len() }

    /// Samples ticked so far, including the silent tail of the last frame.
    #[inline] pub fn elapsed_samples(&self) -> u64 { self.elapsed }

    /// Elapsed time in seconds.
    #[allow(clippy::cast_precision_loss)]
    #[inline]
    pub fn time(&self) -> f64 { self.elapsed as f64 / f64::from(self.sr) }

    #[inline] pub fn generator(&self) -> &G { &self.gen }

    /// Mutable access for delivering triggers between ticks.
    #[inline] pub fn generator_mut(&mut self) -> &mut G { &mut self.gen }
}
