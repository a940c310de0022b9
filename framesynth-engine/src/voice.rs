//! Capability-typed voices.
//!
//! `Voice` is the closed set of generators the pool and chains hold. Dispatch
//! is a `match`, so a pool of voices needs no trait objects and no per-voice
//! boxing beyond what a chain needs for its own links.

use framesynth_core::envelopes::{Adsr, AdsrConfig, AdsrStage, Ramp};
use framesynth_core::error::Result;

use crate::chain::Chain;
use crate::fm::FmVoice;
use crate::graph::{Advance, Generator, Lifecycle, Trigger};

// ---- Envelope ----

/// An ADSR envelope rendered as a control/amplitude signal.
#[derive(Clone, Debug)]
pub struct EnvelopeVoice {
    env: Adsr,
}

impl EnvelopeVoice {
    pub fn new(cfg: AdsrConfig) -> Result<Self> {
        Ok(Self { env: Adsr::new(cfg)? })
    }

    #[inline] pub fn stage(&self) -> AdsrStage { self.env.stage() }
    #[inline] pub fn envelope(&self) -> &Adsr { &self.env }
}

impl From<Adsr> for EnvelopeVoice {
    fn from(env: Adsr) -> Self { Self { env } }
}

impl Generator for EnvelopeVoice {
    #[inline]
    fn advance(&mut self, out: &mut [f32]) -> Advance {
        let written = self.env.process(out);
        Advance { lifecycle: self.lifecycle(), written }
    }

    fn notify(&mut self, trigger: Trigger) {
        match trigger {
            Trigger::Release => self.env.request_release(),
            Trigger::Start { seed } => self.env.request_retrigger(seed),
        }
    }

    #[inline] fn current_value(&self) -> f32 { self.env.value() }

    #[inline]
    fn lifecycle(&self) -> Lifecycle {
        if self.env.is_finished() { Lifecycle::Finished } else { Lifecycle::Active }
    }

    #[inline] fn seed(&mut self, value: f32) { self.env.seed(value) }
}

// ---- Ramp ----

/// Fixed-duration linear ramp. Release has no effect; `Start` restarts it
/// from the seed (or its own start value).
#[derive(Clone, Copy, Debug)]
pub struct RampVoice {
    ramp: Ramp,
    restart: Option<Option<f32>>,
}

impl RampVoice {
    pub fn new(start: f32, end: f32, duration: usize) -> Result<Self> {
        Ok(Self { ramp: Ramp::new(start, end, duration)?, restart: None })
    }

    #[inline] pub fn ramp(&self) -> &Ramp { &self.ramp }
}

impl Generator for RampVoice {
    fn advance(&mut self, out: &mut [f32]) -> Advance {
        if let Some(seed) = self.restart.take() {
            self.ramp.reset();
            if let Some(s) = seed {
                self.ramp.seed(s);
            }
        }
        let written = self.ramp.process(out);
        Advance { lifecycle: self.lifecycle(), written }
    }

    fn notify(&mut self, trigger: Trigger) {
        match trigger {
            Trigger::Start { seed } if !self.ramp.is_finished() => self.restart = Some(seed),
            Trigger::Start { .. } => log::trace!("start ignored: ramp already finished"),
            Trigger::Release => {}
        }
    }

    #[inline] fn current_value(&self) -> f32 { self.ramp.value() }

    #[inline]
    fn lifecycle(&self) -> Lifecycle {
        if self.ramp.is_finished() { Lifecycle::Finished } else { Lifecycle::Active }
    }

    #[inline] fn seed(&mut self, value: f32) { self.ramp.seed(value) }
}

// ---- Dispatch ----

/// Every concrete generator the engine knows about.
#[derive(Debug)]
pub enum Voice {
    Envelope(EnvelopeVoice),
    Ramp(RampVoice),
    Chain(Chain),
    Fm(FmVoice),
}

impl Voice {
    /// Shorthand for an envelope voice.
    pub fn envelope(cfg: AdsrConfig) -> Result<Self> {
        Ok(Self::Envelope(EnvelopeVoice::new(cfg)?))
    }

    /// Shorthand for a ramp voice.
    pub fn ramp(start: f32, end: f32, duration: usize) -> Result<Self> {
        Ok(Self::Ramp(RampVoice::new(start, end, duration)?))
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Envelope(_) => "envelope",
            Self::Ramp(_) => "ramp",
            Self::Chain(_) => "chain",
            Self::Fm(_) => "fm",
        }
    }
}

macro_rules! dispatch {
    ($self:ident, $v:ident => $e:expr) => {
        match $self {
            Voice::Envelope($v) => $e,
            Voice::Ramp($v) => $e,
            Voice::Chain($v) => $e,
            Voice::Fm($v) => $e,
        }
    };
}

impl Generator for Voice {
    #[inline] fn advance(&mut self, out: &mut [f32]) -> Advance { dispatch!(self, v => v.advance(out)) }
    #[inline] fn notify(&mut self, trigger: Trigger) { dispatch!(self, v => v.notify(trigger)) }
    #[inline] fn current_value(&self) -> f32 { dispatch!(self, v => v.current_value()) }
    #[inline] fn lifecycle(&self) -> Lifecycle { dispatch!(self, v => v.lifecycle()) }
    #[inline] fn seed(&mut self, value: f32) { dispatch!(self, v => v.seed(value)) }
}

impl From<EnvelopeVoice> for Voice {
    fn from(v: EnvelopeVoice) -> Self { Self::Envelope(v) }
}

impl From<RampVoice> for Voice {
    fn from(v: RampVoice) -> Self { Self::Ramp(v) }
}

impl From<Chain> for Voice {
    fn from(v: Chain) -> Self { Self::Chain(v) }
}

impl From<FmVoice> for Voice {
    fn from(v: FmVoice) -> Self { Self::Fm(v) }
}
