//! Timed cues on top of a [`Pool`].
//!
//! Cues carry an absolute sample time. They are applied at the first frame
//! boundary at or after that time, never inside a frame, in time order with
//! ties kept in scheduling order. Voices come from a caller-supplied factory.

use std::collections::{HashMap, VecDeque};

use framesynth_core::error::Result;

use crate::graph::{Advance, Generator, Lifecycle, Trigger};
use crate::pool::{Handle, Pool};
use crate::voice::Voice;

/// Identifies a sounding note (a key on a keyboard, a track slot...).
pub type Key = u32;

/// What the factory is asked to build.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct NoteOn {
    pub key: Key,
    pub frequency_hz: f32,
}

#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum CueAction {
    NoteOn { frequency_hz: f32 },
    NoteOff,
}

#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Cue {
    pub at_sample: u64,
    pub key: Key,
    pub action: CueAction,
}

impl Cue {
    pub fn note_on(at_sample: u64, key: Key, frequency_hz: f32) -> Self {
        Self { at_sample, key, action: CueAction::NoteOn { frequency_hz } }
    }

    pub fn note_off(at_sample: u64, key: Key) -> Self {
        Self { at_sample, key, action: CueAction::NoteOff }
    }
}

/// Equal-tempered pitch: `base * 2^((octave - 1) + semitone / 12)`.
///
/// `base_hz` is the frequency of C in octave 1.
pub fn note_frequency(base_hz: f32, octave: i32, semitone: i32) -> f32 {
    #[allow(clippy::cast_precision_loss)]
    let semitones = ((octave - 1) * 12 + semitone) as f32;
    base_hz * (semitones / 12.0).exp2()
}

pub struct Sequencer<F>
where
    F: FnMut(&NoteOn) -> Result<Voice>,
{
    pool: Pool,
    factory: F,
    cues: VecDeque<Cue>,
    /// Sample time of the next frame boundary.
    now: u64,
    sounding: HashMap<Key, Handle>,
}

impl<F> Sequencer<F>
where
    F: FnMut(&NoteOn) -> Result<Voice>,
{
    pub fn new(factory: F) -> Self {
        Self::with_pool(Pool::new(), factory)
    }

    /// Use a preconfigured pool (capacity, soft clipping).
    pub fn with_pool(pool: Pool, factory: F) -> Self {
        Self { pool, factory, cues: VecDeque::new(), now: 0, sounding: HashMap::new() }
    }

    /// Add a cue. Cues already in the past fire at the next boundary.
    pub fn schedule(&mut self, cue: Cue) {
        let at = self.cues.partition_point(|c| c.at_sample <= cue.at_sample);
        self.cues.insert(at, cue);
    }

    pub fn schedule_all(&mut self, cues: impl IntoIterator<Item = Cue>) {
        for cue in cues {
            self.schedule(cue);
        }
    }

    #[inline] pub fn now(&self) -> u64 { self.now }
    #[inline] pub fn pending_cues(&self) -> usize { self.cues.len() }
    #[inline] pub fn pool(&self) -> &Pool { &self.pool }
    #[inline] pub fn pool_mut(&mut self) -> &mut Pool { &mut self.pool }

    /// Handle of the voice currently held by `key`, if any.
    pub fn voice_for(&self, key: Key) -> Option<Handle> {
        self.sounding.get(&key).copied().filter(|&h| self.pool.contains(h))
    }

    fn apply(&mut self, cue: Cue) {
        match cue.action {
            CueAction::NoteOn { frequency_hz } => {
                if self.voice_for(cue.key).is_some() {
                    log::trace!("key {} already sounding, note-on ignored", cue.key);
                    return;
                }
                let note = NoteOn { key: cue.key, frequency_hz };
                match (self.factory)(&note) {
                    Ok(voice) => {
                        let h = self.pool.activate(voice);
                        self.sounding.insert(cue.key, h);
                    }
                    Err(e) => log::error!("note-on for key {} at {} dropped: {e}", cue.key, cue.at_sample),
                }
            }
            CueAction::NoteOff => match self.sounding.remove(&cue.key) {
                Some(h) => self.pool.notify(h, Trigger::Release),
                None => log::trace!("note-off for idle key {}", cue.key),
            },
        }
    }
}

impl<F> Generator for Sequencer<F>
where
    F: FnMut(&NoteOn) -> Result<Voice>,
{
    fn advance(&mut self, out: &mut [f32]) -> Advance {
        while self.cues.front().is_some_and(|c| c.at_sample <= self.now) {
            if let Some(cue) = self.cues.pop_front() {
                self.apply(cue);
            }
        }

        let adv = self.pool.advance(out);
        self.now += out.len() as u64;
        let pool = &self.pool;
        self.sounding.retain(|_, h| pool.contains(*h));

        if self.cues.is_empty() {
            adv
        } else {
            Advance::active(out.len())
        }
    }

    /// `Release` ends every held note; `Start` is forwarded to all voices.
    fn notify(&mut self, trigger: Trigger) {
        if trigger == Trigger::Release {
            self.sounding.clear();
        }
        Generator::notify(&mut self.pool, trigger);
    }

    #[inline] fn current_value(&self) -> f32 { self.pool.current_value() }

    fn lifecycle(&self) -> Lifecycle {
        if self.cues.is_empty() { self.pool.lifecycle() } else { Lifecycle::Active }
    }
}
