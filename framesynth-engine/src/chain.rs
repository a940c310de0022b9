//! Concatenation combinator.
//!
//! A `Chain` plays its links one after another. A link is either a voice
//! built up front or a seed function that builds the voice only when its
//! predecessor has finished, from the predecessor's final value. Hand-off is
//! sample-exact: the successor renders the rest of the frame in which the
//! predecessor finished.
//!
//! A `Release` goes to the running link and marks the chain released: when
//! that link finishes, the chain finishes instead of starting the next one.

use std::collections::VecDeque;
use std::fmt;

use crate::graph::{Advance, Generator, Lifecycle, Trigger};
use crate::voice::Voice;

/// Builds a link's voice from the predecessor's final value.
pub type SeedFn = Box<dyn FnOnce(f32) -> Voice + Send>;

pub enum Link {
    /// Built up front; seeded with `Generator::seed` on activation.
    Ready(Voice),
    /// Built on activation.
    Lazy(SeedFn),
}

impl Link {
    pub fn lazy<F>(f: F) -> Self
    where
        F: FnOnce(f32) -> Voice + Send + 'static,
    {
        Self::Lazy(Box::new(f))
    }

    fn materialize(self, seed: Option<f32>) -> Voice {
        match self {
            Self::Ready(mut v) => {
                if let Some(s) = seed {
                    v.seed(s);
                }
                v
            }
            Self::Lazy(f) => f(seed.unwrap_or(0.0)),
        }
    }
}

impl fmt::Debug for Link {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ready(v) => f.debug_tuple("Ready").field(v).finish(),
            Self::Lazy(_) => f.write_str("Lazy(..)"),
        }
    }
}

impl From<Voice> for Link {
    fn from(v: Voice) -> Self { Self::Ready(v) }
}

/// Ordered links with at most one running at a time.
#[derive(Debug)]
pub struct Chain {
    upcoming: VecDeque<Link>,
    active: Option<Box<Voice>>,
    /// Index of the running link (or of the next link when between links).
    index: usize,
    len: usize,
    state: Lifecycle,
    /// Seed for the first link, set by an enclosing chain.
    initial: Option<f32>,
    last_value: f32,
    queued: Vec<Trigger>,
    released: bool,
}

impl Default for Chain {
    fn default() -> Self { Self::new() }
}

impl Chain {
    pub fn new() -> Self {
        Self {
            upcoming: VecDeque::new(),
            active: None,
            index: 0,
            len: 0,
            state: Lifecycle::Pending,
            initial: None,
            last_value: 0.0,
            queued: Vec::new(),
            released: false,
        }
    }

    /// Append a link (builder style).
    #[must_use]
    pub fn then(mut self, link: impl Into<Link>) -> Self {
        self.push(link);
        self
    }

    /// Append a lazily built link (builder style).
    #[must_use]
    pub fn then_lazy<F>(self, f: F) -> Self
    where
        F: FnOnce(f32) -> Voice + Send + 'static,
    {
        self.then(Link::lazy(f))
    }

    /// Append a link. Appending to a Finished chain has no effect.
    pub fn push(&mut self, link: impl Into<Link>) {
        if self.state == Lifecycle::Finished {
            log::trace!("link dropped: chain already finished");
            return;
        }
        self.upcoming.push_back(link.into());
        self.len += 1;
    }

    /// Total number of links, played or not.
    #[inline] pub fn len(&self) -> usize { self.len }
    #[inline] pub fn is_empty(&self) -> bool { self.len == 0 }

    /// Index of the running link, if one is running.
    #[inline]
    pub fn active_index(&self) -> Option<usize> {
        self.active.as_ref().map(|_| self.index)
    }

    /// True after a `Release` that no later `Start` has undone.
    #[inline] pub fn is_released(&self) -> bool { self.released }

    /// Materialize the next link. Returns false when none is left.
    fn activate_next(&mut self, seed: Option<f32>) -> bool {
        let Some(link) = self.upcoming.pop_front() else {
            return false;
        };
        if self.state == Lifecycle::Active {
            self.index += 1;
        }
        let mut voice = link.materialize(seed);
        for t in self.queued.drain(..) {
            voice.notify(t);
        }
        log::debug!("chain link {} ({}) active, seed {:?}", self.index, voice.kind(), seed);
        self.active = Some(Box::new(voice));
        self.state = Lifecycle::Active;
        true
    }

    fn finish(&mut self, out: &mut [f32], written: usize) -> Advance {
        self.state = Lifecycle::Finished;
        self.active = None;
        out[written..].fill(0.0);
        Advance::finished(written)
    }
}

impl Generator for Chain {
    fn advance(&mut self, out: &mut [f32]) -> Advance {
        match self.state {
            Lifecycle::Finished => return self.finish(out, 0),
            Lifecycle::Pending => {
                let seed = self.initial;
                if !self.activate_next(seed) {
                    return self.finish(out, 0);
                }
            }
            Lifecycle::Active => {}
        }

        let mut written = 0;
        while let Some(voice) = self.active.as_mut() {
            let adv = voice.advance(&mut out[written..]);
            if !adv.is_finished() {
                return Advance::active(out.len());
            }
            written += adv.written;
            self.last_value = voice.current_value();
            self.active = None;
            if self.released {
                log::debug!("chain released: {} link(s) skipped", self.upcoming.len());
                self.upcoming.clear();
                return self.finish(out, written);
            }
            if !self.activate_next(Some(self.last_value)) {
                return self.finish(out, written);
            }
            if written == out.len() {
                // successor starts with the next frame
                break;
            }
        }
        Advance::active(out.len())
    }

    fn notify(&mut self, trigger: Trigger) {
        if self.state == Lifecycle::Finished {
            log::trace!("trigger {trigger:?} dropped: chain finished");
            return;
        }
        self.released = trigger == Trigger::Release;
        match self.active.as_mut() {
            Some(voice) => voice.notify(trigger),
            None => self.queued.push(trigger),
        }
    }

    #[inline]
    fn current_value(&self) -> f32 {
        self.active.as_ref().map_or(self.last_value, |v| v.current_value())
    }

    #[inline] fn lifecycle(&self) -> Lifecycle { self.state }

    fn seed(&mut self, value: f32) {
        if self.state == Lifecycle::Pending {
            self.initial = Some(value);
        }
    }
}
