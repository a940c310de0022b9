//! Active voice pool and mixer.
//!
//! Voices live in an arena of slots addressed by generational handles.
//! Removing a voice frees its slot and bumps the slot generation, so a handle
//! kept by a caller after its voice finished can never reach a newer voice.
//!
//! Each tick:
//! 1. queued triggers are delivered in arrival order
//! 2. every member renders one frame into a scratch buffer, in insertion order
//! 3. the frames are summed into the output
//! 4. members that finished during the tick are removed

use std::collections::VecDeque;

use framesynth_core::dsp::{mix_in_place, soft_clip};

use crate::graph::{Advance, Generator, Lifecycle, Trigger};
use crate::voice::Voice;

/// Stable reference to a pool member.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct Handle {
    index: u32,
    generation: u32,
}

impl Handle {
    #[inline] pub fn index(&self) -> usize { self.index as usize }
    #[inline] pub fn generation(&self) -> u32 { self.generation }
}

#[derive(Debug)]
struct Slot {
    generation: u32,
    voice: Option<Voice>,
}

fn lookup(slots: &mut [Slot], h: Handle) -> Option<&mut Voice> {
    slots
        .get_mut(h.index())
        .filter(|s| s.generation == h.generation)
        .and_then(|s| s.voice.as_mut())
}

#[derive(Debug, Default)]
pub struct Pool {
    slots: Vec<Slot>,
    free: Vec<u32>,
    /// Live handles in insertion order; this is the mixing order.
    order: Vec<Handle>,
    events: VecDeque<(Handle, Trigger)>,
    scratch: Vec<f32>,
    soft_clip: bool,
    last_value: f32,
}

impl Pool {
    pub fn new() -> Self { Self::default() }

    pub fn with_capacity(voices: usize) -> Self {
        Self {
            slots: Vec::with_capacity(voices),
            order: Vec::with_capacity(voices),
            ..Self::default()
        }
    }

    /// Run the mixed frame through a tanh soft clipper.
    #[must_use]
    pub fn with_soft_clip(mut self, on: bool) -> Self {
        self.soft_clip = on;
        self
    }

    /// Admit a voice. It is advanced from the next tick on.
    pub fn activate(&mut self, voice: Voice) -> Handle {
        let kind = voice.kind();
        let handle = match self.free.pop() {
            Some(index) => {
                let slot = &mut self.slots[index as usize];
                slot.voice = Some(voice);
                Handle { index, generation: slot.generation }
            }
            None => {
                let index = u32::try_from(self.slots.len()).unwrap_or(u32::MAX);
                self.slots.push(Slot { generation: 0, voice: Some(voice) });
                Handle { index, generation: 0 }
            }
        };
        self.order.push(handle);
        log::debug!("pool: admitted {kind} voice {handle:?} ({} live)", self.order.len());
        handle
    }

    /// Queue a trigger for one member. Unknown or stale handles are ignored.
    pub fn notify(&mut self, handle: Handle, trigger: Trigger) {
        if self.contains(handle) {
            self.events.push_back((handle, trigger));
        } else {
            log::trace!("pool: {trigger:?} for unknown handle {handle:?} dropped");
        }
    }

    /// Queue a release for every member.
    pub fn release_all(&mut self) {
        self.broadcast(Trigger::Release);
    }

    fn broadcast(&mut self, trigger: Trigger) {
        self.events.extend(self.order.iter().map(|&h| (h, trigger)));
    }

    #[inline]
    pub fn contains(&self, handle: Handle) -> bool {
        self.get(handle).is_some()
    }

    pub fn get(&self, handle: Handle) -> Option<&Voice> {
        self.slots
            .get(handle.index())
            .filter(|s| s.generation == handle.generation)
            .and_then(|s| s.voice.as_ref())
    }

    pub fn lifecycle_of(&self, handle: Handle) -> Option<Lifecycle> {
        self.get(handle).map(|v| v.lifecycle())
    }

    /// Live members in mixing order.
    pub fn handles(&self) -> impl Iterator<Item = Handle> + '_ {
        self.order.iter().copied()
    }

    #[inline] pub fn len(&self) -> usize { self.order.len() }
    #[inline] pub fn is_empty(&self) -> bool { self.order.is_empty() }

    fn flush_events(&mut self) {
        let slots = &mut self.slots;
        for (h, t) in self.events.drain(..) {
            match lookup(slots, h) {
                Some(v) => v.notify(t),
                // member finished between notify and this boundary
                None => log::trace!("pool: {t:?} for {h:?} dropped at flush"),
            }
        }
    }
}

impl Generator for Pool {
    fn advance(&mut self, out: &mut [f32]) -> Advance {
        self.flush_events();

        let n = out.len();
        out.fill(0.0);
        if self.scratch.len() < n {
            self.scratch.resize(n, 0.0);
        }

        let was_empty = self.order.is_empty();
        let mut tail = 0;
        let (slots, free, scratch) = (&mut self.slots, &mut self.free, &mut self.scratch[..n]);
        self.order.retain(|&h| {
            let slot = &mut slots[h.index()];
            let Some(voice) = slot.voice.as_mut() else {
                return false;
            };
            let adv = voice.advance(scratch);
            mix_in_place(out, scratch);
            if !adv.is_finished() {
                tail = n;
                return true;
            }
            tail = tail.max(adv.written);
            slot.voice = None;
            slot.generation = slot.generation.wrapping_add(1);
            free.push(h.index);
            log::debug!("pool: reclaimed voice {h:?}");
            false
        });

        if self.soft_clip {
            for s in out.iter_mut() {
                *s = soft_clip(*s);
            }
        }
        if let Some(&last) = out.last() {
            self.last_value = last;
        }

        match (was_empty, self.order.is_empty()) {
            (true, true) => Advance::finished(0),
            (false, true) => Advance::finished(tail),
            _ => Advance::active(n),
        }
    }

    /// Broadcast to every member.
    fn notify(&mut self, trigger: Trigger) {
        self.broadcast(trigger);
    }

    /// Last mixed sample.
    #[inline] fn current_value(&self) -> f32 { self.last_value }

    #[inline]
    fn lifecycle(&self) -> Lifecycle {
        if self.order.is_empty() { Lifecycle::Finished } else { Lifecycle::Active }
    }
}
