//! framesynth engine — generators, composition and mixing.
//!
//! Crate layout:
//! - [`graph`]     : `Generator` capability, triggers, lifecycle, `Engine<G>` renderer
//! - [`voice`]     : `Voice`, the closed set of concrete generators
//! - [`chain`]     : lazy concatenation of voices with sample-exact hand-off
//! - [`fm`]        : FM composite voice and its patch format
//! - [`pool`]      : arena of active voices, mixed once per frame
//! - [`sequencer`] : sample-timed note cues driving a pool
//!
//! Everything advances one frame at a time. Triggers are queued and applied
//! at frame boundaries, so all voices see one consistent state per frame and
//! output is reproducible for a given cue list.

pub mod chain;
pub mod fm;
pub mod graph;
pub mod pool;
pub mod sequencer;
pub mod voice;

// Re-export some commonly used items to make downstream imports ergonomic.
pub use chain::{Chain, Link};
pub use fm::{phase_per_sample_for, FmParams, FmPatch, FmVoice};
pub use graph::{Advance, Engine, Generator, Lifecycle, Trigger};
pub use pool::{Handle, Pool};
pub use sequencer::{note_frequency, Cue, CueAction, NoteOn, Sequencer};
pub use voice::{EnvelopeVoice, RampVoice, Voice};
