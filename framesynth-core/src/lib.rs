//! framesynth core — frame-synchronous DSP primitives.
//!
//! Features
//! - `fast-math`: polynomial/rational approximations for sine and tanh
//! - `simd`     : `wide::f32x8` frame mixing
//! - `libm` / `micromath`: alternative math backends
//! - `serde`    : (de)serialize envelope configuration
//!
//! Modules
//! - [`dsp`]       : math backend, ramps, phase wrapping, ms → samples, mixing
//! - [`envelopes`] : ADSR state machine and linear ramp
//! - [`error`]     : configuration errors and consistency warnings
//! - [`frame`]     : fixed-length sample frame
//!
//! Durations are counted in samples everywhere; milliseconds are accepted
//! only at configuration time and converted once.

pub mod dsp;
pub mod envelopes;
pub mod error;
pub mod frame;

/// Commonly used types/functions for convenience:
pub mod prelude {
    pub use crate::dsp::{clamp, fast_sin, lerp, ramp, samples_from_millis, soft_clip, wrap_phase, TAU};
    pub use crate::envelopes::{Adsr, AdsrConfig, AdsrMillis, AdsrStage, EnvelopeSpec, Ramp};
    pub use crate::error::{ConfigError, ConsistencyWarning, Result};
    pub use crate::frame::{Frame, DEFAULT_FRAME_SIZE};
}
