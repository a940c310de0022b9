//! Configuration errors and non-fatal consistency warnings.

use core::fmt;

/// Rejected configuration. Raised at construction, before any sample exists.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// Harmonic multipliers and amplitudes must pair up 1:1.
    #[error("harmonics/amplitudes length mismatch: {harmonics} multipliers vs {amplitudes} amplitudes")]
    LengthMismatch { harmonics: usize, amplitudes: usize },

    /// Negative or non-finite duration.
    #[error("invalid {name} duration: {value}")]
    InvalidDuration { name: &'static str, value: f32 },

    /// Sustain level outside [0, 1].
    #[error("sustain level {0} outside [0, 1]")]
    SustainOutOfRange(f32),

    /// An amplitude parameter outside its allowed range.
    #[error("{name} amplitude {value} outside [0, 1]")]
    AmplitudeOutOfRange { name: &'static str, value: f32 },

    /// Carrier phase increment must be in (0, π) radians per sample.
    #[error("phase per sample {0} outside (0, π)")]
    InvalidPhaseIncrement(f32),

    #[error("modulation depth {0} must be finite and non-negative")]
    InvalidModulationDepth(f32),

    /// A harmonic multiplier or its amplitude is not usable.
    #[error("harmonic #{index} has invalid value {value}")]
    InvalidHarmonic { index: usize, value: f32 },

    #[error("invalid sample rate: {0}")]
    InvalidSampleRate(f32),

    #[error("invalid frame size: {0}")]
    InvalidFrameSize(usize),
}

/// Result type for configuration-time operations.
pub type Result<T> = core::result::Result<T, ConfigError>;

/// Non-fatal finding about a composite configuration. Synthesis proceeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsistencyWarning {
    /// Modulation and waveform envelopes have different nominal lengths (samples).
    EnvelopeLengthMismatch { modulation: usize, waveform: usize },
}

impl fmt::Display for ConsistencyWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::EnvelopeLengthMismatch { modulation, waveform } => {
                write!(
                    f,
                    "modulation envelope ({modulation} samples) and waveform envelope ({waveform} samples) differ"
                )?;
                if modulation < waveform {
                    write!(f, "; modulation stops {} samples before the audio ends", waveform - modulation)
                } else {
                    write!(f, "; output is silent for the last {} samples", modulation - waveform)
                }
            }
        }
    }
}
