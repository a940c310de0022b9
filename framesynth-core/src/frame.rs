//! Fixed-length sample frame, the unit of scheduling.
//!
//! A frame is allocated once per session (or per mixer scratch slot) and then
//! reused; nothing here allocates after construction.

use crate::dsp::mix_in_place;
use crate::error::{ConfigError, Result};

/// Typical block size for offline rendering.
pub const DEFAULT_FRAME_SIZE: usize = 64;

/// An ordered run of `len` mono samples.
#[derive(Clone, Debug, PartialEq)]
pub struct Frame {
    samples: Vec<f32>,
}

impl Frame {
    /// Allocate a silent frame. `len` must be non-zero.
    pub fn new(len: usize) -> Result<Self> {
        if len == 0 {
            return Err(ConfigError::InvalidFrameSize(len));
        }
        Ok(Self { samples: vec![0.0; len] })
    }

    #[inline] pub fn len(&self) -> usize { self.samples.len() }

    /// Always false: construction rejects empty frames.
    #[inline] pub fn is_empty(&self) -> bool { self.samples.is_empty() }

    #[inline] pub fn as_slice(&self) -> &[f32] { &self.samples }

    #[inline] pub fn as_mut_slice(&mut self) -> &mut [f32] { &mut self.samples }

    /// Zero every sample.
    #[inline]
    pub fn silence(&mut self) {
        self.samples.fill(0.0);
    }

    /// Add `src` element-wise. Only the overlapping prefix is mixed.
    #[inline]
    pub fn mix(&mut self, src: &[f32]) {
        debug_assert_eq!(src.len(), self.samples.len(), "frame length mismatch");
        mix_in_place(&mut self.samples, src);
    }

    /// Largest absolute sample value.
    pub fn peak(&self) -> f32 {
        self.samples.iter().fold(0.0f32, |m, s| m.max(s.abs()))
    }

    pub fn is_silent(&self) -> bool {
        self.samples.iter().all(|&s| s == 0.0)
    }
}

impl AsRef<[f32]> for Frame {
    fn as_ref(&self) -> &[f32] { &self.samples }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_empty_frames() {
        assert_eq!(Frame::new(0), Err(ConfigError::InvalidFrameSize(0)));
    }

    #[test]
    fn mixes_and_measures() {
        let mut f = Frame::new(4).unwrap();
        assert!(f.is_silent());
        f.mix(&[0.25, -0.5, 0.0, 0.1]);
        f.mix(&[0.25, -0.5, 0.0, 0.1]);
        assert_eq!(f.as_slice(), &[0.5, -1.0, 0.0, 0.2]);
        assert_eq!(f.peak(), 1.0);
        f.silence();
        assert!(f.is_silent());
        assert_eq!(f.len(), 4);
    }
}
