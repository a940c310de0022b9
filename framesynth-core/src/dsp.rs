//! Ramp math, unit conversion, trig and mixing helpers.
//!
//! Features used by this file:
//! - `fast-math` : polynomial sine and rational soft clip
//! - `simd`      : `wide::f32x8` lanes for frame mixing
//! - `libm` / `micromath` : alternative trig backends

#![allow(clippy::excessive_precision)]

use core::f32::consts::PI;

use cfg_if::cfg_if;
use num_traits::Float;

use crate::error::{ConfigError, Result};

// ----------------------------- Math backend selection -----------------------------

cfg_if! {
    // micromath preferred if explicitly requested
    if #[cfg(feature = "micromath")] {
        use micromath::F32Ext as _;
        #[inline] fn m_sin(x: f32) -> f32 { x.sin() }
        #[inline] fn m_tanh(x: f32) -> f32 { x.tanh() }
    // libm (C math), deterministic across platforms
    } else if #[cfg(feature = "libm")] {
        #[inline] fn m_sin(x: f32) -> f32 { libm::sinf(x) }
        #[inline] fn m_tanh(x: f32) -> f32 { libm::tanhf(x) }
    // std backend
    } else {
        #[inline] fn m_sin(x: f32) -> f32 { x.sin() }
        #[inline] fn m_tanh(x: f32) -> f32 { x.tanh() }
    }
}

// --------------------------------- Constants -------------------------------------

/// 2π (commonly useful)
pub const TAU: f32 = 2.0 * PI;

// --------------------------------- Utilities -------------------------------------

#[inline]
pub fn clamp(x: f32, lo: f32, hi: f32) -> f32 {
    if x < lo { lo } else if x > hi { hi } else { x }
}

#[inline]
pub fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

/// Linear ramp value after `elapsed` of `duration` samples.
///
/// `start + (end - start) * (elapsed / duration)`, with progress clamped to
/// [0, 1] so the result never overshoots `end`. A zero `duration` is an
/// instantaneous jump and returns `end`.
#[inline]
pub fn ramp(start: f32, end: f32, elapsed: usize, duration: usize) -> f32 {
    if duration == 0 || elapsed >= duration {
        return end;
    }
    #[allow(clippy::cast_precision_loss)]
    let t = elapsed as f32 / duration as f32;
    lerp(start, end, t)
}

/// Wrap a phase (radians) into [0, 2π).
///
/// Generic so the f64 accumulators of the FM voice share the helper.
#[inline]
pub fn wrap_phase<T: Float>(p: T) -> T {
    let tau: T = num_traits::cast(core::f64::consts::TAU).unwrap_or_else(T::one);
    let w = p - (p / tau).floor() * tau;
    // `floor` rounding can land exactly on tau for tiny negative inputs
    if w >= tau { w - tau } else { w }
}

/// Convert a duration in milliseconds to a whole number of samples (rounded).
///
/// `name` identifies the parameter in the returned error.
pub fn samples_from_millis(name: &'static str, ms: f32, sample_rate: f32) -> Result<usize> {
    if !sample_rate.is_finite() || sample_rate <= 0.0 {
        return Err(ConfigError::InvalidSampleRate(sample_rate));
    }
    if !ms.is_finite() || ms < 0.0 {
        return Err(ConfigError::InvalidDuration { name, value: ms });
    }
    let samples = (f64::from(ms) * 0.001 * f64::from(sample_rate)).round();
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let samples = samples as usize;
    Ok(samples)
}

// --------------------------------- Fast trig -------------------------------------

/// Sine with the selected backend.
///
/// With `fast-math` this is a 5th-order odd polynomial on [-π/2, π/2]
/// after range reduction (max abs error ~1e-4).
#[inline]
pub fn fast_sin(x: f32) -> f32 {
    cfg_if! {
        if #[cfg(feature = "fast-math")] {
            const HALF_PI: f32 = 0.5 * PI;
            let mut xr = x;
            let k = (xr / TAU).round();
            xr -= k * TAU;

            // sin(π - x) = sin(x) folds [-π, π] onto [-π/2, π/2]
            if xr > HALF_PI {
                xr = PI - xr;
            } else if xr < -HALF_PI {
                xr = -PI - xr;
            }

            // sin(x) ≈ x * (a + b x^2 + c x^4)
            let x2 = xr * xr;
            xr * (0.999_694_9 + x2 * (-0.165_670_0 + x2 * 0.007_513_4))
        } else {
            m_sin(x)
        }
    }
}

// --------------------------------- Nonlinearities --------------------------------

/// Soft clip via tanh. If `fast-math` is enabled, uses a stable rational approximation.
///
/// Approximation used when `fast-math`:
/// `tanh(x) ≈ x * (27 + x^2) / (27 + 9 x^2)`
#[inline]
pub fn soft_clip(x: f32) -> f32 {
    cfg_if! {
        if #[cfg(feature = "fast-math")] {
            let x = clamp(x, -3.0, 3.0);
            let x2 = x * x;
            x * (27.0 + x2) / (27.0 + 9.0 * x2)
        } else {
            m_tanh(x)
        }
    }
}

// --------------------------------- Mixing ----------------------------------------

/// In-place mix: `dst[i] += src[i]`.
///
/// Only the overlapping prefix is mixed when the lengths differ.
#[inline]
pub fn mix_in_place(dst: &mut [f32], src: &[f32]) {
    let n = dst.len().min(src.len());
    let (dst, src) = (&mut dst[..n], &src[..n]);

    cfg_if! {
        if #[cfg(feature = "simd")] {
            use wide::f32x8;
            let mut d_chunks = dst.chunks_exact_mut(8);
            let mut s_chunks = src.chunks_exact(8);
            for (d, s) in (&mut d_chunks).zip(&mut s_chunks) {
                let mut lanes = [0.0f32; 8];
                lanes.copy_from_slice(d);
                let mut add = [0.0f32; 8];
                add.copy_from_slice(s);
                let sum = f32x8::from(lanes) + f32x8::from(add);
                d.copy_from_slice(&sum.to_array());
            }
            for (d, s) in d_chunks.into_remainder().iter_mut().zip(s_chunks.remainder()) {
                *d += *s;
            }
        } else {
            for (d, s) in dst.iter_mut().zip(src.iter()) {
                *d += *s;
            }
        }
    }
}

// --------------------------------- Tests -----------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn clamp_limits_both_sides() {
        assert_eq!(clamp(-0.5, 0.0, 1.0), 0.0);
        assert_eq!(clamp(1.5, 0.0, 1.0), 1.0);
        assert_eq!(clamp(0.25, 0.0, 1.0), 0.25);
    }

    #[test]
    fn ramp_hits_endpoints_and_never_overshoots() {
        assert_eq!(ramp(0.0, 1.0, 0, 100), 0.0);
        assert_abs_diff_eq!(ramp(0.0, 1.0, 50, 100), 0.5, epsilon = 1e-6);
        assert_eq!(ramp(0.0, 1.0, 100, 100), 1.0);
        assert_eq!(ramp(0.0, 1.0, 250, 100), 1.0);
        assert_eq!(ramp(0.7, 0.0, 400, 300), 0.0);
    }

    #[test]
    fn zero_duration_ramp_jumps_to_end() {
        assert_eq!(ramp(0.3, 0.9, 0, 0), 0.9);
    }

    #[test]
    fn wrap_phase_stays_in_range() {
        for p in [-20.0f64, -TAU as f64, -0.001, 0.0, 3.0, 6.3, 100.0] {
            let w = wrap_phase(p);
            assert!((0.0..core::f64::consts::TAU).contains(&w), "p={p} w={w}");
        }
        let w32 = wrap_phase(7.0f32);
        assert_abs_diff_eq!(w32, 7.0 - TAU, epsilon = 1e-5);
    }

    #[test]
    fn millis_convert_with_rounding() {
        assert_eq!(samples_from_millis("attack", 100.0, 44_100.0).unwrap(), 4410);
        assert_eq!(samples_from_millis("attack", 0.0, 48_000.0).unwrap(), 0);
        assert_eq!(samples_from_millis("attack", 0.01, 48_000.0).unwrap(), 0);
        assert_eq!(samples_from_millis("attack", 1.0, 1000.0).unwrap(), 1);
    }

    #[test]
    fn millis_reject_bad_input() {
        assert!(matches!(
            samples_from_millis("decay", -1.0, 48_000.0),
            Err(ConfigError::InvalidDuration { name: "decay", .. })
        ));
        assert!(samples_from_millis("decay", f32::NAN, 48_000.0).is_err());
        assert!(matches!(
            samples_from_millis("decay", 10.0, 0.0),
            Err(ConfigError::InvalidSampleRate(_))
        ));
    }

    #[cfg(feature = "fast-math")]
    #[test]
    fn fast_sin_tracks_sin_over_a_full_period() {
        let mut worst = 0.0f32;
        for i in 0..4096 {
            let x = TAU * i as f32 / 4096.0;
            worst = worst.max((fast_sin(x) - x.sin()).abs());
        }
        assert!(worst < 5e-4, "worst error {worst}");
        assert!(fast_sin(PI).abs() < 5e-4);
        assert!((fast_sin(0.5 * PI) - 1.0).abs() < 5e-4);
        assert!((fast_sin(-0.5 * PI) + 1.0).abs() < 5e-4);
    }

    #[test]
    fn fast_sin_matches_sin() {
        for x in [-7.0f32, -3.0, -1.0, 0.0, 0.5, 1.5, 3.1, 4.7, 6.2, 12.0] {
            assert_abs_diff_eq!(fast_sin(x), x.sin(), epsilon = 5e-4);
        }
    }

    #[test]
    fn soft_clip_is_bounded() {
        for x in [-10.0, -2.0, -1.0, 0.0, 1.0, 2.0, 10.0] {
            let y = soft_clip(x);
            assert!((-1.0 - 1e-4..=1.0 + 1e-4).contains(&y), "x={x} y={y}");
        }
    }

    #[test]
    fn mix_sums_overlap_only() {
        let mut dst = vec![1.0f32; 19];
        let src: Vec<f32> = (0..17).map(|i| i as f32).collect();
        mix_in_place(&mut dst, &src);
        for i in 0..17 {
            assert_eq!(dst[i], 1.0 + i as f32);
        }
        assert_eq!(dst[17], 1.0);
        assert_eq!(dst[18], 1.0);
    }
}
