//! Envelope generators: the frame-driven ADSR state machine and a linear ramp.
//!
//! Provided:
//! - `AdsrConfig`  : ADSR timing in **samples** (the canonical unit)
//! - `AdsrMillis`  : the same parameters in milliseconds, converted once
//! - `EnvelopeSpec`: either of the above, as found in configuration files
//! - `Adsr`        : linear ADSR with early release, retrigger and max-sustain
//! - `Ramp`        : fixed-duration linear ramp between two values
//!
//! Both generators render whole blocks through `process(&mut [f32]) -> usize`.
//! The return value is the number of live samples written before the
//! generator finished; anything after that is zero-filled. Requests
//! (`request_release`, `request_retrigger`) are latched and only take effect
//! at the start of the next `process` call, i.e. on a frame boundary.

use crate::dsp::{clamp, ramp, samples_from_millis};
use crate::error::{ConfigError, Result};

// --------------------------------- Configuration ---------------------------------

/// ADSR timing in samples. Sustain and initial amplitude are in [0, 1].
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AdsrConfig {
    pub attack: usize,
    pub decay: usize,
    pub sustain_level: f32,
    /// Longest time spent in Sustain before releasing on its own.
    pub sustain_max: usize,
    pub release: usize,
    #[cfg_attr(feature = "serde", serde(default))]
    pub initial_amplitude: f32,
}

impl AdsrConfig {
    #[inline]
    pub fn new(attack: usize, decay: usize, sustain_level: f32, sustain_max: usize, release: usize) -> Self {
        Self { attack, decay, sustain_level, sustain_max, release, initial_amplitude: 0.0 }
    }

    #[inline]
    #[must_use]
    pub fn with_initial_amplitude(mut self, amp: f32) -> Self {
        self.initial_amplitude = amp;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if !self.sustain_level.is_finite() || !(0.0..=1.0).contains(&self.sustain_level) {
            return Err(ConfigError::SustainOutOfRange(self.sustain_level));
        }
        if !self.initial_amplitude.is_finite() || !(0.0..=1.0).contains(&self.initial_amplitude) {
            return Err(ConfigError::AmplitudeOutOfRange {
                name: "initial",
                value: self.initial_amplitude,
            });
        }
        Ok(())
    }

    /// Nominal length when no release event arrives: A + D + max sustain + R.
    pub fn total_samples(&self) -> usize {
        self.attack
            .saturating_add(self.decay)
            .saturating_add(self.sustain_max)
            .saturating_add(self.release)
    }
}

/// ADSR timing in milliseconds. Converted to [`AdsrConfig`] with a known sample rate.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AdsrMillis {
    pub attack_ms: f32,
    pub decay_ms: f32,
    pub sustain_level: f32,
    pub sustain_max_ms: f32,
    pub release_ms: f32,
    #[cfg_attr(feature = "serde", serde(default))]
    pub initial_amplitude: f32,
}

impl AdsrMillis {
    pub fn to_samples(&self, sample_rate: f32) -> Result<AdsrConfig> {
        let cfg = AdsrConfig {
            attack: samples_from_millis("attack", self.attack_ms, sample_rate)?,
            decay: samples_from_millis("decay", self.decay_ms, sample_rate)?,
            sustain_level: self.sustain_level,
            sustain_max: samples_from_millis("sustain_max", self.sustain_max_ms, sample_rate)?,
            release: samples_from_millis("release", self.release_ms, sample_rate)?,
            initial_amplitude: self.initial_amplitude,
        };
        cfg.validate()?;
        Ok(cfg)
    }
}

/// Envelope timing in either convention.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(untagged))]
pub enum EnvelopeSpec {
    Samples(AdsrConfig),
    Millis(AdsrMillis),
}

impl EnvelopeSpec {
    /// Resolve to sample counts. `sample_rate` is only consulted for `Millis`.
    pub fn resolve(&self, sample_rate: f32) -> Result<AdsrConfig> {
        match self {
            Self::Samples(cfg) => {
                cfg.validate()?;
                Ok(*cfg)
            }
            Self::Millis(ms) => ms.to_samples(sample_rate),
        }
    }
}

impl From<AdsrConfig> for EnvelopeSpec {
    fn from(cfg: AdsrConfig) -> Self { Self::Samples(cfg) }
}

impl From<AdsrMillis> for EnvelopeSpec {
    fn from(ms: AdsrMillis) -> Self { Self::Millis(ms) }
}

// ------------------------------------ ADSR ----------------------------------------

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum AdsrStage {
    Attack,
    Decay,
    Sustain,
    Release,
    Finished,
}

#[derive(Copy, Clone, Debug, PartialEq)]
enum Request {
    Release,
    Retrigger(Option<f32>),
}

/// Linear ADSR state machine.
///
/// - Attack : `start → 1.0` over `attack` samples (`start` = initial or seeded amplitude)
/// - Decay  : `1.0 → sustain_level` over `decay` samples
/// - Sustain: hold, at most `sustain_max` samples, then release on its own
/// - Release: `value at release time → 0.0` over `release` samples, then Finished
///
/// The first sample of every stage is that stage's ramp at elapsed 0, and a
/// stage boundary inside a block continues into the next stage within the
/// same call. Zero-length stages are skipped without emitting a sample.
#[derive(Clone, Debug)]
pub struct Adsr {
    cfg: AdsrConfig,
    stage: AdsrStage,
    elapsed: usize,
    start: f32,
    release_from: f32,
    value: f32,
    pending: Option<Request>,
}

impl Adsr {
    pub fn new(cfg: AdsrConfig) -> Result<Self> {
        cfg.validate()?;
        Ok(Self {
            cfg,
            stage: AdsrStage::Attack,
            elapsed: 0,
            start: cfg.initial_amplitude,
            release_from: 0.0,
            value: cfg.initial_amplitude,
            pending: None,
        })
    }

    #[inline] pub fn config(&self) -> &AdsrConfig { &self.cfg }
    #[inline] pub fn stage(&self) -> AdsrStage { self.stage }
    /// Most recently emitted amplitude (the starting amplitude before the first sample).
    #[inline] pub fn value(&self) -> f32 { self.value }
    /// Samples spent in the current stage.
    #[inline] pub fn elapsed(&self) -> usize { self.elapsed }
    #[inline] pub fn is_finished(&self) -> bool { self.stage == AdsrStage::Finished }
    #[inline] pub fn total_samples(&self) -> usize { self.cfg.total_samples() }

    /// Queue a note-off. Applied at the next block boundary; no-op once releasing.
    #[inline]
    pub fn request_release(&mut self) {
        self.pending = Some(Request::Release);
    }

    /// Queue a restart from Attack, ramping up from `seed` (or the current
    /// amplitude when `None`). Ignored once Finished.
    #[inline]
    pub fn request_retrigger(&mut self, seed: Option<f32>) {
        self.pending = Some(Request::Retrigger(seed));
    }

    /// Set the starting amplitude of an envelope that has not produced a sample yet.
    pub fn seed(&mut self, amplitude: f32) {
        if self.stage == AdsrStage::Attack && self.elapsed == 0 {
            let a = if amplitude.is_finite() { clamp(amplitude, 0.0, 1.0) } else { 0.0 };
            self.start = a;
            self.value = a;
        }
    }

    /// Back to the start of Attack at the configured initial amplitude.
    pub fn reset(&mut self) {
        self.stage = AdsrStage::Attack;
        self.elapsed = 0;
        self.start = self.cfg.initial_amplitude;
        self.release_from = 0.0;
        self.value = self.cfg.initial_amplitude;
        self.pending = None;
    }

    /// Render one block. Returns the number of live samples; the tail after
    /// finishing is zero-filled.
    pub fn process(&mut self, out: &mut [f32]) -> usize {
        self.apply_pending();

        let mut written = 0;
        while written < out.len() {
            match self.next_sample() {
                Some(v) => out[written] = v,
                None => break,
            }
            written += 1;
        }
        // finish with the last sample, not one call later
        if self.only_empty_stages_left() {
            self.value = 0.0;
            self.enter(AdsrStage::Finished);
        }
        out[written..].fill(0.0);
        written
    }

    /// True when the current stage is used up and every stage after it has
    /// zero length, so no further sample can be emitted.
    fn only_empty_stages_left(&self) -> bool {
        let c = &self.cfg;
        match self.stage {
            AdsrStage::Attack => {
                self.elapsed >= c.attack && c.decay == 0 && c.sustain_max == 0 && c.release == 0
            }
            AdsrStage::Decay => self.elapsed >= c.decay && c.sustain_max == 0 && c.release == 0,
            AdsrStage::Sustain => self.elapsed >= c.sustain_max && c.release == 0,
            AdsrStage::Release => self.elapsed >= c.release,
            AdsrStage::Finished => false,
        }
    }

    fn apply_pending(&mut self) {
        match self.pending.take() {
            Some(Request::Release) => {
                if matches!(self.stage, AdsrStage::Attack | AdsrStage::Decay | AdsrStage::Sustain) {
                    self.enter_release();
                }
            }
            Some(Request::Retrigger(seed)) => {
                if self.stage == AdsrStage::Finished {
                    log::trace!("retrigger ignored: envelope already finished");
                } else {
                    let from = seed.filter(|s| s.is_finite()).unwrap_or(self.value);
                    self.start = clamp(from, 0.0, 1.0);
                    self.enter(AdsrStage::Attack);
                }
            }
            None => {}
        }
    }

    #[inline]
    fn enter(&mut self, stage: AdsrStage) {
        self.stage = stage;
        self.elapsed = 0;
    }

    #[inline]
    fn enter_release(&mut self) {
        self.release_from = self.value;
        self.enter(AdsrStage::Release);
    }

    #[inline]
    fn emit(&mut self, v: f32) -> Option<f32> {
        self.value = v;
        self.elapsed += 1;
        Some(v)
    }

    /// Next amplitude, crossing as many (possibly empty) stages as needed.
    fn next_sample(&mut self) -> Option<f32> {
        loop {
            match self.stage {
                AdsrStage::Attack => {
                    if self.elapsed >= self.cfg.attack {
                        self.enter(AdsrStage::Decay);
                    } else {
                        return self.emit(ramp(self.start, 1.0, self.elapsed, self.cfg.attack));
                    }
                }
                AdsrStage::Decay => {
                    if self.elapsed >= self.cfg.decay {
                        self.enter(AdsrStage::Sustain);
                    } else {
                        let v = ramp(1.0, self.cfg.sustain_level, self.elapsed, self.cfg.decay);
                        return self.emit(v);
                    }
                }
                AdsrStage::Sustain => {
                    if self.elapsed >= self.cfg.sustain_max {
                        // behaves exactly like a note-off at this sample
                        self.value = self.cfg.sustain_level;
                        self.enter_release();
                    } else {
                        return self.emit(self.cfg.sustain_level);
                    }
                }
                AdsrStage::Release => {
                    if self.elapsed >= self.cfg.release {
                        self.value = 0.0;
                        self.enter(AdsrStage::Finished);
                    } else {
                        let v = ramp(self.release_from, 0.0, self.elapsed, self.cfg.release);
                        return self.emit(v);
                    }
                }
                AdsrStage::Finished => return None,
            }
        }
    }
}

// ------------------------------------ Ramp ----------------------------------------

/// Linear ramp `start → end` over `duration` samples.
///
/// The last live sample is exactly `end`. A zero duration finishes on the
/// first block without emitting anything, holding `end` as its value.
#[derive(Copy, Clone, Debug)]
pub struct Ramp {
    start: f32,
    end: f32,
    duration: usize,
    elapsed: usize,
    value: f32,
}

impl Ramp {
    pub fn new(start: f32, end: f32, duration: usize) -> Result<Self> {
        for (name, value) in [("ramp start", start), ("ramp end", end)] {
            if !value.is_finite() {
                return Err(ConfigError::AmplitudeOutOfRange { name, value });
            }
        }
        let value = if duration == 0 { end } else { start };
        Ok(Self { start, end, duration, elapsed: 0, value })
    }

    #[inline] pub fn value(&self) -> f32 { self.value }
    #[inline] pub fn duration(&self) -> usize { self.duration }
    #[inline] pub fn position(&self) -> usize { self.elapsed }
    #[inline] pub fn is_finished(&self) -> bool { self.elapsed >= self.duration }

    /// Replace the start value of a ramp that has not produced a sample yet.
    pub fn seed(&mut self, start: f32) {
        if self.elapsed == 0 && self.duration > 0 && start.is_finite() {
            self.start = start;
            self.value = start;
        }
    }

    pub fn reset(&mut self) {
        self.elapsed = 0;
        self.value = if self.duration == 0 { self.end } else { self.start };
    }

    /// Render one block; returns the number of live samples (tail zero-filled).
    pub fn process(&mut self, out: &mut [f32]) -> usize {
        let live = self.duration.saturating_sub(self.elapsed).min(out.len());
        let last = self.duration.saturating_sub(1);
        for slot in &mut out[..live] {
            self.value = ramp(self.start, self.end, self.elapsed, last);
            *slot = self.value;
            self.elapsed += 1;
        }
        out[live..].fill(0.0);
        live
    }
}

// ------------------------------------ Tests --------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use rand::{rngs::StdRng, Rng, SeedableRng};

    fn render_all(env: &mut Adsr, frame: usize, limit: usize) -> Vec<f32> {
        let mut out = Vec::new();
        let mut buf = vec![0.0f32; frame];
        while !env.is_finished() && out.len() < limit {
            let n = env.process(&mut buf);
            out.extend_from_slice(&buf[..n]);
        }
        out
    }

    fn scenario() -> AdsrConfig {
        AdsrConfig::new(100, 200, 0.7, 2000, 300)
    }

    #[test]
    fn full_envelope_hits_documented_samples() {
        let mut env = Adsr::new(scenario()).unwrap();
        let trace = render_all(&mut env, 64, 10_000);

        assert_eq!(trace.len(), 2600);
        assert_eq!(trace[0], 0.0);
        assert_eq!(trace[100], 1.0);
        assert_abs_diff_eq!(trace[300], 0.7);
        assert_abs_diff_eq!(trace[2299], 0.7);
        // auto-release starts at 2300 from the sustain level
        assert_abs_diff_eq!(trace[2300], 0.7);
        assert!(trace[2301] < 0.7);
        assert!(trace[2599] > 0.0 && trace[2599] < 0.01);
        assert!(env.is_finished());
        assert_eq!(env.value(), 0.0);

        let mut buf = [1.0f32; 16];
        assert_eq!(env.process(&mut buf), 0);
        assert!(buf.iter().all(|&s| s == 0.0));
    }

    #[test]
    fn stage_boundaries_inside_a_block_lose_no_samples() {
        let reference = render_all(&mut Adsr::new(scenario()).unwrap(), 1, 10_000);
        for frame in [7, 32, 64, 333, 4096] {
            let trace = render_all(&mut Adsr::new(scenario()).unwrap(), frame, 10_000);
            assert_eq!(trace, reference, "frame={frame}");
        }
    }

    #[test]
    fn early_release_during_attack_starts_from_current_amplitude() {
        let mut env = Adsr::new(scenario()).unwrap();
        let mut buf = [0.0f32; 50];
        env.process(&mut buf);
        let before = env.value();
        assert_abs_diff_eq!(before, 0.49, epsilon = 1e-6);

        env.request_release();
        // still attacking until the next block boundary
        assert_eq!(env.stage(), AdsrStage::Attack);

        let rest = render_all(&mut env, 50, 10_000);
        assert_eq!(rest.len(), 300, "release ends at sample 350");
        assert_abs_diff_eq!(rest[0], before);
        assert!(rest.windows(2).all(|w| w[1] <= w[0]));
    }

    #[test]
    fn early_release_during_decay_is_continuous() {
        let mut env = Adsr::new(scenario()).unwrap();
        let mut buf = [0.0f32; 150];
        env.process(&mut buf);
        assert_eq!(env.stage(), AdsrStage::Decay);
        let last = buf[149];

        env.request_release();
        env.process(&mut buf);
        assert_eq!(env.stage(), AdsrStage::Release);
        assert_abs_diff_eq!(buf[0], last);
    }

    #[test]
    fn release_is_idempotent_once_releasing() {
        let cfg = AdsrConfig::new(10, 10, 0.5, 1000, 40);
        let mut a = Adsr::new(cfg).unwrap();
        let mut b = Adsr::new(cfg).unwrap();
        let (mut fa, mut fb) = ([0.0f32; 10], [0.0f32; 10]);
        for i in 0..12 {
            if i == 3 {
                a.request_release();
                b.request_release();
            }
            if i > 3 {
                // repeated note-offs during Release/Finished change nothing
                b.request_release();
            }
            a.process(&mut fa);
            b.process(&mut fb);
            assert_eq!(fa, fb, "block {i}");
        }
        assert!(a.is_finished() && b.is_finished());
    }

    #[test]
    fn sustain_max_releases_exactly_on_time() {
        let cfg = AdsrConfig::new(10, 10, 0.5, 37, 10);
        let trace = render_all(&mut Adsr::new(cfg).unwrap(), 16, 1000);
        // sustain occupies samples 20..57, release starts at 57
        assert!(trace[20..57].iter().all(|&s| s == 0.5));
        assert_eq!(trace[57], 0.5);
        assert!(trace[58] < 0.5);
        assert_eq!(trace.len(), 67);
    }

    #[test]
    fn zero_length_stages_jump_instantly() {
        let cfg = AdsrConfig::new(0, 0, 0.6, 5, 0);
        let mut env = Adsr::new(cfg).unwrap();
        let mut buf = [9.0f32; 8];
        let n = env.process(&mut buf);
        assert_eq!(n, 5);
        assert_eq!(&buf[..5], &[0.6; 5]);
        assert_eq!(&buf[5..], &[0.0; 3]);
        assert!(env.is_finished());
    }

    #[test]
    fn trailing_empty_stages_finish_on_the_block_edge() {
        let mut env = Adsr::new(AdsrConfig::new(4, 0, 0.5, 0, 0)).unwrap();
        let mut buf = [0.0f32; 4];
        assert_eq!(env.process(&mut buf), 4);
        assert!(env.is_finished());
        assert_eq!(env.value(), 0.0);

        let mut env = Adsr::new(AdsrConfig::new(2, 2, 0.5, 0, 0)).unwrap();
        assert_eq!(env.process(&mut buf), 4);
        assert!(env.is_finished());

        // a stage with samples left keeps it running
        let mut env = Adsr::new(AdsrConfig::new(4, 0, 0.5, 0, 1)).unwrap();
        assert_eq!(env.process(&mut buf), 4);
        assert_eq!(env.stage(), AdsrStage::Attack);
        assert_eq!(env.process(&mut buf), 1);
        assert!(env.is_finished());
    }

    #[test]
    fn zero_release_finishes_at_note_off() {
        let mut env = Adsr::new(AdsrConfig::new(4, 4, 0.5, 100, 0)).unwrap();
        let mut buf = [0.0f32; 10];
        env.process(&mut buf);
        env.request_release();
        assert_eq!(env.process(&mut buf), 0);
        assert!(env.is_finished());
    }

    #[test]
    fn initial_amplitude_and_seed_set_the_attack_start() {
        let mut env = Adsr::new(scenario().with_initial_amplitude(0.5)).unwrap();
        let mut buf = [0.0f32; 4];
        env.process(&mut buf);
        assert_eq!(buf[0], 0.5);

        let mut seeded = Adsr::new(scenario()).unwrap();
        seeded.seed(0.8);
        assert_eq!(seeded.value(), 0.8);
        seeded.process(&mut buf);
        assert_eq!(buf[0], 0.8);
        assert!(buf[1] > 0.8);

        // too late once samples exist
        seeded.seed(0.1);
        assert!(seeded.value() > 0.8);
    }

    #[test]
    fn retrigger_restarts_attack_without_a_jump() {
        let mut env = Adsr::new(AdsrConfig::new(10, 10, 0.4, 1000, 10)).unwrap();
        let mut buf = [0.0f32; 30];
        env.process(&mut buf);
        assert_eq!(env.stage(), AdsrStage::Sustain);

        env.request_retrigger(None);
        env.process(&mut buf[..5]);
        assert_eq!(env.stage(), AdsrStage::Attack);
        assert_abs_diff_eq!(buf[0], 0.4);

        env.request_retrigger(Some(0.0));
        env.process(&mut buf[..1]);
        assert_eq!(buf[0], 0.0);
    }

    #[test]
    fn reset_restores_the_initial_state() {
        let mut env = Adsr::new(AdsrConfig::new(10, 10, 0.5, 10, 10)).unwrap();
        render_all(&mut env, 16, 1000);
        assert!(env.is_finished());
        env.reset();
        assert_eq!(env.stage(), AdsrStage::Attack);
        assert_eq!(env.value(), 0.0);
        assert_eq!(env.elapsed(), 0);
    }

    #[test]
    fn amplitude_bounded_for_random_release_timings() {
        let mut rng = StdRng::seed_from_u64(0x5eed);
        for _ in 0..200 {
            let cfg = AdsrConfig::new(
                rng.gen_range(0..300),
                rng.gen_range(0..300),
                rng.gen_range(0.0..=1.0),
                rng.gen_range(0..500),
                rng.gen_range(0..300),
            )
            .with_initial_amplitude(rng.gen_range(0.0..=1.0));
            let frame = rng.gen_range(1..80);
            let release_block = rng.gen_range(0..40);

            let mut env = Adsr::new(cfg).unwrap();
            let mut buf = vec![0.0f32; frame];
            let mut block = 0;
            let mut prev: Option<f32> = None;
            while !env.is_finished() {
                if block == release_block {
                    env.request_release();
                }
                let was_releasing = env.stage() == AdsrStage::Release;
                let n = env.process(&mut buf);
                for &s in &buf[..n] {
                    assert!((0.0..=1.0).contains(&s), "sample {s} out of range for {cfg:?}");
                }
                // switching into Release never jumps
                if block == release_block && !was_releasing && n > 0 {
                    if let Some(p) = prev {
                        assert!((buf[0] - p).abs() < 1e-6, "jump {p} -> {}", buf[0]);
                    }
                }
                if n > 0 {
                    prev = Some(buf[n - 1]);
                }
                block += 1;
                assert!(block < 10_000);
            }
        }
    }

    #[test]
    fn millis_are_resolved_once() {
        let ms = AdsrMillis {
            attack_ms: 100.0,
            decay_ms: 200.0,
            sustain_level: 0.7,
            sustain_max_ms: 2000.0,
            release_ms: 300.0,
            initial_amplitude: 0.0,
        };
        let cfg = EnvelopeSpec::from(ms).resolve(1000.0).unwrap();
        assert_eq!(cfg, scenario());
        assert_eq!(cfg.total_samples(), 2600);
    }

    #[test]
    fn invalid_levels_are_rejected() {
        let bad = AdsrConfig::new(1, 1, 1.5, 1, 1);
        assert_eq!(Adsr::new(bad).unwrap_err(), ConfigError::SustainOutOfRange(1.5));
        let bad = AdsrConfig::new(1, 1, 0.5, 1, 1).with_initial_amplitude(-0.1);
        assert!(matches!(Adsr::new(bad), Err(ConfigError::AmplitudeOutOfRange { .. })));
        let bad = AdsrMillis {
            attack_ms: -5.0,
            decay_ms: 1.0,
            sustain_level: 0.5,
            sustain_max_ms: 1.0,
            release_ms: 1.0,
            initial_amplitude: 0.0,
        };
        assert!(matches!(
            bad.to_samples(48_000.0),
            Err(ConfigError::InvalidDuration { name: "attack", .. })
        ));
    }

    #[cfg(feature = "serde")]
    #[test]
    fn envelope_spec_accepts_both_conventions() {
        let s: EnvelopeSpec = serde_json::from_str(
            r#"{"attack":100,"decay":200,"sustain_level":0.7,"sustain_max":2000,"release":300}"#,
        )
        .unwrap();
        assert_eq!(s, EnvelopeSpec::Samples(scenario()));

        let m: EnvelopeSpec = serde_json::from_str(
            r#"{"attack_ms":10,"decay_ms":20,"sustain_level":0.5,"sustain_max_ms":100,"release_ms":30}"#,
        )
        .unwrap();
        assert_eq!(m.resolve(10_000.0).unwrap(), AdsrConfig::new(100, 200, 0.5, 1000, 300));
    }

    #[test]
    fn ramp_ends_exactly_on_target() {
        let mut r = Ramp::new(0.0, 0.8, 50).unwrap();
        let mut buf = [0.0f32; 64];
        let n = r.process(&mut buf);
        assert_eq!(n, 50);
        assert_eq!(buf[0], 0.0);
        assert_eq!(buf[49], 0.8);
        assert!(buf[50..].iter().all(|&s| s == 0.0));
        assert!(r.is_finished());
        assert_eq!(r.value(), 0.8);
    }

    #[test]
    fn ramp_across_blocks_and_reset() {
        let mut r = Ramp::new(1.0, 0.0, 10).unwrap();
        let mut a = [0.0f32; 4];
        assert_eq!(r.process(&mut a), 4);
        assert_eq!(a[0], 1.0);
        let mut b = [0.0f32; 8];
        assert_eq!(r.process(&mut b), 6);
        assert_eq!(b[5], 0.0);
        assert!(r.is_finished());

        r.reset();
        assert_eq!(r.position(), 0);
        let mut c = [0.0f32; 4];
        r.process(&mut c);
        assert_eq!(a, c);
    }

    #[test]
    fn degenerate_ramps() {
        let mut r = Ramp::new(0.2, 0.6, 0).unwrap();
        assert!(r.is_finished());
        assert_eq!(r.value(), 0.6);
        let mut buf = [1.0f32; 3];
        assert_eq!(r.process(&mut buf), 0);

        let mut one = Ramp::new(0.2, 0.6, 1).unwrap();
        assert_eq!(one.process(&mut buf), 1);
        assert_eq!(buf[0], 0.6);

        assert!(Ramp::new(f32::NAN, 0.0, 4).is_err());
    }
}
