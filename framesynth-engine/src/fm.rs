//! FM synthesis voice: a sine carrier whose phase is pushed around by a
//! weighted sum of harmonic oscillators.
//!
//! Per sample `n`:
//!
//! ```text
//! index = depth * mod_env[n] * Σ a_i · sin(θ_i)      θ_i advances by m_i · Δθ
//! y     = sin(θ + index) * wav_env[n]                θ   advances by Δθ
//! ```
//!
//! The two envelopes run on independent timelines. The voice is Finished
//! once both are.

use framesynth_core::dsp::{fast_sin, samples_from_millis, wrap_phase, TAU};
use framesynth_core::envelopes::{Adsr, AdsrConfig, EnvelopeSpec};
use framesynth_core::error::{ConfigError, ConsistencyWarning, Result};

use crate::graph::{Advance, Engine, Generator, Lifecycle, Trigger};

/// Phase increment (radians/sample) for a carrier frequency.
pub fn phase_per_sample_for(frequency_hz: f32, sample_rate: f32) -> Result<f32> {
    if !sample_rate.is_finite() || sample_rate <= 0.0 {
        return Err(ConfigError::InvalidSampleRate(sample_rate));
    }
    let inc = TAU * frequency_hz / sample_rate;
    check_phase_increment(inc)?;
    Ok(inc)
}

fn check_phase_increment(inc: f32) -> Result<()> {
    if inc.is_finite() && inc > 0.0 && inc < core::f32::consts::PI {
        Ok(())
    } else {
        Err(ConfigError::InvalidPhaseIncrement(inc))
    }
}

// ---- Parameters ----

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FmParams {
    /// Frequency multipliers of the modulating harmonics.
    pub harmonics: Vec<f32>,
    /// One amplitude per harmonic.
    pub amplitudes: Vec<f32>,
    /// Carrier increment in radians per sample, in (0, π).
    pub phase_per_sample: f32,
    pub modulation_depth: f32,
}

impl FmParams {
    pub fn validate(&self) -> Result<()> {
        if self.harmonics.len() != self.amplitudes.len() {
            return Err(ConfigError::LengthMismatch {
                harmonics: self.harmonics.len(),
                amplitudes: self.amplitudes.len(),
            });
        }
        for (index, &m) in self.harmonics.iter().enumerate() {
            if !m.is_finite() || m <= 0.0 {
                return Err(ConfigError::InvalidHarmonic { index, value: m });
            }
        }
        for (index, &a) in self.amplitudes.iter().enumerate() {
            if !a.is_finite() {
                return Err(ConfigError::InvalidHarmonic { index, value: a });
            }
        }
        check_phase_increment(self.phase_per_sample)?;
        if !self.modulation_depth.is_finite() || self.modulation_depth < 0.0 {
            return Err(ConfigError::InvalidModulationDepth(self.modulation_depth));
        }
        Ok(())
    }
}

// ---- Voice ----

#[derive(Clone, Debug)]
pub struct FmVoice {
    params: FmParams,
    carrier: f64,
    /// (phase, increment) per harmonic.
    partials: Vec<(f64, f64)>,
    mod_env: Adsr,
    wav_env: Adsr,
    mod_buf: Vec<f32>,
    wav_buf: Vec<f32>,
    warning: Option<ConsistencyWarning>,
    last_sample: f32,
}

impl FmVoice {
    /// Validate everything up front; nothing is built on error.
    pub fn new(params: FmParams, modulation: AdsrConfig, waveform: AdsrConfig) -> Result<Self> {
        params.validate()?;
        let mod_env = Adsr::new(modulation)?;
        let wav_env = Adsr::new(waveform)?;

        let warning = (modulation.total_samples() != waveform.total_samples()).then(|| {
            ConsistencyWarning::EnvelopeLengthMismatch {
                modulation: modulation.total_samples(),
                waveform: waveform.total_samples(),
            }
        });
        if let Some(w) = &warning {
            log::warn!("fm voice: {w}");
        }

        let inc = f64::from(params.phase_per_sample);
        let partials = params.harmonics.iter().map(|&m| (0.0, inc * f64::from(m))).collect();

        Ok(Self {
            params,
            carrier: 0.0,
            partials,
            mod_env,
            wav_env,
            mod_buf: Vec::new(),
            wav_buf: Vec::new(),
            warning,
            last_sample: 0.0,
        })
    }

    #[inline] pub fn params(&self) -> &FmParams { &self.params }
    #[inline] pub fn consistency_warning(&self) -> Option<ConsistencyWarning> { self.warning }
    /// Last carrier sample (after the waveform envelope).
    #[inline] pub fn last_sample(&self) -> f32 { self.last_sample }
    #[inline] pub fn modulation_envelope(&self) -> &Adsr { &self.mod_env }
    #[inline] pub fn waveform_envelope(&self) -> &Adsr { &self.wav_env }

    /// Nominal length: the longer of the two envelopes.
    pub fn total_samples(&self) -> usize {
        self.mod_env.total_samples().max(self.wav_env.total_samples())
    }

    fn modulation_sum(&mut self) -> f64 {
        let mut sum = 0.0f64;
        for ((phase, inc), &amp) in self.partials.iter_mut().zip(&self.params.amplitudes) {
            #[allow(clippy::cast_possible_truncation)]
            let s = fast_sin(*phase as f32);
            sum += f64::from(amp) * f64::from(s);
            *phase = wrap_phase(*phase + *inc);
        }
        sum
    }
}

impl Generator for FmVoice {
    fn advance(&mut self, out: &mut [f32]) -> Advance {
        let n = out.len();
        if self.mod_buf.len() < n {
            self.mod_buf.resize(n, 0.0);
            self.wav_buf.resize(n, 0.0);
        }
        let mod_live = self.mod_env.process(&mut self.mod_buf[..n]);
        let wav_live = self.wav_env.process(&mut self.wav_buf[..n]);

        let depth = f64::from(self.params.modulation_depth);
        let inc = f64::from(self.params.phase_per_sample);
        for i in 0..n {
            let index = depth * f64::from(self.mod_buf[i]) * self.modulation_sum();
            let theta = wrap_phase(self.carrier + index);
            #[allow(clippy::cast_possible_truncation)]
            let y = fast_sin(theta as f32) * self.wav_buf[i];
            out[i] = y;
            self.carrier = wrap_phase(self.carrier + inc);
        }
        if wav_live > 0 {
            self.last_sample = out[wav_live - 1];
        }

        if self.lifecycle() == Lifecycle::Finished {
            let written = mod_live.max(wav_live);
            out[written..].fill(0.0);
            Advance::finished(written)
        } else {
            Advance::active(n)
        }
    }

    fn notify(&mut self, trigger: Trigger) {
        match trigger {
            Trigger::Release => {
                self.mod_env.request_release();
                self.wav_env.request_release();
            }
            Trigger::Start { seed } => {
                self.mod_env.request_retrigger(None);
                self.wav_env.request_retrigger(seed);
            }
        }
    }

    #[inline] fn current_value(&self) -> f32 { self.wav_env.value() }

    #[inline]
    fn lifecycle(&self) -> Lifecycle {
        if self.mod_env.is_finished() && self.wav_env.is_finished() {
            Lifecycle::Finished
        } else {
            Lifecycle::Active
        }
    }

    #[inline] fn seed(&mut self, value: f32) { self.wav_env.seed(value) }
}

// ---- Patch ----

/// FM configuration as found in a patch file.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FmPatch {
    pub sample_rate: f32,
    /// Silence before and after the note.
    #[cfg_attr(feature = "serde", serde(default))]
    pub silence_padding_seconds: f32,
    pub harmonics: Vec<f32>,
    pub amplitudes: Vec<f32>,
    /// Carrier increment; takes precedence over `frequency_hz`.
    #[cfg_attr(feature = "serde", serde(default))]
    pub phase_per_sample: Option<f32>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub frequency_hz: Option<f32>,
    pub modulation_depth: f32,
    pub modulation_envelope: EnvelopeSpec,
    pub waveform_envelope: EnvelopeSpec,
}

impl FmPatch {
    pub fn params(&self) -> Result<FmParams> {
        let phase_per_sample = match (self.phase_per_sample, self.frequency_hz) {
            (Some(p), _) => p,
            (None, Some(f)) => phase_per_sample_for(f, self.sample_rate)?,
            (None, None) => return Err(ConfigError::InvalidPhaseIncrement(0.0)),
        };
        let params = FmParams {
            harmonics: self.harmonics.clone(),
            amplitudes: self.amplitudes.clone(),
            phase_per_sample,
            modulation_depth: self.modulation_depth,
        };
        params.validate()?;
        Ok(params)
    }

    pub fn build(&self) -> Result<FmVoice> {
        if !self.sample_rate.is_finite() || self.sample_rate <= 0.0 {
            return Err(ConfigError::InvalidSampleRate(self.sample_rate));
        }
        let params = self.params()?;
        let modulation = self.modulation_envelope.resolve(self.sample_rate)?;
        let waveform = self.waveform_envelope.resolve(self.sample_rate)?;
        FmVoice::new(params, modulation, waveform)
    }

    pub fn silence_padding_samples(&self) -> Result<usize> {
        samples_from_millis("silence_padding", self.silence_padding_seconds * 1000.0, self.sample_rate)
    }

    /// Render the whole note with silence on both sides.
    ///
    /// `budget` caps the note itself, not the padding.
    pub fn render_padded(&self, frame_size: usize, budget: Option<usize>) -> Result<Vec<f32>> {
        self.render_padded_with(self.build()?, frame_size, budget)
    }

    /// [`render_padded`](Self::render_padded) for a voice already built from this patch.
    pub fn render_padded_with(&self, voice: FmVoice, frame_size: usize, budget: Option<usize>) -> Result<Vec<f32>> {
        let pad = self.silence_padding_samples()?;
        let mut engine = Engine::new(voice, frame_size, self.sample_rate)?;
        let note = engine.render(budget);

        let mut out = vec![0.0f32; pad];
        out.extend_from_slice(&note);
        out.resize(out.len() + pad, 0.0);
        log::info!(
            "fm patch rendered: {} note samples, {} padding samples per side",
            note.len(),
            pad
        );
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(harmonics: Vec<f32>, amplitudes: Vec<f32>) -> FmParams {
        FmParams { harmonics, amplitudes, phase_per_sample: 0.05, modulation_depth: 1.0 }
    }

    fn env(len: usize) -> AdsrConfig {
        AdsrConfig::new(len / 4, len / 4, 0.7, len / 4, len - 3 * (len / 4))
    }

    #[test]
    fn length_mismatch_fails_before_any_sample() {
        let err = FmVoice::new(params(vec![2.0, 7.0, 20.0], vec![1.0, 2.0]), env(400), env(400)).unwrap_err();
        assert_eq!(err, ConfigError::LengthMismatch { harmonics: 3, amplitudes: 2 });
    }

    #[test]
    fn parameter_validation() {
        let mut p = params(vec![2.0, -1.0], vec![1.0, 1.0]);
        assert_eq!(p.validate(), Err(ConfigError::InvalidHarmonic { index: 1, value: -1.0 }));
        p.harmonics[1] = 3.0;
        p.phase_per_sample = 4.0;
        assert!(matches!(p.validate(), Err(ConfigError::InvalidPhaseIncrement(_))));
        p.phase_per_sample = 0.1;
        p.modulation_depth = -2.0;
        assert_eq!(p.validate(), Err(ConfigError::InvalidModulationDepth(-2.0)));
        p.modulation_depth = 0.0;
        assert_eq!(p.validate(), Ok(()));
    }

    #[test]
    fn zero_depth_is_a_plain_enveloped_sine() {
        let mut p = params(vec![2.0], vec![1.0]);
        p.modulation_depth = 0.0;
        let mut v = FmVoice::new(p, env(400), AdsrConfig::new(0, 0, 1.0, 64, 0)).unwrap();
        let mut buf = [0.0f32; 64];
        v.advance(&mut buf);
        for (i, &s) in buf.iter().enumerate() {
            let expected = (0.05f64 * i as f64).sin() as f32;
            assert!((s - expected).abs() < 2e-3, "i={i} got {s} want {expected}");
        }
    }

    #[test]
    fn finished_only_when_both_envelopes_are() {
        let mut v = FmVoice::new(params(vec![2.0], vec![1.0]), env(100), env(40)).unwrap();
        assert!(v.consistency_warning().is_some());
        let mut buf = [0.0f32; 64];
        assert_eq!(v.advance(&mut buf).lifecycle, Lifecycle::Active);
        assert!(v.waveform_envelope().is_finished());
        // waveform done: output is silent while the modulation tail runs out
        assert!(buf[40..].iter().all(|&s| s == 0.0));
        assert_eq!(v.advance(&mut buf), Advance::finished(36));
    }

    #[test]
    fn matching_lengths_raise_no_warning() {
        let v = FmVoice::new(params(vec![1.5], vec![0.3]), env(200), env(200)).unwrap();
        assert_eq!(v.consistency_warning(), None);
        assert_eq!(v.total_samples(), 200);
    }

    #[test]
    fn output_is_bounded_by_the_waveform_envelope() {
        let mut v = FmVoice::new(params(vec![2.0, 7.0, 20.0], vec![1.0, 2.0, 0.5]), env(400), env(400)).unwrap();
        let mut buf = [0.0f32; 32];
        let mut peak = 0.0f32;
        loop {
            let adv = v.advance(&mut buf);
            peak = buf.iter().fold(peak, |m, s| m.max(s.abs()));
            if adv.is_finished() {
                break;
            }
        }
        assert!(peak > 0.1 && peak <= 1.0 + 1e-3);
    }

    #[test]
    fn release_reaches_both_envelopes() {
        let mut v = FmVoice::new(params(vec![2.0], vec![1.0]), env(4000), env(4000)).unwrap();
        let mut buf = [0.0f32; 16];
        v.advance(&mut buf);
        v.notify(Trigger::Release);
        v.advance(&mut buf);
        assert_eq!(v.modulation_envelope().stage(), framesynth_core::envelopes::AdsrStage::Release);
        assert_eq!(v.waveform_envelope().stage(), framesynth_core::envelopes::AdsrStage::Release);
    }

    #[test]
    fn frequency_helper() {
        let inc = phase_per_sample_for(440.0, 44_100.0).unwrap();
        assert!((inc - TAU * 440.0 / 44_100.0).abs() < 1e-7);
        assert!(phase_per_sample_for(30_000.0, 44_100.0).is_err());
        assert!(phase_per_sample_for(440.0, 0.0).is_err());
    }

    #[test]
    fn patch_pads_both_sides() {
        let patch = FmPatch {
            sample_rate: 1000.0,
            silence_padding_seconds: 0.1,
            harmonics: vec![2.0],
            amplitudes: vec![1.0],
            phase_per_sample: None,
            frequency_hz: Some(50.0),
            modulation_depth: 2.0,
            modulation_envelope: AdsrConfig::new(10, 10, 0.5, 10, 10).into(),
            waveform_envelope: AdsrConfig::new(10, 10, 0.5, 10, 10).into(),
        };
        let out = patch.render_padded(16, None).unwrap();
        assert_eq!(out.len(), 100 + 40 + 100);
        assert!(out[..100].iter().all(|&s| s == 0.0));
        assert!(out[140..].iter().all(|&s| s == 0.0));
        assert!(out[100..140].iter().any(|&s| s != 0.0));

        // one build is enough: a prebuilt voice renders the same padded note
        let voice = patch.build().unwrap();
        assert_eq!(patch.render_padded_with(voice, 16, None).unwrap(), out);
    }

    #[test]
    fn patch_without_pitch_is_rejected() {
        let patch = FmPatch {
            sample_rate: 1000.0,
            silence_padding_seconds: 0.0,
            harmonics: vec![],
            amplitudes: vec![],
            phase_per_sample: None,
            frequency_hz: None,
            modulation_depth: 0.0,
            modulation_envelope: AdsrConfig::new(1, 1, 0.5, 1, 1).into(),
            waveform_envelope: AdsrConfig::new(1, 1, 0.5, 1, 1).into(),
        };
        assert!(matches!(patch.build(), Err(ConfigError::InvalidPhaseIncrement(_))));
    }
}
