//! framesynth CLI — offline renderer.
//!
//! Subcommands
//! - `fm`       : render an FM patch (JSON) to a 16-bit WAV file
//! - `envelope` : print an ADSR trace as CSV (`sample,stage,amplitude`)
//! - `arpeggio` : sequencer + pool demo, rendered to WAV

use std::error::Error;
use std::fs;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand};
use framesynth_core::envelopes::{AdsrConfig, AdsrMillis, AdsrStage};
use framesynth_core::error::ConfigError;
use framesynth_core::frame::DEFAULT_FRAME_SIZE;
use framesynth_engine::{
    note_frequency, phase_per_sample_for, Cue, Engine, EnvelopeVoice, FmParams, FmPatch, FmVoice,
    Generator, Lifecycle, NoteOn, Pool, Sequencer, Trigger, Voice,
};

#[derive(Parser)]
#[command(name = "framesynth")]
#[command(about = "Frame-synchronous synthesis: FM patches, envelope traces, sequencer demo")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Render an FM patch file to WAV
    Fm {
        /// Patch file (JSON)
        #[arg(short, long)]
        patch: PathBuf,

        /// Output WAV file
        #[arg(short, long)]
        out: PathBuf,

        #[arg(long, default_value_t = DEFAULT_FRAME_SIZE)]
        frame_size: usize,

        /// Cap the note length (padding not included)
        #[arg(long)]
        max_seconds: Option<f32>,
    },

    /// Print an envelope trace as CSV on stdout
    Envelope(EnvelopeArgs),

    /// Render an arpeggio through the sequencer
    Arpeggio {
        #[arg(short, long)]
        out: PathBuf,

        /// Frequency of C in octave 1
        #[arg(long, default_value_t = 110.0)]
        base_hz: f32,

        #[arg(long, default_value_t = 8)]
        notes: u32,

        #[arg(long, default_value_t = 44_100)]
        sample_rate: u32,

        #[arg(long, default_value_t = DEFAULT_FRAME_SIZE)]
        frame_size: usize,
    },
}

#[derive(Args)]
struct EnvelopeArgs {
    #[arg(long)]
    attack: f32,
    #[arg(long)]
    decay: f32,
    #[arg(long)]
    sustain: f32,
    #[arg(long)]
    sustain_max: f32,
    #[arg(long)]
    release: f32,
    #[arg(long, default_value_t = 0.0)]
    initial: f32,

    /// Durations are milliseconds instead of samples
    #[arg(long)]
    millis: bool,

    #[arg(long, default_value_t = 44_100.0)]
    sample_rate: f32,

    /// Deliver a note-off at the first frame boundary at or after this sample
    #[arg(long)]
    release_at: Option<u64>,

    #[arg(long, default_value_t = DEFAULT_FRAME_SIZE)]
    frame_size: usize,
}

impl EnvelopeArgs {
    fn config(&self) -> Result<AdsrConfig, Box<dyn Error>> {
        let cfg = if self.millis {
            AdsrMillis {
                attack_ms: self.attack,
                decay_ms: self.decay,
                sustain_level: self.sustain,
                sustain_max_ms: self.sustain_max,
                release_ms: self.release,
                initial_amplitude: self.initial,
            }
            .to_samples(self.sample_rate)?
        } else {
            AdsrConfig {
                attack: whole_samples("attack", self.attack)?,
                decay: whole_samples("decay", self.decay)?,
                sustain_level: self.sustain,
                sustain_max: whole_samples("sustain-max", self.sustain_max)?,
                release: whole_samples("release", self.release)?,
                initial_amplitude: self.initial,
            }
        };
        cfg.validate()?;
        Ok(cfg)
    }
}

fn whole_samples(name: &str, v: f32) -> Result<usize, Box<dyn Error>> {
    if !v.is_finite() || v < 0.0 || v.fract() != 0.0 {
        return Err(format!("--{name} must be a whole number of samples, got {v}").into());
    }
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let n = v as usize;
    Ok(n)
}

fn stage_name(stage: AdsrStage) -> &'static str {
    match stage {
        AdsrStage::Attack => "attack",
        AdsrStage::Decay => "decay",
        AdsrStage::Sustain => "sustain",
        AdsrStage::Release | AdsrStage::Finished => "release",
    }
}

fn write_wav(path: &Path, samples: &[f32], sample_rate: u32) -> Result<(), Box<dyn Error>> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(path, spec)?;
    for &s in samples {
        #[allow(clippy::cast_possible_truncation)]
        let pcm = (s.clamp(-1.0, 1.0) * f32::from(i16::MAX)) as i16;
        writer.write_sample(pcm)?;
    }
    writer.finalize()?;
    log::info!("wrote {} samples to {}", samples.len(), path.display());
    Ok(())
}

fn wav_rate(sample_rate: f32) -> Result<u32, Box<dyn Error>> {
    if sample_rate.fract() != 0.0 || !(1.0..=384_000.0).contains(&sample_rate) {
        return Err(format!("sample rate {sample_rate} cannot be written to WAV").into());
    }
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let rate = sample_rate as u32;
    Ok(rate)
}

// ---- Subcommands ----

fn run_fm(patch: &Path, out: &Path, frame_size: usize, max_seconds: Option<f32>) -> Result<(), Box<dyn Error>> {
    let text = fs::read_to_string(patch)?;
    let patch: FmPatch = serde_json::from_str(&text)?;
    let rate = wav_rate(patch.sample_rate)?;

    // config errors surface here; a consistency warning is logged once by the build
    let voice = patch.build()?;

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let budget = max_seconds.map(|s| (s.max(0.0) * patch.sample_rate) as usize);
    let samples = patch.render_padded_with(voice, frame_size, budget)?;
    write_wav(out, &samples, rate)
}

fn run_envelope(args: &EnvelopeArgs) -> Result<(), Box<dyn Error>> {
    let cfg = args.config()?;
    if args.frame_size == 0 {
        return Err(ConfigError::InvalidFrameSize(0).into());
    }
    let mut voice = EnvelopeVoice::new(cfg)?;
    let mut released = false;

    let stdout = io::stdout();
    let mut w = BufWriter::new(stdout.lock());
    writeln!(w, "sample,stage,amplitude")?;

    let mut one = [0.0f32; 1];
    let mut sample: u64 = 0;
    let mut boundary: u64 = 0;
    let mut prev = stage_name(voice.stage());
    while voice.lifecycle() != Lifecycle::Finished {
        if !released && args.release_at.is_some_and(|at| boundary >= at) {
            voice.notify(Trigger::Release);
            released = true;
        }
        // one-sample steps so every row carries its stage; a queued release
        // is still consumed by the first step, i.e. at the frame boundary
        for _ in 0..args.frame_size {
            if voice.advance(&mut one).written == 0 {
                break;
            }
            // without a release stage the last sample belongs to the stage before it
            let stage = match voice.stage() {
                AdsrStage::Finished if cfg.release == 0 => prev,
                s => stage_name(s),
            };
            writeln!(w, "{sample},{stage},{:.6}", one[0])?;
            prev = stage;
            sample += 1;
        }
        boundary += args.frame_size as u64;
    }
    w.flush()?;
    log::info!("envelope trace: {sample} samples (nominal {})", cfg.total_samples());
    Ok(())
}

fn arpeggio_voice(note: &NoteOn, sample_rate: f32) -> framesynth_core::error::Result<Voice> {
    let env = AdsrMillis {
        attack_ms: 20.0,
        decay_ms: 120.0,
        sustain_level: 0.6,
        sustain_max_ms: 2_000.0,
        release_ms: 250.0,
        initial_amplitude: 0.0,
    }
    .to_samples(sample_rate)?;
    let params = FmParams {
        harmonics: vec![2.0, 5.0, 9.0],
        amplitudes: vec![1.0, 2.0, 1.0],
        phase_per_sample: phase_per_sample_for(note.frequency_hz, sample_rate)?,
        modulation_depth: 1.0,
    };
    Ok(Voice::Fm(FmVoice::new(params, env, env)?))
}

fn run_arpeggio(out: &Path, base_hz: f32, notes: u32, sample_rate: u32, frame_size: usize) -> Result<(), Box<dyn Error>> {
    const PATTERN: [i32; 4] = [0, 4, 7, 12];
    #[allow(clippy::cast_precision_loss)]
    let sr = sample_rate as f32;
    let step = u64::from(sample_rate / 5);
    let hold = u64::from(sample_rate / 4);

    let pool = Pool::new().with_soft_clip(true);
    let mut seq = Sequencer::with_pool(pool, |n: &NoteOn| arpeggio_voice(n, sr));
    for i in 0..notes {
        let idx = i as usize % PATTERN.len();
        #[allow(clippy::cast_possible_wrap)]
        let octave = 3 + (i as usize / PATTERN.len()) as i32 % 2;
        let freq = note_frequency(base_hz, octave, PATTERN[idx]);
        let at = u64::from(i) * step;
        seq.schedule(Cue::note_on(at, i, freq));
        seq.schedule(Cue::note_off(at + hold, i));
    }

    let mut engine = Engine::new(seq, frame_size, sr)?;
    let samples: Vec<f32> = engine.render(None).into_iter().map(|s| s * 0.5).collect();
    log::info!("arpeggio: {notes} notes, {:.2}s", engine.time());
    write_wav(out, &samples, sample_rate)
}

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    match cli.command {
        Command::Fm { patch, out, frame_size, max_seconds } => run_fm(&patch, &out, frame_size, max_seconds),
        Command::Envelope(args) => run_envelope(&args),
        Command::Arpeggio { out, base_hz, notes, sample_rate, frame_size } => {
            run_arpeggio(&out, base_hz, notes, sample_rate, frame_size)
        }
    }
}
