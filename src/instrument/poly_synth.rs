//! Poly synth — detuned oscillator pair per note, shared low-pass, chords welcome.
//!
//! Backs the `piano`, `lead` and `pad` channels; each is a different [`Patch`].

use crate::event::{NoteEvent, RenderContext};

use super::config::InstrumentConfig;
use super::envelope::AdsrEnvelope;
use super::filter::{Lowpass, DEFAULT_Q};
use super::oscillator::{pitch_to_freq, Phase, Waveform};
use super::Instrument;

/// Sound-shaping parameters for a [`PolySynth`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Patch {
    pub waveform: Waveform,
    pub detune_cents: f64,
    pub envelope: AdsrEnvelope,
    /// Low-pass cutoff in Hz; `None` leaves the signal unfiltered.
    pub cutoff: Option<f64>,
    pub q: f64,
    /// Output level of a single voice before velocity.
    pub level: f64,
}

impl Patch {
    pub fn with_overrides(self, config: &InstrumentConfig) -> Self {
        Self {
            waveform: config.oscillator.unwrap_or(self.waveform),
            envelope: self.envelope.with_overrides(config),
            cutoff: config.filter.or(self.cutoff),
            q: config.filter_q.unwrap_or(self.q),
            ..self
        }
    }
}

/// Polyphonic synth voiced by a [`Patch`].
pub struct PolySynth {
    name: String,
    patch: Patch,
}

impl PolySynth {
    pub fn new(name: &str, patch: Patch) -> Self {
        Self {
            name: name.to_string(),
            patch,
        }
    }

    /// Soft triangle keys with a fast attack and medium decay.
    pub fn piano() -> Self {
        Self::new(
            "piano",
            Patch {
                waveform: Waveform::Triangle,
                detune_cents: 3.0,
                envelope: AdsrEnvelope::new(0.005, 0.3, 0.35, 0.4),
                cutoff: Some(5000.0),
                q: DEFAULT_Q,
                level: 0.5,
            },
        )
    }

    /// Bright square lead.
    pub fn lead() -> Self {
        Self::new(
            "lead",
            Patch {
                waveform: Waveform::Square,
                detune_cents: 6.0,
                envelope: AdsrEnvelope::new(0.01, 0.1, 0.7, 0.15),
                cutoff: Some(3000.0),
                q: DEFAULT_Q,
                level: 0.3,
            },
        )
    }

    /// Two detuned saws, slow attack, long release.
    pub fn pad() -> Self {
        Self::new(
            "pad",
            Patch {
                waveform: Waveform::Sawtooth,
                detune_cents: 12.0,
                envelope: AdsrEnvelope::new(0.15, 0.2, 0.6, 0.4),
                cutoff: Some(2500.0),
                q: DEFAULT_Q,
                level: 0.4,
            },
        )
    }

    pub fn with_config(mut self, config: &InstrumentConfig) -> Self {
        self.patch = self.patch.with_overrides(config);
        self
    }

    pub fn patch(&self) -> &Patch {
        &self.patch
    }
}

impl Instrument for PolySynth {
    fn render(&self, event: &NoteEvent, ctx: &RenderContext) -> Vec<f32> {
        let freqs: Vec<f64> = event.notes.iter().filter_map(|n| pitch_to_freq(n)).collect();
        if freqs.is_empty() {
            return Vec::new();
        }

        let patch = &self.patch;
        let detune_ratio = 2.0f64.powf(patch.detune_cents / 1200.0);
        let mut voices: Vec<(Phase, Phase)> = freqs
            .iter()
            .map(|&f| {
                (
                    Phase::new(f, ctx.sample_rate),
                    Phase::new(f * detune_ratio, ctx.sample_rate),
                )
            })
            .collect();

        let mut filter = patch
            .cutoff
            .map(|cutoff| Lowpass::new(cutoff, patch.q, ctx.sample_rate));

        // Keep chords at roughly the loudness of a single note.
        let gain = patch.level / (voices.len() as f64).sqrt() * event.velocity() as f64;

        let duration_secs = event.duration.to_seconds(ctx.bpm);
        let total_secs = patch.envelope.total_duration(duration_secs);
        let num_frames = (total_secs * ctx.sample_rate as f64) as usize;

        let mut output = Vec::with_capacity(num_frames * ctx.channels as usize);
        for i in 0..num_frames {
            let t = i as f64 / ctx.sample_rate as f64;
            let env = patch.envelope.amplitude(t, duration_secs);

            let mut mixed = 0.0;
            for (p1, p2) in voices.iter_mut() {
                mixed += (patch.waveform.sample(p1.tick()) + patch.waveform.sample(p2.tick())) * 0.5;
            }
            if let Some(f) = filter.as_mut() {
                mixed = f.process(mixed);
            }

            let sample = (mixed * env * gain) as f32;
            for _ in 0..ctx.channels {
                output.push(sample);
            }
        }

        output
    }

    fn name(&self) -> &str {
        &self.name
    }
}
