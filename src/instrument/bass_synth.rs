//! Bass synth — mono, detuned oscillator pair plus a sub octave, through a resonant low-pass.

use crate::event::{NoteEvent, RenderContext};

use super::config::InstrumentConfig;
use super::envelope::AdsrEnvelope;
use super::filter::{Lowpass, DEFAULT_Q};
use super::oscillator::{pitch_to_freq, Phase, Waveform};
use super::Instrument;

/// Monophonic bass. A chord plays only its lowest pitch.
pub struct BassSynth {
    waveform: Waveform,
    envelope: AdsrEnvelope,
    detune_cents: f64,
    cutoff: f64,
    q: f64,
}

impl BassSynth {
    pub fn new() -> Self {
        Self {
            waveform: Waveform::Sawtooth,
            envelope: AdsrEnvelope::new(0.005, 0.1, 0.8, 0.05),
            detune_cents: 7.0,
            cutoff: 800.0,
            q: DEFAULT_Q,
        }
    }

    pub fn with_config(mut self, config: &InstrumentConfig) -> Self {
        self.waveform = config.oscillator.unwrap_or(self.waveform);
        self.envelope = self.envelope.with_overrides(config);
        self.cutoff = config.filter.unwrap_or(self.cutoff);
        self.q = config.filter_q.unwrap_or(self.q);
        self
    }
}

impl Default for BassSynth {
    fn default() -> Self {
        Self::new()
    }
}

impl Instrument for BassSynth {
    fn render(&self, event: &NoteEvent, ctx: &RenderContext) -> Vec<f32> {
        let Some(freq) = event
            .notes
            .iter()
            .filter_map(|n| pitch_to_freq(n))
            .min_by(f64::total_cmp)
        else {
            return Vec::new();
        };

        let detune_ratio = 2.0f64.powf(self.detune_cents / 1200.0);
        let mut main = Phase::new(freq, ctx.sample_rate);
        let mut detuned = Phase::new(freq * detune_ratio, ctx.sample_rate);
        let mut sub_phase = Phase::new(freq / 2.0, ctx.sample_rate);
        let mut filter = Lowpass::new(self.cutoff, self.q, ctx.sample_rate);

        let duration_secs = event.duration.to_seconds(ctx.bpm);
        let total_secs = self.envelope.total_duration(duration_secs);
        let num_frames = (total_secs * ctx.sample_rate as f64) as usize;
        let velocity = event.velocity() as f64;

        let mut output = Vec::with_capacity(num_frames * ctx.channels as usize);
        for i in 0..num_frames {
            let t = i as f64 / ctx.sample_rate as f64;
            let env = self.envelope.amplitude(t, duration_secs);

            let osc = (self.waveform.sample(main.tick()) + self.waveform.sample(detuned.tick())) * 0.35;
            let sub = Waveform::Sine.sample(sub_phase.tick()) * 0.3;
            let filtered = filter.process(osc + sub);

            let sample = (filtered * env * velocity) as f32;
            for _ in 0..ctx.channels {
                output.push(sample);
            }
        }

        output
    }

    fn name(&self) -> &str {
        "bass"
    }
}
