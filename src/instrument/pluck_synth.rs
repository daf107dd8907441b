//! Pluck synth — Karplus-Strong (noise burst + damped feedback delay).

use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use crate::dsl::note::midi_number;
use crate::event::{NoteEvent, RenderContext};

use super::config::InstrumentConfig;
use super::oscillator::midi_to_freq;
use super::Instrument;

/// Samples of fade-out at the very end of a pluck.
const FADE_FRAMES: usize = 200;

/// One vibrating string.
struct KarplusString {
    delay: Vec<f64>,
    idx: usize,
    damping: f64,
}

impl KarplusString {
    fn new(freq: f64, sample_rate: u32, damping: f64, rng: &mut ChaCha8Rng) -> Option<Self> {
        let len = (sample_rate as f64 / freq).round() as usize;
        if len < 2 {
            return None;
        }
        Some(Self {
            delay: (0..len).map(|_| rng.gen_range(-1.0..1.0)).collect(),
            idx: 0,
            damping,
        })
    }

    #[inline]
    fn tick(&mut self) -> f64 {
        let out = self.delay[self.idx];
        let next = (self.idx + 1) % self.delay.len();
        self.delay[self.idx] = (out + self.delay[next]) * 0.5 * self.damping;
        self.idx = next;
        out
    }
}

/// Plucked string voice. Noise is seeded per pitch, so output is reproducible.
pub struct PluckSynth {
    seed: u64,
    damping: f64,
    /// Ring time after the note ends, seconds.
    tail: f64,
}

impl PluckSynth {
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            damping: 0.996,
            tail: 0.2,
        }
    }

    /// `release` lengthens the ring-out; other fields do not apply to a string model.
    pub fn with_config(mut self, config: &InstrumentConfig) -> Self {
        if let Some(release) = config.release {
            self.tail = release.max(0.0);
        }
        self
    }
}

impl Instrument for PluckSynth {
    fn render(&self, event: &NoteEvent, ctx: &RenderContext) -> Vec<f32> {
        let mut strings: Vec<KarplusString> = event
            .notes
            .iter()
            .filter_map(|n| midi_number(n))
            .filter_map(|midi| {
                let mut rng = ChaCha8Rng::seed_from_u64(self.seed.wrapping_add(midi as u64));
                KarplusString::new(midi_to_freq(midi), ctx.sample_rate, self.damping, &mut rng)
            })
            .collect();
        if strings.is_empty() {
            return Vec::new();
        }

        let total_secs = event.duration.to_seconds(ctx.bpm) + self.tail;
        let num_frames = (total_secs * ctx.sample_rate as f64) as usize;
        let gain = event.velocity() as f64 * 0.7 / (strings.len() as f64).sqrt();

        let mut output = Vec::with_capacity(num_frames * ctx.channels as usize);
        for i in 0..num_frames {
            let raw: f64 = strings.iter_mut().map(KarplusString::tick).sum();

            let remaining = num_frames - i;
            let fade = if remaining < FADE_FRAMES {
                remaining as f64 / FADE_FRAMES as f64
            } else {
                1.0
            };

            let s = (raw * gain * fade) as f32;
            for _ in 0..ctx.channels {
                output.push(s);
            }
        }

        output
    }

    fn name(&self) -> &str {
        "pluck"
    }
}
