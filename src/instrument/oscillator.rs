//! Oscillators — waveform shapes and pitch-to-frequency conversion.

use std::f64::consts::PI;

use serde::{Deserialize, Serialize};

use crate::dsl::note::midi_number;

/// Oscillator shape, as named in an `instruments:` override.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Waveform {
    Sine,
    Square,
    #[serde(alias = "saw")]
    Sawtooth,
    Triangle,
}

impl Waveform {
    /// One sample of the waveform at `phase` in `[0, 1)`. Output is in `[-1, 1]`.
    pub fn sample(self, phase: f64) -> f64 {
        match self {
            Waveform::Sine => (phase * 2.0 * PI).sin(),
            Waveform::Sawtooth => 2.0 * phase - 1.0,
            Waveform::Square => {
                if phase < 0.5 {
                    1.0
                } else {
                    -1.0
                }
            }
            Waveform::Triangle => {
                if phase < 0.25 {
                    4.0 * phase
                } else if phase < 0.75 {
                    2.0 - 4.0 * phase
                } else {
                    4.0 * phase - 4.0
                }
            }
        }
    }
}

/// A4 (MIDI 69) = 440 Hz, equal temperament.
pub fn midi_to_freq(note: u8) -> f64 {
    440.0 * 2.0f64.powf((note as f64 - 69.0) / 12.0)
}

/// Frequency of a pitch name such as `"C4"` or `"Eb2"`.
pub fn pitch_to_freq(name: &str) -> Option<f64> {
    midi_number(name).map(midi_to_freq)
}

/// Phase accumulator for one oscillator voice.
#[derive(Debug, Clone, Copy)]
pub struct Phase {
    value: f64,
    increment: f64,
}

impl Phase {
    pub fn new(freq: f64, sample_rate: u32) -> Self {
        Self {
            value: 0.0,
            increment: freq / sample_rate as f64,
        }
    }

    /// Current phase, then advance by one sample.
    #[inline]
    pub fn tick(&mut self) -> f64 {
        let current = self.value;
        self.value = (self.value + self.increment).fract();
        current
    }
}
