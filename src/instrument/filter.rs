//! Resonant low-pass filter — RBJ cookbook biquad, Direct Form II Transposed.

use std::f64::consts::PI;

/// Butterworth Q; no resonant peak.
pub const DEFAULT_Q: f64 = std::f64::consts::FRAC_1_SQRT_2;

#[derive(Debug, Clone, Copy)]
pub struct Lowpass {
    b0: f64,
    b1: f64,
    b2: f64,
    a1: f64,
    a2: f64,
    w0: f64,
    w1: f64,
}

impl Lowpass {
    /// Cutoff is kept below Nyquist and Q above 0.1 so the filter stays stable.
    pub fn new(cutoff: f64, q: f64, sample_rate: u32) -> Self {
        let sr = sample_rate as f64;
        let freq = cutoff.clamp(20.0, sr * 0.45);
        let q = q.max(0.1);

        let omega = 2.0 * PI * freq / sr;
        let (sin_omega, cos_omega) = omega.sin_cos();
        let alpha = sin_omega / (2.0 * q);

        let a0 = 1.0 + alpha;
        let b1 = (1.0 - cos_omega) / a0;
        Self {
            b0: b1 / 2.0,
            b1,
            b2: b1 / 2.0,
            a1: -2.0 * cos_omega / a0,
            a2: (1.0 - alpha) / a0,
            w0: 0.0,
            w1: 0.0,
        }
    }

    #[inline]
    pub fn process(&mut self, input: f64) -> f64 {
        let output = self.b0 * input + self.w0;
        self.w0 = self.b1 * input - self.a1 * output + self.w1;
        self.w1 = self.b2 * input - self.a2 * output;
        output
    }
}
