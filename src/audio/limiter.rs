//! Master limiter — linked peak limiter with instant attack and smoothed release.
//!
//! Used on the live output and on offline renders, so both paths clip the same way.

/// Default output ceiling.
pub const DEFAULT_CEILING: f32 = 0.95;

/// Time for gain reduction to recover by ~63 %.
const RELEASE_SECS: f32 = 0.05;

/// Peak limiter shared across the channels of a frame.
///
/// When a frame would exceed the ceiling the gain drops immediately to fit it;
/// afterwards the gain glides back to unity. Output never exceeds the ceiling.
#[derive(Debug, Clone)]
pub struct Limiter {
    ceiling: f32,
    release_coeff: f32,
    gain: f32,
}

impl Limiter {
    /// `ceiling` should be in `(0.0, 1.0]`.
    pub fn new(ceiling: f32, sample_rate: u32) -> Self {
        debug_assert!(ceiling > 0.0 && ceiling <= 1.0);
        let release_coeff = (-1.0 / (RELEASE_SECS * sample_rate.max(1) as f32)).exp();
        Self {
            ceiling,
            release_coeff,
            gain: 1.0,
        }
    }

    pub fn with_sample_rate(sample_rate: u32) -> Self {
        Self::new(DEFAULT_CEILING, sample_rate)
    }

    /// Limit an interleaved buffer in place.
    pub fn process_block(&mut self, buffer: &mut [f32], channels: u16) {
        let ceiling = self.ceiling;
        for frame in buffer.chunks_mut(channels.max(1) as usize) {
            let peak = frame.iter().fold(0.0f32, |m, s| m.max(s.abs()));
            let target = if peak > ceiling { ceiling / peak } else { 1.0 };

            if target < self.gain {
                self.gain = target;
            } else {
                self.gain = target + (self.gain - target) * self.release_coeff;
            }

            for sample in frame.iter_mut() {
                *sample = (*sample * self.gain).clamp(-ceiling, ceiling);
            }
        }
    }

    /// Forget any gain reduction in progress.
    pub fn reset(&mut self) {
        self.gain = 1.0;
    }

    pub fn ceiling(&self) -> f32 {
        self.ceiling
    }

    /// Current gain, 1.0 when not limiting.
    pub fn gain(&self) -> f32 {
        self.gain
    }
}
