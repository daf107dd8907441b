//! Synthesised one-shots for the built-in percussion channels.
//!
//! Every voice is rendered once per session into a mono buffer. Noise voices
//! draw from a seeded `ChaCha8Rng`, so a given seed always yields the same kit.

use std::f64::consts::PI;

use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use super::sample::SampleData;
use super::SampleBank;

/// A built-in percussion voice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrumVoice {
    Kick,
    Snare,
    Hihat,
    Clap,
}

impl DrumVoice {
    pub const ALL: [DrumVoice; 4] = [
        DrumVoice::Kick,
        DrumVoice::Snare,
        DrumVoice::Hihat,
        DrumVoice::Clap,
    ];

    /// Channel name the voice plays on.
    pub fn channel(self) -> &'static str {
        match self {
            DrumVoice::Kick => "kick",
            DrumVoice::Snare => "snare",
            DrumVoice::Hihat => "hihat",
            DrumVoice::Clap => "clap",
        }
    }

    /// Length of the one-shot in seconds.
    pub fn length_secs(self) -> f64 {
        match self {
            DrumVoice::Kick => 0.25,
            DrumVoice::Snare => 0.2,
            DrumVoice::Hihat => 0.08,
            DrumVoice::Clap => 0.15,
        }
    }

    /// Render the one-shot. `seed` only matters for noise-based voices.
    pub fn generate(self, sample_rate: u32, seed: u64) -> Vec<f32> {
        let frames = (sample_rate as f64 * self.length_secs()) as usize;
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        match self {
            DrumVoice::Kick => kick(sample_rate, frames),
            DrumVoice::Snare => snare(sample_rate, frames, &mut rng),
            DrumVoice::Hihat => hihat(frames, &mut rng),
            DrumVoice::Clap => clap(sample_rate, frames, &mut rng),
        }
    }
}

/// Sine with an exponential 150 → 50 Hz sweep and fast decay.
fn kick(sample_rate: u32, frames: usize) -> Vec<f32> {
    let mut phase = 0.0_f64;
    (0..frames)
        .map(|i| {
            let norm = i as f64 / frames as f64;
            let freq = 50.0 + 100.0 * (-norm * 8.0).exp();
            phase += freq / sample_rate as f64;
            ((phase * 2.0 * PI).sin() * (-norm * 10.0).exp()) as f32
        })
        .collect()
}

/// 180 Hz body plus a noise burst, each with its own decay.
fn snare(sample_rate: u32, frames: usize, rng: &mut ChaCha8Rng) -> Vec<f32> {
    let mut phase = 0.0_f64;
    (0..frames)
        .map(|i| {
            let norm = i as f64 / frames as f64;
            phase += 180.0 / sample_rate as f64;
            let body = (phase * 2.0 * PI).sin() * (-norm * 15.0).exp();
            let noise: f64 = rng.gen_range(-1.0..1.0) * (-norm * 12.0).exp();
            ((body + noise) * 0.5) as f32
        })
        .collect()
}

/// High-passed noise with a very short decay.
fn hihat(frames: usize, rng: &mut ChaCha8Rng) -> Vec<f32> {
    const COEFF: f64 = 0.85;
    let mut prev_in = 0.0_f64;
    let mut prev_out = 0.0_f64;
    (0..frames)
        .map(|i| {
            let norm = i as f64 / frames as f64;
            let noise: f64 = rng.gen_range(-1.0..1.0);
            // y[n] = a * (y[n-1] + x[n] - x[n-1])
            let filtered = COEFF * (prev_out + noise - prev_in);
            prev_in = noise;
            prev_out = filtered;
            (filtered * (-norm * 20.0).exp() * 0.6) as f32
        })
        .collect()
}

/// Three staggered noise bursts followed by a smoothed noise tail.
fn clap(sample_rate: u32, frames: usize, rng: &mut ChaCha8Rng) -> Vec<f32> {
    let sr = sample_rate as f64;
    let mut output = vec![0.0f32; frames];

    let burst_len = (0.01 * sr) as usize;
    for offset in [0.0, 0.015, 0.030] {
        let start = (offset * sr) as usize;
        for (k, sample) in output.iter_mut().skip(start).take(burst_len).enumerate() {
            let env = (-(k as f64 / burst_len as f64) * 15.0).exp();
            let noise: f64 = rng.gen_range(-1.0..1.0);
            *sample += (noise * env * 0.6) as f32;
        }
    }

    let tail_start = (0.04 * sr) as usize;
    let smoothing = 1200.0 * 0.5 / sr;
    let mut state = 0.0_f64;
    for (k, sample) in output.iter_mut().skip(tail_start).enumerate() {
        let noise: f64 = rng.gen_range(-1.0..1.0);
        state += (noise - state) * smoothing;
        *sample += (state * (-(k as f64 / sr) * 18.0).exp() * 0.4) as f32;
    }

    output
}

/// All built-in percussion voices, keyed by channel name.
///
/// Each noise voice gets its own offset from `seed`.
pub fn build_default_kit(sample_rate: u32, seed: u64) -> SampleBank {
    let mut bank = SampleBank::new();
    for (offset, voice) in DrumVoice::ALL.into_iter().enumerate() {
        let samples = voice.generate(sample_rate, seed.wrapping_add(offset as u64));
        bank.insert(voice.channel(), SampleData::from_mono(samples, sample_rate));
    }
    bank
}

#[cfg(test)]
mod tests {
    use super::*;

    const SR: u32 = 44100;
    const SEED: u64 = 42;

    fn rms(s: &[f32]) -> f32 {
        (s.iter().map(|x| x * x).sum::<f32>() / s.len() as f32).sqrt()
    }

    #[test]
    fn every_voice_is_audible_and_bounded() {
        for voice in DrumVoice::ALL {
            let out = voice.generate(SR, SEED);
            assert_eq!(out.len(), (SR as f64 * voice.length_secs()) as usize, "{voice:?}");
            assert!(out.iter().any(|s| s.abs() > 0.001), "{voice:?} silent");
            assert!(out.iter().all(|s| s.abs() <= 1.0), "{voice:?} clips");
        }
    }

    #[test]
    fn kick_and_snare_decay() {
        for voice in [DrumVoice::Kick, DrumVoice::Snare] {
            let out = voice.generate(SR, SEED);
            let q = out.len() / 4;
            assert!(rms(&out[..q]) > rms(&out[3 * q..]) * 2.0, "{voice:?}");
        }
    }

    #[test]
    fn noise_voices_follow_the_seed() {
        assert_eq!(DrumVoice::Snare.generate(SR, 1), DrumVoice::Snare.generate(SR, 1));
        assert_ne!(DrumVoice::Snare.generate(SR, 1), DrumVoice::Snare.generate(SR, 2));
        assert_eq!(DrumVoice::Kick.generate(SR, 1), DrumVoice::Kick.generate(SR, 2));
    }

    #[test]
    fn default_kit_has_every_channel() {
        let bank = build_default_kit(SR, SEED);
        assert_eq!(bank.len(), 4);
        for name in ["kick", "snare", "hihat", "clap"] {
            assert!(bank.get(name).is_some(), "{name}");
        }
    }

    #[test]
    fn default_kit_is_deterministic() {
        let a = build_default_kit(SR, SEED);
        let b = build_default_kit(SR, SEED);
        for voice in DrumVoice::ALL {
            let name = voice.channel();
            assert_eq!(a.get(name).unwrap().samples(), b.get(name).unwrap().samples());
        }
    }
}
