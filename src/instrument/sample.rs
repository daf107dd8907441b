//! Decoded audio for custom sample channels — WAV decoding, mono mixdown, resampling.

use std::io::{Cursor, Read, Seek};

use thiserror::Error;

/// Why a custom sample could not be made playable.
#[derive(Debug, Error)]
pub enum SampleError {
    #[error("WAV error: {0}")]
    Wav(#[from] hound::Error),

    #[error("WAV file contains no samples")]
    Empty,

    #[error("unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("fetch failed: {0}")]
    Fetch(String),

    #[error("unsupported URL scheme in {0}")]
    UnsupportedScheme(String),
}

/// A mono audio buffer at a known sample rate.
#[derive(Debug, Clone, PartialEq)]
pub struct SampleData {
    samples: Vec<f32>,
    sample_rate: u32,
}

impl SampleData {
    pub fn from_mono(samples: Vec<f32>, sample_rate: u32) -> Self {
        Self {
            samples,
            sample_rate,
        }
    }

    /// Decode a WAV stream into mono f32 at `target_sample_rate`.
    ///
    /// Integer (8–32 bit) and 32-bit float PCM are accepted. Channels are
    /// averaged; a differing source rate is linearly resampled.
    pub fn from_wav<R: Read + Seek>(reader: R, target_sample_rate: u32) -> Result<Self, SampleError> {
        let wav = hound::WavReader::new(reader)?;
        let spec = wav.spec();
        let channels = spec.channels as usize;
        if channels == 0 {
            return Err(SampleError::UnsupportedFormat("zero channels".to_string()));
        }

        let raw: Vec<f32> = match spec.sample_format {
            hound::SampleFormat::Int => {
                let bits = spec.bits_per_sample;
                if !(1..=32).contains(&bits) {
                    return Err(SampleError::UnsupportedFormat(format!("{bits}-bit integer")));
                }
                let full_scale = (1u64 << (bits - 1)) as f32;
                wav.into_samples::<i32>()
                    .map(|s| s.map(|v| v as f32 / full_scale))
                    .collect::<Result<_, _>>()?
            }
            hound::SampleFormat::Float => wav.into_samples::<f32>().collect::<Result<_, _>>()?,
        };

        if raw.is_empty() {
            return Err(SampleError::Empty);
        }

        let mono: Vec<f32> = raw
            .chunks_exact(channels)
            .map(|frame| frame.iter().sum::<f32>() / channels as f32)
            .collect();

        let samples = if spec.sample_rate == target_sample_rate {
            mono
        } else {
            resample_linear(&mono, spec.sample_rate, target_sample_rate)
        };

        Ok(Self {
            samples,
            sample_rate: target_sample_rate,
        })
    }

    /// Decode an in-memory WAV file.
    pub fn from_wav_bytes(bytes: &[u8], target_sample_rate: u32) -> Result<Self, SampleError> {
        Self::from_wav(Cursor::new(bytes), target_sample_rate)
    }

    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn duration_secs(&self) -> f64 {
        self.samples.len() as f64 / self.sample_rate as f64
    }
}

/// Linear-interpolation resampling from `source_rate` to `target_rate`.
fn resample_linear(input: &[f32], source_rate: u32, target_rate: u32) -> Vec<f32> {
    if input.len() < 2 {
        return input.to_vec();
    }

    let ratio = source_rate as f64 / target_rate as f64;
    let output_len = (input.len() as f64 / ratio).ceil() as usize;
    let last = input.len() - 1;

    (0..output_len)
        .map(|i| {
            let pos = i as f64 * ratio;
            let idx = (pos as usize).min(last);
            let frac = (pos - idx as f64) as f32;
            if idx < last {
                input[idx] * (1.0 - frac) + input[idx + 1] * frac
            } else {
                input[last]
            }
        })
        .collect()
}
