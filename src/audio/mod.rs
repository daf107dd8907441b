//! Audio output — cpal stream fed through a lock-free command queue.
//!
//! The [`AudioEngine`] owns the cpal output stream. The session thread renders
//! blocks and pushes them as [`AudioCommand`]s through a `ringbuf` queue; the
//! audio thread drains that queue in its callback. Anything that accepts
//! rendered blocks implements [`AudioSink`], so playback logic can run
//! against an in-memory sink in tests.

pub mod callback;
pub mod limiter;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use log::{error, info};
use ringbuf::{
    traits::{Producer, Split},
    HeapRb,
};
use thiserror::Error;

pub use callback::AudioCommand;
pub use limiter::Limiter;

use callback::AudioCallback;

/// Ring buffer capacity (number of commands).
const RING_BUFFER_CAPACITY: usize = 1024;

#[derive(Debug, Error)]
pub enum AudioError {
    #[error("no audio output device found")]
    NoOutputDevice,

    #[error("device config error: {0}")]
    DeviceConfig(String),

    #[error("stream build error: {0}")]
    StreamBuild(String),

    #[error("stream play error: {0}")]
    StreamPlay(String),

    /// The audio thread is not draining fast enough.
    #[error("audio command ring buffer is full")]
    BufferFull,
}

/// Destination for rendered, interleaved sample blocks.
pub trait AudioSink {
    fn send(&mut self, samples: Vec<f32>) -> Result<(), AudioError>;

    /// Drop everything queued and fall silent.
    fn stop(&mut self) -> Result<(), AudioError>;

    /// Samples sent but not yet played.
    fn buffered(&self) -> usize;
}

/// The cpal-backed output.
pub struct AudioEngine {
    _stream: cpal::Stream,
    producer: ringbuf::HeapProd<AudioCommand>,
    queued: Arc<AtomicUsize>,
    sample_rate: u32,
    channels: u16,
}

impl AudioEngine {
    /// Open the default output device with its preferred configuration.
    pub fn new() -> Result<Self, AudioError> {
        let device = default_device()?;
        let config = device
            .default_output_config()
            .map_err(|e| AudioError::DeviceConfig(e.to_string()))?;
        Self::build_with_device(&device, config.sample_rate().0, config.channels())
    }

    /// Open the default output device at a specific rate and channel count.
    pub fn with_config(sample_rate: u32, channels: u16) -> Result<Self, AudioError> {
        let device = default_device()?;
        Self::build_with_device(&device, sample_rate, channels)
    }

    fn build_with_device(
        device: &cpal::Device,
        sample_rate: u32,
        channels: u16,
    ) -> Result<Self, AudioError> {
        let (producer, consumer) = HeapRb::<AudioCommand>::new(RING_BUFFER_CAPACITY).split();
        let queued = Arc::new(AtomicUsize::new(0));
        let mut audio_callback =
            AudioCallback::new(consumer, channels, sample_rate, Arc::clone(&queued));

        let stream_config = cpal::StreamConfig {
            channels,
            sample_rate: cpal::SampleRate(sample_rate),
            buffer_size: cpal::BufferSize::Default,
        };

        let stream = device
            .build_output_stream(
                &stream_config,
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                    audio_callback.process(data);
                },
                |err: cpal::StreamError| error!("audio stream error: {err}"),
                None,
            )
            .map_err(|e| AudioError::StreamBuild(e.to_string()))?;

        stream
            .play()
            .map_err(|e| AudioError::StreamPlay(e.to_string()))?;

        info!("audio output open: {sample_rate} Hz, {channels} channel(s)");
        Ok(Self {
            _stream: stream,
            producer,
            queued,
            sample_rate,
            channels,
        })
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn channels(&self) -> u16 {
        self.channels
    }
}

fn default_device() -> Result<cpal::Device, AudioError> {
    cpal::default_host()
        .default_output_device()
        .ok_or(AudioError::NoOutputDevice)
}

impl AudioSink for AudioEngine {
    fn send(&mut self, samples: Vec<f32>) -> Result<(), AudioError> {
        // Count before pushing so the callback can never subtract first.
        let len = samples.len();
        self.queued.fetch_add(len, Ordering::AcqRel);
        self.producer
            .try_push(AudioCommand::Samples(samples))
            .map_err(|_| {
                self.queued.fetch_sub(len, Ordering::AcqRel);
                AudioError::BufferFull
            })
    }

    fn stop(&mut self) -> Result<(), AudioError> {
        self.producer
            .try_push(AudioCommand::Stop)
            .map_err(|_| AudioError::BufferFull)
    }

    fn buffered(&self) -> usize {
        self.queued.load(Ordering::Acquire)
    }
}

/// A sink that keeps everything it is sent. Nothing is ever "played", so
/// [`AudioSink::buffered`] reports zero and rendering is never throttled.
#[derive(Debug, Default)]
pub struct CaptureSink {
    pub samples: Vec<f32>,
    pub blocks: usize,
    pub stops: usize,
}

impl AudioSink for CaptureSink {
    fn send(&mut self, samples: Vec<f32>) -> Result<(), AudioError> {
        self.samples.extend(samples);
        self.blocks += 1;
        Ok(())
    }

    fn stop(&mut self) -> Result<(), AudioError> {
        self.stops += 1;
        Ok(())
    }

    fn buffered(&self) -> usize {
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[ignore] // Requires an audio device. Run manually with `cargo test -- --ignored`
    fn engine_opens_default_device() {
        let engine = AudioEngine::new().expect("no audio device");
        assert!(engine.sample_rate() > 0);
        assert!(engine.channels() > 0);
    }

    #[test]
    #[ignore] // Requires audio device
    fn engine_tracks_buffered_samples() {
        let mut engine = AudioEngine::with_config(44100, 2).expect("no audio device");
        engine.send(vec![0.0; 1024]).unwrap();
        assert!(engine.buffered() <= 1024);
        engine.stop().unwrap();
    }

    #[test]
    fn capture_sink_collects() {
        let mut sink = CaptureSink::default();
        sink.send(vec![0.1, 0.2]).unwrap();
        sink.send(vec![0.3]).unwrap();
        sink.stop().unwrap();
        assert_eq!(sink.samples, [0.1, 0.2, 0.3]);
        assert_eq!(sink.blocks, 2);
        assert_eq!(sink.stops, 1);
        assert_eq!(sink.buffered(), 0);
    }

    #[test]
    fn error_messages() {
        assert_eq!(AudioError::NoOutputDevice.to_string(), "no audio output device found");
        assert_eq!(
            AudioError::BufferFull.to_string(),
            "audio command ring buffer is full"
        );
        assert_eq!(
            AudioError::DeviceConfig("test".to_string()).to_string(),
            "device config error: test"
        );
    }
}
