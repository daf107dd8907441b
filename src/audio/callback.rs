//! Audio callback — runs on the cpal audio thread.
//!
//! Drains commands from the ring buffer, plays queued samples through the
//! master limiter, and reports consumption back through a shared counter.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use ringbuf::traits::Consumer;
use ringbuf::HeapCons;

use super::limiter::Limiter;

/// Messages from the session thread to the audio thread.
#[derive(Debug)]
pub enum AudioCommand {
    /// Interleaved samples to append to the playback queue.
    Samples(Vec<f32>),
    /// Drop everything queued; silence from the next callback on.
    Stop,
}

/// Consumed samples are compacted once this many have been read.
const COMPACT_THRESHOLD: usize = 8192;

/// State that lives on the audio thread.
pub struct AudioCallback {
    consumer: HeapCons<AudioCommand>,
    playback_buffer: Vec<f32>,
    read_pos: usize,
    limiter: Limiter,
    channels: u16,
    /// Samples sent but not yet played; decremented here.
    queued: Arc<AtomicUsize>,
}

impl AudioCallback {
    pub fn new(
        consumer: HeapCons<AudioCommand>,
        channels: u16,
        sample_rate: u32,
        queued: Arc<AtomicUsize>,
    ) -> Self {
        Self {
            consumer,
            playback_buffer: Vec::with_capacity(sample_rate as usize * channels as usize),
            read_pos: 0,
            limiter: Limiter::with_sample_rate(sample_rate),
            channels,
            queued,
        }
    }

    /// Fill one device buffer.
    pub fn process(&mut self, output: &mut [f32]) {
        while let Some(cmd) = self.consumer.try_pop() {
            match cmd {
                AudioCommand::Samples(data) => self.playback_buffer.extend_from_slice(&data),
                AudioCommand::Stop => {
                    let dropped = self.playback_buffer.len() - self.read_pos;
                    self.queued.fetch_sub(dropped, Ordering::AcqRel);
                    self.playback_buffer.clear();
                    self.read_pos = 0;
                    self.limiter.reset();
                }
            }
        }

        let available = self.playback_buffer.len() - self.read_pos;
        let copy_len = output.len().min(available);
        output[..copy_len]
            .copy_from_slice(&self.playback_buffer[self.read_pos..self.read_pos + copy_len]);
        output[copy_len..].fill(0.0);
        self.read_pos += copy_len;
        self.queued.fetch_sub(copy_len, Ordering::AcqRel);

        self.limiter.process_block(output, self.channels);

        if self.read_pos >= COMPACT_THRESHOLD {
            self.playback_buffer.drain(..self.read_pos);
            self.read_pos = 0;
        }
    }
}
