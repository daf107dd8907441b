//! Event stream engine — deterministic block scheduler shared by live and offline playback.
//!
//! The [`EventScheduler`] sits between the compiler and the audio output.
//! It maintains musical time via [`Transport`], stores events on a [`Timeline`],
//! and renders them into sample buffers using a caller-provided render function.
//!
//! The scheduler does **not** own an output device; the caller decides
//! whether a block goes to the sound card or into a WAV buffer. This keeps
//! all scheduling logic testable without audio hardware.

pub mod beat;
pub mod timeline;
pub mod transport;
pub mod types;

pub use beat::{Beat, TICKS_PER_BEAT};
pub use timeline::Timeline;
pub use transport::{BlockWindow, PlayState, Transport};
pub use types::{NoteEvent, HIT_PITCH, NORMAL_VELOCITY, SOFT_VELOCITY};

/// Context passed to the render callback for each event.
pub struct RenderContext {
    pub sample_rate: u32,
    pub channels: u16,
    pub bpm: f64,
}

/// A callback that renders a single event into interleaved samples.
///
/// The returned `Vec<f32>` contains interleaved channel data. Its length
/// can exceed the current block; the overflow goes to the overlap buffer.
pub type RenderFn = Box<dyn FnMut(&NoteEvent, &RenderContext) -> Vec<f32>>;

/// Receives one notification per triggered event, independent of audio.
///
/// `seconds` is the event's onset measured from the moment playback started,
/// so a UI can highlight `(line_index, token_index)` in sync with the sound.
pub trait EventObserver: Send {
    fn on_event(&mut self, line_index: usize, token_index: usize, seconds: f64);
}

/// The event scheduler: renders musical events into audio sample blocks.
pub struct EventScheduler {
    timeline: Timeline,
    transport: Transport,
    block_size_frames: u32,
    /// Samples that spilled past the previous block boundary.
    overlap_buffer: Vec<f32>,
    /// Loop length; `None` plays through once.
    loop_length: Option<Beat>,
    observer: Option<Box<dyn EventObserver>>,
}

impl EventScheduler {
    /// Create a new scheduler.
    ///
    /// - `bpm`: tempo in beats per minute
    /// - `sample_rate`: audio sample rate (e.g. 44100)
    /// - `channels`: number of audio channels (e.g. 2 for stereo)
    /// - `block_size_frames`: number of frames per render block (e.g. 1024)
    pub fn new(bpm: f64, sample_rate: u32, channels: u16, block_size_frames: u32) -> Self {
        Self {
            timeline: Timeline::new(),
            transport: Transport::new(bpm, sample_rate, channels),
            block_size_frames,
            overlap_buffer: Vec::new(),
            loop_length: None,
            observer: None,
        }
    }

    /// Start playback from the current position.
    pub fn play(&mut self) {
        self.transport.play();
    }

    /// Stop playback, drop pending callbacks, and silence sounding notes.
    pub fn stop(&mut self) {
        self.transport.stop();
        self.timeline.rewind();
        self.overlap_buffer.clear();
    }

    /// Replace every scheduled event. Position and overlap are reset.
    pub fn load(&mut self, events: impl IntoIterator<Item = NoteEvent>) {
        self.timeline.replace(events);
        self.transport.rewind();
        self.overlap_buffer.clear();
    }

    /// Repeat the timeline every `length`. `None` or a zero length disables looping.
    pub fn set_loop(&mut self, length: Option<Beat>) {
        self.loop_length = length.filter(|l| *l > Beat::ZERO);
    }

    /// The active loop length, if looping.
    pub fn loop_length(&self) -> Option<Beat> {
        self.loop_length
    }

    /// Install an observer notified with each event's onset.
    pub fn set_observer(&mut self, observer: Box<dyn EventObserver>) {
        self.observer = Some(observer);
    }

    /// Get a reference to the transport.
    pub fn transport(&self) -> &Transport {
        &self.transport
    }

    /// Set BPM (takes effect on the next render_block call).
    ///
    /// Notes already rendered into the overlap buffer keep their length, so
    /// a tempo change never cuts off a sounding note.
    pub fn set_bpm(&mut self, bpm: f64) {
        self.transport.set_bpm(bpm);
    }

    /// Whether a non-looping run has passed `end` and every tail has drained.
    pub fn is_finished(&self, end: Beat) -> bool {
        self.loop_length.is_none()
            && self.transport.position() >= end
            && self.timeline.remaining() == 0
            && self.overlap_buffer.is_empty()
    }

    /// Render the next block of audio samples.
    ///
    /// Returns `None` if the transport is stopped.
    /// Returns `Some(Vec<f32>)` with interleaved samples of length
    /// `block_size_frames * channels`.
    ///
    /// `render` is invoked for each event that falls within this block's time
    /// window. Rendered samples are mixed additively.
    pub fn render_block<F>(&mut self, render: &mut F) -> Option<Vec<f32>>
    where
        F: FnMut(&NoteEvent, &RenderContext) -> Vec<f32>,
    {
        let BlockWindow {
            from,
            to,
            start_frame,
        } = self.transport.advance(self.block_size_frames)?;

        let channels = self.transport.channels() as usize;
        let block_samples = self.block_size_frames as usize * channels;
        let mut output = vec![0.0f32; block_samples];

        // Mix in overlap from previous block
        let overlap_len = self.overlap_buffer.len().min(block_samples);
        for (out, &ovl) in output[..overlap_len]
            .iter_mut()
            .zip(&self.overlap_buffer[..overlap_len])
        {
            *out += ovl;
        }
        if self.overlap_buffer.len() > block_samples {
            self.overlap_buffer.drain(..block_samples);
        } else {
            self.overlap_buffer.clear();
        }

        let ctx = RenderContext {
            sample_rate: self.transport.sample_rate(),
            channels: channels as u16,
            bpm: self.transport.bpm(),
        };

        // Each entry: (event, offset of its onset from the block start).
        let mut due: Vec<(NoteEvent, Beat)> = Vec::new();
        match self.loop_length {
            Some(length) if to >= length => {
                for event in self.timeline.drain_range(from, length) {
                    let offset = event.beat - from;
                    due.push((event, offset));
                }
                // Wrap: the rest of this block plays the top of the loop.
                let head = length - from;
                let wrapped_to = (to - length).wrap(length);
                self.timeline.rewind();
                for event in self.timeline.drain_range(Beat::ZERO, wrapped_to) {
                    let offset = head + event.beat;
                    due.push((event, offset));
                }
                self.transport.seek(wrapped_to);
            }
            _ => {
                for event in self.timeline.drain_range(from, to) {
                    let offset = event.beat - from;
                    due.push((event, offset));
                }
            }
        }

        for (event, offset) in &due {
            let offset_frames = offset.to_sample_offset(ctx.bpm, ctx.sample_rate);

            if let Some(observer) = self.observer.as_mut() {
                let seconds = (start_frame + offset_frames) as f64 / ctx.sample_rate as f64;
                observer.on_event(event.line_index, event.token_index, seconds);
            }

            let rendered = render(event, &ctx);
            if rendered.is_empty() {
                continue;
            }

            let offset_samples = offset_frames as usize * channels;

            // Mix rendered samples into output, spilling into overlap if needed
            for (i, &sample) in rendered.iter().enumerate() {
                let pos = offset_samples + i;
                if pos < block_samples {
                    output[pos] += sample;
                } else {
                    let overlap_pos = pos - block_samples;
                    if overlap_pos >= self.overlap_buffer.len() {
                        self.overlap_buffer.resize(overlap_pos + 1, 0.0);
                    }
                    self.overlap_buffer[overlap_pos] += sample;
                }
            }
        }

        Some(output)
    }
}
