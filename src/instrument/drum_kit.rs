//! Sample player for percussion and custom sample channels.

use std::sync::Arc;

use crate::event::{NoteEvent, RenderContext};

use super::{Instrument, SampleBank};

/// Plays the one-shot named after the event's channel.
///
/// The bank is shared between every channel routed to a kit, so building
/// one kit per channel does not copy audio.
pub struct DrumKit {
    bank: Arc<SampleBank>,
}

impl DrumKit {
    pub fn new(bank: Arc<SampleBank>) -> Self {
        Self { bank }
    }
}

impl Instrument for DrumKit {
    fn render(&self, event: &NoteEvent, ctx: &RenderContext) -> Vec<f32> {
        let Some(sample) = self.bank.get(&event.instrument) else {
            return Vec::new();
        };

        let velocity = event.velocity();
        let channels = ctx.channels as usize;
        let mut output = Vec::with_capacity(sample.len() * channels);
        for &s in sample.samples() {
            let scaled = s * velocity;
            output.extend(std::iter::repeat(scaled).take(channels));
        }
        output
    }

    fn name(&self) -> &str {
        "drum_kit"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::Beat;
    use crate::instrument::SampleData;

    fn ctx(channels: u16) -> RenderContext {
        RenderContext {
            sample_rate: 44100,
            channels,
            bpm: 120.0,
        }
    }

    fn kit() -> DrumKit {
        let mut bank = SampleBank::new();
        bank.insert("kick", SampleData::from_mono(vec![0.5, 0.25, 0.125], 44100));
        bank.insert("vox", SampleData::from_mono(vec![1.0], 44100));
        DrumKit::new(Arc::new(bank))
    }

    #[test]
    fn plays_channel_sample_interleaved() {
        let out = kit().render(&NoteEvent::new("kick", &["C4"], Beat::ZERO, Beat::ONE), &ctx(2));
        assert_eq!(out, [0.4, 0.4, 0.2, 0.2, 0.1, 0.1]);
    }

    #[test]
    fn follows_channel_count() {
        let out = kit().render(&NoteEvent::new("vox", &["C4"], Beat::ZERO, Beat::ONE), &ctx(1));
        assert_eq!(out, [0.8]);
    }

    #[test]
    fn soft_hits_use_soft_velocity() {
        let event = NoteEvent::new("vox", &["C4"], Beat::ZERO, Beat::ONE).with_soft(true);
        let out = kit().render(&event, &ctx(2));
        assert!((out[0] - 0.4).abs() < f32::EPSILON);
    }

    #[test]
    fn unknown_channel_is_silent() {
        let out = kit().render(&NoteEvent::new("gong", &["C4"], Beat::ZERO, Beat::ONE), &ctx(2));
        assert!(out.is_empty());
    }

    #[test]
    fn sample_length_ignores_event_duration() {
        let short = kit().render(&NoteEvent::new("kick", &["C4"], Beat::ZERO, Beat::ONE), &ctx(2));
        let long = kit().render(&NoteEvent::new("kick", &["C4"], Beat::ZERO, Beat::from_beats(8)), &ctx(2));
        assert_eq!(short, long);
    }
}
