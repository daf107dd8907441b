//! Instruments — registry, synth voices, drum kit, custom samples and routing.

pub mod bass_synth;
pub mod config;
pub mod drum_kit;
pub mod drums;
pub mod envelope;
pub mod filter;
pub mod loader;
pub mod oscillator;
pub mod pluck_synth;
pub mod poly_synth;
pub mod registry;
pub mod router;
pub mod sample;

pub use bass_synth::BassSynth;
pub use config::InstrumentConfig;
pub use drum_kit::DrumKit;
pub use drums::build_default_kit;
pub use loader::{load_samples, DefaultSource, LoadReport, SampleSource};
pub use pluck_synth::PluckSynth;
pub use poly_synth::PolySynth;
pub use registry::{
    InstrumentKind, InstrumentSpec, ReconcileReport, Registry, SampleDeclaration, Voicing,
    DEFAULT_INSTRUMENT,
};
pub use router::InstrumentRouter;
pub use sample::{SampleData, SampleError};

use crate::event::{NoteEvent, RenderContext};
use std::collections::HashMap;

/// Common interface for everything that can sound an event.
///
/// Output is interleaved across `ctx.channels` and may run past the event's
/// duration (release tails, one-shots); the scheduler carries the excess.
pub trait Instrument: Send {
    fn render(&self, event: &NoteEvent, ctx: &RenderContext) -> Vec<f32>;

    fn name(&self) -> &str;
}

/// Named mono buffers: the synthesised default kit plus loaded custom samples.
#[derive(Debug, Clone, Default)]
pub struct SampleBank {
    samples: HashMap<String, SampleData>,
}

impl SampleBank {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a named sample, replacing any previous one.
    pub fn insert(&mut self, name: impl Into<String>, data: SampleData) {
        self.samples.insert(name.into(), data);
    }

    pub fn get(&self, name: &str) -> Option<&SampleData> {
        self.samples.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.samples.contains_key(name)
    }

    /// Move every sample of `other` into this bank.
    pub fn merge(&mut self, other: SampleBank) {
        self.samples.extend(other.samples);
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}
