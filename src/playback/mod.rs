//! Playback — turning a [`Composition`] into sound (live) or WAV bytes (offline).
//!
//! Both paths share [`prepare`]: load the declared custom samples, build the
//! per-channel router, and produce the event list the scheduler plays. Each
//! session or render builds its own context; nothing is shared between them.

pub mod live;
pub mod offline;
pub mod wav;

pub use live::{LiveSession, StartReport};
pub use offline::{render_offline, OfflineRender};

use std::collections::HashMap;
use std::sync::Arc;

use thiserror::Error;

use crate::audio::AudioError;
use crate::dsl::Composition;
use crate::event::{Beat, NoteEvent};
use crate::instrument::{
    build_default_kit, load_samples, InstrumentConfig, InstrumentRouter, Registry, SampleSource,
    Voicing,
};

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("nothing to render: the composition has no events")]
    NothingToRender,

    #[error("invalid tempo: {0} BPM")]
    InvalidTempo(f64),

    #[error("WAV encoding failed: {0}")]
    Wav(#[from] hound::Error),

    #[error("audio output failed: {0}")]
    Audio(#[from] AudioError),
}

/// Engine parameters shared by live and offline playback.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderSettings {
    pub sample_rate: u32,
    pub channels: u16,
    /// Frames per scheduler block.
    pub block_size: u32,
    /// Seconds rendered after the last beat so release tails ring out.
    pub tail_secs: f64,
    /// Seed for every noise source.
    pub seed: u64,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            sample_rate: 44100,
            channels: 2,
            block_size: 1024,
            tail_secs: 1.0,
            seed: 42,
        }
    }
}

pub(crate) fn check_tempo(bpm: f64) -> Result<(), RenderError> {
    if bpm.is_finite() && bpm > 0.0 {
        Ok(())
    } else {
        Err(RenderError::InvalidTempo(bpm))
    }
}

/// Everything needed to sound one composition.
pub(crate) struct Prepared {
    pub events: Vec<NoteEvent>,
    pub router: InstrumentRouter,
    pub failed_channels: Vec<String>,
}

pub(crate) fn prepare(
    composition: &Composition,
    registry: &Registry,
    volumes: &HashMap<String, f64>,
    configs: &HashMap<String, InstrumentConfig>,
    settings: &RenderSettings,
    source: &dyn SampleSource,
) -> Prepared {
    let loaded = load_samples(&composition.declarations(), source, settings.sample_rate);

    let mut bank = build_default_kit(settings.sample_rate, settings.seed);
    bank.merge(loaded.bank);

    let router = InstrumentRouter::build(
        composition.channels(),
        registry,
        configs,
        volumes,
        Arc::new(bank),
        settings.seed,
    );

    let events = composition
        .events()
        .filter(|e| !loaded.failed.contains(&e.instrument))
        .cloned()
        .collect();

    Prepared {
        events: dedupe_mono(events, registry),
        router,
        failed_channels: loaded.failed,
    }
}

/// On monophonic channels keep one event per start beat: the one declared
/// last (highest line, then highest token).
pub fn dedupe_mono(events: Vec<NoteEvent>, registry: &Registry) -> Vec<NoteEvent> {
    let is_mono = |e: &NoteEvent| {
        registry
            .get(&e.instrument)
            .is_some_and(|spec| spec.voicing == Voicing::Mono)
    };

    let mut winners: HashMap<(String, Beat), (usize, usize)> = HashMap::new();
    for e in events.iter().filter(|e| is_mono(e)) {
        let rank = (e.line_index, e.token_index);
        winners
            .entry((e.instrument.clone(), e.beat))
            .and_modify(|best| *best = (*best).max(rank))
            .or_insert(rank);
    }

    events
        .into_iter()
        .filter(|e| {
            !is_mono(e)
                || winners.get(&(e.instrument.clone(), e.beat)) == Some(&(e.line_index, e.token_index))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dsl::Compiler;
    use crate::instrument::{SampleError, SampleSource};

    struct NoSamples;

    impl SampleSource for NoSamples {
        fn fetch(&self, url: &str) -> Result<Vec<u8>, SampleError> {
            Err(SampleError::Fetch(format!("{url}: HTTP 404")))
        }
    }

    fn event(instrument: &str, beat: u32, line: usize, token: usize, note: &str) -> NoteEvent {
        let mut e = NoteEvent::new(instrument, &[note], Beat::from_beats(beat), Beat::ONE);
        e.line_index = line;
        e.token_index = token;
        e
    }

    #[test]
    fn mono_keeps_last_declared() {
        let events = vec![
            event("bass", 0, 0, 0, "C2"),
            event("bass", 0, 1, 0, "E2"),
            event("bass", 1, 0, 1, "G2"),
            event("piano", 0, 2, 0, "C4"),
            event("piano", 0, 3, 0, "E4"),
        ];
        let kept = dedupe_mono(events, &Registry::new());
        let notes: Vec<&str> = kept.iter().map(|e| e.notes[0].as_str()).collect();
        assert_eq!(notes, ["E2", "G2", "C4", "E4"]);
    }

    #[test]
    fn mono_tie_breaks_on_token() {
        let events = vec![event("lead", 2, 4, 3, "A4"), event("lead", 2, 4, 1, "B4")];
        let kept = dedupe_mono(events, &Registry::new());
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].notes, ["A4"]);
    }

    #[test]
    fn prepare_skips_failed_channels() {
        let mut registry = Registry::new();
        let comp = Compiler::compile(
            "vox: https://example.com/missing.wav\nvox: x x\nkick: x - x -",
            &mut registry,
        );
        let prepared = prepare(
            &comp,
            &registry,
            &HashMap::new(),
            &HashMap::new(),
            &RenderSettings::default(),
            &NoSamples,
        );
        assert_eq!(prepared.failed_channels, ["vox"]);
        assert_eq!(prepared.events.len(), 2);
        assert!(prepared.events.iter().all(|e| e.instrument == "kick"));
        assert!(prepared.router.has_route("kick"));
        assert!(!prepared.router.has_route("vox"));
    }

    #[test]
    fn prepare_dedupes_with_the_callers_registry() {
        let mut registry = Registry::new();
        let comp = Compiler::compile("bass: C2 D2\nbass: E2 -\npiano: C4\npiano: E4", &mut registry);
        let prepared = prepare(
            &comp,
            &registry,
            &HashMap::new(),
            &HashMap::new(),
            &RenderSettings::default(),
            &NoSamples,
        );
        let notes: Vec<&str> = prepared.events.iter().map(|e| e.notes[0].as_str()).collect();
        assert_eq!(notes, ["D2", "E2", "C4", "E4"]);
    }

    #[test]
    fn tempo_must_be_positive() {
        assert!(check_tempo(120.0).is_ok());
        assert!(matches!(check_tempo(0.0), Err(RenderError::InvalidTempo(_))));
        assert!(check_tempo(f64::NAN).is_err());
    }
}
