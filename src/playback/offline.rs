//! Offline rendering — the whole composition, once, straight into WAV bytes.

use std::collections::HashMap;

use log::{info, warn};

use crate::audio::Limiter;
use crate::dsl::Composition;
use crate::event::{Beat, EventScheduler};
use crate::instrument::{InstrumentConfig, Registry, SampleSource};

use super::{check_tempo, prepare, wav, RenderError, RenderSettings};

/// A finished offline render.
#[derive(Debug, Clone, PartialEq)]
pub struct OfflineRender {
    /// Complete WAV file.
    pub wav: Vec<u8>,
    /// Custom channels whose samples could not be loaded.
    pub failed_channels: Vec<String>,
    /// Frames in the file.
    pub frames: u64,
}

/// Render `composition` at `bpm` without looping.
///
/// The file lasts `max_beats` at `bpm` plus `settings.tail_secs`, truncated to
/// whole frames, and passes through the master limiter. The same inputs
/// always produce the same bytes.
pub fn render_offline(
    composition: &Composition,
    registry: &Registry,
    bpm: f64,
    volumes: &HashMap<String, f64>,
    configs: &HashMap<String, InstrumentConfig>,
    settings: &RenderSettings,
    source: &dyn SampleSource,
) -> Result<OfflineRender, RenderError> {
    if composition.max_beats == Beat::ZERO {
        return Err(RenderError::NothingToRender);
    }
    check_tempo(bpm)?;

    let prepared = prepare(composition, registry, volumes, configs, settings, source);
    for name in &prepared.failed_channels {
        warn!("channel '{name}' is silent in this render: its sample failed to load");
    }

    let total_secs = composition.max_beats.to_seconds(bpm) + settings.tail_secs.max(0.0);
    let frames = (total_secs * settings.sample_rate as f64) as u64;
    let total_samples = frames as usize * settings.channels as usize;

    let mut scheduler = EventScheduler::new(
        bpm,
        settings.sample_rate,
        settings.channels,
        settings.block_size.max(1),
    );
    scheduler.load(prepared.events);
    scheduler.play();

    let mut render = prepared.router.into_render_fn();
    let mut samples = Vec::with_capacity(total_samples);
    while samples.len() < total_samples {
        match scheduler.render_block(&mut render) {
            Some(block) => samples.extend(block),
            None => break,
        }
    }
    samples.truncate(total_samples);

    Limiter::with_sample_rate(settings.sample_rate).process_block(&mut samples, settings.channels);
    let wav = wav::encode(&samples, settings.sample_rate, settings.channels)?;

    info!(
        "rendered {:.2}s ({frames} frames) at {bpm} BPM, {} bytes",
        total_secs,
        wav.len()
    );

    Ok(OfflineRender {
        wav,
        failed_channels: prepared.failed_channels,
        frames,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dsl::Compiler;
    use crate::instrument::DefaultSource;

    fn render(text: &str, bpm: f64, settings: &RenderSettings) -> Result<OfflineRender, RenderError> {
        let mut registry = Registry::new();
        let comp = Compiler::compile(text, &mut registry);
        render_offline(
            &comp,
            &registry,
            bpm,
            &HashMap::new(),
            &HashMap::new(),
            settings,
            &DefaultSource,
        )
    }

    #[test]
    fn duration_is_beats_plus_tail() {
        // 4 beats at 120 BPM = 2 s, plus 1 s tail.
        let out = render("C4 D4 E4 F4", 120.0, &RenderSettings::default()).unwrap();
        assert_eq!(out.frames, 3 * 44100);
        assert_eq!(out.wav.len(), 44 + 3 * 44100 * 2 * 2);
        assert!(out.failed_channels.is_empty());
    }

    #[test]
    fn frames_are_truncated() {
        let settings = RenderSettings {
            sample_rate: 1000,
            tail_secs: 0.0,
            ..RenderSettings::default()
        };
        // 1 beat at 70 BPM = 0.857142... s → 857 frames.
        let out = render("x", 70.0, &settings).unwrap();
        assert_eq!(out.frames, 857);
    }

    #[test]
    fn empty_composition_is_an_error() {
        let err = render("- - -\n\n", 120.0, &RenderSettings::default()).unwrap_err();
        assert!(matches!(err, RenderError::NothingToRender));
    }

    #[test]
    fn bad_tempo_is_an_error() {
        let err = render("C4", 0.0, &RenderSettings::default()).unwrap_err();
        assert!(matches!(err, RenderError::InvalidTempo(_)));
    }

    #[test]
    fn deterministic_bytes() {
        let text = "C4 [E4 G4] -\nbass: C2~ C2~\nsnare: x x x\npluck: e5 g5 b5";
        let a = render(text, 128.0, &RenderSettings::default()).unwrap();
        let b = render(text, 128.0, &RenderSettings::default()).unwrap();
        assert_eq!(a.wav, b.wav);
    }

    #[test]
    fn audible_and_limited() {
        let out = render("[C4 E4 G4 C5] [C4 E4 G4 C5]\nkick: x x\nsnare: x x\nclap: x x", 120.0, &RenderSettings::default())
            .unwrap();
        let reader = hound::WavReader::new(std::io::Cursor::new(out.wav)).unwrap();
        let samples: Vec<i16> = reader.into_samples::<i16>().map(Result::unwrap).collect();
        let peak = samples.iter().map(|s| s.unsigned_abs()).max().unwrap();
        assert!(peak > 1000);
        assert!(peak as f32 <= 0.95 * i16::MAX as f32 + 1.0);
    }

    #[test]
    fn mono_settings() {
        let settings = RenderSettings {
            channels: 1,
            tail_secs: 0.5,
            ..RenderSettings::default()
        };
        let out = render("C4", 60.0, &settings).unwrap();
        assert_eq!(out.frames, 66150);
        assert_eq!(out.wav.len(), 44 + 66150 * 2);
    }
}
