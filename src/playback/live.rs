//! Live playback — a session that renders blocks on demand and feeds an [`AudioSink`].
//!
//! The caller drives the session by calling [`LiveSession::pump`] in a loop.
//! Rendering stays a few blocks ahead of the sink, so tempo and volume changes
//! are heard within a few blocks.

use std::collections::HashMap;

use log::{info, warn};

use crate::audio::AudioSink;
use crate::dsl::Composition;
use crate::event::{Beat, EventObserver, EventScheduler, NoteEvent, PlayState, RenderContext};
use crate::instrument::{
    DefaultSource, InstrumentConfig, InstrumentRouter, Registry, SampleSource,
};

use super::{check_tempo, prepare, RenderError, RenderSettings};

/// Blocks rendered ahead of what the sink has played.
const BLOCKS_AHEAD: usize = 4;

/// What [`LiveSession::start`] set up.
#[derive(Debug, Clone, PartialEq)]
pub struct StartReport {
    /// Length of one pass (and of the loop, when looping).
    pub total_beats: Beat,
    /// Custom channels whose samples could not be loaded; their events are skipped.
    pub failed_channels: Vec<String>,
}

pub struct LiveSession<S: AudioSink> {
    sink: S,
    settings: RenderSettings,
    source: Box<dyn SampleSource>,
    scheduler: EventScheduler,
    router: InstrumentRouter,
    end: Beat,
}

impl<S: AudioSink> LiveSession<S> {
    /// A session loading custom samples through [`DefaultSource`].
    pub fn new(sink: S, settings: RenderSettings) -> Self {
        Self::with_source(sink, settings, Box::new(DefaultSource))
    }

    pub fn with_source(sink: S, settings: RenderSettings, source: Box<dyn SampleSource>) -> Self {
        let scheduler = EventScheduler::new(
            120.0,
            settings.sample_rate,
            settings.channels,
            settings.block_size.max(1),
        );
        Self {
            sink,
            settings,
            source,
            scheduler,
            router: InstrumentRouter::new(),
            end: Beat::ZERO,
        }
    }

    /// Start playing `composition`, replacing whatever was playing.
    ///
    /// Custom samples are loaded before anything sounds. A channel whose
    /// sample fails is reported and stays silent; the rest still play.
    pub fn start(
        &mut self,
        composition: &Composition,
        registry: &Registry,
        bpm: f64,
        looping: bool,
        volumes: &HashMap<String, f64>,
        configs: &HashMap<String, InstrumentConfig>,
    ) -> Result<StartReport, RenderError> {
        self.stop()?;
        if composition.max_beats == Beat::ZERO {
            return Err(RenderError::NothingToRender);
        }
        check_tempo(bpm)?;

        let prepared = prepare(
            composition,
            registry,
            volumes,
            configs,
            &self.settings,
            self.source.as_ref(),
        );
        for name in &prepared.failed_channels {
            warn!("channel '{name}' is silent: its sample failed to load");
        }

        self.router = prepared.router;
        self.end = composition.max_beats;
        self.scheduler.load(prepared.events);
        self.scheduler
            .set_loop(looping.then_some(composition.max_beats));
        self.scheduler.set_bpm(bpm);
        self.scheduler.play();

        info!(
            "live session started: {} beat(s) at {bpm} BPM{}",
            self.end.as_beats_f64(),
            if looping { ", looping" } else { "" }
        );

        Ok(StartReport {
            total_beats: self.end,
            failed_channels: prepared.failed_channels,
        })
    }

    /// Render and send the next block if the sink needs one.
    ///
    /// Returns `false` once the session is stopped or, without looping, has
    /// played to the end and every tail has drained.
    pub fn pump(&mut self) -> Result<bool, RenderError> {
        if !self.is_playing() {
            return Ok(false);
        }
        if self.scheduler.is_finished(self.end) {
            self.scheduler.stop();
            info!("live session finished");
            return Ok(false);
        }

        let ahead = self.settings.block_size as usize * self.settings.channels as usize * BLOCKS_AHEAD;
        if self.sink.buffered() >= ahead {
            return Ok(true);
        }

        let router = &self.router;
        let mut render = |event: &NoteEvent, ctx: &RenderContext| router.render(event, ctx);
        match self.scheduler.render_block(&mut render) {
            Some(block) => {
                self.sink.send(block)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Stop immediately: pending events are dropped, sounding notes cut, and
    /// the sink cleared. Safe to call at any time.
    pub fn stop(&mut self) -> Result<(), RenderError> {
        if self.is_playing() {
            info!("live session stopped");
        }
        self.scheduler.stop();
        self.sink.stop()?;
        Ok(())
    }

    /// Change tempo in place. Sounding notes keep their length.
    pub fn set_tempo(&mut self, bpm: f64) -> Result<(), RenderError> {
        check_tempo(bpm)?;
        self.scheduler.set_bpm(bpm);
        Ok(())
    }

    /// Change a channel's level in place; applies to events triggered from now on.
    pub fn set_channel_volume(&mut self, channel: &str, db: f64) {
        self.router.set_channel_volume(channel, db);
    }

    pub fn set_observer(&mut self, observer: Box<dyn EventObserver>) {
        self.scheduler.set_observer(observer);
    }

    pub fn is_playing(&self) -> bool {
        self.scheduler.transport().state() == PlayState::Playing
    }

    /// Current position within the pass or loop.
    pub fn position(&self) -> Beat {
        self.scheduler.transport().position()
    }

    pub fn bpm(&self) -> f64 {
        self.scheduler.transport().bpm()
    }

    pub fn settings(&self) -> &RenderSettings {
        &self.settings
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }
}
