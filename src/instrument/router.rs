//! Instrument router — dispatches events to the instrument of their channel.

use std::collections::HashMap;
use std::sync::Arc;

use log::debug;

use crate::event::{NoteEvent, RenderContext, RenderFn};

use super::{
    BassSynth, DrumKit, Instrument, InstrumentConfig, InstrumentKind, PluckSynth, PolySynth,
    Registry, SampleBank,
};

/// Convert a level in decibels to a linear gain.
pub fn db_to_gain(db: f64) -> f32 {
    10f64.powf(db / 20.0) as f32
}

/// Routes events to an instrument by channel name, applying per-channel gain.
pub struct InstrumentRouter {
    routes: HashMap<String, Box<dyn Instrument>>,
    gains: HashMap<String, f32>,
}

impl InstrumentRouter {
    pub fn new() -> Self {
        Self {
            routes: HashMap::new(),
            gains: HashMap::new(),
        }
    }

    /// Add or replace the instrument for a channel.
    pub fn add_route(&mut self, channel: &str, instrument: Box<dyn Instrument>) {
        self.routes.insert(channel.to_string(), instrument);
    }

    pub fn has_route(&self, channel: &str) -> bool {
        self.routes.contains_key(channel)
    }

    /// Set a channel's level in dB. Takes effect on the next rendered event.
    pub fn set_channel_volume(&mut self, channel: &str, db: f64) {
        self.gains.insert(channel.to_string(), db_to_gain(db));
    }

    /// Linear gain for a channel; 1.0 when none was set.
    pub fn gain(&self, channel: &str) -> f32 {
        self.gains.get(channel).copied().unwrap_or(1.0)
    }

    /// Render an event with its channel's instrument. Unrouted channels are silent.
    pub fn render(&self, event: &NoteEvent, ctx: &RenderContext) -> Vec<f32> {
        let Some(instrument) = self.routes.get(&event.instrument) else {
            return Vec::new();
        };
        let mut out = instrument.render(event, ctx);
        let gain = self.gain(&event.instrument);
        if gain != 1.0 {
            out.iter_mut().for_each(|s| *s *= gain);
        }
        out
    }

    pub fn into_render_fn(self) -> RenderFn {
        Box::new(move |event: &NoteEvent, ctx: &RenderContext| self.render(event, ctx))
    }

    /// Build routes for `channels`, picking each voice by its kind in `registry`.
    ///
    /// Pitched channels get their synth (with any config override applied).
    /// Percussion and custom sample channels play from `bank` through the drum
    /// kit; one whose sample is missing gets no route. Channels the registry
    /// does not know get no route either.
    pub fn build<'a>(
        channels: impl IntoIterator<Item = &'a str>,
        registry: &Registry,
        configs: &HashMap<String, InstrumentConfig>,
        volumes: &HashMap<String, f64>,
        bank: Arc<SampleBank>,
        seed: u64,
    ) -> Self {
        let mut router = Self::new();
        let default_config = InstrumentConfig::default();

        for channel in channels {
            let config = configs.get(channel).unwrap_or(&default_config);
            let kind = registry.get(channel).map(|spec| spec.kind);
            let instrument: Option<Box<dyn Instrument>> = match (kind, channel) {
                (Some(InstrumentKind::Pitched), "piano") => {
                    Some(Box::new(PolySynth::piano().with_config(config)))
                }
                (Some(InstrumentKind::Pitched), "lead") => {
                    Some(Box::new(PolySynth::lead().with_config(config)))
                }
                (Some(InstrumentKind::Pitched), "pad") => {
                    Some(Box::new(PolySynth::pad().with_config(config)))
                }
                (Some(InstrumentKind::Pitched), "bass") => {
                    Some(Box::new(BassSynth::new().with_config(config)))
                }
                (Some(InstrumentKind::Pitched), "pluck") => {
                    Some(Box::new(PluckSynth::new(seed).with_config(config)))
                }
                (Some(InstrumentKind::Percussion | InstrumentKind::CustomSample), name)
                    if bank.contains(name) =>
                {
                    Some(Box::new(DrumKit::new(Arc::clone(&bank))))
                }
                _ => None,
            };

            match instrument {
                Some(instrument) => {
                    debug!("routing '{channel}' to {}", instrument.name());
                    router.add_route(channel, instrument);
                }
                None => debug!("no instrument for '{channel}', its events are skipped"),
            }
        }

        for (channel, &db) in volumes {
            router.set_channel_volume(channel, db);
        }

        router
    }
}

impl Default for InstrumentRouter {
    fn default() -> Self {
        Self::new()
    }
}
