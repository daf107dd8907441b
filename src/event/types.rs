//! Event data model — the compiled unit the scheduler and instruments consume.
//!
//! A [`NoteEvent`] is one sounding thing on one channel: a single pitch, a
//! chord, or a percussion hit, with its start, length, and velocity class.

use serde::Serialize;

use super::beat::Beat;

/// Velocity of soft (lowercase) notes on a 0–1 scale.
pub const SOFT_VELOCITY: f32 = 0.4;

/// Velocity of normal (uppercase) notes on a 0–1 scale.
pub const NORMAL_VELOCITY: f32 = 0.8;

/// Placeholder pitch carried by percussion hits. Percussion ignores pitch.
pub const HIT_PITCH: &str = "C4";

/// A single compiled event on one line.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NoteEvent {
    /// Pitch names, e.g. `["C4", "E4", "G4"]`.
    pub notes: Vec<String>,
    /// Start offset from the start of the line.
    pub beat: Beat,
    /// Length of the event.
    pub duration: Beat,
    /// Line the event came from.
    pub line_index: usize,
    /// Token within that line the event came from.
    pub token_index: usize,
    /// Velocity class: lowercase letters are soft.
    pub soft: bool,
    /// Channel that plays the event.
    pub instrument: String,
}

impl NoteEvent {
    /// An event at line 0, token 0.
    pub fn new(instrument: &str, notes: &[&str], beat: Beat, duration: Beat) -> Self {
        Self {
            notes: notes.iter().map(|n| n.to_string()).collect(),
            beat,
            duration,
            line_index: 0,
            token_index: 0,
            soft: false,
            instrument: instrument.to_string(),
        }
    }

    pub fn with_soft(mut self, soft: bool) -> Self {
        self.soft = soft;
        self
    }

    /// Velocity on a 0–1 scale.
    pub fn velocity(&self) -> f32 {
        if self.soft {
            SOFT_VELOCITY
        } else {
            NORMAL_VELOCITY
        }
    }

    /// End of the event (`beat + duration`).
    pub fn end(&self) -> Beat {
        self.beat + self.duration
    }

    /// Move the event to a new start position, keeping everything else.
    pub fn shifted(&self, offset: Beat) -> Self {
        Self {
            beat: self.beat + offset,
            ..self.clone()
        }
    }
}
