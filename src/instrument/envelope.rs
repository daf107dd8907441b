//! ADSR envelope shared by the pitched instruments.

use super::config::InstrumentConfig;

/// Attack-Decay-Sustain-Release envelope.
///
/// Times are in seconds. Sustain is a level (0.0–1.0).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AdsrEnvelope {
    pub attack: f64,
    pub decay: f64,
    pub sustain: f64,
    pub release: f64,
}

impl AdsrEnvelope {
    pub const fn new(attack: f64, decay: f64, sustain: f64, release: f64) -> Self {
        Self {
            attack,
            decay,
            sustain,
            release,
        }
    }

    /// Apply the envelope fields of a channel override.
    pub fn with_overrides(self, config: &InstrumentConfig) -> Self {
        Self {
            attack: config.attack.map_or(self.attack, |v| v.max(0.0)),
            decay: config.decay.map_or(self.decay, |v| v.max(0.0)),
            sustain: config.sustain.map_or(self.sustain, |v| v.clamp(0.0, 1.0)),
            release: config.release.map_or(self.release, |v| v.max(0.0)),
        }
    }

    /// Level while the note is held, ignoring release.
    fn held_level(&self, t: f64) -> f64 {
        if t < self.attack {
            t / self.attack
        } else if t < self.attack + self.decay {
            let decay_t = (t - self.attack) / self.decay;
            1.0 - decay_t * (1.0 - self.sustain)
        } else {
            self.sustain
        }
    }

    /// Amplitude at time `t` for a note held for `note_duration` seconds.
    ///
    /// Release ramps linearly to zero from whatever level the note had
    /// reached when it was let go, so short notes never jump.
    pub fn amplitude(&self, t: f64, note_duration: f64) -> f64 {
        if t < 0.0 {
            return 0.0;
        }
        if t < note_duration {
            return self.held_level(t);
        }

        let released = t - note_duration;
        if released >= self.release {
            return 0.0;
        }
        let start = self.held_level(note_duration);
        start * (1.0 - released / self.release)
    }

    /// Seconds of sound for a note, including the release tail.
    pub fn total_duration(&self, note_duration: f64) -> f64 {
        note_duration + self.release
    }
}
