//! Musical time representation using integer ticks.
//!
//! Uses 960 PPQN (Pulses Per Quarter Note) so that dotted and tied durations
//! (multiples of 1.5 beats) stay exact. Conversion to seconds or sample
//! offsets happens only at the rendering boundary.

use std::cmp::Ordering;
use std::ops::{Add, AddAssign, Sub};

use serde::{Serialize, Serializer};

/// Ticks per quarter note (beat). 960 divides cleanly by 2, 3, 4, 5, 6, 8, ...
pub const TICKS_PER_BEAT: u64 = 960;

/// Musical time measured in integer ticks at [`TICKS_PER_BEAT`] resolution.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, Default)]
pub struct Beat {
    ticks: u64,
}

impl Beat {
    /// The very start of a line.
    pub const ZERO: Beat = Beat { ticks: 0 };

    /// One quarter note.
    pub const ONE: Beat = Beat {
        ticks: TICKS_PER_BEAT,
    };

    /// A dotted quarter note (1.5 beats).
    pub const DOTTED: Beat = Beat {
        ticks: TICKS_PER_BEAT + TICKS_PER_BEAT / 2,
    };

    /// Create a `Beat` from a raw tick count.
    pub fn from_ticks(ticks: u64) -> Self {
        Self { ticks }
    }

    /// Create a `Beat` from whole beats (quarter notes).
    pub fn from_beats(beats: u32) -> Self {
        Self {
            ticks: beats as u64 * TICKS_PER_BEAT,
        }
    }

    /// Create a `Beat` from a fractional beat value (e.g. 1.5 = one and a half beats).
    pub fn from_beats_f64(beats: f64) -> Self {
        Self {
            ticks: (beats.max(0.0) * TICKS_PER_BEAT as f64).round() as u64,
        }
    }

    /// Return the raw tick count.
    pub fn ticks(self) -> u64 {
        self.ticks
    }

    /// Convert to a floating-point beat value.
    pub fn as_beats_f64(self) -> f64 {
        self.ticks as f64 / TICKS_PER_BEAT as f64
    }

    /// Whole beats needed to cover this span, rounding partial beats up.
    pub fn ceil_beats(self) -> u64 {
        self.ticks.div_ceil(TICKS_PER_BEAT)
    }

    /// Wall-clock seconds at the given tempo (`60 / bpm` seconds per beat).
    pub fn to_seconds(self, bpm: f64) -> f64 {
        self.as_beats_f64() * 60.0 / bpm
    }

    /// Convert this beat position to a sample offset given BPM and sample rate.
    ///
    /// Formula: `(ticks * 60 * sample_rate) / (TICKS_PER_BEAT * bpm)`
    pub fn to_sample_offset(self, bpm: f64, sample_rate: u32) -> u64 {
        let numerator = self.ticks as f64 * 60.0 * sample_rate as f64;
        let denominator = TICKS_PER_BEAT as f64 * bpm;
        (numerator / denominator).round() as u64
    }

    /// Wrap this position into `[0, length)`. A zero length leaves it unchanged.
    pub fn wrap(self, length: Beat) -> Self {
        if length.ticks == 0 {
            self
        } else {
            Self {
                ticks: self.ticks % length.ticks,
            }
        }
    }
}

impl Ord for Beat {
    fn cmp(&self, other: &Self) -> Ordering {
        self.ticks.cmp(&other.ticks)
    }
}

impl PartialOrd for Beat {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Add for Beat {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self {
            ticks: self.ticks + rhs.ticks,
        }
    }
}

impl AddAssign for Beat {
    fn add_assign(&mut self, rhs: Self) {
        self.ticks += rhs.ticks;
    }
}

impl Sub for Beat {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        Self {
            ticks: self.ticks.saturating_sub(rhs.ticks),
        }
    }
}

/// Serialized as fractional beats.
impl Serialize for Beat {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(self.as_beats_f64())
    }
}
