//! Per-instrument synthesis overrides from the `instruments:` block of a song document.

use serde::{Deserialize, Serialize};

use super::oscillator::Waveform;

/// Optional synthesis parameters for one channel. Unset fields keep the
/// instrument's own defaults.
///
/// ```yaml
/// instruments:
///   lead:
///     oscillator: square
///     attack: 0.01
///     release: 0.3
///     filter: 1800
///     filterQ: 4
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InstrumentConfig {
    pub oscillator: Option<Waveform>,
    /// Seconds.
    pub attack: Option<f64>,
    /// Seconds.
    pub decay: Option<f64>,
    /// Level, 0–1.
    pub sustain: Option<f64>,
    /// Seconds.
    pub release: Option<f64>,
    /// Low-pass cutoff in Hz.
    pub filter: Option<f64>,
    /// Low-pass resonance.
    #[serde(rename = "filterQ")]
    pub filter_q: Option<f64>,
}

impl InstrumentConfig {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Parse one override entry. Entries that are not a mapping of known
    /// value types yield `None`.
    pub fn from_value(value: &serde_yaml::Value) -> Option<Self> {
        if !value.is_mapping() {
            return None;
        }
        serde_yaml::from_value(value.clone()).ok()
    }
}
