//! User configuration — optional ~/.staffline/config.yaml with engine defaults.

use std::path::{Path, PathBuf};

use log::warn;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::playback::RenderSettings;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_yaml::Error,
    },
}

/// Engine and playback defaults. Every field is optional in the file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub bpm: f64,
    pub sample_rate: u32,
    pub channels: u16,
    pub block_size: u32,
    /// Seconds of release tail appended to offline renders.
    pub tail_secs: f64,
    pub seed: u64,
    /// Whether `play` loops by default.
    pub looping: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bpm: 120.0,
            sample_rate: 44100,
            channels: 2,
            block_size: 1024,
            tail_secs: 1.0,
            seed: 42,
            looping: true,
        }
    }
}

impl Config {
    /// The standard location, if a home directory is known.
    pub fn path() -> Option<PathBuf> {
        dirs::home_dir().map(|h| h.join(".staffline").join("config.yaml"))
    }

    /// Load from the standard path. A missing file gives the defaults; a
    /// malformed one is reported and also gives the defaults.
    pub fn load() -> Self {
        let Some(path) = Self::path() else {
            return Self::default();
        };
        if !path.exists() {
            return Self::default();
        }
        match Self::load_from(&path) {
            Ok(config) => config,
            Err(e) => {
                warn!("{e}; using default configuration");
                Self::default()
            }
        }
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        // An empty file is an empty mapping, not an error.
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn render_settings(&self) -> RenderSettings {
        RenderSettings {
            sample_rate: self.sample_rate.max(1),
            channels: self.channels.max(1),
            block_size: self.block_size.max(1),
            tail_secs: self.tail_secs.max(0.0),
            seed: self.seed,
        }
    }
}
