//! staffline — a plain-text multi-track music notation compiler with live
//! playback and WAV export.

pub mod audio;
pub mod config;
pub mod dsl;
pub mod event;
pub mod instrument;
pub mod playback;
pub mod song;
