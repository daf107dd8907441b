//! Structured song documents — sections, a song order, and per-channel overrides.
//!
//! A song document is YAML:
//!
//! ```yaml
//! bpm: 96
//! volumes: { bass: -3 }
//! instruments:
//!   lead: { oscillator: square, release: 0.3 }
//! samples:
//!   vox: https://example.com/vox.wav
//! sections:
//!   verse:
//!     piano: C4 E4 G4 E4
//!     piano: [C3 E3 G3] - - -
//!     bass: C2 - G2 -
//!   chorus:
//!     lead: G4 A4 B4 C5
//! song:
//!   - verse x2
//!   - chorus
//! ```
//!
//! [`expand`] flattens it into one `<instrument>: <pattern>` line per channel
//! and sub-line, padding every section an instrument sits out with rests so
//! all lines stay aligned. Section values are notation, never YAML: a value
//! starting with a chord is still one pattern. A block list under an
//! instrument gives one sub-line per item.

pub mod keys;

use std::collections::HashMap;

use log::{debug, warn};
use regex::Regex;
use serde_yaml::{Mapping, Value};

use crate::dsl::compile::compile_tokens;
use crate::dsl::lexer::tokenize;
use crate::dsl::prefix::is_url;
use crate::event::{Beat, TICKS_PER_BEAT};
use crate::instrument::{InstrumentConfig, SampleDeclaration};

/// Top-level keys that mark a document as structured.
pub const TOP_LEVEL_KEYS: [&str; 6] = ["bpm", "volumes", "instruments", "samples", "sections", "song"];

/// `name`, `name x3`, `name x 3`, `name *3`.
const SONG_ENTRY: &str = r"^(.+?)(?:\s+[xX]\s*(\d+)|\s*\*\s*(\d+))?$";

/// Most times one song entry may repeat its section.
pub const MAX_REPEAT: usize = 10_000;

/// Scalar settings carried alongside the notes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Overrides {
    pub bpm: Option<f64>,
    /// Channel name → level offset in dB.
    pub volumes: HashMap<String, f64>,
    /// Channel name → synthesis overrides.
    pub instruments: HashMap<String, InstrumentConfig>,
}

/// A flattened song document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Expansion {
    /// Flat multi-line text, sample declarations first.
    pub flat_text: String,
    pub samples: Vec<SampleDeclaration>,
    pub overrides: Overrides,
}

#[derive(Debug)]
struct Section {
    name: String,
    /// Instrument → patterns, one per sub-line, in document order.
    parts: Vec<(String, Vec<String>)>,
    length: Beat,
}

impl Section {
    fn pattern(&self, instrument: &str, sub_line: usize) -> Option<&str> {
        self.parts
            .iter()
            .find(|(name, _)| name == instrument)
            .and_then(|(_, patterns)| patterns.get(sub_line))
            .map(String::as_str)
    }
}

/// Whether any line starts (at column 0) with a recognised top-level key.
pub fn is_structured(text: &str) -> bool {
    text.lines().any(|line| {
        TOP_LEVEL_KEYS.iter().any(|key| {
            line.strip_prefix(key)
                .is_some_and(|rest| rest.trim_start_matches([' ', '\t']).starts_with(':'))
        })
    })
}

/// Expand a structured document into flat text plus overrides.
///
/// Returns `None` for anything that is not a structured document, including
/// YAML that fails to parse or whose root is not a mapping; the caller then
/// treats the input as flat text.
pub fn expand(text: &str) -> Option<Expansion> {
    if !is_structured(text) {
        return None;
    }

    let prepared = keys::disambiguate(text);
    let root = match serde_yaml::from_str::<Value>(&prepared) {
        Ok(Value::Mapping(root)) => root,
        Ok(_) => {
            debug!("song document root is not a mapping; treating as flat text");
            return None;
        }
        Err(e) => {
            debug!("not a song document ({e}); treating as flat text");
            return None;
        }
    };

    let sections = parse_sections(root.get("sections"));
    let order = song_order(root.get("song"), &sections);

    // Instrument union in first-seen order, with the widest sub-line count.
    let mut channels: Vec<(&str, usize)> = Vec::new();
    for section in &order {
        for (instrument, patterns) in &section.parts {
            match channels.iter_mut().find(|(name, _)| *name == instrument.as_str()) {
                Some((_, count)) => *count = (*count).max(patterns.len()),
                None => channels.push((instrument.as_str(), patterns.len())),
            }
        }
    }

    let samples = parse_samples(root.get("samples"));
    let mut lines: Vec<String> = samples
        .iter()
        .map(|decl| format!("{}: {}", decl.name, decl.url))
        .collect();

    for &(instrument, count) in &channels {
        for sub_line in 0..count {
            let pieces: Vec<String> = order
                .iter()
                .filter(|section| section.length > Beat::ZERO)
                .map(|section| match section.pattern(instrument, sub_line) {
                    Some(pattern) => pad_to(pattern, section.length),
                    None => rests(section.length.ceil_beats()),
                })
                .filter(|piece| !piece.is_empty())
                .collect();
            lines.push(format!("{instrument}: {}", pieces.join(" ")));
        }
    }

    let overrides = Overrides {
        bpm: root
            .get("bpm")
            .and_then(Value::as_f64)
            .filter(|bpm| bpm.is_finite() && *bpm > 0.0),
        volumes: parse_volumes(root.get("volumes")),
        instruments: parse_instruments(root.get("instruments")),
    };

    debug!(
        "expanded song: {} section instance(s), {} channel line(s), {} sample(s)",
        order.len(),
        lines.len() - samples.len(),
        samples.len()
    );

    Some(Expansion {
        flat_text: lines.join("\n"),
        samples,
        overrides,
    })
}

fn scalar_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn mapping(value: Option<&Value>) -> Option<&Mapping> {
    value.and_then(Value::as_mapping)
}

fn is_whole_beats(length: Beat) -> bool {
    length.ticks() % TICKS_PER_BEAT == 0
}

fn pattern_length(pattern: &str) -> Beat {
    compile_tokens(&tokenize(pattern), 0, "").1
}

fn rests(count: u64) -> String {
    vec!["-"; count as usize].join(" ")
}

/// Append rests until `pattern` covers `length`.
fn pad_to(pattern: &str, length: Beat) -> String {
    let pattern = pattern.trim();
    let missing = length
        .ceil_beats()
        .saturating_sub(pattern_length(pattern).ceil_beats());
    match (pattern.is_empty(), missing) {
        (_, 0) => pattern.to_string(),
        (true, n) => rests(n),
        (false, n) => format!("{pattern} {}", rests(n)),
    }
}

fn parse_sections(value: Option<&Value>) -> Vec<Section> {
    let Some(sections) = mapping(value) else {
        return Vec::new();
    };

    sections
        .iter()
        .filter_map(|(key, body)| {
            let name = scalar_string(key)?;
            let mut parts: Vec<(String, Vec<String>)> = Vec::new();

            if let Some(body) = body.as_mapping() {
                for (instrument_key, value) in body {
                    let Some(raw_key) = scalar_string(instrument_key) else {
                        continue;
                    };
                    let (base, _) = keys::split_repeat(&raw_key);
                    let instrument = base.trim().to_ascii_lowercase();

                    let patterns: Vec<String> = match value {
                        Value::Sequence(items) => items.iter().filter_map(scalar_string).collect(),
                        other => scalar_string(other).into_iter().collect(),
                    };
                    if patterns.is_empty() {
                        continue;
                    }
                    match parts.iter_mut().find(|(n, _)| *n == instrument) {
                        Some((_, existing)) => existing.extend(patterns),
                        None => parts.push((instrument, patterns)),
                    }
                }
            }

            let length = parts
                .iter()
                .flat_map(|(_, patterns)| patterns.iter())
                .map(|p| pattern_length(p))
                .max()
                .unwrap_or(Beat::ZERO);
            if !is_whole_beats(length) {
                warn!(
                    "section '{name}' is {} beat(s) long; instruments it leaves out are padded \
                     to {} and drift from the rest after each repeat",
                    length.as_beats_f64(),
                    length.ceil_beats()
                );
            }

            Some(Section {
                name,
                parts,
                length,
            })
        })
        .collect()
}

/// Parse one `song` entry into a section name and repeat count.
fn parse_entry<'a>(entry: &'a str, re: &Regex) -> Option<(&'a str, usize)> {
    let caps = re.captures(entry.trim())?;
    let name = caps.get(1)?.as_str().trim();
    let count = match caps.get(2).or_else(|| caps.get(3)) {
        Some(n) => match n.as_str().parse::<usize>() {
            Ok(count) if count <= MAX_REPEAT => count,
            _ => {
                warn!("'{entry}' repeats more than {MAX_REPEAT} times; capped");
                MAX_REPEAT
            }
        },
        None => 1,
    };
    Some((name, count))
}

fn song_order<'a>(value: Option<&Value>, sections: &'a [Section]) -> Vec<&'a Section> {
    let entries: Vec<String> = match value {
        Some(Value::Sequence(items)) => items.iter().filter_map(scalar_string).collect(),
        Some(other @ (Value::String(_) | Value::Number(_))) => {
            scalar_string(other).into_iter().collect()
        }
        _ => return sections.iter().collect(),
    };
    let Ok(re) = Regex::new(SONG_ENTRY) else {
        return sections.iter().collect();
    };

    let mut order = Vec::new();
    for entry in &entries {
        let Some((name, count)) = parse_entry(entry, &re) else {
            warn!("ignoring song entry '{entry}'");
            continue;
        };
        match sections.iter().find(|s| s.name == name) {
            Some(section) => order.extend(std::iter::repeat(section).take(count)),
            None => warn!("song references undefined section '{name}'; skipped"),
        }
    }
    order
}

fn parse_samples(value: Option<&Value>) -> Vec<SampleDeclaration> {
    let Some(samples) = mapping(value) else {
        return Vec::new();
    };
    samples
        .iter()
        .filter_map(|(key, url)| {
            let name = scalar_string(key)?.trim().to_ascii_lowercase();
            let url = url.as_str()?.trim();
            if !is_url(url) {
                warn!("sample '{name}' has no usable URL; skipped");
                return None;
            }
            Some(SampleDeclaration {
                name,
                url: url.to_string(),
            })
        })
        .collect()
}

fn parse_volumes(value: Option<&Value>) -> HashMap<String, f64> {
    let Some(volumes) = mapping(value) else {
        return HashMap::new();
    };
    volumes
        .iter()
        .filter_map(|(key, db)| {
            let name = scalar_string(key)?.trim().to_ascii_lowercase();
            let db = db.as_f64().filter(|v| v.is_finite())?;
            Some((name, db))
        })
        .collect()
}

fn parse_instruments(value: Option<&Value>) -> HashMap<String, InstrumentConfig> {
    let Some(instruments) = mapping(value) else {
        return HashMap::new();
    };
    instruments
        .iter()
        .filter_map(|(key, body)| {
            let name = scalar_string(key)?.trim().to_ascii_lowercase();
            Some((name, InstrumentConfig::from_value(body)?))
        })
        .collect()
}
