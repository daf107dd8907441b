//! Song document pre-pass, run on the raw text before YAML parsing.
//!
//! A section may list the same instrument twice (melody and chords on two
//! `piano:` lines). YAML mappings reject repeated keys, so each repeat within
//! one indentation scope is renamed `key#1`, `key#2`, ...
//!
//! Patterns under `sections:` are notation, not YAML: `[C4 E4 G4] - -` would
//! otherwise parse as a flow sequence, and `- - C2` as a nested list. Every
//! instrument value and every block `- ` item below an instrument is rewritten
//! as a single-quoted scalar so it reaches the expander verbatim.

use std::collections::HashMap;

use regex::Regex;

/// A block-mapping key at the start of a line: indentation, key, colon.
const KEY_LINE: &str = r"^(\s*)([A-Za-z0-9_][A-Za-z0-9_ .\-]*?)\s*:(?:\s|$)";

/// Separator between a key and its occurrence number.
pub const REPEAT_MARK: char = '#';

/// Top-level key whose grandchildren are patterns.
const SECTIONS_KEY: &str = "sections";

/// Scope depth of instrument keys: `sections` > section name > instrument.
const INSTRUMENT_DEPTH: usize = 2;

struct Scope {
    indent: usize,
    seen: HashMap<String, usize>,
    /// Most recent key in this scope, as written.
    current: String,
}

/// Rename repeated keys and quote section patterns.
///
/// The first occurrence of a key keeps its name; the `n`-th repeat becomes
/// `key#n`. Comments, blank lines and everything outside `sections:` keep
/// their text apart from renames.
pub fn disambiguate(text: &str) -> String {
    let Ok(key_line) = Regex::new(KEY_LINE) else {
        return text.to_string();
    };

    let mut scopes: Vec<Scope> = Vec::new();
    let mut out = Vec::new();

    for line in text.lines() {
        let trimmed = line.trim_start();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            out.push(line.to_string());
            continue;
        }
        if trimmed.starts_with('-') {
            let indent = line.len() - trimmed.len();
            let quoted = in_pattern_list(&scopes, indent)
                .then(|| quote_item(line, indent))
                .flatten();
            out.push(quoted.unwrap_or_else(|| line.to_string()));
            continue;
        }
        let Some(caps) = key_line.captures(line) else {
            out.push(line.to_string());
            continue;
        };
        let (Some(indent), Some(key)) = (caps.get(1), caps.get(2)) else {
            out.push(line.to_string());
            continue;
        };
        let indent = indent.as_str().len();

        while scopes.last().is_some_and(|s| s.indent > indent) {
            scopes.pop();
        }
        if scopes.last().map_or(true, |s| s.indent < indent) {
            scopes.push(Scope {
                indent,
                seen: HashMap::new(),
                current: String::new(),
            });
        }
        let is_instrument = is_instrument_depth(&scopes);
        let Some(scope) = scopes.last_mut() else {
            out.push(line.to_string());
            continue;
        };
        scope.current = key.as_str().to_string();

        let count = scope.seen.entry(key.as_str().to_string()).or_insert(0);
        let name = match *count {
            0 => key.as_str().to_string(),
            n => format!("{}{REPEAT_MARK}{n}", key.as_str()),
        };
        *count += 1;

        let rest = &line[key.end()..];
        let value = rest.split_once(':').map_or("", |(_, value)| value);
        match is_instrument.then(|| quote_pattern(value)).flatten() {
            Some(quoted) => out.push(format!("{}{name}: {quoted}", &line[..key.start()])),
            None => out.push(format!("{}{name}{rest}", &line[..key.start()])),
        }
    }

    let mut joined = out.join("\n");
    if text.ends_with('\n') {
        joined.push('\n');
    }
    joined
}

fn is_instrument_depth(scopes: &[Scope]) -> bool {
    scopes.len() == INSTRUMENT_DEPTH + 1 && scopes[0].current == SECTIONS_KEY
}

/// Whether a `- ` item at `indent` belongs to an instrument's list of sub-lines.
fn in_pattern_list(scopes: &[Scope], indent: usize) -> bool {
    is_instrument_depth(scopes) && scopes.last().is_some_and(|s| indent >= s.indent)
}

fn quote_item(line: &str, indent: usize) -> Option<String> {
    let rest = &line[indent + 1..];
    if !rest.starts_with([' ', '\t']) {
        return None;
    }
    let quoted = quote_pattern(rest)?;
    Some(format!("{}- {quoted}", &line[..indent]))
}

/// Single-quote a pattern value. Empty, already-quoted and block-scalar
/// values are left for YAML.
fn quote_pattern(value: &str) -> Option<String> {
    let pattern = strip_comment(value).trim();
    if pattern.is_empty() || pattern.starts_with(['"', '\'', '|', '>']) {
        return None;
    }
    Some(format!("'{}'", pattern.replace('\'', "''")))
}

/// Cut a trailing ` # comment`. A `#` glued to a note (`C#4`) is kept.
fn strip_comment(value: &str) -> &str {
    let mut previous = ' ';
    for (i, c) in value.char_indices() {
        if c == '#' && previous.is_whitespace() {
            return &value[..i];
        }
        previous = c;
    }
    value
}

/// Split a possibly-renamed key into its base name and repeat number.
pub fn split_repeat(key: &str) -> (&str, usize) {
    match key.rsplit_once(REPEAT_MARK) {
        Some((base, n)) => match n.parse() {
            Ok(n) => (base, n),
            Err(_) => (key, 0),
        },
        None => (key, 0),
    }
}
