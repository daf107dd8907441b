//! Instrument prefixes — `bass: C2 - C2` and `vox: https://…` lines.

use crate::instrument::registry::{Registry, SampleDeclaration, DEFAULT_INSTRUMENT};

/// A line split into its channel and its notation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolved<'a> {
    /// Lowercased channel name.
    pub instrument: String,
    /// Notation after the prefix.
    pub content: &'a str,
    /// Bytes taken by the prefix, including the trailing whitespace.
    pub prefix_len: usize,
}

/// Split `<word>:<spaces>` off the front of a line.
///
/// Returns the name and the number of bytes the prefix occupies.
fn split_prefix(line: &str) -> Option<(&str, usize)> {
    let name_len = line
        .bytes()
        .take_while(|b| b.is_ascii_alphanumeric() || *b == b'_')
        .count();
    if name_len == 0 || line.as_bytes().get(name_len) != Some(&b':') {
        return None;
    }
    let rest = &line[name_len + 1..];
    let spaces = rest.len() - rest.trim_start().len();
    Some((&line[..name_len], name_len + 1 + spaces))
}

/// Resolve the channel of one raw line.
///
/// A prefix is honoured only when its name is in the registry, built-in or
/// custom. Any other line, prefixed or not, is notation for the default
/// instrument in its entirety.
pub fn resolve<'a>(line: &'a str, registry: &Registry) -> Resolved<'a> {
    if let Some((name, prefix_len)) = split_prefix(line) {
        if registry.contains(name) {
            return Resolved {
                instrument: name.to_ascii_lowercase(),
                content: &line[prefix_len..],
                prefix_len,
            };
        }
    }
    Resolved {
        instrument: DEFAULT_INSTRUMENT.to_string(),
        content: line,
        prefix_len: 0,
    }
}

/// Whether `text` is, in its entirety, an absolute resource locator.
pub fn is_url(text: &str) -> bool {
    let Some((scheme, rest)) = text.split_once("://") else {
        return false;
    };
    let scheme_ok = !scheme.is_empty()
        && matches!(
            scheme.to_ascii_lowercase().as_str(),
            "http" | "https" | "file"
        );
    scheme_ok && !rest.is_empty() && !text.chars().any(char::is_whitespace)
}

/// Detect a `<name>: <url>` custom sample declaration.
pub fn sample_declaration(line: &str) -> Option<SampleDeclaration> {
    let (name, prefix_len) = split_prefix(line)?;
    let content = line[prefix_len..].trim_end();
    if !is_url(content) {
        return None;
    }
    Some(SampleDeclaration {
        name: name.to_ascii_lowercase(),
        url: content.to_string(),
    })
}
