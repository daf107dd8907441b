//! Notation compiler — flat text (or a song document) → [`Composition`].
//!
//! Each line is `[instrument:] tokens`. Compilation runs in two passes: the
//! first collects every `<name>: <url>` sample declaration and reconciles the
//! caller's [`Registry`], the second resolves prefixes and compiles lines. A
//! custom channel therefore resolves no matter where it is declared.

pub mod compile;
pub mod lexer;
pub mod note;
pub mod prefix;
pub mod token;

pub use compile::{compile_line, compile_tokens, Composition, Line};
pub use lexer::tokenize;
pub use token::{NoteToken, Span, Token};

use log::{debug, warn};

use crate::instrument::{Registry, SampleDeclaration};
use crate::song::{self, Overrides};

/// Result of [`Compiler::compile_source`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Compiled {
    pub composition: Composition,
    /// Settings from a song document; empty for flat text.
    pub overrides: Overrides,
    /// The flattened text when the input was a song document.
    pub expanded: Option<String>,
}

/// The notation compiler.
pub struct Compiler;

impl Compiler {
    /// Compile flat text against `registry`, reconciling its custom channels
    /// with the declarations in `text` first.
    pub fn compile(text: &str, registry: &mut Registry) -> Composition {
        let raw_lines: Vec<&str> = text.lines().collect();

        let declared: Vec<SampleDeclaration> = raw_lines
            .iter()
            .filter_map(|line| prefix::sample_declaration(line))
            .collect();
        let report = registry.reconcile(&declared);
        for name in &report.rejected {
            warn!("'{name}' is a built-in instrument and cannot be declared as a sample");
        }
        if !report.is_empty() {
            debug!(
                "registry: +{:?} -{:?} ~{:?}",
                report.added, report.removed, report.changed
            );
        }

        let lines = raw_lines
            .iter()
            .enumerate()
            .map(|(index, raw)| compile_line(index, raw, registry))
            .collect();
        let composition = Composition::new(lines);

        debug!(
            "compiled {} line(s), {} event(s), {} beat(s)",
            composition.lines.len(),
            composition.event_count(),
            composition.max_beats.as_beats_f64()
        );
        composition
    }

    /// Compile either a song document or flat text.
    ///
    /// A song document is expanded first; anything the expander does not
    /// recognise compiles as flat text.
    pub fn compile_source(text: &str, registry: &mut Registry) -> Compiled {
        match song::expand(text) {
            Some(expansion) => Compiled {
                composition: Self::compile(&expansion.flat_text, registry),
                overrides: expansion.overrides,
                expanded: Some(expansion.flat_text),
            },
            None => Compiled {
                composition: Self::compile(text, registry),
                ..Compiled::default()
            },
        }
    }
}
