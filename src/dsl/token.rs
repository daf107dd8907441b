//! Token types for the line notation lexer.

use std::fmt;

use crate::event::Beat;

/// Byte range of a token within a line's content (prefix already removed).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

/// Sharp or flat.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Accidental {
    Sharp,
    Flat,
}

impl Accidental {
    pub fn symbol(self) -> char {
        match self {
            Accidental::Sharp => '#',
            Accidental::Flat => 'b',
        }
    }

    pub fn semitones(self) -> i32 {
        match self {
            Accidental::Sharp => 1,
            Accidental::Flat => -1,
        }
    }
}

/// A single parsed pitch, as written in a line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoteToken {
    /// Uppercase pitch letter `A`–`G`.
    pub letter: char,
    pub accidental: Option<Accidental>,
    /// Octave 0–9 (4 when omitted).
    pub octave: u8,
    pub dotted: bool,
    pub tied: bool,
    /// Written in lowercase.
    pub soft: bool,
}

impl NoteToken {
    /// Pitch name used for tie matching and playback, e.g. `"D#5"`.
    ///
    /// Letter case, dot and tie markers are not part of the name.
    pub fn pitch_name(&self) -> String {
        let mut name = String::with_capacity(3);
        name.push(self.letter);
        if let Some(acc) = self.accidental {
            name.push(acc.symbol());
        }
        name.push(char::from(b'0' + self.octave));
        name
    }

    /// Length of the note on its own: 1.5 beats when dotted, else 1.
    pub fn base_duration(&self) -> Beat {
        if self.dotted {
            Beat::DOTTED
        } else {
            Beat::ONE
        }
    }
}

impl fmt::Display for NoteToken {
    /// Regenerates the written form, including case, dot, and tie.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let letter = if self.soft {
            self.letter.to_ascii_lowercase()
        } else {
            self.letter
        };
        write!(f, "{letter}")?;
        if let Some(acc) = self.accidental {
            write!(f, "{}", acc.symbol())?;
        }
        write!(f, "{}", self.octave)?;
        if self.dotted {
            write!(f, ".")?;
        }
        if self.tied {
            write!(f, "~")?;
        }
        Ok(())
    }
}

/// One syntactic unit of a line.
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Note { note: NoteToken, raw: String, span: Span },
    /// One beat of silence (`-` or `_`).
    Rest { raw: String, span: Span },
    /// Pitch-agnostic percussion trigger (`x` or `X`).
    Hit { raw: String, span: Span },
    /// A bare `~` that extends a tie chain.
    Hold { raw: String, span: Span },
    Chord { notes: Vec<NoteToken>, raw: String, span: Span },
    /// Unparseable text. Still occupies one beat.
    Invalid { raw: String, span: Span },
}

impl Token {
    /// The exact source text of the token.
    pub fn raw(&self) -> &str {
        match self {
            Token::Note { raw, .. }
            | Token::Rest { raw, .. }
            | Token::Hit { raw, .. }
            | Token::Hold { raw, .. }
            | Token::Chord { raw, .. }
            | Token::Invalid { raw, .. } => raw,
        }
    }

    /// Where the token sits in the line content.
    pub fn span(&self) -> Span {
        match self {
            Token::Note { span, .. }
            | Token::Rest { span, .. }
            | Token::Hit { span, .. }
            | Token::Hold { span, .. }
            | Token::Chord { span, .. }
            | Token::Invalid { span, .. } => *span,
        }
    }

    pub fn is_invalid(&self) -> bool {
        matches!(self, Token::Invalid { .. })
    }
}
