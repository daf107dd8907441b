//! Lexer for one line of notation.
//!
//! Converts line content (instrument prefix already stripped) into a flat
//! list of [`Token`]s. The lexer never fails: text it cannot classify becomes
//! [`Token::Invalid`] so that timing downstream stays in step.

use super::note::parse_note;
use super::token::{Span, Token};

pub struct Lexer<'a> {
    src: &'a str,
    pos: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(src: &'a str) -> Self {
        Self { src, pos: 0 }
    }

    pub fn tokenize(&mut self) -> Vec<Token> {
        let mut tokens = Vec::new();

        loop {
            self.skip_spaces();
            if self.is_at_end() {
                break;
            }

            if self.peek() == b'[' {
                match self.lex_chord() {
                    Some(token) => tokens.push(token),
                    None => {
                        // Unterminated chord swallows the rest of the line.
                        let span = Span::new(self.pos, self.src.len());
                        tokens.push(Token::Invalid {
                            raw: self.src[self.pos..].to_string(),
                            span,
                        });
                        self.pos = self.src.len();
                        break;
                    }
                }
            } else {
                tokens.push(self.lex_word());
            }
        }

        tokens
    }

    fn peek(&self) -> u8 {
        self.src.as_bytes()[self.pos]
    }

    fn is_at_end(&self) -> bool {
        self.pos >= self.src.len()
    }

    fn skip_spaces(&mut self) {
        while !self.is_at_end() && self.peek() == b' ' {
            self.pos += 1;
        }
    }

    /// `[...]` up to the first `]`. Returns `None` when there is no `]`.
    fn lex_chord(&mut self) -> Option<Token> {
        let start = self.pos;
        let close = self.src[start + 1..].find(']')? + start + 1;
        let end = close + 1;
        self.pos = end;

        let raw = self.src[start..end].to_string();
        let span = Span::new(start, end);
        let interior = &self.src[start + 1..close];

        let notes: Option<Vec<_>> = interior.split_whitespace().map(parse_note).collect();
        match notes {
            Some(notes) if !notes.is_empty() => Some(Token::Chord { notes, raw, span }),
            _ => Some(Token::Invalid { raw, span }),
        }
    }

    /// A maximal run of characters other than space and `[`.
    fn lex_word(&mut self) -> Token {
        let start = self.pos;
        while !self.is_at_end() && self.peek() != b' ' && self.peek() != b'[' {
            self.pos += 1;
        }
        let span = Span::new(start, self.pos);
        let raw = self.src[start..self.pos].to_string();
        classify(raw, span)
    }
}

fn classify(raw: String, span: Span) -> Token {
    match raw.as_str() {
        "-" | "_" => Token::Rest { raw, span },
        "x" | "X" => Token::Hit { raw, span },
        "~" => Token::Hold { raw, span },
        _ => match parse_note(&raw) {
            Some(note) => Token::Note { note, raw, span },
            None => Token::Invalid { raw, span },
        },
    }
}

/// Tokenize one line's content.
pub fn tokenize(content: &str) -> Vec<Token> {
    Lexer::new(content).tokenize()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(tokens: &[Token]) -> Vec<&'static str> {
        tokens
            .iter()
            .map(|t| match t {
                Token::Note { .. } => "note",
                Token::Rest { .. } => "rest",
                Token::Hit { .. } => "hit",
                Token::Hold { .. } => "hold",
                Token::Chord { .. } => "chord",
                Token::Invalid { .. } => "invalid",
            })
            .collect()
    }

    #[test]
    fn empty_and_blank_lines() {
        assert!(tokenize("").is_empty());
        assert!(tokenize("    ").is_empty());
    }

    #[test]
    fn basic_sequence() {
        let tokens = tokenize("C4 - x _ X e5");
        assert_eq!(kinds(&tokens), ["note", "rest", "hit", "rest", "hit", "note"]);
    }

    #[test]
    fn spans_match_raw_text() {
        let src = "C4  [E4 G4] zz ~";
        let tokens = tokenize(src);
        for t in &tokens {
            let span = t.span();
            assert_eq!(&src[span.start..span.end], t.raw());
        }
        assert_eq!(kinds(&tokens), ["note", "chord", "invalid", "hold"]);
    }

    #[test]
    fn spans_do_not_overlap() {
        let tokens = tokenize("C4 [D4 F4]G4 - x");
        for pair in tokens.windows(2) {
            assert!(pair[0].span().end <= pair[1].span().start);
        }
    }

    #[test]
    fn chord_of_valid_notes() {
        let tokens = tokenize("[C4. e4 G4]");
        match &tokens[0] {
            Token::Chord { notes, raw, .. } => {
                assert_eq!(notes.len(), 3);
                assert!(notes[0].dotted);
                assert!(notes[1].soft);
                assert_eq!(raw, "[C4. e4 G4]");
            }
            other => panic!("expected chord, got {other:?}"),
        }
    }

    #[test]
    fn chord_with_bad_member_is_invalid() {
        let tokens = tokenize("[C4 Q4] D4");
        assert_eq!(kinds(&tokens), ["invalid", "note"]);
        assert_eq!(tokens[0].raw(), "[C4 Q4]");
    }

    #[test]
    fn empty_chord_is_invalid() {
        assert_eq!(kinds(&tokenize("[ ] C4")), ["invalid", "note"]);
    }

    #[test]
    fn unterminated_chord_consumes_rest_of_line() {
        let tokens = tokenize("D4 [C4 E4");
        assert_eq!(kinds(&tokens), ["note", "invalid"]);
        assert_eq!(tokens[1].raw(), "[C4 E4");
    }

    #[test]
    fn bracket_terminates_a_word() {
        let tokens = tokenize("C4[E4 G4]");
        assert_eq!(kinds(&tokens), ["note", "chord"]);
    }

    #[test]
    fn tabs_are_not_separators() {
        assert_eq!(kinds(&tokenize("C4\tD4")), ["invalid"]);
    }

    #[test]
    fn tied_notes_and_holds() {
        let tokens = tokenize("C4~ ~ E4");
        assert_eq!(kinds(&tokens), ["note", "hold", "note"]);
        match &tokens[0] {
            Token::Note { note, .. } => assert!(note.tied),
            other => panic!("expected note, got {other:?}"),
        }
    }

    #[test]
    fn unicode_text_is_invalid_not_a_panic() {
        let tokens = tokenize("C4 é♯ D4");
        assert_eq!(kinds(&tokens), ["note", "invalid", "note"]);
    }
}
