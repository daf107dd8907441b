//! Event compiler — walks a line's tokens with a beat cursor and emits [`NoteEvent`]s.
//!
//! Folds tie chains and dotted durations into single events and collects the
//! compiled lines into a [`Composition`].

use crate::event::{Beat, NoteEvent, HIT_PITCH};
use crate::instrument::registry::{Registry, SampleDeclaration};

use super::lexer::tokenize;
use super::prefix::{resolve, sample_declaration};
use super::token::{NoteToken, Token};

/// One compiled track.
#[derive(Debug, Clone, PartialEq)]
pub struct Line {
    pub tokens: Vec<Token>,
    pub events: Vec<NoteEvent>,
    /// Channel the line plays on.
    pub instrument: String,
    /// Bytes taken by the `name:` prefix in the raw line.
    pub prefix_len: usize,
    /// Final cursor position after the last token.
    pub beats: Beat,
    /// Set when the line declares a custom sample channel instead of notes.
    pub declaration: Option<SampleDeclaration>,
}

impl Line {
    pub fn has_events(&self) -> bool {
        !self.events.is_empty()
    }

    /// Count of tokens that failed to lex.
    pub fn invalid_count(&self) -> usize {
        self.tokens.iter().filter(|t| t.is_invalid()).count()
    }
}

/// Every line of one compile pass plus the authoritative length.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Composition {
    pub lines: Vec<Line>,
    /// Longest line in beats, or zero when no line has events.
    pub max_beats: Beat,
}

impl Composition {
    pub fn new(lines: Vec<Line>) -> Self {
        let max_beats = if lines.iter().any(Line::has_events) {
            lines.iter().map(|l| l.beats).max().unwrap_or(Beat::ZERO)
        } else {
            Beat::ZERO
        };
        Self { lines, max_beats }
    }

    /// All events across all lines, in line order.
    pub fn events(&self) -> impl Iterator<Item = &NoteEvent> {
        self.lines.iter().flat_map(|l| l.events.iter())
    }

    pub fn event_count(&self) -> usize {
        self.lines.iter().map(|l| l.events.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.max_beats == Beat::ZERO
    }

    /// Custom sample declarations, in line order.
    pub fn declarations(&self) -> Vec<SampleDeclaration> {
        self.lines
            .iter()
            .filter_map(|l| l.declaration.clone())
            .collect()
    }

    /// Channels that carry at least one event, in first-seen order.
    pub fn channels(&self) -> Vec<&str> {
        let mut seen: Vec<&str> = Vec::new();
        for line in self.lines.iter().filter(|l| l.has_events()) {
            if !seen.contains(&line.instrument.as_str()) {
                seen.push(&line.instrument);
            }
        }
        seen
    }
}

/// Compile one raw line against an already reconciled registry.
pub fn compile_line(line_index: usize, raw: &str, registry: &Registry) -> Line {
    if let Some(decl) = sample_declaration(raw) {
        let prefix_len = raw.find(decl.url.as_str()).unwrap_or(0);
        let instrument = decl.name.clone();
        // Built-in names cannot be redeclared; the line still plays nothing.
        let declaration = (!registry.is_builtin(&decl.name)).then_some(decl);
        return Line {
            tokens: Vec::new(),
            events: Vec::new(),
            instrument,
            prefix_len,
            beats: Beat::ZERO,
            declaration,
        };
    }

    let resolved = resolve(raw, registry);
    let tokens = tokenize(resolved.content);
    let (events, beats) = compile_tokens(&tokens, line_index, &resolved.instrument);

    Line {
        tokens,
        events,
        instrument: resolved.instrument,
        prefix_len: resolved.prefix_len,
        beats,
        declaration: None,
    }
}

/// Assign beats to a token list. Returns the events and the final cursor.
pub fn compile_tokens(
    tokens: &[Token],
    line_index: usize,
    instrument: &str,
) -> (Vec<NoteEvent>, Beat) {
    let mut events = Vec::new();
    let mut cursor = Beat::ZERO;
    let mut i = 0;

    let event = |notes: Vec<String>, beat, duration, token_index, soft| NoteEvent {
        notes,
        beat,
        duration,
        line_index,
        token_index,
        soft,
        instrument: instrument.to_string(),
    };

    while i < tokens.len() {
        match &tokens[i] {
            Token::Rest { .. } | Token::Invalid { .. } | Token::Hold { .. } => {
                cursor += Beat::ONE;
                i += 1;
            }
            Token::Hit { .. } => {
                events.push(event(vec![HIT_PITCH.to_string()], cursor, Beat::ONE, i, false));
                cursor += Beat::ONE;
                i += 1;
            }
            Token::Note { note, .. } => {
                let (duration, consumed) = fold_tie_chain(note, &tokens[i + 1..]);
                events.push(event(vec![note.pitch_name()], cursor, duration, i, note.soft));
                cursor += duration;
                i += 1 + consumed;
            }
            Token::Chord { notes, .. } => {
                let duration = if notes.iter().any(|n| n.dotted) {
                    Beat::DOTTED
                } else {
                    Beat::ONE
                };
                let soft = notes.iter().any(|n| n.soft);
                let pitches = notes.iter().map(NoteToken::pitch_name).collect();
                events.push(event(pitches, cursor, duration, i, soft));
                cursor += duration;
                i += 1;
            }
        }
    }

    (events, cursor)
}

/// Total length of a note plus the tie chain that follows it.
///
/// Following notes join while they are tied and share the head's pitch name.
/// A bare `~` joins while the chain's latest unit is tied; a chain that ends
/// on one rings for one more beat. Returns the duration and how many tokens
/// after the head were consumed.
fn fold_tie_chain(head: &NoteToken, rest: &[Token]) -> (Beat, usize) {
    let pitch = head.pitch_name();
    let mut total = head.base_duration();
    let mut chain_tied = head.tied;
    let mut ends_on_hold = false;
    let mut consumed = 0;

    for token in rest {
        match token {
            Token::Note { note, .. } if note.tied && note.pitch_name() == pitch => {
                total += note.base_duration();
                chain_tied = true;
                ends_on_hold = false;
            }
            Token::Hold { .. } if chain_tied => {
                total += Beat::ONE;
                ends_on_hold = true;
            }
            _ => break,
        }
        consumed += 1;
    }

    if ends_on_hold {
        total += Beat::ONE;
    }
    (total, consumed)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn compile(content: &str) -> (Vec<NoteEvent>, Beat) {
        compile_tokens(&tokenize(content), 0, "piano")
    }

    fn beats(b: f64) -> Beat {
        Beat::from_beats_f64(b)
    }

    #[test]
    fn empty_line() {
        let (events, end) = compile("");
        assert!(events.is_empty());
        assert_eq!(end, Beat::ZERO);
    }

    #[test]
    fn notes_rests_and_invalids_advance_one_beat() {
        let (events, end) = compile("C4 - zz E4");
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].beat, Beat::ZERO);
        assert_eq!(events[1].beat, Beat::from_beats(3));
        assert_eq!(events[1].token_index, 3);
        assert_eq!(end, Beat::from_beats(4));
    }

    #[test]
    fn hit_uses_placeholder_pitch() {
        let (events, _) = compile("x - X");
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].notes, [HIT_PITCH]);
        assert!(!events[0].soft);
        assert_eq!(events[1].beat, Beat::from_beats(2));
    }

    #[test]
    fn hold_extends_a_tie() {
        let (events, end) = compile("C4~ ~ E4");
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].notes, ["C4"]);
        assert_eq!(events[0].beat, Beat::ZERO);
        assert_eq!(events[0].duration, Beat::from_beats(3));
        assert_eq!(events[1].notes, ["E4"]);
        assert_eq!(events[1].beat, Beat::from_beats(3));
        assert_eq!(events[1].duration, Beat::ONE);
        assert_eq!(end, Beat::from_beats(4));
    }

    #[test]
    fn tied_same_pitch_notes_fold() {
        let (events, _) = compile("C4~ C4~");
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].duration, Beat::from_beats(2));

        let (events, _) = compile("C4.~ C4~ D4");
        assert_eq!(events[0].duration, beats(2.5));
        assert_eq!(events[1].beat, beats(2.5));
    }

    #[test]
    fn tie_breaks_on_different_pitch() {
        let (events, _) = compile("C4~ C5~ C#4~");
        assert_eq!(events.len(), 3);
        for (i, e) in events.iter().enumerate() {
            assert_eq!(e.beat, Beat::from_beats(i as u32));
            assert_eq!(e.duration, Beat::ONE);
        }
    }

    #[test]
    fn untied_follower_is_not_folded() {
        let (events, _) = compile("C4~ C4");
        assert_eq!(events.len(), 2);
    }

    #[test]
    fn hold_outside_chain_is_a_beat_of_nothing() {
        let (events, end) = compile("~ C4 ~");
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].beat, Beat::ONE);
        assert_eq!(end, Beat::from_beats(3));
    }

    #[test]
    fn dotted_chord_then_rest() {
        let (events, end) = compile("[C4. E4 G4] -");
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].notes, ["C4", "E4", "G4"]);
        assert_eq!(events[0].beat, Beat::ZERO);
        assert_eq!(events[0].duration, beats(1.5));
        assert_eq!(end, beats(2.5));
    }

    #[test]
    fn chord_is_soft_if_any_member_is() {
        let (events, _) = compile("[C4 e4]");
        assert!(events[0].soft);
    }

    #[test]
    fn unterminated_chord_costs_one_beat() {
        let (events, end) = compile("[C4 E4");
        assert!(events.is_empty());
        assert_eq!(end, Beat::ONE);
    }

    #[test]
    fn contiguous_events_touch() {
        let (events, _) = compile("C4. d4 [E4 G4] F4~ F4~ A4");
        for pair in events.windows(2) {
            assert_eq!(pair[0].end(), pair[1].beat);
        }
    }

    #[test]
    fn events_never_overlap() {
        let (events, end) = compile("C4 - x zz [D4 F4.] ~ G4~ ~ - A4");
        for pair in events.windows(2) {
            assert!(pair[0].end() <= pair[1].beat);
        }
        assert!(events.last().unwrap().end() <= end);
    }

    #[test]
    fn compile_line_resolves_prefix() {
        let registry = Registry::new();
        let line = compile_line(2, "bass: C2 - C2", &registry);
        assert_eq!(line.instrument, "bass");
        assert_eq!(line.prefix_len, 6);
        assert_eq!(line.events.len(), 2);
        assert!(line.events.iter().all(|e| e.line_index == 2 && e.instrument == "bass"));
        assert_eq!(line.beats, Beat::from_beats(3));
    }

    #[test]
    fn declaration_line_has_no_events() {
        let registry = Registry::new();
        let line = compile_line(0, "vox: https://example.com/vox.wav", &registry);
        assert!(line.tokens.is_empty());
        assert!(!line.has_events());
        assert_eq!(line.beats, Beat::ZERO);
        assert_eq!(line.prefix_len, 5);
        assert_eq!(line.declaration.unwrap().name, "vox");
    }

    #[test]
    fn builtin_name_cannot_be_declared() {
        let registry = Registry::new();
        let line = compile_line(0, "kick: https://example.com/k.wav", &registry);
        assert!(!line.has_events());
        assert!(line.declaration.is_none());
        assert!(Composition::new(vec![line]).declarations().is_empty());
    }

    #[test]
    fn max_beats_is_longest_line() {
        let registry = Registry::new();
        let lines = vec![
            compile_line(0, "C4 D4", &registry),
            compile_line(1, "kick: x - - -", &registry),
            compile_line(2, "", &registry),
        ];
        let comp = Composition::new(lines);
        assert_eq!(comp.max_beats, Beat::from_beats(4));
        assert_eq!(comp.event_count(), 3);
        assert_eq!(comp.channels(), ["piano", "kick"]);
    }

    #[test]
    fn max_beats_zero_without_events() {
        let registry = Registry::new();
        let comp = Composition::new(vec![
            compile_line(0, "- - -", &registry),
            compile_line(1, "zz", &registry),
        ]);
        assert_eq!(comp.max_beats, Beat::ZERO);
        assert!(comp.is_empty());
    }

    #[test]
    fn trailing_rests_lengthen_the_piece() {
        // Rests and invalid tokens count toward the length once any line sounds.
        let registry = Registry::new();
        let comp = Composition::new(vec![
            compile_line(0, "C4 E4", &registry),
            compile_line(1, "kick: - - - - - -", &registry),
            compile_line(2, "zz zz zz zz zz zz zz zz", &registry),
        ]);
        assert_eq!(comp.event_count(), 2);
        assert_eq!(comp.events().map(NoteEvent::end).max(), Some(Beat::from_beats(2)));
        assert_eq!(comp.max_beats, Beat::from_beats(8));
    }
}
