//! Note parsing — `C4`, `d#5.`, `Bb3~` into [`NoteToken`]s, and pitch names to MIDI numbers.

use super::token::{Accidental, NoteToken};

/// Octave used when a note omits one.
pub const DEFAULT_OCTAVE: u8 = 4;

/// Parse one written note.
///
/// Format: `<letter>[#|b][octave][.][~]`
/// - Letter: A–G in either case; lowercase is soft
/// - Accidental: `#` (sharp) or `b` (flat)
/// - Octave: a single digit 0–9, default 4
/// - `.` dots the note, `~` ties it
///
/// The whole string must match; anything left over rejects the note.
pub fn parse_note(raw: &str) -> Option<NoteToken> {
    let bytes = raw.as_bytes();
    let first = *bytes.first()?;
    if !matches!(first.to_ascii_uppercase(), b'A'..=b'G') {
        return None;
    }

    let mut i = 1;
    let accidental = match bytes.get(i) {
        Some(b'#') => {
            i += 1;
            Some(Accidental::Sharp)
        }
        Some(b'b') => {
            i += 1;
            Some(Accidental::Flat)
        }
        _ => None,
    };

    let octave = match bytes.get(i) {
        Some(d) if d.is_ascii_digit() => {
            i += 1;
            d - b'0'
        }
        _ => DEFAULT_OCTAVE,
    };

    let dotted = bytes.get(i) == Some(&b'.');
    if dotted {
        i += 1;
    }
    let tied = bytes.get(i) == Some(&b'~');
    if tied {
        i += 1;
    }

    if i != bytes.len() {
        return None;
    }

    Some(NoteToken {
        letter: first.to_ascii_uppercase() as char,
        accidental,
        octave,
        dotted,
        tied,
        soft: first.is_ascii_lowercase(),
    })
}

/// Convert a pitch name (`"C4"`, `"Eb2"`, `"F#3"`) into a MIDI note number.
///
/// C4 = middle C = MIDI 60. Returns `None` for malformed names or pitches
/// outside 0–127.
pub fn midi_number(name: &str) -> Option<u8> {
    let note = parse_note(name)?;
    let base = match note.letter {
        'C' => 0,
        'D' => 2,
        'E' => 4,
        'F' => 5,
        'G' => 7,
        'A' => 9,
        'B' => 11,
        _ => return None,
    };
    let accidental = note.accidental.map_or(0, Accidental::semitones);

    // MIDI note = (octave + 1) * 12 + base + accidental
    let midi = (note.octave as i32 + 1) * 12 + base + accidental;
    u8::try_from(midi).ok().filter(|m| *m <= 127)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_note() {
        let n = parse_note("C4").unwrap();
        assert_eq!(n.letter, 'C');
        assert_eq!(n.octave, 4);
        assert!(!n.soft && !n.dotted && !n.tied);
        assert_eq!(n.accidental, None);
    }

    #[test]
    fn octave_defaults_to_four() {
        assert_eq!(parse_note("G").unwrap().pitch_name(), "G4");
        assert_eq!(parse_note("f#").unwrap().pitch_name(), "F#4");
    }

    #[test]
    fn lowercase_is_soft() {
        let n = parse_note("e5").unwrap();
        assert!(n.soft);
        assert_eq!(n.pitch_name(), "E5");
    }

    #[test]
    fn dot_and_tie_markers() {
        let n = parse_note("A3.~").unwrap();
        assert!(n.dotted);
        assert!(n.tied);
        assert_eq!(n.pitch_name(), "A3");
    }

    #[test]
    fn lowercase_b_flat() {
        let n = parse_note("bb3").unwrap();
        assert_eq!(n.letter, 'B');
        assert_eq!(n.accidental, Some(Accidental::Flat));
        assert!(n.soft);
        assert_eq!(parse_note("b").unwrap().pitch_name(), "B4");
    }

    #[test]
    fn rejects_malformed() {
        for raw in ["", "H4", "C10", "C4..", "C~.", "C#b4", "4C", "C4x", "~"] {
            assert!(parse_note(raw).is_none(), "{raw} should be rejected");
        }
    }

    #[test]
    fn round_trip_preserves_pitch_and_octave() {
        for raw in ["C4", "d#5", "Bb3", "g0", "A9", "e"] {
            let n = parse_note(raw).unwrap();
            let again = parse_note(&n.to_string()).unwrap();
            assert_eq!(again.pitch_name(), n.pitch_name());
            assert_eq!(again.octave, n.octave);
        }
    }

    #[test]
    fn middle_c() {
        assert_eq!(midi_number("C4"), Some(60));
    }

    #[test]
    fn a4_concert() {
        assert_eq!(midi_number("A4"), Some(69));
    }

    #[test]
    fn accidentals() {
        assert_eq!(midi_number("Eb2"), Some(39));
        assert_eq!(midi_number("F#3"), Some(54));
        assert_eq!(midi_number("Cb0"), Some(11));
    }

    #[test]
    fn g9_max_and_above() {
        assert_eq!(midi_number("G9"), Some(127));
        assert_eq!(midi_number("G#9"), None);
    }

    #[test]
    fn invalid_name() {
        assert_eq!(midi_number("X4"), None);
        assert_eq!(midi_number(""), None);
    }
}
