//! The 12-character tracker note codec.
//!
//! Format: `IIVVNOEEVVVV`. Two hex digits of instrument id, two of
//! velocity, a two-character note name, two hex digits of effect, four of
//! effect value. Sharps use the lowercase letter of the next natural
//! (`c4` is C#4); a leading `=` is the note-off sentinel.

use std::fmt;

use rt_ir::{Cell, InstrumentId, NOTE_OFF};

/// Note-name letters indexed by semitone within the octave.
const NOTE_LETTERS: [char; 12] = ['C', 'c', 'D', 'd', 'E', 'F', 'f', 'G', 'g', 'A', 'a', 'B'];

/// Error produced by [`parse_note`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum NoteParseError {
    /// Input shorter than the 6-character minimum.
    TooShort(usize),
    /// A hex field failed to parse.
    InvalidHex { field: &'static str },
    /// The note-name characters are not a known letter + octave digit.
    InvalidNoteName,
}

impl fmt::Display for NoteParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NoteParseError::TooShort(len) => {
                write!(f, "note string too short: {} chars (minimum 6)", len)
            }
            NoteParseError::InvalidHex { field } => write!(f, "invalid hex in {} field", field),
            NoteParseError::InvalidNoteName => write!(f, "invalid note name"),
        }
    }
}

impl std::error::Error for NoteParseError {}

/// MIDI note number to frequency: 440 Hz at A4 (MIDI 69), 12-TET.
pub fn midi_to_hz(midi: f64) -> f64 {
    440.0 * 2f64.powf((midi - 69.0) / 12.0)
}

/// Frequency to (fractional) MIDI note number.
pub fn hz_to_midi(hz: f64) -> f64 {
    69.0 + 12.0 * (hz / 440.0).log2()
}

/// Two-character name for a MIDI note: letter + octave character.
///
/// Octave is `midi / 12 - 1`, so MIDI 60 is `C4` and 61 is `c4` (C#4).
/// MIDI 0-11 sit in octave -1, written with a `-` octave character
/// (`C-` is MIDI 0). The note-off sentinel formats as `=0`.
pub fn midi_note_name(midi: u8) -> [char; 2] {
    if midi == NOTE_OFF {
        return ['=', '0'];
    }
    let letter = NOTE_LETTERS[midi as usize % 12];
    let octave = midi as i16 / 12 - 1;
    let digit = if octave < 0 {
        '-'
    } else {
        char::from_digit(octave as u32, 10).unwrap_or('0')
    };
    [letter, digit]
}

/// Parse a two-character note name back to a MIDI note number.
///
/// Any name starting with `=` yields the note-off sentinel; a `-`
/// octave character means octave -1.
pub fn note_name_to_midi(name: [char; 2]) -> Option<u8> {
    if name[0] == '=' {
        return Some(NOTE_OFF);
    }
    let semitone = NOTE_LETTERS.iter().position(|&c| c == name[0])? as i32;
    let octave = match name[1] {
        '-' => -1,
        c => c.to_digit(10)? as i32,
    };
    let midi = (octave + 1) * 12 + semitone;
    u8::try_from(midi).ok().filter(|&m| m <= 127)
}

/// Format a cell as its 12-character note string.
pub fn format_note(cell: &Cell) -> String {
    let name = midi_note_name(cell.tone);
    format!(
        "{:02X}{:02X}{}{}{:02X}{:04X}",
        cell.instrument.raw(),
        cell.velocity,
        name[0],
        name[1],
        cell.effect,
        cell.effect_value,
    )
}

fn hex_field(s: &str, range: std::ops::Range<usize>, field: &'static str) -> Result<u16, NoteParseError> {
    u16::from_str_radix(&s[range], 16).map_err(|_| NoteParseError::InvalidHex { field })
}

/// Parse a note string.
///
/// Leading/trailing whitespace is trimmed. The effect fields are optional
/// and default to zero; anything shorter than instrument + velocity +
/// note name is rejected.
pub fn parse_note(input: &str) -> Result<Cell, NoteParseError> {
    let s = input.trim();
    if s.len() < 6 {
        return Err(NoteParseError::TooShort(s.len()));
    }
    if !s.is_ascii() {
        return Err(NoteParseError::InvalidNoteName);
    }

    let instrument = InstrumentId::new(hex_field(s, 0..2, "instrument")? as u8)
        .ok_or(NoteParseError::InvalidHex { field: "instrument" })?;
    let velocity = hex_field(s, 2..4, "velocity")? as u8;

    let bytes = s.as_bytes();
    let name = [bytes[4] as char, bytes[5] as char];
    let tone = note_name_to_midi(name).ok_or(NoteParseError::InvalidNoteName)?;

    let effect = if s.len() >= 8 { hex_field(s, 6..8, "effect")? as u8 } else { 0 };
    let effect_value = if s.len() >= 12 { hex_field(s, 8..12, "effectValue")? } else { 0 };

    Ok(Cell { instrument, tone, velocity, effect, effect_value })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(raw: u8) -> InstrumentId {
        InstrumentId::new(raw).unwrap()
    }

    #[test]
    fn c4_round_trip() {
        let cell = parse_note("00FFC4000000").unwrap();
        assert_eq!(cell.instrument, id(0));
        assert_eq!(cell.velocity, 255);
        assert_eq!(cell.tone, 60);
        assert_eq!(cell.effect, 0);
        assert_eq!(cell.effect_value, 0);
        assert_eq!(format_note(&cell), "00FFC4000000");
    }

    #[test]
    fn sharp_uses_lowercase_next_natural() {
        // c4 = C#4 = MIDI 61
        let cell = parse_note("0180c4000000").unwrap();
        assert_eq!(cell.tone, 61);
        assert_eq!(cell.instrument, id(1));
        assert_eq!(cell.velocity, 0x80);
    }

    #[test]
    fn note_off_sentinel() {
        let cell = parse_note("00FF=0000000").unwrap();
        assert!(cell.is_note_off());
        assert_eq!(cell.tone, 0x3D);
        assert_eq!(format_note(&cell)[4..6], *"=0");
    }

    #[test]
    fn any_equals_name_is_note_off() {
        assert_eq!(parse_note("00FF=7000000").unwrap().tone, 0x3D);
    }

    #[test]
    fn too_short_rejected() {
        assert_eq!(parse_note("00FF"), Err(NoteParseError::TooShort(4)));
        assert_eq!(parse_note("   "), Err(NoteParseError::TooShort(0)));
    }

    #[test]
    fn missing_effect_tail_defaults_to_zero() {
        let cell = parse_note("02A0D5").unwrap();
        assert_eq!(cell.effect, 0);
        assert_eq!(cell.effect_value, 0);
        assert_eq!(cell.tone, note_name_to_midi(['D', '5']).unwrap());
    }

    #[test]
    fn bad_hex_rejected() {
        assert!(matches!(
            parse_note("ZZFFC4000000"),
            Err(NoteParseError::InvalidHex { field: "instrument" })
        ));
        assert!(matches!(
            parse_note("00GGC4000000"),
            Err(NoteParseError::InvalidHex { field: "velocity" })
        ));
    }

    #[test]
    fn bad_note_name_rejected() {
        assert_eq!(parse_note("00FFX4000000"), Err(NoteParseError::InvalidNoteName));
        assert_eq!(parse_note("00FFCX000000"), Err(NoteParseError::InvalidNoteName));
    }

    #[test]
    fn whitespace_is_trimmed() {
        let cell = parse_note("  00FFC4000000  ").unwrap();
        assert_eq!(cell.tone, 60);
    }

    #[test]
    fn automation_note_round_trip() {
        // S4: pan automation, raw 0x80
        let cell = parse_note("00FFC4FF4180").unwrap();
        assert!(cell.is_automation());
        assert_eq!(cell.param_id(), 0x41);
        assert_eq!(cell.param_raw(), 0x80);
        assert_eq!(format_note(&cell), "00FFC4FF4180");
    }

    #[test]
    fn round_trip_all_tones() {
        for tone in (0u8..=127).chain([NOTE_OFF]) {
            let cell = Cell { instrument: id(0x3F), tone, velocity: 0x7F, effect: 0x12, effect_value: 0xABCD };
            let s = format_note(&cell);
            assert_eq!(s.len(), 12);
            assert_eq!(parse_note(&s).unwrap(), cell, "tone {tone} via {s}");
        }
    }

    #[test]
    fn round_trip_velocity_effect_extremes() {
        for (vel, eff, val) in [(0u8, 0u8, 0u16), (255, 254, 0xFFFF), (1, 0xFF, 0x4180)] {
            let cell = Cell { instrument: id(0xFE), tone: 69, velocity: vel, effect: eff, effect_value: val };
            assert_eq!(parse_note(&format_note(&cell)).unwrap(), cell);
        }
    }

    #[test]
    fn a440_is_midi_69() {
        assert!((midi_to_hz(69.0) - 440.0).abs() < 1e-12);
    }

    #[test]
    fn hz_midi_inverse() {
        for n in 0..=127 {
            let hz = midi_to_hz(n as f64);
            assert!((hz_to_midi(hz) - n as f64).abs() < 1e-9, "midi {n}");
        }
    }

    #[test]
    fn octave_boundaries() {
        assert_eq!(midi_note_name(0), ['C', '-']);
        assert_eq!(midi_note_name(11), ['B', '-']);
        assert_eq!(midi_note_name(12), ['C', '0']);
        assert_eq!(midi_note_name(59), ['B', '3']);
        assert_eq!(midi_note_name(60), ['C', '4']);
        assert_eq!(midi_note_name(127), ['G', '9']);
        assert_eq!(note_name_to_midi(['C', '-']), Some(0));
        assert_eq!(note_name_to_midi(['B', '-']), Some(11));
    }
}
