//! Wire formats for the rowtone tracker.
//!
//! The 12-character note string is the encoding used between the editor
//! surface and the engine; the sample codec is a float-32 WAV container
//! with exact round-trip; project JSON ties both together.

mod note_string;
mod project_json;
mod sample_codec;

pub use note_string::{
    format_note, hz_to_midi, midi_note_name, midi_to_hz, note_name_to_midi, parse_note,
    NoteParseError,
};
pub use project_json::{project_from_json, project_to_json, ProjectError};
pub use sample_codec::{decode_sample, encode_sample, SampleCodecError};
