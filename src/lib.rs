//! rowtone: tracker-style audio engine.
//!
//! Re-exports the common surface so hosts don't need to depend on the
//! rt-ir/rt-codec/rt-engine crates directly.

pub use rt_codec::{
    decode_sample, encode_sample, format_note, hz_to_midi, midi_to_hz, parse_note,
    project_from_json, project_to_json, NoteParseError, ProjectError, SampleCodecError,
};
pub use rt_engine::{
    AudioEngine, EngineCore, EngineError, EngineEvent, SubscriptionId, Topic,
};
pub use rt_ir::{
    Cell, Envelope, EnvelopeMode, FilterKind, FilterSpec, Instrument, InstrumentId, Lfo1, Lfo2,
    Lfo1Target, Lfo2Target, LfoWaveform, LoopMode, OscWaveform, Oscillator, Pattern, Project,
    SampleBuffer, SamplerConfig, Song, NOTE_OFF, PARAM_EFFECT,
};
