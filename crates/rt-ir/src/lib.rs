//! Core IR types for the rowtone tracker engine.
//!
//! This crate defines the data model shared by the editor surface, the
//! wire codecs, and the playback engine: instruments with their envelope,
//! filter and LFO settings, pattern grids, songs, and the stable
//! parameter-id table used by automation notes.

mod envelope;
mod filter;
mod instrument;
mod lfo;
mod note;
mod oscillator;
mod param;
mod pattern;
mod song;

pub use envelope::{Envelope, EnvelopeMode};
pub use filter::{FilterKind, FilterSpec};
pub use instrument::{Instrument, InstrumentId, DEFAULT_MAX_VOICES};
pub use lfo::{Lfo1, Lfo2, Lfo1Target, Lfo2Target, LfoWaveform};
pub use note::{Cell, NOTE_OFF, PARAM_EFFECT};
pub use oscillator::{
    LoopMode, OscWaveform, Oscillator, SampleBuffer, SamplerConfig, SharedSampleBuffer,
    SourceCategory,
};
pub use param::{apply_param, ParamId};
pub use pattern::Pattern;
pub use song::{Project, Song};
