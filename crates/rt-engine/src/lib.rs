//! Playback engine for the rowtone tracker.
//!
//! Turns the pattern/song data model into scheduled, polyphonic,
//! modulated audio: a lookahead row scheduler commits notes to
//! per-instrument voice pools; voices run source -> filter -> envelope
//! gain -> pan chains with dual-LFO modulation on top. The control-side
//! facade talks to the audio thread over lock-free rings.

mod automation;
mod biquad;
mod command;
mod engine;
mod error;
mod events;
mod facade;
mod instrument_node;
mod scheduler;
mod source;
mod voice;

pub use automation::ParamTimeline;
pub use command::Command;
pub use engine::{EngineCore, BLOCK_FRAMES, DEFAULT_MASTER_GAIN};
pub use error::EngineError;
pub use events::{EngineEvent, EventBus, SubscriptionId, Topic};
pub use facade::AudioEngine;
pub use instrument_node::InstrumentNode;
pub use scheduler::{NodeMap, PlaybackScheduler, LOOKAHEAD, SCHEDULE_AHEAD_TIME};
pub use voice::Voice;
