//! Control-thread commands applied by the engine between render blocks.

use std::sync::Arc;

use rt_ir::{Instrument, InstrumentId, Pattern, SampleBuffer, Song};

/// A mutation crossing from the control thread to the engine.
///
/// Commands travel over a lock-free ring and are applied between render
/// blocks, so the control thread never blocks the audio path.
pub enum Command {
    UpdateInstrument(Box<Instrument>),
    SetSampleBuffer {
        instrument: InstrumentId,
        buffer: Arc<SampleBuffer>,
    },
    SetPattern(Box<Pattern>),
    UpdatePattern(Box<Pattern>),
    SetSong(Song),
    Play,
    Stop,
    Seek(u16),
    SetMasterVolume(f32),
    /// Drop every node and pattern (project load).
    Reset,
}
