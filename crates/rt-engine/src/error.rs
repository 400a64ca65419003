//! Engine error types.

use std::fmt;

use rt_audio::AudioError;
use rt_codec::SampleCodecError;

/// Errors surfaced by the engine facade.
///
/// Graph mutations requested before `init_audio` are not an error: the
/// facade ignores them and replays its registry once audio comes up.
#[derive(Debug)]
pub enum EngineError {
    /// Audio device failure during initialization.
    Audio(AudioError),
    /// Sample decoding failed.
    Decode(SampleCodecError),
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineError::Audio(e) => write!(f, "audio error: {}", e),
            EngineError::Decode(e) => write!(f, "sample decode error: {}", e),
        }
    }
}

impl std::error::Error for EngineError {}

impl From<AudioError> for EngineError {
    fn from(e: AudioError) -> Self {
        EngineError::Audio(e)
    }
}

impl From<SampleCodecError> for EngineError {
    fn from(e: SampleCodecError) -> Self {
        EngineError::Decode(e)
    }
}
