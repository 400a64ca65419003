//! Audio output trait and error types.

/// One stereo frame of float samples (left, right).
pub type StereoFrame = [f32; 2];

/// Error type for audio device operations.
#[derive(Debug)]
pub enum AudioError {
    /// No audio device available
    NoDevice,
    /// Failed to initialize the audio device
    DeviceInit(String),
    /// Failed to create the audio stream
    StreamCreate(String),
    /// Playback error
    Playback(String),
}

impl std::fmt::Display for AudioError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AudioError::NoDevice => write!(f, "no audio device available"),
            AudioError::DeviceInit(msg) => write!(f, "device init error: {}", msg),
            AudioError::StreamCreate(msg) => write!(f, "stream create error: {}", msg),
            AudioError::Playback(msg) => write!(f, "playback error: {}", msg),
        }
    }
}

impl std::error::Error for AudioError {}

/// An audio sink that consumes stereo frames produced by an engine thread.
pub trait AudioOutput {
    /// Output sample rate in Hz.
    fn sample_rate(&self) -> u32;

    /// Write a single frame, blocking (spinning) until the device buffer
    /// has room. This paces the producing thread to real time.
    fn write_spin(&mut self, frame: StereoFrame);

    /// Start the device stream.
    fn start(&mut self) -> Result<(), AudioError>;

    /// Pause the device stream.
    fn stop(&mut self) -> Result<(), AudioError>;
}
