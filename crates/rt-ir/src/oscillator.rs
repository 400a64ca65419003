//! Oscillator and sample source types.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// Waveform (or source mode) of an instrument's oscillator.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OscWaveform {
    #[default]
    Sine,
    Square,
    Sawtooth,
    Triangle,
    /// Looping white-noise source.
    Noise,
    /// Plays the instrument's sample buffer.
    Sampler,
}

/// Broad source category; switching categories requires a voice-pool rebuild.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SourceCategory {
    Tonal,
    Noise,
    Sampler,
}

/// An instrument's oscillator settings.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Oscillator {
    pub waveform: OscWaveform,
    /// Detune in cents, typically -1200..=1200.
    #[serde(default)]
    pub detune: f32,
    /// Sampler playback settings; ignored for other waveforms.
    #[serde(default)]
    pub sample: SamplerConfig,
}

impl Oscillator {
    pub fn new(waveform: OscWaveform) -> Self {
        Self { waveform, ..Self::default() }
    }

    pub fn category(&self) -> SourceCategory {
        match self.waveform {
            OscWaveform::Noise => SourceCategory::Noise,
            OscWaveform::Sampler => SourceCategory::Sampler,
            _ => SourceCategory::Tonal,
        }
    }
}

/// How a sampler source loops.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoopMode {
    #[default]
    Oneshot,
    Forward,
    Pingpong,
}

/// Sampler playback settings: playback window, gain, loop mode.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SamplerConfig {
    /// Normalized start of the playback window (0..1, < end_point).
    pub start_point: f32,
    /// Normalized end of the playback window (0..1).
    pub end_point: f32,
    /// Playback gain 0..1.
    pub gain: f32,
    #[serde(default)]
    pub loop_mode: LoopMode,
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self {
            start_point: 0.0,
            end_point: 1.0,
            gain: 1.0,
            loop_mode: LoopMode::Oneshot,
        }
    }
}

impl SamplerConfig {
    /// Clamp the window into 0..1 with start < end.
    pub fn clamped(mut self) -> Self {
        self.start_point = self.start_point.clamp(0.0, 1.0);
        self.end_point = self.end_point.clamp(0.0, 1.0);
        if self.end_point <= self.start_point {
            self.end_point = (self.start_point + f32::EPSILON).min(1.0);
        }
        self.gain = self.gain.clamp(0.0, 1.0);
        self
    }
}

/// Decoded multi-channel float PCM, shared between the engine's sample
/// store, instrument nodes, and any editor-side consumers.
#[derive(Clone, Debug, PartialEq)]
pub struct SampleBuffer {
    channels: Vec<Vec<f32>>,
    sample_rate: u32,
}

impl SampleBuffer {
    /// Create a buffer from per-channel frame data.
    ///
    /// All channels must have the same length; extra frames are truncated
    /// to the shortest channel.
    pub fn new(mut channels: Vec<Vec<f32>>, sample_rate: u32) -> Self {
        let len = channels.iter().map(Vec::len).min().unwrap_or(0);
        for ch in &mut channels {
            ch.truncate(len);
        }
        Self { channels, sample_rate }
    }

    /// Create a mono buffer.
    pub fn mono(data: Vec<f32>, sample_rate: u32) -> Self {
        Self { channels: vec![data], sample_rate }
    }

    pub fn num_channels(&self) -> usize {
        self.channels.len()
    }

    /// Length in frames.
    pub fn len(&self) -> usize {
        self.channels.first().map_or(0, Vec::len)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn channel(&self, index: usize) -> &[f32] {
        &self.channels[index]
    }

    pub fn duration_secs(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.len() as f64 / self.sample_rate as f64
    }

    /// Read a mono mixdown at a fractional frame position with linear
    /// interpolation. Out-of-range positions read as silence.
    pub fn mono_at(&self, position: f64) -> f32 {
        let len = self.len();
        if len == 0 || position < 0.0 {
            return 0.0;
        }
        let idx = position as usize;
        if idx >= len {
            return 0.0;
        }
        let frac = (position - idx as f64) as f32;
        let mut acc = 0.0;
        for ch in &self.channels {
            let a = ch[idx];
            let b = if idx + 1 < len { ch[idx + 1] } else { a };
            acc += a + (b - a) * frac;
        }
        acc / self.channels.len() as f32
    }
}

/// Shared handle to decoded sample data.
pub type SharedSampleBuffer = Arc<SampleBuffer>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_split() {
        assert_eq!(Oscillator::new(OscWaveform::Square).category(), SourceCategory::Tonal);
        assert_eq!(Oscillator::new(OscWaveform::Noise).category(), SourceCategory::Noise);
        assert_eq!(Oscillator::new(OscWaveform::Sampler).category(), SourceCategory::Sampler);
    }

    #[test]
    fn sampler_config_clamps_window() {
        let cfg = SamplerConfig {
            start_point: 0.8,
            end_point: 0.2,
            gain: 2.0,
            loop_mode: LoopMode::Forward,
        }
        .clamped();
        assert!(cfg.start_point < cfg.end_point);
        assert_eq!(cfg.gain, 1.0);
    }

    #[test]
    fn mono_at_interpolates() {
        let buf = SampleBuffer::mono(vec![0.0, 1.0, 0.0, -1.0], 44100);
        assert_eq!(buf.mono_at(0.0), 0.0);
        assert!((buf.mono_at(0.5) - 0.5).abs() < 1e-6);
        assert!((buf.mono_at(1.0) - 1.0).abs() < 1e-6);
        assert!((buf.mono_at(2.5) + 0.5).abs() < 1e-6);
    }

    #[test]
    fn mono_at_mixes_channels() {
        let buf = SampleBuffer::new(vec![vec![1.0, 1.0], vec![0.0, 0.0]], 44100);
        assert!((buf.mono_at(0.0) - 0.5).abs() < 1e-6);
    }

    #[test]
    fn mono_at_out_of_range_is_silent() {
        let buf = SampleBuffer::mono(vec![1.0; 4], 44100);
        assert_eq!(buf.mono_at(-1.0), 0.0);
        assert_eq!(buf.mono_at(10.0), 0.0);
    }

    #[test]
    fn mismatched_channels_truncate() {
        let buf = SampleBuffer::new(vec![vec![1.0; 10], vec![1.0; 6]], 44100);
        assert_eq!(buf.len(), 6);
    }
}
