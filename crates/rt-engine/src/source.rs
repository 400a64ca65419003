//! Voice sources: band-limited oscillators, looped noise, sampler playback.

use std::sync::Arc;

use rt_ir::{LoopMode, OscWaveform, SampleBuffer, SamplerConfig};

/// Convert a detune in cents to a frequency/rate multiplier.
fn detune_ratio(cents: f32) -> f32 {
    2f32.powf(cents / 1200.0)
}

/// PolyBLEP band-limited step correction.
///
/// `t` is the phase in [0, 1), `dt` the per-sample phase increment.
fn poly_blep(t: f32, dt: f32) -> f32 {
    if t < dt {
        let t = t / dt;
        2.0 * t - t * t - 1.0
    } else if t > 1.0 - dt {
        let t = (t - 1.0) / dt;
        t * t + 2.0 * t + 1.0
    } else {
        0.0
    }
}

/// A band-limited oscillator for the tonal waveforms.
#[derive(Clone, Debug)]
pub struct BlepOscillator {
    waveform: OscWaveform,
    frequency: f32,
    phase: f32,
    phase_inc: f32,
    sample_rate: f32,
}

impl BlepOscillator {
    pub fn new(waveform: OscWaveform, frequency: f32, detune_cents: f32, sample_rate: f32) -> Self {
        let mut osc = Self { waveform, frequency, phase: 0.0, phase_inc: 0.0, sample_rate };
        osc.set_detune(detune_cents);
        osc
    }

    pub fn set_waveform(&mut self, waveform: OscWaveform) {
        self.waveform = waveform;
    }

    pub fn set_detune(&mut self, cents: f32) {
        self.phase_inc = self.frequency * detune_ratio(cents) / self.sample_rate;
    }

    pub fn next_sample(&mut self) -> f32 {
        let inc = self.phase_inc;
        let sample = match self.waveform {
            OscWaveform::Sine => (2.0 * std::f32::consts::PI * self.phase).sin(),
            OscWaveform::Sawtooth => 2.0 * self.phase - 1.0 - poly_blep(self.phase, inc),
            OscWaveform::Square => {
                let mut v = if self.phase < 0.5 { 1.0 } else { -1.0 };
                v += poly_blep(self.phase, inc);
                v -= poly_blep((self.phase + 0.5) % 1.0, inc);
                v
            }
            OscWaveform::Triangle => {
                if self.phase < 0.5 {
                    4.0 * self.phase - 1.0
                } else {
                    3.0 - 4.0 * self.phase
                }
            }
            // Noise/sampler never construct a BlepOscillator
            _ => 0.0,
        };

        self.phase += inc;
        if self.phase >= 1.0 {
            self.phase -= 1.0;
        }
        sample
    }
}

/// Looped playback of a shared noise table.
#[derive(Clone, Debug)]
pub struct NoisePlayer {
    table: Arc<Vec<f32>>,
    position: f64,
    rate: f64,
}

impl NoisePlayer {
    pub fn new(table: Arc<Vec<f32>>) -> Self {
        Self { table, position: 0.0, rate: 1.0 }
    }

    pub fn set_detune(&mut self, cents: f32) {
        self.rate = detune_ratio(cents) as f64;
    }

    pub fn next_sample(&mut self) -> f32 {
        if self.table.is_empty() {
            return 0.0;
        }
        let sample = self.table[self.position as usize];
        self.position += self.rate;
        if self.position >= self.table.len() as f64 {
            self.position %= self.table.len() as f64;
        }
        sample
    }
}

/// Pitched playback of a sample buffer with loop-window support.
#[derive(Clone, Debug)]
pub struct SamplerPlayer {
    buffer: Arc<SampleBuffer>,
    position: f64,
    /// Rate before detune: pitch ratio x buffer/engine rate ratio.
    base_rate: f64,
    rate: f64,
    start: f64,
    end: f64,
    loop_mode: LoopMode,
    forward: bool,
    finished: bool,
    gain: f32,
}

impl SamplerPlayer {
    /// `pitch_ratio` is `midi_to_hz(note) / 440`.
    pub fn new(
        buffer: Arc<SampleBuffer>,
        config: &SamplerConfig,
        pitch_ratio: f64,
        engine_rate: f32,
    ) -> Self {
        let config = config.clamped();
        let len = buffer.len() as f64;
        let base_rate = pitch_ratio * buffer.sample_rate() as f64 / engine_rate as f64;
        let start = config.start_point as f64 * len;
        let end = config.end_point as f64 * len;
        Self {
            buffer,
            position: start,
            base_rate,
            rate: base_rate,
            start,
            end,
            loop_mode: config.loop_mode,
            forward: true,
            finished: false,
            gain: config.gain,
        }
    }

    pub fn set_detune(&mut self, cents: f32) {
        self.rate = self.base_rate * detune_ratio(cents) as f64;
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    pub fn next_sample(&mut self) -> f32 {
        if self.finished || self.end <= self.start {
            return 0.0;
        }
        let sample = self.buffer.mono_at(self.position) * self.gain;

        if self.forward {
            self.position += self.rate;
        } else {
            self.position -= self.rate;
        }

        if self.position >= self.end {
            match self.loop_mode {
                LoopMode::Oneshot => self.finished = true,
                LoopMode::Forward => {
                    let span = self.end - self.start;
                    self.position = self.start + (self.position - self.end) % span;
                }
                LoopMode::Pingpong => {
                    self.position = self.end - (self.position - self.end);
                    self.forward = false;
                }
            }
        } else if !self.forward && self.position <= self.start {
            self.position = self.start + (self.start - self.position);
            self.forward = true;
        }

        sample
    }
}

/// The generator feeding one voice.
#[derive(Clone, Debug)]
pub enum VoiceSource {
    Osc(BlepOscillator),
    Noise(NoisePlayer),
    Sampler(SamplerPlayer),
}

impl VoiceSource {
    /// Apply the block's effective detune (instrument base + LFO) in cents.
    pub fn set_detune(&mut self, cents: f32) {
        match self {
            VoiceSource::Osc(o) => o.set_detune(cents),
            VoiceSource::Noise(n) => n.set_detune(cents),
            VoiceSource::Sampler(s) => s.set_detune(cents),
        }
    }

    pub fn set_waveform(&mut self, waveform: OscWaveform) {
        if let VoiceSource::Osc(o) = self {
            o.set_waveform(waveform);
        }
    }

    pub fn next_sample(&mut self) -> f32 {
        match self {
            VoiceSource::Osc(o) => o.next_sample(),
            VoiceSource::Noise(n) => n.next_sample(),
            VoiceSource::Sampler(s) => s.next_sample(),
        }
    }

    /// True once a oneshot sampler has run past its window.
    pub fn is_finished(&self) -> bool {
        matches!(self, VoiceSource::Sampler(s) if s.is_finished())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SR: f32 = 44100.0;

    #[test]
    fn sine_starts_at_zero_and_stays_in_range() {
        let mut osc = BlepOscillator::new(OscWaveform::Sine, 440.0, 0.0, SR);
        assert!(osc.next_sample().abs() < 1e-6);
        for _ in 0..44100 {
            let s = osc.next_sample();
            assert!((-1.0..=1.0).contains(&s), "sine out of range: {s}");
        }
    }

    #[test]
    fn square_and_saw_bounded_with_blep_overshoot() {
        for wf in [OscWaveform::Square, OscWaveform::Sawtooth] {
            let mut osc = BlepOscillator::new(wf, 440.0, 0.0, SR);
            for _ in 0..44100 {
                let s = osc.next_sample();
                assert!(s.abs() <= 1.5, "{wf:?} out of range: {s}");
            }
        }
    }

    #[test]
    fn detune_octave_doubles_rate() {
        let base = BlepOscillator::new(OscWaveform::Sine, 440.0, 0.0, SR);
        let up = BlepOscillator::new(OscWaveform::Sine, 440.0, 1200.0, SR);
        assert!((up.phase_inc - 2.0 * base.phase_inc).abs() < 1e-9);
    }

    #[test]
    fn noise_loops_and_stays_in_range() {
        let table = Arc::new(vec![0.5, -0.5, 0.25, -0.25]);
        let mut noise = NoisePlayer::new(table);
        noise.set_detune(0.0);
        for i in 0..16 {
            let s = noise.next_sample();
            assert_eq!(s, [0.5, -0.5, 0.25, -0.25][i % 4]);
        }
    }

    fn test_buffer(frames: usize) -> Arc<SampleBuffer> {
        Arc::new(SampleBuffer::mono((0..frames).map(|i| i as f32 / frames as f32).collect(), 44100))
    }

    #[test]
    fn sampler_at_a4_advances_at_unit_rate() {
        let buf = test_buffer(1000);
        let mut s = SamplerPlayer::new(buf, &SamplerConfig::default(), 1.0, SR);
        for _ in 0..100 {
            s.next_sample();
        }
        assert!((s.position - 100.0).abs() < 1e-9);
    }

    #[test]
    fn sampler_oneshot_finishes_at_window_end() {
        let buf = test_buffer(100);
        let config = SamplerConfig { end_point: 0.5, ..SamplerConfig::default() };
        let mut s = SamplerPlayer::new(buf, &config, 1.0, SR);
        for _ in 0..60 {
            s.next_sample();
        }
        assert!(s.is_finished());
    }

    #[test]
    fn sampler_forward_loop_stays_in_window() {
        let buf = test_buffer(100);
        let config = SamplerConfig {
            start_point: 0.2,
            end_point: 0.6,
            loop_mode: LoopMode::Forward,
            ..SamplerConfig::default()
        };
        let mut s = SamplerPlayer::new(buf, &config, 1.0, SR);
        for _ in 0..500 {
            s.next_sample();
        }
        assert!(!s.is_finished());
        assert!(s.position >= 20.0 && s.position < 60.0, "position {}", s.position);
    }

    #[test]
    fn sampler_pingpong_reverses_direction() {
        let buf = test_buffer(100);
        let config = SamplerConfig {
            start_point: 0.0,
            end_point: 0.1,
            loop_mode: LoopMode::Pingpong,
            ..SamplerConfig::default()
        };
        let mut s = SamplerPlayer::new(buf, &config, 1.0, SR);
        for _ in 0..15 {
            s.next_sample();
        }
        assert!(!s.forward);
        for _ in 0..10 {
            s.next_sample();
        }
        assert!(s.forward);
        assert!(!s.is_finished());
    }

    #[test]
    fn sampler_octave_up_doubles_rate() {
        let buf = test_buffer(1000);
        let mut s = SamplerPlayer::new(buf, &SamplerConfig::default(), 2.0, SR);
        for _ in 0..100 {
            s.next_sample();
        }
        assert!((s.position - 200.0).abs() < 1e-9);
    }

    #[test]
    fn sampler_gain_scales_output() {
        let buf = Arc::new(SampleBuffer::mono(vec![1.0; 100], 44100));
        let config = SamplerConfig { gain: 0.5, ..SamplerConfig::default() };
        let mut s = SamplerPlayer::new(buf, &config, 1.0, SR);
        s.next_sample();
        assert_eq!(s.next_sample(), 0.5);
    }
}
