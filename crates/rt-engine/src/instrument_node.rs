//! Instrument node: voice pool, envelope scheduling, LFO routing.

use std::sync::Arc;

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use tracing::warn;

use rt_codec::midi_to_hz;
use rt_ir::{
    Envelope, EnvelopeMode, FilterSpec, Instrument, Lfo1Target, Lfo2Target, LfoWaveform,
    OscWaveform, SampleBuffer, SourceCategory,
};

use crate::automation::ParamTimeline;
use crate::source::{BlepOscillator, NoisePlayer, SamplerPlayer, VoiceSource};
use crate::voice::{Voice, VoiceRenderParams};

/// New-source offset when retriggering a voice, so the replacement start
/// is strictly after the previous stop.
const RETRIGGER_EPSILON: f64 = 0.001;

/// Release time used when the envelope has no release phase.
const FALLBACK_RELEASE: f32 = 0.01;

/// Margin after the release ramp before the source is torn down.
const STOP_MARGIN: f64 = 0.001;

/// Length of the shared white-noise table in seconds.
const NOISE_SECONDS: f32 = 2.0;

const NOISE_SEED: u64 = 0x1F2E_3D4C_5B6A_7988;

/// Per-block LFO modulation offsets in target-native units.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
struct LfoMods {
    detune_cents: f32,
    cutoff_hz: f32,
    q: f32,
    volume: f32,
    pan: f32,
}

fn lfo_wave(waveform: LfoWaveform, phase: f64) -> f32 {
    let p = phase.fract() as f32;
    match waveform {
        LfoWaveform::Sine => (2.0 * std::f32::consts::PI * p).sin(),
        LfoWaveform::Square => {
            if p < 0.5 {
                1.0
            } else {
                -1.0
            }
        }
        LfoWaveform::Sawtooth => 2.0 * p - 1.0,
        LfoWaveform::Triangle => {
            if p < 0.5 {
                4.0 * p - 1.0
            } else {
                3.0 - 4.0 * p
            }
        }
    }
}

/// Compile an envelope into gain automation starting at `start`.
///
/// Shape: 0 at start, ramp to `peak` over the attack, then decay to the
/// hold level (ADSR), to zero (AD), or hold at peak (AR).
fn schedule_envelope(timeline: &mut ParamTimeline, env: &Envelope, peak: f32, start: f64) {
    let env = env.clamped();
    timeline.clear_to(0.0);
    timeline.set_value_at(0.0, start);
    let attack_end = start + env.attack as f64;
    timeline.ramp_to(peak, attack_end);
    match env.mode {
        EnvelopeMode::Ad => timeline.ramp_to(0.0, attack_end + env.decay as f64),
        EnvelopeMode::Adsr => timeline.ramp_to(peak * env.sustain, attack_end + env.decay as f64),
        EnvelopeMode::Ar => {}
    }
}

/// Owns the voice pool and modulation state for one instrument.
pub struct InstrumentNode {
    instrument: Instrument,
    sample_rate: f32,
    voices: Vec<Voice>,
    sample_buffer: Option<Arc<SampleBuffer>>,
    noise_table: Option<Arc<Vec<f32>>>,
    lfo1_phase: f64,
    lfo2_phase: f64,
}

impl InstrumentNode {
    pub fn new(instrument: Instrument, sample_rate: f32) -> Self {
        let instrument = instrument.clamped();
        let voices = (0..instrument.max_voices).map(|_| Voice::new(sample_rate)).collect();
        Self {
            instrument,
            sample_rate,
            voices,
            sample_buffer: None,
            noise_table: None,
            lfo1_phase: 0.0,
            lfo2_phase: 0.0,
        }
    }

    pub fn instrument(&self) -> &Instrument {
        &self.instrument
    }

    pub fn set_sample_buffer(&mut self, buffer: Arc<SampleBuffer>) {
        self.sample_buffer = Some(buffer);
    }

    pub fn sample_buffer(&self) -> Option<&Arc<SampleBuffer>> {
        self.sample_buffer.as_ref()
    }

    pub fn active_voices(&self) -> usize {
        self.voices.iter().filter(|v| v.is_active()).count()
    }

    /// The voice currently sounding `midi`, if any.
    pub fn voice_for_note(&self, midi: u8) -> Option<&Voice> {
        self.voices.iter().find(|v| v.is_active() && v.midi_note() == Some(midi))
    }

    fn noise(&mut self) -> Arc<Vec<f32>> {
        if let Some(table) = &self.noise_table {
            return table.clone();
        }
        let len = (self.sample_rate * NOISE_SECONDS) as usize;
        let mut rng = SmallRng::seed_from_u64(NOISE_SEED);
        let table: Arc<Vec<f32>> = Arc::new((0..len).map(|_| rng.gen_range(-1.0..=1.0)).collect());
        self.noise_table = Some(table.clone());
        table
    }

    fn build_source(&mut self, midi: u8) -> VoiceSource {
        let osc = &self.instrument.oscillator;
        match osc.category() {
            SourceCategory::Tonal => VoiceSource::Osc(BlepOscillator::new(
                osc.waveform,
                midi_to_hz(midi as f64) as f32,
                osc.detune,
                self.sample_rate,
            )),
            SourceCategory::Noise => {
                let table = self.noise();
                VoiceSource::Noise(NoisePlayer::new(table))
            }
            SourceCategory::Sampler => match self.sample_buffer.clone() {
                Some(buffer) => VoiceSource::Sampler(SamplerPlayer::new(
                    buffer,
                    &osc.sample,
                    midi_to_hz(midi as f64) / 440.0,
                    self.sample_rate,
                )),
                None => {
                    warn!(instrument = %self.instrument.id, midi, "sampler without sample, using sine fallback");
                    VoiceSource::Osc(BlepOscillator::new(
                        OscWaveform::Sine,
                        midi_to_hz(midi as f64) as f32,
                        osc.detune,
                        self.sample_rate,
                    ))
                }
            },
        }
    }

    /// Pick a voice slot: same-note retrigger, then a free slot, then
    /// steal the oldest voice that is past its attack, then the oldest
    /// outright.
    fn allocate_voice(&self, midi: u8, now: f64) -> (usize, bool) {
        if let Some(idx) = self
            .voices
            .iter()
            .position(|v| v.is_active() && v.midi_note() == Some(midi))
        {
            return (idx, true);
        }
        if let Some(idx) = self.voices.iter().position(|v| !v.is_active()) {
            return (idx, false);
        }
        let past_attack = self
            .voices
            .iter()
            .enumerate()
            .filter(|(_, v)| now >= v.attack_until)
            .min_by(|a, b| a.1.start_time.total_cmp(&b.1.start_time))
            .map(|(i, _)| i);
        let idx = past_attack.unwrap_or_else(|| {
            self.voices
                .iter()
                .enumerate()
                .min_by(|a, b| a.1.start_time.total_cmp(&b.1.start_time))
                .map(|(i, _)| i)
                .unwrap_or(0)
        });
        (idx, false)
    }

    /// Start a note. `velocity` is normalized 0..1; `time` is the engine
    /// time the note should sound at (may be in the near future).
    pub fn note_on(&mut self, midi: u8, velocity: f32, time: f64) {
        let velocity = velocity.clamp(0.0, 1.0);
        let source = self.build_source(midi);
        let (idx, retrigger) = self.allocate_voice(midi, time);

        let amp_env = self.instrument.envelope;
        let filter_env = self.instrument.filter.envelope;
        let peak = velocity * self.instrument.volume;
        let start = if retrigger { time + RETRIGGER_EPSILON } else { time };

        let voice = &mut self.voices[idx];
        voice.silence_now();
        voice.filter.reset();
        voice.source = Some(source);
        schedule_envelope(&mut voice.gain, &amp_env, peak, start);
        schedule_envelope(&mut voice.filter_env, &filter_env, 1.0, start);
        voice.midi_note = Some(midi);
        voice.start_time = start;
        voice.attack_until = start + amp_env.clamped().attack as f64;
        voice.active = true;
    }

    fn apply_release(voice: &mut Voice, env: &Envelope, filter_env: &Envelope, time: f64) {
        let release = env.release_time().unwrap_or(FALLBACK_RELEASE) as f64;
        voice.gain.anchor(time);
        voice.gain.cancel_after(time);
        voice.gain.ramp_to(0.0, time + release);
        // Only an ADSR filter envelope holds a level worth releasing; AD
        // falls on its own and AR has no decay to undo.
        if filter_env.mode == EnvelopeMode::Adsr {
            voice.filter_env.anchor(time);
            voice.filter_env.cancel_after(time);
            voice.filter_env.ramp_to(0.0, time + release);
        }
        voice.stop_at = Some(time + release + STOP_MARGIN);
    }

    /// Release the voice playing `midi`. With `immediate`, the voice is
    /// silenced without its release ramp.
    pub fn note_off(&mut self, midi: u8, time: f64, immediate: bool) {
        let env = self.instrument.envelope;
        let filter_env = self.instrument.filter.envelope;
        let Some(voice) = self
            .voices
            .iter_mut()
            .find(|v| v.is_active() && v.midi_note() == Some(midi))
        else {
            warn!(instrument = %self.instrument.id, midi, "note_off for a note that is not sounding");
            return;
        };
        if immediate {
            voice.silence_now();
            return;
        }
        Self::apply_release(voice, &env, &filter_env, time);
    }

    /// Release every active voice at `time`.
    pub fn release_all(&mut self, time: f64) {
        let env = self.instrument.envelope;
        let filter_env = self.instrument.filter.envelope;
        for voice in &mut self.voices {
            if voice.is_active() && voice.stop_at.is_none() {
                Self::apply_release(voice, &env, &filter_env, time);
            }
        }
    }

    fn rebuild_pool(&mut self) {
        let sample_rate = self.sample_rate;
        self.voices = (0..self.instrument.max_voices)
            .map(|_| Voice::new(sample_rate))
            .collect();
    }

    /// Replace the instrument definition without audible discontinuity.
    ///
    /// The pool is only torn down when polyphony or the source category
    /// changes. Otherwise committed gain automation is rescaled by the
    /// volume ratio and live tonal sources pick up the new waveform;
    /// filter, pan, detune and LFO settings take effect next block.
    pub fn update_instrument(&mut self, new: Instrument) {
        let new = new.clamped();
        let rebuild = new.max_voices != self.instrument.max_voices
            || new.oscillator.category() != self.instrument.oscillator.category();
        if rebuild {
            self.instrument = new;
            self.rebuild_pool();
            return;
        }

        let old_volume = self.instrument.volume;
        if new.volume != old_volume && old_volume > 0.0 {
            let factor = new.volume / old_volume;
            for voice in &mut self.voices {
                voice.gain.scale_values(factor);
            }
        }

        if new.oscillator.category() == SourceCategory::Tonal
            && new.oscillator.waveform != self.instrument.oscillator.waveform
        {
            for voice in &mut self.voices {
                if let Some(source) = voice.source.as_mut() {
                    source.set_waveform(new.oscillator.waveform);
                }
            }
        }

        self.instrument = new;
    }

    /// Evaluate both LFOs for a block of `block_secs`, advancing their
    /// free-running phases. LFO2 is applied first so its cross-modulation
    /// of LFO1's frequency and depth lands in the same block.
    fn evaluate_lfos(&mut self, block_secs: f64) -> LfoMods {
        let lfo1 = self.instrument.lfo1;
        let lfo2 = self.instrument.lfo2;

        let mut mods = LfoMods::default();
        let mut lfo1_frequency = lfo1.frequency;
        let mut lfo1_depth = lfo1.depth;

        if lfo2.is_active() {
            let value = lfo_wave(lfo2.waveform, self.lfo2_phase);
            match lfo2.target {
                Lfo2Target::Lfo1Frequency => {
                    lfo1_frequency = (lfo1_frequency + 20.0 * lfo2.depth * value).max(0.0);
                }
                Lfo2Target::Lfo1Depth => {
                    lfo1_depth = (lfo1_depth + lfo2.depth * value).clamp(0.0, 1.0);
                }
                target => {
                    let param = target.as_param().expect("non-cross target");
                    apply_mod(&mut mods, param, param.modulation_range() * lfo2.depth * value);
                }
            }
        }

        if lfo1_depth > 0.0 {
            let value = lfo_wave(lfo1.waveform, self.lfo1_phase);
            apply_mod(&mut mods, lfo1.target, lfo1.target.modulation_range() * lfo1_depth * value);
        }

        self.lfo1_phase = (self.lfo1_phase + lfo1_frequency as f64 * block_secs).fract();
        self.lfo2_phase = (self.lfo2_phase + lfo2.frequency as f64 * block_secs).fract();
        mods
    }

    /// Render one block, mixing all voices into `out` (interleaved stereo).
    pub fn render(&mut self, out: &mut [f32], block_start: f64) {
        let frames = out.len() / 2;
        if frames == 0 {
            return;
        }
        let mods = self.evaluate_lfos(frames as f64 / self.sample_rate as f64);
        let inst = &self.instrument;
        let params = VoiceRenderParams {
            filter_kind: inst.filter.kind,
            cutoff_hz: inst.filter.frequency + mods.cutoff_hz,
            q: inst.filter.resonance + mods.q,
            env_range_hz: inst.filter.envelope_amount * FilterSpec::ENVELOPE_RANGE_HZ,
            detune_cents: inst.oscillator.detune + mods.detune_cents,
            pan: inst.pan + mods.pan,
            level: (1.0 + mods.volume).max(0.0),
        };
        let sample_rate = self.sample_rate as f64;
        for voice in &mut self.voices {
            voice.render(out, block_start, sample_rate, &params);
        }
    }
}

fn apply_mod(mods: &mut LfoMods, target: Lfo1Target, amount: f32) {
    match target {
        Lfo1Target::OscillatorDetune => mods.detune_cents += amount,
        Lfo1Target::FilterFrequency => mods.cutoff_hz += amount,
        Lfo1Target::FilterResonance => mods.q += amount,
        Lfo1Target::Volume => mods.volume += amount,
        Lfo1Target::Pan => mods.pan += amount,
    }
}
