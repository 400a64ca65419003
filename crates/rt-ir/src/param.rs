//! Stable parameter-id table.
//!
//! These ids appear in two places: parameter-automation notes
//! (`effect == 0xFF`, high byte of the effect value) and LFO target
//! selection. Raw values are always a single 0..255 byte; each parameter
//! defines its own normalization.

use crate::envelope::EnvelopeMode;
use crate::filter::{FilterKind, FilterSpec};
use crate::instrument::Instrument;
use crate::lfo::{Lfo1Target, Lfo2Target, LfoWaveform};
use crate::oscillator::OscWaveform;

/// A stable numeric parameter id.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum ParamId {
    OscillatorType = 0x00,
    OscillatorDetune = 0x01,
    FilterType = 0x10,
    FilterFrequency = 0x11,
    FilterResonance = 0x12,
    FilterEnvelopeAmount = 0x13,
    FilterEnvelopeType = 0x20,
    FilterEnvelopeAttack = 0x21,
    FilterEnvelopeDecay = 0x22,
    FilterEnvelopeSustain = 0x23,
    FilterEnvelopeRelease = 0x24,
    EnvelopeType = 0x30,
    EnvelopeAttack = 0x31,
    EnvelopeDecay = 0x32,
    EnvelopeSustain = 0x33,
    EnvelopeRelease = 0x34,
    Volume = 0x40,
    Pan = 0x41,
    MaxVoices = 0x42,
    Lfo1Waveform = 0x50,
    Lfo1Frequency = 0x51,
    Lfo1Depth = 0x52,
    Lfo1Target = 0x53,
    Lfo2Waveform = 0x54,
    Lfo2Frequency = 0x55,
    Lfo2Depth = 0x56,
    Lfo2Target = 0x57,
}

impl ParamId {
    /// Look up a parameter id by its wire byte.
    pub fn from_u8(raw: u8) -> Option<Self> {
        use ParamId::*;
        Some(match raw {
            0x00 => OscillatorType,
            0x01 => OscillatorDetune,
            0x10 => FilterType,
            0x11 => FilterFrequency,
            0x12 => FilterResonance,
            0x13 => FilterEnvelopeAmount,
            0x20 => FilterEnvelopeType,
            0x21 => FilterEnvelopeAttack,
            0x22 => FilterEnvelopeDecay,
            0x23 => FilterEnvelopeSustain,
            0x24 => FilterEnvelopeRelease,
            0x30 => EnvelopeType,
            0x31 => EnvelopeAttack,
            0x32 => EnvelopeDecay,
            0x33 => EnvelopeSustain,
            0x34 => EnvelopeRelease,
            0x40 => Volume,
            0x41 => Pan,
            0x42 => MaxVoices,
            0x50 => Lfo1Waveform,
            0x51 => Lfo1Frequency,
            0x52 => Lfo1Depth,
            0x53 => Lfo1Target,
            0x54 => Lfo2Waveform,
            0x55 => Lfo2Frequency,
            0x56 => Lfo2Depth,
            0x57 => Lfo2Target,
            _ => return None,
        })
    }

    pub fn to_u8(self) -> u8 {
        self as u8
    }
}

/// Maximum envelope stage time reachable through automation, in seconds.
const MAX_ENVELOPE_TIME: f32 = 5.0;

fn unit(raw: u8) -> f32 {
    raw as f32 / 255.0
}

/// Index into a list of `count` discrete choices: floor(u * (count - 1)).
fn choice(raw: u8, count: u32) -> u32 {
    let idx = (unit(raw) * (count - 1) as f32).floor() as u32;
    idx.min(count - 1)
}

fn osc_waveform(raw: u8) -> OscWaveform {
    match choice(raw, 6) {
        0 => OscWaveform::Sine,
        1 => OscWaveform::Square,
        2 => OscWaveform::Sawtooth,
        3 => OscWaveform::Triangle,
        4 => OscWaveform::Noise,
        _ => OscWaveform::Sampler,
    }
}

fn lfo_waveform(raw: u8) -> LfoWaveform {
    match choice(raw, 4) {
        0 => LfoWaveform::Sine,
        1 => LfoWaveform::Square,
        2 => LfoWaveform::Sawtooth,
        _ => LfoWaveform::Triangle,
    }
}

fn envelope_mode(raw: u8) -> EnvelopeMode {
    match choice(raw, 3) {
        0 => EnvelopeMode::Ad,
        1 => EnvelopeMode::Ar,
        _ => EnvelopeMode::Adsr,
    }
}

fn lfo1_target(raw: u8) -> Lfo1Target {
    match choice(raw, 5) {
        0 => Lfo1Target::OscillatorDetune,
        1 => Lfo1Target::FilterFrequency,
        2 => Lfo1Target::FilterResonance,
        3 => Lfo1Target::Volume,
        _ => Lfo1Target::Pan,
    }
}

fn lfo2_target(raw: u8) -> Lfo2Target {
    match choice(raw, 7) {
        0 => Lfo2Target::OscillatorDetune,
        1 => Lfo2Target::FilterFrequency,
        2 => Lfo2Target::FilterResonance,
        3 => Lfo2Target::Volume,
        4 => Lfo2Target::Pan,
        5 => Lfo2Target::Lfo1Frequency,
        _ => Lfo2Target::Lfo1Depth,
    }
}

/// Filter cutoff: exponential sweep covering ~20 Hz .. 20 kHz.
fn filter_frequency(raw: u8) -> f32 {
    (unit(raw) * 1000f32.ln()).exp() * 20.0
}

/// LFO rate: exponential sweep 0.1 Hz .. 20 Hz.
fn lfo_frequency(raw: u8) -> f32 {
    0.1 * 200f32.powf(unit(raw))
}

/// Apply a normalized automation value to an instrument in place.
///
/// The mutated copy is what the scheduler hands to `update_instrument`.
pub fn apply_param(instrument: &mut Instrument, param: ParamId, raw: u8) {
    let u = unit(raw);
    match param {
        ParamId::OscillatorType => instrument.oscillator.waveform = osc_waveform(raw),
        ParamId::OscillatorDetune => instrument.oscillator.detune = -1200.0 + u * 2400.0,
        ParamId::FilterType => {
            instrument.filter.kind = if raw == 0 { FilterKind::Lowpass } else { FilterKind::Highpass }
        }
        ParamId::FilterFrequency => instrument.filter.frequency = filter_frequency(raw),
        ParamId::FilterResonance => {
            instrument.filter.resonance =
                FilterSpec::MIN_RESONANCE + u * (FilterSpec::MAX_RESONANCE - FilterSpec::MIN_RESONANCE)
        }
        ParamId::FilterEnvelopeAmount => instrument.filter.envelope_amount = u,
        ParamId::FilterEnvelopeType => instrument.filter.envelope.mode = envelope_mode(raw),
        ParamId::FilterEnvelopeAttack => instrument.filter.envelope.attack = u * MAX_ENVELOPE_TIME,
        ParamId::FilterEnvelopeDecay => instrument.filter.envelope.decay = u * MAX_ENVELOPE_TIME,
        ParamId::FilterEnvelopeSustain => instrument.filter.envelope.sustain = u,
        ParamId::FilterEnvelopeRelease => instrument.filter.envelope.release = u * MAX_ENVELOPE_TIME,
        ParamId::EnvelopeType => instrument.envelope.mode = envelope_mode(raw),
        ParamId::EnvelopeAttack => instrument.envelope.attack = u * MAX_ENVELOPE_TIME,
        ParamId::EnvelopeDecay => instrument.envelope.decay = u * MAX_ENVELOPE_TIME,
        ParamId::EnvelopeSustain => instrument.envelope.sustain = u,
        ParamId::EnvelopeRelease => instrument.envelope.release = u * MAX_ENVELOPE_TIME,
        ParamId::Volume => instrument.volume = u,
        ParamId::Pan => instrument.pan = u * 2.0 - 1.0,
        ParamId::MaxVoices => instrument.max_voices = (1.0 + u * 31.0).floor() as u8,
        ParamId::Lfo1Waveform => instrument.lfo1.waveform = lfo_waveform(raw),
        ParamId::Lfo1Frequency => instrument.lfo1.frequency = lfo_frequency(raw),
        ParamId::Lfo1Depth => instrument.lfo1.depth = u,
        ParamId::Lfo1Target => instrument.lfo1.target = lfo1_target(raw),
        ParamId::Lfo2Waveform => instrument.lfo2.waveform = lfo_waveform(raw),
        ParamId::Lfo2Frequency => instrument.lfo2.frequency = lfo_frequency(raw),
        ParamId::Lfo2Depth => instrument.lfo2.depth = u,
        ParamId::Lfo2Target => instrument.lfo2.target = lfo2_target(raw),
    }
}
