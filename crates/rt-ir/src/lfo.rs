//! LFO settings and modulation targets.
//!
//! LFO1 and LFO2 have distinct target enums: LFO2 may cross-modulate LFO1's
//! frequency or depth, but LFO1 can never name an LFO target, so modulation
//! cycles are impossible by construction.

use serde::{Deserialize, Serialize};

/// LFO waveform shapes (no noise/sampler at modulation rates).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LfoWaveform {
    #[default]
    Sine,
    Square,
    Sawtooth,
    Triangle,
}

/// Parameters LFO1 may modulate.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Lfo1Target {
    #[default]
    OscillatorDetune,
    FilterFrequency,
    FilterResonance,
    Volume,
    Pan,
}

impl Lfo1Target {
    /// Full-scale modulation range in the target's native unit
    /// (cents, Hz, Q, unit gain, unit pan).
    pub fn modulation_range(self) -> f32 {
        match self {
            Lfo1Target::OscillatorDetune => 1200.0,
            Lfo1Target::FilterFrequency => 10_000.0,
            Lfo1Target::FilterResonance => 10.0,
            Lfo1Target::Volume => 1.0,
            Lfo1Target::Pan => 1.0,
        }
    }
}

/// Parameters LFO2 may modulate: everything LFO1 can, plus LFO1 itself.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Lfo2Target {
    #[default]
    OscillatorDetune,
    FilterFrequency,
    FilterResonance,
    Volume,
    Pan,
    Lfo1Frequency,
    Lfo1Depth,
}

impl Lfo2Target {
    /// The equivalent plain parameter target, if this is not a cross-LFO
    /// target.
    pub fn as_param(self) -> Option<Lfo1Target> {
        match self {
            Lfo2Target::OscillatorDetune => Some(Lfo1Target::OscillatorDetune),
            Lfo2Target::FilterFrequency => Some(Lfo1Target::FilterFrequency),
            Lfo2Target::FilterResonance => Some(Lfo1Target::FilterResonance),
            Lfo2Target::Volume => Some(Lfo1Target::Volume),
            Lfo2Target::Pan => Some(Lfo1Target::Pan),
            Lfo2Target::Lfo1Frequency | Lfo2Target::Lfo1Depth => None,
        }
    }

    /// Full-scale modulation range for this target.
    pub fn modulation_range(self, depth: f32) -> f32 {
        match self {
            // Cross-LFO ranges: 20 Hz of LFO1 frequency, 1.0 of LFO1 depth.
            Lfo2Target::Lfo1Frequency => 20.0 * depth,
            Lfo2Target::Lfo1Depth => depth,
            other => other.as_param().expect("param target").modulation_range() * depth,
        }
    }
}

/// One LFO's settings. `T` is the target enum for that LFO slot.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Lfo<T> {
    #[serde(default)]
    pub waveform: LfoWaveform,
    /// Rate in Hz, 0.1..20.
    pub frequency: f32,
    /// Modulation depth 0..1; 0 disables the LFO.
    pub depth: f32,
    pub target: T,
}

pub type Lfo1 = Lfo<Lfo1Target>;
pub type Lfo2 = Lfo<Lfo2Target>;

impl<T: Default> Default for Lfo<T> {
    fn default() -> Self {
        Self {
            waveform: LfoWaveform::Sine,
            frequency: 2.0,
            depth: 0.0,
            target: T::default(),
        }
    }
}

impl<T> Lfo<T> {
    pub const MIN_FREQUENCY: f32 = 0.1;
    pub const MAX_FREQUENCY: f32 = 20.0;

    pub fn clamped(mut self) -> Self {
        self.frequency = self.frequency.clamp(Self::MIN_FREQUENCY, Self::MAX_FREQUENCY);
        self.depth = self.depth.clamp(0.0, 1.0);
        self
    }

    pub fn is_active(&self) -> bool {
        self.depth > 0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lfo1_targets_have_ranges() {
        assert_eq!(Lfo1Target::OscillatorDetune.modulation_range(), 1200.0);
        assert_eq!(Lfo1Target::FilterFrequency.modulation_range(), 10_000.0);
        assert_eq!(Lfo1Target::FilterResonance.modulation_range(), 10.0);
        assert_eq!(Lfo1Target::Volume.modulation_range(), 1.0);
        assert_eq!(Lfo1Target::Pan.modulation_range(), 1.0);
    }

    #[test]
    fn cross_targets_are_not_params() {
        assert!(Lfo2Target::Lfo1Frequency.as_param().is_none());
        assert!(Lfo2Target::Lfo1Depth.as_param().is_none());
        assert_eq!(Lfo2Target::Volume.as_param(), Some(Lfo1Target::Volume));
    }

    #[test]
    fn cross_target_ranges_scale_with_depth() {
        assert_eq!(Lfo2Target::Lfo1Frequency.modulation_range(0.5), 10.0);
        assert_eq!(Lfo2Target::Lfo1Depth.modulation_range(0.3), 0.3);
    }

    #[test]
    fn default_lfo_is_inert() {
        let lfo = Lfo1::default();
        assert!(!lfo.is_active());
        assert_eq!(lfo.waveform, LfoWaveform::Sine);
    }

    #[test]
    fn clamped_limits_rate_and_depth() {
        let lfo = Lfo1 { frequency: 100.0, depth: 3.0, ..Lfo1::default() }.clamped();
        assert_eq!(lfo.frequency, 20.0);
        assert_eq!(lfo.depth, 1.0);
    }
}
