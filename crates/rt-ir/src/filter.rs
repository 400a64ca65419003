//! Per-voice filter settings.

use serde::{Deserialize, Serialize};

use crate::envelope::Envelope;

/// Filter response type.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterKind {
    #[default]
    Lowpass,
    Highpass,
}

/// An instrument's filter: a biquad plus an envelope that modulates cutoff.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterSpec {
    #[serde(default, rename = "type")]
    pub kind: FilterKind,
    /// Cutoff in Hz, 20..20000.
    pub frequency: f32,
    /// Q, 0.1..20.
    pub resonance: f32,
    /// How strongly the filter envelope pushes the cutoff, -1..1.
    /// The full-scale modulation range is 10 kHz.
    #[serde(default)]
    pub envelope_amount: f32,
    #[serde(default)]
    pub envelope: Envelope,
}

impl FilterSpec {
    /// Cutoff modulation in Hz at full envelope level.
    pub const ENVELOPE_RANGE_HZ: f32 = 10_000.0;

    pub const MIN_FREQUENCY: f32 = 20.0;
    pub const MAX_FREQUENCY: f32 = 20_000.0;
    pub const MIN_RESONANCE: f32 = 0.1;
    pub const MAX_RESONANCE: f32 = 20.0;

    /// Clamp all fields into their documented ranges.
    pub fn clamped(mut self) -> Self {
        self.frequency = self.frequency.clamp(Self::MIN_FREQUENCY, Self::MAX_FREQUENCY);
        self.resonance = self.resonance.clamp(Self::MIN_RESONANCE, Self::MAX_RESONANCE);
        self.envelope_amount = self.envelope_amount.clamp(-1.0, 1.0);
        self.envelope = self.envelope.clamped();
        self
    }
}

impl Default for FilterSpec {
    fn default() -> Self {
        Self {
            kind: FilterKind::Lowpass,
            frequency: 20_000.0,
            resonance: 1.0,
            envelope_amount: 0.0,
            envelope: Envelope::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_filter_is_open() {
        let f = FilterSpec::default();
        assert_eq!(f.kind, FilterKind::Lowpass);
        assert_eq!(f.frequency, 20_000.0);
        assert_eq!(f.envelope_amount, 0.0);
    }

    #[test]
    fn clamped_restores_ranges() {
        let f = FilterSpec {
            frequency: 5.0,
            resonance: 100.0,
            envelope_amount: -3.0,
            ..FilterSpec::default()
        }
        .clamped();
        assert_eq!(f.frequency, FilterSpec::MIN_FREQUENCY);
        assert_eq!(f.resonance, FilterSpec::MAX_RESONANCE);
        assert_eq!(f.envelope_amount, -1.0);
    }
}
