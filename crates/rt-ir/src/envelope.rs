//! Envelope types for amplitude and filter-cutoff shaping.

use serde::{Deserialize, Serialize};

/// Which stages of the envelope are in use.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnvelopeMode {
    /// Attack, then decay to zero. Sustain and release are ignored.
    Ad,
    /// Attack, hold at peak until note-off, then release. Decay and sustain are ignored.
    Ar,
    /// Full attack/decay/sustain/release.
    #[default]
    Adsr,
}

/// An envelope: stage times in seconds plus a sustain level.
///
/// Which fields are meaningful depends on `mode`; the unused fields are
/// carried so parameter automation can edit them before a mode switch.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Envelope {
    #[serde(default)]
    pub mode: EnvelopeMode,
    pub attack: f32,
    pub decay: f32,
    pub sustain: f32,
    pub release: f32,
}

impl Default for Envelope {
    fn default() -> Self {
        Self {
            mode: EnvelopeMode::Adsr,
            attack: 0.01,
            decay: 0.1,
            sustain: 0.7,
            release: 0.3,
        }
    }
}

impl Envelope {
    /// Create an ADSR envelope.
    pub fn adsr(attack: f32, decay: f32, sustain: f32, release: f32) -> Self {
        Self { mode: EnvelopeMode::Adsr, attack, decay, sustain, release }
    }

    /// Create an attack/decay envelope.
    pub fn ad(attack: f32, decay: f32) -> Self {
        Self { mode: EnvelopeMode::Ad, attack, decay, ..Self::default() }
    }

    /// Create an attack/release envelope.
    pub fn ar(attack: f32, release: f32) -> Self {
        Self { mode: EnvelopeMode::Ar, attack, release, ..Self::default() }
    }

    /// Clamp times to >= 0 and sustain into 0..=1.
    pub fn clamped(mut self) -> Self {
        self.attack = self.attack.max(0.0);
        self.decay = self.decay.max(0.0);
        self.sustain = self.sustain.clamp(0.0, 1.0);
        self.release = self.release.max(0.0);
        self
    }

    /// The level the envelope holds at after attack (and decay), if any.
    ///
    /// AD envelopes fall to zero instead of holding.
    pub fn hold_level(&self) -> Option<f32> {
        match self.mode {
            EnvelopeMode::Ad => None,
            EnvelopeMode::Ar => Some(1.0),
            EnvelopeMode::Adsr => Some(self.sustain.clamp(0.0, 1.0)),
        }
    }

    /// Release time, if the envelope has a release phase.
    pub fn release_time(&self) -> Option<f32> {
        match self.mode {
            EnvelopeMode::Ad => None,
            EnvelopeMode::Ar | EnvelopeMode::Adsr => Some(self.release.max(0.0)),
        }
    }

    /// Decay time, if the envelope has a decay phase.
    pub fn decay_time(&self) -> Option<f32> {
        match self.mode {
            EnvelopeMode::Ar => None,
            EnvelopeMode::Ad | EnvelopeMode::Adsr => Some(self.decay.max(0.0)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ad_has_no_hold_or_release() {
        let env = Envelope::ad(0.01, 0.2);
        assert_eq!(env.hold_level(), None);
        assert_eq!(env.release_time(), None);
        assert_eq!(env.decay_time(), Some(0.2));
    }

    #[test]
    fn ar_holds_at_peak() {
        let env = Envelope::ar(0.01, 0.5);
        assert_eq!(env.hold_level(), Some(1.0));
        assert_eq!(env.release_time(), Some(0.5));
        assert_eq!(env.decay_time(), None);
    }

    #[test]
    fn adsr_uses_all_stages() {
        let env = Envelope::adsr(0.01, 0.1, 0.6, 0.3);
        assert_eq!(env.hold_level(), Some(0.6));
        assert_eq!(env.release_time(), Some(0.3));
        assert_eq!(env.decay_time(), Some(0.1));
    }

    #[test]
    fn clamped_fixes_negative_times() {
        let env = Envelope::adsr(-1.0, -0.5, 1.5, -0.1).clamped();
        assert_eq!(env.attack, 0.0);
        assert_eq!(env.decay, 0.0);
        assert_eq!(env.sustain, 1.0);
        assert_eq!(env.release, 0.0);
    }
}
