//! Instrument definition and ids.

use std::fmt;

use arrayvec::ArrayString;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::envelope::Envelope;
use crate::filter::FilterSpec;
use crate::lfo::{Lfo1, Lfo2};
use crate::oscillator::Oscillator;

/// Default polyphony per instrument.
pub const DEFAULT_MAX_VOICES: u8 = 16;

/// Instrument id: two hex digits on the wire, 0x00..=0xFE.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InstrumentId(u8);

impl InstrumentId {
    pub const MAX: u8 = 0xFE;

    /// Create an id; values above 0xFE are rejected.
    pub fn new(raw: u8) -> Option<Self> {
        (raw <= Self::MAX).then_some(Self(raw))
    }

    pub fn raw(self) -> u8 {
        self.0
    }

    /// Parse a two-hex-digit id string (case-insensitive).
    pub fn from_hex(s: &str) -> Option<Self> {
        if s.len() != 2 {
            return None;
        }
        u8::from_str_radix(s, 16).ok().and_then(Self::new)
    }
}

impl fmt::Display for InstrumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02X}", self.0)
    }
}

impl Serialize for InstrumentId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for InstrumentId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = <&str>::deserialize(deserializer)?;
        InstrumentId::from_hex(s)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid instrument id {s:?}")))
    }
}

/// A complete instrument definition.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Instrument {
    pub id: InstrumentId,
    #[serde(default)]
    pub name: ArrayString<32>,
    /// Output level 0..1.
    #[serde(default = "default_volume")]
    pub volume: f32,
    /// Stereo position -1..1.
    #[serde(default)]
    pub pan: f32,
    /// Polyphony limit, 1..=32.
    #[serde(default = "default_max_voices")]
    pub max_voices: u8,
    pub oscillator: Oscillator,
    #[serde(default)]
    pub filter: FilterSpec,
    /// Amplitude envelope.
    #[serde(default)]
    pub envelope: Envelope,
    #[serde(default)]
    pub lfo1: Lfo1,
    #[serde(default)]
    pub lfo2: Lfo2,
}

fn default_volume() -> f32 {
    1.0
}

fn default_max_voices() -> u8 {
    DEFAULT_MAX_VOICES
}

impl Instrument {
    /// Create an instrument with default settings.
    pub fn new(id: InstrumentId, name: &str) -> Self {
        let mut inst_name = ArrayString::new();
        let _ = inst_name.try_push_str(name);
        Self {
            id,
            name: inst_name,
            volume: default_volume(),
            pan: 0.0,
            max_voices: DEFAULT_MAX_VOICES,
            oscillator: Oscillator::default(),
            filter: FilterSpec::default(),
            envelope: Envelope::default(),
            lfo1: Lfo1::default(),
            lfo2: Lfo2::default(),
        }
    }

    /// Clamp all fields into their documented ranges.
    pub fn clamped(mut self) -> Self {
        self.volume = self.volume.clamp(0.0, 1.0);
        self.pan = self.pan.clamp(-1.0, 1.0);
        self.max_voices = self.max_voices.clamp(1, 32);
        self.oscillator.sample = self.oscillator.sample.clamped();
        self.filter = self.filter.clamped();
        self.envelope = self.envelope.clamped();
        self.lfo1 = self.lfo1.clamped();
        self.lfo2 = self.lfo2.clamped();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn id_formats_as_two_hex_digits() {
        let id = InstrumentId::new(0x0A).unwrap();
        assert_eq!(id.to_string(), "0A");
    }

    #[test]
    fn id_parses_hex() {
        assert_eq!(InstrumentId::from_hex("fe"), InstrumentId::new(0xFE));
        assert_eq!(InstrumentId::from_hex("00"), InstrumentId::new(0));
        assert!(InstrumentId::from_hex("FF").is_none());
        assert!(InstrumentId::from_hex("0").is_none());
        assert!(InstrumentId::from_hex("zz").is_none());
    }

    #[test]
    fn id_rejects_reserved_ff() {
        assert!(InstrumentId::new(0xFF).is_none());
    }

    #[test]
    fn new_instrument_has_defaults() {
        let inst = Instrument::new(InstrumentId::new(1).unwrap(), "lead");
        assert_eq!(inst.max_voices, DEFAULT_MAX_VOICES);
        assert_eq!(inst.volume, 1.0);
        assert_eq!(inst.pan, 0.0);
        assert_eq!(&inst.name[..], "lead");
    }

    #[test]
    fn missing_optional_fields_deserialize_to_defaults() {
        let json = r#"{
            "id": "01",
            "oscillator": { "waveform": "square" }
        }"#;
        let inst: Instrument = serde_json::from_str(json).unwrap();
        assert_eq!(inst.max_voices, DEFAULT_MAX_VOICES);
        assert_eq!(inst.volume, 1.0);
        assert_eq!(inst.pan, 0.0);
        assert!(!inst.lfo1.is_active());
        assert!(!inst.lfo2.is_active());
    }

    #[test]
    fn clamped_limits_everything() {
        let mut inst = Instrument::new(InstrumentId::new(2).unwrap(), "x");
        inst.volume = 7.0;
        inst.pan = -2.0;
        inst.max_voices = 0;
        let inst = inst.clamped();
        assert_eq!(inst.volume, 1.0);
        assert_eq!(inst.pan, -1.0);
        assert_eq!(inst.max_voices, 1);
    }
}
