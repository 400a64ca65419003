//! Song sequencing and project container.

use std::collections::HashMap;

use crate::instrument::{Instrument, InstrumentId};
use crate::pattern::Pattern;

/// A song: an ordered list of sequences. Each sequence is a list of
/// pattern ids played layered, for the duration of the longest one.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Song {
    pub sequences: Vec<Vec<u32>>,
}

impl Song {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a sequence of layered pattern ids.
    pub fn add_sequence(&mut self, pattern_ids: Vec<u32>) {
        self.sequences.push(pattern_ids);
    }

    pub fn len(&self) -> usize {
        self.sequences.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sequences.is_empty()
    }
}

/// A complete project: instruments, patterns, song order, and any
/// embedded encoded sample data keyed by instrument id.
#[derive(Clone, Debug, Default)]
pub struct Project {
    pub name: String,
    pub instruments: Vec<Instrument>,
    pub patterns: Vec<Pattern>,
    pub song: Song,
    pub sample_data: HashMap<InstrumentId, Vec<u8>>,
}

impl Project {
    pub fn new(name: &str) -> Self {
        Self { name: name.into(), ..Self::default() }
    }

    pub fn pattern(&self, id: u32) -> Option<&Pattern> {
        self.patterns.iter().find(|p| p.id == id)
    }

    pub fn instrument(&self, id: InstrumentId) -> Option<&Instrument> {
        self.instruments.iter().find(|i| i.id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn song_sequences_in_order() {
        let mut song = Song::new();
        song.add_sequence(vec![0]);
        song.add_sequence(vec![1, 2]);
        assert_eq!(song.len(), 2);
        assert_eq!(song.sequences[1], vec![1, 2]);
    }

    #[test]
    fn project_lookups() {
        let mut project = Project::new("demo");
        project.patterns.push(Pattern::new(7, 4, 16));
        let id = InstrumentId::new(0x10).unwrap();
        project.instruments.push(Instrument::new(id, "bass"));

        assert!(project.pattern(7).is_some());
        assert!(project.pattern(8).is_none());
        assert!(project.instrument(id).is_some());
    }
}
