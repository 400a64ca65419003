//! Lookahead playback scheduler.
//!
//! Walks pattern rows on a sixteenth-note grid and commits note-ons,
//! note-offs and parameter automation to instrument nodes slightly ahead
//! of the engine clock. Rows dispatch in two passes so that a note-off
//! sentinel sharing a row with a note-on always releases the new note,
//! never cuts it off.

use std::collections::{HashMap, VecDeque};

use tracing::warn;

use rt_ir::{apply_param, Cell, InstrumentId, ParamId, Pattern, Song};

use crate::events::EngineEvent;
use crate::instrument_node::InstrumentNode;

/// How far into the future rows are committed to the audio graph.
pub const SCHEDULE_AHEAD_TIME: f64 = 0.100;

/// Wake-up interval for the driving loop.
pub const LOOKAHEAD: f64 = 0.025;

/// Note-offs land this far after their row time so same-row note-ons win.
const NOTE_OFF_DELAY: f64 = 0.001;

/// Sequence length used when a song sequence references no known pattern.
const DEFAULT_SEQUENCE_ROWS: u16 = 16;

/// Registry of instrument nodes, keyed by instrument id.
pub type NodeMap = HashMap<InstrumentId, InstrumentNode>;

fn seconds_per_row(tempo: u16) -> f64 {
    60.0 / tempo.max(1) as f64 / 4.0
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct LastNote {
    instrument: InstrumentId,
    tone: u8,
}

enum Mode {
    Idle,
    Pattern(u32),
    Song(Song),
}

/// Drives pattern/song playback against the engine clock.
pub struct PlaybackScheduler {
    patterns: HashMap<u32, Pattern>,
    mode: Mode,
    current_row: u16,
    current_sequence: usize,
    next_note_time: f64,
    tempo: u16,
    is_playing: bool,
    last_note_per_track: HashMap<u8, LastNote>,
    /// Reusable row gather buffer; avoids per-row allocation.
    scratch: Vec<(u8, Cell)>,
}

impl PlaybackScheduler {
    pub fn new() -> Self {
        Self {
            patterns: HashMap::new(),
            mode: Mode::Idle,
            current_row: 0,
            current_sequence: 0,
            next_note_time: 0.0,
            tempo: Pattern::DEFAULT_TEMPO,
            is_playing: false,
            last_note_per_track: HashMap::with_capacity(16),
            scratch: Vec::with_capacity(64),
        }
    }

    pub fn is_playing(&self) -> bool {
        self.is_playing
    }

    pub fn current_row(&self) -> u16 {
        self.current_row
    }

    /// Switch playback to a single pattern. Mid-playback the row position
    /// and next row time are preserved so edits don't cause a jump.
    pub fn set_pattern(&mut self, pattern: Pattern) {
        self.tempo = pattern.tempo;
        let id = pattern.id;
        self.patterns.insert(id, pattern);
        self.mode = Mode::Pattern(id);
        if !self.is_playing {
            self.current_row = 0;
        }
    }

    /// Replace a stored pattern in place. Takes effect from the next
    /// scheduled row; rows already inside the lookahead window keep
    /// playing from the old data.
    pub fn update_pattern(&mut self, pattern: Pattern) {
        self.patterns.insert(pattern.id, pattern);
    }

    /// Switch playback to a song.
    pub fn set_song(&mut self, song: Song) {
        self.current_sequence = 0;
        if !self.is_playing {
            self.current_row = 0;
        }
        if let Some(tempo) = song
            .sequences
            .first()
            .and_then(|seq| seq.first())
            .and_then(|pid| self.patterns.get(pid))
            .map(|p| p.tempo)
        {
            self.tempo = tempo;
        }
        self.mode = Mode::Song(song);
    }

    pub fn play(&mut self, now: f64, events: &mut VecDeque<EngineEvent>) {
        if self.is_playing {
            return;
        }
        self.is_playing = true;
        self.next_note_time = now;
        events.push_back(EngineEvent::PlayStart);
    }

    /// Stop playback: release every voice, forget per-track note memory.
    pub fn stop(&mut self, now: f64, nodes: &mut NodeMap, events: &mut VecDeque<EngineEvent>) {
        if !self.is_playing {
            return;
        }
        self.is_playing = false;
        for node in nodes.values_mut() {
            node.release_all(now);
        }
        self.last_note_per_track.clear();
        events.push_back(EngineEvent::PlayStop);
    }

    /// Jump to a row; it is read on the next dispatch cycle.
    pub fn seek(&mut self, row: u16) {
        self.current_row = row;
    }

    /// Commit every row that falls inside the lookahead window.
    pub fn advance(&mut self, now: f64, nodes: &mut NodeMap, events: &mut VecDeque<EngineEvent>) {
        while self.is_playing && self.next_note_time < now + SCHEDULE_AHEAD_TIME {
            self.dispatch_row(nodes, events);
            self.advance_position();
        }
    }

    /// Gather the current row's cells from the active pattern(s).
    fn gather_row(&mut self) {
        self.scratch.clear();
        let row = self.current_row;
        match &self.mode {
            Mode::Idle => {}
            Mode::Pattern(id) => {
                if let Some(pattern) = self.patterns.get(id) {
                    if row < pattern.rows {
                        for (track, cell) in pattern.row(row).iter().enumerate() {
                            if let Some(cell) = cell {
                                self.scratch.push((track as u8, *cell));
                            }
                        }
                    }
                }
            }
            Mode::Song(song) => {
                let Some(sequence) = song.sequences.get(self.current_sequence) else {
                    return;
                };
                for pid in sequence {
                    let Some(pattern) = self.patterns.get(pid) else {
                        continue;
                    };
                    if row < pattern.rows {
                        for (track, cell) in pattern.row(row).iter().enumerate() {
                            if let Some(cell) = cell {
                                self.scratch.push((track as u8, *cell));
                            }
                        }
                    }
                }
            }
        }
    }

    fn dispatch_row(&mut self, nodes: &mut NodeMap, events: &mut VecDeque<EngineEvent>) {
        let time = self.next_note_time;
        self.gather_row();

        // Pass 1: note-ons, and per-track note memory for pass 2.
        for i in 0..self.scratch.len() {
            let (track, cell) = self.scratch[i];
            if cell.is_note_off() || cell.is_automation() || cell.velocity == 0 {
                continue;
            }
            match nodes.get_mut(&cell.instrument) {
                Some(node) => {
                    node.note_on(cell.tone, cell.velocity as f32 / 255.0, time);
                    self.last_note_per_track
                        .insert(track, LastNote { instrument: cell.instrument, tone: cell.tone });
                }
                None => {
                    warn!(instrument = %cell.instrument, row = self.current_row, track, "note for unknown instrument, skipping");
                }
            }
        }

        // Pass 2: note-off sentinels and parameter automation.
        for i in 0..self.scratch.len() {
            let (track, cell) = self.scratch[i];
            if cell.is_note_off() {
                match self.last_note_per_track.get(&track) {
                    Some(last) if last.instrument == cell.instrument => {
                        let tone = last.tone;
                        if let Some(node) = nodes.get_mut(&cell.instrument) {
                            node.note_off(tone, time + NOTE_OFF_DELAY, false);
                        }
                        self.last_note_per_track.remove(&track);
                    }
                    _ => {
                        warn!(track, row = self.current_row, "note-off with no matching note on this track");
                    }
                }
            } else if cell.is_automation() {
                let Some(node) = nodes.get_mut(&cell.instrument) else {
                    warn!(instrument = %cell.instrument, "automation for unknown instrument");
                    continue;
                };
                match ParamId::from_u8(cell.param_id()) {
                    Some(param) => {
                        let mut updated = node.instrument().clone();
                        apply_param(&mut updated, param, cell.param_raw());
                        node.update_instrument(updated);
                    }
                    None => {
                        warn!(param = cell.param_id(), "unknown automation parameter id");
                    }
                }
            }
        }

        events.push_back(EngineEvent::RowChange { row: self.current_row });
    }

    fn advance_position(&mut self) {
        match &self.mode {
            Mode::Idle => {
                self.next_note_time += seconds_per_row(self.tempo);
            }
            Mode::Pattern(id) => {
                let (rows, tempo) = self
                    .patterns
                    .get(id)
                    .map(|p| (p.rows.max(1), p.tempo))
                    .unwrap_or((DEFAULT_SEQUENCE_ROWS, self.tempo));
                // A tempo edit applies from this row forward.
                self.tempo = tempo;
                self.next_note_time += seconds_per_row(self.tempo);
                self.current_row = (self.current_row + 1) % rows;
            }
            Mode::Song(song) => {
                let max_rows = song
                    .sequences
                    .get(self.current_sequence)
                    .map(|seq| {
                        seq.iter()
                            .filter_map(|pid| self.patterns.get(pid))
                            .map(|p| p.rows)
                            .max()
                            .unwrap_or(DEFAULT_SEQUENCE_ROWS)
                    })
                    .unwrap_or(DEFAULT_SEQUENCE_ROWS)
                    .max(1);
                self.next_note_time += seconds_per_row(self.tempo);
                let next = self.current_row + 1;
                if next >= max_rows {
                    self.current_row = 0;
                    self.current_sequence = (self.current_sequence + 1) % song.sequences.len().max(1);
                    // The new sequence adopts its first pattern's tempo.
                    if let Some(tempo) = song
                        .sequences
                        .get(self.current_sequence)
                        .and_then(|seq| seq.first())
                        .and_then(|pid| self.patterns.get(pid))
                        .map(|p| p.tempo)
                    {
                        self.tempo = tempo;
                    }
                } else {
                    self.current_row = next;
                }
            }
        }
    }
}

impl Default for PlaybackScheduler {
    fn default() -> Self {
        Self::new()
    }
}
