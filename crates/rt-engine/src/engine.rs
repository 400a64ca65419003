//! The engine core: node registry, master gain, clock, block renderer.
//!
//! `EngineCore` is single-owner state driven from one thread: the audio
//! thread in live playback, or the caller directly for offline rendering
//! and tests. The scheduler shares the engine clock, so everything it
//! commits is sample-accurate by construction.

use std::collections::VecDeque;
use std::sync::Arc;

use rt_ir::{Instrument, InstrumentId, Pattern, SampleBuffer, Song};

use crate::command::Command;
use crate::events::EngineEvent;
use crate::instrument_node::InstrumentNode;
use crate::scheduler::{NodeMap, PlaybackScheduler};

/// Frames per internal render block; scheduling runs between blocks.
pub const BLOCK_FRAMES: usize = 128;

/// Master gain default.
pub const DEFAULT_MASTER_GAIN: f32 = 0.75;

/// Master gain smoothing time constant in seconds.
const MASTER_SMOOTHING: f32 = 0.010;

pub struct EngineCore {
    sample_rate: u32,
    nodes: NodeMap,
    scheduler: PlaybackScheduler,
    master_gain: f32,
    master_target: f32,
    master_coeff: f32,
    clock_samples: u64,
    events: VecDeque<EngineEvent>,
}

impl EngineCore {
    pub fn new(sample_rate: u32) -> Self {
        Self {
            sample_rate,
            nodes: NodeMap::new(),
            scheduler: PlaybackScheduler::new(),
            master_gain: DEFAULT_MASTER_GAIN,
            master_target: DEFAULT_MASTER_GAIN,
            master_coeff: 1.0 - (-1.0 / (MASTER_SMOOTHING * sample_rate as f32)).exp(),
            clock_samples: 0,
            events: VecDeque::with_capacity(256),
        }
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Engine time in seconds.
    pub fn now(&self) -> f64 {
        self.clock_samples as f64 / self.sample_rate as f64
    }

    pub fn is_playing(&self) -> bool {
        self.scheduler.is_playing()
    }

    pub fn node(&self, id: InstrumentId) -> Option<&InstrumentNode> {
        self.nodes.get(&id)
    }

    /// Create or update an instrument node; playback is not interrupted.
    pub fn update_instrument(&mut self, instrument: Instrument) {
        match self.nodes.get_mut(&instrument.id) {
            Some(node) => node.update_instrument(instrument),
            None => {
                let id = instrument.id;
                self.nodes.insert(id, InstrumentNode::new(instrument, self.sample_rate as f32));
            }
        }
    }

    pub fn set_sample_buffer(&mut self, id: InstrumentId, buffer: Arc<SampleBuffer>) {
        if let Some(node) = self.nodes.get_mut(&id) {
            node.set_sample_buffer(buffer);
        }
    }

    pub fn set_pattern(&mut self, pattern: Pattern) {
        self.scheduler.set_pattern(pattern);
    }

    pub fn update_pattern(&mut self, pattern: Pattern) {
        self.scheduler.update_pattern(pattern);
    }

    pub fn set_song(&mut self, song: Song) {
        self.scheduler.set_song(song);
    }

    pub fn play(&mut self) {
        let now = self.now();
        self.scheduler.play(now, &mut self.events);
    }

    pub fn stop(&mut self) {
        let now = self.now();
        self.scheduler.stop(now, &mut self.nodes, &mut self.events);
    }

    pub fn seek(&mut self, row: u16) {
        self.scheduler.seek(row);
    }

    pub fn set_master_volume(&mut self, volume: f32) {
        self.master_target = volume.clamp(0.0, 1.0);
    }

    /// Drop all nodes and playback state (project load).
    pub fn reset(&mut self) {
        self.stop();
        self.nodes.clear();
        self.scheduler = PlaybackScheduler::new();
    }

    /// Apply one control command.
    pub fn apply(&mut self, command: Command) {
        match command {
            Command::UpdateInstrument(instrument) => self.update_instrument(*instrument),
            Command::SetSampleBuffer { instrument, buffer } => {
                self.set_sample_buffer(instrument, buffer)
            }
            Command::SetPattern(pattern) => self.set_pattern(*pattern),
            Command::UpdatePattern(pattern) => self.update_pattern(*pattern),
            Command::SetSong(song) => self.set_song(song),
            Command::Play => self.play(),
            Command::Stop => self.stop(),
            Command::Seek(row) => self.seek(row),
            Command::SetMasterVolume(volume) => self.set_master_volume(volume),
            Command::Reset => self.reset(),
        }
    }

    pub fn pop_event(&mut self) -> Option<EngineEvent> {
        self.events.pop_front()
    }

    /// Render interleaved stereo into `out`, advancing the engine clock.
    pub fn render(&mut self, out: &mut [f32]) {
        out.fill(0.0);
        let mut offset = 0;
        while offset < out.len() {
            let chunk_len = (out.len() - offset).min(BLOCK_FRAMES * 2);
            let chunk = &mut out[offset..offset + chunk_len];
            let now = self.now();

            self.scheduler.advance(now, &mut self.nodes, &mut self.events);
            for node in self.nodes.values_mut() {
                node.render(chunk, now);
            }
            for frame in chunk.chunks_exact_mut(2) {
                self.master_gain += (self.master_target - self.master_gain) * self.master_coeff;
                frame[0] *= self.master_gain;
                frame[1] *= self.master_gain;
            }

            self.clock_samples += (chunk_len / 2) as u64;
            offset += chunk_len;
        }
    }

    /// Render `count` frames and collect them (offline/test helper).
    pub fn render_frames(&mut self, count: usize) -> Vec<[f32; 2]> {
        let mut frames = Vec::with_capacity(count);
        let mut block = vec![0.0f32; BLOCK_FRAMES * 2];
        let mut remaining = count;
        while remaining > 0 {
            let take = remaining.min(BLOCK_FRAMES);
            let chunk = &mut block[..take * 2];
            self.render(chunk);
            for frame in chunk.chunks_exact(2) {
                frames.push([frame[0], frame[1]]);
            }
            remaining -= take;
        }
        frames
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rt_ir::{Cell, Envelope};

    const SR: u32 = 44100;

    fn inst_id(raw: u8) -> InstrumentId {
        InstrumentId::new(raw).unwrap()
    }

    fn test_instrument(raw: u8) -> Instrument {
        let mut inst = Instrument::new(inst_id(raw), "test");
        inst.envelope = Envelope::adsr(0.005, 0.05, 0.8, 0.05);
        inst
    }

    fn max_amplitude(frames: &[[f32; 2]]) -> f32 {
        frames
            .iter()
            .flat_map(|f| [f[0].abs(), f[1].abs()])
            .fold(0.0f32, f32::max)
    }

    #[test]
    fn silent_with_nothing_scheduled() {
        let mut core = EngineCore::new(SR);
        core.update_instrument(test_instrument(0));
        let frames = core.render_frames(4410);
        assert_eq!(max_amplitude(&frames), 0.0);
    }

    #[test]
    fn pattern_note_produces_output() {
        let mut core = EngineCore::new(SR);
        core.update_instrument(test_instrument(0));
        let mut pattern = Pattern::with_tempo(0, "", 120, 1, 4);
        pattern.set_cell(0, 0, Some(Cell::note(inst_id(0), 60, 255)));
        core.set_pattern(pattern);
        core.play();

        let frames = core.render_frames(SR as usize / 2);
        assert!(max_amplitude(&frames) > 0.01);
    }

    #[test]
    fn output_stays_in_range() {
        let mut core = EngineCore::new(SR);
        core.update_instrument(test_instrument(0));
        let mut pattern = Pattern::with_tempo(0, "", 240, 4, 8);
        for track in 0..4 {
            pattern.set_cell(0, track, Some(Cell::note(inst_id(0), 48 + track * 7, 255)));
        }
        core.set_pattern(pattern);
        core.play();

        for frame in core.render_frames(SR as usize) {
            assert!(frame[0].abs() <= 4.0 && frame[1].abs() <= 4.0, "runaway output");
            assert!(frame[0].is_finite() && frame[1].is_finite());
        }
    }

    #[test]
    fn stop_lets_voices_ring_out_then_silence() {
        let mut core = EngineCore::new(SR);
        core.update_instrument(test_instrument(0));
        let mut pattern = Pattern::with_tempo(0, "", 120, 1, 4);
        pattern.set_cell(0, 0, Some(Cell::note(inst_id(0), 60, 255)));
        core.set_pattern(pattern);
        core.play();
        let _ = core.render_frames(4410); // 100 ms in
        core.stop();

        assert!(!core.is_playing());
        // Release is 50 ms; after 200 ms everything is torn down
        let _ = core.render_frames(SR as usize / 5);
        assert_eq!(core.node(inst_id(0)).unwrap().active_voices(), 0);
        let tail = core.render_frames(4410);
        assert_eq!(max_amplitude(&tail), 0.0);
    }

    #[test]
    fn master_volume_scales_output() {
        let render_level = |volume: f32| {
            let mut core = EngineCore::new(SR);
            core.update_instrument(test_instrument(0));
            let mut pattern = Pattern::with_tempo(0, "", 120, 1, 4);
            pattern.set_cell(0, 0, Some(Cell::note(inst_id(0), 60, 255)));
            core.set_pattern(pattern);
            core.set_master_volume(volume);
            core.play();
            let _ = core.render_frames(4410); // let smoothing settle
            max_amplitude(&core.render_frames(4410))
        };

        let full = render_level(1.0);
        let half = render_level(0.5);
        assert!(full > 0.0);
        assert!((half / full - 0.5).abs() < 0.05, "ratio {}", half / full);
    }

    #[test]
    fn play_and_row_events_flow() {
        let mut core = EngineCore::new(SR);
        core.set_pattern(Pattern::with_tempo(0, "", 120, 1, 4));
        core.play();
        let _ = core.render_frames(SR as usize / 4);

        let mut events = Vec::new();
        while let Some(event) = core.pop_event() {
            events.push(event);
        }
        assert_eq!(events[0], EngineEvent::PlayStart);
        assert!(events.iter().any(|e| matches!(e, EngineEvent::RowChange { row: 1 })));
    }

    #[test]
    fn reset_clears_nodes() {
        let mut core = EngineCore::new(SR);
        core.update_instrument(test_instrument(0));
        core.reset();
        assert!(core.node(inst_id(0)).is_none());
    }

    #[test]
    fn commands_route_to_methods() {
        let mut core = EngineCore::new(SR);
        core.apply(Command::UpdateInstrument(Box::new(test_instrument(3))));
        assert!(core.node(inst_id(3)).is_some());
        core.apply(Command::SetPattern(Box::new(Pattern::with_tempo(0, "", 120, 1, 4))));
        core.apply(Command::Play);
        assert!(core.is_playing());
        core.apply(Command::Stop);
        assert!(!core.is_playing());
    }
}
