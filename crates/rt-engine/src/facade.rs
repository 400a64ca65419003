//! The audio engine facade.
//!
//! `AudioEngine` is the control-side surface the editor talks to. It owns
//! the shadow instrument registry and sample store, decodes samples,
//! coordinates project loads, and fans engine events out to subscribers.
//! The DSP side (`EngineCore`) lives on a playback thread behind a pair
//! of lock-free rings; until `init_audio` succeeds, mutations that need
//! the audio graph are silently ignored.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc};
use std::thread::JoinHandle;

use ringbuf::traits::{Consumer, Producer, Split};
use ringbuf::{HeapCons, HeapProd, HeapRb};
use tracing::debug;

use rt_audio::{AudioError, AudioOutput, CpalOutput};
use rt_codec::decode_sample;
use rt_ir::{Instrument, InstrumentId, Pattern, Project, SampleBuffer, Song};

use crate::command::Command;
use crate::engine::{EngineCore, BLOCK_FRAMES};
use crate::error::EngineError;
use crate::events::{EngineEvent, EventBus, SubscriptionId, Topic};

const COMMAND_CAPACITY: usize = 256;
const EVENT_CAPACITY: usize = 1024;

struct AudioLink {
    commands: HeapProd<Command>,
    events: HeapCons<EngineEvent>,
    stop_flag: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

/// Control-side engine facade.
pub struct AudioEngine {
    audio: Option<AudioLink>,
    instruments: HashMap<InstrumentId, Instrument>,
    samples: HashMap<InstrumentId, Arc<SampleBuffer>>,
    bus: EventBus,
    master_volume: f32,
    playing: bool,
}

impl AudioEngine {
    pub fn new() -> Self {
        Self {
            audio: None,
            instruments: HashMap::new(),
            samples: HashMap::new(),
            bus: EventBus::new(),
            master_volume: crate::engine::DEFAULT_MASTER_GAIN,
            playing: false,
        }
    }

    /// Open the audio device and start the playback thread. Call from a
    /// user-gesture entry point; idempotent once initialized. Replays the
    /// control-side registry into the fresh engine.
    pub fn init_audio(&mut self) -> Result<(), EngineError> {
        if self.audio.is_some() {
            return Ok(());
        }

        let (cmd_prod, cmd_cons) = HeapRb::<Command>::new(COMMAND_CAPACITY).split();
        let (ev_prod, ev_cons) = HeapRb::<EngineEvent>::new(EVENT_CAPACITY).split();
        let stop_flag = Arc::new(AtomicBool::new(false));
        let stop = stop_flag.clone();
        let (ready_tx, ready_rx) = mpsc::channel();

        let thread = std::thread::spawn(move || playback_thread(cmd_cons, ev_prod, stop, ready_tx));

        match ready_rx.recv() {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                let _ = thread.join();
                return Err(EngineError::Audio(e));
            }
            Err(_) => {
                let _ = thread.join();
                return Err(EngineError::Audio(AudioError::DeviceInit(
                    "playback thread exited during startup".into(),
                )));
            }
        }

        self.audio = Some(AudioLink {
            commands: cmd_prod,
            events: ev_cons,
            stop_flag,
            thread: Some(thread),
        });

        let instruments: Vec<Instrument> = self.instruments.values().cloned().collect();
        for instrument in instruments {
            self.send(Command::UpdateInstrument(Box::new(instrument)));
        }
        let samples: Vec<(InstrumentId, Arc<SampleBuffer>)> =
            self.samples.iter().map(|(id, buf)| (*id, buf.clone())).collect();
        for (id, buffer) in samples {
            self.send(Command::SetSampleBuffer { instrument: id, buffer });
        }
        let volume = self.master_volume;
        self.send(Command::SetMasterVolume(volume));
        Ok(())
    }

    pub fn is_initialized(&self) -> bool {
        self.audio.is_some()
    }

    fn send(&mut self, command: Command) {
        if let Some(link) = self.audio.as_mut() {
            let _ = link.commands.try_push(command);
        }
    }

    // --- Instruments and samples ---

    /// Store the instrument and forward it to the engine; never
    /// interrupts playback.
    pub fn update_instrument(&mut self, instrument: Instrument) {
        let instrument = instrument.clamped();
        self.instruments.insert(instrument.id, instrument.clone());
        self.send(Command::UpdateInstrument(Box::new(instrument)));
    }

    pub fn instrument(&self, id: InstrumentId) -> Option<&Instrument> {
        self.instruments.get(&id)
    }

    pub fn instruments(&self) -> impl Iterator<Item = &Instrument> {
        self.instruments.values()
    }

    /// Decode file bytes, store the buffer, assign it to the instrument's
    /// node and emit `sampleLoaded`. Decode failures surface to the caller.
    pub fn load_sample(&mut self, id: InstrumentId, bytes: &[u8]) -> Result<(), EngineError> {
        let buffer = Arc::new(decode_sample(bytes)?);
        self.samples.insert(id, buffer.clone());
        self.send(Command::SetSampleBuffer { instrument: id, buffer });
        self.bus.emit(&EngineEvent::SampleLoaded { instrument: id });
        Ok(())
    }

    pub fn sample(&self, id: InstrumentId) -> Option<&Arc<SampleBuffer>> {
        self.samples.get(&id)
    }

    // --- Project ---

    /// Load a project: stop if playing, clear the sample store, decode
    /// embedded samples, rebuild every node, restore playback state, and
    /// emit `projectLoaded`.
    pub fn load_project(&mut self, project: Project) -> Result<(), EngineError> {
        let was_playing = self.playing;
        if was_playing {
            self.stop();
        }

        self.instruments.clear();
        self.samples.clear();
        self.send(Command::Reset);

        for instrument in &project.instruments {
            self.update_instrument(instrument.clone());
        }
        for (id, bytes) in &project.sample_data {
            let buffer = Arc::new(decode_sample(bytes)?);
            self.samples.insert(*id, buffer.clone());
            self.send(Command::SetSampleBuffer { instrument: *id, buffer });
        }
        for pattern in &project.patterns {
            self.send(Command::UpdatePattern(Box::new(pattern.clone())));
        }
        self.send(Command::SetSong(project.song.clone()));

        if was_playing {
            self.play();
        }
        debug!(name = %project.name, instruments = project.instruments.len(), "project loaded");
        self.bus.emit(&EngineEvent::ProjectLoaded);
        Ok(())
    }

    // --- Transport forwarders ---

    pub fn set_volume(&mut self, volume: f32) {
        self.master_volume = volume.clamp(0.0, 1.0);
        let volume = self.master_volume;
        self.send(Command::SetMasterVolume(volume));
    }

    pub fn play(&mut self) {
        self.playing = true;
        self.send(Command::Play);
    }

    pub fn stop(&mut self) {
        self.playing = false;
        self.send(Command::Stop);
    }

    pub fn seek(&mut self, row: u16) {
        self.send(Command::Seek(row));
    }

    pub fn set_pattern(&mut self, pattern: Pattern) {
        self.send(Command::SetPattern(Box::new(pattern)));
    }

    pub fn update_pattern(&mut self, pattern: Pattern) {
        self.send(Command::UpdatePattern(Box::new(pattern)));
    }

    pub fn set_song(&mut self, song: Song) {
        self.send(Command::SetSong(song));
    }

    // --- Events ---

    pub fn on(&mut self, topic: Topic, callback: Box<dyn FnMut(&EngineEvent) + Send>) -> SubscriptionId {
        self.bus.on(topic, callback)
    }

    pub fn off(&mut self, topic: Topic, id: SubscriptionId) -> bool {
        self.bus.off(topic, id)
    }

    /// Drain engine events and deliver them to subscribers. Call from the
    /// host's update loop; handlers must not reenter mutating operations.
    pub fn pump_events(&mut self) {
        let Some(link) = self.audio.as_mut() else {
            return;
        };
        while let Some(event) = link.events.try_pop() {
            self.bus.emit(&event);
        }
    }
}

impl Default for AudioEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for AudioEngine {
    fn drop(&mut self) {
        if let Some(mut link) = self.audio.take() {
            link.stop_flag.store(true, Ordering::Relaxed);
            if let Some(thread) = link.thread.take() {
                let _ = thread.join();
            }
        }
    }
}

/// Body of the playback thread: opens the device, then loops applying
/// commands, rendering blocks, and forwarding engine events. The spinning
/// frame writer paces the loop to real time, so commands are seen well
/// inside the scheduler's lookahead interval.
fn playback_thread(
    mut commands: HeapCons<Command>,
    mut events: HeapProd<EngineEvent>,
    stop: Arc<AtomicBool>,
    ready: mpsc::Sender<Result<(), AudioError>>,
) {
    let mut output = match CpalOutput::open() {
        Ok(output) => output,
        Err(e) => {
            let _ = ready.send(Err(e));
            return;
        }
    };
    if let Err(e) = output.start() {
        let _ = ready.send(Err(e));
        return;
    }
    let _ = ready.send(Ok(()));

    let mut core = EngineCore::new(output.sample_rate());
    let mut block = vec![0.0f32; BLOCK_FRAMES * 2];

    while !stop.load(Ordering::Relaxed) {
        while let Some(command) = commands.try_pop() {
            core.apply(command);
        }
        core.render(&mut block);
        for frame in block.chunks_exact(2) {
            output.write_spin([frame[0], frame[1]]);
        }
        while let Some(event) = core.pop_event() {
            let _ = events.try_push(event);
        }
    }
    let _ = output.stop();
}

#[cfg(test)]
mod tests {
    use super::*;
    use rt_codec::encode_sample;

    fn inst_id(raw: u8) -> InstrumentId {
        InstrumentId::new(raw).unwrap()
    }

    #[test]
    fn uninitialized_engine_ignores_graph_mutations() {
        let mut engine = AudioEngine::new();
        assert!(!engine.is_initialized());
        // None of these may panic or block without a device
        engine.play();
        engine.set_volume(0.5);
        engine.seek(3);
        engine.stop();
        engine.pump_events();
    }

    #[test]
    fn shadow_registry_works_without_audio() {
        let mut engine = AudioEngine::new();
        let inst = Instrument::new(inst_id(2), "keys");
        engine.update_instrument(inst.clone());
        assert_eq!(engine.instrument(inst_id(2)), Some(&inst));
        assert_eq!(engine.instruments().count(), 1);
    }

    #[test]
    fn load_sample_decodes_and_stores() {
        let mut engine = AudioEngine::new();
        let wav = encode_sample(&SampleBuffer::mono(vec![0.1, -0.1, 0.2], 44100));
        engine.load_sample(inst_id(0), &wav).unwrap();
        assert_eq!(engine.sample(inst_id(0)).unwrap().len(), 3);
    }

    #[test]
    fn load_sample_surfaces_decode_errors() {
        let mut engine = AudioEngine::new();
        let result = engine.load_sample(inst_id(0), b"garbage");
        assert!(matches!(result, Err(EngineError::Decode(_))));
        assert!(engine.sample(inst_id(0)).is_none());
    }

    #[test]
    fn sample_loaded_event_fires_synchronously() {
        use std::sync::atomic::AtomicUsize;
        let mut engine = AudioEngine::new();
        let count = Arc::new(AtomicUsize::new(0));
        let cb_count = count.clone();
        engine.on(Topic::SampleLoaded, Box::new(move |_| {
            cb_count.fetch_add(1, Ordering::SeqCst);
        }));

        let wav = encode_sample(&SampleBuffer::mono(vec![0.0; 8], 44100));
        engine.load_sample(inst_id(1), &wav).unwrap();
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn load_project_replaces_registry_and_emits() {
        use std::sync::atomic::AtomicUsize;
        let mut engine = AudioEngine::new();
        engine.update_instrument(Instrument::new(inst_id(9), "stale"));

        let count = Arc::new(AtomicUsize::new(0));
        let cb_count = count.clone();
        engine.on(Topic::ProjectLoaded, Box::new(move |_| {
            cb_count.fetch_add(1, Ordering::SeqCst);
        }));

        let mut project = Project::new("p");
        project.instruments.push(Instrument::new(inst_id(1), "bass"));
        project
            .sample_data
            .insert(inst_id(1), encode_sample(&SampleBuffer::mono(vec![0.5; 4], 22050)));
        engine.load_project(project).unwrap();

        assert!(engine.instrument(inst_id(9)).is_none(), "old registry cleared");
        assert!(engine.instrument(inst_id(1)).is_some());
        assert_eq!(engine.sample(inst_id(1)).unwrap().sample_rate(), 22050);
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn unsubscribed_callback_stops_firing() {
        use std::sync::atomic::AtomicUsize;
        let mut engine = AudioEngine::new();
        let count = Arc::new(AtomicUsize::new(0));
        let cb_count = count.clone();
        let id = engine.on(Topic::SampleLoaded, Box::new(move |_| {
            cb_count.fetch_add(1, Ordering::SeqCst);
        }));
        assert!(engine.off(Topic::SampleLoaded, id));

        let wav = encode_sample(&SampleBuffer::mono(vec![0.0; 8], 44100));
        engine.load_sample(inst_id(1), &wav).unwrap();
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }
}
