//! rowtone CLI — headless project playback and WAV export.
//!
//! Usage:
//!   rowtone-cli path/to/project.json
//!   rowtone-cli path/to/project.json --wav output.wav
//!   rowtone-cli path/to/project.json --wav output.wav --seconds 30

use std::io::Write as _;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::{env, fs};

use anyhow::{bail, Context, Result};

use rt_codec::project_from_json;
use rt_engine::{AudioEngine, EngineCore, EngineEvent, Topic};
use rt_ir::Project;

fn main() -> Result<()> {
    tracing_subscriber::fmt().with_writer(std::io::stderr).init();

    let args: Vec<String> = env::args().collect();
    let Some(path) = args.get(1) else {
        bail!("usage: rowtone-cli <project.json> [--wav output.wav] [--seconds N]");
    };

    let wav_path = args
        .iter()
        .position(|a| a == "--wav")
        .and_then(|i| args.get(i + 1))
        .cloned();
    let seconds: u32 = args
        .iter()
        .position(|a| a == "--seconds")
        .and_then(|i| args.get(i + 1))
        .map(|s| s.parse())
        .transpose()
        .context("--seconds requires a number")?
        .unwrap_or(20);

    let json = fs::read_to_string(path).with_context(|| format!("reading {}", path))?;
    let project = project_from_json(&json).with_context(|| format!("parsing {}", path))?;

    println!("Project:     {}", project.name);
    println!("Instruments: {}", project.instruments.len());
    println!("Patterns:    {}", project.patterns.len());
    println!("Sequences:   {}", project.song.len());
    let samples = project.sample_data.len();
    if samples > 0 {
        println!("Samples:     {}", samples);
    }
    println!();

    match wav_path {
        Some(wav) => render_to_wav(&project, &wav, seconds),
        None => play_live(project, seconds),
    }
}

fn play_live(project: Project, seconds: u32) -> Result<()> {
    let mut engine = AudioEngine::new();
    engine.init_audio().context("initializing audio")?;
    engine.load_project(project)?;

    let row = Arc::new(AtomicU32::new(0));
    let row_cb = row.clone();
    engine.on(
        Topic::RowChange,
        Box::new(move |event| {
            if let EngineEvent::RowChange { row } = event {
                row_cb.store(*row as u32, Ordering::Relaxed);
            }
        }),
    );

    engine.play();
    println!("Playing for {} s...", seconds);
    let started = std::time::Instant::now();
    while started.elapsed().as_secs() < seconds as u64 {
        engine.pump_events();
        print!("\rRow: {:02}", row.load(Ordering::Relaxed));
        let _ = std::io::stdout().flush();
        std::thread::sleep(std::time::Duration::from_millis(25));
    }
    engine.stop();
    println!("\rDone.    ");
    Ok(())
}

fn render_to_wav(project: &Project, path: &str, seconds: u32) -> Result<()> {
    const SAMPLE_RATE: u32 = 44100;
    println!("Rendering {} s to {}...", seconds, path);

    let mut core = EngineCore::new(SAMPLE_RATE);
    for instrument in &project.instruments {
        core.update_instrument(instrument.clone());
    }
    for (id, bytes) in &project.sample_data {
        let buffer = rt_codec::decode_sample(bytes).context("decoding embedded sample")?;
        core.set_sample_buffer(*id, Arc::new(buffer));
    }
    for pattern in &project.patterns {
        core.update_pattern(pattern.clone());
    }
    if project.song.is_empty() {
        let Some(first) = project.patterns.first() else {
            bail!("project has no patterns to render");
        };
        core.set_pattern(first.clone());
    } else {
        core.set_song(project.song.clone());
    }
    core.play();

    let frames = core.render_frames((SAMPLE_RATE * seconds) as usize);
    let mut channels = vec![Vec::with_capacity(frames.len()); 2];
    for frame in &frames {
        channels[0].push(frame[0]);
        channels[1].push(frame[1]);
    }
    let wav = rt_codec::encode_sample(&rt_ir::SampleBuffer::new(channels, SAMPLE_RATE));
    println!("Rendered {} bytes", wav.len());

    fs::write(path, &wav).with_context(|| format!("writing {}", path))?;
    println!("Done.");
    Ok(())
}
