//! CPAL-based audio output.

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Stream, StreamConfig};
use ringbuf::traits::{Consumer, Producer, Split};
use ringbuf::{HeapProd, HeapRb};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::traits::{AudioError, AudioOutput, StereoFrame};

/// Ring buffer depth in seconds. Also bounds how far ahead of the device
/// the engine thread can run before `write_spin` parks it.
const RING_SECONDS: f64 = 0.1;

/// Audio output through the default CPAL device.
///
/// The device callback pops frames from a lock-free ring; the engine
/// thread fills it through [`AudioOutput::write_spin`].
pub struct CpalOutput {
    config: StreamConfig,
    stream: Stream,
    producer: HeapProd<StereoFrame>,
    running: Arc<AtomicBool>,
}

impl CpalOutput {
    /// Open the default output device and build the stream (initially
    /// silent until [`AudioOutput::start`]).
    pub fn open() -> Result<Self, AudioError> {
        let host = cpal::default_host();
        let device = host.default_output_device().ok_or(AudioError::NoDevice)?;

        let config = device
            .default_output_config()
            .map_err(|e| AudioError::DeviceInit(e.to_string()))?;
        let mut config: StreamConfig = config.into();
        // The callback below writes stereo pairs
        config.channels = 2;

        let capacity = (config.sample_rate.0 as f64 * RING_SECONDS) as usize;
        let (producer, mut consumer) = HeapRb::<StereoFrame>::new(capacity.max(256)).split();

        let running = Arc::new(AtomicBool::new(false));
        let running_cb = running.clone();
        let channels = config.channels as usize;

        let stream = device
            .build_output_stream(
                &config,
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                    if !running_cb.load(Ordering::Relaxed) {
                        data.fill(0.0);
                        return;
                    }
                    for chunk in data.chunks_mut(channels) {
                        let frame = consumer.try_pop().unwrap_or([0.0, 0.0]);
                        for (i, sample) in chunk.iter_mut().enumerate() {
                            *sample = match i {
                                0 => frame[0],
                                1 => frame[1],
                                _ => 0.0,
                            };
                        }
                    }
                },
                |err| eprintln!("audio stream error: {}", err),
                None,
            )
            .map_err(|e| AudioError::StreamCreate(e.to_string()))?;

        stream.play().map_err(|e| AudioError::Playback(e.to_string()))?;

        Ok(Self { config, stream, producer, running })
    }
}

impl AudioOutput for CpalOutput {
    fn sample_rate(&self) -> u32 {
        self.config.sample_rate.0
    }

    fn write_spin(&mut self, frame: StereoFrame) {
        while self.producer.try_push(frame).is_err() {
            std::hint::spin_loop();
        }
    }

    fn start(&mut self) -> Result<(), AudioError> {
        self.running.store(true, Ordering::Relaxed);
        self.stream.play().map_err(|e| AudioError::Playback(e.to_string()))
    }

    fn stop(&mut self) -> Result<(), AudioError> {
        self.running.store(false, Ordering::Relaxed);
        self.stream.pause().map_err(|e| AudioError::Playback(e.to_string()))
    }
}
