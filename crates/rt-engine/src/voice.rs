//! Voice: one polyphonic slot with its full DSP chain.
//!
//! Chain: source -> biquad -> envelope gain -> pan, summed into the
//! instrument's output. Amplitude and filter-envelope motion live in
//! automation timelines; the voice samples them as it renders.

use rt_ir::FilterKind;

use crate::automation::ParamTimeline;
use crate::biquad::Biquad;
use crate::source::VoiceSource;

/// Per-block render parameters handed down from the instrument node
/// (base values plus LFO modulation, already combined).
#[derive(Clone, Copy, Debug)]
pub struct VoiceRenderParams {
    pub filter_kind: FilterKind,
    /// Base cutoff in Hz including LFO modulation.
    pub cutoff_hz: f32,
    pub q: f32,
    /// Filter-envelope modulation range in Hz (envelope_amount x 10 kHz).
    pub env_range_hz: f32,
    /// Effective source detune in cents.
    pub detune_cents: f32,
    /// Stereo position -1..1.
    pub pan: f32,
    /// Instrument output level multiplier (volume-LFO modulated).
    pub level: f32,
}

/// One voice of an instrument's pool.
#[derive(Clone, Debug)]
pub struct Voice {
    pub(crate) source: Option<VoiceSource>,
    /// Amplitude automation; peaks at velocity x instrument volume.
    pub(crate) gain: ParamTimeline,
    pub(crate) filter: Biquad,
    /// Filter-envelope automation, 0..1.
    pub(crate) filter_env: ParamTimeline,
    pub(crate) midi_note: Option<u8>,
    pub(crate) start_time: f64,
    /// Attack completes at this time; stealing avoids voices before it.
    pub(crate) attack_until: f64,
    /// Deferred source teardown; cleared when the voice is repurposed.
    pub(crate) stop_at: Option<f64>,
    pub(crate) active: bool,
}

impl Voice {
    pub fn new(sample_rate: f32) -> Self {
        Self {
            source: None,
            gain: ParamTimeline::new(0.0),
            filter: Biquad::new(FilterKind::Lowpass, 20_000.0, 1.0, sample_rate),
            filter_env: ParamTimeline::new(0.0),
            midi_note: None,
            start_time: 0.0,
            attack_until: 0.0,
            stop_at: None,
            active: false,
        }
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn midi_note(&self) -> Option<u8> {
        self.midi_note
    }

    /// Silence immediately: cancel all automation, drop the source.
    /// Used for stealing and immediate note-off.
    pub(crate) fn silence_now(&mut self) {
        self.gain.clear_to(0.0);
        self.filter_env.clear_to(0.0);
        self.source = None;
        self.midi_note = None;
        self.stop_at = None;
        self.active = false;
    }

    fn deactivate(&mut self) {
        self.source = None;
        self.midi_note = None;
        self.stop_at = None;
        self.active = false;
    }

    /// Render one block, mixing into `out` (interleaved stereo).
    pub(crate) fn render(
        &mut self,
        out: &mut [f32],
        block_start: f64,
        sample_rate: f64,
        params: &VoiceRenderParams,
    ) {
        if !self.active {
            return;
        }
        let Some(source) = self.source.as_mut() else {
            return;
        };

        let frames = out.len() / 2;
        let dt = 1.0 / sample_rate;

        // Sample-accurate start inside the block
        let skip = if self.start_time > block_start {
            let ahead = ((self.start_time - block_start) * sample_rate).ceil() as usize;
            if ahead >= frames {
                return;
            }
            ahead
        } else {
            0
        };

        // Filter and pan move at block rate; the envelope gain per sample.
        let cutoff = params.cutoff_hz + self.filter_env.value_at(block_start) * params.env_range_hz;
        self.filter.set_params(params.filter_kind, cutoff, params.q);

        let angle = (params.pan.clamp(-1.0, 1.0) + 1.0) * std::f32::consts::FRAC_PI_4;
        let (pan_l, pan_r) = (angle.cos(), angle.sin());

        source.set_detune(params.detune_cents);

        let mut stopped = false;
        for i in skip..frames {
            let t = block_start + i as f64 * dt;
            if self.stop_at.is_some_and(|stop| t >= stop) {
                stopped = true;
                break;
            }
            let dry = source.next_sample();
            let filtered = self.filter.process(dry);
            let v = filtered * self.gain.value_at(t) * params.level;
            out[i * 2] += v * pan_l;
            out[i * 2 + 1] += v * pan_r;
        }

        if stopped || self.source.as_ref().is_some_and(|s| s.is_finished()) {
            self.deactivate();
        }
    }
}
