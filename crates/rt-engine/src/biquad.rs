//! Per-voice biquad filter.
//!
//! Direct Form II Transposed; coefficient formulas from the Audio EQ
//! Cookbook, matching the response of the lowpass/highpass modes the
//! instrument filter exposes.

use std::f32::consts::PI;

use rt_ir::FilterKind;

/// A second-order IIR filter.
#[derive(Clone, Debug)]
pub struct Biquad {
    kind: FilterKind,
    frequency: f32,
    q: f32,
    sample_rate: f32,

    b0: f32,
    b1: f32,
    b2: f32,
    a1: f32,
    a2: f32,

    z1: f32,
    z2: f32,
}

impl Biquad {
    pub fn new(kind: FilterKind, frequency: f32, q: f32, sample_rate: f32) -> Self {
        let mut filter = Self {
            kind,
            frequency,
            q,
            sample_rate,
            b0: 1.0,
            b1: 0.0,
            b2: 0.0,
            a1: 0.0,
            a2: 0.0,
            z1: 0.0,
            z2: 0.0,
        };
        filter.update_coefficients();
        filter
    }

    /// Retune the filter; coefficients are only recomputed when a
    /// parameter actually changed.
    pub fn set_params(&mut self, kind: FilterKind, frequency: f32, q: f32) {
        let frequency = frequency.clamp(10.0, self.sample_rate * 0.49);
        let q = q.clamp(0.05, 30.0);
        if kind == self.kind && frequency == self.frequency && q == self.q {
            return;
        }
        self.kind = kind;
        self.frequency = frequency;
        self.q = q;
        self.update_coefficients();
    }

    fn update_coefficients(&mut self) {
        let w0 = 2.0 * PI * self.frequency / self.sample_rate;
        let cos_w0 = w0.cos();
        let sin_w0 = w0.sin();
        let alpha = sin_w0 / (2.0 * self.q);

        let (b0, b1, b2) = match self.kind {
            FilterKind::Lowpass => {
                let b1 = 1.0 - cos_w0;
                (b1 / 2.0, b1, b1 / 2.0)
            }
            FilterKind::Highpass => {
                let b0 = (1.0 + cos_w0) / 2.0;
                (b0, -(1.0 + cos_w0), b0)
            }
        };
        let a0 = 1.0 + alpha;
        let a1 = -2.0 * cos_w0;
        let a2 = 1.0 - alpha;

        self.b0 = b0 / a0;
        self.b1 = b1 / a0;
        self.b2 = b2 / a0;
        self.a1 = a1 / a0;
        self.a2 = a2 / a0;
    }

    /// Process one sample.
    pub fn process(&mut self, input: f32) -> f32 {
        let output = self.b0 * input + self.z1;
        self.z1 = self.b1 * input - self.a1 * output + self.z2;
        self.z2 = self.b2 * input - self.a2 * output;
        output
    }

    /// Clear filter state (on voice reuse).
    pub fn reset(&mut self) {
        self.z1 = 0.0;
        self.z2 = 0.0;
    }
}
