//! # Biquad High-Cut / Low-Cut Filter
//!
//! A biquad is a two-pole, two-zero IIR filter section. It rolls off at
//! 12 dB/octave, twice as steep as a one-pole filter, and its resonance
//! around the cutoff is set by the quality factor `Q`.
//!
//! The delay uses it at four sites, each with its own instance per channel:
//! a low cut and a high cut on the incoming signal, and a low cut and a high
//! cut on the feedback tap.
//!
//! ## The Difference Equation
//!
//! Both variants share one equation and differ only in their numerator
//! coefficients:
//!
//! ```text
//! y[n] = (b0/a0)·x[n] + (b1/a0)·x[n-1] + (b2/a0)·x[n-2]
//!                     - (a1/a0)·y[n-1] - (a2/a0)·y[n-2]
//!
//! w0    = 2π · f / rate
//! alpha = sin(w0) / (2Q)
//! a0 = 1 + alpha,   a1 = -2·cos(w0),   a2 = 1 - alpha
//!
//! high cut:  b0 = b2 = (1 - cos w0) / 2,   b1 =   1 - cos w0
//! low cut:   b0 = b2 = (1 + cos w0) / 2,   b1 = -(1 + cos w0)
//! ```
//!
//! ## Warm-Up
//!
//! For the first three samples after a reset the filter only fills its
//! history (the raw input goes into both the input and output history) and
//! returns silence. Output starts on the fourth sample.

use std::f32::consts::PI;

/// Lowest accepted quality factor. `Q <= 0` is replaced by this.
pub const MIN_Q: f32 = 0.001;

/// Highest accepted quality factor. Above this the response peaks hard
/// enough to run away inside the feedback loop.
pub const MAX_Q: f32 = 1.4;

/// Lowest accepted cutoff in Hz.
const MIN_FREQUENCY: f32 = 1.0;

/// Number of calls that only fill the history.
const WARM_UP_SAMPLES: u8 = 3;

/// Which coefficient formula a [`Biquad`] uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterKind {
    /// Low-pass: removes content above the cutoff.
    HighCut,
    /// High-pass: removes content below the cutoff.
    LowCut,
}

/// A two-pole filter with cached coefficients.
///
/// The cutoff, `Q` and sample rate are passed on every call so that the
/// caller can feed live parameter values. The trigonometry only runs when
/// one of them differs from the previous call.
#[derive(Debug, Clone)]
pub struct Biquad {
    kind: FilterKind,

    // Raw inputs the coefficients were computed for. NaN forces the first
    // call to compute.
    rate: f32,
    frequency: f32,
    q: f32,

    /// `q` after clamping into `[MIN_Q, MAX_Q]`.
    effective_q: f32,

    // Coefficients, already divided by a0.
    b0: f32,
    b1: f32,
    b2: f32,
    a1: f32,
    a2: f32,

    /// `x[n]`, `x[n-1]`, `x[n-2]`
    input_history: [f32; 3],
    /// `y[n]`, `y[n-1]`, `y[n-2]`
    output_history: [f32; 3],
    fill_count: u8,
}

impl Biquad {
    pub fn new(kind: FilterKind) -> Self {
        Self {
            kind,
            rate: f32::NAN,
            frequency: f32::NAN,
            q: f32::NAN,
            effective_q: MIN_Q,
            b0: 0.0,
            b1: 0.0,
            b2: 0.0,
            a1: 0.0,
            a2: 0.0,
            input_history: [0.0; 3],
            output_history: [0.0; 3],
            fill_count: 0,
        }
    }

    /// A low-pass instance.
    pub fn high_cut() -> Self {
        Self::new(FilterKind::HighCut)
    }

    /// A high-pass instance.
    pub fn low_cut() -> Self {
        Self::new(FilterKind::LowCut)
    }

    pub fn kind(&self) -> FilterKind {
        self.kind
    }

    /// Process one sample.
    ///
    /// # Arguments
    /// * `input` - The sample to filter.
    /// * `frequency` - Cutoff in Hz, clamped into `[1, 0.49 · rate]`.
    /// * `q` - Quality factor, clamped into `[MIN_Q, MAX_Q]`.
    /// * `sample_rate` - Current sample rate in Hz.
    pub fn process(&mut self, input: f32, frequency: f32, q: f32, sample_rate: f32) -> f32 {
        if frequency != self.frequency || q != self.q || sample_rate != self.rate {
            self.update_coefficients(frequency, q, sample_rate);
        }

        // Roll the histories by one sample.
        self.input_history[2] = self.input_history[1];
        self.input_history[1] = self.input_history[0];
        self.input_history[0] = input;

        self.output_history[2] = self.output_history[1];
        self.output_history[1] = self.output_history[0];

        if self.fill_count < WARM_UP_SAMPLES {
            self.output_history[0] = input;
            self.fill_count += 1;
            return 0.0;
        }

        let [x0, x1, x2] = self.input_history;
        let [_, y1, y2] = self.output_history;
        let output = self.b0 * x0 + self.b1 * x1 + self.b2 * x2 - self.a1 * y1 - self.a2 * y2;
        self.output_history[0] = output;
        output
    }

    /// Clear the history and restart the warm-up.
    pub fn reset(&mut self) {
        self.input_history = [0.0; 3];
        self.output_history = [0.0; 3];
        self.fill_count = 0;
        self.rate = f32::NAN;
        self.frequency = f32::NAN;
        self.q = f32::NAN;
    }

    fn update_coefficients(&mut self, frequency: f32, q: f32, sample_rate: f32) {
        self.frequency = frequency;
        self.q = q;
        self.rate = sample_rate;
        self.effective_q = clamp_q(q);

        // `max` before `min` so a NaN cutoff lands on the lower bound.
        let frequency = frequency.max(MIN_FREQUENCY).min(sample_rate * 0.49);
        let w0 = 2.0 * PI * frequency / sample_rate;
        let cos_w0 = w0.cos();
        let alpha = w0.sin() / (2.0 * self.effective_q);

        let a0 = 1.0 + alpha;
        let a1 = -2.0 * cos_w0;
        let a2 = 1.0 - alpha;
        let (b0, b1, b2) = match self.kind {
            FilterKind::HighCut => {
                let b = (1.0 - cos_w0) / 2.0;
                (b, 1.0 - cos_w0, b)
            }
            FilterKind::LowCut => {
                let b = (1.0 + cos_w0) / 2.0;
                (b, -(1.0 + cos_w0), b)
            }
        };

        self.b0 = b0 / a0;
        self.b1 = b1 / a0;
        self.b2 = b2 / a0;
        self.a1 = a1 / a0;
        self.a2 = a2 / a0;
    }
}

/// Clamp a quality factor into `[MIN_Q, MAX_Q]`. Zero, negative and NaN
/// values all become `MIN_Q`.
pub fn clamp_q(q: f32) -> f32 {
    if q > 0.0 {
        q.min(MAX_Q)
    } else {
        MIN_Q
    }
}
