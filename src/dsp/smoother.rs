//! # One-Pole Parameter Smoother
//!
//! When a user moves a knob the raw value jumps. Applied directly to the
//! audio, the jump is a discontinuity that sounds like a click or "zipper
//! noise". Every continuous control therefore goes through an exponential
//! ramp, evaluated once per sample:
//!
//! ```text
//! current = target · k + current · (1 - k)
//! ```
//!
//! After `n` samples at a fixed target `T` this gives
//! `current_n = T - (T - current_0) · (1 - k)^n`, so the remaining distance
//! shrinks by the same factor every sample and never overshoots.
//!
//! The mapping from a raw control value to a target (decibels, percent) is
//! only evaluated when the raw value changes.

/// Smoothing constant for gain-like controls: dry, wet, buffer input,
/// feedback, crossfeed.
pub const GAIN_SMOOTHING: f32 = 0.01;

/// Smoothing constant for delay time. Fast delay-time changes are heard as
/// pitch shifts, so this one is ten times slower than the gains.
pub const DELAY_SMOOTHING: f32 = 0.001;

/// Above this many dB, gains clamp to [`MAX_GAIN`].
pub const MAX_GAIN_DB: f32 = 12.0;

/// Below this many dB, gains are treated as silence.
pub const MIN_GAIN_DB: f32 = -96.0;

/// `10^(12/20)`, the linear gain at [`MAX_GAIN_DB`].
pub const MAX_GAIN: f32 = 3.981_071_7;

/// Remaining distances below this snap onto the target. Keeps decaying
/// values from lingering in the denormal range.
const SNAP_DISTANCE: f32 = 1e-9;

/// A value that glides toward its target.
#[derive(Debug, Clone)]
pub struct Smoother {
    current: f32,
    target: f32,
    coefficient: f32,

    /// The raw control value `target` was derived from. NaN until the first
    /// [`follow()`](Self::follow) so that call always recomputes.
    raw: f32,
}

impl Smoother {
    /// A smoother resting at `value`.
    pub fn new(value: f32, coefficient: f32) -> Self {
        Self {
            current: value,
            target: value,
            coefficient: coefficient.clamp(0.0, 1.0),
            raw: f32::NAN,
        }
    }

    pub fn current(&self) -> f32 {
        self.current
    }

    pub fn target(&self) -> f32 {
        self.target
    }

    pub fn set_target(&mut self, target: f32) {
        self.target = target;
    }

    /// Set the target from a raw control value through `law`, but only if
    /// the raw value differs from the last one seen.
    pub fn follow(&mut self, raw: f32, law: impl Fn(f32) -> f32) {
        if raw != self.raw {
            self.raw = raw;
            self.target = law(raw);
        }
    }

    /// Jump straight to `value` with no ramp. Only for moments when the
    /// signal path is silent anyway.
    pub fn reset_to(&mut self, value: f32) {
        self.current = value;
        self.target = value;
        self.raw = f32::NAN;
    }

    /// Advance one sample and return the new current value.
    #[inline]
    pub fn next(&mut self) -> f32 {
        let distance = self.target - self.current;
        if distance.abs() < SNAP_DISTANCE {
            self.current = self.target;
        } else {
            self.current += distance * self.coefficient;
        }
        self.current
    }
}

/// Convert decibels to a linear gain.
///
/// Above +12 dB the gain stays at the +12 dB ceiling, below -96 dB it is 0.
pub fn db_to_gain(db: f32) -> f32 {
    if db > MAX_GAIN_DB {
        MAX_GAIN
    } else if db < MIN_GAIN_DB || db.is_nan() {
        0.0
    } else {
        10.0_f32.powf(db / 20.0)
    }
}

/// Convert a 0-100 percentage to a 0.0-1.0 factor. Anything above 99 is
/// treated as 100.
pub fn percent_to_gain(percent: f32) -> f32 {
    if percent > 99.0 {
        1.0
    } else if percent > 0.0 {
        percent / 100.0
    } else {
        0.0
    }
}

/// Alternate feedback law: 100 % is unity and every percent below it
/// takes away 0.4 dB, so 50 % is -20 dB.
pub fn percent_to_gain_db_law(percent: f32) -> f32 {
    if percent >= 100.0 {
        1.0
    } else if percent > 0.0 {
        10.0_f32.powf((percent - 100.0) * 0.02)
    } else {
        0.0
    }
}

/// How feedback and crossfeed percentages map onto a gain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FeedbackLaw {
    /// Percent maps linearly onto the gain.
    #[default]
    Linear,
    /// Percent maps onto a decibel scale. Quieter tails at the same knob
    /// position.
    Decibel,
}

impl FeedbackLaw {
    pub fn gain(self, percent: f32) -> f32 {
        match self {
            FeedbackLaw::Linear => percent_to_gain(percent),
            FeedbackLaw::Decibel => percent_to_gain_db_law(percent),
        }
    }
}

/// Number of samples for a smoother with coefficient `k` to cover all but
/// `tolerance` of the distance to its target.
pub fn settle_samples(coefficient: f32, tolerance: f32) -> usize {
    if coefficient >= 1.0 {
        return 1;
    }
    (tolerance.ln() / (1.0 - coefficient).ln()).ceil() as usize
}
