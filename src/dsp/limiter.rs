//! # Peak Limiter
//!
//! Feedback combined with modulation can push a repeat slightly above the
//! level it went in at (interpolation while the read head moves is not
//! perfectly gain-neutral). Over many repeats that grows without bound.
//! The limiter sits on the tap feeding the feedback network and divides
//! anything above unity back down.
//!
//! ```text
//! coeff    = 0.01 ^ (1 / (ms · rate / 1000))
//! envelope = (|x| > envelope ? attack : release) · (envelope - |x|) + |x|
//! y        = envelope > 1 ? x / envelope : x
//! ```

/// Default attack time in milliseconds.
pub const DEFAULT_ATTACK_MS: f32 = 10.0;

/// Default release time in milliseconds.
pub const DEFAULT_RELEASE_MS: f32 = 10.0;

/// Coefficient that lets an exponential envelope cover 99 % of a step in
/// `ms` milliseconds.
pub fn envelope_coefficient(ms: f32, sample_rate: f32) -> f32 {
    let samples = ms * sample_rate / 1000.0;
    if samples <= 0.0 {
        return 0.0;
    }
    0.01_f32.powf(1.0 / samples)
}

/// Peak envelope follower with gain reduction above unity.
#[derive(Debug, Clone)]
pub struct PeakLimiter {
    attack: f32,
    release: f32,
    envelope: f32,
}

impl PeakLimiter {
    pub fn new(attack_ms: f32, release_ms: f32, sample_rate: f32) -> Self {
        Self {
            attack: envelope_coefficient(attack_ms, sample_rate),
            release: envelope_coefficient(release_ms, sample_rate),
            envelope: 0.0,
        }
    }

    pub fn envelope(&self) -> f32 {
        self.envelope
    }

    pub fn reset(&mut self) {
        self.envelope = 0.0;
    }

    #[inline]
    pub fn process(&mut self, sample: f32) -> f32 {
        let level = sample.abs();
        let coefficient = if level > self.envelope {
            self.attack
        } else {
            self.release
        };
        self.envelope = coefficient * (self.envelope - level) + level;

        if self.envelope > 1.0 {
            sample / self.envelope
        } else {
            sample
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RATE: f32 = 44100.0;

    #[test]
    fn test_coefficient() {
        // 10 ms at 44.1 kHz is 441 samples.
        let coefficient = envelope_coefficient(10.0, RATE);
        assert!((coefficient.powf(441.0) - 0.01).abs() < 1e-4);
        assert_eq!(envelope_coefficient(0.0, RATE), 0.0);
    }

    /// Signals below unity pass untouched.
    #[test]
    fn test_passes_quiet_signal() {
        let mut limiter = PeakLimiter::new(DEFAULT_ATTACK_MS, DEFAULT_RELEASE_MS, RATE);

        for i in 0..10000 {
            let input = 0.9 * (i as f32 * 0.05).sin();
            assert_eq!(limiter.process(input), input);
        }
    }

    /// A sustained over-unity signal is within 1 % of unity once one
    /// attack time has passed, and settles on unity after that.
    #[test]
    fn test_limits_loud_signal() {
        let mut limiter = PeakLimiter::new(DEFAULT_ATTACK_MS, DEFAULT_RELEASE_MS, RATE);
        let attack_samples = (DEFAULT_ATTACK_MS * RATE / 1000.0) as usize;

        let mut output = 0.0;
        for i in 0..20000 {
            output = limiter.process(2.0);
            if i >= attack_samples {
                assert!(output <= 1.0 / 0.99 + 1e-4, "Sample {i}: {output}");
            }
        }
        assert!((output - 1.0).abs() < 1e-5, "Settled at {output}");
    }

    /// Negative peaks are limited symmetrically.
    #[test]
    fn test_limits_negative_peaks() {
        let mut limiter = PeakLimiter::new(DEFAULT_ATTACK_MS, DEFAULT_RELEASE_MS, RATE);

        let mut output = 0.0;
        for _ in 0..5000 {
            output = limiter.process(-3.0);
        }
        assert!(output >= -1.0 - 1e-4 && output < 0.0, "Got {output}");
        assert!((output + 1.0).abs() < 1e-4, "Settled at {output}");
    }

    /// After the loud part ends the envelope releases and quiet material
    /// passes untouched again.
    #[test]
    fn test_releases() {
        let mut limiter = PeakLimiter::new(DEFAULT_ATTACK_MS, DEFAULT_RELEASE_MS, RATE);
        for _ in 0..5000 {
            limiter.process(2.0);
        }
        for _ in 0..5000 {
            limiter.process(0.5);
        }
        assert_eq!(limiter.process(0.5), 0.5);
    }
}
