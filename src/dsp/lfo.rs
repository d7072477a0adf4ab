//! # Modulation LFO
//!
//! A slow sine wave that nudges the read head back and forth around its
//! nominal position. Moving the read head changes the playback speed a
//! little, so the repeats wobble in pitch like a chorus or a worn tape.
//!
//! ```text
//! phase  += 2π · rate_hz / sample_rate        (wrapped into [0, 2π))
//! offset  = depth_ms / 1000 · sample_rate · sin(phase)
//! ```
//!
//! With phase inversion on, the right channel gets `-offset`, which
//! spreads the two repeats apart in the stereo field.

use std::f32::consts::TAU;

/// Deepest modulation in milliseconds.
pub const MAX_DEPTH_MS: f32 = 10.0;

/// Slowest modulation rate in Hz.
pub const MIN_RATE_HZ: f32 = 0.05;

/// Fastest modulation rate in Hz.
pub const MAX_RATE_HZ: f32 = 10.0;

/// Sine oscillator producing read-head offsets in samples.
#[derive(Debug, Clone)]
pub struct ModulationLfo {
    phase: f32,
    increment: f32,

    /// Phase inversion currently applied to the right channel.
    invert: bool,
    /// Phase inversion requested by the user. Copied into `invert` at the
    /// next wrap so the right channel never jumps mid-cycle.
    pending_invert: bool,
}

impl ModulationLfo {
    pub fn new() -> Self {
        Self {
            phase: 0.0,
            increment: 0.0,
            invert: false,
            pending_invert: false,
        }
    }

    pub fn reset(&mut self) {
        *self = Self::new();
    }

    pub fn phase(&self) -> f32 {
        self.phase
    }

    pub fn is_inverted(&self) -> bool {
        self.invert
    }

    /// Request phase inversion for the right channel. Takes effect at the
    /// next phase wrap.
    pub fn set_invert(&mut self, invert: bool) {
        self.pending_invert = invert;
    }

    /// Advance one sample and return the `(left, right)` offsets in
    /// samples.
    ///
    /// # Arguments
    /// * `depth_ms` - Peak deviation in milliseconds, see [`clamp_depth()`].
    /// * `rate_hz` - Oscillator frequency, see [`clamp_rate()`].
    /// * `sample_rate` - Current sample rate in Hz.
    pub fn next(&mut self, depth_ms: f32, rate_hz: f32, sample_rate: f32) -> (f32, f32) {
        self.increment = TAU * clamp_rate(rate_hz) / sample_rate;
        self.phase += self.increment;
        if self.phase >= TAU {
            self.phase -= TAU;
            self.invert = self.pending_invert;
        }

        let depth_samples = clamp_depth(depth_ms) / 1000.0 * sample_rate;
        let offset = depth_samples * self.phase.sin();
        if self.invert {
            (offset, -offset)
        } else {
            (offset, offset)
        }
    }
}

impl Default for ModulationLfo {
    fn default() -> Self {
        Self::new()
    }
}

/// Clamp a depth into `[0, MAX_DEPTH_MS]`. NaN becomes 0.
pub fn clamp_depth(depth_ms: f32) -> f32 {
    if depth_ms > 0.0 {
        depth_ms.min(MAX_DEPTH_MS)
    } else {
        0.0
    }
}

/// Clamp a rate into `[MIN_RATE_HZ, MAX_RATE_HZ]`. NaN becomes
/// `MIN_RATE_HZ`.
pub fn clamp_rate(rate_hz: f32) -> f32 {
    if rate_hz > MIN_RATE_HZ {
        rate_hz.min(MAX_RATE_HZ)
    } else {
        MIN_RATE_HZ
    }
}

/// Largest offset the LFO can produce at `sample_rate`, in whole samples.
pub fn max_offset_samples(sample_rate: f32) -> usize {
    (MAX_DEPTH_MS / 1000.0 * sample_rate).ceil() as usize
}

#[cfg(test)]
mod tests {
    use super::*;

    const RATE: f32 = 44100.0;

    /// Zero depth never moves the read head.
    #[test]
    fn test_zero_depth_is_silent() {
        let mut lfo = ModulationLfo::new();
        for _ in 0..1000 {
            assert_eq!(lfo.next(0.0, 5.0, RATE), (0.0, 0.0));
        }
    }

    /// Offsets stay within the configured depth.
    #[test]
    fn test_offset_bounded_by_depth() {
        let mut lfo = ModulationLfo::new();
        let depth_samples = 5.0 / 1000.0 * RATE;

        let mut peak = 0.0_f32;
        for _ in 0..(RATE as usize) {
            let (left, right) = lfo.next(5.0, 2.0, RATE);
            assert_eq!(left, right);
            peak = peak.max(left.abs());
        }
        assert!(peak <= depth_samples + 1e-3);
        assert!(peak > depth_samples * 0.99, "Peak {peak} never reached the depth");
    }

    /// Depth above the maximum is clamped.
    #[test]
    fn test_depth_is_clamped() {
        let mut lfo = ModulationLfo::new();
        let limit = max_offset_samples(RATE) as f32;
        for _ in 0..(RATE as usize) {
            let (left, _) = lfo.next(100.0, 3.0, RATE);
            assert!(left.abs() <= limit);
        }
    }

    #[test]
    fn test_clamps_handle_nan() {
        assert_eq!(clamp_depth(f32::NAN), 0.0);
        assert_eq!(clamp_depth(-1.0), 0.0);
        assert_eq!(clamp_depth(25.0), MAX_DEPTH_MS);
        assert_eq!(clamp_rate(f32::NAN), MIN_RATE_HZ);
        assert_eq!(clamp_rate(0.0), MIN_RATE_HZ);
        assert_eq!(clamp_rate(f32::INFINITY), MAX_RATE_HZ);
        assert_eq!(clamp_rate(2.5), 2.5);
    }

    /// A NaN depth or rate leaves the phase finite, so later calls still
    /// produce usable offsets.
    #[test]
    fn test_nan_controls_keep_phase_finite() {
        let mut lfo = ModulationLfo::new();
        assert_eq!(lfo.next(f32::NAN, f32::NAN, RATE), (0.0, 0.0));
        assert!(lfo.phase().is_finite());

        let (left, right) = lfo.next(2.0, 1.0, RATE);
        assert!(left.is_finite() && right.is_finite());
    }

    /// At 1 Hz the phase wraps once per second.
    #[test]
    fn test_phase_wraps() {
        let mut lfo = ModulationLfo::new();
        let mut wraps = 0;
        let mut previous = lfo.phase();
        for _ in 0..((RATE * 3.5) as usize) {
            lfo.next(1.0, 1.0, RATE);
            assert!(lfo.phase() < TAU);
            if lfo.phase() < previous {
                wraps += 1;
            }
            previous = lfo.phase();
        }
        assert_eq!(wraps, 3);
    }

    /// Inversion only kicks in at a wrap, then mirrors the right channel.
    #[test]
    fn test_invert_latches_at_wrap() {
        let mut lfo = ModulationLfo::new();
        for _ in 0..100 {
            lfo.next(2.0, 1.0, RATE);
        }

        lfo.set_invert(true);
        let (left, right) = lfo.next(2.0, 1.0, RATE);
        assert!(!lfo.is_inverted(), "Must wait for the wrap");
        assert_eq!(left, right);

        let mut previous = lfo.phase();
        loop {
            let (left, right) = lfo.next(2.0, 1.0, RATE);
            if lfo.phase() < previous {
                assert!(lfo.is_inverted());
                assert_eq!(left, -right);
                break;
            }
            assert_eq!(left, right);
            previous = lfo.phase();
        }
    }
}
