//! # Tap Tempo
//!
//! The time between two taps is one beat. Intervals of 50 ms or less are
//! treated as contact bounce and intervals over 10 s as the start of a new
//! tapping session; neither changes the tempo, but both re-arm the next
//! tap.

/// Tempo used until the first valid pair of taps.
pub const DEFAULT_TAP_TEMPO: f32 = 120.0;

const MIN_INTERVAL_MS: u64 = 50;
const MAX_INTERVAL_MS: u64 = 10_000;

#[derive(Debug, Clone)]
pub struct TapTempo {
    last_tap_ms: Option<u64>,
    tempo: f32,
    /// Button state seen on the previous block, for edge detection.
    pressed: bool,
}

impl TapTempo {
    pub fn new() -> Self {
        Self {
            last_tap_ms: None,
            tempo: DEFAULT_TAP_TEMPO,
            pressed: false,
        }
    }

    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// Current tapped tempo in BPM.
    pub fn tempo(&self) -> f32 {
        self.tempo
    }

    /// Register a tap at `now_ms`. Returns the new tempo if this tap
    /// completed a valid interval.
    pub fn tap(&mut self, now_ms: u64) -> Option<f32> {
        let previous = self.last_tap_ms.replace(now_ms);
        let interval = now_ms.saturating_sub(previous?);
        if interval <= MIN_INTERVAL_MS || interval > MAX_INTERVAL_MS {
            return None;
        }

        self.tempo = 60_000.0 / interval as f32;
        Some(self.tempo)
    }

    /// Feed the tap button state once per block. Only a press (off to on)
    /// counts as a tap.
    pub fn update_button(&mut self, pressed: bool, now_ms: u64) -> Option<f32> {
        let rising = pressed && !self.pressed;
        self.pressed = pressed;
        if rising {
            self.tap(now_ms)
        } else {
            None
        }
    }
}

impl Default for TapTempo {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_half_second_is_120_bpm() {
        let mut tap = TapTempo::new();
        assert_eq!(tap.tap(1_000), None, "First tap only arms");
        assert_eq!(tap.tap(1_500), Some(120.0));
        assert_eq!(tap.tap(2_250), Some(80.0));
        assert_eq!(tap.tempo(), 80.0);
    }

    /// Bounces and long pauses keep the old tempo but re-arm.
    #[test]
    fn test_out_of_range_intervals() {
        let mut tap = TapTempo::new();
        tap.tap(0);
        assert_eq!(tap.tap(50), None);
        assert_eq!(tap.tap(20_000), None);
        assert_eq!(tap.tempo(), DEFAULT_TAP_TEMPO);

        assert_eq!(tap.tap(21_000), Some(60.0));
    }

    /// Holding the button down is one tap, not one per block.
    #[test]
    fn test_button_edges() {
        let mut tap = TapTempo::new();
        assert_eq!(tap.update_button(true, 0), None);
        assert_eq!(tap.update_button(true, 400), None);
        assert_eq!(tap.update_button(false, 450), None);
        assert_eq!(tap.update_button(true, 1_000), Some(60.0));
    }
}
