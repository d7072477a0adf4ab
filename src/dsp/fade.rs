//! # Crossfade State Machine
//!
//! Changing the tempo or a divider changes how far behind the write head
//! the read head sits. Jumping the read head would play a discontinuity (a
//! click) and, for a longer delay, audio that was never meant to be heard.
//! Instead the wet path goes through a fixed sequence:
//!
//! ```text
//!            settings change
//!   CYCLE ─────────────────────► FADE_OUT ──(coeff hits 0)──► FADE_OUT_DONE
//!     ▲                                                             │
//!     │                                          commit, clear, rewind
//!     │                                                             ▼
//!   FADE_IN ◄────────────(buffer filled)──────────────────────── FILL_BUF
//! ```
//!
//! The state machine only produces the fade coefficient that scales the
//! wet tap. Deciding *when* a change happened and *when* the buffer is
//! full is up to the engine.

/// Where the wet path is in the crossfade cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FadeState {
    /// Ramping the wet path down to silence.
    FadeOut,
    /// Silent, waiting for the engine to commit new settings.
    FadeOutDone,
    /// Silent while the freshly cleared buffer fills up.
    FillBuffer,
    /// Ramping the wet path back up.
    FadeIn,
    /// Steady state, wet path at full level.
    Cycle,
}

#[derive(Debug, Clone)]
pub struct Crossfade {
    state: FadeState,
    /// Position on the ramp, in `[0, length]`.
    position: usize,
    length: usize,
    coefficient: f32,
}

impl Crossfade {
    /// A crossfade with a ramp of `length` samples, starting in
    /// [`FadeState::FillBuffer`].
    pub fn new(length: usize) -> Self {
        Self {
            state: FadeState::FillBuffer,
            position: 0,
            length: length.max(1),
            coefficient: 0.0,
        }
    }

    pub fn reset(&mut self) {
        self.state = FadeState::FillBuffer;
        self.position = 0;
        self.coefficient = 0.0;
    }

    pub fn state(&self) -> FadeState {
        self.state
    }

    pub fn length(&self) -> usize {
        self.length
    }

    /// The coefficient produced by the last [`tick()`](Self::tick).
    pub fn coefficient(&self) -> f32 {
        self.coefficient
    }

    /// Start fading out, unless a fade out is already running or done.
    pub fn request_fade_out(&mut self) {
        if !matches!(self.state, FadeState::FadeOut | FadeState::FadeOutDone) {
            self.state = FadeState::FadeOut;
        }
    }

    /// New settings are committed; wait for the buffer to fill.
    pub fn begin_fill(&mut self) {
        self.state = FadeState::FillBuffer;
    }

    /// Advance one sample and return the fade coefficient for it.
    ///
    /// `buffer_filled` is only looked at in [`FadeState::FillBuffer`].
    pub fn tick(&mut self, buffer_filled: bool) -> f32 {
        let step = 1.0 / self.length as f32;

        self.coefficient = match self.state {
            FadeState::FadeOut => {
                if self.position > 0 {
                    self.position -= 1;
                    self.position as f32 * step
                } else {
                    self.state = FadeState::FadeOutDone;
                    0.0
                }
            }
            FadeState::FadeOutDone => 0.0,
            FadeState::FillBuffer => {
                if buffer_filled {
                    self.state = FadeState::FadeIn;
                }
                0.0
            }
            FadeState::FadeIn => {
                if self.position < self.length {
                    let coefficient = self.position as f32 * step;
                    self.position += 1;
                    coefficient
                } else {
                    self.state = FadeState::Cycle;
                    1.0
                }
            }
            FadeState::Cycle => 1.0,
        };
        self.coefficient
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Tick until the state changes, returning the coefficients seen.
    fn run_until_leaving(fade: &mut Crossfade, filled: bool) -> Vec<f32> {
        let start = fade.state();
        let mut seen = Vec::new();
        while fade.state() == start {
            seen.push(fade.tick(filled));
            assert!(seen.len() < 10_000, "Stuck in {start:?}");
        }
        seen
    }

    #[test]
    fn test_starts_filling() {
        let mut fade = Crossfade::new(100);
        assert_eq!(fade.state(), FadeState::FillBuffer);
        assert_eq!(fade.tick(false), 0.0);
        assert_eq!(fade.state(), FadeState::FillBuffer);
    }

    /// The full cycle, with monotonic ramps that end exactly on 0 and 1.
    #[test]
    fn test_full_cycle() {
        let mut fade = Crossfade::new(64);

        fade.tick(true);
        assert_eq!(fade.state(), FadeState::FadeIn);

        let ramp = run_until_leaving(&mut fade, true);
        assert_eq!(fade.state(), FadeState::Cycle);
        assert_eq!(ramp[0], 0.0);
        assert_eq!(*ramp.last().unwrap(), 1.0);
        assert!(ramp.windows(2).all(|w| w[1] >= w[0]));
        assert_eq!(fade.tick(true), 1.0);

        fade.request_fade_out();
        assert_eq!(fade.state(), FadeState::FadeOut);
        let ramp = run_until_leaving(&mut fade, true);
        assert_eq!(fade.state(), FadeState::FadeOutDone);
        assert_eq!(*ramp.last().unwrap(), 0.0);
        assert!(ramp.windows(2).all(|w| w[1] <= w[0]));
        assert!(ramp[0] < 1.0);

        assert_eq!(fade.tick(true), 0.0);
        assert_eq!(fade.state(), FadeState::FadeOutDone, "Waits for a commit");

        fade.begin_fill();
        assert_eq!(fade.tick(false), 0.0);
        assert_eq!(fade.state(), FadeState::FillBuffer);
    }

    /// A fade out requested halfway through a fade in starts from where
    /// the fade in got to, not from full level.
    #[test]
    fn test_fade_out_mid_fade_in() {
        let mut fade = Crossfade::new(100);
        fade.tick(true);
        for _ in 0..41 {
            fade.tick(true);
        }
        let reached = fade.coefficient();
        assert!((reached - 0.4).abs() < 1e-6);

        fade.request_fade_out();
        let first = fade.tick(true);
        let second = fade.tick(true);
        assert!(first <= reached && second < first);
        assert!(reached - second <= 0.01 + 1e-6, "No jump allowed");
    }

    /// Asking again while fading out does not restart the fade.
    #[test]
    fn test_repeated_request_is_ignored() {
        let mut fade = Crossfade::new(10);
        fade.tick(true);
        run_until_leaving(&mut fade, true);

        fade.request_fade_out();
        fade.tick(true);
        fade.tick(true);
        let position = fade.position;
        fade.request_fade_out();
        assert_eq!(fade.position, position);
        assert_eq!(fade.state(), FadeState::FadeOut);
    }
}
