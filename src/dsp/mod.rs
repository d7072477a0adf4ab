//! # DSP Building Blocks
//!
//! Everything the delay engine is made of, one primitive per module:
//!
//! - **`delay_line`**: A two-channel ring buffer with a shared write head
//!   and fractional, wrapping reads.
//!
//! - **`filter`**: An RBJ biquad for the low-cut and high-cut stages on the
//!   input and in the feedback loop.
//!
//! - **`smoother`**: One-pole parameter smoothing plus the dB and percent
//!   gain laws.
//!
//! - **`tempo`**: Note divisions and the tempo to delay-length conversion.
//!
//! - **`lfo`**: The sine oscillator that wobbles the read heads.
//!
//! - **`limiter`**: A peak limiter that keeps full feedback from running
//!   away.
//!
//! - **`fade`**: The crossfade state machine used when the delay length
//!   changes.

pub mod delay_line;
pub mod fade;
pub mod filter;
pub mod lfo;
pub mod limiter;
pub mod smoother;
pub mod tempo;
