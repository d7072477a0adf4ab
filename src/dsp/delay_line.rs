//! # Stereo Delay Buffer
//!
//! A ring buffer per channel with one write head shared by both channels.
//!
//! ## How a Ring Buffer Works
//!
//! Imagine a circular tape loop. A "write head" records incoming audio
//! onto the tape, and a "read head" plays it back from a position further
//! behind on the tape. The distance between the two heads determines the
//! delay time.
//!
//! Here the read head is never stored. Every sample the engine computes
//!
//! ```text
//! read_position = write_pos - delay_samples + modulation_offset
//! ```
//!
//! from the *current* (smoothed) delay and LFO values, so both can move
//! continuously without a cursor drifting out of sync.
//!
//! ## Linear Interpolation
//!
//! The read position is a real number. It is first wrapped into
//! `[0, capacity)`, then the two neighbouring stored samples are blended:
//!
//! ```text
//! i    = floor(position)
//! frac = position - i
//! y    = buf[i] + frac · (buf[(i + 1) % capacity] - buf[i])
//! ```

/// Number of channels the engine processes.
pub const CHANNELS: usize = 2;

/// Fixed-capacity circular buffers for both channels.
///
/// All memory is allocated up front. Nothing here allocates after
/// construction.
#[derive(Debug, Clone)]
pub struct DelayBuffer {
    channels: [Vec<f32>; CHANNELS],

    /// Where the next sample is written. Always in `[0, capacity)`.
    write_pos: usize,

    capacity: usize,
}

impl DelayBuffer {
    /// Create a silent buffer holding `capacity` samples per channel.
    ///
    /// Allocation failure is reported instead of aborting, so the host
    /// sees a failed instantiation rather than a crash.
    pub fn new(capacity: usize) -> Result<Self, std::collections::TryReserveError> {
        let capacity = capacity.max(2);
        let mut left = Vec::new();
        left.try_reserve_exact(capacity)?;
        left.resize(capacity, 0.0);

        let mut right = Vec::new();
        right.try_reserve_exact(capacity)?;
        right.resize(capacity, 0.0);

        Ok(Self {
            channels: [left, right],
            write_pos: 0,
            capacity,
        })
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn write_pos(&self) -> usize {
        self.write_pos
    }

    /// Store `value` for `channel` at the current write position.
    ///
    /// Does not advance. Call [`advance()`](Self::advance) once per sample
    /// after both channels are written.
    pub fn write(&mut self, channel: usize, value: f32) {
        self.channels[channel][self.write_pos] = value;
    }

    /// Store `value` at an arbitrary position, wrapped into the buffer.
    pub fn write_at(&mut self, channel: usize, pos: usize, value: f32) {
        self.channels[channel][pos % self.capacity] = value;
    }

    /// Read `channel` at a real-valued position.
    ///
    /// The position may be negative or past the end; it is wrapped into
    /// `[0, capacity)` before interpolating.
    pub fn read_interpolated(&self, channel: usize, position: f32) -> f32 {
        self.read_wrapped(channel, f64::from(position))
    }

    /// Read `channel` at `delay_samples` behind the write head, shifted by
    /// `offset` samples.
    ///
    /// The position is built in `f64`: at the longest delays an `f32`
    /// position only resolves 1/128 of a sample.
    pub fn read_behind(&self, channel: usize, delay_samples: f32, offset: f32) -> f32 {
        let position = self.write_pos as f64 - f64::from(delay_samples) + f64::from(offset);
        self.read_wrapped(channel, position)
    }

    fn read_wrapped(&self, channel: usize, position: f64) -> f32 {
        let position = position.rem_euclid(self.capacity as f64);

        let buffer = &self.channels[channel];
        // Rounding in the wrap above can land exactly on the capacity.
        let index = (position as usize) % self.capacity;
        let next = (index + 1) % self.capacity;
        let frac = (position - position.floor()) as f32;

        let current = buffer[index];
        current + frac * (buffer[next] - current)
    }

    /// Move the write head forward by one sample, wrapping to 0.
    pub fn advance(&mut self) {
        self.write_pos += 1;
        if self.write_pos >= self.capacity {
            self.write_pos = 0;
        }
    }

    /// Silence both channels and put the write head back at 0.
    pub fn clear(&mut self) {
        for channel in &mut self.channels {
            channel.fill(0.0);
        }
        self.write_pos = 0;
    }
}
