//! # Tempo and Delay-Time Resolution
//!
//! Musical delays are specified as a note value at a tempo, not in
//! milliseconds. One beat (a quarter note) lasts `60 / bpm` seconds, and
//! every divider is a fraction of that beat:
//!
//! ```text
//! delay_samples = floor(60 / bpm · sample_rate · factor)
//!
//! 120 BPM, 44100 Hz:
//!   1/4     → 22050      1/4 T → 14700
//!   1/8     → 11025      1/8 . → 16537
//!   1/8 T   →  7350      1/16  →  5512
//! ```

use nih_plug::prelude::Enum;

/// Slowest tempo accepted. Also the fallback for zero, negative or NaN
/// tempos, which would otherwise divide by zero.
pub const MIN_TEMPO_BPM: f32 = 20.0;

/// Fastest tempo accepted.
pub const MAX_TEMPO_BPM: f32 = 300.0;

/// A rhythmic subdivision of one beat.
#[derive(Enum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Divider {
    #[id = "quarter"]
    #[name = "1/4"]
    Quarter,
    #[id = "quarter-triplet"]
    #[name = "1/4 T"]
    QuarterTriplet,
    #[id = "eighth"]
    #[name = "1/8"]
    Eighth,
    #[id = "dotted-eighth"]
    #[name = "1/8 ."]
    DottedEighth,
    #[id = "eighth-triplet"]
    #[name = "1/8 T"]
    EighthTriplet,
    #[id = "sixteenth"]
    #[name = "1/16"]
    Sixteenth,
}

impl Divider {
    /// Length of this note value in beats.
    pub fn beats(self) -> f32 {
        match self {
            Divider::Quarter => 1.0,
            Divider::QuarterTriplet => 2.0 / 3.0,
            Divider::Eighth => 0.5,
            Divider::DottedEighth => 0.75,
            Divider::EighthTriplet => 1.0 / 3.0,
            Divider::Sixteenth => 0.25,
        }
    }
}

/// Where the tempo comes from.
#[derive(Enum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum TempoMode {
    /// Follow the host transport.
    #[id = "host"]
    Host,
    /// Use the tempo knob.
    #[id = "user"]
    User,
    /// Use the tempo tapped on the tap button.
    #[id = "tap"]
    Tap,
}

/// Pick the tempo for `mode`. A host that reports no tempo falls back to
/// the user tempo.
pub fn select_tempo(mode: TempoMode, host: Option<f32>, user: f32, tapped: f32) -> f32 {
    match mode {
        TempoMode::Host => host.unwrap_or(user),
        TempoMode::User => user,
        TempoMode::Tap => tapped,
    }
}

/// Clamp a tempo into `[MIN_TEMPO_BPM, MAX_TEMPO_BPM]`.
pub fn clamp_tempo(bpm: f32) -> f32 {
    if bpm.is_nan() {
        return MIN_TEMPO_BPM;
    }
    bpm.clamp(MIN_TEMPO_BPM, MAX_TEMPO_BPM)
}

/// Delay length in whole samples for `divider` at `bpm`.
pub fn delay_samples(bpm: f32, divider: Divider, sample_rate: f32) -> usize {
    let beat = 60.0 / clamp_tempo(bpm) * sample_rate;
    (beat * divider.beats()).floor() as usize
}

/// Longest delay any tempo/divider combination can ask for, in samples.
pub fn max_delay_samples(sample_rate: f32) -> usize {
    delay_samples(MIN_TEMPO_BPM, Divider::Quarter, sample_rate)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quarter_note_at_120() {
        assert_eq!(delay_samples(120.0, Divider::Quarter, 44100.0), 22050);
        assert_eq!(delay_samples(120.0, Divider::Quarter, 48000.0), 24000);
    }

    #[test]
    fn test_dividers_at_120() {
        let rate = 44100.0;
        assert_eq!(delay_samples(120.0, Divider::QuarterTriplet, rate), 14700);
        assert_eq!(delay_samples(120.0, Divider::Eighth, rate), 11025);
        assert_eq!(delay_samples(120.0, Divider::DottedEighth, rate), 16537);
        assert_eq!(delay_samples(120.0, Divider::EighthTriplet, rate), 7350);
        assert_eq!(delay_samples(120.0, Divider::Sixteenth, rate), 5512);
    }

    /// A zero tempo must not divide by zero.
    #[test]
    fn test_zero_tempo_is_clamped() {
        assert_eq!(clamp_tempo(0.0), MIN_TEMPO_BPM);
        assert_eq!(clamp_tempo(-50.0), MIN_TEMPO_BPM);
        assert_eq!(clamp_tempo(f32::NAN), MIN_TEMPO_BPM);
        assert_eq!(clamp_tempo(1000.0), MAX_TEMPO_BPM);
        assert_eq!(
            delay_samples(0.0, Divider::Quarter, 44100.0),
            max_delay_samples(44100.0)
        );
    }

    #[test]
    fn test_max_delay() {
        assert_eq!(max_delay_samples(44100.0), 132300);
    }

    #[test]
    fn test_select_tempo() {
        assert_eq!(select_tempo(TempoMode::Host, Some(90.0), 120.0, 140.0), 90.0);
        assert_eq!(select_tempo(TempoMode::Host, None, 120.0, 140.0), 120.0);
        assert_eq!(select_tempo(TempoMode::User, Some(90.0), 120.0, 140.0), 120.0);
        assert_eq!(select_tempo(TempoMode::Tap, Some(90.0), 120.0, 140.0), 140.0);
    }
}
