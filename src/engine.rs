//! # Tempo Delay Engine
//!
//! Everything that happens on the audio thread. The plugin hands the engine
//! one [`DelayControls`] snapshot per block and a pair of channel slices,
//! and the engine does the rest without allocating, locking or failing.
//!
//! ## Signal Flow (per sample, per channel)
//!
//! ```text
//!                      ┌─────────────── × dry ──────────────────────────┐
//!                      │                                                │
//! input ──┬────────────┘                                                ▼
//!         │                                                            (+)──► output
//!         └─► [input low/high cut] ─► × input gain ─►(+)─► [buffer]     ▲
//!                                                     ▲        │        │
//!                                                     │   read + fade   │
//!                                                     │        │        │
//!                                                     │        ├─ × wet ┘
//!                                                     │        ▼
//!                       × feedback (own channel) ◄── [limiter] ─► [feedback low/high cut]
//!                       × crossfeed (other channel)
//! ```
//!
//! In ping-pong mode the two inputs are summed into the left buffer only,
//! the right buffer is fed from the left tap, and the left buffer from the
//! right tap, so repeats bounce between the channels.
//!
//! ## Delay-Time Changes
//!
//! The delay length only changes through the crossfade state machine (see
//! [`crate::dsp::fade`]). When the tempo, a divider or the ping-pong
//! topology changes, the wet path fades out, the buffer is cleared and
//! rewound, and the wet path fades back in while the buffer refills.
//!
//! The wet path stays silent in FILL_BUF until the write head has moved
//! past the longer of the two new delay lengths plus the modulation
//! margin. Only then does the fade in start, so it ramps over audio
//! written after the commit and never over the cleared region.

use nih_plug::{nih_debug_assert, nih_debug_assert_eq};
use thiserror::Error;

use crate::dsp::delay_line::{DelayBuffer, CHANNELS};
use crate::dsp::fade::{Crossfade, FadeState};
use crate::dsp::filter::Biquad;
use crate::dsp::lfo::{self, ModulationLfo};
use crate::dsp::limiter::{self, PeakLimiter};
use crate::dsp::smoother::{db_to_gain, FeedbackLaw, Smoother, DELAY_SMOOTHING, GAIN_SMOOTHING};
use crate::dsp::tempo::{self, Divider, TempoMode};

/// -6 dB, applied to the summed input in ping-pong mode.
const PING_PONG_INPUT_GAIN: f32 = 0.5;

/// Extra samples kept free around the modulated read head for the
/// interpolation neighbour.
const INTERPOLATION_GUARD: usize = 2;

/// Why an engine could not be built.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("invalid sample rate: {0} Hz")]
    InvalidSampleRate(f32),
    #[error("could not allocate the delay buffer: {0}")]
    Allocation(#[from] std::collections::TryReserveError),
}

/// Fixed engine constants, chosen at construction.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    /// Length of the fade out and fade in ramps.
    pub fade_ms: f32,
    pub limiter_attack_ms: f32,
    pub limiter_release_ms: f32,
    /// How feedback and crossfeed percentages become gains.
    pub feedback_law: FeedbackLaw,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            fade_ms: 50.0,
            limiter_attack_ms: limiter::DEFAULT_ATTACK_MS,
            limiter_release_ms: limiter::DEFAULT_RELEASE_MS,
            feedback_law: FeedbackLaw::Linear,
        }
    }
}

/// On/off, cutoff and Q for one filter site.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FilterSettings {
    pub enabled: bool,
    pub frequency: f32,
    pub q: f32,
}

impl FilterSettings {
    pub const fn off(frequency: f32) -> Self {
        Self {
            enabled: false,
            frequency,
            q: 0.707,
        }
    }
}

/// Every control the engine reads, snapshotted once per block.
///
/// Values may be out of range; the engine clamps them.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DelayControls {
    pub tempo_mode: TempoMode,
    /// Transport tempo, if the host reports one.
    pub host_tempo: Option<f32>,
    pub user_tempo: f32,
    pub tap_tempo: f32,
    pub divider_left: Divider,
    pub divider_right: Divider,

    /// Feedback in percent.
    pub feedback: f32,
    /// Crossfeed in percent.
    pub crossfeed: f32,
    pub dry_db: f32,
    pub wet_db: f32,

    pub input_low_cut: FilterSettings,
    pub input_high_cut: FilterSettings,
    pub feedback_low_cut: FilterSettings,
    pub feedback_high_cut: FilterSettings,

    pub modulation: bool,
    pub modulation_depth_ms: f32,
    pub modulation_rate_hz: f32,
    pub modulation_phase_invert: bool,

    pub enabled: bool,
    /// Let buffered repeats ring out while disabled.
    pub trails: bool,
    pub ping_pong: bool,
}

impl Default for DelayControls {
    fn default() -> Self {
        Self {
            tempo_mode: TempoMode::User,
            host_tempo: None,
            user_tempo: 120.0,
            tap_tempo: 120.0,
            divider_left: Divider::Quarter,
            divider_right: Divider::Quarter,
            feedback: 40.0,
            crossfeed: 0.0,
            dry_db: 0.0,
            wet_db: 0.0,
            input_low_cut: FilterSettings::off(80.0),
            input_high_cut: FilterSettings::off(12000.0),
            feedback_low_cut: FilterSettings::off(150.0),
            feedback_high_cut: FilterSettings::off(6000.0),
            modulation: false,
            modulation_depth_ms: 2.0,
            modulation_rate_hz: 0.5,
            modulation_phase_invert: false,
            enabled: true,
            trails: false,
            ping_pong: false,
        }
    }
}

/// The settings that decide where the read heads sit. Any change to these
/// goes through a crossfade.
#[derive(Debug, Clone, Copy, PartialEq)]
struct DelaySettings {
    tempo: f32,
    divider_left: Divider,
    divider_right: Divider,
    ping_pong: bool,
}

/// One pair of per-channel filters.
#[derive(Debug, Clone)]
struct FilterPair {
    low_cut: [Biquad; CHANNELS],
    high_cut: [Biquad; CHANNELS],
}

impl FilterPair {
    fn new() -> Self {
        Self {
            low_cut: [Biquad::low_cut(), Biquad::low_cut()],
            high_cut: [Biquad::high_cut(), Biquad::high_cut()],
        }
    }

    fn reset(&mut self) {
        for filter in self.low_cut.iter_mut().chain(self.high_cut.iter_mut()) {
            filter.reset();
        }
    }

    fn process(
        &mut self,
        channel: usize,
        sample: f32,
        low_cut: FilterSettings,
        high_cut: FilterSettings,
        sample_rate: f32,
    ) -> f32 {
        let mut sample = sample;
        if low_cut.enabled {
            sample =
                self.low_cut[channel].process(sample, low_cut.frequency, low_cut.q, sample_rate);
        }
        if high_cut.enabled {
            sample =
                self.high_cut[channel].process(sample, high_cut.frequency, high_cut.q, sample_rate);
        }
        sample
    }
}

/// The complete delay processor for one stereo instance.
pub struct DelayEngine {
    sample_rate: f32,
    config: EngineConfig,

    buffer: DelayBuffer,
    crossfade: Crossfade,
    lfo: ModulationLfo,
    limiters: [PeakLimiter; CHANNELS],
    input_filters: FilterPair,
    feedback_filters: FilterPair,

    dry: Smoother,
    wet: Smoother,
    input_gain: Smoother,
    feedback: Smoother,
    crossfeed: Smoother,
    modulation_depth: Smoother,
    modulation_rate: Smoother,
    /// Delay lengths in samples. Each commit snaps them to the new
    /// lengths, so between commits they hold a constant.
    delay: [Smoother; CHANNELS],

    /// Controls of the block being processed.
    controls: DelayControls,
    /// Settings resolved from `controls`.
    pending: DelaySettings,
    /// Settings the buffer is currently laid out for. `None` until the
    /// first block after a reset.
    committed: Option<DelaySettings>,

    /// Samples written since the last commit, saturating at `fill_target`.
    written: usize,
    /// `written` value at which the fade in starts.
    fill_target: usize,
    /// Room kept between the read head and both ends of its range.
    margin: usize,
}

impl DelayEngine {
    /// Build an engine for `sample_rate` with the default configuration.
    pub fn new(sample_rate: f32) -> Result<Self, EngineError> {
        Self::with_config(sample_rate, EngineConfig::default())
    }

    pub fn with_config(sample_rate: f32, config: EngineConfig) -> Result<Self, EngineError> {
        if !sample_rate.is_finite() || sample_rate <= 0.0 {
            return Err(EngineError::InvalidSampleRate(sample_rate));
        }

        let margin = lfo::max_offset_samples(sample_rate) + INTERPOLATION_GUARD;
        let capacity = tempo::max_delay_samples(sample_rate) + 2 * margin + 1;
        let buffer = DelayBuffer::new(capacity)?;

        let fade_length = (config.fade_ms * sample_rate / 1000.0).round() as usize;
        let limiter = PeakLimiter::new(
            config.limiter_attack_ms,
            config.limiter_release_ms,
            sample_rate,
        );
        let controls = DelayControls::default();

        let mut engine = Self {
            sample_rate,
            buffer,
            crossfade: Crossfade::new(fade_length),
            lfo: ModulationLfo::new(),
            limiters: [limiter.clone(), limiter],
            input_filters: FilterPair::new(),
            feedback_filters: FilterPair::new(),
            dry: Smoother::new(0.0, GAIN_SMOOTHING),
            wet: Smoother::new(0.0, GAIN_SMOOTHING),
            input_gain: Smoother::new(1.0, GAIN_SMOOTHING),
            feedback: Smoother::new(0.0, GAIN_SMOOTHING),
            crossfeed: Smoother::new(0.0, GAIN_SMOOTHING),
            modulation_depth: Smoother::new(0.0, DELAY_SMOOTHING),
            modulation_rate: Smoother::new(lfo::MIN_RATE_HZ, DELAY_SMOOTHING),
            delay: [
                Smoother::new(0.0, DELAY_SMOOTHING),
                Smoother::new(0.0, DELAY_SMOOTHING),
            ],
            pending: Self::resolve_settings(&controls),
            controls,
            committed: None,
            written: 0,
            fill_target: 0,
            margin,
            config,
        };
        engine.reset();
        Ok(engine)
    }

    /// Silence everything and return to the state right after
    /// construction.
    pub fn reset(&mut self) {
        self.buffer.clear();
        self.crossfade.reset();
        self.lfo.reset();
        for limiter in &mut self.limiters {
            limiter.reset();
        }
        self.input_filters.reset();
        self.feedback_filters.reset();

        // Dry and wet start at the -96 dB "off" point so the first real
        // value ramps up from silence.
        self.dry.reset_to(0.0);
        self.wet.reset_to(0.0);
        // Nothing is buffered, so the buffer input can start open.
        self.input_gain.reset_to(1.0);
        self.feedback.reset_to(0.0);
        self.crossfeed.reset_to(0.0);
        self.modulation_depth.reset_to(0.0);
        self.modulation_rate.reset_to(lfo::MIN_RATE_HZ);
        for delay in &mut self.delay {
            delay.reset_to(0.0);
        }

        self.committed = None;
        self.written = 0;
        self.fill_target = 0;
    }

    pub fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn fade_state(&self) -> FadeState {
        self.crossfade.state()
    }

    /// Fade coefficient applied to the wet tap on the last sample.
    pub fn fade_coefficient(&self) -> f32 {
        self.crossfade.coefficient()
    }

    /// Committed delay lengths in samples, `(left, right)`.
    pub fn delay_samples(&self) -> (f32, f32) {
        (self.delay[0].target(), self.delay[1].target())
    }

    /// The tempo the buffer is laid out for, or the tempo about to be
    /// committed if nothing is committed yet.
    pub fn resolved_tempo(&self) -> f32 {
        self.committed.map_or(self.pending.tempo, |settings| settings.tempo)
    }

    /// How long the output keeps ringing after the input stops, in
    /// samples: enough repeats for the feedback to decay by 60 dB.
    pub fn tail_samples(&self) -> u32 {
        let delay = self.delay[0].target().max(self.delay[1].target());
        let feedback = self.feedback.current().max(self.crossfeed.current());
        if feedback >= 1.0 {
            return u32::MAX;
        }

        let repeats = if feedback > 0.001 {
            -3.0 / feedback.log10()
        } else {
            1.0
        };
        (repeats * delay).min(u32::MAX as f32) as u32
    }

    /// Process a block in place and return the resolved tempo for display.
    ///
    /// Both slices should have the same length. Extra samples in the
    /// longer one are left untouched.
    pub fn process_block(
        &mut self,
        left: &mut [f32],
        right: &mut [f32],
        controls: &DelayControls,
    ) -> f32 {
        nih_debug_assert_eq!(left.len(), right.len());

        self.prepare_block(controls);
        for (left, right) in left.iter_mut().zip(right.iter_mut()) {
            let (out_left, out_right) = self.process_frame(*left, *right);
            *left = out_left;
            *right = out_right;
        }
        self.resolved_tempo()
    }

    /// Take the controls for the next block: resolve the tempo, detect
    /// delay-time changes and update the smoothing targets.
    pub fn prepare_block(&mut self, controls: &DelayControls) {
        self.controls = *controls;
        self.pending = Self::resolve_settings(controls);

        if self.committed.is_none() {
            // Nothing is buffered yet, so there is nothing to fade out.
            self.commit();
        }
        if self.committed != Some(self.pending) || self.is_muted() {
            self.crossfade.request_fade_out();
        }

        let enabled = controls.enabled;
        self.dry.follow(
            if enabled {
                controls.dry_db
            } else {
                f32::NEG_INFINITY
            },
            db_to_gain,
        );
        self.wet.follow(controls.wet_db, db_to_gain);
        self.input_gain.set_target(if enabled { 1.0 } else { 0.0 });

        let law = self.config.feedback_law;
        self.feedback.follow(controls.feedback, |percent| law.gain(percent));
        self.crossfeed.follow(controls.crossfeed, |percent| law.gain(percent));

        self.modulation_depth.set_target(if controls.modulation {
            lfo::clamp_depth(controls.modulation_depth_ms)
        } else {
            0.0
        });
        self.modulation_rate
            .set_target(lfo::clamp_rate(controls.modulation_rate_hz));
        self.lfo.set_invert(controls.modulation_phase_invert);
    }

    /// Process one stereo frame using the controls from the last
    /// [`prepare_block()`](Self::prepare_block).
    pub fn process_frame(&mut self, left: f32, right: f32) -> (f32, f32) {
        if self.crossfade.state() == FadeState::FadeOutDone && !self.is_muted() {
            self.commit();
        }
        let fade = self.crossfade.tick(self.written >= self.fill_target);

        let depth = self.modulation_depth.next();
        let rate = self.modulation_rate.next();
        let (offset_left, offset_right) = self.lfo.next(depth, rate, self.sample_rate);
        let delay_left = self.delay[0].next();
        let delay_right = self.delay[1].next();

        let tap_left = self.buffer.read_behind(0, delay_left, offset_left) * fade;
        let tap_right = self.buffer.read_behind(1, delay_right, offset_right) * fade;

        let feedback_left = self.feedback_tap(0, tap_left);
        let feedback_right = self.feedback_tap(1, tap_right);

        let controls = self.controls;
        let input_left = self.input_filters.process(
            0,
            left,
            controls.input_low_cut,
            controls.input_high_cut,
            self.sample_rate,
        );
        let input_right = self.input_filters.process(
            1,
            right,
            controls.input_low_cut,
            controls.input_high_cut,
            self.sample_rate,
        );

        let input_gain = self.input_gain.next();
        let feedback = self.feedback.next();
        let crossfeed = self.crossfeed.next();
        let ping_pong = self.committed.is_some_and(|settings| settings.ping_pong);

        let (write_left, write_right) = if ping_pong {
            (
                input_gain * PING_PONG_INPUT_GAIN * (input_left + input_right)
                    + feedback_right * crossfeed,
                feedback_left * crossfeed,
            )
        } else {
            (
                input_gain * input_left + feedback_left * feedback + feedback_right * crossfeed,
                input_gain * input_right + feedback_right * feedback + feedback_left * crossfeed,
            )
        };
        self.buffer.write(0, write_left);
        self.buffer.write(1, write_right);
        if self.written < self.fill_target {
            self.written += 1;
        }

        let dry = self.dry.next();
        let wet = self.wet.next();
        let output = (left * dry + tap_left * wet, right * dry + tap_right * wet);

        self.buffer.advance();
        output
    }

    /// Limit and filter a wet tap before it goes back into the buffer.
    fn feedback_tap(&mut self, channel: usize, tap: f32) -> f32 {
        let limited = self.limiters[channel].process(tap);
        self.feedback_filters.process(
            channel,
            limited,
            self.controls.feedback_low_cut,
            self.controls.feedback_high_cut,
            self.sample_rate,
        )
    }

    /// Disabled without trails: the wet path must stay silent.
    fn is_muted(&self) -> bool {
        !self.controls.enabled && !self.controls.trails
    }

    fn resolve_settings(controls: &DelayControls) -> DelaySettings {
        let tempo = tempo::select_tempo(
            controls.tempo_mode,
            controls.host_tempo,
            controls.user_tempo,
            controls.tap_tempo,
        );
        DelaySettings {
            tempo: tempo::clamp_tempo(tempo),
            divider_left: controls.divider_left,
            divider_right: controls.divider_right,
            ping_pong: controls.ping_pong,
        }
    }

    /// Lay the buffer out for the pending settings: new delay lengths,
    /// cleared buffer, write head at 0, waiting to fill.
    fn commit(&mut self) {
        let settings = self.pending;
        let longest = self.buffer.capacity() - self.margin - 1;
        let resolve = |divider: Divider| {
            tempo::delay_samples(settings.tempo, divider, self.sample_rate)
                .clamp(self.margin, longest)
        };
        let left = resolve(settings.divider_left);
        let right = resolve(settings.divider_right);

        self.delay[0].reset_to(left as f32);
        self.delay[1].reset_to(right as f32);
        self.buffer.clear();
        for limiter in &mut self.limiters {
            limiter.reset();
        }
        self.feedback_filters.reset();

        // Both read heads, at their widest modulation swing, must sit over
        // audio written after this commit before the fade in starts.
        self.written = 0;
        self.fill_target = left.max(right) + self.margin;
        self.committed = Some(settings);
        self.crossfade.begin_fill();

        nih_debug_assert!(self.buffer.write_pos() == 0);
        nih_debug_assert!(left + self.margin < self.buffer.capacity());
    }
}
