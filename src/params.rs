//! # Plugin Parameters
//!
//! Parameters are the knobs and switches the user sees in the DAW. Each
//! one has a **unique string ID** (`#[id = "..."]`) the host uses to save
//! and recall presets. Once published, never change these IDs or existing
//! presets will break.
//!
//! ## No Smoothers Here
//!
//! Unlike a plain delay, none of these parameters use an `nih_plug`
//! smoother. The engine reads one raw snapshot per block and runs its own
//! per-sample smoothing, because delay-time changes have to go through the
//! crossfade state machine rather than a ramp.

use std::sync::atomic::{AtomicU32, Ordering};

use nih_plug::prelude::*;

use crate::dsp::lfo;
use crate::dsp::smoother::{MAX_GAIN_DB, MIN_GAIN_DB};
use crate::dsp::tempo::{Divider, TempoMode, MAX_TEMPO_BPM, MIN_TEMPO_BPM};
use crate::engine::{DelayControls, FilterSettings};

/// On/off, cutoff and Q for one filter site. Nested four times with
/// different ID prefixes.
#[derive(Params)]
pub struct FilterParams {
    #[id = "on"]
    pub enabled: BoolParam,

    #[id = "freq"]
    pub frequency: FloatParam,

    /// Resonance at the cutoff. 0.707 is the flattest response; the engine
    /// caps it at 1.4.
    #[id = "q"]
    pub q: FloatParam,
}

impl FilterParams {
    fn new(name: &str, default_frequency: f32) -> Self {
        Self {
            enabled: BoolParam::new(format!("{name} On"), false),
            frequency: FloatParam::new(
                format!("{name} Freq"),
                default_frequency,
                FloatRange::Skewed {
                    min: 20.0,
                    max: 20000.0,
                    // Frequency perception is roughly logarithmic, so give
                    // the low end more knob travel.
                    factor: FloatRange::skew_factor(-2.0),
                },
            )
            .with_value_to_string(formatters::v2s_f32_hz_then_khz(0))
            .with_string_to_value(formatters::s2v_f32_hz_then_khz()),
            q: FloatParam::new(
                format!("{name} Q"),
                0.707,
                FloatRange::Linear { min: 0.1, max: 1.4 },
            )
            .with_step_size(0.01),
        }
    }

    fn settings(&self) -> FilterSettings {
        FilterSettings {
            enabled: self.enabled.value(),
            frequency: self.frequency.value(),
            q: self.q.value(),
        }
    }
}

/// All user-facing parameters for the Loveless Tempo Delay plugin.
#[derive(Params)]
pub struct PluginParams {
    /// Host transport, the tempo knob, or the tap button.
    #[id = "tmode"]
    pub tempo_mode: EnumParam<TempoMode>,

    #[id = "tempo"]
    pub user_tempo: FloatParam,

    /// Press twice to set the tap tempo.
    #[id = "tap"]
    pub tap: BoolParam,

    #[id = "div_l"]
    pub divider_left: EnumParam<Divider>,

    #[id = "div_r"]
    pub divider_right: EnumParam<Divider>,

    /// How much of each channel's repeat goes back into the same channel.
    #[id = "fdbk"]
    pub feedback: FloatParam,

    /// How much of each channel's repeat goes into the *other* channel.
    #[id = "xfeed"]
    pub crossfeed: FloatParam,

    #[id = "dry"]
    pub dry_gain: FloatParam,

    #[id = "wet"]
    pub wet_gain: FloatParam,

    #[nested(id_prefix = "in_lc", group = "Input Low Cut")]
    pub input_low_cut: FilterParams,

    #[nested(id_prefix = "in_hc", group = "Input High Cut")]
    pub input_high_cut: FilterParams,

    #[nested(id_prefix = "fb_lc", group = "Feedback Low Cut")]
    pub feedback_low_cut: FilterParams,

    #[nested(id_prefix = "fb_hc", group = "Feedback High Cut")]
    pub feedback_high_cut: FilterParams,

    #[id = "mod"]
    pub modulation: BoolParam,

    #[id = "mdepth"]
    pub modulation_depth: FloatParam,

    #[id = "mrate"]
    pub modulation_rate: FloatParam,

    /// Mirror the right channel's modulation for a wider chorus.
    #[id = "minv"]
    pub modulation_phase_invert: BoolParam,

    #[id = "enable"]
    pub enabled: BoolParam,

    /// Keep playing buffered repeats after the effect is disabled.
    #[id = "trails"]
    pub trails: BoolParam,

    #[id = "pingpong"]
    pub ping_pong: BoolParam,

    /// Tempo the engine is currently running at, as `f32` bits. Written by
    /// the audio thread for display; not a host parameter.
    pub resolved_tempo: AtomicU32,
}

impl PluginParams {
    /// Snapshot everything the engine needs for one block.
    pub fn controls(&self, host_tempo: Option<f32>, tap_tempo: f32) -> DelayControls {
        DelayControls {
            tempo_mode: self.tempo_mode.value(),
            host_tempo,
            user_tempo: self.user_tempo.value(),
            tap_tempo,
            divider_left: self.divider_left.value(),
            divider_right: self.divider_right.value(),
            feedback: self.feedback.value(),
            crossfeed: self.crossfeed.value(),
            dry_db: self.dry_gain.value(),
            wet_db: self.wet_gain.value(),
            input_low_cut: self.input_low_cut.settings(),
            input_high_cut: self.input_high_cut.settings(),
            feedback_low_cut: self.feedback_low_cut.settings(),
            feedback_high_cut: self.feedback_high_cut.settings(),
            modulation: self.modulation.value(),
            modulation_depth_ms: self.modulation_depth.value(),
            modulation_rate_hz: self.modulation_rate.value(),
            modulation_phase_invert: self.modulation_phase_invert.value(),
            enabled: self.enabled.value(),
            trails: self.trails.value(),
            ping_pong: self.ping_pong.value(),
        }
    }

    pub fn set_resolved_tempo(&self, tempo: f32) {
        self.resolved_tempo.store(tempo.to_bits(), Ordering::Relaxed);
    }
}

impl Default for PluginParams {
    fn default() -> Self {
        Self {
            tempo_mode: EnumParam::new("Tempo Mode", TempoMode::Host),

            user_tempo: FloatParam::new(
                "Tempo",
                120.0,
                FloatRange::Linear {
                    min: MIN_TEMPO_BPM,
                    max: MAX_TEMPO_BPM,
                },
            )
            .with_unit(" BPM")
            .with_step_size(0.1),

            tap: BoolParam::new("Tap", false),

            divider_left: EnumParam::new("Left Division", Divider::Quarter),
            divider_right: EnumParam::new("Right Division", Divider::DottedEighth),

            // 0-100 rather than 0.0-1.0: values above 99 % snap to unity,
            // which the engine decides from the raw percentage.
            feedback: FloatParam::new(
                "Feedback",
                40.0,
                FloatRange::Linear {
                    min: 0.0,
                    max: 100.0,
                },
            )
            .with_unit("%")
            .with_step_size(0.1),

            crossfeed: FloatParam::new(
                "Crossfeed",
                0.0,
                FloatRange::Linear {
                    min: 0.0,
                    max: 100.0,
                },
            )
            .with_unit("%")
            .with_step_size(0.1),

            dry_gain: gain_param("Dry", 0.0),
            wet_gain: gain_param("Wet", -3.0),

            input_low_cut: FilterParams::new("Input Low Cut", 80.0),
            input_high_cut: FilterParams::new("Input High Cut", 12000.0),
            feedback_low_cut: FilterParams::new("Feedback Low Cut", 150.0),
            feedback_high_cut: FilterParams::new("Feedback High Cut", 6000.0),

            modulation: BoolParam::new("Modulation", false),
            modulation_depth: FloatParam::new(
                "Mod Depth",
                2.0,
                FloatRange::Linear {
                    min: 0.0,
                    max: lfo::MAX_DEPTH_MS,
                },
            )
            .with_unit(" ms")
            .with_step_size(0.01),
            modulation_rate: FloatParam::new(
                "Mod Rate",
                0.5,
                FloatRange::Skewed {
                    min: lfo::MIN_RATE_HZ,
                    max: lfo::MAX_RATE_HZ,
                    factor: FloatRange::skew_factor(-1.0),
                },
            )
            .with_unit(" Hz")
            .with_step_size(0.01),
            modulation_phase_invert: BoolParam::new("Mod Phase Invert", false),

            enabled: BoolParam::new("Enabled", true),
            trails: BoolParam::new("Trails", false),
            ping_pong: BoolParam::new("Ping-Pong", false),

            resolved_tempo: AtomicU32::new(120.0_f32.to_bits()),
        }
    }
}

/// A dry or wet level in dB. The bottom of the range is -96 dB, the last
/// value before the gain law cuts to silence.
fn gain_param(name: &str, default_db: f32) -> FloatParam {
    FloatParam::new(
        name,
        default_db,
        FloatRange::Skewed {
            min: MIN_GAIN_DB,
            max: MAX_GAIN_DB,
            // Most of the useful range is within 24 dB of unity.
            factor: FloatRange::skew_factor(1.5),
        },
    )
    .with_unit(" dB")
    .with_value_to_string(formatters::v2s_f32_rounded(1))
}
