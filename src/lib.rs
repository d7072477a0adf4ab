//! # Loveless Tempo Delay: A Tempo-Synced Stereo Delay Plugin
//!
//! A stereo delay whose repeat times are note divisions of a tempo, built
//! with [nih-plug](https://github.com/robbert-vdh/nih-plug). Outputs Audio
//! Unit (AUv2), VST3, and CLAP formats from a single codebase.
//!
//! The tempo comes from the host transport, the tempo knob, or a tap
//! button. Each channel has its own note division, and changing either the
//! tempo or a division crossfades to the new delay length instead of
//! sweeping the read head.
//!
//! ## Signal Flow
//!
//! ```text
//! Input ──┬─────────────────────────────────────────────── × dry ────┐
//!         │                                                          │
//!         │    ┌─────────────────────────────────────────────────┐   │
//!         │    │                FEEDBACK LOOP                    │   │
//!         │    │                                                 │   │
//!         └─►[low/high cut]─►(+)─► [Stereo Ring Buffer] ─► × fade │   │
//!                             ▲     (read heads at N beats,   │   │   │
//!                             │      wobbled by the LFO)      │   │   │
//!                             │                               ▼   │   │
//!                             │          [Limiter] ─► [low/high cut]  │
//!                             │                               │       │
//!                             └─ × feedback / crossfeed ◄─────┘       │
//!                                                                     │
//!                                          faded tap ─── × wet ──────(+)──► Output
//! ```
//!
//! The DSP lives in [`engine`] and the primitives under [`dsp`]; both are
//! public so the engine can be driven without a plugin host. This file
//! only adapts the engine to the plugin host.

pub mod dsp;
pub mod engine;
mod params;
pub mod tap;

use std::num::NonZeroU32;
use std::sync::Arc;

use engine::DelayEngine;
use nih_plug::prelude::*;
use params::PluginParams;
use tap::TapTempo;

/// The main plugin struct.
///
/// Parameters are shared with the host through an `Arc`; the engine and
/// the tap tempo state belong to the audio thread alone.
struct LovelessTempoDelay {
    params: Arc<PluginParams>,

    /// Built in `initialize()` once the sample rate is known.
    engine: Option<DelayEngine>,

    tap: TapTempo,

    /// Samples processed since the last reset. The tap button is timed
    /// against this clock so tapping needs no system calls.
    clock_samples: u64,
    sample_rate: f32,
}

impl Default for LovelessTempoDelay {
    fn default() -> Self {
        Self {
            params: Arc::new(PluginParams::default()),
            engine: None,
            tap: TapTempo::new(),
            clock_samples: 0,
            sample_rate: 44100.0,
        }
    }
}

impl LovelessTempoDelay {
    fn clock_ms(&self) -> u64 {
        (self.clock_samples as f64 * 1000.0 / self.sample_rate as f64) as u64
    }
}

impl Plugin for LovelessTempoDelay {
    const NAME: &'static str = "Loveless Tempo Delay";
    const VENDOR: &'static str = "Loveless Audio";
    const URL: &'static str = "";
    const EMAIL: &'static str = "steve.loveless@gmail.com";
    const VERSION: &'static str = env!("CARGO_PKG_VERSION");

    // Stereo first. Mono tracks get the left engine channel on both sides.
    const AUDIO_IO_LAYOUTS: &'static [AudioIOLayout] = &[
        AudioIOLayout {
            main_input_channels: NonZeroU32::new(2),
            main_output_channels: NonZeroU32::new(2),
            aux_input_ports: &[],
            aux_output_ports: &[],
            names: PortNames::const_default(),
        },
        AudioIOLayout {
            main_input_channels: NonZeroU32::new(1),
            main_output_channels: NonZeroU32::new(1),
            aux_input_ports: &[],
            aux_output_ports: &[],
            names: PortNames::const_default(),
        },
    ];

    const MIDI_INPUT: MidiConfig = MidiConfig::None;

    // The engine reads one snapshot per block and smooths internally, so
    // splitting blocks at automation points buys nothing.
    const SAMPLE_ACCURATE_AUTOMATION: bool = false;

    type SysExMessage = ();
    type BackgroundTask = ();

    fn params(&self) -> Arc<dyn Params> {
        self.params.clone()
    }

    /// Allocate the delay buffer for the host's sample rate. Returning
    /// `false` tells the host this configuration cannot be used.
    fn initialize(
        &mut self,
        _audio_io_layout: &AudioIOLayout,
        buffer_config: &BufferConfig,
        _context: &mut impl InitContext<Self>,
    ) -> bool {
        self.sample_rate = buffer_config.sample_rate;

        match DelayEngine::new(buffer_config.sample_rate) {
            Ok(engine) => {
                nih_log!(
                    "Delay engine ready at {} Hz, tempo {} BPM",
                    engine.sample_rate(),
                    engine.resolved_tempo()
                );
                self.engine = Some(engine);
                true
            }
            Err(err) => {
                nih_error!("Could not build the delay engine: {err}");
                self.engine = None;
                false
            }
        }
    }

    /// Playback stopped or the plugin was bypassed: drop all buffered
    /// audio and start the next block from a clean state.
    fn reset(&mut self) {
        if let Some(engine) = &mut self.engine {
            engine.reset();
        }
        self.tap.reset();
        self.clock_samples = 0;
    }

    fn process(
        &mut self,
        buffer: &mut Buffer,
        _aux: &mut AuxiliaryBuffers,
        context: &mut impl ProcessContext<Self>,
    ) -> ProcessStatus {
        let now_ms = self.clock_ms();
        if let Some(tempo) = self.tap.update_button(self.params.tap.value(), now_ms) {
            nih_log!("Tap tempo set to {tempo:.1} BPM");
        }
        self.clock_samples += buffer.samples() as u64;

        let Some(engine) = &mut self.engine else {
            nih_warn!("process() called before initialize()");
            return ProcessStatus::Error("Delay engine not initialized");
        };

        let host_tempo = context.transport().tempo.map(|bpm| bpm as f32);
        let controls = self.params.controls(host_tempo, self.tap.tempo());

        let resolved_tempo = match buffer.as_slice() {
            [left, right] => engine.process_block(left, right, &controls),
            [mono] => {
                engine.prepare_block(&controls);
                for sample in mono.iter_mut() {
                    *sample = engine.process_frame(*sample, *sample).0;
                }
                engine.resolved_tempo()
            }
            _ => {
                nih_debug_assert_failure!("Unsupported channel layout");
                return ProcessStatus::Error("Unsupported channel layout");
            }
        };
        self.params.set_resolved_tempo(resolved_tempo);

        ProcessStatus::Tail(engine.tail_samples())
    }
}

// ─────────────────────────────────────────────────────────────────────
// Plugin format trait implementations
// ─────────────────────────────────────────────────────────────────────

impl ClapPlugin for LovelessTempoDelay {
    const CLAP_ID: &'static str = "com.loveless-audio.loveless-tempo-delay";
    const CLAP_DESCRIPTION: Option<&'static str> =
        Some("A tempo-synced stereo delay with crossfaded time changes");
    const CLAP_MANUAL_URL: Option<&'static str> = None;
    const CLAP_SUPPORT_URL: Option<&'static str> = None;
    const CLAP_FEATURES: &'static [ClapFeature] = &[
        ClapFeature::AudioEffect,
        ClapFeature::Stereo,
        ClapFeature::Mono,
        ClapFeature::Delay,
    ];
}

impl Vst3Plugin for LovelessTempoDelay {
    const VST3_CLASS_ID: [u8; 16] = *b"LvlssTempoDly001";
    const VST3_SUBCATEGORIES: &'static [Vst3SubCategory] =
        &[Vst3SubCategory::Fx, Vst3SubCategory::Delay];
}

// ─────────────────────────────────────────────────────────────────────
// Export macros
// ─────────────────────────────────────────────────────────────────────
//
// nih_export_clap! exports `clap_entry`, nih_export_vst3! exports
// `GetPluginFactory`, and clap_wrapper adds the AUv2 entry point for
// Logic Pro.

nih_export_clap!(LovelessTempoDelay);
nih_export_vst3!(LovelessTempoDelay);
clap_wrapper::export_auv2!();
