//! Exponential (RC-style) envelope core.
//!
//! Segments follow one-pole exponential curves toward a target, the way an
//! analog RC network charges: the attack aims past 1.0 (overshoot target) so
//! it stays snappy instead of flattening out asymptotically, decay and
//! release aim at the sustain level and zero respectively.
//!
//! The phase machine honors the voice contract:
//!
//! - `gate_on` enters `Attack` from any phase, continuing from the current
//!   level - a retrigger mid-release never jumps by more than one sample step.
//! - With `legato` set, a gate-on while already active keeps the phase.
//! - `shutdown` is the hard-steal path: a fast fixed-time linear ramp to
//!   zero, then `Idle`, so a stolen voice fades over ~1.5 ms instead of
//!   clicking.
//! - Segment coefficients refresh whenever the time parameters change,
//!   including mid-segment.

use libm::expf;
use voce_core::{EgPhase, EnvelopeCore, EnvelopeParams};

/// Attack aims at this target and hands over to Decay when the output
/// crosses 1.0.
const ATTACK_TARGET: f32 = 1.2;
/// Duration of the shutdown ramp in milliseconds.
const SHUTDOWN_MS: f32 = 1.5;
/// Below this the release is considered finished.
const SILENCE_FLOOR: f32 = 1e-4;

/// Exponential ADSR envelope core with shutdown support.
///
/// ## Mod knobs
/// - A: attack start level. A fresh trigger from `Idle` begins the attack at
///   this level instead of zero.
#[derive(Debug, Clone)]
pub struct AnalogEnvelopeCore {
    phase: EgPhase,
    level: f32,
    sample_rate: f32,
    shutdown_inc: f32,

    // Cached times so coefficients refresh when the params change.
    attack_ms: f32,
    decay_ms: f32,
    release_ms: f32,
    attack_coeff: f32,
    decay_coeff: f32,
    release_coeff: f32,
}

impl AnalogEnvelopeCore {
    /// Create a core at the given sample rate.
    pub fn new(sample_rate: f32) -> Self {
        let mut core = Self {
            phase: EgPhase::Idle,
            level: 0.0,
            sample_rate,
            shutdown_inc: 0.0,
            attack_ms: -1.0,
            decay_ms: -1.0,
            release_ms: -1.0,
            attack_coeff: 0.0,
            decay_coeff: 0.0,
            release_coeff: 0.0,
        };
        core.refresh_coefficients(&EnvelopeParams::default());
        core
    }

    /// One-pole coefficient reaching ~63% of the target in `ms`.
    #[inline]
    fn coeff(&self, ms: f32) -> f32 {
        let samples = ms.max(0.1) * self.sample_rate / 1000.0;
        expf(-1.0 / samples.max(1.0))
    }

    fn refresh_coefficients(&mut self, params: &EnvelopeParams) {
        if params.attack_ms != self.attack_ms {
            self.attack_ms = params.attack_ms;
            self.attack_coeff = self.coeff(params.attack_ms);
        }
        if params.decay_ms != self.decay_ms {
            self.decay_ms = params.decay_ms;
            self.decay_coeff = self.coeff(params.decay_ms);
        }
        if params.release_ms != self.release_ms {
            self.release_ms = params.release_ms;
            self.release_coeff = self.coeff(params.release_ms);
        }
    }

    #[inline]
    fn tick(&mut self, sustain: f32) -> f32 {
        match self.phase {
            EgPhase::Idle => {
                self.level = 0.0;
            }
            EgPhase::Attack => {
                self.level =
                    ATTACK_TARGET + (self.level - ATTACK_TARGET) * self.attack_coeff;
                if self.level >= 1.0 {
                    self.level = 1.0;
                    self.phase = EgPhase::Decay;
                }
            }
            EgPhase::Decay => {
                self.level = sustain + (self.level - sustain) * self.decay_coeff;
                if (self.level - sustain).abs() < SILENCE_FLOOR {
                    self.level = sustain;
                    self.phase = EgPhase::Sustain;
                }
            }
            EgPhase::Sustain => {
                // Track sustain changes smoothly instead of snapping.
                self.level = sustain + (self.level - sustain) * self.decay_coeff;
            }
            EgPhase::Release => {
                self.level *= self.release_coeff;
                if self.level < SILENCE_FLOOR {
                    self.level = 0.0;
                    self.phase = EgPhase::Idle;
                }
            }
            EgPhase::Shutdown => {
                self.level -= self.shutdown_inc;
                if self.level <= 0.0 {
                    self.level = 0.0;
                    self.phase = EgPhase::Idle;
                }
            }
        }
        self.level
    }
}

impl EnvelopeCore for AnalogEnvelopeCore {
    fn name(&self) -> &'static str {
        "analog"
    }

    fn set_sample_rate(&mut self, sample_rate: f32) {
        self.sample_rate = sample_rate;
        // Force coefficient refresh on the next render.
        self.attack_ms = -1.0;
        self.decay_ms = -1.0;
        self.release_ms = -1.0;
    }

    fn reset(&mut self) {
        self.phase = EgPhase::Idle;
        self.level = 0.0;
    }

    fn phase(&self) -> EgPhase {
        self.phase
    }

    fn level(&self) -> f32 {
        self.level
    }

    fn gate_on(&mut self, params: &EnvelopeParams, legato: bool) {
        if legato && self.phase.is_active() && !self.phase.is_releasing() {
            return;
        }
        if self.phase == EgPhase::Idle {
            self.level = params.mod_knobs[0].clamp(0.0, 1.0);
        }
        // Retrigger keeps the current level - no discontinuity.
        self.refresh_coefficients(params);
        self.phase = EgPhase::Attack;
    }

    fn gate_off(&mut self) {
        if self.phase.is_active() && self.phase != EgPhase::Shutdown {
            self.phase = EgPhase::Release;
        }
    }

    fn shutdown(&mut self) {
        if self.phase == EgPhase::Idle {
            return;
        }
        let samples = (SHUTDOWN_MS * self.sample_rate / 1000.0).max(1.0);
        self.shutdown_inc = self.level / samples;
        self.phase = EgPhase::Shutdown;
    }

    fn render_block(&mut self, params: &EnvelopeParams, out: &mut [f32]) {
        self.refresh_coefficients(params);
        let sustain = params.sustain.clamp(0.0, 1.0);
        for s in out.iter_mut() {
            *s = self.tick(sustain);
        }
    }
}
