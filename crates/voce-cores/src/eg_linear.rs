//! Constant-slope envelope core.
//!
//! Every segment moves at a fixed rate derived from its time parameter, the
//! full-scale slope: attack covers 0 to 1 in `attack_ms`, release covers 1 to
//! 0 in `release_ms`. Starting a segment from a partial level therefore takes
//! proportionally less time, which is the classic digital-envelope behavior
//! and a useful contrast to the RC curves of the analog core.
//!
//! Phase machine semantics (retrigger, legato, shutdown) match the analog
//! core exactly - they are part of the `EnvelopeCore` contract, not the
//! segment shape.

use voce_core::{EgPhase, EnvelopeCore, EnvelopeParams};

const SHUTDOWN_MS: f32 = 1.5;

/// Linear-segment ADSR envelope core with shutdown support.
///
/// ## Mod knobs
/// - A: attack start level. A fresh trigger from `Idle` begins the attack at
///   this level instead of zero.
#[derive(Debug, Clone)]
pub struct LinearEnvelopeCore {
    phase: EgPhase,
    level: f32,
    sample_rate: f32,
    shutdown_inc: f32,
}

impl LinearEnvelopeCore {
    /// Create a core at the given sample rate.
    pub fn new(sample_rate: f32) -> Self {
        Self {
            phase: EgPhase::Idle,
            level: 0.0,
            sample_rate,
            shutdown_inc: 0.0,
        }
    }

    /// Full-scale per-sample increment for a segment time.
    #[inline]
    fn slope(&self, ms: f32) -> f32 {
        let samples = ms.max(0.1) * self.sample_rate / 1000.0;
        1.0 / samples.max(1.0)
    }

    #[inline]
    fn tick(&mut self, params: &EnvelopeParams) -> f32 {
        let sustain = params.sustain.clamp(0.0, 1.0);
        match self.phase {
            EgPhase::Idle => {
                self.level = 0.0;
            }
            EgPhase::Attack => {
                self.level += self.slope(params.attack_ms);
                if self.level >= 1.0 {
                    self.level = 1.0;
                    self.phase = EgPhase::Decay;
                }
            }
            EgPhase::Decay => {
                self.level -= self.slope(params.decay_ms);
                if self.level <= sustain {
                    self.level = sustain;
                    self.phase = EgPhase::Sustain;
                }
            }
            EgPhase::Sustain => {
                // Walk toward a changed sustain level at the decay rate
                // rather than snapping.
                let step = self.slope(params.decay_ms);
                if self.level > sustain + step {
                    self.level -= step;
                } else if self.level < sustain - step {
                    self.level += step;
                } else {
                    self.level = sustain;
                }
            }
            EgPhase::Release => {
                self.level -= self.slope(params.release_ms);
                if self.level <= 0.0 {
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

impl EnvelopeCore for LinearEnvelopeCore {
    fn name(&self) -> &'static str {
        "linear"
    }

    fn set_sample_rate(&mut self, sample_rate: f32) {
        self.sample_rate = sample_rate;
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
        for s in out.iter_mut() {
            *s = self.tick(params);
        }
    }
}
