//! Voice envelope slot: a boxed EG core plus its control buffer.
//!
//! The buffer holds one envelope value per sample - the amplitude envelope
//! feeds the DCA at sample resolution. The matrix reads the slot's last
//! rendered value, the freshest control value available when it evaluates.

#[cfg(not(feature = "std"))]
extern crate alloc;

#[cfg(feature = "std")]
extern crate std as alloc;

use alloc::boxed::Box;

use voce_core::{EgPhase, EnvelopeCore, EnvelopeParams, MAX_BLOCK_FRAMES};
use voce_registry::CoreRegistry;

/// One envelope generator slot of a voice.
pub struct SynthEnvelope {
    core: Box<dyn EnvelopeCore>,
    core_index: usize,
    buffer: [f32; MAX_BLOCK_FRAMES],
    last_value: f32,
    sample_rate: f32,
}

impl SynthEnvelope {
    /// Create the slot with the core at `core_index`.
    pub fn new(registry: &CoreRegistry, core_index: usize, sample_rate: f32) -> Self {
        Self {
            core: registry.create_envelope(core_index, sample_rate),
            core_index,
            buffer: [0.0; MAX_BLOCK_FRAMES],
            last_value: 0.0,
            sample_rate,
        }
    }

    /// Swap the core when the snapshot selects a different index.
    ///
    /// A swap while the envelope is sounding would drop the level to the new
    /// core's idle state; the voice only calls this at block start, and a
    /// sounding envelope keeps its old core until it goes idle.
    pub fn ensure_core(&mut self, registry: &CoreRegistry, core_index: usize) {
        if core_index != self.core_index && !self.core.is_active() {
            self.core = registry.create_envelope(core_index, self.sample_rate);
            self.core_index = core_index;
        }
    }

    /// Name of the active core.
    pub fn core_name(&self) -> &'static str {
        self.core.name()
    }

    /// Gate on (see [`EnvelopeCore::gate_on`]).
    pub fn gate_on(&mut self, params: &EnvelopeParams, legato: bool) {
        self.core.gate_on(params, legato);
    }

    /// Gate off: transition toward release.
    pub fn gate_off(&mut self) {
        self.core.gate_off();
    }

    /// Hard-steal shutdown ramp.
    pub fn shutdown(&mut self) {
        self.core.shutdown();
    }

    /// Force idle at zero.
    pub fn reset(&mut self) {
        self.core.reset();
        self.buffer = [0.0; MAX_BLOCK_FRAMES];
        self.last_value = 0.0;
    }

    /// Propagate a sample-rate change. Initialize/reset time only.
    pub fn set_sample_rate(&mut self, sample_rate: f32) {
        self.sample_rate = sample_rate;
        self.core.set_sample_rate(sample_rate);
    }

    /// Current phase.
    pub fn phase(&self) -> EgPhase {
        self.core.phase()
    }

    /// True while producing output.
    pub fn is_active(&self) -> bool {
        self.core.is_active()
    }

    /// True while releasing or shutting down.
    pub fn is_releasing(&self) -> bool {
        self.core.is_releasing()
    }

    /// Current output level.
    pub fn level(&self) -> f32 {
        self.core.level()
    }

    /// Render `frames` envelope values and return the buffer.
    pub fn render(&mut self, params: &EnvelopeParams, frames: usize) -> &[f32] {
        let frames = frames.min(MAX_BLOCK_FRAMES);
        self.core.render_block(params, &mut self.buffer[..frames]);
        if frames > 0 {
            self.last_value = self.buffer[frames - 1];
        }
        &self.buffer[..frames]
    }

    /// The most recently rendered block.
    pub fn buffer(&self) -> &[f32] {
        &self.buffer
    }

    /// Last value of the most recent block - the matrix source value.
    pub fn last_value(&self) -> f32 {
        self.last_value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slot_walks_through_a_gate_cycle() {
        let registry = CoreRegistry::with_builtins();
        let mut slot = SynthEnvelope::new(&registry, 0, 48000.0);
        let params = EnvelopeParams::default();

        assert_eq!(slot.phase(), EgPhase::Idle);
        slot.gate_on(&params, false);
        slot.render(&params, 64);
        assert!(slot.last_value() > 0.0);
        assert!(slot.is_active());

        slot.gate_off();
        assert!(slot.is_releasing());
    }

    #[test]
    fn core_swap_deferred_while_sounding() {
        let registry = CoreRegistry::with_builtins();
        let mut slot = SynthEnvelope::new(&registry, 0, 48000.0);
        let params = EnvelopeParams::default();

        slot.gate_on(&params, false);
        slot.render(&params, 64);

        // Swap request while active: keep the analog core.
        slot.ensure_core(&registry, 1);
        assert_eq!(slot.core_name(), "analog");

        slot.reset();
        slot.ensure_core(&registry, 1);
        assert_eq!(slot.core_name(), "linear");
    }
}
