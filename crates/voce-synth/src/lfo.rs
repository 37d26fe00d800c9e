//! Voice LFO slot: a boxed core plus its control buffer.

#[cfg(not(feature = "std"))]
extern crate alloc;

#[cfg(feature = "std")]
extern crate std as alloc;

use alloc::boxed::Box;

use voce_core::{LfoCore, LfoParams, MAX_BLOCK_FRAMES};
use voce_registry::CoreRegistry;

/// One LFO slot of a voice.
pub struct SynthLfo {
    core: Box<dyn LfoCore>,
    core_index: usize,
    buffer: [f32; MAX_BLOCK_FRAMES],
    last_value: f32,
    sample_rate: f32,
}

impl SynthLfo {
    /// Create the slot with the core at `core_index`.
    pub fn new(registry: &CoreRegistry, core_index: usize, sample_rate: f32) -> Self {
        Self {
            core: registry.create_lfo(core_index, sample_rate),
            core_index,
            buffer: [0.0; MAX_BLOCK_FRAMES],
            last_value: 0.0,
            sample_rate,
        }
    }

    /// Swap the core when the snapshot selects a different index.
    pub fn ensure_core(&mut self, registry: &CoreRegistry, core_index: usize) {
        if core_index != self.core_index {
            self.core = registry.create_lfo(core_index, self.sample_rate);
            self.core_index = core_index;
        }
    }

    /// Name of the active core.
    pub fn core_name(&self) -> &'static str {
        self.core.name()
    }

    /// Note-on notification (phase restart is mode-dependent).
    pub fn note_on(&mut self, params: &LfoParams) {
        self.core.note_on(params);
    }

    /// Clear phase and held state.
    pub fn reset(&mut self) {
        self.core.reset();
        self.last_value = 0.0;
    }

    /// Propagate a sample-rate change. Initialize/reset time only.
    pub fn set_sample_rate(&mut self, sample_rate: f32) {
        self.sample_rate = sample_rate;
        self.core.set_sample_rate(sample_rate);
    }

    /// Render `frames` control values and return the buffer.
    pub fn render(&mut self, params: &LfoParams, bpm: f32, frames: usize) -> &[f32] {
        let frames = frames.min(MAX_BLOCK_FRAMES);
        self.core.render_block(params, bpm, &mut self.buffer[..frames]);
        if frames > 0 {
            self.last_value = self.buffer[frames - 1];
        }
        &self.buffer[..frames]
    }

    /// Last value of the most recent block - the matrix source value.
    pub fn last_value(&self) -> f32 {
        self.last_value
    }
}
