//! Voice filter slot: a boxed core processing the voice bus in place.

#[cfg(not(feature = "std"))]
extern crate alloc;

#[cfg(feature = "std")]
extern crate std as alloc;

use alloc::boxed::Box;

use voce_core::{FilterCore, FilterModInputs, FilterParams};
use voce_registry::CoreRegistry;

/// One filter slot of a voice. Filters the oscillator mix in place, so it
/// owns no buffer of its own.
pub struct SynthFilter {
    core: Box<dyn FilterCore>,
    core_index: usize,
    sample_rate: f32,
}

impl SynthFilter {
    /// Create the slot with the core at `core_index`.
    pub fn new(registry: &CoreRegistry, core_index: usize, sample_rate: f32) -> Self {
        Self {
            core: registry.create_filter(core_index, sample_rate),
            core_index,
            sample_rate,
        }
    }

    /// Swap the core when the snapshot selects a different index.
    pub fn ensure_core(&mut self, registry: &CoreRegistry, core_index: usize) {
        if core_index != self.core_index {
            self.core = registry.create_filter(core_index, self.sample_rate);
            self.core_index = core_index;
        }
    }

    /// Name of the active core.
    pub fn core_name(&self) -> &'static str {
        self.core.name()
    }

    /// Clear filter state.
    pub fn reset(&mut self) {
        self.core.reset();
    }

    /// Propagate a sample-rate change. Initialize/reset time only.
    pub fn set_sample_rate(&mut self, sample_rate: f32) {
        self.sample_rate = sample_rate;
        self.core.set_sample_rate(sample_rate);
    }

    /// Filter `buf` in place.
    pub fn render(&mut self, params: &FilterParams, mods: &FilterModInputs, buf: &mut [f32]) {
        self.core.render_block(params, mods, buf);
    }
}
