//! Voice oscillator slot: a boxed core plus its render buffer.
//!
//! The wrapper owns what the graph needs to stay fixed-topology while the
//! algorithm changes underneath: the output buffer, the registry index of
//! the current core, and the hot-swap check that replaces the core when a
//! parameter snapshot selects a different index.

#[cfg(not(feature = "std"))]
extern crate alloc;

#[cfg(feature = "std")]
extern crate std as alloc;

use alloc::boxed::Box;

use voce_core::{MAX_BLOCK_FRAMES, OscModInputs, OscillatorCore, OscillatorParams};
use voce_registry::CoreRegistry;

/// One oscillator slot of a voice.
pub struct SynthOscillator {
    core: Box<dyn OscillatorCore>,
    core_index: usize,
    buffer: [f32; MAX_BLOCK_FRAMES],
    sample_rate: f32,
}

impl SynthOscillator {
    /// Create the slot with the core at `core_index` (falls back to the
    /// registry default for unknown indices).
    pub fn new(registry: &CoreRegistry, core_index: usize, sample_rate: f32) -> Self {
        Self {
            core: registry.create_oscillator(core_index, sample_rate),
            core_index,
            buffer: [0.0; MAX_BLOCK_FRAMES],
            sample_rate,
        }
    }

    /// Swap the core when the snapshot selects a different index.
    ///
    /// Called at block start, before rendering - a swap mid-block would
    /// glitch. Allocation happens only on an actual swap, which is a
    /// user-initiated configuration change, not steady-state rendering.
    pub fn ensure_core(&mut self, registry: &CoreRegistry, core_index: usize) {
        if core_index != self.core_index {
            self.core = registry.create_oscillator(core_index, self.sample_rate);
            self.core_index = core_index;
        }
    }

    /// Name of the active core.
    pub fn core_name(&self) -> &'static str {
        self.core.name()
    }

    /// Retune and restart the cycle for a fresh note.
    pub fn note_on(&mut self, frequency_hz: f32) {
        self.core.note_on(frequency_hz);
    }

    /// Clear core state.
    pub fn reset(&mut self) {
        self.core.reset();
    }

    /// Propagate a sample-rate change. Initialize/reset time only.
    pub fn set_sample_rate(&mut self, sample_rate: f32) {
        self.sample_rate = sample_rate;
        self.core.set_sample_rate(sample_rate);
    }

    /// Render `frames` samples into the slot buffer and return it.
    pub fn render(
        &mut self,
        params: &OscillatorParams,
        mods: &OscModInputs,
        frames: usize,
    ) -> &[f32] {
        let frames = frames.min(MAX_BLOCK_FRAMES);
        self.core
            .render_block(params, mods, &mut self.buffer[..frames]);
        &self.buffer[..frames]
    }

    /// The most recently rendered block.
    pub fn buffer(&self) -> &[f32] {
        &self.buffer
    }
}
