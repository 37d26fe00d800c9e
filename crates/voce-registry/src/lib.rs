//! Module-core registry and factory for the voce synthesis engine.
//!
//! Voices select their DSP algorithms ("cores") by a stable integer index so
//! that a core can be hot-swapped at run time without the voice graph
//! changing shape. This crate owns the index → factory mapping:
//!
//! - The built-in cores from `voce-cores` occupy the low indices, with the
//!   engine's fallback default at index 0 of each family.
//! - External code may register additional cores by name before the engine
//!   is constructed; registration returns the assigned index.
//! - Descriptors (name + mod-knob labels) are advisory metadata for host
//!   UIs; they have no effect on audio.
//!
//! Creating a core with an index that has no registration falls back to the
//! default core silently - a missing algorithm must never stop audio. The
//! host-side config layer is responsible for reporting that fallback.
//!
//! # Example
//!
//! ```rust
//! use voce_registry::{CoreRegistry, ModuleFamily};
//!
//! let registry = CoreRegistry::with_builtins();
//!
//! // List oscillator cores for a UI.
//! for desc in registry.descriptors(ModuleFamily::Oscillator) {
//!     println!("{}: {}", desc.index, desc.name);
//! }
//!
//! // Instantiate by index; out-of-range falls back to index 0.
//! let osc = registry.create_oscillator(1, 48000.0);
//! assert_eq!(osc.name(), "wavetable");
//! ```

#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

use alloc::boxed::Box;
use alloc::string::String;
use alloc::vec::Vec;

use voce_core::{EnvelopeCore, FilterCore, LfoCore, OscillatorCore};
use voce_cores::{
    AnalogEnvelopeCore, ClassicLfoCore, LadderFilterCore, LinearEnvelopeCore, SvfFilterCore,
    VaOscillatorCore, WavetableOscillatorCore,
};

/// Module family a core belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModuleFamily {
    /// Audio-rate signal generators.
    Oscillator,
    /// Per-voice audio filters.
    Filter,
    /// Envelope generators.
    Envelope,
    /// Low-frequency oscillators.
    Lfo,
}

/// Advisory metadata for one registered core.
#[derive(Debug, Clone)]
pub struct CoreDescriptor {
    /// Stable index used by parameter structs to select this core.
    pub index: usize,
    /// Family the core renders for.
    pub family: ModuleFamily,
    /// Display name, also used by the config layer to resolve names.
    pub name: String,
    /// Labels for the four general-purpose mod knobs.
    pub mod_knob_labels: [&'static str; 4],
}

/// Boxed factory: sample rate in, core out.
type OscFactory = Box<dyn Fn(f32) -> Box<dyn OscillatorCore> + Send + Sync>;
type FilterFactory = Box<dyn Fn(f32) -> Box<dyn FilterCore> + Send + Sync>;
type EnvelopeFactory = Box<dyn Fn(f32) -> Box<dyn EnvelopeCore> + Send + Sync>;
type LfoFactory = Box<dyn Fn(f32) -> Box<dyn LfoCore> + Send + Sync>;

struct Entry<F> {
    name: String,
    mod_knob_labels: [&'static str; 4],
    factory: F,
}

/// Registry mapping stable integer indices to core factories, per family.
///
/// Constructed before the engine; the engine holds it for the lifetime of
/// the plugin instance and consults it when a parameter snapshot selects a
/// different core index.
pub struct CoreRegistry {
    oscillators: Vec<Entry<OscFactory>>,
    filters: Vec<Entry<FilterFactory>>,
    envelopes: Vec<Entry<EnvelopeFactory>>,
    lfos: Vec<Entry<LfoFactory>>,
}

impl CoreRegistry {
    /// Create an empty registry with no cores at all.
    ///
    /// Useful for hosts that supply their own full algorithm set. Most
    /// callers want [`with_builtins`](Self::with_builtins) so that index 0
    /// of every family is populated for fallback.
    pub fn new() -> Self {
        Self {
            oscillators: Vec::new(),
            filters: Vec::new(),
            envelopes: Vec::new(),
            lfos: Vec::new(),
        }
    }

    /// Create a registry pre-loaded with the built-in cores.
    ///
    /// | Family | Index 0 | Index 1 |
    /// |--------|---------|---------|
    /// | Oscillator | `va` | `wavetable` |
    /// | Filter | `svf` | `ladder` |
    /// | Envelope | `analog` | `linear` |
    /// | LFO | `classic` | - |
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register_oscillator("va", ["Shape", "-", "-", "-"], |sr| {
            Box::new(VaOscillatorCore::new(sr))
        });
        registry.register_oscillator("wavetable", ["Morph", "-", "-", "-"], |sr| {
            Box::new(WavetableOscillatorCore::new(sr))
        });
        registry.register_filter("svf", ["-", "-", "-", "-"], |sr| {
            Box::new(SvfFilterCore::new(sr))
        });
        registry.register_filter("ladder", ["-", "-", "-", "-"], |sr| {
            Box::new(LadderFilterCore::new(sr))
        });
        registry.register_envelope("analog", ["Start Lvl", "-", "-", "-"], |sr| {
            Box::new(AnalogEnvelopeCore::new(sr))
        });
        registry.register_envelope("linear", ["Start Lvl", "-", "-", "-"], |sr| {
            Box::new(LinearEnvelopeCore::new(sr))
        });
        registry.register_lfo("classic", ["Steps", "-", "-", "-"], |sr| {
            Box::new(ClassicLfoCore::new(sr))
        });
        registry
    }

    /// Register an oscillator core; returns its index.
    pub fn register_oscillator(
        &mut self,
        name: &str,
        mod_knob_labels: [&'static str; 4],
        factory: impl Fn(f32) -> Box<dyn OscillatorCore> + Send + Sync + 'static,
    ) -> usize {
        self.oscillators.push(Entry {
            name: String::from(name),
            mod_knob_labels,
            factory: Box::new(factory),
        });
        self.oscillators.len() - 1
    }

    /// Register a filter core; returns its index.
    pub fn register_filter(
        &mut self,
        name: &str,
        mod_knob_labels: [&'static str; 4],
        factory: impl Fn(f32) -> Box<dyn FilterCore> + Send + Sync + 'static,
    ) -> usize {
        self.filters.push(Entry {
            name: String::from(name),
            mod_knob_labels,
            factory: Box::new(factory),
        });
        self.filters.len() - 1
    }

    /// Register an envelope core; returns its index.
    pub fn register_envelope(
        &mut self,
        name: &str,
        mod_knob_labels: [&'static str; 4],
        factory: impl Fn(f32) -> Box<dyn EnvelopeCore> + Send + Sync + 'static,
    ) -> usize {
        self.envelopes.push(Entry {
            name: String::from(name),
            mod_knob_labels,
            factory: Box::new(factory),
        });
        self.envelopes.len() - 1
    }

    /// Register an LFO core; returns its index.
    pub fn register_lfo(
        &mut self,
        name: &str,
        mod_knob_labels: [&'static str; 4],
        factory: impl Fn(f32) -> Box<dyn LfoCore> + Send + Sync + 'static,
    ) -> usize {
        self.lfos.push(Entry {
            name: String::from(name),
            mod_knob_labels,
            factory: Box::new(factory),
        });
        self.lfos.len() - 1
    }

    /// Instantiate an oscillator core by index, falling back to index 0.
    ///
    /// # Panics
    /// Panics if the family has no registrations at all. With
    /// [`with_builtins`](Self::with_builtins) that cannot happen.
    pub fn create_oscillator(&self, index: usize, sample_rate: f32) -> Box<dyn OscillatorCore> {
        let entry = self
            .oscillators
            .get(index)
            .unwrap_or_else(|| &self.oscillators[0]);
        (entry.factory)(sample_rate)
    }

    /// Instantiate a filter core by index, falling back to index 0.
    pub fn create_filter(&self, index: usize, sample_rate: f32) -> Box<dyn FilterCore> {
        let entry = self.filters.get(index).unwrap_or_else(|| &self.filters[0]);
        (entry.factory)(sample_rate)
    }

    /// Instantiate an envelope core by index, falling back to index 0.
    pub fn create_envelope(&self, index: usize, sample_rate: f32) -> Box<dyn EnvelopeCore> {
        let entry = self
            .envelopes
            .get(index)
            .unwrap_or_else(|| &self.envelopes[0]);
        (entry.factory)(sample_rate)
    }

    /// Instantiate an LFO core by index, falling back to index 0.
    pub fn create_lfo(&self, index: usize, sample_rate: f32) -> Box<dyn LfoCore> {
        let entry = self.lfos.get(index).unwrap_or_else(|| &self.lfos[0]);
        (entry.factory)(sample_rate)
    }

    /// Look up a core index by family and name.
    pub fn index_of(&self, family: ModuleFamily, name: &str) -> Option<usize> {
        match family {
            ModuleFamily::Oscillator => self.oscillators.iter().position(|e| e.name == name),
            ModuleFamily::Filter => self.filters.iter().position(|e| e.name == name),
            ModuleFamily::Envelope => self.envelopes.iter().position(|e| e.name == name),
            ModuleFamily::Lfo => self.lfos.iter().position(|e| e.name == name),
        }
    }

    /// True when `index` has a registration in `family`.
    pub fn contains(&self, family: ModuleFamily, index: usize) -> bool {
        index < self.family_len(family)
    }

    /// Number of registered cores in a family.
    pub fn family_len(&self, family: ModuleFamily) -> usize {
        match family {
            ModuleFamily::Oscillator => self.oscillators.len(),
            ModuleFamily::Filter => self.filters.len(),
            ModuleFamily::Envelope => self.envelopes.len(),
            ModuleFamily::Lfo => self.lfos.len(),
        }
    }

    /// Advisory descriptors for one family, in index order.
    pub fn descriptors(&self, family: ModuleFamily) -> Vec<CoreDescriptor> {
        fn collect<F>(entries: &[Entry<F>], family: ModuleFamily) -> Vec<CoreDescriptor> {
            entries
                .iter()
                .enumerate()
                .map(|(index, e)| CoreDescriptor {
                    index,
                    family,
                    name: e.name.clone(),
                    mod_knob_labels: e.mod_knob_labels,
                })
                .collect()
        }
        match family {
            ModuleFamily::Oscillator => collect(&self.oscillators, family),
            ModuleFamily::Filter => collect(&self.filters, family),
            ModuleFamily::Envelope => collect(&self.envelopes, family),
            ModuleFamily::Lfo => collect(&self.lfos, family),
        }
    }
}

impl Default for CoreRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}
