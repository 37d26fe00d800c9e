//! Per-voice modulation matrix.
//!
//! A dense enable/intensity grid over two small closed enums: every
//! ([`ModSource`], [`ModDest`]) pair is a cell holding an enable flag and an
//! intensity. On top of the grid sit per-source and per-destination intensity
//! rows, so a host can scale everything a source feeds (or everything a
//! destination receives) with one control.
//!
//! Evaluation is pure summation:
//!
//! ```text
//! value(dest) = sum over enabled (src, dest) of
//!     source_value[src] * cell_intensity[src][dest]
//!     * source_intensity[src] * dest_intensity[dest]
//! ```
//!
//! Summation order cannot affect the result beyond float associativity, and
//! the iteration order here is fixed (source enum order), so evaluation is
//! bit-deterministic for a given configuration - a required property, tested
//! in the integration suite.
//!
//! Two destinations may alias one physical parameter (the per-filter cutoff
//! has a bipolar route and an EG route); the matrix keeps them separate and
//! the destination module combines them.

/// Modulation sources. One slot per voice control-signal generator.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ModSource {
    /// LFO 1 output, bipolar.
    Lfo1,
    /// LFO 2 output, bipolar.
    Lfo2,
    /// Amplitude EG output, unipolar.
    AmpEg,
    /// Filter EG output, unipolar.
    FilterEg,
    /// Auxiliary EG output, unipolar.
    AuxEg,
}

impl ModSource {
    /// Number of sources.
    pub const COUNT: usize = 5;

    /// All sources in index order.
    pub const ALL: [ModSource; Self::COUNT] = [
        ModSource::Lfo1,
        ModSource::Lfo2,
        ModSource::AmpEg,
        ModSource::FilterEg,
        ModSource::AuxEg,
    ];

    /// Dense array index.
    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }
}

/// Modulation destinations.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ModDest {
    /// Oscillator 1 pitch, bipolar, scaled by the slot's pitch mod range.
    Osc1Pitch,
    /// Oscillator 2 pitch.
    Osc2Pitch,
    /// Oscillator 3 pitch.
    Osc3Pitch,
    /// Oscillator 4 pitch.
    Osc4Pitch,
    /// Waveform shape for all oscillator slots (core-defined meaning).
    OscShape,
    /// Filter 1 cutoff, bipolar route.
    Filter1Cutoff,
    /// Filter 2 cutoff, bipolar route.
    Filter2Cutoff,
    /// Filter 1 cutoff, EG-specific route. Summed with the bipolar route by
    /// the filter module.
    Filter1EgCutoff,
    /// Filter 2 cutoff, EG-specific route.
    Filter2EgCutoff,
    /// Amplitude EG retrigger trigger. Edge-detected at block rate and
    /// applied at the next block boundary.
    AmpEgRetrigger,
    /// DCA amplitude modulation.
    Amplitude,
    /// DCA pan modulation.
    Pan,
}

impl ModDest {
    /// Number of destinations.
    pub const COUNT: usize = 12;

    /// All destinations in index order.
    pub const ALL: [ModDest; Self::COUNT] = [
        ModDest::Osc1Pitch,
        ModDest::Osc2Pitch,
        ModDest::Osc3Pitch,
        ModDest::Osc4Pitch,
        ModDest::OscShape,
        ModDest::Filter1Cutoff,
        ModDest::Filter2Cutoff,
        ModDest::Filter1EgCutoff,
        ModDest::Filter2EgCutoff,
        ModDest::AmpEgRetrigger,
        ModDest::Amplitude,
        ModDest::Pan,
    ];

    /// Dense array index.
    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }
}

/// Current values of all modulation sources for one voice.
///
/// Written by the voice's LFOs and EGs each block (after they render), read
/// by the matrix and destination modules, reset at block start. Owned
/// exclusively by one voice.
#[derive(Clone, Copy, Debug, Default)]
pub struct VoiceModValues {
    values: [f32; ModSource::COUNT],
}

impl VoiceModValues {
    /// All sources at zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Value of one source.
    #[inline]
    pub fn get(&self, source: ModSource) -> f32 {
        self.values[source.index()]
    }

    /// Set the value of one source.
    #[inline]
    pub fn set(&mut self, source: ModSource, value: f32) {
        self.values[source.index()] = value;
    }

    /// Zero all sources.
    pub fn reset(&mut self) {
        self.values = [0.0; ModSource::COUNT];
    }
}

/// The matrix configuration: the dense grid plus the intensity rows.
///
/// Every cell defaults to disabled with unit intensity; enabling a route is
/// always explicit. Rebuilt (copied) from host parameters once per block and
/// read-only during rendering.
#[derive(Clone, Copy, Debug)]
pub struct ModMatrixParams {
    enabled: [[bool; ModDest::COUNT]; ModSource::COUNT],
    cell_intensity: [[f32; ModDest::COUNT]; ModSource::COUNT],
    source_intensity: [f32; ModSource::COUNT],
    dest_intensity: [f32; ModDest::COUNT],
}

impl Default for ModMatrixParams {
    fn default() -> Self {
        Self::new()
    }
}

impl ModMatrixParams {
    /// All cells disabled, all intensities 1.0.
    pub fn new() -> Self {
        Self {
            enabled: [[false; ModDest::COUNT]; ModSource::COUNT],
            cell_intensity: [[1.0; ModDest::COUNT]; ModSource::COUNT],
            source_intensity: [1.0; ModSource::COUNT],
            dest_intensity: [1.0; ModDest::COUNT],
        }
    }

    /// Enable or disable one routing cell.
    pub fn set_channel_enable(&mut self, source: ModSource, dest: ModDest, enabled: bool) {
        self.enabled[source.index()][dest.index()] = enabled;
    }

    /// Whether a cell is enabled.
    pub fn channel_enabled(&self, source: ModSource, dest: ModDest) -> bool {
        self.enabled[source.index()][dest.index()]
    }

    /// Set the intensity of one routing cell, clamped to [-1, 1].
    pub fn set_cell_intensity(&mut self, source: ModSource, dest: ModDest, intensity: f32) {
        self.cell_intensity[source.index()][dest.index()] = intensity.clamp(-1.0, 1.0);
    }

    /// Intensity of one routing cell.
    pub fn cell_intensity(&self, source: ModSource, dest: ModDest) -> f32 {
        self.cell_intensity[source.index()][dest.index()]
    }

    /// Set the intensity applied to everything a source feeds, [-1, 1].
    pub fn set_source_intensity(&mut self, source: ModSource, intensity: f32) {
        self.source_intensity[source.index()] = intensity.clamp(-1.0, 1.0);
    }

    /// Per-source intensity.
    pub fn source_intensity(&self, source: ModSource) -> f32 {
        self.source_intensity[source.index()]
    }

    /// Set the intensity applied to everything a destination receives,
    /// [-1, 1].
    pub fn set_dest_intensity(&mut self, dest: ModDest, intensity: f32) {
        self.dest_intensity[dest.index()] = intensity.clamp(-1.0, 1.0);
    }

    /// Per-destination intensity.
    pub fn dest_intensity(&self, dest: ModDest) -> f32 {
        self.dest_intensity[dest.index()]
    }

    /// Convenience: enable a cell and set its intensity in one call.
    pub fn route(&mut self, source: ModSource, dest: ModDest, intensity: f32) {
        self.set_channel_enable(source, dest, true);
        self.set_cell_intensity(source, dest, intensity);
    }

    /// Disable every cell and restore unit intensities.
    pub fn clear(&mut self) {
        *self = Self::new();
    }
}

/// The evaluator. Holds the block's configuration snapshot.
#[derive(Clone, Copy, Debug, Default)]
pub struct ModMatrix {
    params: ModMatrixParams,
}

impl ModMatrix {
    /// Create a matrix with no routes enabled.
    pub fn new() -> Self {
        Self {
            params: ModMatrixParams::new(),
        }
    }

    /// Take the block's configuration snapshot. Pure configuration, no audio
    /// side effect.
    pub fn set_parameters(&mut self, params: &ModMatrixParams) {
        self.params = *params;
    }

    /// The current configuration.
    pub fn params(&self) -> &ModMatrixParams {
        &self.params
    }

    /// Sum all enabled routes into one destination value.
    #[inline]
    pub fn compute_destination(&self, dest: ModDest, sources: &VoiceModValues) -> f32 {
        let d = dest.index();
        let mut total = 0.0;
        for source in ModSource::ALL {
            let s = source.index();
            if self.params.enabled[s][d] {
                total += sources.get(source)
                    * self.params.cell_intensity[s][d]
                    * self.params.source_intensity[s]
                    * self.params.dest_intensity[d];
            }
        }
        total
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_grid_is_fully_disabled() {
        let matrix = ModMatrix::new();
        let mut values = VoiceModValues::new();
        for source in ModSource::ALL {
            values.set(source, 1.0);
        }
        for dest in ModDest::ALL {
            assert_eq!(matrix.compute_destination(dest, &values), 0.0);
        }
    }

    #[test]
    fn single_route_scales_by_all_three_intensities() {
        let mut params = ModMatrixParams::new();
        params.route(ModSource::Lfo1, ModDest::Filter1Cutoff, 0.5);
        params.set_source_intensity(ModSource::Lfo1, 0.5);
        params.set_dest_intensity(ModDest::Filter1Cutoff, 0.5);

        let mut matrix = ModMatrix::new();
        matrix.set_parameters(&params);

        let mut values = VoiceModValues::new();
        values.set(ModSource::Lfo1, 1.0);

        let v = matrix.compute_destination(ModDest::Filter1Cutoff, &values);
        assert!((v - 0.125).abs() < 1e-6, "0.5^3 = 0.125, got {}", v);
    }

    #[test]
    fn routes_sum_across_sources() {
        let mut params = ModMatrixParams::new();
        params.route(ModSource::Lfo1, ModDest::Osc1Pitch, 0.5);
        params.route(ModSource::FilterEg, ModDest::Osc1Pitch, 0.3);

        let mut matrix = ModMatrix::new();
        matrix.set_parameters(&params);

        let mut values = VoiceModValues::new();
        values.set(ModSource::Lfo1, 1.0);
        values.set(ModSource::FilterEg, 0.5);

        let v = matrix.compute_destination(ModDest::Osc1Pitch, &values);
        assert!((v - 0.65).abs() < 1e-6, "0.5 + 0.15 = 0.65, got {}", v);
    }

    #[test]
    fn disabled_cell_contributes_nothing_despite_intensity() {
        let mut params = ModMatrixParams::new();
        params.set_cell_intensity(ModSource::Lfo2, ModDest::Pan, 1.0);

        let mut matrix = ModMatrix::new();
        matrix.set_parameters(&params);

        let mut values = VoiceModValues::new();
        values.set(ModSource::Lfo2, 1.0);
        assert_eq!(matrix.compute_destination(ModDest::Pan, &values), 0.0);
    }

    #[test]
    fn zero_dest_intensity_annihilates_all_routes() {
        let mut params = ModMatrixParams::new();
        for source in ModSource::ALL {
            params.route(source, ModDest::Amplitude, 1.0);
        }
        params.set_dest_intensity(ModDest::Amplitude, 0.0);

        let mut matrix = ModMatrix::new();
        matrix.set_parameters(&params);

        let mut values = VoiceModValues::new();
        for source in ModSource::ALL {
            values.set(source, 1.0);
        }
        assert_eq!(matrix.compute_destination(ModDest::Amplitude, &values), 0.0);
    }

    #[test]
    fn aliased_cutoff_routes_stay_separate() {
        let mut params = ModMatrixParams::new();
        params.route(ModSource::Lfo1, ModDest::Filter1Cutoff, 1.0);
        params.route(ModSource::FilterEg, ModDest::Filter1EgCutoff, 1.0);

        let mut matrix = ModMatrix::new();
        matrix.set_parameters(&params);

        let mut values = VoiceModValues::new();
        values.set(ModSource::Lfo1, 0.25);
        values.set(ModSource::FilterEg, 0.75);

        // Each route only sees its own destination.
        assert!(
            (matrix.compute_destination(ModDest::Filter1Cutoff, &values) - 0.25).abs() < 1e-6
        );
        assert!(
            (matrix.compute_destination(ModDest::Filter1EgCutoff, &values) - 0.75).abs() < 1e-6
        );
    }

    #[test]
    fn mod_values_reset_zeroes_everything() {
        let mut values = VoiceModValues::new();
        for source in ModSource::ALL {
            values.set(source, 0.7);
        }
        values.reset();
        for source in ModSource::ALL {
            assert_eq!(values.get(source), 0.0);
        }
    }
}
