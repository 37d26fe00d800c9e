//! Wavetable oscillator core with per-octave band-limited tables.
//!
//! Tables are built additively at construction time: one table per octave,
//! each containing only the harmonics that stay below Nyquist for the top
//! frequency of that octave. Rendering picks the table for the current pitch
//! and reads it with linear interpolation, so no aliasing correction is
//! needed at run time.
//!
//! Memory is allocated once in `new`/`set_sample_rate` (initialize/reset
//! time); the render path only reads.

#[cfg(not(feature = "std"))]
extern crate alloc;

#[cfg(feature = "std")]
extern crate std as alloc;

use alloc::vec;
use alloc::vec::Vec;

use core::f32::consts::PI;
use libm::{floorf, log2f, sinf};
use voce_core::{
    OscModInputs, OscWaveform, OscillatorCore, OscillatorParams, cents_to_ratio,
    semitones_to_ratio,
};

const TABLE_SIZE: usize = 2048;
/// Tables cover fundamentals from 20 Hz upward, one per octave.
const TABLE_BASE_HZ: f32 = 20.0;
const NUM_TABLES: usize = 10;

/// Band-limited wavetable oscillator core.
///
/// Renders sine, triangle, saw, and square from precomputed tables (pulse
/// maps to square; noise falls back to an xorshift generator since it has no
/// meaningful table form). The shape modulation input morphs the selected
/// waveform toward a pure sine, thinning the harmonics.
///
/// ## Mod knobs
/// - A: none (reserved)
#[derive(Debug, Clone)]
pub struct WavetableOscillatorCore {
    phase: f32,
    phase_inc: f32,
    sample_rate: f32,
    /// One bank per supported waveform, each `NUM_TABLES` x `TABLE_SIZE`.
    saw_tables: Vec<Vec<f32>>,
    square_tables: Vec<Vec<f32>>,
    triangle_tables: Vec<Vec<f32>>,
    noise_state: u32,
}

impl WavetableOscillatorCore {
    /// Create a core at the given sample rate, building all tables.
    pub fn new(sample_rate: f32) -> Self {
        let mut core = Self {
            phase: 0.0,
            phase_inc: 440.0 / sample_rate,
            sample_rate,
            saw_tables: Vec::new(),
            square_tables: Vec::new(),
            triangle_tables: Vec::new(),
            noise_state: 0x2545f491,
        };
        core.build_tables();
        core
    }

    fn build_tables(&mut self) {
        let nyquist = self.sample_rate * 0.5;
        self.saw_tables = (0..NUM_TABLES)
            .map(|t| build_table(table_top_freq(t), nyquist, Partial::Saw))
            .collect();
        self.square_tables = (0..NUM_TABLES)
            .map(|t| build_table(table_top_freq(t), nyquist, Partial::Square))
            .collect();
        self.triangle_tables = (0..NUM_TABLES)
            .map(|t| build_table(table_top_freq(t), nyquist, Partial::Triangle))
            .collect();
    }

    /// Table index whose harmonic content is safe for `freq`.
    #[inline]
    fn table_for(&self, freq: f32) -> usize {
        if freq <= TABLE_BASE_HZ {
            return 0;
        }
        let idx = floorf(log2f(freq / TABLE_BASE_HZ)) as usize;
        idx.min(NUM_TABLES - 1)
    }

    #[inline]
    fn lookup(table: &[f32], phase: f32) -> f32 {
        let pos = phase * TABLE_SIZE as f32;
        let i = pos as usize % TABLE_SIZE;
        let frac = pos - floorf(pos);
        let a = table[i];
        let b = table[(i + 1) % TABLE_SIZE];
        a + (b - a) * frac
    }

    #[inline]
    fn noise(&mut self) -> f32 {
        let mut x = self.noise_state;
        x ^= x << 13;
        x ^= x >> 17;
        x ^= x << 5;
        self.noise_state = x;
        (x as i32 as f32) / (i32::MAX as f32)
    }
}

impl OscillatorCore for WavetableOscillatorCore {
    fn name(&self) -> &'static str {
        "wavetable"
    }

    fn set_sample_rate(&mut self, sample_rate: f32) {
        let freq = self.phase_inc * self.sample_rate;
        self.sample_rate = sample_rate;
        self.phase_inc = freq / sample_rate;
        // Harmonic counts depend on Nyquist; rebuild. Reset-time only.
        self.build_tables();
    }

    fn reset(&mut self) {
        self.phase = 0.0;
    }

    fn note_on(&mut self, frequency_hz: f32) {
        self.phase_inc = frequency_hz.max(0.0) / self.sample_rate;
        self.phase = 0.0;
    }

    fn render_block(&mut self, params: &OscillatorParams, mods: &OscModInputs, out: &mut [f32]) {
        if !params.enabled || params.level <= 0.0 {
            out.fill(0.0);
            return;
        }

        let freq = mods.frequency_hz
            * cents_to_ratio(params.tuning_cents())
            * semitones_to_ratio(mods.pitch * params.pitch_mod_range);
        self.phase_inc = (freq / self.sample_rate).clamp(0.0, 0.49);

        let level = params.level.clamp(0.0, 1.0);
        // Positive shape morphs toward a pure fundamental; negative is a
        // no-op for this core.
        let morph = mods.shape.clamp(0.0, 1.0);

        if params.waveform == OscWaveform::Noise {
            for s in out.iter_mut() {
                *s = self.noise() * level;
            }
            return;
        }

        let table_idx = self.table_for(freq);
        for s in out.iter_mut() {
            let wave = match params.waveform {
                OscWaveform::Sine => sinf(self.phase * 2.0 * PI),
                OscWaveform::Saw => Self::lookup(&self.saw_tables[table_idx], self.phase),
                OscWaveform::Square | OscWaveform::Pulse => {
                    Self::lookup(&self.square_tables[table_idx], self.phase)
                }
                OscWaveform::Triangle => {
                    Self::lookup(&self.triangle_tables[table_idx], self.phase)
                }
                OscWaveform::Noise => 0.0,
            };
            let value = if morph > 0.0 {
                let fundamental = sinf(self.phase * 2.0 * PI);
                wave + (fundamental - wave) * morph
            } else {
                wave
            };
            *s = value * level;
            self.phase += self.phase_inc;
            if self.phase >= 1.0 {
                self.phase -= 1.0;
            }
        }
    }
}

/// Highest fundamental a table is used for.
#[inline]
fn table_top_freq(index: usize) -> f32 {
    TABLE_BASE_HZ * libm::powf(2.0, (index + 1) as f32)
}

enum Partial {
    Saw,
    Square,
    Triangle,
}

/// Additively build one band-limited table.
///
/// Harmonic amplitudes follow the Fourier series of the ideal waveform:
/// saw 1/k for all k, square 1/k for odd k, triangle 1/k^2 for odd k with
/// alternating sign. Harmonics at or above Nyquist for `top_freq` are left
/// out; the result is normalized to a peak of 1.
fn build_table(top_freq: f32, nyquist: f32, shape: Partial) -> Vec<f32> {
    let max_harmonic = ((nyquist / top_freq) as usize).max(1);
    let mut table = vec![0.0f32; TABLE_SIZE];

    for k in 1..=max_harmonic {
        let (amp, include) = match shape {
            Partial::Saw => (1.0 / k as f32, true),
            Partial::Square => (1.0 / k as f32, k % 2 == 1),
            Partial::Triangle => {
                let sign = if (k / 2) % 2 == 0 { 1.0 } else { -1.0 };
                (sign / (k * k) as f32, k % 2 == 1)
            }
        };
        if !include {
            continue;
        }
        for (i, s) in table.iter_mut().enumerate() {
            let phase = i as f32 / TABLE_SIZE as f32;
            *s += amp * sinf(2.0 * PI * k as f32 * phase);
        }
    }

    // Normalize to unit peak.
    let peak = table.iter().fold(0.0f32, |m, &s| m.max(s.abs()));
    if peak > 0.0 {
        for s in &mut table {
            *s /= peak;
        }
    }
    table
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn low_tables_have_more_harmonics_than_high() {
        // The lowest table includes everything up to Nyquist; the top table
        // only a handful of partials. Compare high-frequency content via the
        // maximum sample-to-sample difference (a proxy for edge sharpness).
        let core = WavetableOscillatorCore::new(48000.0);
        let sharp = max_step(&core.saw_tables[0]);
        let smooth = max_step(&core.saw_tables[NUM_TABLES - 1]);
        assert!(
            sharp > smooth * 2.0,
            "low table should be sharper: {} vs {}",
            sharp,
            smooth
        );
    }

    fn max_step(table: &[f32]) -> f32 {
        table
            .windows(2)
            .map(|w| (w[1] - w[0]).abs())
            .fold(0.0f32, f32::max)
    }

    #[test]
    fn table_selection_tracks_pitch() {
        let core = WavetableOscillatorCore::new(48000.0);
        assert_eq!(core.table_for(10.0), 0);
        assert_eq!(core.table_for(25.0), 0);
        assert!(core.table_for(440.0) > core.table_for(55.0));
        assert_eq!(core.table_for(100_000.0), NUM_TABLES - 1);
    }

    #[test]
    fn rendered_saw_is_bounded_and_periodic() {
        let mut core = WavetableOscillatorCore::new(48000.0);
        let mut params = OscillatorParams::default();
        params.level = 1.0;
        let mods = OscModInputs {
            frequency_hz: 440.0,
            ..OscModInputs::default()
        };

        let mut signal = vec![0.0f32; 48000];
        for chunk in signal.chunks_mut(64) {
            core.render_block(&params, &mods, chunk);
        }
        for &s in &signal {
            assert!(s.is_finite() && s.abs() <= 1.01, "out of range: {}", s);
        }

        // Count positive-going zero crossings for frequency.
        let mut crossings = 0i32;
        let mut prev = 0.0;
        for &s in &signal {
            if prev <= 0.0 && s > 0.0 {
                crossings += 1;
            }
            prev = s;
        }
        assert!(
            (crossings - 440).abs() <= 3,
            "expected ~440 crossings, got {}",
            crossings
        );
    }

    #[test]
    fn shape_mod_thins_harmonics_toward_sine() {
        let mut core = WavetableOscillatorCore::new(48000.0);
        let mut params = OscillatorParams::default();
        params.level = 1.0;

        let render = |core: &mut WavetableOscillatorCore, shape: f32| -> f32 {
            core.reset();
            let mods = OscModInputs {
                frequency_hz: 220.0,
                shape,
                ..OscModInputs::default()
            };
            let mut buf = vec![0.0f32; 4096];
            for chunk in buf.chunks_mut(64) {
                core.render_block(&params, &mods, chunk);
            }
            max_step_signal(&buf)
        };

        let raw = render(&mut core, 0.0);
        let morphed = render(&mut core, 1.0);
        assert!(
            morphed < raw,
            "full morph should be smoother: {} vs {}",
            morphed,
            raw
        );
    }

    fn max_step_signal(buf: &[f32]) -> f32 {
        buf.windows(2)
            .map(|w| (w[1] - w[0]).abs())
            .fold(0.0f32, f32::max)
    }

    #[test]
    fn disabled_slot_is_silent() {
        let mut core = WavetableOscillatorCore::new(48000.0);
        let mut params = OscillatorParams::default();
        params.enabled = false;
        let mods = OscModInputs::default();
        let mut buf = [0.5f32; 64];
        core.render_block(&params, &mods, &mut buf);
        assert!(buf.iter().all(|&s| s == 0.0));
    }
}
