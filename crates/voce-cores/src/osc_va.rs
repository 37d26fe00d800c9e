//! Virtual-analog oscillator core with PolyBLEP anti-aliasing.
//!
//! Band-limits the classic waveforms by applying a polynomial correction at
//! waveform discontinuities (PolyBLEP). Saw and pulse correct the step
//! discontinuity directly; triangle integrates a corrected square, which
//! handles the slope discontinuity better than correcting the triangle
//! itself; sine and noise need no correction.

use libm::{floorf, sinf};
use voce_core::{
    OscModInputs, OscWaveform, OscillatorCore, OscillatorParams, cents_to_ratio,
    semitones_to_ratio,
};

use core::f32::consts::PI;

/// Euclidean remainder for f32, usable in no_std.
#[inline]
fn wrap01(a: f32) -> f32 {
    let r = a - floorf(a);
    if r < 0.0 { r + 1.0 } else { r }
}

/// PolyBLEP virtual-analog oscillator core.
///
/// Renders sine, triangle, saw, square, pulse, and white noise. The shape
/// modulation input moves the pulse width for square/pulse waveforms and is
/// ignored by the others.
///
/// ## Mod knobs
/// - A: none (reserved)
#[derive(Debug, Clone)]
pub struct VaOscillatorCore {
    phase: f32,
    phase_inc: f32,
    sample_rate: f32,
    /// Integrator state for the triangle waveform.
    tri_state: f32,
    /// Xorshift32 state for the noise waveform.
    noise_state: u32,
}

impl VaOscillatorCore {
    /// Create a core at the given sample rate.
    pub fn new(sample_rate: f32) -> Self {
        Self {
            phase: 0.0,
            phase_inc: 440.0 / sample_rate,
            sample_rate,
            tri_state: 0.0,
            noise_state: 0x9e3779b9,
        }
    }

    #[inline]
    fn pulse(&self, phase: f32, width: f32, dt: f32) -> f32 {
        let naive = if phase < width { 1.0 } else { -1.0 };
        // Correct the rising edge at phase 0 and the falling edge at `width`.
        naive + poly_blep(phase, dt) - poly_blep(wrap01(phase - width + 1.0), dt)
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

    #[inline]
    fn sample(&mut self, waveform: OscWaveform, width: f32) -> f32 {
        let phase = self.phase;
        let dt = self.phase_inc;
        match waveform {
            OscWaveform::Sine => sinf(phase * 2.0 * PI),
            OscWaveform::Saw => 2.0 * phase - 1.0 - poly_blep(phase, dt),
            OscWaveform::Square => self.pulse(phase, 0.5, dt),
            OscWaveform::Pulse => self.pulse(phase, width, dt),
            OscWaveform::Triangle => {
                // Leaky integration of a corrected square. The leak tracks
                // frequency so DC stays bounded across the audible range.
                let square = self.pulse(phase, 0.5, dt);
                let leak = 1.0 - (self.phase_inc).min(0.1);
                self.tri_state = leak * self.tri_state + square * dt * 4.0;
                self.tri_state
            }
            OscWaveform::Noise => self.noise(),
        }
    }
}

impl OscillatorCore for VaOscillatorCore {
    fn name(&self) -> &'static str {
        "va"
    }

    fn set_sample_rate(&mut self, sample_rate: f32) {
        let freq = self.phase_inc * self.sample_rate;
        self.sample_rate = sample_rate;
        self.phase_inc = freq / sample_rate;
    }

    fn reset(&mut self) {
        self.phase = 0.0;
        self.tri_state = 0.0;
    }

    fn note_on(&mut self, frequency_hz: f32) {
        self.phase_inc = frequency_hz.max(0.0) / self.sample_rate;
        self.phase = 0.0;
        self.tri_state = 0.0;
    }

    fn render_block(&mut self, params: &OscillatorParams, mods: &OscModInputs, out: &mut [f32]) {
        if !params.enabled || params.level <= 0.0 {
            out.fill(0.0);
            return;
        }

        // Control-rate frequency: base (note + glide + bend) x per-slot tuning
        // x matrix pitch modulation, held for the block.
        let freq = mods.frequency_hz
            * cents_to_ratio(params.tuning_cents())
            * semitones_to_ratio(mods.pitch * params.pitch_mod_range);
        // Keep below Nyquist; a clamped pitch is better than foldback.
        self.phase_inc = (freq / self.sample_rate).clamp(0.0, 0.49);

        let width = (params.pulse_width + mods.shape * 0.45).clamp(0.02, 0.98);
        let level = params.level.clamp(0.0, 1.0);

        for s in out.iter_mut() {
            *s = self.sample(params.waveform, width) * level;
            self.phase += self.phase_inc;
            if self.phase >= 1.0 {
                self.phase -= 1.0;
            }
        }
    }
}

/// 4th-order PolyBLEP residual.
///
/// Piecewise degree-4 polynomial fitted to the ideal band-limited step with
/// C2 continuity, spanning two samples on each side of the discontinuity.
/// Suppresses aliasing by roughly 50 dB versus ~30 dB for the common
/// 2nd-order single-sample version.
///
/// Reference: Valimaki et al., "Antialiasing Oscillators", IEEE Signal
/// Processing Magazine, 2010.
#[inline]
fn poly_blep(t: f32, dt: f32) -> f32 {
    const A4: f32 = -43.0 / 48.0;
    const A3: f32 = 7.0 / 6.0;
    const A2: f32 = 0.5;
    const A0: f32 = -1.0;
    const C: f32 = -11.0 / 48.0;

    #[inline]
    fn piece(n: f32) -> f32 {
        if n < 1.0 {
            let n2 = n * n;
            A4 * n2 * n2 + A3 * n2 * n + A2 * n2 + A0
        } else {
            let u = 2.0 - n;
            let u2 = u * u;
            C * u2 * u2
        }
    }

    if dt <= 0.0 {
        return 0.0;
    }
    let dt2 = 2.0 * dt;
    if t < dt2 {
        piece(t / dt)
    } else if t > 1.0 - dt2 {
        -piece((1.0 - t) / dt)
    } else {
        0.0
    }
}
