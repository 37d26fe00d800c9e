//! Classic control LFO core.
//!
//! Phase-accumulator LFO with the standard control waveforms plus
//! sample-and-hold. Control signals have no audible aliasing concern at
//! sub-audio rates, so the waveforms are naive. The rate comes either from
//! the Hz parameter or, with tempo sync enabled, from the host BPM and a
//! note division.

use core::f32::consts::PI;
use libm::{floorf, sinf};
use voce_core::{LfoCore, LfoMode, LfoParams, LfoShape};

/// Phase-accumulator LFO core.
///
/// Output range is [-1, 1] scaled by the depth parameter.
///
/// ## Mod knobs
/// - A: step quantize. Above zero the output snaps to `2 + knob * 14`
///   discrete levels, turning any waveform into a stepped sequence.
#[derive(Debug, Clone)]
pub struct ClassicLfoCore {
    phase: f32,
    sample_rate: f32,
    /// Held value for sample-and-hold, redrawn on phase wrap.
    sh_value: f32,
    noise_state: u32,
}

impl ClassicLfoCore {
    /// Create a core at the given sample rate.
    pub fn new(sample_rate: f32) -> Self {
        Self {
            phase: 0.0,
            sample_rate,
            sh_value: 0.0,
            noise_state: 0x6d2b79f5,
        }
    }

    #[inline]
    fn draw_random(&mut self) -> f32 {
        let mut x = self.noise_state;
        x ^= x << 13;
        x ^= x >> 17;
        x ^= x << 5;
        self.noise_state = x;
        (x as i32 as f32) / (i32::MAX as f32)
    }

    #[inline]
    fn shape_value(&mut self, shape: LfoShape) -> f32 {
        match shape {
            LfoShape::Sine => sinf(self.phase * 2.0 * PI),
            LfoShape::Triangle => {
                if self.phase < 0.5 {
                    4.0 * self.phase - 1.0
                } else {
                    3.0 - 4.0 * self.phase
                }
            }
            LfoShape::Saw => 2.0 * self.phase - 1.0,
            LfoShape::Square => {
                if self.phase < 0.5 { 1.0 } else { -1.0 }
            }
            LfoShape::SampleHold => self.sh_value,
        }
    }
}

/// Snap `value` in [-1, 1] to `steps` discrete levels.
#[inline]
fn quantize(value: f32, steps: u32) -> f32 {
    let unipolar = (value + 1.0) * 0.5;
    let top = (steps - 1) as f32;
    let snapped = floorf(unipolar * steps as f32).min(top) / top;
    snapped * 2.0 - 1.0
}

impl LfoCore for ClassicLfoCore {
    fn name(&self) -> &'static str {
        "classic"
    }

    fn set_sample_rate(&mut self, sample_rate: f32) {
        self.sample_rate = sample_rate;
    }

    fn reset(&mut self) {
        self.phase = 0.0;
        self.sh_value = 0.0;
    }

    fn note_on(&mut self, params: &LfoParams) {
        if params.mode == LfoMode::Retrigger {
            self.phase = 0.0;
            self.sh_value = self.draw_random();
        }
    }

    fn render_block(&mut self, params: &LfoParams, bpm: f32, out: &mut [f32]) {
        let rate = if params.tempo_sync {
            params.division.to_hz(bpm.max(1.0))
        } else {
            params.rate_hz.clamp(0.02, 20.0)
        };
        let phase_inc = rate / self.sample_rate;
        let depth = params.depth.clamp(0.0, 1.0);

        let steps = (params.mod_knobs[0].clamp(0.0, 1.0) * 14.0) as u32;
        let quantized = steps > 0;
        let step_count = steps + 2;

        for s in out.iter_mut() {
            let mut v = self.shape_value(params.shape);
            if quantized {
                v = quantize(v, step_count);
            }
            *s = v * depth;

            self.phase += phase_inc;
            if self.phase >= 1.0 {
                self.phase -= 1.0;
                if params.shape == LfoShape::SampleHold {
                    self.sh_value = self.draw_random();
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use voce_core::NoteDivision;

    const SR: f32 = 48000.0;

    fn run(core: &mut ClassicLfoCore, params: &LfoParams, bpm: f32, n: usize) -> Vec<f32> {
        let mut out = vec![0.0f32; n];
        for chunk in out.chunks_mut(64) {
            core.render_block(params, bpm, chunk);
        }
        out
    }

    #[test]
    fn all_shapes_stay_in_range() {
        for shape in [
            LfoShape::Sine,
            LfoShape::Triangle,
            LfoShape::Saw,
            LfoShape::Square,
            LfoShape::SampleHold,
        ] {
            let mut core = ClassicLfoCore::new(SR);
            let mut params = LfoParams::default();
            params.shape = shape;
            let out = run(&mut core, &params, 120.0, 10000);
            for &v in &out {
                assert!(
                    (-1.0..=1.0).contains(&v),
                    "{:?} out of range: {}",
                    shape,
                    v
                );
            }
        }
    }

    #[test]
    fn one_hz_completes_one_cycle_per_second() {
        let mut core = ClassicLfoCore::new(SR);
        let mut params = LfoParams::default();
        params.rate_hz = 1.0;
        run(&mut core, &params, 120.0, 48000);
        let wrap_error = core.phase.min((core.phase - 1.0).abs());
        assert!(wrap_error < 0.01, "phase after 1 s: {}", core.phase);
    }

    #[test]
    fn tempo_sync_overrides_rate() {
        // Quarter note at 120 BPM = 2 Hz: half a second is one full cycle.
        let mut core = ClassicLfoCore::new(SR);
        let mut params = LfoParams::default();
        params.rate_hz = 0.1;
        params.tempo_sync = true;
        params.division = NoteDivision::Quarter;
        run(&mut core, &params, 120.0, 24000);
        let wrap_error = core.phase.min((core.phase - 1.0).abs());
        assert!(wrap_error < 0.01, "phase after one synced cycle: {}", core.phase);
    }

    #[test]
    fn retrigger_mode_resets_phase_on_note_on() {
        let mut params = LfoParams::default();
        let mut core = ClassicLfoCore::new(SR);
        run(&mut core, &params, 120.0, 1000);
        assert!(core.phase > 0.0);

        // Free mode keeps the phase.
        core.note_on(&params);
        assert!(core.phase > 0.0);

        params.mode = LfoMode::Retrigger;
        core.note_on(&params);
        assert_eq!(core.phase, 0.0);
    }

    #[test]
    fn depth_scales_output() {
        let mut core = ClassicLfoCore::new(SR);
        let mut params = LfoParams::default();
        params.depth = 0.25;
        let out = run(&mut core, &params, 120.0, 10000);
        let peak = out.iter().fold(0.0f32, |m, &v| m.max(v.abs()));
        assert!(peak <= 0.25 + 1e-6 && peak > 0.2, "peak {}", peak);
    }

    #[test]
    fn quantize_knob_produces_discrete_levels() {
        let mut core = ClassicLfoCore::new(SR);
        let mut params = LfoParams::default();
        params.shape = LfoShape::Triangle;
        params.mod_knobs[0] = 0.15; // 2 + 2 = 4 levels
        let out = run(&mut core, &params, 120.0, 48000);

        let mut levels: Vec<i32> = out.iter().map(|v| (v * 1000.0) as i32).collect();
        levels.sort_unstable();
        levels.dedup();
        assert!(
            levels.len() <= 8,
            "expected few discrete levels, got {}",
            levels.len()
        );
    }

    #[test]
    fn sample_hold_holds_between_wraps() {
        let mut core = ClassicLfoCore::new(SR);
        let mut params = LfoParams::default();
        params.shape = LfoShape::SampleHold;
        params.rate_hz = 2.0; // wraps every 24000 samples
        let out = run(&mut core, &params, 120.0, 10000);
        // Well within one cycle: the value never changes.
        assert!(out.windows(2).all(|w| w[0] == w[1]));
    }
}
