//! DCA - the final per-voice gain and pan stage.
//!
//! Applies the amplitude envelope at sample resolution, velocity scaling,
//! smoothed static gain, matrix amplitude modulation, and constant-power
//! panning (including matrix pan modulation) to turn the mono voice bus into
//! the voice's stereo contribution.

use libm::sincosf;
use voce_core::{DcaParams, SmoothedParam, db_to_linear};

use core::f32::consts::FRAC_PI_4;

/// Per-voice output stage.
#[derive(Debug)]
pub struct Dca {
    gain: SmoothedParam,
    velocity_scale: f32,
}

impl Dca {
    /// Create the stage at the given sample rate with a 5 ms gain ramp.
    pub fn new(sample_rate: f32) -> Self {
        Self {
            gain: SmoothedParam::with_config(1.0, sample_rate, 5.0),
            velocity_scale: 1.0,
        }
    }

    /// Update the sample rate. Initialize/reset time only.
    pub fn set_sample_rate(&mut self, sample_rate: f32) {
        self.gain.set_sample_rate(sample_rate);
    }

    /// Latch the velocity scaling for the sounding note.
    pub fn note_on(&mut self, velocity: u8, params: &DcaParams) {
        let v = f32::from(velocity.min(127)) / 127.0;
        let sensitivity = params.velocity_sensitivity.clamp(0.0, 1.0);
        // At zero sensitivity every note plays at full scale.
        self.velocity_scale = 1.0 - sensitivity + sensitivity * v;
    }

    /// Settle ramps; used on engine reset.
    pub fn reset(&mut self) {
        self.gain.snap_to_target();
    }

    /// Render the stereo contribution.
    ///
    /// `amp_env` is the amplitude EG block; `amp_mod` and `pan_mod` are the
    /// matrix's Amplitude and Pan destination values for this block. Output
    /// is written (not accumulated) into `out_l`/`out_r`.
    pub fn render(
        &mut self,
        params: &DcaParams,
        input: &[f32],
        amp_env: &[f32],
        amp_mod: f32,
        pan_mod: f32,
        out_l: &mut [f32],
        out_r: &mut [f32],
    ) {
        debug_assert_eq!(input.len(), amp_env.len());
        debug_assert_eq!(input.len(), out_l.len());
        debug_assert_eq!(input.len(), out_r.len());

        self.gain
            .set_target(db_to_linear(params.gain_db.clamp(-60.0, 12.0)));

        // Matrix amplitude mod is additive around unity, floored at silence.
        let amp_scale = (1.0 + amp_mod).max(0.0);

        // Constant-power pan, block-rate: angle 0 = full left, pi/2 = full
        // right.
        let pan = (params.pan + pan_mod).clamp(-1.0, 1.0);
        let (sin_a, cos_a) = sincosf((pan + 1.0) * FRAC_PI_4);

        for i in 0..input.len() {
            let g = self.gain.advance() * amp_env[i] * self.velocity_scale * amp_scale;
            let s = input[i] * g;
            out_l[i] = s * cos_a;
            out_r[i] = s * sin_a;
        }
    }
}
