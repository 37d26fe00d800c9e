//! Sample-accurate parameter smoothing.
//!
//! Control values arrive from a UI thread at arbitrary times; the audio
//! thread reads a snapshot at block start and then ramps toward it one sample
//! at a time. Two ramp shapes are provided:
//!
//! - [`SmoothedParam`] - one-pole exponential, natural for gains and cutoffs
//! - [`LinearSmoothedParam`] - constant rate, reaches the target in an exact
//!   number of samples; used for glide and crossfades

use libm::expf;

/// A parameter with one-pole exponential smoothing.
///
/// The ramp follows `y[n] = y[n-1] + coeff * (target - y[n-1])`, a first-order
/// lowpass whose time constant is the configured smoothing time (63.2% of the
/// step after one time constant, ~99.3% after five).
///
/// With a smoothing time of zero the parameter snaps instantly.
#[derive(Debug, Clone)]
pub struct SmoothedParam {
    current: f32,
    target: f32,
    coeff: f32,
    sample_rate: f32,
    smoothing_ms: f32,
}

impl SmoothedParam {
    /// Create an unsmoothed parameter (instant changes until configured).
    pub fn new(initial: f32) -> Self {
        Self {
            current: initial,
            target: initial,
            coeff: 1.0,
            sample_rate: 44100.0,
            smoothing_ms: 0.0,
        }
    }

    /// Create a parameter with sample rate and smoothing time in one call.
    pub fn with_config(initial: f32, sample_rate: f32, smoothing_ms: f32) -> Self {
        let mut p = Self::new(initial);
        p.sample_rate = sample_rate;
        p.smoothing_ms = smoothing_ms;
        p.update_coeff();
        p
    }

    /// Set the value the parameter ramps toward.
    #[inline]
    pub fn set_target(&mut self, target: f32) {
        self.target = target;
    }

    /// Jump to a value with no ramp.
    #[inline]
    pub fn set_immediate(&mut self, value: f32) {
        self.current = value;
        self.target = value;
    }

    /// Update the sample rate; the smoothing time in milliseconds is kept.
    pub fn set_sample_rate(&mut self, sample_rate: f32) {
        self.sample_rate = sample_rate;
        self.update_coeff();
    }

    /// Set the smoothing time constant in milliseconds (0 = instant).
    pub fn set_smoothing_ms(&mut self, ms: f32) {
        self.smoothing_ms = ms;
        self.update_coeff();
    }

    /// Advance one sample and return the smoothed value.
    #[inline]
    pub fn advance(&mut self) -> f32 {
        self.current += self.coeff * (self.target - self.current);
        self.current
    }

    /// Current value without advancing.
    #[inline]
    pub fn get(&self) -> f32 {
        self.current
    }

    /// The target value.
    #[inline]
    pub fn target(&self) -> f32 {
        self.target
    }

    /// True when the ramp has effectively reached its target.
    #[inline]
    pub fn is_settled(&self) -> bool {
        (self.current - self.target).abs() < 1e-6
    }

    /// Jump the ramp to its target.
    #[inline]
    pub fn snap_to_target(&mut self) {
        self.current = self.target;
    }

    fn update_coeff(&mut self) {
        if self.smoothing_ms <= 0.0 || self.sample_rate <= 0.0 {
            self.coeff = 1.0;
        } else {
            let samples_per_tau = self.smoothing_ms * 1e-3 * self.sample_rate;
            self.coeff = 1.0 - expf(-1.0 / samples_per_tau);
        }
    }
}

impl Default for SmoothedParam {
    fn default() -> Self {
        Self::new(0.0)
    }
}

/// A parameter with linear (constant-rate) smoothing.
///
/// Unlike the exponential ramp, this reaches its target in exactly the
/// configured transition time and then stops, which makes it the right tool
/// for glide: pitch moves at a constant rate in semitone space and lands on
/// the destination note precisely.
#[derive(Debug, Clone)]
pub struct LinearSmoothedParam {
    current: f32,
    target: f32,
    increment: f32,
    samples_left: u32,
    sample_rate: f32,
    time_ms: f32,
}

impl LinearSmoothedParam {
    /// Create a new linear ramp at the given initial value.
    pub fn new(initial: f32) -> Self {
        Self {
            current: initial,
            target: initial,
            increment: 0.0,
            samples_left: 0,
            sample_rate: 44100.0,
            time_ms: 0.0,
        }
    }

    /// Create with sample rate and transition time configured.
    pub fn with_config(initial: f32, sample_rate: f32, time_ms: f32) -> Self {
        let mut p = Self::new(initial);
        p.sample_rate = sample_rate;
        p.time_ms = time_ms;
        p
    }

    /// Start a ramp toward `target` over the configured transition time.
    pub fn set_target(&mut self, target: f32) {
        if (target - self.target).abs() < 1e-9 {
            return;
        }
        self.target = target;

        let samples = (self.time_ms * 1e-3 * self.sample_rate) as u32;
        if samples == 0 {
            self.current = target;
            self.increment = 0.0;
            self.samples_left = 0;
        } else {
            self.increment = (target - self.current) / samples as f32;
            self.samples_left = samples;
        }
    }

    /// Jump to a value with no ramp.
    pub fn set_immediate(&mut self, value: f32) {
        self.current = value;
        self.target = value;
        self.increment = 0.0;
        self.samples_left = 0;
    }

    /// Update the sample rate. Takes effect on the next `set_target`.
    pub fn set_sample_rate(&mut self, sample_rate: f32) {
        self.sample_rate = sample_rate;
    }

    /// Set the transition time in milliseconds (0 = instant).
    pub fn set_time_ms(&mut self, ms: f32) {
        self.time_ms = ms.max(0.0);
    }

    /// Advance one sample and return the current value.
    #[inline]
    pub fn advance(&mut self) -> f32 {
        if self.samples_left > 0 {
            self.current += self.increment;
            self.samples_left -= 1;
            if self.samples_left == 0 {
                // Land exactly on the target, no float drift.
                self.current = self.target;
            }
        }
        self.current
    }

    /// Advance `samples` steps at once and return the resulting value.
    ///
    /// Equivalent to calling [`advance`](Self::advance) `samples` times;
    /// used by block-rate consumers (glide reads its pitch once per block).
    #[inline]
    pub fn advance_by(&mut self, samples: u32) -> f32 {
        let steps = samples.min(self.samples_left);
        if steps > 0 {
            self.current += self.increment * steps as f32;
            self.samples_left -= steps;
            if self.samples_left == 0 {
                self.current = self.target;
            }
        }
        self.current
    }

    /// Current value without advancing.
    #[inline]
    pub fn get(&self) -> f32 {
        self.current
    }

    /// The target value.
    #[inline]
    pub fn target(&self) -> f32 {
        self.target
    }

    /// True when the ramp has finished.
    #[inline]
    pub fn is_settled(&self) -> bool {
        self.samples_left == 0
    }
}

impl Default for LinearSmoothedParam {
    fn default() -> Self {
        Self::new(0.0)
    }
}
