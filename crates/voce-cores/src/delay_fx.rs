//! Shared stereo delay effect for the engine output bus.
//!
//! Feedback delay with wet/dry mix and an optional ping-pong mode where the
//! feedback crosses between channels. Delay time, feedback, and mix are
//! smoothed so parameter changes and tempo changes never zipper. A requested
//! delay time beyond the line capacity clamps - it never reallocates or
//! overflows on the audio path.

use libm::ceilf;
use voce_core::{DelayLine, DelayParams, SmoothedParam, flush_denormal};

/// Stereo feedback delay with ping-pong mode and tempo sync.
///
/// # Example
/// ```rust
/// use voce_cores::StereoDelay;
/// use voce_core::DelayParams;
///
/// let mut delay = StereoDelay::new(48000.0);
/// let mut params = DelayParams::default();
/// params.enabled = true;
/// params.time_ms = 250.0;
/// delay.set_params(&params, 120.0);
///
/// let (l, r) = delay.process(0.5, 0.5);
/// ```
#[derive(Debug, Clone)]
pub struct StereoDelay {
    line_l: DelayLine,
    line_r: DelayLine,
    time_samples: SmoothedParam,
    feedback: SmoothedParam,
    mix: SmoothedParam,
    sample_rate: f32,
    ping_pong: bool,
    enabled: bool,
}

impl StereoDelay {
    /// Create a delay with a 2-second maximum time.
    pub fn new(sample_rate: f32) -> Self {
        Self::with_max_delay_ms(sample_rate, 2000.0)
    }

    /// Create a delay with a custom maximum time. Allocation happens here
    /// and in [`set_sample_rate`](Self::set_sample_rate) only.
    pub fn with_max_delay_ms(sample_rate: f32, max_delay_ms: f32) -> Self {
        let capacity = ceilf(max_delay_ms.max(1.0) / 1000.0 * sample_rate) as usize;
        Self {
            line_l: DelayLine::new(capacity),
            line_r: DelayLine::new(capacity),
            time_samples: SmoothedParam::with_config(
                (300.0 / 1000.0 * sample_rate).min(capacity as f32 - 1.0),
                sample_rate,
                50.0,
            ),
            feedback: SmoothedParam::with_config(0.4, sample_rate, 10.0),
            mix: SmoothedParam::with_config(0.3, sample_rate, 10.0),
            sample_rate,
            ping_pong: false,
            enabled: false,
        }
    }

    /// Apply a parameter snapshot. With tempo sync on, the delay time comes
    /// from the note division at the given BPM; either way it clamps to the
    /// line capacity.
    pub fn set_params(&mut self, params: &DelayParams, bpm: f32) {
        self.enabled = params.enabled;
        self.ping_pong = params.ping_pong;

        let time_ms = if params.tempo_sync {
            params.division.to_ms(bpm.max(1.0))
        } else {
            params.time_ms
        };
        let samples = time_ms.max(0.0) / 1000.0 * self.sample_rate;
        let max = self.line_l.capacity() as f32 - 1.0;
        self.time_samples.set_target(samples.clamp(1.0, max));

        self.feedback.set_target(params.feedback.clamp(0.0, 0.95));
        self.mix.set_target(params.mix.clamp(0.0, 1.0));
    }

    /// True when the effect is in the signal path.
    pub fn enabled(&self) -> bool {
        self.enabled
    }

    /// Process one stereo frame.
    #[inline]
    pub fn process(&mut self, left: f32, right: f32) -> (f32, f32) {
        if !self.enabled {
            return (left, right);
        }

        let time = self.time_samples.advance();
        let feedback = self.feedback.advance();
        let mix = self.mix.advance();

        let delayed_l = self.line_l.read(time);
        let delayed_r = self.line_r.read(time);

        if self.ping_pong {
            // Feedback crosses channels: a left hit echoes right, then left.
            self.line_l.write(flush_denormal(left + delayed_r * feedback));
            self.line_r.write(flush_denormal(right + delayed_l * feedback));
        } else {
            self.line_l.write(flush_denormal(left + delayed_l * feedback));
            self.line_r.write(flush_denormal(right + delayed_r * feedback));
        }

        (
            left * (1.0 - mix) + delayed_l * mix,
            right * (1.0 - mix) + delayed_r * mix,
        )
    }

    /// Update the sample rate, resizing the delay lines. Initialize/reset
    /// time only - this reallocates.
    pub fn set_sample_rate(&mut self, sample_rate: f32) {
        let max_ms = self.line_l.capacity() as f32 / self.sample_rate * 1000.0;
        let capacity = ceilf(max_ms / 1000.0 * sample_rate).max(1.0) as usize;
        self.sample_rate = sample_rate;
        self.line_l = DelayLine::new(capacity);
        self.line_r = DelayLine::new(capacity);
        self.time_samples.set_sample_rate(sample_rate);
        self.feedback.set_sample_rate(sample_rate);
        self.mix.set_sample_rate(sample_rate);
    }

    /// Clear the delay lines and settle the smoothing ramps.
    pub fn reset(&mut self) {
        self.line_l.clear();
        self.line_r.clear();
        self.time_samples.snap_to_target();
        self.feedback.snap_to_target();
        self.mix.snap_to_target();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn configured(time_ms: f32, mix: f32, ping_pong: bool) -> StereoDelay {
        let mut delay = StereoDelay::new(48000.0);
        let mut params = DelayParams::default();
        params.enabled = true;
        params.time_ms = time_ms;
        params.mix = mix;
        params.feedback = 0.5;
        params.ping_pong = ping_pong;
        delay.set_params(&params, 120.0);
        delay.reset();
        delay
    }

    #[test]
    fn bypassed_delay_is_identity() {
        let mut delay = StereoDelay::new(48000.0);
        let (l, r) = delay.process(0.25, -0.5);
        assert_eq!((l, r), (0.25, -0.5));
    }

    #[test]
    fn impulse_returns_after_delay_time() {
        let mut delay = configured(100.0, 1.0, false);
        delay.process(1.0, 0.0);

        let mut peak_at = 0usize;
        let mut peak = 0.0f32;
        for i in 1..6000 {
            let (l, _) = delay.process(0.0, 0.0);
            if l > peak {
                peak = l;
                peak_at = i;
            }
        }
        // 100 ms at 48 kHz = 4800 samples.
        assert!(peak > 0.9, "echo amplitude {}", peak);
        assert!(
            (peak_at as i64 - 4800).unsigned_abs() < 16,
            "echo at {}",
            peak_at
        );
    }

    #[test]
    fn ping_pong_crosses_channels() {
        let mut delay = configured(50.0, 1.0, true);
        delay.process(1.0, 0.0);

        let mut right_echo = false;
        let mut left_first = false;
        for _ in 0..15000 {
            let (l, r) = delay.process(0.0, 0.0);
            if l.abs() > 0.5 {
                left_first = true;
            }
            if left_first && r.abs() > 0.3 {
                right_echo = true;
                break;
            }
        }
        assert!(left_first, "first echo appears on the fed channel");
        assert!(right_echo, "feedback must cross to the other channel");
    }

    #[test]
    fn oversized_time_clamps_to_capacity() {
        let mut delay = StereoDelay::with_max_delay_ms(48000.0, 100.0);
        let mut params = DelayParams::default();
        params.enabled = true;
        params.time_ms = 10_000.0; // far beyond the 100 ms line
        delay.set_params(&params, 120.0);
        delay.reset();

        // Must not panic; echo arrives at the capacity limit instead.
        delay.process(1.0, 1.0);
        for _ in 0..10000 {
            let (l, r) = delay.process(0.0, 0.0);
            assert!(l.is_finite() && r.is_finite());
        }
    }

    #[test]
    fn tempo_sync_sets_time_from_division() {
        let mut delay = StereoDelay::new(48000.0);
        let mut params = DelayParams::default();
        params.enabled = true;
        params.tempo_sync = true; // quarter note at 120 BPM = 500 ms
        delay.set_params(&params, 120.0);
        delay.reset();

        delay.process(1.0, 0.0);
        let mut peak_at = 0usize;
        let mut peak = 0.0f32;
        for i in 1..30000 {
            let (l, _) = delay.process(0.0, 0.0);
            if l > peak {
                peak = l;
                peak_at = i;
            }
        }
        assert!(
            (peak_at as i64 - 24000).unsigned_abs() < 32,
            "500 ms echo at {}",
            peak_at
        );
    }
}
