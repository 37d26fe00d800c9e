//! Mathematical utilities shared across the synthesis engine.
//!
//! Pitch conversions (MIDI note / cents / semitones to frequency ratios),
//! level conversions (dB to linear and back), and denormal protection.
//! All functions are allocation-free and suitable for `no_std`.

use libm::{expf, logf, powf};

/// Convert a MIDI note number to frequency in Hz.
///
/// Standard tuning: A4 (note 69) = 440 Hz. Accepts fractional note numbers
/// so glide and pitch-bend ramps can interpolate in semitone space.
///
/// # Example
/// ```rust
/// use voce_core::midi_to_freq;
///
/// assert!((midi_to_freq(69.0) - 440.0).abs() < 0.01);
/// assert!((midi_to_freq(60.0) - 261.63).abs() < 0.1);
/// ```
#[inline]
pub fn midi_to_freq(note: f32) -> f32 {
    440.0 * powf(2.0, (note - 69.0) / 12.0)
}

/// Convert cents to a frequency ratio. 100 cents = 1 semitone.
#[inline]
pub fn cents_to_ratio(cents: f32) -> f32 {
    powf(2.0, cents / 1200.0)
}

/// Convert semitones to a frequency ratio. 12 semitones = 1 octave.
#[inline]
pub fn semitones_to_ratio(semitones: f32) -> f32 {
    powf(2.0, semitones / 12.0)
}

/// Convert decibels to linear gain.
///
/// # Example
/// ```rust
/// use voce_core::db_to_linear;
///
/// assert!((db_to_linear(0.0) - 1.0).abs() < 0.001);
/// assert!((db_to_linear(-6.02) - 0.5).abs() < 0.01);
/// ```
#[inline]
pub fn db_to_linear(db: f32) -> f32 {
    // 10^(dB/20) = e^(dB * ln(10)/20)
    const FACTOR: f32 = core::f32::consts::LN_10 / 20.0;
    expf(db * FACTOR)
}

/// Convert linear gain to decibels. Inputs at or below zero clamp to -200 dB.
#[inline]
pub fn linear_to_db(linear: f32) -> f32 {
    const FACTOR: f32 = 20.0 / core::f32::consts::LN_10;
    logf(linear.max(1e-10)) * FACTOR
}

/// Flush denormal values to zero.
///
/// Feedback paths (delay lines, filter states, envelope tails) decay into the
/// denormal range where float arithmetic is 10-100x slower on x86. Values with
/// magnitude below 1e-20 are replaced by exact zero.
#[inline]
pub fn flush_denormal(x: f32) -> f32 {
    if x.abs() < 1e-20 { 0.0 } else { x }
}
