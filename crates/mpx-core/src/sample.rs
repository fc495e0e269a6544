//! Sample type and Q31 wire-format conversion
//!
//! Audio samples are normalized `f32` in `[-1.0, +1.0)` everywhere inside the
//! pipeline. On the wire (serial audio peripherals) each sample is 24-bit
//! audio left-justified in a signed 32-bit container (Q31).

/// Type alias for audio samples
pub type Sample = f32;

/// Q31 full scale as a float divisor (2^31)
pub const Q31_FULL_SCALE: f32 = 2_147_483_648.0;

/// Upper clamp bound applied at the output-encode stage.
///
/// This is the single clamp location in the entire pipeline; every other
/// stage is linear and manages headroom by gain staging.
pub const ENCODE_CLAMP_HI: Sample = 0.999_999_9;

/// Convert a Q31 container value to a normalized sample.
#[inline]
pub fn q31_to_sample(raw: i32) -> Sample {
    raw as f32 / Q31_FULL_SCALE
}

/// Clamp to `[-1.0, ENCODE_CLAMP_HI]` and convert to a Q31 container value.
///
/// Only the output-encode stage may call this.
#[inline]
pub fn sample_to_q31(v: Sample) -> i32 {
    let v = v.clamp(-1.0, ENCODE_CLAMP_HI);
    (v * 2_147_483_647.0) as i32
}
