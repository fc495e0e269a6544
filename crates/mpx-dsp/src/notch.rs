//! 19 kHz pilot-band notch
//!
//! Suppresses residual 19 kHz content in the program audio so it cannot beat
//! against the synthesized pilot. One biquad per channel with independent
//! state; the pole radius maps to a quality factor of `Q ≈ 1/(2(1−r))`.

use crate::biquad::{Biquad, BiquadCoeffs};
use mpx_core::Sample;

#[derive(Debug, Clone, Default)]
pub struct PilotNotch {
    left: Biquad,
    right: Biquad,
}

impl PilotNotch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Derive coefficients from `(fs, f0, radius)` and clear both channels.
    pub fn configure(&mut self, sample_rate: f32, f0: f32, radius: f32) {
        let q = if radius > 0.0 && radius < 1.0 {
            1.0 / (2.0 * (1.0 - radius as f64))
        } else {
            25.0
        };
        let coeffs = BiquadCoeffs::notch(f0 as f64, q, sample_rate as f64);
        self.left.set_coeffs(coeffs);
        self.right.set_coeffs(coeffs);
    }

    pub fn reset(&mut self) {
        self.left.reset();
        self.right.reset();
    }

    /// Filter an interleaved stereo block in place. Output is
    /// bit-reproducible for identical input and state.
    pub fn process(&mut self, buffer: &mut [Sample], frames: usize) {
        for f in 0..frames {
            buffer[f * 2] = self.left.process(buffer[f * 2]);
            buffer[f * 2 + 1] = self.right.process(buffer[f * 2 + 1]);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    fn interleaved_tone(freq: f64, fs: f64, frames: usize) -> Vec<f32> {
        let mut buf = vec![0.0f32; frames * 2];
        for f in 0..frames {
            let v = (2.0 * PI * freq * f as f64 / fs).sin() as f32;
            buf[f * 2] = v;
            buf[f * 2 + 1] = v;
        }
        buf
    }

    fn channel_rms(buf: &[f32], ch: usize, from_frame: usize) -> f32 {
        let frames = buf.len() / 2;
        let mut sum = 0.0f32;
        for f in from_frame..frames {
            let v = buf[f * 2 + ch];
            sum += v * v;
        }
        (sum / (frames - from_frame) as f32).sqrt()
    }

    #[test]
    fn test_19k_rejection_at_least_30_db() {
        let fs = 48_000.0;
        let mut notch = PilotNotch::new();
        notch.configure(fs as f32, 19_000.0, 0.98);

        let mut buf = interleaved_tone(19_000.0, fs, 48_000);
        notch.process(&mut buf, 48_000);

        let out_rms = channel_rms(&buf, 0, 24_000);
        let in_rms = std::f32::consts::FRAC_1_SQRT_2;
        let rejection_db = 20.0 * (in_rms / out_rms).log10();
        assert!(rejection_db >= 30.0, "rejection {rejection_db} dB");
    }

    #[test]
    fn test_passband_nearly_untouched() {
        let fs = 48_000.0;
        let mut notch = PilotNotch::new();
        notch.configure(fs as f32, 19_000.0, 0.98);

        let mut buf = interleaved_tone(1_000.0, fs, 48_000);
        notch.process(&mut buf, 48_000);

        let out_rms = channel_rms(&buf, 1, 24_000);
        assert!((out_rms - std::f32::consts::FRAC_1_SQRT_2).abs() < 0.01);
    }

    #[test]
    fn test_bit_reproducible() {
        let fs = 48_000.0;
        let mut a = PilotNotch::new();
        let mut b = PilotNotch::new();
        a.configure(fs as f32, 19_000.0, 0.98);
        b.configure(fs as f32, 19_000.0, 0.98);

        let src = interleaved_tone(5_000.0, fs, 256);
        let mut x = src.clone();
        let mut y = src.clone();
        a.process(&mut x, 256);
        b.process(&mut y, 256);
        assert_eq!(x, y);
    }
}
