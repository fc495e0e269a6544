//! 4× polyphase FIR upsampler
//!
//! Converts the input-rate stereo block to the output rate using a
//! polyphase decomposition of a 96-tap Kaiser-windowed sinc prototype:
//!
//! ```text
//! H(z) = E0(z^4) + z^-1·E1(z^4) + z^-2·E2(z^4) + z^-3·E3(z^4)
//! ```
//!
//! Each `E_k` has 24 taps and runs at the input rate, so the inserted zeros
//! of naive upsampling never cost a multiply. For every input sample the
//! four sub-filters emit one output sample each:
//! `y[n·4 + k] = Σ_j E_k[j] · x[n−j]`.
//!
//! The per-channel delay lines use mirrored wraparound (every sample is
//! written at `i` and `i + K`) so each convolution reads one contiguous
//! window with no per-tap bounds check.

use mpx_core::Sample;

pub const UPSAMPLE_FACTOR: usize = 4;
pub const TAPS: usize = 96;
pub const PHASES: usize = UPSAMPLE_FACTOR;
pub const TAPS_PER_PHASE: usize = TAPS / PHASES;

/// Kaiser β for ~80 dB stopband attenuation
const KAISER_BETA: f64 = 8.0;
/// Prototype cutoff in Hz (FM audio limit plus transition margin to 19 kHz)
const CUTOFF_HZ: f64 = 15_000.0;

/// Zeroth-order modified Bessel function of the first kind, by series
/// expansion (converges quickly for β ≤ 10).
fn bessel_i0(x: f64) -> f64 {
    let mut sum = 1.0;
    let y = x * x / 4.0;
    let mut term = 1.0;
    for k in 1..50 {
        term *= y / ((k * k) as f64);
        sum += term;
        if term < 1e-12 {
            break;
        }
    }
    sum
}

/// Design the 96-tap prototype at the output rate: ideal sinc at
/// `CUTOFF_HZ`, Kaiser window, normalized so the prototype sums to L
/// (each polyphase sub-filter then sums to ≈ 1 for unity DC gain).
fn design_prototype(sample_rate_out: f64) -> [f64; TAPS] {
    let order = (TAPS - 1) as f64;
    let norm_cut = CUTOFF_HZ / sample_rate_out;

    let mut h = [0.0f64; TAPS];
    for (n, tap) in h.iter_mut().enumerate() {
        let m = n as f64 - order / 2.0;
        let x = 2.0 * std::f64::consts::PI * norm_cut * m;
        let sinc = if x.abs() < 1e-12 { 1.0 } else { x.sin() / x };
        *tap = 2.0 * norm_cut * sinc;
    }

    let denom = bessel_i0(KAISER_BETA);
    for (n, tap) in h.iter_mut().enumerate() {
        let r = (2.0 * n as f64) / order - 1.0;
        *tap *= bessel_i0(KAISER_BETA * (1.0 - r * r).sqrt()) / denom;
    }

    let sum: f64 = h.iter().sum();
    for tap in h.iter_mut() {
        *tap = *tap / sum * UPSAMPLE_FACTOR as f64;
    }
    h
}

#[derive(Debug, Clone)]
pub struct PolyphaseUpsampler {
    phase_coeffs: [[Sample; TAPS_PER_PHASE]; PHASES],
    state_left: [Sample; TAPS_PER_PHASE * 2],
    state_right: [Sample; TAPS_PER_PHASE * 2],
    state_index: usize,
}

impl PolyphaseUpsampler {
    /// Design the prototype and decompose it into the four sub-filters.
    pub fn new(sample_rate_out: f64) -> Self {
        let proto = design_prototype(sample_rate_out);
        let mut phase_coeffs = [[0.0f32; TAPS_PER_PHASE]; PHASES];
        for (k, phase) in phase_coeffs.iter_mut().enumerate() {
            for (j, c) in phase.iter_mut().enumerate() {
                *c = proto[k + j * UPSAMPLE_FACTOR] as f32;
            }
        }
        Self {
            phase_coeffs,
            state_left: [0.0; TAPS_PER_PHASE * 2],
            state_right: [0.0; TAPS_PER_PHASE * 2],
            state_index: 0,
        }
    }

    /// Clear both channels' delay lines (cold-start state).
    pub fn reset(&mut self) {
        self.state_left.fill(0.0);
        self.state_right.fill(0.0);
        self.state_index = 0;
    }

    /// Interpolate `frames` interleaved stereo frames into
    /// `frames · 4` interleaved output frames.
    pub fn process(&mut self, input: &[Sample], output: &mut [Sample], frames: usize) {
        debug_assert!(input.len() >= frames * 2);
        debug_assert!(output.len() >= frames * 2 * UPSAMPLE_FACTOR);

        for n in 0..frames {
            // Walk the write index backwards so the most recent K samples
            // sit in one ascending window starting at the index. The mirror
            // write keeps the window contiguous across the wrap.
            self.state_index = (self.state_index + TAPS_PER_PHASE - 1) % TAPS_PER_PHASE;
            let idx = self.state_index;

            let xl = input[n * 2];
            let xr = input[n * 2 + 1];
            self.state_left[idx] = xl;
            self.state_left[idx + TAPS_PER_PHASE] = xl;
            self.state_right[idx] = xr;
            self.state_right[idx + TAPS_PER_PHASE] = xr;

            let window_l = &self.state_left[idx..idx + TAPS_PER_PHASE];
            let window_r = &self.state_right[idx..idx + TAPS_PER_PHASE];

            for (k, phase) in self.phase_coeffs.iter().enumerate() {
                let mut acc_l = 0.0f32;
                let mut acc_r = 0.0f32;
                for j in 0..TAPS_PER_PHASE {
                    acc_l += phase[j] * window_l[j];
                    acc_r += phase[j] * window_r[j];
                }
                let out_frame = n * UPSAMPLE_FACTOR + k;
                output[out_frame * 2] = acc_l;
                output[out_frame * 2 + 1] = acc_r;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_each_phase_sums_to_unity() {
        let up = PolyphaseUpsampler::new(192_000.0);
        for phase in up.phase_coeffs.iter() {
            let sum: f32 = phase.iter().sum();
            assert!((sum - 1.0).abs() < 1e-4, "phase sum {sum}");
        }
    }

    #[test]
    fn test_output_rate_is_exactly_4x() {
        let mut up = PolyphaseUpsampler::new(192_000.0);
        let input = vec![0.1f32; 64 * 2];
        let mut output = vec![0.0f32; 64 * 2 * UPSAMPLE_FACTOR];
        up.process(&input, &mut output, 64);
        // Every output frame was written: with constant input the tail of
        // the block (past the filter warmup) must be non-zero.
        assert!(output[255 * 2].abs() > 1e-3);
    }

    #[test]
    fn test_dc_gain_unity() {
        use approx::assert_relative_eq;

        let mut up = PolyphaseUpsampler::new(192_000.0);
        let input = vec![0.5f32; 64 * 2];
        let mut output = vec![0.0f32; 64 * 2 * UPSAMPLE_FACTOR];
        // Two blocks: first fills the delay lines, second is steady state.
        up.process(&input, &mut output, 64);
        up.process(&input, &mut output, 64);
        for frame in 0..64 * UPSAMPLE_FACTOR {
            assert_relative_eq!(output[frame * 2], 0.5, epsilon = 1e-3);
            assert_relative_eq!(output[frame * 2 + 1], 0.5, epsilon = 1e-3);
        }
    }

    #[test]
    fn test_impulse_reproduces_prototype() {
        // Feeding a unit impulse must stream the 96 prototype taps out in
        // order: y[m] = h[m].
        let mut up = PolyphaseUpsampler::new(192_000.0);
        let proto = design_prototype(192_000.0);

        let mut input = vec![0.0f32; TAPS_PER_PHASE * 2];
        input[0] = 1.0;
        let mut output = vec![0.0f32; TAPS_PER_PHASE * 2 * UPSAMPLE_FACTOR];
        up.process(&input, &mut output, TAPS_PER_PHASE);

        for m in 0..TAPS {
            let expected = proto[m] as f32;
            let got = output[m * 2];
            assert!(
                (got - expected).abs() < 1e-6,
                "tap {m}: got {got}, expected {expected}"
            );
        }
    }

    #[test]
    fn test_block_split_equals_whole() {
        let mut whole = PolyphaseUpsampler::new(192_000.0);
        let mut split = PolyphaseUpsampler::new(192_000.0);

        let input: Vec<f32> = (0..128).map(|i| ((i * 31) % 17) as f32 / 17.0 - 0.5).collect();
        let mut out_a = vec![0.0f32; 128 * UPSAMPLE_FACTOR];
        whole.process(&input, &mut out_a, 64);

        let mut out_b = vec![0.0f32; 128 * UPSAMPLE_FACTOR];
        split.process(&input[..64], &mut out_b[..64 * UPSAMPLE_FACTOR], 32);
        split.process(&input[64..], &mut out_b[64 * UPSAMPLE_FACTOR..], 32);

        for (a, b) in out_a.iter().zip(out_b.iter()) {
            assert_eq!(a, b);
        }
    }

    #[test]
    fn test_reset_idempotent() {
        let mut up = PolyphaseUpsampler::new(192_000.0);
        let fresh = PolyphaseUpsampler::new(192_000.0);
        let input = vec![0.3f32; 64];
        let mut output = vec![0.0f32; 64 * UPSAMPLE_FACTOR];
        up.process(&input, &mut output, 32);
        up.reset();
        assert_eq!(up.state_left, fresh.state_left);
        assert_eq!(up.state_right, fresh.state_right);
        assert_eq!(up.state_index, fresh.state_index);
    }
}
