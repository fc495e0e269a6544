//! Phase-coherent multi-carrier NCO
//!
//! A single master phase accumulator `φ ∈ [0, 1)` advances by
//! `Δφ = f / fs` per output sample; the 19 kHz pilot, 38 kHz subcarrier and
//! 57 kHz RDS carrier are the 1×, 2× and 3× harmonics of that one phase, so
//! they cannot drift relative to each other. Waveforms come from the shared
//! sine table with linear interpolation; no trigonometric call happens per
//! sample, and phases are reduced modulo 1 by subtraction (never by a
//! floating-point modulo).

use mpx_core::{sin_norm, sine_table, Sample};

#[derive(Debug, Clone)]
pub struct Nco {
    /// Normalized master phase [0,1)
    phase: f32,
    /// Normalized phase increment per sample
    phase_inc: f32,
}

impl Nco {
    pub fn new(freq_hz: f32, sample_rate: f32) -> Self {
        // Touch the table now so no lazy-init branch remains on the audio path.
        let _ = sine_table();
        let mut nco = Self {
            phase: 0.0,
            phase_inc: 0.0,
        };
        nco.set_frequency(freq_hz, sample_rate);
        nco
    }

    pub fn set_frequency(&mut self, freq_hz: f32, sample_rate: f32) {
        self.phase_inc = if sample_rate > 0.0 {
            freq_hz / sample_rate
        } else {
            0.0
        };
    }

    /// Back to zero phase. Not called in steady state.
    pub fn reset(&mut self) {
        self.phase = 0.0;
    }

    pub fn phase(&self) -> f32 {
        self.phase
    }

    pub fn phase_inc(&self) -> f32 {
        self.phase_inc
    }

    /// Set the master phase, wrapped into [0,1).
    pub fn set_phase(&mut self, p: f32) {
        let mut phase = p - p.trunc();
        if phase < 0.0 {
            phase += 1.0;
        }
        if phase >= 1.0 {
            phase -= 1.0;
        }
        self.phase = phase;
    }

    /// Fill three buffers with coherent harmonics of the master phase:
    /// `pilot = sin(2πφ)`, `sub = sin(2π·(2φ mod 1))`, `rds = sin(2π·(3φ mod 1))`.
    ///
    /// The master phase is continuous across calls; there is no per-block
    /// reset.
    pub fn generate_harmonics(
        &mut self,
        pilot: &mut [Sample],
        sub: &mut [Sample],
        rds: &mut [Sample],
        samples: usize,
    ) {
        debug_assert!(pilot.len() >= samples && sub.len() >= samples && rds.len() >= samples);
        let table = sine_table();

        for i in 0..samples {
            let mut p1 = self.phase;
            if p1 >= 1.0 {
                p1 -= 1.0;
            }

            let mut p2 = self.phase * 2.0;
            while p2 >= 1.0 {
                p2 -= 1.0;
            }

            let mut p3 = self.phase * 3.0;
            while p3 >= 1.0 {
                p3 -= 1.0;
            }

            pilot[i] = sin_norm(table, p1);
            sub[i] = sin_norm(table, p2);
            rds[i] = sin_norm(table, p3);

            self.phase += self.phase_inc;
            if self.phase >= 1.0 {
                self.phase -= 1.0;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FS: f32 = 192_000.0;

    fn generate(nco: &mut Nco, n: usize) -> (Vec<f32>, Vec<f32>, Vec<f32>) {
        let mut p = vec![0.0f32; n];
        let mut s = vec![0.0f32; n];
        let mut r = vec![0.0f32; n];
        nco.generate_harmonics(&mut p, &mut s, &mut r, n);
        (p, s, r)
    }

    #[test]
    fn test_carrier_coherence() {
        // C38 and C57 must track exactly 2× and 3× the master phase: replay
        // the same accumulation and derive all three values from one φ.
        let mut nco = Nco::new(19_000.0, FS);
        let inc = nco.phase_inc();
        let (p, s, r) = generate(&mut nco, 4096);
        let table = sine_table();
        let mut phi = 0.0f32;
        for i in 0..4096 {
            let mut p2 = phi * 2.0;
            while p2 >= 1.0 {
                p2 -= 1.0;
            }
            let mut p3 = phi * 3.0;
            while p3 >= 1.0 {
                p3 -= 1.0;
            }
            assert_eq!(p[i], sin_norm(table, phi), "pilot i={i}");
            assert_eq!(s[i], sin_norm(table, p2), "sub i={i}");
            assert_eq!(r[i], sin_norm(table, p3), "rds i={i}");
            phi += inc;
            if phi >= 1.0 {
                phi -= 1.0;
            }
        }
    }

    #[test]
    fn test_phase_continuous_across_blocks() {
        let mut whole = Nco::new(19_000.0, FS);
        let mut split = Nco::new(19_000.0, FS);
        let (pw, ..) = generate(&mut whole, 512);
        let (pa, ..) = generate(&mut split, 256);
        let (pb, ..) = generate(&mut split, 256);
        assert_eq!(&pw[..256], &pa[..]);
        assert_eq!(&pw[256..], &pb[..]);
    }

    #[test]
    fn test_rollover_has_no_discontinuity() {
        // Walk through many rollovers of φ; successive pilot samples must
        // never jump by more than the per-sample slope bound 2π·Δφ.
        let mut nco = Nco::new(19_000.0, FS);
        let (p, ..) = generate(&mut nco, 8192);
        let max_step = (std::f32::consts::TAU * nco.phase_inc()) * 1.05;
        for i in 1..8192 {
            assert!(
                (p[i] - p[i - 1]).abs() <= max_step,
                "jump at {i}: {} -> {}",
                p[i - 1],
                p[i]
            );
        }
    }

    #[test]
    fn test_set_phase_wraps() {
        let mut nco = Nco::new(19_000.0, FS);
        nco.set_phase(2.75);
        assert!((nco.phase() - 0.75).abs() < 1e-6);
        nco.set_phase(-0.25);
        assert!((nco.phase() - 0.75).abs() < 1e-6);
    }

    #[test]
    fn test_reset_idempotent() {
        let mut nco = Nco::new(19_000.0, FS);
        let _ = generate(&mut nco, 100);
        nco.reset();
        assert_eq!(nco.phase(), 0.0);
        let fresh = Nco::new(19_000.0, FS);
        assert_eq!(nco.phase(), fresh.phase());
        assert_eq!(nco.phase_inc(), fresh.phase_inc());
    }
}
