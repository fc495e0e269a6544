//! Shared sine lookup table
//!
//! One period of sine in a power-of-two table, read with linear
//! interpolation. The table is process-wide immutable state, initialized
//! deterministically the first time it is requested; callers on the audio
//! path fetch the reference once per block so no per-sample initialization
//! branch exists.

use std::sync::OnceLock;

/// Table length (power of two so index wrap is a mask)
pub const SINE_TABLE_LEN: usize = 1024;

static SINE_TABLE: OnceLock<[f32; SINE_TABLE_LEN]> = OnceLock::new();

/// Get the shared sine table, building it on first use.
pub fn sine_table() -> &'static [f32; SINE_TABLE_LEN] {
    SINE_TABLE.get_or_init(|| {
        let mut table = [0.0f32; SINE_TABLE_LEN];
        for (i, slot) in table.iter_mut().enumerate() {
            *slot = (std::f64::consts::TAU * i as f64 / SINE_TABLE_LEN as f64).sin() as f32;
        }
        table
    })
}

/// Evaluate `sin(2π·phase)` for `phase ∈ [0, 1)` by table lookup with
/// linear interpolation between adjacent entries.
#[inline]
pub fn sin_norm(table: &[f32; SINE_TABLE_LEN], phase: f32) -> f32 {
    let mask = SINE_TABLE_LEN - 1;
    let idx_f = phase * SINE_TABLE_LEN as f32;
    let idx = idx_f as usize;
    let frac = idx_f - idx as f32;
    let s0 = table[idx & mask];
    let s1 = table[(idx + 1) & mask];
    s0 + frac * (s1 - s0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quarter_points() {
        let t = sine_table();
        assert!(sin_norm(t, 0.0).abs() < 1e-6);
        assert!((sin_norm(t, 0.25) - 1.0).abs() < 1e-4);
        assert!(sin_norm(t, 0.5).abs() < 1e-4);
        assert!((sin_norm(t, 0.75) + 1.0).abs() < 1e-4);
    }

    #[test]
    fn test_odd_symmetry() {
        // sin(2π·(1−φ)) = −sin(2π·φ) within interpolation error
        let t = sine_table();
        for i in 1..100 {
            let phase = i as f32 / 101.0;
            let a = sin_norm(t, phase);
            let b = sin_norm(t, 1.0 - phase);
            assert!((a + b).abs() < 1e-3, "phase={phase} a={a} b={b}");
        }
    }

    #[test]
    fn test_matches_libm_within_table_error() {
        let t = sine_table();
        for i in 0..1000 {
            let phase = i as f32 / 1000.0;
            let exact = (std::f32::consts::TAU * phase).sin();
            assert!((sin_norm(t, phase) - exact).abs() < 2e-5);
        }
    }
}
