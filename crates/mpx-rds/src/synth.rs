//! RDS 57 kHz subcarrier synthesizer (bit consumer)
//!
//! Runs inside the audio pipeline at the output rate. Per block it:
//! 1. consumes bits non-blockingly from the cross-core FIFO (idle bit = 1
//!    when empty, which keeps receiver clock recovery alive),
//! 2. line-codes them as differential Manchester (bi-phase mark) on a
//!    symbol-rate phase accumulator,
//! 3. bandlimits the square baseband through two cascaded ~2.4 kHz biquad
//!    lowpass sections,
//! 4. modulates the result onto the coherent 57 kHz carrier and scales by
//!    the injection amplitude.

use mpx_core::{Sample, RDS_BIT_RATE};
use mpx_dsp::{Biquad, BiquadCoeffs};
use mpx_rt::BitFifo;

/// Baseband shaping cutoff at the output rate
const SHAPING_CUTOFF_HZ: f64 = 2_400.0;
/// Butterworth-like section Q
const SHAPING_Q: f64 = 0.707;

#[derive(Debug, Clone)]
pub struct RdsSynth {
    /// Symbol phase [0,1)
    sym_phase: f32,
    /// Symbols per sample
    sym_inc: f32,
    /// Differential encoder state
    last_diff: u8,
    /// Mid-symbol toggle for the Manchester transition
    half_toggle: bool,
    lpf1: Biquad,
    lpf2: Biquad,
}

impl RdsSynth {
    pub fn new() -> Self {
        Self {
            sym_phase: 0.0,
            sym_inc: 0.0,
            last_diff: 0,
            half_toggle: false,
            lpf1: Biquad::default(),
            lpf2: Biquad::default(),
        }
    }

    /// Configure symbol timing and shaping filters for the output rate.
    pub fn configure(&mut self, sample_rate: f32) {
        self.sym_inc = if sample_rate > 0.0 {
            RDS_BIT_RATE / sample_rate
        } else {
            0.0
        };
        let coeffs = BiquadCoeffs::lowpass(SHAPING_CUTOFF_HZ, SHAPING_Q, sample_rate as f64);
        self.lpf1.set_coeffs(coeffs);
        self.lpf2.set_coeffs(coeffs);
        self.sym_phase = 0.0;
        self.last_diff = 0;
        self.half_toggle = false;
    }

    pub fn reset(&mut self) {
        self.sym_phase = 0.0;
        self.last_diff = 0;
        self.half_toggle = false;
        self.lpf1.reset();
        self.lpf2.reset();
    }

    /// Fill `out` with the unfiltered ±1 Manchester baseband, consuming
    /// bits from the FIFO at symbol boundaries.
    pub fn fill_baseband(&mut self, fifo: &BitFifo, out: &mut [Sample], samples: usize) {
        let mut sign: f32 = if self.last_diff & 1 != 0 { -1.0 } else { 1.0 };

        for slot in out.iter_mut().take(samples) {
            *slot = sign * if self.half_toggle { -1.0 } else { 1.0 };

            self.sym_phase += self.sym_inc;
            if !self.half_toggle && self.sym_phase >= 0.5 {
                self.half_toggle = true;
            }
            if self.sym_phase >= 1.0 {
                self.sym_phase -= 1.0;
                self.half_toggle = false;

                // Idle bit = 1 when the queue is empty.
                let bit = fifo.pop().unwrap_or(1);
                self.last_diff ^= bit & 1;
                sign = if self.last_diff & 1 != 0 { -1.0 } else { 1.0 };
            }
        }
    }

    /// Generate one output block of 57 kHz RDS injection into `out`.
    pub fn process(
        &mut self,
        fifo: &BitFifo,
        carrier57: &[Sample],
        amp: f32,
        out: &mut [Sample],
        samples: usize,
    ) {
        debug_assert!(carrier57.len() >= samples && out.len() >= samples);

        self.fill_baseband(fifo, out, samples);

        self.lpf1.process_block(&mut out[..samples]);
        self.lpf2.process_block(&mut out[..samples]);

        for i in 0..samples {
            out[i] *= carrier57[i] * amp;
        }
    }
}

impl Default for RdsSynth {
    fn default() -> Self {
        Self::new()
    }
}
