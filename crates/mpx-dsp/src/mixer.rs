//! MPX mixer
//!
//! Builds the FM stereo composite in one fused accumulation pass:
//!
//! ```text
//! mpx[i] = mono[i] + pilot_amp · pilot[i] + diff_amp · diff[i] · sub[i]
//! ```
//!
//! Carrier buffers are expected pre-filled coherently by the NCO. No state.

use mpx_core::Sample;

#[derive(Debug, Clone, Copy)]
pub struct MpxMixer {
    pilot_amp: f32,
    diff_amp: f32,
}

impl MpxMixer {
    pub fn new(pilot_amp: f32, diff_amp: f32) -> Self {
        Self {
            pilot_amp,
            diff_amp,
        }
    }

    pub fn set_pilot_amp(&mut self, amp: f32) {
        self.pilot_amp = amp;
    }

    pub fn pilot_amp(&self) -> f32 {
        self.pilot_amp
    }

    #[allow(clippy::too_many_arguments)]
    pub fn process(
        &self,
        mono: &[Sample],
        diff: &[Sample],
        pilot: &[Sample],
        sub: &[Sample],
        mpx: &mut [Sample],
        samples: usize,
    ) {
        debug_assert!(
            mono.len() >= samples
                && diff.len() >= samples
                && pilot.len() >= samples
                && sub.len() >= samples
                && mpx.len() >= samples
        );

        for i in 0..samples {
            let pilot_term = self.pilot_amp * pilot[i];
            let dsb_term = self.diff_amp * diff[i] * sub[i];
            mpx[i] = mono[i] + pilot_term + dsb_term;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pure_function_of_inputs() {
        let mixer = MpxMixer::new(0.09, 0.5);
        let mono = [0.5f32, -0.25, 0.0, 1.0];
        let diff = [0.1f32, 0.2, -0.3, 0.0];
        let pilot = [1.0f32, 0.0, -1.0, 0.5];
        let sub = [0.5f32, 1.0, -1.0, 0.0];
        let mut mpx = [0.0f32; 4];
        mixer.process(&mono, &diff, &pilot, &sub, &mut mpx, 4);
        for i in 0..4 {
            let expected = mono[i] + 0.09 * pilot[i] + 0.5 * diff[i] * sub[i];
            assert_eq!(mpx[i], expected);
        }
    }

    #[test]
    fn test_mono_only_passthrough() {
        // With zero carriers the composite equals the mono sum exactly.
        let mixer = MpxMixer::new(0.09, 0.5);
        let mono = [0.7f32; 8];
        let zeros = [0.0f32; 8];
        let diff = [0.4f32; 8];
        let mut mpx = [0.0f32; 8];
        mixer.process(&mono, &diff, &zeros, &zeros, &mut mpx, 8);
        assert_eq!(mpx, mono);
    }
}
