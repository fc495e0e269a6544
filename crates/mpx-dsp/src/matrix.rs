//! Stereo decomposition matrix (L±R)
//!
//! Splits interleaved stereo into the two signals FM multiplexing needs:
//! the mono sum `M = L + R` transmitted at baseband and the difference
//! `S = L − R` modulated onto the 38 kHz subcarrier. Receivers reconstruct
//! `L = (M + S) / 2`, `R = (M − S) / 2`.
//!
//! Stateless, single fused pass.

use mpx_core::Sample;

#[derive(Debug, Clone, Copy, Default)]
pub struct StereoMatrix;

impl StereoMatrix {
    pub fn process(
        &self,
        interleaved: &[Sample],
        mono: &mut [Sample],
        diff: &mut [Sample],
        samples: usize,
    ) {
        debug_assert!(interleaved.len() >= samples * 2);
        debug_assert!(mono.len() >= samples && diff.len() >= samples);

        for i in 0..samples {
            let l = interleaved[i * 2];
            let r = interleaved[i * 2 + 1];
            mono[i] = l + r;
            diff[i] = l - r;
        }
    }
}
