//! Pipeline rate and block-size constants
//!
//! The encoder ingests stereo audio at the base rate and emits the MPX
//! composite at four times that rate. Block sizes are fixed at init; one
//! input block spans 1.333 ms at the 48 kHz default.

/// Input (ADC-side) sample rate in Hz
pub const SAMPLE_RATE_IN: u32 = 48_000;

/// Upsampling factor between input and output domains
pub const UPSAMPLE_FACTOR: usize = 4;

/// Output (DAC-side) sample rate in Hz
pub const SAMPLE_RATE_OUT: u32 = SAMPLE_RATE_IN * UPSAMPLE_FACTOR as u32;

/// Stereo frames per input block
pub const BLOCK_FRAMES_IN: usize = 64;

/// Stereo frames per output block
pub const BLOCK_FRAMES_OUT: usize = BLOCK_FRAMES_IN * UPSAMPLE_FACTOR;

/// Bytes per sample in the peripheral container (24-bit left-justified in 32)
pub const BYTES_PER_SAMPLE: usize = 4;

/// Stereo pilot frequency in Hz; the 38 kHz subcarrier and 57 kHz RDS
/// carrier are its exact 2nd and 3rd harmonics.
pub const PILOT_HZ: f32 = 19_000.0;

/// RDS symbol rate in bits per second (pilot / 16)
pub const RDS_BIT_RATE: f32 = 1_187.5;

/// Wall time covered by one input block, in microseconds.
pub const BLOCK_PERIOD_US: f32 = BLOCK_FRAMES_IN as f32 * 1_000_000.0 / SAMPLE_RATE_IN as f32;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_rate_is_exact_multiple() {
        assert_eq!(SAMPLE_RATE_OUT, 192_000);
        assert_eq!(BLOCK_FRAMES_OUT, 256);
    }

    #[test]
    fn test_rds_rate_locked_to_pilot() {
        assert!((PILOT_HZ / 16.0 - RDS_BIT_RATE).abs() < f32::EPSILON);
    }

    #[test]
    fn test_block_period() {
        assert!((BLOCK_PERIOD_US - 1333.333).abs() < 0.01);
    }
}
