//! mpx-dsp: DSP stages for the mpxforge FM stereo/RDS encoder
//!
//! All processors here are plain owned structures with
//! `configure`/`reset`/`process` operations, allocation-free after
//! construction and deterministic for identical input and state.
//!
//! ## Input-rate stages (48 kHz)
//! - `preemphasis` - First-order leaky differentiator (50/75 µs)
//! - `notch` - 19 kHz pilot-band biquad notch
//!
//! ## Rate conversion
//! - `upsampler` - 4× polyphase FIR interpolation (96-tap Kaiser prototype)
//!
//! ## Output-rate stages (192 kHz)
//! - `matrix` - L±R stereo decomposition
//! - `nco` - Phase-coherent 19/38/57 kHz carrier generation
//! - `mixer` - Fused MPX composition
//!
//! ## Support
//! - `biquad` - TDF-II biquad sections shared by notch and RDS shaping
//! - `metering` - Per-block RMS/peak/dBFS metering

pub mod biquad;
pub mod matrix;
pub mod metering;
pub mod mixer;
pub mod nco;
pub mod notch;
pub mod preemphasis;
pub mod upsampler;

pub use biquad::{Biquad, BiquadCoeffs};
pub use matrix::StereoMatrix;
pub use metering::{BlockMeter, VuSample};
pub use mixer::MpxMixer;
pub use nco::Nco;
pub use notch::PilotNotch;
pub use preemphasis::PreemphasisFilter;
pub use upsampler::PolyphaseUpsampler;
