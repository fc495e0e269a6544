//! mpx-rds: RDS bitstream generation and 57 kHz synthesis
//!
//! The data layer of the Radio Data System side-channel:
//! - `crc` - CRC-10 block protection and the RDS offset words
//! - `config` - the runtime-mutable configuration record (PI, PS, RT, AF, CT)
//! - `assembler` - group scheduler producing bits into the cross-core FIFO
//! - `synth` - differential Manchester line coding and DSB-SC modulation
//!   onto the coherent 57 kHz carrier (runs on the audio core)
//! - `pty` - program-type code/name mapping shared with the console
//! - `clock` - Modified Julian Date conversion for 4A clock-time groups

pub mod assembler;
pub mod clock;
pub mod config;
pub mod crc;
pub mod pty;
pub mod synth;

pub use assembler::{GroupType, RdsAssembler};
pub use config::{ClockTime, RdsSnapshot, SharedRdsConfig, AF_MAX, PS_LEN, RT_MAX};
pub use synth::RdsSynth;
