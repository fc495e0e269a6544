//! Runtime-mutable audio parameters
//!
//! The console mutates these from the control core while the audio task
//! reads them once per block. Each field is an independent atomic so the
//! audio path never takes a lock.

use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU8, Ordering};

use serde::{Deserialize, Serialize};

/// Atomically stored f32 for lock-free parameter updates
#[derive(Debug)]
pub struct AtomicF32(AtomicU32);

impl AtomicF32 {
    pub fn new(value: f32) -> Self {
        Self(AtomicU32::new(value.to_bits()))
    }

    pub fn load(&self) -> f32 {
        f32::from_bits(self.0.load(Ordering::Relaxed))
    }

    pub fn store(&self, value: f32) {
        self.0.store(value.to_bits(), Ordering::Relaxed);
    }
}

impl Default for AtomicF32 {
    fn default() -> Self {
        Self::new(0.0)
    }
}

/// FM pre-emphasis time constant selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum PreemphasisMode {
    Off = 0,
    /// 50 µs (Europe)
    Us50 = 1,
    /// 75 µs (Americas)
    Us75 = 2,
}

impl PreemphasisMode {
    pub fn tau_seconds(self) -> Option<f32> {
        match self {
            PreemphasisMode::Off => None,
            PreemphasisMode::Us50 => Some(50e-6),
            PreemphasisMode::Us75 => Some(75e-6),
        }
    }

    /// Leaky-differentiator coefficient `α = exp(−1/(τ·fs))`, or 0 for OFF
    /// (which reduces the filter to the identity).
    pub fn alpha(self, sample_rate: f32) -> f32 {
        match self.tau_seconds() {
            Some(tau) => (-1.0 / (tau * sample_rate)).exp(),
            None => 0.0,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            PreemphasisMode::Off => "OFF",
            PreemphasisMode::Us50 => "50US",
            PreemphasisMode::Us75 => "75US",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_uppercase().as_str() {
            "OFF" => Some(PreemphasisMode::Off),
            "50US" | "50" => Some(PreemphasisMode::Us50),
            "75US" | "75" => Some(PreemphasisMode::Us75),
            _ => None,
        }
    }

    fn from_u8(v: u8) -> Self {
        match v {
            1 => PreemphasisMode::Us50,
            2 => PreemphasisMode::Us75,
            _ => PreemphasisMode::Off,
        }
    }
}

/// Default pilot injection level (≈9 % of full scale)
pub const PILOT_AMP_DEFAULT: f32 = 0.09;
/// Default DSB-SC amplitude for the L−R difference signal
pub const DIFF_AMP_DEFAULT: f32 = 0.5;
/// Default RDS injection level
pub const RDS_AMP_DEFAULT: f32 = 0.04;
/// Default pre-emphasis gain (headroom reserve for the HF boost)
pub const PREEMPHASIS_GAIN: f32 = 0.85;
/// Pilot notch pole radius (Q ≈ 25)
pub const NOTCH_RADIUS: f32 = 0.98;

/// Shared parameter block, one instance per engine.
#[derive(Debug)]
pub struct AudioParams {
    preemphasis: AtomicU8,
    pilot_amp: AtomicF32,
    rds_amp: AtomicF32,
    rds_enabled: AtomicBool,
}

impl AudioParams {
    pub fn new() -> Self {
        Self {
            preemphasis: AtomicU8::new(PreemphasisMode::Us50 as u8),
            pilot_amp: AtomicF32::new(PILOT_AMP_DEFAULT),
            rds_amp: AtomicF32::new(RDS_AMP_DEFAULT),
            rds_enabled: AtomicBool::new(true),
        }
    }

    pub fn preemphasis(&self) -> PreemphasisMode {
        PreemphasisMode::from_u8(self.preemphasis.load(Ordering::Relaxed))
    }

    pub fn set_preemphasis(&self, mode: PreemphasisMode) {
        self.preemphasis.store(mode as u8, Ordering::Relaxed);
    }

    pub fn pilot_amp(&self) -> f32 {
        self.pilot_amp.load()
    }

    pub fn set_pilot_amp(&self, amp: f32) {
        self.pilot_amp.store(amp);
    }

    pub fn rds_amp(&self) -> f32 {
        self.rds_amp.load()
    }

    pub fn set_rds_amp(&self, amp: f32) {
        self.rds_amp.store(amp);
    }

    pub fn rds_enabled(&self) -> bool {
        self.rds_enabled.load(Ordering::Relaxed)
    }

    pub fn set_rds_enabled(&self, on: bool) {
        self.rds_enabled.store(on, Ordering::Relaxed);
    }
}

impl Default for AudioParams {
    fn default() -> Self {
        Self::new()
    }
}
