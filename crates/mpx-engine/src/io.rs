//! Peripheral port contracts
//!
//! The real serial-audio driver lives outside this repo; the pipeline only
//! depends on its read/write shape. Frames are interleaved stereo Q31
//! containers. Reads block until data is available and may return fewer
//! frames than requested (frames-rounded-down are processed); writes block
//! and report how many frames were accepted (a short write is an underrun,
//! not an error).

use mpx_core::{sample_to_q31, EngineResult, Sample, SAMPLE_RATE_IN};

/// Blocking input peripheral (ADC side, input rate).
pub trait AudioInputPort: Send {
    /// Read up to `buf.len() / 2` stereo frames. Returns frames read;
    /// `Ok(0)` means no data this cycle (the orchestrator just retries).
    fn read_block(&mut self, buf: &mut [i32]) -> EngineResult<usize>;
}

/// Blocking output peripheral (DAC side, output rate).
pub trait AudioOutputPort: Send {
    /// Write `frames` interleaved stereo frames from `buf`. Returns frames
    /// accepted; fewer than requested is an underrun.
    fn write_block(&mut self, buf: &[i32], frames: usize) -> EngineResult<usize>;
}

/// Test/render source driven by a per-frame closure returning `(l, r)` in
/// normalized float; the port converts to the Q31 wire format.
pub struct FnInput<F> {
    gen: F,
    frame: u64,
}

impl<F> FnInput<F>
where
    F: FnMut(u64) -> (Sample, Sample) + Send,
{
    pub fn new(gen: F) -> Self {
        Self { gen, frame: 0 }
    }
}

impl<F> AudioInputPort for FnInput<F>
where
    F: FnMut(u64) -> (Sample, Sample) + Send,
{
    fn read_block(&mut self, buf: &mut [i32]) -> EngineResult<usize> {
        let frames = buf.len() / 2;
        for f in 0..frames {
            let (l, r) = (self.gen)(self.frame);
            self.frame += 1;
            buf[f * 2] = sample_to_q31(l);
            buf[f * 2 + 1] = sample_to_q31(r);
        }
        Ok(frames)
    }
}

/// Stereo test tone at the input rate.
pub struct ToneInput {
    freq: f64,
    amp: f64,
    frame: u64,
}

impl ToneInput {
    pub fn new(freq: f64, amp: f64) -> Self {
        Self {
            freq,
            amp,
            frame: 0,
        }
    }
}

impl AudioInputPort for ToneInput {
    fn read_block(&mut self, buf: &mut [i32]) -> EngineResult<usize> {
        let frames = buf.len() / 2;
        for f in 0..frames {
            let t = self.frame as f64 / SAMPLE_RATE_IN as f64;
            let v = (std::f64::consts::TAU * self.freq * t).sin() * self.amp;
            self.frame += 1;
            let q = sample_to_q31(v as f32);
            buf[f * 2] = q;
            buf[f * 2 + 1] = q;
        }
        Ok(frames)
    }
}

/// Sink that collects everything written (tests and offline analysis).
#[derive(Default)]
pub struct BufferOutput {
    pub samples: Vec<i32>,
}

impl BufferOutput {
    pub fn new() -> Self {
        Self::default()
    }

    /// Written frames decoded back to normalized float, left channel only
    /// (the composite is duplicated on both channels).
    pub fn mpx_f32(&self) -> Vec<Sample> {
        self.samples
            .chunks_exact(2)
            .map(|fr| mpx_core::q31_to_sample(fr[0]))
            .collect()
    }
}

impl AudioOutputPort for BufferOutput {
    fn write_block(&mut self, buf: &[i32], frames: usize) -> EngineResult<usize> {
        self.samples.extend_from_slice(&buf[..frames * 2]);
        Ok(frames)
    }
}
