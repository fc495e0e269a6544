//! Pipeline orchestrator
//!
//! One iteration: blocking READ, stages 1..8 run to completion without
//! yielding, blocking WRITE. The orchestrator owns every piece of DSP state
//! and is the only code that touches it; the only cross-core coupling is
//! the RDS bit FIFO, the log queue and the telemetry mailboxes, none of
//! which ever block.
//!
//! Per-stage wall time is measured with the monotonic clock and folded into
//! min/cur/max stats; a report is logged every ~5 s and a compact snapshot
//! is published every second. The block budget is 1.333 ms; the pipeline
//! targets < 30 % of it.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use log::Level;
use mpx_core::{
    q31_to_sample, sample_to_q31, AudioParams, EngineResult, PreemphasisMode, Sample,
    BLOCK_FRAMES_IN, BLOCK_FRAMES_OUT, DIFF_AMP_DEFAULT, ENCODE_CLAMP_HI, NOTCH_RADIUS, PILOT_HZ,
    PREEMPHASIS_GAIN, SAMPLE_RATE_IN, SAMPLE_RATE_OUT, UPSAMPLE_FACTOR,
};
use mpx_dsp::{
    BlockMeter, MpxMixer, Nco, PilotNotch, PolyphaseUpsampler, PreemphasisFilter, StereoMatrix,
    VuSample,
};
use mpx_rds::{RdsSynth, SharedRdsConfig};
use mpx_rt::{BitFifo, LogControl, LogQueue, Mailbox};

use crate::io::{AudioInputPort, AudioOutputPort};
use crate::stats::{PipelineStats, StatsSnapshot};

/// VU sample throttle (display update cadence)
const VU_UPDATE_INTERVAL_US: u64 = 25_000;
/// Performance report cadence
const STATS_REPORT_INTERVAL_US: u64 = 5_000_000;
/// Telemetry snapshot cadence
const SNAPSHOT_INTERVAL_US: u64 = 1_000_000;

/// Shared hub wiring the audio task to the control core. Created once at
/// init; everything in it is lock-free or guarded for the writers.
#[derive(Clone)]
pub struct EngineShared {
    pub params: Arc<AudioParams>,
    pub rds: Arc<SharedRdsConfig>,
    pub bit_fifo: Arc<BitFifo>,
    pub log: Arc<LogQueue>,
    pub log_control: Arc<LogControl>,
    pub vu_mail: Arc<Mailbox<VuSample>>,
    pub stats_mail: Arc<Mailbox<StatsSnapshot>>,
}

impl EngineShared {
    pub fn new() -> Self {
        Self {
            params: Arc::new(AudioParams::new()),
            rds: SharedRdsConfig::new(),
            bit_fifo: Arc::new(BitFifo::new(1024)),
            log: Arc::new(LogQueue::new(64)),
            log_control: Arc::new(LogControl::new()),
            vu_mail: Arc::new(Mailbox::new()),
            stats_mail: Arc::new(Mailbox::new()),
        }
    }
}

impl Default for EngineShared {
    fn default() -> Self {
        Self::new()
    }
}

pub struct Pipeline<I, O> {
    input: I,
    output: O,
    shared: EngineShared,

    preemphasis: PreemphasisFilter,
    preemph_mode: PreemphasisMode,
    notch: PilotNotch,
    upsampler: PolyphaseUpsampler,
    matrix: StereoMatrix,
    nco: Nco,
    mixer: MpxMixer,
    rds_synth: RdsSynth,
    meter: BlockMeter,

    stats: PipelineStats,
    epoch: Instant,
    last_vu_us: u64,
    last_output_rms: f32,

    // Block buffers, allocated once at init. Nothing below allocates.
    rx_q31: Vec<i32>,
    rx_f32: Vec<Sample>,
    tx_f32: Vec<Sample>,
    mono: Vec<Sample>,
    diff: Vec<Sample>,
    pilot: Vec<Sample>,
    subcarrier: Vec<Sample>,
    carrier57: Vec<Sample>,
    mpx: Vec<Sample>,
    rds_out: Vec<Sample>,
    tx_q31: Vec<i32>,
}

impl<I: AudioInputPort, O: AudioOutputPort> Pipeline<I, O> {
    pub fn new(input: I, output: O, shared: EngineShared) -> Self {
        let mode = shared.params.preemphasis();
        let mut preemphasis = PreemphasisFilter::new();
        preemphasis.configure(mode.alpha(SAMPLE_RATE_IN as f32), preemph_gain(mode));

        let mut notch = PilotNotch::new();
        notch.configure(SAMPLE_RATE_IN as f32, PILOT_HZ, NOTCH_RADIUS);

        let mut rds_synth = RdsSynth::new();
        rds_synth.configure(SAMPLE_RATE_OUT as f32);

        let mixer = MpxMixer::new(shared.params.pilot_amp(), DIFF_AMP_DEFAULT);

        Self {
            input,
            output,
            shared,
            preemphasis,
            preemph_mode: mode,
            notch,
            upsampler: PolyphaseUpsampler::new(SAMPLE_RATE_OUT as f64),
            matrix: StereoMatrix,
            nco: Nco::new(PILOT_HZ, SAMPLE_RATE_OUT as f32),
            mixer,
            rds_synth,
            meter: BlockMeter::new(),
            stats: PipelineStats::default(),
            epoch: Instant::now(),
            last_vu_us: 0,
            last_output_rms: 0.0,
            rx_q31: vec![0; BLOCK_FRAMES_IN * 2],
            rx_f32: vec![0.0; BLOCK_FRAMES_IN * 2],
            tx_f32: vec![0.0; BLOCK_FRAMES_OUT * 2],
            mono: vec![0.0; BLOCK_FRAMES_OUT],
            diff: vec![0.0; BLOCK_FRAMES_OUT],
            pilot: vec![0.0; BLOCK_FRAMES_OUT],
            subcarrier: vec![0.0; BLOCK_FRAMES_OUT],
            carrier57: vec![0.0; BLOCK_FRAMES_OUT],
            mpx: vec![0.0; BLOCK_FRAMES_OUT],
            rds_out: vec![0.0; BLOCK_FRAMES_OUT],
            tx_q31: vec![0; BLOCK_FRAMES_OUT * 2],
        }
    }

    fn now_us(&self) -> u64 {
        self.epoch.elapsed().as_micros() as u64
    }

    /// Log startup, arm the log gate. Filter state is all zeros here, so
    /// the first block produces no spurious impulse.
    pub fn begin(&mut self) {
        let now = self.now_us();
        self.shared.log.push_fmt(
            Level::Info,
            now,
            format_args!("FM MPX encoder: {} Hz -> {} Hz", SAMPLE_RATE_IN, SAMPLE_RATE_OUT),
        );
        self.stats.reset();
        self.stats.start_us = now;
        self.stats.last_report_us = now;
        self.stats.last_snapshot_us = now;
        self.shared
            .log
            .push_fmt(Level::Info, now, format_args!("System Ready - starting audio processing"));
        self.shared.log_control.mark_startup_complete();
    }

    /// One READ → stages → WRITE iteration. Recoverable faults are counted
    /// and logged; they never propagate.
    pub fn process_block(&mut self) -> EngineResult<()> {
        let frames = match self.input.read_block(&mut self.rx_q31) {
            Ok(frames) => frames.min(BLOCK_FRAMES_IN),
            Err(e) => {
                self.stats.errors += 1;
                self.shared
                    .log
                    .push_fmt(Level::Error, self.now_us(), format_args!("read error: {e}"));
                return Ok(());
            }
        };
        if frames == 0 {
            return Ok(());
        }

        let t_start = Instant::now();

        // Stage 1: Q31 container -> normalized float, plus VU metering tap.
        for f in 0..frames {
            let vl = q31_to_sample(self.rx_q31[f * 2]);
            let vr = q31_to_sample(self.rx_q31[f * 2 + 1]);
            self.rx_f32[f * 2] = vl;
            self.rx_f32[f * 2 + 1] = vr;
            self.meter.accumulate(vl, vr);
        }
        let mut t_prev = t_start;
        let mut t_now = Instant::now();
        self.stats
            .stage_decode
            .update((t_now - t_prev).as_micros() as u32);

        let now_us = self.now_us();
        let vu = self.meter.finish(now_us);
        if self.last_vu_us == 0 || now_us.saturating_sub(self.last_vu_us) >= VU_UPDATE_INTERVAL_US {
            self.last_vu_us = now_us.max(1);
            self.shared.vu_mail.publish(vu);
        }

        // Stage 2: pre-emphasis. A mode change from the console is applied
        // here, at a block boundary, by the only task that owns the state.
        let mode = self.shared.params.preemphasis();
        if mode != self.preemph_mode {
            self.preemph_mode = mode;
            self.preemphasis
                .configure(mode.alpha(SAMPLE_RATE_IN as f32), preemph_gain(mode));
        }
        t_prev = t_now;
        self.preemphasis.process(&mut self.rx_f32, frames);
        t_now = Instant::now();
        self.stats
            .stage_preemphasis
            .update((t_now - t_prev).as_micros() as u32);

        // Stage 3: pilot-band notch.
        t_prev = t_now;
        self.notch.process(&mut self.rx_f32, frames);
        t_now = Instant::now();
        self.stats
            .stage_notch
            .update((t_now - t_prev).as_micros() as u32);

        // Stage 4: 4x polyphase upsample.
        t_prev = t_now;
        self.upsampler
            .process(&self.rx_f32, &mut self.tx_f32, frames);
        t_now = Instant::now();
        self.stats
            .stage_upsample
            .update((t_now - t_prev).as_micros() as u32);

        let samples = frames * UPSAMPLE_FACTOR;

        // Stage 5: stereo matrix in the output-rate domain.
        t_prev = t_now;
        self.matrix
            .process(&self.tx_f32, &mut self.mono, &mut self.diff, samples);
        t_now = Instant::now();
        self.stats
            .stage_matrix
            .update((t_now - t_prev).as_micros() as u32);

        // Stage 6: coherent carriers + MPX composition.
        t_prev = t_now;
        self.nco.generate_harmonics(
            &mut self.pilot,
            &mut self.subcarrier,
            &mut self.carrier57,
            samples,
        );
        self.mixer.set_pilot_amp(self.shared.params.pilot_amp());
        self.mixer.process(
            &self.mono,
            &self.diff,
            &self.pilot,
            &self.subcarrier,
            &mut self.mpx,
            samples,
        );
        t_now = Instant::now();
        self.stats
            .stage_mpx
            .update((t_now - t_prev).as_micros() as u32);

        // Stage 7: RDS injection on the 57 kHz harmonic.
        if self.shared.params.rds_enabled() {
            t_prev = t_now;
            self.rds_synth.process(
                &self.shared.bit_fifo,
                &self.carrier57,
                self.shared.params.rds_amp(),
                &mut self.rds_out,
                samples,
            );
            for i in 0..samples {
                self.mpx[i] += self.rds_out[i];
            }
            t_now = Instant::now();
            self.stats
                .stage_rds
                .update((t_now - t_prev).as_micros() as u32);
        }

        // Stage 8: duplicate to both channels and encode. The clamp below
        // is the single clamp in the pipeline.
        t_prev = t_now;
        let mut sum_output_sq = 0.0f32;
        for i in 0..samples {
            let v = self.mpx[i].clamp(-1.0, ENCODE_CLAMP_HI);
            sum_output_sq += v * v;
            let q = sample_to_q31(v);
            self.tx_q31[i * 2] = q;
            self.tx_q31[i * 2 + 1] = q;
        }
        self.last_output_rms = (sum_output_sq / samples.max(1) as f32).sqrt();
        t_now = Instant::now();
        self.stats
            .stage_encode
            .update((t_now - t_prev).as_micros() as u32);

        self.stats
            .total
            .update((t_now - t_start).as_micros() as u32);

        // WRITE: a short write is an underrun; an error skips the cycle.
        match self.output.write_block(&self.tx_q31, samples) {
            Ok(written) if written < samples => {
                self.stats.underruns += 1;
                self.shared.log.push_fmt(
                    Level::Warn,
                    self.now_us(),
                    format_args!("underrun (wrote {written}/{samples} frames)"),
                );
            }
            Ok(_) => {}
            Err(e) => {
                self.stats.errors += 1;
                self.shared
                    .log
                    .push_fmt(Level::Error, self.now_us(), format_args!("write error: {e}"));
            }
        }

        self.stats.loops_completed += 1;
        self.emit_telemetry(frames);
        Ok(())
    }

    fn emit_telemetry(&mut self, frames: usize) {
        let now = self.now_us();
        let available_us = frames as f32 * 1_000_000.0 / SAMPLE_RATE_IN as f32;

        if now.saturating_sub(self.stats.last_report_us) >= STATS_REPORT_INTERVAL_US {
            self.stats.last_report_us = now;
            let uptime_s = (now - self.stats.start_us) as f32 / 1_000_000.0;
            for line in self.stats.report_lines(available_us, uptime_s) {
                self.shared.log.push(Level::Info, now, &line);
            }
        }

        if now.saturating_sub(self.stats.last_snapshot_us) >= SNAPSHOT_INTERVAL_US {
            self.stats.last_snapshot_us = now;
            let cpu = self.stats.cpu_usage(available_us);
            self.shared.stats_mail.publish(StatsSnapshot {
                cpu_usage: cpu,
                cpu_headroom: 100.0 - cpu,
                total_us_cur: self.stats.total.current,
                total_us_min: self.stats.total.min_or_zero(),
                total_us_max: self.stats.total.max,
                upsample_us_cur: self.stats.stage_upsample.current,
                mpx_us_cur: self.stats.stage_mpx.current,
                matrix_us_cur: self.stats.stage_matrix.current,
                rds_us_cur: self.stats.stage_rds.current,
                loops_completed: self.stats.loops_completed,
                errors: self.stats.errors,
                underruns: self.stats.underruns,
                uptime_s: ((now - self.stats.start_us) / 1_000_000) as u32,
                log_dropped: self.shared.log.dropped_count(),
                bit_overflow: self.shared.bit_fifo.overflow_count(),
            });
        }
    }

    /// Cooperative loop body for the audio task.
    pub fn run(&mut self, stop: &AtomicBool) -> EngineResult<()> {
        self.begin();
        while !stop.load(Ordering::Relaxed) {
            self.process_block()?;
        }
        Ok(())
    }

    pub fn stats(&self) -> &PipelineStats {
        &self.stats
    }

    pub fn last_output_rms(&self) -> f32 {
        self.last_output_rms
    }

    /// Release the output port (offline render finalization).
    pub fn into_output(self) -> O {
        self.output
    }
}

fn preemph_gain(mode: PreemphasisMode) -> f32 {
    match mode {
        PreemphasisMode::Off => 1.0,
        _ => PREEMPHASIS_GAIN,
    }
}
