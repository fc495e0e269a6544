//! Pipeline performance statistics
//!
//! Pure data containers updated in place by the audio task; no I/O and no
//! allocation. The telemetry task reads snapshots through the mailbox.

/// Min/current/max wall time of one stage, in microseconds.
#[derive(Debug, Clone, Copy)]
pub struct StageTiming {
    pub current: u32,
    pub min: u32,
    pub max: u32,
}

impl StageTiming {
    pub fn new() -> Self {
        Self {
            current: 0,
            min: u32::MAX,
            max: 0,
        }
    }

    pub fn reset(&mut self) {
        *self = Self::new();
    }

    pub fn update(&mut self, value: u32) {
        self.current = value;
        if value < self.min {
            self.min = value;
        }
        if value > self.max {
            self.max = value;
        }
    }

    /// min as reported externally (0 until first update)
    pub fn min_or_zero(&self) -> u32 {
        if self.min == u32::MAX {
            0
        } else {
            self.min
        }
    }
}

impl Default for StageTiming {
    fn default() -> Self {
        Self::new()
    }
}

/// Full per-stage breakdown owned by the audio task.
#[derive(Debug, Clone, Default)]
pub struct PipelineStats {
    pub loops_completed: u32,
    pub errors: u32,
    pub underruns: u32,
    pub start_us: u64,
    pub last_report_us: u64,
    pub last_snapshot_us: u64,

    pub total: StageTiming,
    pub stage_decode: StageTiming,
    pub stage_preemphasis: StageTiming,
    pub stage_notch: StageTiming,
    pub stage_upsample: StageTiming,
    pub stage_matrix: StageTiming,
    pub stage_mpx: StageTiming,
    pub stage_rds: StageTiming,
    pub stage_encode: StageTiming,
}

impl PipelineStats {
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// CPU usage of the last block against the block's real-time budget.
    pub fn cpu_usage(&self, available_us: f32) -> f32 {
        if available_us > 0.0 {
            self.total.current as f32 / available_us * 100.0
        } else {
            0.0
        }
    }

    /// Human-readable performance report in the on-air log format.
    pub fn report_lines(&self, available_us: f32, uptime_s: f32) -> Vec<String> {
        let cpu = self.cpu_usage(available_us);
        let stage = |name: &str, t: &StageTiming| {
            format!(
                "  {name}: cur {:>5} us  min {:>5} us  max {:>5} us",
                t.current,
                t.min_or_zero(),
                t.max
            )
        };
        vec![
            "========================================".to_string(),
            "Performance Stats".to_string(),
            format!("Loops: {}  Errors: {}  Underruns: {}", self.loops_completed, self.errors, self.underruns),
            format!("Uptime: {uptime_s:.1} s"),
            format!(
                "Block: cur {} us of {available_us:.0} us  CPU {cpu:.1}%  headroom {:.1}%",
                self.total.current,
                100.0 - cpu
            ),
            "Per-stage breakdown:".to_string(),
            stage("1. decode+meter ", &self.stage_decode),
            stage("2. pre-emphasis ", &self.stage_preemphasis),
            stage("3. 19 kHz notch ", &self.stage_notch),
            stage("4. upsample 4x  ", &self.stage_upsample),
            stage("5. stereo matrix", &self.stage_matrix),
            stage("6. MPX synthesis", &self.stage_mpx),
            stage("7. RDS injection", &self.stage_rds),
            stage("8. encode       ", &self.stage_encode),
            "========================================".to_string(),
        ]
    }
}

/// Compact cross-core snapshot published through the telemetry mailbox.
#[derive(Debug, Clone, Copy, Default)]
pub struct StatsSnapshot {
    pub cpu_usage: f32,
    pub cpu_headroom: f32,
    pub total_us_cur: u32,
    pub total_us_min: u32,
    pub total_us_max: u32,
    pub upsample_us_cur: u32,
    pub mpx_us_cur: u32,
    pub matrix_us_cur: u32,
    pub rds_us_cur: u32,
    pub loops_completed: u32,
    pub errors: u32,
    pub underruns: u32,
    pub uptime_s: u32,
    pub log_dropped: u32,
    pub bit_overflow: u32,
}
