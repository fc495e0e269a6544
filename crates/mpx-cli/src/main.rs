//! mpxd: FM stereo/RDS baseband encoder host binary
//!
//! Two modes:
//! - `render`: drive the full pipeline offline with a test tone and write
//!   the 192 kHz composite to a WAV file (useful for spectrum inspection)
//! - `run`: start the encoder against a silent paced input and serve the
//!   SCPI-style console on stdin

use std::io::BufRead;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use mpx_core::{EngineError, EngineResult, BLOCK_FRAMES_IN, BLOCK_PERIOD_US, SAMPLE_RATE_OUT};
use mpx_engine::io::{AudioInputPort, AudioOutputPort, ToneInput};
use mpx_engine::pipeline::{EngineShared, Pipeline};
use mpx_engine::tasks::{spawn_assembler, spawn_audio, spawn_log_drain};
use mpx_engine::{Console, PersistedConfig};
use mpx_rds::RdsAssembler;

#[derive(Parser)]
#[command(name = "mpxd", about = "FM stereo/RDS baseband encoder", version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render a stereo test tone through the pipeline into a WAV file
    Render {
        /// Duration in seconds
        #[arg(long, default_value_t = 5.0)]
        seconds: f64,
        /// Tone frequency in Hz
        #[arg(long, default_value_t = 1000.0)]
        tone: f64,
        /// Tone level in dBFS
        #[arg(long, default_value_t = -6.0)]
        level_db: f64,
        /// Output WAV path (192 kHz stereo, 32-bit)
        #[arg(long, default_value = "mpx.wav")]
        output: PathBuf,
        /// Settings file to load before rendering
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Run the encoder with the console on stdin
    Run {
        /// Settings file (loaded at startup, written by SYST:CONF:SAVE)
        #[arg(long, default_value = "mpxforge.json")]
        config: PathBuf,
    },
}

/// WAV sink for offline rendering.
struct WavOutput {
    writer: hound::WavWriter<std::io::BufWriter<std::fs::File>>,
}

impl WavOutput {
    fn create(path: &PathBuf) -> Result<Self> {
        let spec = hound::WavSpec {
            channels: 2,
            sample_rate: SAMPLE_RATE_OUT,
            bits_per_sample: 32,
            sample_format: hound::SampleFormat::Int,
        };
        let writer = hound::WavWriter::create(path, spec)
            .with_context(|| format!("create {}", path.display()))?;
        Ok(Self { writer })
    }
}

impl AudioOutputPort for WavOutput {
    fn write_block(&mut self, buf: &[i32], frames: usize) -> EngineResult<usize> {
        for &s in &buf[..frames * 2] {
            self.writer
                .write_sample(s)
                .map_err(|e| EngineError::Io(format!("wav write: {e}")))?;
        }
        Ok(frames)
    }
}

/// Silent input paced to the real block period (models the blocking ADC).
struct PacedSilence;

impl AudioInputPort for PacedSilence {
    fn read_block(&mut self, buf: &mut [i32]) -> EngineResult<usize> {
        std::thread::sleep(Duration::from_micros(BLOCK_PERIOD_US as u64));
        buf.fill(0);
        Ok(buf.len() / 2)
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    match Cli::parse().command {
        Commands::Render {
            seconds,
            tone,
            level_db,
            output,
            config,
        } => render(seconds, tone, level_db, output, config),
        Commands::Run { config } => run(config),
    }
}

fn setup_shared(config: Option<&PathBuf>) -> Result<EngineShared> {
    let shared = EngineShared::new();
    if let Some(path) = config {
        match PersistedConfig::load(path) {
            Ok(cfg) => {
                cfg.apply(&shared.rds, &shared.params)
                    .context("apply persisted config")?;
                log::info!("loaded configuration from {}", path.display());
            }
            Err(e) => log::warn!("no configuration loaded: {e}"),
        }
    }
    Ok(shared)
}

fn render(
    seconds: f64,
    tone: f64,
    level_db: f64,
    output: PathBuf,
    config: Option<PathBuf>,
) -> Result<()> {
    let shared = setup_shared(config.as_ref())?;
    let amp = 10f64.powf(level_db / 20.0);

    let stop = Arc::new(AtomicBool::new(false));
    let assembler = RdsAssembler::new(Arc::clone(&shared.rds), Arc::clone(&shared.bit_fifo));
    let assembler_task = spawn_assembler(
        assembler,
        Arc::clone(&shared.bit_fifo),
        Arc::clone(&stop),
    );
    let drain_task = spawn_log_drain(
        Arc::clone(&shared.log),
        Arc::clone(&shared.log_control),
        Arc::clone(&stop),
    );

    let mut pipeline = Pipeline::new(
        ToneInput::new(tone, amp),
        WavOutput::create(&output)?,
        shared.clone(),
    );
    pipeline.begin();

    let blocks = (seconds * mpx_core::SAMPLE_RATE_IN as f64 / BLOCK_FRAMES_IN as f64).ceil() as usize;
    for _ in 0..blocks {
        pipeline
            .process_block()
            .map_err(|e| anyhow::anyhow!("pipeline: {e}"))?;
    }

    stop.store(true, Ordering::Relaxed);
    assembler_task.join().ok();
    drain_task.join().ok();

    let out = pipeline.into_output();
    out.writer.finalize().context("finalize wav")?;
    log::info!(
        "rendered {blocks} blocks ({seconds} s of {tone} Hz tone) to {}",
        output.display()
    );
    Ok(())
}

fn run(config: PathBuf) -> Result<()> {
    let shared = setup_shared(Some(&config))?;
    let stop = Arc::new(AtomicBool::new(false));

    let assembler = RdsAssembler::new(Arc::clone(&shared.rds), Arc::clone(&shared.bit_fifo));
    let assembler_task = spawn_assembler(
        assembler,
        Arc::clone(&shared.bit_fifo),
        Arc::clone(&stop),
    );
    let drain_task = spawn_log_drain(
        Arc::clone(&shared.log),
        Arc::clone(&shared.log_control),
        Arc::clone(&stop),
    );
    let pipeline = Pipeline::new(PacedSilence, Discard, shared.clone());
    let audio_task = spawn_audio(pipeline, Arc::clone(&stop));

    let mut console = Console::new(
        Arc::clone(&shared.rds),
        Arc::clone(&shared.params),
        Arc::clone(&shared.log_control),
        Arc::clone(&shared.stats_mail),
        config,
    );

    let stdin = std::io::stdin();
    for line in stdin.lock().lines() {
        let line = line.context("read stdin")?;
        if line.trim().eq_ignore_ascii_case("exit") {
            break;
        }
        if let Some(response) = console.execute_line(&line) {
            println!("{response}");
        }
    }

    stop.store(true, Ordering::Relaxed);
    audio_task.join().ok();
    assembler_task.join().ok();
    drain_task.join().ok();
    Ok(())
}

/// Output sink for console-only operation.
struct Discard;

impl AudioOutputPort for Discard {
    fn write_block(&mut self, _buf: &[i32], frames: usize) -> EngineResult<usize> {
        Ok(frames)
    }
}
