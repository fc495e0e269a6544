//! Task spawning: one free function per role
//!
//! The audio task owns the pipeline, the assembler task owns the RDS group
//! builder, and the drain task forwards queued log records to the `log`
//! facade. The audio task never waits on either of the others; everything
//! crosses through the bounded queues.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use mpx_rds::RdsAssembler;
use mpx_rt::{set_realtime_priority, LogControl, LogQueue};

use crate::io::{AudioInputPort, AudioOutputPort};
use crate::pipeline::Pipeline;

/// Bits in one RDS group
const GROUP_BITS: usize = 104;
/// Assembler pause between groups (cooperative yield for console writers)
const GROUP_YIELD: Duration = Duration::from_millis(2);
/// Assembler backoff while the FIFO has no room for a whole group
const FIFO_FULL_BACKOFF: Duration = Duration::from_millis(10);

/// Spawn the audio task: highest priority, blocking on the peripheral ports
/// only. Returns when `stop` is raised or on a fatal init error.
pub fn spawn_audio<I, O>(
    mut pipeline: Pipeline<I, O>,
    stop: Arc<AtomicBool>,
) -> JoinHandle<Pipeline<I, O>>
where
    I: AudioInputPort + 'static,
    O: AudioOutputPort + 'static,
{
    std::thread::Builder::new()
        .name("audio".into())
        .spawn(move || {
            set_realtime_priority();
            if let Err(e) = pipeline.run(&stop) {
                log::error!("audio task terminated: {e}");
            }
            pipeline
        })
        .expect("spawn audio thread")
}

/// Spawn the RDS assembler task: produces bits roughly at the RDS bit rate,
/// running ahead of the consumer by at most the FIFO depth.
pub fn spawn_assembler(
    mut assembler: RdsAssembler,
    fifo: Arc<mpx_rt::BitFifo>,
    stop: Arc<AtomicBool>,
) -> JoinHandle<()> {
    std::thread::Builder::new()
        .name("rds-assembler".into())
        .spawn(move || {
            let epoch = Instant::now();
            let mut overflow_logged = false;
            while !stop.load(Ordering::Relaxed) {
                if fifo.len() + GROUP_BITS <= fifo.capacity() {
                    let now_us = epoch.elapsed().as_micros() as u64;
                    assembler.emit_next_group(now_us);
                    // First overflow logs once; after that only the counter
                    // moves (the FIFO drops oldest silently).
                    if !overflow_logged && fifo.overflow_count() > 0 {
                        overflow_logged = true;
                        log::warn!(
                            "RDS bit FIFO overflow (dropping oldest, count={})",
                            fifo.overflow_count()
                        );
                    }
                    std::thread::sleep(GROUP_YIELD);
                } else {
                    std::thread::sleep(FIFO_FULL_BACKOFF);
                }
            }
        })
        .expect("spawn assembler thread")
}

/// Spawn the log drain: pulls records off the bounded queue and forwards
/// the ones the runtime gate admits to the `log` facade.
pub fn spawn_log_drain(
    queue: Arc<LogQueue>,
    control: Arc<LogControl>,
    stop: Arc<AtomicBool>,
) -> JoinHandle<()> {
    std::thread::Builder::new()
        .name("log-drain".into())
        .spawn(move || {
            while !stop.load(Ordering::Relaxed) {
                if let Some(rec) = queue.pop_timeout(Duration::from_millis(100)) {
                    if control.should_log(rec.level) {
                        log::log!(rec.level, "[{:>10} us] {}", rec.ts_us, rec.text());
                    }
                }
            }
            // Flush what is left so shutdown messages are not lost.
            while let Some(rec) = queue.pop() {
                if control.should_log(rec.level) {
                    log::log!(rec.level, "[{:>10} us] {}", rec.ts_us, rec.text());
                }
            }
        })
        .expect("spawn log drain thread")
}
