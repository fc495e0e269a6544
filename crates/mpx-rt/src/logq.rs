//! Non-blocking log stream
//!
//! Fixed-size records flow from the audio core to the control core through
//! a bounded channel. The producer never waits: when the queue is full the
//! new message is dropped (freshness of what is already queued wins) and an
//! atomic counter is incremented. Formatting happens in the producer's
//! context; the drain side decides what reaches the `log` facade.

use std::fmt::Write as _;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU8, Ordering};

use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use log::Level;

/// Fixed text capacity per record
pub const LOG_TEXT_CAP: usize = 160;

/// One queued log message
#[derive(Clone, Copy)]
pub struct LogRecord {
    pub level: Level,
    pub ts_us: u64,
    len: u8,
    text: [u8; LOG_TEXT_CAP],
}

impl LogRecord {
    fn empty(level: Level, ts_us: u64) -> Self {
        Self {
            level,
            ts_us,
            len: 0,
            text: [0u8; LOG_TEXT_CAP],
        }
    }

    fn append(&mut self, s: &str) {
        for ch in s.chars() {
            let mut utf8 = [0u8; 4];
            let encoded = ch.encode_utf8(&mut utf8).as_bytes();
            let len = self.len as usize;
            if len + encoded.len() > LOG_TEXT_CAP {
                return;
            }
            self.text[len..len + encoded.len()].copy_from_slice(encoded);
            self.len += encoded.len() as u8;
        }
    }

    pub fn new(level: Level, ts_us: u64, msg: &str) -> Self {
        let mut rec = Self::empty(level, ts_us);
        rec.append(msg);
        rec
    }

    /// Format directly into the fixed record buffer (no heap allocation;
    /// output truncates at capacity). This is the audio-path entry point.
    pub fn format(level: Level, ts_us: u64, args: std::fmt::Arguments<'_>) -> Self {
        struct Writer(LogRecord);
        impl std::fmt::Write for Writer {
            fn write_str(&mut self, s: &str) -> std::fmt::Result {
                self.0.append(s);
                Ok(())
            }
        }
        let mut w = Writer(Self::empty(level, ts_us));
        let _ = std::fmt::Write::write_fmt(&mut w, args);
        w.0
    }

    pub fn text(&self) -> &str {
        std::str::from_utf8(&self.text[..self.len as usize]).unwrap_or("")
    }
}

impl std::fmt::Debug for LogRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut s = String::new();
        let _ = write!(s, "LogRecord[{} @{}us {}]", self.level, self.ts_us, self.text());
        f.write_str(&s)
    }
}

/// Bounded log queue with drop-newest overflow policy.
pub struct LogQueue {
    tx: Sender<LogRecord>,
    rx: Receiver<LogRecord>,
    dropped: AtomicU32,
}

impl LogQueue {
    pub fn new(depth: usize) -> Self {
        let (tx, rx) = bounded(depth);
        Self {
            tx,
            rx,
            dropped: AtomicU32::new(0),
        }
    }

    /// Enqueue a message; returns false (and counts the drop) when full.
    pub fn push(&self, level: Level, ts_us: u64, msg: &str) -> bool {
        match self.tx.try_send(LogRecord::new(level, ts_us, msg)) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) | Err(TrySendError::Disconnected(_)) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                false
            }
        }
    }

    /// Enqueue with in-place formatting; same drop policy as `push`.
    pub fn push_fmt(&self, level: Level, ts_us: u64, args: std::fmt::Arguments<'_>) -> bool {
        match self.tx.try_send(LogRecord::format(level, ts_us, args)) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) | Err(TrySendError::Disconnected(_)) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                false
            }
        }
    }

    /// Drain one record without blocking.
    pub fn pop(&self) -> Option<LogRecord> {
        self.rx.try_recv().ok()
    }

    /// Drain one record, waiting up to `timeout`.
    pub fn pop_timeout(&self, timeout: std::time::Duration) -> Option<LogRecord> {
        self.rx.recv_timeout(timeout).ok()
    }

    pub fn dropped_count(&self) -> u32 {
        self.dropped.load(Ordering::Relaxed)
    }

    pub fn len(&self) -> usize {
        self.rx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }
}

/// Runtime log gating shared between the console (writer) and the drain
/// task (reader). The threshold suppresses records below it; `OFF` mutes
/// everything except the startup sequence, which always passes until
/// `mark_startup_complete()`.
pub struct LogControl {
    /// 0 = OFF, otherwise Level as usize (1=Error .. 5=Trace)
    threshold: AtomicU8,
    startup_complete: AtomicBool,
}

impl LogControl {
    pub fn new() -> Self {
        Self {
            threshold: AtomicU8::new(Level::Info as u8),
            startup_complete: AtomicBool::new(false),
        }
    }

    pub fn set_off(&self) {
        self.threshold.store(0, Ordering::Relaxed);
    }

    pub fn set_level(&self, level: Level) {
        self.threshold.store(level as u8, Ordering::Relaxed);
    }

    /// Current threshold, `None` when OFF.
    pub fn level(&self) -> Option<Level> {
        match self.threshold.load(Ordering::Relaxed) {
            1 => Some(Level::Error),
            2 => Some(Level::Warn),
            3 => Some(Level::Info),
            4 => Some(Level::Debug),
            5 => Some(Level::Trace),
            _ => None,
        }
    }

    pub fn mark_startup_complete(&self) {
        self.startup_complete.store(true, Ordering::Relaxed);
    }

    pub fn should_log(&self, level: Level) -> bool {
        if !self.startup_complete.load(Ordering::Relaxed) {
            return true;
        }
        match self.level() {
            Some(threshold) => level <= threshold,
            None => false,
        }
    }
}

impl Default for LogControl {
    fn default() -> Self {
        Self::new()
    }
}
