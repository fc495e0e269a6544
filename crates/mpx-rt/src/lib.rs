//! mpx-rt: Cross-core communication fabric
//!
//! Bounded queues connecting the audio core to the control/telemetry core:
//! - `bitfifo` - SPSC ring for RDS bits (drop-oldest-on-full)
//! - `logq` - bounded log stream (drop-newest-on-full)
//! - `mailbox` - latest-wins telemetry mailboxes (overwrite-on-full)
//! - `thread_priority` - realtime priority elevation for the audio thread
//!
//! CRITICAL: no producer in this crate ever blocks. Each queue exposes an
//! atomic overflow counter.

pub mod bitfifo;
pub mod logq;
pub mod mailbox;
pub mod thread_priority;

pub use bitfifo::BitFifo;
pub use logq::{LogControl, LogQueue, LogRecord, LOG_TEXT_CAP};
pub use mailbox::Mailbox;
pub use thread_priority::{set_realtime_priority, PriorityResult};
