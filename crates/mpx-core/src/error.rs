//! Error taxonomy
//!
//! Everything observable on the audio path is either recovered in-cycle or
//! degrades to one skipped block; nothing unwinds through the orchestrator.
//! These types carry the taxonomy across crate boundaries.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngineError {
    /// Peripheral setup, coefficient generation or queue creation failed.
    /// Fatal: the audio task aborts and reports through the log queue.
    #[error("initialization failed: {0}")]
    Init(String),

    /// Transient peripheral read/write failure. The cycle is skipped and the
    /// pipeline resumes on the next block.
    #[error("peripheral I/O error: {0}")]
    Io(String),

    /// Output accepted fewer frames than requested.
    #[error("underrun: wrote {written} of {requested} frames")]
    Underrun { written: usize, requested: usize },

    /// A bounded queue dropped an element per its policy.
    #[error("queue full: {0}")]
    QueueFull(&'static str),

    /// Console mutator rejected an out-of-range value. Never reaches audio.
    #[error("invalid parameter: {0}")]
    InvalidParam(String),

    /// Peripheral blocked for longer than its configured bound.
    #[error("peripheral timeout: {0}")]
    Timeout(String),
}

pub type EngineResult<T> = Result<T, EngineError>;

impl EngineError {
    /// True for errors the pipeline absorbs without terminating.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, EngineError::Init(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_init_is_fatal() {
        assert!(!EngineError::Init("x".into()).is_recoverable());
        assert!(EngineError::Io("x".into()).is_recoverable());
        assert!(EngineError::Underrun {
            written: 1,
            requested: 2
        }
        .is_recoverable());
        assert!(EngineError::QueueFull("bits").is_recoverable());
    }
}
