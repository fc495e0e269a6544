//! Real-time thread priority
//!
//! Platform-specific priority elevation for the audio thread. Failure is
//! non-fatal: the pipeline stays correct, just with weaker scheduling
//! guarantees.

use std::sync::atomic::{AtomicBool, Ordering};

/// Track if priority has been set (avoid repeated calls)
static PRIORITY_SET: AtomicBool = AtomicBool::new(false);

/// Result of a priority elevation attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PriorityResult {
    Success,
    AlreadySet,
    Failed,
    Unsupported,
}

/// Elevate the current thread to real-time scheduling. Call once from the
/// audio thread when it starts, not per block.
pub fn set_realtime_priority() -> PriorityResult {
    if PRIORITY_SET.swap(true, Ordering::SeqCst) {
        return PriorityResult::AlreadySet;
    }

    let result = platform_set_priority();

    match result {
        PriorityResult::Success => {
            log::info!("audio thread elevated to real-time priority");
        }
        PriorityResult::Failed => {
            log::warn!("failed to set real-time thread priority (non-fatal)");
            PRIORITY_SET.store(false, Ordering::SeqCst);
        }
        PriorityResult::Unsupported => {
            log::debug!("real-time priority not supported on this platform");
        }
        PriorityResult::AlreadySet => {}
    }

    result
}

#[cfg(target_os = "linux")]
fn platform_set_priority() -> PriorityResult {
    // SCHED_FIFO needs CAP_SYS_NICE; fall back gracefully without it.
    unsafe {
        let param = libc::sched_param {
            sched_priority: 80,
        };
        let ret = libc::pthread_setschedparam(libc::pthread_self(), libc::SCHED_FIFO, &param);
        if ret == 0 {
            PriorityResult::Success
        } else {
            PriorityResult::Failed
        }
    }
}

#[cfg(target_os = "macos")]
fn platform_set_priority() -> PriorityResult {
    unsafe {
        let policy = libc::SCHED_FIFO;
        let max = libc::sched_get_priority_max(policy);
        if max < 0 {
            return PriorityResult::Failed;
        }
        let param = libc::sched_param {
            sched_priority: max,
        };
        let ret = libc::pthread_setschedparam(libc::pthread_self(), policy, &param);
        if ret == 0 {
            PriorityResult::Success
        } else {
            PriorityResult::Failed
        }
    }
}

#[cfg(not(any(target_os = "linux", target_os = "macos")))]
fn platform_set_priority() -> PriorityResult {
    PriorityResult::Unsupported
}
