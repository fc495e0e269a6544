//! Latest-wins telemetry mailboxes
//!
//! Depth-1 slots for VU samples and stats snapshots: the producer
//! overwrites whatever is pending (the consumer only ever wants the latest
//! value), and a publish that finds the slot momentarily locked by the
//! reader is dropped rather than waited out; the audio core never blocks.

use std::sync::atomic::{AtomicU32, Ordering};

use parking_lot::Mutex;

pub struct Mailbox<T> {
    slot: Mutex<Option<T>>,
    /// Publishes that replaced an unread value
    overwrites: AtomicU32,
    /// Publishes abandoned because the reader held the slot
    contended: AtomicU32,
}

impl<T> Mailbox<T> {
    pub fn new() -> Self {
        Self {
            slot: Mutex::new(None),
            overwrites: AtomicU32::new(0),
            contended: AtomicU32::new(0),
        }
    }

    /// Publish a value without blocking. Returns false when the slot was
    /// held by the reader and the value was dropped.
    pub fn publish(&self, value: T) -> bool {
        match self.slot.try_lock() {
            Some(mut slot) => {
                if slot.replace(value).is_some() {
                    self.overwrites.fetch_add(1, Ordering::Relaxed);
                }
                true
            }
            None => {
                self.contended.fetch_add(1, Ordering::Relaxed);
                false
            }
        }
    }

    /// Take the pending value, leaving the slot empty.
    pub fn take(&self) -> Option<T> {
        self.slot.lock().take()
    }

    pub fn overwrite_count(&self) -> u32 {
        self.overwrites.load(Ordering::Relaxed)
    }

    pub fn contended_count(&self) -> u32 {
        self.contended.load(Ordering::Relaxed)
    }
}

impl<T: Clone> Mailbox<T> {
    /// Peek at the pending value without consuming it.
    pub fn latest(&self) -> Option<T> {
        self.slot.lock().clone()
    }
}

impl<T> Default for Mailbox<T> {
    fn default() -> Self {
        Self::new()
    }
}
