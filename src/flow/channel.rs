//! Latest-value sample channel.
//!
//! A channel holds at most one sample. Every write replaces it and bumps a
//! sequence number. Each reader remembers the last sequence it consumed, so
//! "new data" is tracked per reader without the writer knowing its readers.
//!
//! ```text
//! WriteHandle ──write──► [seq, Option<T>] ◄──read── ReadHandle (last_seen)
//!                                          ◄──read── ReadHandle (last_seen)
//! ```
//!
//! The empty-read path only touches the atomic sequence. The lock guarding the
//! slot is held for a clone or a store, never across user code.

use crate::error::{PortflowError, Result};
use parking_lot::RwLock;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

/// Outcome of a non-consuming read, seen from one reader.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowStatus {
    /// Nothing was ever written.
    NoData,
    /// The latest value was already consumed by this reader.
    OldData,
    /// An unread value is present.
    NewData,
}

struct Slot<T> {
    seq: u64,
    value: Option<T>,
}

struct Shared<T> {
    name: String,
    /// Sequence of the latest write. Zero means never written.
    seq: AtomicU64,
    slot: RwLock<Slot<T>>,
    writer_taken: AtomicBool,
}

/// A typed, latest-value channel.
///
/// Cloning a `SampleChannel` clones the handle, not the data.
pub struct SampleChannel<T> {
    shared: Arc<Shared<T>>,
}

impl<T> Clone for SampleChannel<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T: Clone + Send + Sync + 'static> SampleChannel<T> {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            shared: Arc::new(Shared {
                name: name.into(),
                seq: AtomicU64::new(0),
                slot: RwLock::new(Slot {
                    seq: 0,
                    value: None,
                }),
                writer_taken: AtomicBool::new(false),
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.shared.name
    }

    /// Acquire the single writer role.
    ///
    /// Fails with [`PortflowError::WriterInUse`] while another writer is alive.
    pub fn writer(&self) -> Result<WriteHandle<T>> {
        if self
            .shared
            .writer_taken
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(PortflowError::WriterInUse(self.shared.name.clone()));
        }
        Ok(WriteHandle {
            shared: Arc::clone(&self.shared),
        })
    }

    /// Create an independent reader.
    ///
    /// A new reader sees the current value, if any, as unread.
    pub fn reader(&self) -> ReadHandle<T> {
        ReadHandle {
            shared: Arc::clone(&self.shared),
            last_seen: 0,
        }
    }

    /// Whether a writer currently holds the channel.
    pub fn has_writer(&self) -> bool {
        self.shared.writer_taken.load(Ordering::Acquire)
    }

    /// Number of writes so far.
    pub fn write_count(&self) -> u64 {
        self.shared.seq.load(Ordering::Acquire)
    }
}

/// The writing end of a channel. Dropping it releases the writer role.
pub struct WriteHandle<T> {
    shared: Arc<Shared<T>>,
}

impl<T: Clone + Send + Sync + 'static> WriteHandle<T> {
    /// Store `sample` as the current value, replacing any unread one.
    pub fn write(&self, sample: T) {
        let mut slot = self.shared.slot.write();
        slot.seq += 1;
        slot.value = Some(sample);
        // Published after the slot so a reader that sees the new seq finds the value.
        self.shared.seq.store(slot.seq, Ordering::Release);
    }

    pub fn channel_name(&self) -> &str {
        &self.shared.name
    }
}

impl<T> Drop for WriteHandle<T> {
    fn drop(&mut self) {
        self.shared.writer_taken.store(false, Ordering::Release);
    }
}

/// An independent reading end of a channel.
pub struct ReadHandle<T> {
    shared: Arc<Shared<T>>,
    last_seen: u64,
}

impl<T: Clone + Send + Sync + 'static> ReadHandle<T> {
    /// Return the latest sample if this reader has not consumed it yet.
    pub fn read(&mut self) -> Option<T> {
        if self.shared.seq.load(Ordering::Acquire) == self.last_seen {
            return None;
        }
        let slot = self.shared.slot.read();
        if slot.seq == self.last_seen {
            return None;
        }
        self.last_seen = slot.seq;
        slot.value.clone()
    }

    /// Return the latest sample together with its flow status.
    ///
    /// Marks the sample consumed, like [`read`](Self::read), but still returns
    /// the value when it was already consumed.
    pub fn read_newest(&mut self) -> (FlowStatus, Option<T>) {
        let slot = self.shared.slot.read();
        let status = if slot.seq == 0 {
            FlowStatus::NoData
        } else if slot.seq == self.last_seen {
            FlowStatus::OldData
        } else {
            FlowStatus::NewData
        };
        self.last_seen = slot.seq;
        (status, slot.value.clone())
    }

    /// Flow status without consuming anything.
    pub fn status(&self) -> FlowStatus {
        match self.shared.seq.load(Ordering::Acquire) {
            0 => FlowStatus::NoData,
            seq if seq == self.last_seen => FlowStatus::OldData,
            _ => FlowStatus::NewData,
        }
    }

    /// Mark the current value as consumed without cloning it.
    pub fn clear(&mut self) {
        self.last_seen = self.shared.seq.load(Ordering::Acquire);
    }

    pub fn channel_name(&self) -> &str {
        &self.shared.name
    }
}

impl<T> Clone for ReadHandle<T> {
    /// The clone is an independent reader that starts at the same position.
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
            last_seen: self.last_seen,
        }
    }
}
