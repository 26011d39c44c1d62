//! Sample type and rolling acquisition buffer.
//!
//! The rolling buffer is the single resource shared between the acquisition
//! task (writer) and an in-flight authentication run (reader). It keeps the
//! most recent `capacity` samples in acquisition order, evicting the oldest
//! on overflow, and hands readers an independent copy of the trailing
//! window.
//!
//! # Concurrency
//!
//! Both `append` and `snapshot` take the same mutex, so a snapshot can never
//! observe a half-written sample or lose an entry to a concurrent eviction.
//! The critical sections are bounded: one push/pop for the writer, one
//! `min(window, len)`-element copy for the reader.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::{Mutex, PoisonError};

/// A single multi-channel reading captured on one acquisition tick.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Sample {
    /// Monotonic acquisition sequence number.
    pub seq: u64,
    /// Wall-clock capture time.
    pub timestamp: DateTime<Utc>,
    /// One scalar reading per channel. Channel count is fixed for the
    /// lifetime of a session.
    pub channels: Vec<f64>,
}

impl Sample {
    /// Build a sample stamped with the current time.
    pub fn new(seq: u64, channels: Vec<f64>) -> Self {
        Self {
            seq,
            timestamp: Utc::now(),
            channels,
        }
    }
}

/// Fixed-capacity FIFO store of the most recent samples.
pub struct RollingBuffer {
    inner: Mutex<VecDeque<Sample>>,
    capacity: usize,
}

impl RollingBuffer {
    /// Create a buffer holding at most `capacity` samples.
    ///
    /// `capacity` must be >= 1; callers validate this at configuration time.
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity,
        }
    }

    /// Append one sample, evicting the oldest if the buffer is full.
    pub fn append(&self, sample: Sample) {
        let mut inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        if inner.len() == self.capacity {
            inner.pop_front();
        }
        inner.push_back(sample);
    }

    /// Copy out the most recent `min(window, len)` samples in acquisition
    /// order. An empty buffer yields an empty vec; the caller decides
    /// whether that is an error.
    pub fn snapshot(&self, window: usize) -> Vec<Sample> {
        let inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        let take = window.min(inner.len());
        let start = inner.len() - take;
        inner.iter().skip(start).cloned().collect()
    }

    /// Current number of stored samples.
    pub fn len(&self) -> usize {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// True if no sample has been appended yet (or all were evicted).
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Maximum number of retained samples.
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
