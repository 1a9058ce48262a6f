//! Ring Buffer Implementation

use serde::{Serialize, Serializer};
use std::collections::VecDeque;

/// Default buffer capacity (300 samples = ~10s at 30fps)
pub const DEFAULT_CAPACITY: usize = 300;

/// Bounded FIFO window that overwrites its oldest sample when full.
///
/// Not synchronized: the owner is expected to hold it behind whatever
/// exclusion protects the rest of its state.
#[derive(Debug, Clone)]
pub struct RingBuffer<T> {
    /// Samples, oldest at the front
    storage: VecDeque<T>,
    /// Maximum number of retained samples (always >= 1)
    capacity: usize,
    /// Total samples ever pushed (for statistics)
    total_written: u64,
}

impl<T> RingBuffer<T> {
    /// Create a new ring buffer with given capacity.
    ///
    /// A capacity of zero is bumped to one so the most recent sample is
    /// always retained.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            storage: VecDeque::with_capacity(capacity),
            capacity,
            total_written: 0,
        }
    }

    /// Create a buffer with default capacity
    pub fn with_default_capacity() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }

    /// Push a sample, returning the evicted oldest sample if the buffer was full
    pub fn push(&mut self, item: T) -> Option<T> {
        let evicted = if self.storage.len() >= self.capacity {
            self.storage.pop_front()
        } else {
            None
        };
        self.storage.push_back(item);
        self.total_written += 1;
        evicted
    }

    /// Number of samples currently held
    pub fn len(&self) -> usize {
        self.storage.len()
    }

    pub fn is_empty(&self) -> bool {
        self.storage.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.storage.len() == self.capacity
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Get fill ratio (0.0 to 1.0)
    pub fn fill_ratio(&self) -> f64 {
        self.storage.len() as f64 / self.capacity as f64
    }

    /// Most recent sample
    pub fn latest(&self) -> Option<&T> {
        self.storage.back()
    }

    /// Iterate oldest to newest
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &T> + ExactSizeIterator {
        self.storage.iter()
    }

    /// Iterate over the last `count` samples, most recent first
    pub fn read_last(&self, count: usize) -> impl Iterator<Item = &T> {
        self.storage.iter().rev().take(count)
    }

    /// Total samples pushed since creation, including evicted ones
    pub fn total_written(&self) -> u64 {
        self.total_written
    }

    /// Drop all retained samples. `total_written` is preserved.
    pub fn clear(&mut self) {
        self.storage.clear();
    }
}

impl<T: Clone> RingBuffer<T> {
    /// Copy the retained samples out, oldest first
    pub fn to_vec(&self) -> Vec<T> {
        self.storage.iter().cloned().collect()
    }
}

impl<T> Default for RingBuffer<T> {
    fn default() -> Self {
        Self::with_default_capacity()
    }
}

impl<T: Serialize> Serialize for RingBuffer<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.storage.iter())
    }
}
