//! # Live Buffer
//!
//! Fixed-capacity sliding window over live readings. Arrival order is kept
//! as-is; when full, the oldest entries are evicted first.

use std::collections::VecDeque;

use crate::model::Reading;

/// Number of live readings kept for the chart.
pub const MAX_LIVE_READINGS: usize = 60;

#[derive(Debug, Clone)]
pub struct LiveBuffer {
    readings: VecDeque<Reading>,
    capacity: usize,
}

impl Default for LiveBuffer {
    fn default() -> Self {
        Self::new(MAX_LIVE_READINGS)
    }
}

impl LiveBuffer {
    /// A zero capacity is bumped to 1.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            readings: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Appends, then evicts from the front until within capacity.
    pub fn push(&mut self, reading: Reading) {
        self.readings.push_back(reading);
        while self.readings.len() > self.capacity {
            self.readings.pop_front();
        }
    }

    /// Copy of the contents in arrival order.
    pub fn snapshot(&self) -> Vec<Reading> {
        self.readings.iter().cloned().collect()
    }

    pub fn latest(&self) -> Option<&Reading> {
        self.readings.back()
    }

    pub fn clear(&mut self) {
        self.readings.clear();
    }

    pub fn len(&self) -> usize {
        self.readings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.readings.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
