//! Fixed-capacity rolling window.
//!
//! Ring buffer over the most recent prices. Once full, each push overwrites
//! the oldest slot in place.

/// Rolling window of the last `capacity` values.
#[derive(Debug, Clone)]
pub struct RollingWindow {
    /// Storage, grows to `capacity` then stays fixed.
    buf: Vec<f64>,
    /// Maximum number of values kept.
    capacity: usize,
    /// Slot holding the oldest value once the buffer is full.
    head: usize,
}

impl RollingWindow {
    /// Create an empty window.
    ///
    /// # Panics
    /// Panics if `capacity` is zero.
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "window capacity must be > 0");
        Self {
            buf: Vec::with_capacity(capacity),
            capacity,
            head: 0,
        }
    }

    /// Append a value, evicting the oldest if the window is full.
    pub fn push(&mut self, value: f64) {
        if self.buf.len() < self.capacity {
            self.buf.push(value);
        } else {
            self.buf[self.head] = value;
            self.head = (self.head + 1) % self.capacity;
        }
    }

    /// Value at chronological position `i` (0 = oldest).
    pub fn get(&self, i: usize) -> Option<f64> {
        if i >= self.buf.len() {
            return None;
        }
        Some(self.buf[(self.head + i) % self.capacity])
    }

    /// Values oldest first.
    pub fn iter(&self) -> impl Iterator<Item = f64> + '_ {
        (0..self.buf.len()).map(move |i| self.buf[(self.head + i) % self.capacity])
    }

    /// Mean of the most recent `n` values.
    ///
    /// Returns None if fewer than `n` values are held or `n` is zero.
    pub fn mean_last(&self, n: usize) -> Option<f64> {
        let len = self.buf.len();
        if n == 0 || n > len {
            return None;
        }
        let sum: f64 = self.iter().skip(len - n).sum();
        Some(sum / n as f64)
    }

    /// Mean of every value held.
    pub fn mean(&self) -> Option<f64> {
        self.mean_last(self.buf.len())
    }

    /// Check if the window is full.
    pub fn is_full(&self) -> bool {
        self.buf.len() == self.capacity
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Clear all data.
    pub fn clear(&mut self) {
        self.buf.clear();
        self.head = 0;
    }
}
