//! # Ring Buffer for PCM Bytes
//!
//! Bounded circular byte buffer shared between the producer (`play` on the
//! output handle) and the buffer worker that feeds the driver.
//!
//! ## Design
//!
//! - **Capacity**: fixed at creation; writes never overwrite unread bytes
//! - **Blocking**: both sides can wait on condition variables for data or
//!   space, always with a timeout
//! - **Closing**: once closed, waiting stops and writes are refused
//!
//! ## Usage
//!
//! ```rust
//! use core_playback::ring_buffer::RingBuffer;
//!
//! let ring = RingBuffer::new(4096);
//! ring.write(&[1, 2, 3, 4]);
//!
//! let mut output = [0u8; 16];
//! let read = ring.read(&mut output);
//! assert_eq!(read, 4);
//! ```

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::{Condvar, Mutex};

#[derive(Clone)]
pub struct RingBuffer {
    inner: Arc<RingBufferInner>,
}

struct RingBufferInner {
    state: Mutex<RingState>,
    capacity: usize,
    readable: Condvar,
    writable: Condvar,
    closed: AtomicBool,
}

struct RingState {
    buffer: Vec<u8>,
    read_pos: usize,
    fill: usize,
}

impl RingState {
    fn copy_out(&self, output: &mut [u8], capacity: usize) -> usize {
        let count = self.fill.min(output.len());
        let first = count.min(capacity - self.read_pos);
        output[..first].copy_from_slice(&self.buffer[self.read_pos..self.read_pos + first]);
        output[first..count].copy_from_slice(&self.buffer[..count - first]);
        count
    }

    fn advance(&mut self, count: usize, capacity: usize) {
        self.read_pos = (self.read_pos + count) % capacity;
        self.fill -= count;
        if self.fill == 0 {
            self.read_pos = 0;
        }
    }
}

impl RingBuffer {
    /// Create a ring holding up to `capacity` bytes.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            inner: Arc::new(RingBufferInner {
                state: Mutex::new(RingState {
                    buffer: vec![0; capacity],
                    read_pos: 0,
                    fill: 0,
                }),
                capacity,
                readable: Condvar::new(),
                writable: Condvar::new(),
                closed: AtomicBool::new(false),
            }),
        }
    }

    /// Copy as much of `data` as fits. Returns the number of bytes taken.
    pub fn write(&self, data: &[u8]) -> usize {
        if data.is_empty() || self.is_closed() {
            return 0;
        }

        let capacity = self.inner.capacity;
        let mut state = self.inner.state.lock();
        let count = data.len().min(capacity - state.fill);
        let write_pos = (state.read_pos + state.fill) % capacity;
        let first = count.min(capacity - write_pos);
        state.buffer[write_pos..write_pos + first].copy_from_slice(&data[..first]);
        state.buffer[..count - first].copy_from_slice(&data[first..count]);
        state.fill += count;
        drop(state);

        if count > 0 {
            self.inner.readable.notify_all();
        }
        count
    }

    /// Move up to `output.len()` bytes out of the ring.
    pub fn read(&self, output: &mut [u8]) -> usize {
        let capacity = self.inner.capacity;
        let mut state = self.inner.state.lock();
        let count = state.copy_out(output, capacity);
        state.advance(count, capacity);
        drop(state);

        if count > 0 {
            self.inner.writable.notify_all();
        }
        count
    }

    /// Copy up to `output.len()` bytes without consuming them.
    pub fn peek(&self, output: &mut [u8]) -> usize {
        let state = self.inner.state.lock();
        state.copy_out(output, self.inner.capacity)
    }

    /// Drop up to `count` bytes from the front. Returns how many were dropped.
    pub fn consume(&self, count: usize) -> usize {
        let capacity = self.inner.capacity;
        let mut state = self.inner.state.lock();
        let count = count.min(state.fill);
        state.advance(count, capacity);
        drop(state);

        if count > 0 {
            self.inner.writable.notify_all();
        }
        count
    }

    /// Wait until at least `min` bytes can be read, the ring is closed, or
    /// `timeout` passes. Returns whether the data is there.
    pub fn wait_for_data(&self, min: usize, timeout: Duration) -> bool {
        let min = min.clamp(1, self.inner.capacity);
        let mut state = self.inner.state.lock();
        if state.fill < min && !self.is_closed() {
            self.inner.readable.wait_for(&mut state, timeout);
        }
        state.fill >= min
    }

    /// Wait until at least `min` bytes can be written, the ring is closed, or
    /// `timeout` passes. Returns whether the space is there.
    pub fn wait_for_space(&self, min: usize, timeout: Duration) -> bool {
        let min = min.clamp(1, self.inner.capacity);
        let mut state = self.inner.state.lock();
        if self.inner.capacity - state.fill < min && !self.is_closed() {
            self.inner.writable.wait_for(&mut state, timeout);
        }
        self.inner.capacity - state.fill >= min
    }

    /// Wake every waiter without changing the contents.
    pub fn notify(&self) {
        self.inner.readable.notify_all();
        self.inner.writable.notify_all();
    }

    /// Refuse further writes and release all waiters.
    pub fn close(&self) {
        self.inner.closed.store(true, Ordering::Release);
        let _guard = self.inner.state.lock();
        self.notify();
    }

    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::Acquire)
    }

    /// Returns the number of bytes currently available to read.
    pub fn available(&self) -> usize {
        self.inner.state.lock().fill
    }

    /// Returns the number of bytes that can be written right now.
    pub fn free_space(&self) -> usize {
        self.inner.capacity - self.available()
    }

    pub fn capacity(&self) -> usize {
        self.inner.capacity
    }

    /// Returns the buffer fill fraction (0.0 to 1.0).
    pub fn fill_level(&self) -> f32 {
        self.available() as f32 / self.inner.capacity as f32
    }

    /// Discard everything buffered.
    pub fn clear(&self) {
        let mut state = self.inner.state.lock();
        state.read_pos = 0;
        state.fill = 0;
        drop(state);
        self.inner.writable.notify_all();
    }

    pub fn is_empty(&self) -> bool {
        self.available() == 0
    }

    pub fn is_full(&self) -> bool {
        self.available() >= self.inner.capacity
    }
}
