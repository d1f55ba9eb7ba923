// src/channel/ring.rs

//! Fixed-capacity circular byte buffer.
//!
//! Not synchronized. The owning channel keeps it behind its mutex.

use std::fmt;

pub(crate) struct RingBuffer {
  buf: Box<[u8]>,
  // Index of the oldest byte.
  head: usize,
  len: usize,
}

impl fmt::Debug for RingBuffer {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("RingBuffer")
      .field("capacity", &self.capacity())
      .field("head", &self.head)
      .field("len", &self.len)
      .finish()
  }
}

impl RingBuffer {
  pub(crate) fn new(capacity: usize) -> Self {
    Self {
      buf: vec![0u8; capacity].into_boxed_slice(),
      head: 0,
      len: 0,
    }
  }

  #[inline]
  pub(crate) fn capacity(&self) -> usize {
    self.buf.len()
  }

  #[inline]
  pub(crate) fn len(&self) -> usize {
    self.len
  }

  #[inline]
  pub(crate) fn is_empty(&self) -> bool {
    self.len == 0
  }

  /// Free bytes.
  #[inline]
  pub(crate) fn available(&self) -> usize {
    self.capacity() - self.len
  }

  /// Appends all of `data`. The caller must have checked `available()`.
  pub(crate) fn push_slice(&mut self, data: &[u8]) {
    debug_assert!(data.len() <= self.available(), "push past ring capacity");
    let cap = self.capacity();
    if data.is_empty() {
      return;
    }
    let tail = (self.head + self.len) % cap;
    let first = data.len().min(cap - tail);
    self.buf[tail..tail + first].copy_from_slice(&data[..first]);
    let rest = data.len() - first;
    if rest > 0 {
      self.buf[..rest].copy_from_slice(&data[first..]);
    }
    self.len += data.len();
  }

  /// Moves up to `out.len()` of the oldest bytes into `out`, returning the count.
  pub(crate) fn pop_into(&mut self, out: &mut [u8]) -> usize {
    let n = out.len().min(self.len);
    if n == 0 {
      return 0;
    }
    let cap = self.capacity();
    let first = n.min(cap - self.head);
    out[..first].copy_from_slice(&self.buf[self.head..self.head + first]);
    if n > first {
      out[first..n].copy_from_slice(&self.buf[..n - first]);
    }
    self.head = (self.head + n) % cap;
    self.len -= n;
    if self.len == 0 {
      // Keep writes contiguous for the common drain-then-refill pattern.
      self.head = 0;
    }
    n
  }

  pub(crate) fn clear(&mut self) {
    self.head = 0;
    self.len = 0;
  }
}
