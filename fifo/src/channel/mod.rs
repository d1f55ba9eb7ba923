// src/channel/mod.rs

//! A bounded, byte-oriented FIFO channel with named-pipe semantics.
//!
//! Any number of [`Producer`] and [`Consumer`] handles may be open on one
//! [`BoundedChannel`] at a time. Bytes written by any producer are read, in
//! order, exactly once, by some consumer.
//!
//! ### Rendezvous
//!
//! Opening a producer blocks until at least one consumer is open, and opening a
//! consumer blocks until at least one producer is open, just like opening a
//! FIFO special file without `O_NONBLOCK`.
//!
//! ### End of communication
//!
//! - When the last producer closes, consumers drain what is buffered and then
//!   receive zero bytes (end of stream).
//! - When the last consumer closes, producers fail with
//!   [`SendError::BrokenChannel`].
//! - When both sides are gone, the buffer is cleared and the channel can be
//!   reused by a fresh set of peers.
//!
//! ### Atomicity
//!
//! `send` is all-or-nothing: it waits until the whole slice fits, then copies it
//! in one step, so writes from concurrent producers never interleave. `receive`
//! waits until the whole requested length is buffered, except when the last
//! producer is gone, in which case it returns whatever is left.

pub(crate) mod core;
mod ring;
mod sync_impl;


use self::core::ChannelShared;
use self::sync_impl::WaitOptions;
use crate::error::{
  CloseError, OpenError, RecvError, ResetError, SendError, TryRecvError, TrySendError,
};
use crate::interrupt::Interrupt;

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

// --- Roles, Phases, Snapshots ---

/// Which side of the channel a handle participates on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
  /// Writes bytes into the channel.
  Producer,
  /// Reads bytes out of the channel.
  Consumer,
}

impl Role {
  /// The role a handle of this role waits for at open time.
  #[inline]
  pub fn opposite(self) -> Role {
    match self {
      Role::Producer => Role::Consumer,
      Role::Consumer => Role::Producer,
    }
  }
}

/// The lifecycle phase of a channel, derived from its handle counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
  /// No handles of either role.
  Idle,
  /// Handles of only one role, and the two roles have not yet met.
  Partial,
  /// At least one producer and one consumer.
  Active,
  /// One role has left after both were present; the survivors are winding down.
  Draining,
}

/// A point-in-time copy of a channel's counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelState {
  pub capacity: usize,
  /// Bytes currently buffered.
  pub len: usize,
  pub producers: usize,
  pub consumers: usize,
  /// Producers currently blocked in `open` or `send`.
  pub waiting_producers: usize,
  /// Consumers currently blocked in `open` or `receive`.
  pub waiting_consumers: usize,
}

// --- The Channel ---

/// A bounded byte FIFO shared by any number of producers and consumers.
///
/// `BoundedChannel` is a cheap, clonable reference to the shared channel.
/// Handles opened from any clone refer to the same buffer.
#[derive(Clone)]
pub struct BoundedChannel {
  shared: Arc<ChannelShared>,
}

impl fmt::Debug for BoundedChannel {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let state = self.state();
    f.debug_struct("BoundedChannel")
      .field("capacity", &state.capacity)
      .field("len", &state.len)
      .field("producers", &state.producers)
      .field("consumers", &state.consumers)
      .finish()
  }
}

impl BoundedChannel {
  /// Creates an empty channel holding at most `capacity` bytes.
  ///
  /// # Panics
  ///
  /// Panics if `capacity` is 0.
  pub fn new(capacity: usize) -> Self {
    assert!(capacity > 0, "fifo capacity must be greater than 0");
    Self {
      shared: Arc::new(ChannelShared::new(capacity)),
    }
  }

  /// Opens a handle of `role`, blocking until a handle of the opposite role is open.
  pub fn open(&self, role: Role) -> Result<Handle, OpenError> {
    self.open_internal(role, &WaitOptions::forever())
  }

  /// Like [`open`](Self::open), but gives up when `interrupt` is raised.
  pub fn open_with(&self, role: Role, interrupt: &Interrupt) -> Result<Handle, OpenError> {
    self.open_internal(role, &WaitOptions::interruptible(interrupt))
  }

  /// Like [`open`](Self::open), but gives up after `timeout`.
  pub fn open_timeout(&self, role: Role, timeout: Duration) -> Result<Handle, OpenError> {
    self.open_internal(role, &WaitOptions::timeout(timeout))
  }

  /// Opens a producer, blocking until a consumer is open.
  pub fn open_producer(&self) -> Result<Producer, OpenError> {
    self.open_producer_internal(&WaitOptions::forever())
  }

  /// Like [`open_producer`](Self::open_producer), but gives up when `interrupt` is raised.
  pub fn open_producer_with(&self, interrupt: &Interrupt) -> Result<Producer, OpenError> {
    self.open_producer_internal(&WaitOptions::interruptible(interrupt))
  }

  /// Like [`open_producer`](Self::open_producer), but gives up after `timeout`.
  pub fn open_producer_timeout(&self, timeout: Duration) -> Result<Producer, OpenError> {
    self.open_producer_internal(&WaitOptions::timeout(timeout))
  }

  /// Opens a consumer, blocking until a producer is open.
  pub fn open_consumer(&self) -> Result<Consumer, OpenError> {
    self.open_consumer_internal(&WaitOptions::forever())
  }

  /// Like [`open_consumer`](Self::open_consumer), but gives up when `interrupt` is raised.
  pub fn open_consumer_with(&self, interrupt: &Interrupt) -> Result<Consumer, OpenError> {
    self.open_consumer_internal(&WaitOptions::interruptible(interrupt))
  }

  /// Like [`open_consumer`](Self::open_consumer), but gives up after `timeout`.
  pub fn open_consumer_timeout(&self, timeout: Duration) -> Result<Consumer, OpenError> {
    self.open_consumer_internal(&WaitOptions::timeout(timeout))
  }

  fn open_producer_internal(&self, opts: &WaitOptions<'_>) -> Result<Producer, OpenError> {
    sync_impl::open_sync(&self.shared, Role::Producer, opts)?;
    Ok(Producer::new(Arc::clone(&self.shared)))
  }

  fn open_consumer_internal(&self, opts: &WaitOptions<'_>) -> Result<Consumer, OpenError> {
    sync_impl::open_sync(&self.shared, Role::Consumer, opts)?;
    Ok(Consumer::new(Arc::clone(&self.shared)))
  }

  fn open_internal(&self, role: Role, opts: &WaitOptions<'_>) -> Result<Handle, OpenError> {
    sync_impl::open_sync(&self.shared, role, opts)?;
    let shared = Arc::clone(&self.shared);
    Ok(match role {
      Role::Producer => Handle::Producer(Producer::new(shared)),
      Role::Consumer => Handle::Consumer(Consumer::new(shared)),
    })
  }

  /// Clears buffered bytes. Only allowed while no handle is open.
  pub fn reset(&self) -> Result<(), ResetError> {
    self.shared.reset()
  }

  /// Returns a snapshot of the channel's counters.
  pub fn state(&self) -> ChannelState {
    self.shared.snapshot()
  }

  /// Returns the channel's current lifecycle phase.
  pub fn phase(&self) -> Phase {
    self.shared.phase()
  }

  /// Returns the fixed capacity of the channel in bytes.
  #[inline]
  pub fn capacity(&self) -> usize {
    self.shared.capacity
  }

  /// Returns the number of bytes currently buffered.
  pub fn len(&self) -> usize {
    self.shared.len()
  }

  /// Returns `true` if no bytes are buffered.
  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }

  /// Returns `true` if the buffer has no free space.
  pub fn is_full(&self) -> bool {
    self.len() == self.capacity()
  }

  /// Returns `true` if `other` refers to the same underlying channel.
  pub fn same_channel(&self, other: &BoundedChannel) -> bool {
    Arc::ptr_eq(&self.shared, &other.shared)
  }
}

// --- Handles ---

/// The writing end of one open participation in a channel.
///
/// Dropping a producer closes it.
#[derive(Debug)]
pub struct Producer {
  shared: Arc<ChannelShared>,
  closed: AtomicBool,
}

/// The reading end of one open participation in a channel.
///
/// Dropping a consumer closes it.
#[derive(Debug)]
pub struct Consumer {
  shared: Arc<ChannelShared>,
  closed: AtomicBool,
}

/// A handle whose role was chosen at run time.
#[derive(Debug)]
pub enum Handle {
  Producer(Producer),
  Consumer(Consumer),
}

impl Handle {
  /// The role this handle was opened with.
  pub fn role(&self) -> Role {
    match self {
      Handle::Producer(_) => Role::Producer,
      Handle::Consumer(_) => Role::Consumer,
    }
  }

  /// Closes the handle. See [`Producer::close`] and [`Consumer::close`].
  pub fn close(&self) -> Result<(), CloseError> {
    match self {
      Handle::Producer(p) => p.close(),
      Handle::Consumer(c) => c.close(),
    }
  }

  /// Returns the producer, or gives the handle back if it is a consumer.
  pub fn into_producer(self) -> Result<Producer, Handle> {
    match self {
      Handle::Producer(p) => Ok(p),
      other => Err(other),
    }
  }

  /// Returns the consumer, or gives the handle back if it is a producer.
  pub fn into_consumer(self) -> Result<Consumer, Handle> {
    match self {
      Handle::Consumer(c) => Ok(c),
      other => Err(other),
    }
  }
}

impl Producer {
  fn new(shared: Arc<ChannelShared>) -> Self {
    Self {
      shared,
      closed: AtomicBool::new(false),
    }
  }

  /// Writes all of `data`, blocking until there is room for the whole slice.
  ///
  /// Returns `data.len()` on success.
  ///
  /// # Errors
  ///
  /// - `RequestTooLarge` if `data` is longer than the channel capacity. The
  ///   channel is not touched.
  /// - `BrokenChannel` if no consumers remain, either on entry or because the
  ///   last one closed while this call was waiting.
  /// - `Closed` if this handle has been closed, including by another thread
  ///   while this call was waiting. Nothing is written in that case.
  pub fn send(&self, data: &[u8]) -> Result<usize, SendError> {
    self.send_internal(data, &WaitOptions::forever())
  }

  /// Like [`send`](Self::send), but gives up with `Interrupted` when `interrupt` is raised.
  pub fn send_with(&self, data: &[u8], interrupt: &Interrupt) -> Result<usize, SendError> {
    self.send_internal(data, &WaitOptions::interruptible(interrupt))
  }

  /// Like [`send`](Self::send), but gives up with `TimedOut` after `timeout`.
  pub fn send_timeout(&self, data: &[u8], timeout: Duration) -> Result<usize, SendError> {
    self.send_internal(data, &WaitOptions::timeout(timeout))
  }

  fn send_internal(&self, data: &[u8], opts: &WaitOptions<'_>) -> Result<usize, SendError> {
    if self.closed.load(Ordering::Acquire) {
      return Err(SendError::Closed);
    }
    sync_impl::send_sync(&self.shared, &self.closed, data, opts)
  }

  /// Writes all of `data` if it fits right now, without blocking.
  pub fn try_send(&self, data: &[u8]) -> Result<usize, TrySendError> {
    if self.closed.load(Ordering::Acquire) {
      return Err(TrySendError::Closed);
    }
    sync_impl::try_send_core(&self.shared, data)
  }

  /// Closes this producer.
  ///
  /// This is an explicit alternative to `drop`. If this is the last producer,
  /// consumers will see end of stream once the buffer is drained.
  ///
  /// # Errors
  ///
  /// Returns `Err(CloseError)` if this handle has already been closed.
  pub fn close(&self) -> Result<(), CloseError> {
    if self
      .closed
      .compare_exchange(false, true, Ordering::AcqRel, Ordering::Relaxed)
      .is_ok()
    {
      self.shared.close_role(Role::Producer);
      Ok(())
    } else {
      Err(CloseError)
    }
  }

  /// Returns `true` if this handle has been closed.
  pub fn is_closed(&self) -> bool {
    self.closed.load(Ordering::Acquire)
  }

  /// Returns `true` if no consumer is currently open, so a send would fail.
  pub fn is_broken(&self) -> bool {
    self.shared.internal.lock().consumers == 0
  }

  /// Returns the capacity of the channel in bytes.
  pub fn capacity(&self) -> usize {
    self.shared.capacity
  }

  /// Returns the number of bytes currently buffered.
  pub fn len(&self) -> usize {
    self.shared.len()
  }

  /// Returns `true` if no bytes are buffered.
  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }
}

impl Drop for Producer {
  fn drop(&mut self) {
    let _ = self.close();
  }
}

impl Consumer {
  fn new(shared: Arc<ChannelShared>) -> Self {
    Self {
      shared,
      closed: AtomicBool::new(false),
    }
  }

  /// Reads exactly `max_len` bytes, blocking until that many are buffered.
  ///
  /// If the last producer closes while waiting, returns whatever is buffered;
  /// an empty vector means end of stream.
  ///
  /// # Errors
  ///
  /// - `RequestTooLarge` if `max_len` exceeds the channel capacity.
  /// - `Closed` if this handle has been closed, including by another thread
  ///   while this call was waiting. Nothing is consumed in that case.
  pub fn receive(&self, max_len: usize) -> Result<Vec<u8>, RecvError> {
    self.receive_vec(max_len, &WaitOptions::forever())
  }

  /// Like [`receive`](Self::receive), but gives up with `Interrupted` when `interrupt` is raised.
  pub fn receive_with(&self, max_len: usize, interrupt: &Interrupt) -> Result<Vec<u8>, RecvError> {
    self.receive_vec(max_len, &WaitOptions::interruptible(interrupt))
  }

  /// Like [`receive`](Self::receive), but gives up with `TimedOut` after `timeout`.
  pub fn receive_timeout(&self, max_len: usize, timeout: Duration) -> Result<Vec<u8>, RecvError> {
    self.receive_vec(max_len, &WaitOptions::timeout(timeout))
  }

  /// Reads into `buf`, waiting for `buf.len()` bytes. Returns the number of
  /// bytes written; `0` for a non-empty `buf` means end of stream.
  pub fn receive_into(&self, buf: &mut [u8]) -> Result<usize, RecvError> {
    self.receive_into_internal(buf, &WaitOptions::forever())
  }

  /// Like [`receive_into`](Self::receive_into), but gives up when `interrupt` is raised.
  pub fn receive_into_with(&self, buf: &mut [u8], interrupt: &Interrupt) -> Result<usize, RecvError> {
    self.receive_into_internal(buf, &WaitOptions::interruptible(interrupt))
  }

  fn receive_vec(&self, max_len: usize, opts: &WaitOptions<'_>) -> Result<Vec<u8>, RecvError> {
    // Reject before allocating a buffer for an impossible request.
    if max_len > self.shared.capacity {
      return Err(RecvError::RequestTooLarge {
        len: max_len,
        capacity: self.shared.capacity,
      });
    }
    let mut buf = vec![0u8; max_len];
    let n = self.receive_into_internal(&mut buf, opts)?;
    buf.truncate(n);
    Ok(buf)
  }

  fn receive_into_internal(&self, buf: &mut [u8], opts: &WaitOptions<'_>) -> Result<usize, RecvError> {
    if self.closed.load(Ordering::Acquire) {
      return Err(RecvError::Closed);
    }
    sync_impl::recv_sync(&self.shared, &self.closed, buf, opts)
  }

  /// Reads `max_len` bytes if they are buffered right now, without blocking.
  ///
  /// With no producers left, returns whatever is buffered (possibly nothing).
  pub fn try_receive(&self, max_len: usize) -> Result<Vec<u8>, TryRecvError> {
    if self.closed.load(Ordering::Acquire) {
      return Err(TryRecvError::Closed);
    }
    if max_len > self.shared.capacity {
      return Err(TryRecvError::RequestTooLarge {
        len: max_len,
        capacity: self.shared.capacity,
      });
    }
    let mut buf = vec![0u8; max_len];
    let n = sync_impl::try_recv_core(&self.shared, &mut buf)?;
    buf.truncate(n);
    Ok(buf)
  }

  /// Closes this consumer.
  ///
  /// This is an explicit alternative to `drop`. If this is the last consumer,
  /// producers blocked in `send` fail with `BrokenChannel`.
  ///
  /// # Errors
  ///
  /// Returns `Err(CloseError)` if this handle has already been closed.
  pub fn close(&self) -> Result<(), CloseError> {
    if self
      .closed
      .compare_exchange(false, true, Ordering::AcqRel, Ordering::Relaxed)
      .is_ok()
    {
      self.shared.close_role(Role::Consumer);
      Ok(())
    } else {
      Err(CloseError)
    }
  }

  /// Returns `true` if this handle has been closed.
  pub fn is_closed(&self) -> bool {
    self.closed.load(Ordering::Acquire)
  }

  /// Returns `true` if every producer is gone and the buffer is drained.
  pub fn is_finished(&self) -> bool {
    let guard = self.shared.internal.lock();
    guard.producers == 0 && guard.ring.is_empty()
  }

  /// Returns the capacity of the channel in bytes.
  pub fn capacity(&self) -> usize {
    self.shared.capacity
  }

  /// Returns the number of bytes currently buffered.
  pub fn len(&self) -> usize {
    self.shared.len()
  }

  /// Returns `true` if no bytes are buffered.
  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }
}

impl Drop for Consumer {
  fn drop(&mut self) {
    let _ = self.close();
  }
}
