// src/channel/core.rs

//! The shared state of a bounded FIFO channel.
//!
//! ### Design Principles:
//!
//! 1.  **Central Mutex**: A `parking_lot::Mutex` guards the ring buffer and all
//!     four counters. It is never held across a blocking wait.
//! 2.  **One Gate per Role**: Blocked producers wait on `producer_gate`, blocked
//!     consumers on `consumer_gate`. Both are `parking_lot::Condvar`s bound to
//!     the central mutex, so "release lock and sleep" is atomic.
//! 3.  **Broadcast Wakes**: Any change that might let a waiter proceed wakes
//!     every waiter of the affected role. Waiters re-check their own predicate
//!     (space for *their* request, data for *their* request, a peer present), so
//!     a waiter that cannot proceed simply waits again.

use super::ring::RingBuffer;
use super::{ChannelState, Phase, Role};
use crate::error::ResetError;

use parking_lot::{Condvar, Mutex};
use tracing::debug;

/// The state protected by `ChannelShared::internal`.
#[derive(Debug)]
pub(crate) struct ChannelInternal {
  pub(crate) ring: RingBuffer,
  /// Open producer handles, including ones still blocked in `open`.
  pub(crate) producers: usize,
  /// Open consumer handles, including ones still blocked in `open`.
  pub(crate) consumers: usize,
  pub(crate) waiting_producers: usize,
  pub(crate) waiting_consumers: usize,
  /// Opens ever registered per role. An opener that slept through a peer's
  /// whole open/close cycle still sees the arrival.
  pub(crate) producer_arrivals: u64,
  pub(crate) consumer_arrivals: u64,
  /// Set once both roles have been present at the same time. Distinguishes
  /// `Draining` from `Partial`. Cleared when the channel goes idle.
  pub(crate) was_active: bool,
}

impl ChannelInternal {
  #[inline]
  pub(crate) fn count(&self, role: Role) -> usize {
    match role {
      Role::Producer => self.producers,
      Role::Consumer => self.consumers,
    }
  }

  #[inline]
  pub(crate) fn count_mut(&mut self, role: Role) -> &mut usize {
    match role {
      Role::Producer => &mut self.producers,
      Role::Consumer => &mut self.consumers,
    }
  }

  #[inline]
  pub(crate) fn arrivals(&self, role: Role) -> u64 {
    match role {
      Role::Producer => self.producer_arrivals,
      Role::Consumer => self.consumer_arrivals,
    }
  }

  /// Counts one more handle of `role` in, including it in the arrival tally.
  pub(crate) fn register(&mut self, role: Role) {
    *self.count_mut(role) += 1;
    match role {
      Role::Producer => self.producer_arrivals = self.producer_arrivals.wrapping_add(1),
      Role::Consumer => self.consumer_arrivals = self.consumer_arrivals.wrapping_add(1),
    }
  }

  #[inline]
  pub(crate) fn waiting_mut(&mut self, role: Role) -> &mut usize {
    match role {
      Role::Producer => &mut self.waiting_producers,
      Role::Consumer => &mut self.waiting_consumers,
    }
  }

  #[inline]
  pub(crate) fn is_idle(&self) -> bool {
    self.producers == 0 && self.consumers == 0
  }

  /// Clears the buffer if no handle of either role remains.
  /// Returns `true` if the channel went idle.
  pub(crate) fn reset_if_idle(&mut self) -> bool {
    if self.is_idle() {
      self.ring.clear();
      self.was_active = false;
      true
    } else {
      false
    }
  }

  pub(crate) fn phase(&self) -> Phase {
    match (self.producers, self.consumers) {
      (0, 0) => Phase::Idle,
      (p, c) if p > 0 && c > 0 => Phase::Active,
      _ if self.was_active => Phase::Draining,
      _ => Phase::Partial,
    }
  }
}

/// The shared owner of the channel's state, designed to be wrapped in an `Arc`.
#[derive(Debug)]
pub(crate) struct ChannelShared {
  pub(crate) internal: Mutex<ChannelInternal>,
  pub(crate) producer_gate: Condvar,
  pub(crate) consumer_gate: Condvar,
  pub(crate) capacity: usize,
}

impl ChannelShared {
  pub(crate) fn new(capacity: usize) -> Self {
    ChannelShared {
      internal: Mutex::new(ChannelInternal {
        ring: RingBuffer::new(capacity),
        producers: 0,
        consumers: 0,
        waiting_producers: 0,
        waiting_consumers: 0,
        producer_arrivals: 0,
        consumer_arrivals: 0,
        was_active: false,
      }),
      producer_gate: Condvar::new(),
      consumer_gate: Condvar::new(),
      capacity,
    }
  }

  /// The gate that blocked handles of `role` wait on.
  #[inline]
  pub(crate) fn gate(&self, role: Role) -> &Condvar {
    match role {
      Role::Producer => &self.producer_gate,
      Role::Consumer => &self.consumer_gate,
    }
  }

  /// Wakes every waiter of both roles. Used by interrupt tokens.
  ///
  /// The lock is taken so that a waiter which has checked its interrupt flag
  /// but not yet gone to sleep cannot miss this notification.
  pub(crate) fn wake_all(&self) {
    let _guard = self.internal.lock();
    self.producer_gate.notify_all();
    self.consumer_gate.notify_all();
  }

  /// Unregisters one handle of `role`.
  ///
  /// Waiters of the opposite role are woken so they can observe the new count:
  /// a producer blocked on a full buffer must fail once the last consumer has
  /// gone, and a consumer blocked on an empty buffer must see end of stream
  /// once the last producer has gone. Waiters of `role` itself are woken too,
  /// since a call may be blocked on the very handle being closed.
  pub(crate) fn close_role(&self, role: Role) {
    let mut guard = self.internal.lock();
    let count = guard.count_mut(role);
    debug_assert!(*count > 0, "close without a matching open");
    *count = count.saturating_sub(1);
    let remaining = *count;

    self.gate(role.opposite()).notify_all();
    self.gate(role).notify_all();

    let idle = guard.reset_if_idle();
    debug!(
      ?role,
      remaining,
      producers = guard.producers,
      consumers = guard.consumers,
      idle,
      "fifo handle closed"
    );
  }

  pub(crate) fn snapshot(&self) -> ChannelState {
    let guard = self.internal.lock();
    ChannelState {
      capacity: self.capacity,
      len: guard.ring.len(),
      producers: guard.producers,
      consumers: guard.consumers,
      waiting_producers: guard.waiting_producers,
      waiting_consumers: guard.waiting_consumers,
    }
  }

  pub(crate) fn phase(&self) -> Phase {
    self.internal.lock().phase()
  }

  pub(crate) fn len(&self) -> usize {
    self.internal.lock().ring.len()
  }

  pub(crate) fn reset(&self) -> Result<(), ResetError> {
    let mut guard = self.internal.lock();
    if guard.reset_if_idle() {
      debug!(capacity = self.capacity, "fifo channel reset");
      Ok(())
    } else {
      Err(ResetError::ChannelBusy {
        producers: guard.producers,
        consumers: guard.consumers,
      })
    }
  }
}
