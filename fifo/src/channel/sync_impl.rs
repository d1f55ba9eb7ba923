//! Implementation of the blocking open, send and receive logic.
//!
//! Every blocking path follows the same monitor protocol: take the lock,
//! check the predicate, and if it does not hold bump the role's waiting
//! counter, sleep on the role's gate (which releases the lock), re-acquire,
//! drop the waiting counter and check again. Interruption and deadline
//! expiry leave through the same door, so the waiting counters are always
//! restored before an error is reported.

use super::core::{ChannelInternal, ChannelShared};
use super::Role;
use crate::error::{
  OpenError, RecvError, SendError, TryRecvError, TrySendError, WaitAbort,
};
use crate::interrupt::{Interrupt, Registration};

use parking_lot::MutexGuard;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, trace};

// --- Wait Options ---

/// How long, and under which token, a blocking call may wait.
#[derive(Debug, Default, Clone, Copy)]
pub(crate) struct WaitOptions<'a> {
  pub(crate) interrupt: Option<&'a Interrupt>,
  pub(crate) deadline: Option<Instant>,
}

impl<'a> WaitOptions<'a> {
  /// Wait for as long as it takes.
  pub(crate) fn forever() -> Self {
    Self::default()
  }

  pub(crate) fn interruptible(interrupt: &'a Interrupt) -> Self {
    Self {
      interrupt: Some(interrupt),
      deadline: None,
    }
  }

  /// A timeout too large to represent as an `Instant` waits forever.
  pub(crate) fn timeout(timeout: Duration) -> Self {
    Self {
      interrupt: None,
      deadline: Instant::now().checked_add(timeout),
    }
  }

  fn register(&self, shared: &Arc<ChannelShared>) -> Option<Registration<'a>> {
    self.interrupt.map(|interrupt| interrupt.register(shared))
  }
}

/// Blocks on the gate for `role` until `ready` holds.
///
/// On `Err` the waiting counter for `role` is back at the value it had on
/// entry and the lock is still held by the caller.
fn wait_on_gate<F>(
  shared: &ChannelShared,
  guard: &mut MutexGuard<'_, ChannelInternal>,
  role: Role,
  opts: &WaitOptions<'_>,
  mut ready: F,
) -> Result<(), WaitAbort>
where
  F: FnMut(&ChannelInternal) -> bool,
{
  while !ready(&**guard) {
    if opts.interrupt.is_some_and(Interrupt::is_interrupted) {
      trace!(?role, "fifo wait interrupted");
      return Err(WaitAbort::Interrupted);
    }
    if opts.deadline.is_some_and(|d| Instant::now() >= d) {
      trace!(?role, "fifo wait timed out");
      return Err(WaitAbort::TimedOut);
    }

    *guard.waiting_mut(role) += 1;
    trace!(?role, "fifo waiter parked");
    let gate = shared.gate(role);
    match opts.deadline {
      Some(deadline) => {
        gate.wait_until(guard, deadline);
      }
      None => gate.wait(guard),
    }
    *guard.waiting_mut(role) -= 1;
    trace!(?role, "fifo waiter woke");
    // Loop re-checks the predicate first, then the interrupt and deadline.
  }
  Ok(())
}

// --- Open ---

/// Registers a handle of `role` and blocks until a peer of the opposite role exists.
pub(crate) fn open_sync(
  shared: &Arc<ChannelShared>,
  role: Role,
  opts: &WaitOptions<'_>,
) -> Result<(), OpenError> {
  let _registration = opts.register(shared);
  let mut guard = shared.internal.lock();

  // Count ourselves in before waiting, so a peer opening concurrently sees us.
  guard.register(role);
  let peer = role.opposite();
  shared.gate(peer).notify_all();

  let seen = guard.arrivals(peer);
  match wait_on_gate(shared, &mut guard, role, opts, |st| {
    st.count(peer) > 0 || st.arrivals(peer) != seen
  }) {
    Ok(()) => {
      guard.was_active = true;
      debug!(
        ?role,
        producers = guard.producers,
        consumers = guard.consumers,
        "fifo handle opened"
      );
      Ok(())
    }
    Err(abort) => {
      // Undo the registration: the open never completed.
      *guard.count_mut(role) -= 1;
      if guard.count(role) == 0 {
        shared.gate(peer).notify_all();
      }
      guard.reset_if_idle();
      debug!(
        ?role,
        ?abort,
        producers = guard.producers,
        consumers = guard.consumers,
        "fifo open abandoned"
      );
      Err(abort.into())
    }
  }
}

// --- Send ---

/// The blocking, all-or-nothing send on behalf of the handle owning `closed`.
///
/// Closing that handle while the call waits ends the wait with `Closed` and
/// nothing written.
pub(crate) fn send_sync(
  shared: &Arc<ChannelShared>,
  closed: &AtomicBool,
  data: &[u8],
  opts: &WaitOptions<'_>,
) -> Result<usize, SendError> {
  let len = data.len();
  if len > shared.capacity {
    return Err(SendError::RequestTooLarge {
      len,
      capacity: shared.capacity,
    });
  }

  let _registration = opts.register(shared);
  let mut guard = shared.internal.lock();

  wait_on_gate(shared, &mut guard, Role::Producer, opts, |st| {
    closed.load(Ordering::Acquire) || st.ring.available() >= len || st.consumers == 0
  })?;

  if closed.load(Ordering::Acquire) {
    debug!(len, "fifo send abandoned: handle closed");
    return Err(SendError::Closed);
  }
  if guard.consumers == 0 {
    debug!(len, "fifo send failed: no consumers");
    return Err(SendError::BrokenChannel);
  }

  guard.ring.push_slice(data);
  trace!(len, buffered = guard.ring.len(), "fifo bytes sent");
  shared.consumer_gate.notify_all();
  Ok(len)
}

/// The non-blocking send.
pub(crate) fn try_send_core(shared: &ChannelShared, data: &[u8]) -> Result<usize, TrySendError> {
  let len = data.len();
  if len > shared.capacity {
    return Err(TrySendError::RequestTooLarge {
      len,
      capacity: shared.capacity,
    });
  }

  let mut guard = shared.internal.lock();
  if guard.consumers == 0 {
    return Err(TrySendError::BrokenChannel);
  }
  if guard.ring.available() < len {
    return Err(TrySendError::Full);
  }

  guard.ring.push_slice(data);
  trace!(len, buffered = guard.ring.len(), "fifo bytes sent");
  shared.consumer_gate.notify_all();
  Ok(len)
}

// --- Receive ---

/// The blocking receive. Waits for `out.len()` bytes unless every producer
/// has gone, in which case whatever is buffered is returned (zero bytes at
/// end of stream). Closing the calling handle ends the wait with `Closed`.
pub(crate) fn recv_sync(
  shared: &Arc<ChannelShared>,
  closed: &AtomicBool,
  out: &mut [u8],
  opts: &WaitOptions<'_>,
) -> Result<usize, RecvError> {
  let want = out.len();
  if want > shared.capacity {
    return Err(RecvError::RequestTooLarge {
      len: want,
      capacity: shared.capacity,
    });
  }

  let _registration = opts.register(shared);
  let mut guard = shared.internal.lock();

  wait_on_gate(shared, &mut guard, Role::Consumer, opts, |st| {
    closed.load(Ordering::Acquire) || st.ring.len() >= want || st.producers == 0
  })?;

  if closed.load(Ordering::Acquire) {
    debug!(want, "fifo receive abandoned: handle closed");
    return Err(RecvError::Closed);
  }

  if guard.ring.is_empty() && guard.producers == 0 {
    debug!("fifo end of stream");
    return Ok(0);
  }

  let n = guard.ring.pop_into(out);
  trace!(n, buffered = guard.ring.len(), "fifo bytes received");
  shared.producer_gate.notify_all();
  Ok(n)
}

/// The non-blocking receive.
pub(crate) fn try_recv_core(shared: &ChannelShared, out: &mut [u8]) -> Result<usize, TryRecvError> {
  let want = out.len();
  if want > shared.capacity {
    return Err(TryRecvError::RequestTooLarge {
      len: want,
      capacity: shared.capacity,
    });
  }

  let mut guard = shared.internal.lock();
  if guard.ring.len() < want && guard.producers > 0 {
    return Err(TryRecvError::Empty);
  }
  if guard.ring.is_empty() {
    // Only reachable with no producers left (or a zero-length request).
    return Ok(0);
  }

  let n = guard.ring.pop_into(out);
  trace!(n, buffered = guard.ring.len(), "fifo bytes received");
  shared.producer_gate.notify_all();
  Ok(n)
}
