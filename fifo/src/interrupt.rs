// src/interrupt.rs

//! Cooperative cancellation for blocking channel calls.
//!
//! An [`Interrupt`] is a clonable token. Pass it to any `*_with` operation; if
//! another thread calls [`Interrupt::interrupt`] while that operation is
//! blocked, the operation wakes, rolls back its wait accounting (and, for
//! `open`, its registration) and returns an `Interrupted` error.
//!
//! A raised token stays raised until [`Interrupt::clear`] is called, so every
//! later call that would have to wait fails immediately. Calls that can
//! complete without waiting are not affected.

use crate::channel::core::ChannelShared;

use parking_lot::Mutex;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

#[derive(Default)]
struct InterruptInner {
  raised: AtomicBool,
  /// Channels a holder of this token is currently blocked (or about to block) on.
  blocked_on: Mutex<Vec<Arc<ChannelShared>>>,
}

/// A cancellation token for blocking channel operations.
///
/// # Examples
///
/// ```
/// use fibre_fifo::{BoundedChannel, Interrupt, OpenError, Role};
/// use std::thread;
///
/// let channel = BoundedChannel::new(16);
/// let interrupt = Interrupt::new();
///
/// let opener = {
///   let channel = channel.clone();
///   let interrupt = interrupt.clone();
///   // No consumer will ever arrive, so this blocks until interrupted.
///   thread::spawn(move || channel.open_with(Role::Producer, &interrupt).map(|_| ()))
/// };
///
/// interrupt.interrupt();
/// assert_eq!(opener.join().unwrap(), Err(OpenError::Interrupted));
/// assert_eq!(channel.state().producers, 0);
/// ```
#[derive(Clone, Default)]
pub struct Interrupt {
  inner: Arc<InterruptInner>,
}

impl fmt::Debug for Interrupt {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Interrupt")
      .field("raised", &self.is_interrupted())
      .field("blocked_on", &self.inner.blocked_on.lock().len())
      .finish()
  }
}

impl Interrupt {
  /// Creates a new, lowered token.
  pub fn new() -> Self {
    Self::default()
  }

  /// Raises the token and wakes every operation currently blocked with it.
  pub fn interrupt(&self) {
    self.inner.raised.store(true, Ordering::SeqCst);
    // Clone the targets out so no channel lock is taken while holding ours.
    let targets: Vec<Arc<ChannelShared>> = self.inner.blocked_on.lock().clone();
    for shared in targets {
      shared.wake_all();
    }
  }

  /// Lowers the token so it can be reused.
  pub fn clear(&self) {
    self.inner.raised.store(false, Ordering::SeqCst);
  }

  /// Returns `true` if the token has been raised and not cleared since.
  #[inline]
  pub fn is_interrupted(&self) -> bool {
    self.inner.raised.load(Ordering::SeqCst)
  }

  /// Records that the caller may block on `shared` until the returned guard drops.
  pub(crate) fn register(&self, shared: &Arc<ChannelShared>) -> Registration<'_> {
    self.inner.blocked_on.lock().push(Arc::clone(shared));
    Registration {
      interrupt: self,
      shared: Arc::clone(shared),
    }
  }
}

/// RAII guard returned by [`Interrupt::register`].
pub(crate) struct Registration<'a> {
  interrupt: &'a Interrupt,
  shared: Arc<ChannelShared>,
}

impl Drop for Registration<'_> {
  fn drop(&mut self) {
    let mut blocked_on = self.interrupt.inner.blocked_on.lock();
    if let Some(pos) = blocked_on.iter().position(|s| Arc::ptr_eq(s, &self.shared)) {
      blocked_on.swap_remove(pos);
    }
  }
}
