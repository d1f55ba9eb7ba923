// src/error.rs

//! Error types returned by channel handles.
//!
//! Each blocking operation has its own error enum so callers can match only on
//! the outcomes that operation can actually produce. End of stream is not an
//! error: a receive that finds the channel drained with no producers left
//! returns zero bytes.

use thiserror::Error;

/// Error returned by the blocking `open` family.
#[derive(Debug, Error, PartialEq, Eq, Clone, Copy)]
pub enum OpenError {
  /// The wait for a peer of the opposite role was interrupted.
  /// The handle was never registered.
  #[error("open interrupted while waiting for a peer")]
  Interrupted,
  /// The deadline passed before a peer of the opposite role arrived.
  #[error("open timed out while waiting for a peer")]
  TimedOut,
}

/// Error returned by `send` operations that can block.
#[derive(Debug, Error, PartialEq, Eq, Clone, Copy)]
pub enum SendError {
  /// The request is larger than the channel could ever hold.
  #[error("send of {len} bytes exceeds channel capacity of {capacity} bytes")]
  RequestTooLarge { len: usize, capacity: usize },
  /// Every consumer is gone; nobody will ever read the bytes.
  #[error("channel broken: no consumers remain")]
  BrokenChannel,
  /// The wait for buffer space was interrupted. Nothing was written.
  #[error("send interrupted while waiting for space")]
  Interrupted,
  /// The deadline passed before enough space became free. Nothing was written.
  #[error("send timed out while waiting for space")]
  TimedOut,
  /// This producer handle has already been closed.
  #[error("producer handle is closed")]
  Closed,
}

/// Error returned by `try_send`.
#[derive(Debug, Error, PartialEq, Eq, Clone, Copy)]
pub enum TrySendError {
  #[error("send of {len} bytes exceeds channel capacity of {capacity} bytes")]
  RequestTooLarge { len: usize, capacity: usize },
  /// Not enough free space for the whole request right now.
  #[error("channel full")]
  Full,
  #[error("channel broken: no consumers remain")]
  BrokenChannel,
  #[error("producer handle is closed")]
  Closed,
}

/// Error returned by `receive` operations that can block.
#[derive(Debug, Error, PartialEq, Eq, Clone, Copy)]
pub enum RecvError {
  /// The request is larger than the channel could ever hold.
  #[error("receive of {len} bytes exceeds channel capacity of {capacity} bytes")]
  RequestTooLarge { len: usize, capacity: usize },
  /// The wait for data was interrupted. Nothing was consumed.
  #[error("receive interrupted while waiting for data")]
  Interrupted,
  /// The deadline passed before enough data arrived. Nothing was consumed.
  #[error("receive timed out while waiting for data")]
  TimedOut,
  /// This consumer handle has already been closed.
  #[error("consumer handle is closed")]
  Closed,
}

/// Error returned by `try_receive`.
#[derive(Debug, Error, PartialEq, Eq, Clone, Copy)]
pub enum TryRecvError {
  #[error("receive of {len} bytes exceeds channel capacity of {capacity} bytes")]
  RequestTooLarge { len: usize, capacity: usize },
  /// Fewer bytes than requested are buffered and producers are still present.
  #[error("channel empty")]
  Empty,
  #[error("consumer handle is closed")]
  Closed,
}

/// Error returned when attempting to close an already closed handle.
#[derive(Debug, Error, PartialEq, Eq, Clone, Copy)]
#[error("handle is already closed")]
pub struct CloseError;

/// Error returned by [`BoundedChannel::reset`](crate::BoundedChannel::reset).
#[derive(Debug, Error, PartialEq, Eq, Clone, Copy)]
pub enum ResetError {
  /// Handles are still open; the buffer belongs to them.
  #[error("channel busy: {producers} producer(s) and {consumers} consumer(s) still open")]
  ChannelBusy { producers: usize, consumers: usize },
}

/// Why a blocking wait ended without its condition becoming true.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub(crate) enum WaitAbort {
  Interrupted,
  TimedOut,
}

impl From<WaitAbort> for OpenError {
  fn from(abort: WaitAbort) -> Self {
    match abort {
      WaitAbort::Interrupted => OpenError::Interrupted,
      WaitAbort::TimedOut => OpenError::TimedOut,
    }
  }
}

impl From<WaitAbort> for SendError {
  fn from(abort: WaitAbort) -> Self {
    match abort {
      WaitAbort::Interrupted => SendError::Interrupted,
      WaitAbort::TimedOut => SendError::TimedOut,
    }
  }
}

impl From<WaitAbort> for RecvError {
  fn from(abort: WaitAbort) -> Self {
    match abort {
      WaitAbort::Interrupted => RecvError::Interrupted,
      WaitAbort::TimedOut => RecvError::TimedOut,
    }
  }
}
