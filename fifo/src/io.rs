// src/io.rs

//! `std::io` adapters for channel handles.
//!
//! A [`Producer`] is a [`Write`] and a [`Consumer`] is a [`Read`], so a channel
//! can stand in wherever a pipe file would be used. The semantics are the
//! channel's, not a byte stream's:
//!
//! - Each call is clamped to the channel capacity. A `buf` that fits is moved
//!   whole; a larger one is moved one capacity-sized piece per call, the way a
//!   pipe only guarantees atomic writes up to `PIPE_BUF`.
//! - `write(buf)` blocks until the (clamped) request fits, then writes all of it.
//! - `read(buf)` blocks until the (clamped) request is buffered, and returns
//!   fewer only once every producer is gone (`Ok(0)` is end of stream).
//!
//! The channel error types convert into `io::Error` with these kinds:
//!
//! | channel error              | `io::ErrorKind`  |
//! |----------------------------|------------------|
//! | `RequestTooLarge`          | `StorageFull`    |
//! | `BrokenChannel`            | `BrokenPipe`     |
//! | `Interrupted`              | `Interrupted`    |
//! | `TimedOut`                 | `TimedOut`       |
//! | `Full` / `Empty`           | `WouldBlock`     |
//! | `Closed` (handle)          | `NotConnected`   |

use crate::channel::{Consumer, Producer};
use crate::error::{OpenError, RecvError, SendError, TryRecvError, TrySendError};
use crate::registry::RegistryError;

use std::io::{self, Read, Write};

impl From<OpenError> for io::Error {
  fn from(err: OpenError) -> Self {
    let kind = match err {
      OpenError::Interrupted => io::ErrorKind::Interrupted,
      OpenError::TimedOut => io::ErrorKind::TimedOut,
    };
    io::Error::new(kind, err)
  }
}

impl From<SendError> for io::Error {
  fn from(err: SendError) -> Self {
    let kind = match err {
      SendError::RequestTooLarge { .. } => io::ErrorKind::StorageFull,
      SendError::BrokenChannel => io::ErrorKind::BrokenPipe,
      SendError::Interrupted => io::ErrorKind::Interrupted,
      SendError::TimedOut => io::ErrorKind::TimedOut,
      SendError::Closed => io::ErrorKind::NotConnected,
    };
    io::Error::new(kind, err)
  }
}

impl From<TrySendError> for io::Error {
  fn from(err: TrySendError) -> Self {
    let kind = match err {
      TrySendError::RequestTooLarge { .. } => io::ErrorKind::StorageFull,
      TrySendError::Full => io::ErrorKind::WouldBlock,
      TrySendError::BrokenChannel => io::ErrorKind::BrokenPipe,
      TrySendError::Closed => io::ErrorKind::NotConnected,
    };
    io::Error::new(kind, err)
  }
}

impl From<RecvError> for io::Error {
  fn from(err: RecvError) -> Self {
    let kind = match err {
      RecvError::RequestTooLarge { .. } => io::ErrorKind::StorageFull,
      RecvError::Interrupted => io::ErrorKind::Interrupted,
      RecvError::TimedOut => io::ErrorKind::TimedOut,
      RecvError::Closed => io::ErrorKind::NotConnected,
    };
    io::Error::new(kind, err)
  }
}

impl From<TryRecvError> for io::Error {
  fn from(err: TryRecvError) -> Self {
    let kind = match err {
      TryRecvError::RequestTooLarge { .. } => io::ErrorKind::StorageFull,
      TryRecvError::Empty => io::ErrorKind::WouldBlock,
      TryRecvError::Closed => io::ErrorKind::NotConnected,
    };
    io::Error::new(kind, err)
  }
}

impl From<RegistryError> for io::Error {
  fn from(err: RegistryError) -> Self {
    let kind = match &err {
      RegistryError::LimitReached { .. } => io::ErrorKind::StorageFull,
      RegistryError::AlreadyExists(_) => io::ErrorKind::AlreadyExists,
      RegistryError::NotFound(_) => io::ErrorKind::NotFound,
      _ => io::ErrorKind::InvalidInput,
    };
    io::Error::new(kind, err)
  }
}

// --- Write for producers ---

impl Write for Producer {
  fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
    (&*self).write(buf)
  }

  fn flush(&mut self) -> io::Result<()> {
    Ok(())
  }
}

impl Write for &Producer {
  fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
    let len = buf.len().min(self.capacity());
    Ok(self.send(&buf[..len])?)
  }

  fn flush(&mut self) -> io::Result<()> {
    // Sent bytes are already visible to consumers.
    Ok(())
  }
}

// --- Read for consumers ---

impl Read for Consumer {
  fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
    (&*self).read(buf)
  }
}

impl Read for &Consumer {
  fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
    let len = buf.len().min(self.capacity());
    Ok(self.receive_into(&mut buf[..len])?)
  }
}
