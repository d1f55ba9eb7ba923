//! Bounded, named-pipe style byte channels for concurrent Rust applications.
//!
//! `fibre_fifo` provides [`BoundedChannel`], a fixed-capacity byte FIFO shared by
//! any number of producer and consumer handles. It reproduces the semantics of
//! a FIFO special file: opening one end blocks until the other end is open,
//! consumers see end of stream once every producer is gone, and producers get a
//! broken-channel error once every consumer is gone. Every blocking call can be
//! bounded by a timeout or cancelled with an [`Interrupt`] token without
//! leaving the channel in a half-updated state.
//!
//! On top of the channel sit `std::io` adapters for the handles, and a
//! [`Registry`] of named channels driven by YAML configuration and a small
//! administrative command language.

pub mod channel;
pub mod config;
pub mod error;
pub mod interrupt;
pub mod io;
pub mod registry;

// Public re-exports for convenience
pub use channel::{BoundedChannel, ChannelState, Consumer, Handle, Phase, Producer, Role};
pub use config::{ChannelConfig, ConfigError, RegistryConfig, MAX_CAPACITY};
pub use error::{
  CloseError, OpenError, RecvError, ResetError, SendError, TryRecvError, TrySendError,
};
pub use interrupt::Interrupt;
pub use registry::{AdminCommand, AdminOutcome, Registry, RegistryError};

// Helper function to check if a type is Send + Sync.
#[allow(dead_code)]
fn assert_send_sync<T: Send + Sync>() {}

#[allow(dead_code)]
fn assert_handles_send_sync() {
  assert_send_sync::<BoundedChannel>();
  assert_send_sync::<Producer>();
  assert_send_sync::<Consumer>();
  assert_send_sync::<Interrupt>();
  assert_send_sync::<Registry>();
}
