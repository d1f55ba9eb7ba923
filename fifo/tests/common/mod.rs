#![allow(dead_code)]

use fibre_fifo::{BoundedChannel, Consumer, Producer};
use std::thread;
use std::time::{Duration, Instant};

pub const SHORT_TIMEOUT: Duration = Duration::from_millis(100);
pub const LONG_TIMEOUT: Duration = Duration::from_secs(5);
pub const ITEMS_LOW: usize = 50;
pub const ITEMS_MEDIUM: usize = 200;
pub const ITEMS_HIGH: usize = 1000;

/// Polls `cond` every millisecond until it holds or `timeout` elapses.
pub fn wait_for(timeout: Duration, mut cond: impl FnMut() -> bool) -> bool {
  let deadline = Instant::now() + timeout;
  while !cond() {
    if Instant::now() >= deadline {
      return false;
    }
    thread::sleep(Duration::from_millis(1));
  }
  true
}

/// Opens a producer and a consumer, performing the rendezvous across two threads.
pub fn open_pair(channel: &BoundedChannel) -> (Producer, Consumer) {
  let opener = {
    let channel = channel.clone();
    thread::spawn(move || channel.open_consumer().expect("consumer open"))
  };
  let producer = channel.open_producer().expect("producer open");
  (producer, opener.join().expect("opener thread panicked"))
}
