mod common;
use common::*;

use fibre_fifo::{
  BoundedChannel, ChannelState, Interrupt, OpenError, Phase, RecvError, Role, SendError,
};
use std::sync::Arc;
use std::thread;

#[test]
fn fifo_sync_smoke() {
  let channel = BoundedChannel::new(16);
  let (producer, consumer) = open_pair(&channel);
  producer.send(b"hello").unwrap();
  assert_eq!(consumer.receive(5).unwrap(), b"hello");
}

#[test]
fn fifo_sync_producer_open_waits_for_consumer() {
  let channel = BoundedChannel::new(8);
  let producer_thread = {
    let channel = channel.clone();
    thread::spawn(move || channel.open_producer().unwrap())
  };

  thread::sleep(SHORT_TIMEOUT);
  assert!(!producer_thread.is_finished(), "producer opened without a consumer");

  let consumer = channel.open_consumer().unwrap();
  let producer = producer_thread.join().unwrap();
  producer.send(b"x").unwrap();
  assert_eq!(consumer.receive(1).unwrap(), b"x");
}

#[test]
fn fifo_sync_consumer_open_waits_for_producer() {
  let channel = BoundedChannel::new(8);
  let consumer_thread = {
    let channel = channel.clone();
    thread::spawn(move || channel.open_consumer().unwrap())
  };

  thread::sleep(SHORT_TIMEOUT);
  assert!(!consumer_thread.is_finished(), "consumer opened without a producer");

  let _producer = channel.open_producer().unwrap();
  consumer_thread.join().unwrap();
}

#[test]
fn fifo_sync_capacity_four_scenario() {
  let channel = BoundedChannel::new(4);
  let (producer, consumer) = open_pair(&channel);

  assert_eq!(producer.send(b"AB"), Ok(2));
  assert_eq!(channel.len(), 2);

  let sender = thread::spawn(move || {
    let result = producer.send(b"CDE");
    (producer, result)
  });
  assert!(wait_for(LONG_TIMEOUT, || channel.state().waiting_producers == 1));

  assert_eq!(consumer.receive(2).unwrap(), b"AB");
  let (_producer, result) = sender.join().unwrap();
  assert_eq!(result, Ok(3));
  assert_eq!(channel.len(), 3);
  assert_eq!(consumer.receive(3).unwrap(), b"CDE");
}

#[test]
fn fifo_sync_consumer_sees_eof_when_producer_never_writes() {
  let channel = BoundedChannel::new(4);

  let consumer_thread = {
    let channel = channel.clone();
    thread::spawn(move || {
      let consumer = channel.open_consumer().unwrap();
      consumer.receive(1)
    })
  };
  assert!(wait_for(LONG_TIMEOUT, || channel.state().waiting_consumers == 1));

  let producer = channel.open_producer().unwrap();
  producer.close().unwrap();

  assert_eq!(consumer_thread.join().unwrap(), Ok(Vec::new()));
  assert_eq!(channel.phase(), Phase::Idle);
}

#[test]
fn fifo_sync_blocked_send_gets_broken_channel() {
  let channel = BoundedChannel::new(1);
  let (producer, consumer) = open_pair(&channel);
  producer.send(b"a").unwrap();

  let sender = thread::spawn(move || producer.send(b"b"));
  assert!(wait_for(LONG_TIMEOUT, || channel.state().waiting_producers == 1));

  drop(consumer);
  assert_eq!(sender.join().unwrap(), Err(SendError::BrokenChannel));
}

#[test]
fn fifo_sync_interrupts_restore_counters() {
  let channel = BoundedChannel::new(4);
  let (producer, consumer) = open_pair(&channel);
  producer.send(b"abcd").unwrap();
  let producer = Arc::new(producer);

  let before: ChannelState = channel.state();
  let interrupt = Interrupt::new();

  // A blocked send.
  let sender = {
    let producer = Arc::clone(&producer);
    let interrupt = interrupt.clone();
    thread::spawn(move || producer.send_with(b"e", &interrupt))
  };
  assert!(wait_for(LONG_TIMEOUT, || channel.state().waiting_producers == 1));
  interrupt.interrupt();
  assert_eq!(sender.join().unwrap(), Err(SendError::Interrupted));
  assert_eq!(channel.state(), before);
  interrupt.clear();

  // A blocked receive, after draining.
  assert_eq!(consumer.receive(4).unwrap(), b"abcd");
  let before = channel.state();
  let receiver = {
    let interrupt = interrupt.clone();
    thread::spawn(move || {
      let result = consumer.receive_with(2, &interrupt);
      (consumer, result)
    })
  };
  assert!(wait_for(LONG_TIMEOUT, || channel.state().waiting_consumers == 1));
  interrupt.interrupt();
  let (_consumer, result) = receiver.join().unwrap();
  assert_eq!(result, Err(RecvError::Interrupted));
  assert_eq!(channel.state(), before);
}

#[test]
fn fifo_sync_interrupted_open_restores_counters() {
  let channel = BoundedChannel::new(4);
  let before = channel.state();
  let interrupt = Interrupt::new();

  let opener = {
    let channel = channel.clone();
    let interrupt = interrupt.clone();
    thread::spawn(move || channel.open_with(Role::Producer, &interrupt).map(|_| ()))
  };
  assert!(wait_for(LONG_TIMEOUT, || channel.state().waiting_producers == 1));
  interrupt.interrupt();

  assert_eq!(opener.join().unwrap(), Err(OpenError::Interrupted));
  assert_eq!(channel.state(), before);
}

#[test]
fn fifo_sync_length_stays_within_capacity() {
  const CAPACITY: usize = 7;
  let channel = BoundedChannel::new(CAPACITY);
  let (producer, consumer) = open_pair(&channel);

  let sender = thread::spawn(move || {
    for i in 0..ITEMS_MEDIUM {
      let chunk = vec![i as u8; 1 + i % CAPACITY];
      producer.send(&chunk).unwrap();
    }
  });

  let observer = {
    let channel = channel.clone();
    thread::spawn(move || {
      for _ in 0..ITEMS_MEDIUM {
        assert!(channel.len() <= CAPACITY);
        thread::yield_now();
      }
    })
  };

  let mut received = Vec::new();
  loop {
    // One byte at a time: any buffered byte satisfies the request.
    let chunk = consumer.receive(1).unwrap();
    if chunk.is_empty() {
      break;
    }
    received.extend_from_slice(&chunk);
  }

  sender.join().unwrap();
  observer.join().unwrap();

  let expected: Vec<u8> = (0..ITEMS_MEDIUM)
    .flat_map(|i| std::iter::repeat(i as u8).take(1 + i % CAPACITY))
    .collect();
  assert_eq!(received, expected);
}

#[test]
fn fifo_sync_channel_is_reusable_after_idle() {
  let channel = BoundedChannel::new(8);
  for round in 0..3u8 {
    let (producer, consumer) = open_pair(&channel);
    producer.send(&[round; 4]).unwrap();
    // Leave bytes behind on purpose; going idle must discard them.
    drop(producer);
    drop(consumer);
    assert_eq!(channel.state().len, 0, "round {}", round);
  }
}

#[test]
fn fifo_sync_send_blocked_on_a_closed_handle_writes_nothing() {
  let channel = BoundedChannel::new(1);
  let (producer, consumer) = open_pair(&channel);
  producer.send(b"a").unwrap();

  let result = thread::scope(|s| {
    let pending = s.spawn(|| producer.send(b"b"));
    assert!(wait_for(LONG_TIMEOUT, || channel.state().waiting_producers == 1));
    producer.close().unwrap();
    pending.join().unwrap()
  });

  assert_eq!(result, Err(SendError::Closed));
  assert_eq!(channel.state().producers, 0);
  assert_eq!(consumer.receive(1).unwrap(), b"a");
  assert_eq!(consumer.receive(1).unwrap(), Vec::<u8>::new());
}
