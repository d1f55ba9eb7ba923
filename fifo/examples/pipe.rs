// examples/pipe.rs
//
// Run with `RUST_LOG=fibre_fifo=debug cargo run --example pipe` to watch the
// channel's open/close lifecycle.

use fibre_fifo::{Interrupt, OpenError, Registry, RegistryConfig, Role, SendError};
use std::io::{BufRead, BufReader, Write};
use std::{thread, time::Duration};
use tracing_subscriber::EnvFilter;

const CONFIG: &str = r#"
max_entries: 4
default_capacity: 32
channels:
  - name: lines
  - name: tiny
    capacity: 4
"#;

fn main() {
  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
    .init();

  let config = RegistryConfig::from_yaml_str(CONFIG).expect("example config is valid");
  let registry = Registry::from_config(&config).expect("registry builds");
  println!("Registry channels: {:?}", registry.names());

  println!("\n--- Line-oriented pipe through std::io ---");
  {
    let channel = registry.get("lines").expect("preset channel");
    let writer = {
      let channel = channel.clone();
      thread::spawn(move || {
        let mut producer = channel.open_producer().expect("producer open");
        for i in 0..5 {
          writeln!(producer, "line {}", i).expect("write");
          thread::sleep(Duration::from_millis(10));
        }
        println!("[Writer] Done, closing.");
      })
    };

    let consumer = channel.open_consumer().expect("consumer open");
    for line in BufReader::new(&consumer).lines() {
      println!("[Reader] {}", line.expect("read line"));
    }
    println!("[Reader] End of stream.");
    writer.join().expect("writer thread panicked");
  }

  println!("\n--- All-or-nothing sends on a 4-byte channel ---");
  {
    let channel = registry.get("tiny").expect("preset channel");
    let sender = {
      let channel = channel.clone();
      thread::spawn(move || {
        let producer = channel.open(Role::Producer).expect("open").into_producer().expect("producer");
        producer.send(b"AB").expect("send AB");
        println!("[Producer] Sent \"AB\"; \"CDE\" must wait for room.");
        producer.send(b"CDE").expect("send CDE");
        println!("[Producer] Sent \"CDE\".");
        producer.send(b"XYZW").expect("send XYZW");
        // The buffer is full and the consumer leaves without reading.
        match producer.send(b"!") {
          Err(SendError::BrokenChannel) => println!("[Producer] Consumer gone: broken channel."),
          other => println!("[Producer] Unexpected: {:?}", other),
        }
      })
    };

    let consumer = channel.open_consumer().expect("consumer open");
    thread::sleep(Duration::from_millis(50));
    let first = consumer.receive(2).expect("receive");
    println!("[Consumer] Got {:?}", String::from_utf8_lossy(&first));
    let second = consumer.receive(3).expect("receive");
    println!("[Consumer] Got {:?}", String::from_utf8_lossy(&second));
    thread::sleep(Duration::from_millis(50));
    println!("[Consumer] Leaving with {} bytes unread.", consumer.len());
    drop(consumer);
    sender.join().expect("sender thread panicked");
  }

  println!("\n--- Cancelling a blocked open ---");
  {
    registry.execute("new cancel 8").expect("admin command");
    let channel = registry.get("cancel").expect("created channel");
    let interrupt = Interrupt::new();

    let waiter = {
      let channel = channel.clone();
      let interrupt = interrupt.clone();
      thread::spawn(move || {
        // Nobody ever produces, so this blocks until interrupted.
        match channel.open_with(Role::Consumer, &interrupt) {
          Err(OpenError::Interrupted) => println!("[Waiter] Open interrupted."),
          Ok(handle) => println!("[Waiter] Unexpectedly opened {:?}.", handle.role()),
          Err(err) => println!("[Waiter] Unexpected: {}", err),
        }
      })
    };

    thread::sleep(Duration::from_millis(50));
    interrupt.interrupt();
    waiter.join().expect("waiter thread panicked");
    println!("State after cancel: {:?}", channel.state());

    registry.execute("delete cancel").expect("admin command");
  }

  println!("\nRegistry channels: {:?}", registry.names());
}
