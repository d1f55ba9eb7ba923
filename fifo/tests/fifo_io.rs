mod common;
use common::*;

use fibre_fifo::BoundedChannel;
use std::io::{self, BufRead, BufReader, Read, Write};
use std::thread;

#[test]
fn io_write_then_read_to_end() {
  let channel = BoundedChannel::new(32);
  let (mut producer, mut consumer) = open_pair(&channel);

  let writer = thread::spawn(move || {
    for line in ["alpha\n", "beta\n", "gamma\n"] {
      producer.write_all(line.as_bytes()).unwrap();
    }
    producer.flush().unwrap();
    // Dropping the producer ends the stream.
  });

  let mut text = String::new();
  consumer.read_to_string(&mut text).unwrap();
  writer.join().unwrap();
  assert_eq!(text, "alpha\nbeta\ngamma\n");
}

#[test]
fn io_lines_through_buf_reader() {
  let channel = BoundedChannel::new(16);
  let (producer, consumer) = open_pair(&channel);

  let writer = thread::spawn(move || {
    let mut out = &producer;
    for i in 0..ITEMS_LOW {
      writeln!(out, "{}", i).unwrap();
    }
  });

  // BufReader's 8 KiB fills are clamped to the 16-byte channel.
  let reader = BufReader::new(&consumer);
  let lines: Vec<usize> = reader
    .lines()
    .map(|line| line.unwrap().parse().unwrap())
    .collect();
  writer.join().unwrap();
  assert_eq!(lines, (0..ITEMS_LOW).collect::<Vec<_>>());
}

#[test]
fn io_large_buffers_move_in_capacity_sized_pieces() {
  let channel = BoundedChannel::new(4);
  let (mut producer, mut consumer) = open_pair(&channel);

  assert_eq!(producer.write(b"too long").unwrap(), 4);
  let mut big = [0u8; 16];
  assert_eq!(consumer.read(&mut big).unwrap(), 4);
  assert_eq!(&big[..4], b"too ");

  let payload: Vec<u8> = (0..=255u8).collect();
  let writer = thread::spawn(move || {
    producer.write_all(&payload).unwrap();
    payload
  });
  let mut received = Vec::new();
  consumer.read_to_end(&mut received).unwrap();
  assert_eq!(received, writer.join().unwrap());
}

#[test]
fn io_errors_carry_pipe_kinds() {
  let channel = BoundedChannel::new(4);
  let (mut producer, consumer) = open_pair(&channel);

  drop(consumer);
  let err = producer.write(b"x").unwrap_err();
  assert_eq!(err.kind(), io::ErrorKind::BrokenPipe);

  producer.close().unwrap();
  let err = producer.write(b"x").unwrap_err();
  assert_eq!(err.kind(), io::ErrorKind::NotConnected);
}

#[test]
fn io_read_returns_zero_at_end_of_stream() {
  let channel = BoundedChannel::new(4);
  let (producer, mut consumer) = open_pair(&channel);
  drop(producer);

  let mut buf = [0u8; 2];
  assert_eq!(consumer.read(&mut buf).unwrap(), 0);
}
