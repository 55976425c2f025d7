//! Incoming byte buffer
//!
//! This module provides the `ReadBuffer` sitting between the background
//! ingestion thread and the frame reader: an ordered byte queue with
//! deadline-bounded blocking reads and an atomic drain for resetting state
//! between command/response exchanges.

use std::collections::VecDeque;
use std::sync::{Condvar, Mutex};
use std::time::Instant;

use crate::error::{PrologixError, Result};

/// Ordered first-in-first-out byte queue shared between the channel's
/// ingestion thread (producer) and the frame reader (consumer)
///
/// `ingest`/`extend`, `next_byte` and `clear` are linearizable with respect
/// to each other; each ingested byte is delivered exactly once, in arrival
/// order, to either a `next_byte` caller or a `clear` drain. The buffer is
/// created once per connection and reset (not destroyed) between exchanges.
#[derive(Debug, Default)]
pub struct ReadBuffer {
    bytes: Mutex<VecDeque<u8>>,
    available: Condvar,
}

impl ReadBuffer {
    /// Create an empty buffer
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one byte arriving from the channel
    ///
    /// Called only by the background ingestion thread, never by the reader.
    pub fn ingest(&self, byte: u8) {
        let mut bytes = self.bytes.lock().unwrap();
        bytes.push_back(byte);
        self.available.notify_one();
    }

    /// Append a run of bytes arriving from the channel, preserving order
    pub fn extend(&self, chunk: &[u8]) {
        if chunk.is_empty() {
            return;
        }
        let mut bytes = self.bytes.lock().unwrap();
        bytes.extend(chunk);
        self.available.notify_one();
    }

    /// Take the next byte, waiting until one is available or `deadline`
    /// passes
    ///
    /// Every wait is bounded by the time remaining until the absolute
    /// deadline, so a caller performing many sequential fetches spends at
    /// most the original timeout in total. Fails with `Timeout` once the
    /// deadline is reached with the buffer still empty.
    pub fn next_byte(&self, deadline: Instant) -> Result<u8> {
        let entered = Instant::now();
        let mut bytes = self.bytes.lock().unwrap();
        loop {
            if let Some(byte) = bytes.pop_front() {
                return Ok(byte);
            }

            let now = Instant::now();
            if now >= deadline {
                return Err(PrologixError::Timeout {
                    elapsed: now.duration_since(entered),
                });
            }

            let (guard, _) = self
                .available
                .wait_timeout(bytes, deadline.duration_since(now))
                .unwrap();
            bytes = guard;
        }
    }

    /// Atomically empty the buffer, returning the discarded bytes
    ///
    /// Called before starting a new exchange so stale bytes from a previous,
    /// possibly aborted exchange cannot corrupt the next read.
    pub fn clear(&self) -> Vec<u8> {
        let mut bytes = self.bytes.lock().unwrap();
        bytes.drain(..).collect()
    }

    /// Number of buffered, not-yet-read bytes
    pub fn len(&self) -> usize {
        self.bytes.lock().unwrap().len()
    }

    /// Whether no bytes are waiting
    pub fn is_empty(&self) -> bool {
        self.bytes.lock().unwrap().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    fn deadline_in(ms: u64) -> Instant {
        Instant::now() + Duration::from_millis(ms)
    }

    #[test]
    fn test_fifo_order() {
        let buffer = ReadBuffer::new();
        buffer.ingest(1);
        buffer.ingest(2);
        buffer.extend(&[3, 4]);

        assert_eq!(buffer.next_byte(deadline_in(100)).unwrap(), 1);
        assert_eq!(buffer.next_byte(deadline_in(100)).unwrap(), 2);
        assert_eq!(buffer.next_byte(deadline_in(100)).unwrap(), 3);
        assert_eq!(buffer.next_byte(deadline_in(100)).unwrap(), 4);
    }

    #[test]
    fn test_next_byte_times_out_when_empty() {
        let buffer = ReadBuffer::new();
        let started = Instant::now();
        let err = buffer.next_byte(deadline_in(50)).unwrap_err();
        let elapsed = started.elapsed();

        assert!(err.is_timeout());
        assert!(elapsed >= Duration::from_millis(45), "returned early: {:?}", elapsed);
        assert!(elapsed < Duration::from_millis(500), "returned late: {:?}", elapsed);
    }

    #[test]
    fn test_next_byte_past_deadline_fails_immediately() {
        let buffer = ReadBuffer::new();
        let deadline = Instant::now() - Duration::from_millis(1);
        assert!(buffer.next_byte(deadline).unwrap_err().is_timeout());
    }

    #[test]
    fn test_clear_returns_pending_bytes() {
        let buffer = ReadBuffer::new();
        buffer.extend(b"stale");
        assert_eq!(buffer.clear(), b"stale");
        assert!(buffer.is_empty());
        assert!(buffer.next_byte(deadline_in(10)).unwrap_err().is_timeout());
    }

    #[test]
    fn test_clear_on_empty_buffer() {
        let buffer = ReadBuffer::new();
        assert!(buffer.clear().is_empty());
    }

    #[test]
    fn test_blocked_reader_woken_by_ingest() {
        let buffer = Arc::new(ReadBuffer::new());

        let producer = {
            let buffer = Arc::clone(&buffer);
            std::thread::spawn(move || {
                std::thread::sleep(Duration::from_millis(20));
                buffer.ingest(0x42);
            })
        };

        assert_eq!(buffer.next_byte(deadline_in(1000)).unwrap(), 0x42);
        producer.join().unwrap();
    }

    #[test]
    fn test_concurrent_producer_delivers_in_order() {
        const COUNT: usize = 5000;
        let buffer = Arc::new(ReadBuffer::new());

        let producer = {
            let buffer = Arc::clone(&buffer);
            std::thread::spawn(move || {
                for i in 0..COUNT {
                    buffer.ingest((i % 256) as u8);
                    if i % 512 == 0 {
                        // Let the reader catch up so both interleavings
                        // (byte waiting, reader blocked) are exercised
                        std::thread::yield_now();
                    }
                }
            })
        };

        for i in 0..COUNT {
            let byte = buffer.next_byte(deadline_in(5000)).unwrap();
            assert_eq!(byte, (i % 256) as u8, "out of order at index {}", i);
        }
        producer.join().unwrap();
        assert!(buffer.is_empty());
    }
}
