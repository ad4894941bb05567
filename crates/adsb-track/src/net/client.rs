//! Per-client connection state: receive buffer owner (via its
//! [`Framer`](super::framing::Framer)), send queue and activity timestamps
//! (spec.md §3.6, §4.7).

use super::framing::{Framer, FramingMode};
use std::collections::VecDeque;
use std::fmt;
use tokio::io::{AsyncWrite, AsyncWriteExt};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientError {
    SendQueueOverflow,
    HeartbeatTimeout,
    GarbageThreshold,
    Io,
}

impl fmt::Display for ClientError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClientError::SendQueueOverflow => write!(f, "send queue overflow"),
            ClientError::HeartbeatTimeout => write!(f, "heartbeat timeout"),
            ClientError::GarbageThreshold => write!(f, "garbage threshold exceeded"),
            ClientError::Io => write!(f, "I/O error"),
        }
    }
}

impl std::error::Error for ClientError {}

/// One open connection, in either direction. `receiver_id` is filled in
/// from a Beast `0xE3`/`0xE4` sub-record or a PROXY v1 header once seen.
pub struct Client {
    pub id: u64,
    pub receiver_id: u64,
    pub framer: Framer,
    send_queue: VecDeque<Vec<u8>>,
    pub sendq_max: usize,
    pub last_read_ms: u64,
    pub last_write_ms: u64,
    pub position_counter: u64,
}

/// Per-spec.md §4.7: `flushClient` writes up to this many times per call.
const MAX_WRITES_PER_FLUSH: usize = 2;
/// No successful write in this long disconnects the client.
pub const WRITE_STALL_MS: u64 = 5_000;

impl Client {
    pub fn new(id: u64, mode: FramingMode, sendq_max: usize, now_ms: u64) -> Self {
        Client {
            id,
            receiver_id: 0,
            framer: Framer::new(mode),
            send_queue: VecDeque::new(),
            sendq_max,
            last_read_ms: now_ms,
            last_write_ms: now_ms,
            position_counter: 0,
        }
    }

    pub fn enqueue(&mut self, bytes: Vec<u8>) -> Result<(), ClientError> {
        if self.send_queue.len() >= self.sendq_max {
            return Err(ClientError::SendQueueOverflow);
        }
        self.send_queue.push_back(bytes);
        Ok(())
    }

    pub fn queue_len(&self) -> usize {
        self.send_queue.len()
    }

    /// Writes up to `MAX_WRITES_PER_FLUSH` queued buffers, deferring on
    /// `WouldBlock`. Returns the number of buffers actually written.
    pub async fn flush<W: AsyncWrite + Unpin>(
        &mut self,
        writer: &mut W,
        now_ms: u64,
    ) -> Result<usize, ClientError> {
        let mut written = 0;
        for _ in 0..MAX_WRITES_PER_FLUSH {
            let Some(next) = self.send_queue.front() else { break };
            match writer.write_all(next).await {
                Ok(()) => {
                    self.send_queue.pop_front();
                    self.last_write_ms = now_ms;
                    written += 1;
                }
                Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => break,
                Err(_) => return Err(ClientError::Io),
            }
        }
        Ok(written)
    }

    /// `now - last_write > WRITE_STALL_MS` and the queue is non-empty: the
    /// peer has stopped draining us.
    pub fn write_stalled(&self, now_ms: u64) -> bool {
        !self.send_queue.is_empty()
            && now_ms.saturating_sub(self.last_write_ms) > WRITE_STALL_MS
    }

    pub fn heartbeat_due(&self, now_ms: u64, interval_ms: u64) -> bool {
        now_ms.saturating_sub(self.last_write_ms) >= interval_ms
    }

    /// Idle inbound clients are disconnected after `interval + 5s` with no
    /// bytes read (spec.md §4.7).
    pub fn read_timed_out(&self, now_ms: u64, heartbeat_interval_ms: u64) -> bool {
        now_ms.saturating_sub(self.last_read_ms) > heartbeat_interval_ms + 5_000
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn enqueue_respects_sendq_max() {
        let mut c = Client::new(1, FramingMode::Beast, 2, 0);
        assert!(c.enqueue(vec![1]).is_ok());
        assert!(c.enqueue(vec![2]).is_ok());
        assert_eq!(c.enqueue(vec![3]), Err(ClientError::SendQueueOverflow));
    }

    #[tokio::test]
    async fn flush_writes_up_to_two_buffers() {
        let mut c = Client::new(1, FramingMode::Beast, 10, 0);
        c.enqueue(vec![1]).unwrap();
        c.enqueue(vec![2]).unwrap();
        c.enqueue(vec![3]).unwrap();
        let mut sink = Vec::new();
        let written = c.flush(&mut sink, 100).await.unwrap();
        assert_eq!(written, 2);
        assert_eq!(c.queue_len(), 1);
    }

    #[test]
    fn write_stall_detection() {
        let mut c = Client::new(1, FramingMode::Beast, 10, 0);
        c.enqueue(vec![1]).unwrap();
        assert!(!c.write_stalled(1_000));
        assert!(c.write_stalled(WRITE_STALL_MS + 1));
    }
}
