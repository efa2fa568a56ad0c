//! Synchronous request/acknowledge channel
//!
//! One request is in flight at a time (`&mut self`). Every request carries a
//! fresh sequence number and only a reply with the same number completes it;
//! late replies to earlier, timed-out requests are discarded.

use crate::error::{Result, TransportError};
use crate::transport::RequestTransport;
use prohand_core::wire;
use prohand_core::CommandEnvelope;
use std::time::Duration;
use tokio::time::{timeout_at, Instant};
use tracing::{debug, warn};

/// Default per-request timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(1000);

pub struct CommandChannel {
    transport: Box<dyn RequestTransport>,
    timeout: Duration,
    seq: u32,
}

impl CommandChannel {
    pub fn new(transport: Box<dyn RequestTransport>, timeout: Duration) -> Self {
        Self {
            transport,
            timeout,
            seq: 0,
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn describe(&self) -> String {
        self.transport.describe()
    }

    fn next_seq(&mut self) -> u32 {
        self.seq = self.seq.wrapping_add(1);
        self.seq
    }

    /// Send a request and wait for its acknowledgment
    pub async fn request(&mut self, cmd: &CommandEnvelope) -> Result<()> {
        let deadline = Instant::now() + self.timeout;
        self.request_until(cmd, deadline).await
    }

    /// Like [`request`](Self::request) but never waits past `deadline`
    pub async fn request_until(&mut self, cmd: &CommandEnvelope, deadline: Instant) -> Result<()> {
        // Encode first: a bad argument never reaches the transport
        let seq = self.next_seq();
        let frame = wire::encode_request(seq, cmd)?;

        let start = Instant::now();
        let deadline = deadline.min(start + self.timeout);

        debug!(
            seq = seq,
            command = cmd.name(),
            endpoint = %self.transport.describe(),
            "Sending request"
        );

        match timeout_at(deadline, self.exchange(seq, &frame)).await {
            Ok(Ok(())) => {
                debug!(seq = seq, "Request acknowledged");
                Ok(())
            }
            Ok(Err(e)) => {
                if !matches!(e, TransportError::Rejected { .. }) {
                    self.transport.reset();
                }
                debug!(seq = seq, error = %e, "Request failed");
                Err(e)
            }
            Err(_) => {
                self.transport.reset();
                let waited = Instant::now().saturating_duration_since(start);
                debug!(seq = seq, waited_ms = waited.as_millis() as u64, "Request timed out");
                Err(TransportError::Timeout(waited))
            }
        }
    }

    async fn exchange(&mut self, seq: u32, frame: &[u8]) -> Result<()> {
        self.transport.send(frame).await?;

        loop {
            let bytes = self.transport.recv().await?;
            let reply = match wire::decode_reply(&bytes) {
                Ok(reply) => reply,
                Err(e) => {
                    warn!(seq = seq, error = %e, "Discarding undecodable reply");
                    continue;
                }
            };

            if reply.seq != seq {
                debug!(expected = seq, got = reply.seq, "Discarding stale reply");
                continue;
            }

            if reply.rc != 0 {
                return Err(TransportError::Rejected { rc: reply.rc });
            }
            return Ok(());
        }
    }
}
