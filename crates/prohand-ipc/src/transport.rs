//! Transport seams below the channels
//!
//! Transports move opaque envelope bytes; encoding and matching live in the
//! channels. Socket transports implement these for real hosts and the mock
//! host implements them in memory.

use crate::error::Result;
use async_trait::async_trait;

/// Request/reply transport used by the command channel
#[async_trait]
pub trait RequestTransport: Send {
    async fn send(&mut self, frame: &[u8]) -> Result<()>;

    /// Wait for the next reply frame
    async fn recv(&mut self) -> Result<Vec<u8>>;

    /// Discard connection state after a timed-out or failed exchange
    fn reset(&mut self);

    fn describe(&self) -> String;
}

/// One-way, non-blocking publisher used by the streaming channel
pub trait PublishTransport: Send {
    /// Queue a frame for delivery; never waits on the peer
    fn publish(&mut self, frame: Vec<u8>) -> Result<()>;

    fn describe(&self) -> String;
}

/// One-way, non-blocking subscriber used by the status channel
pub trait SubscribeTransport: Send {
    /// Most recent pending frame, if any
    fn try_recv(&mut self) -> Result<Option<Vec<u8>>>;

    /// Changes whenever the publisher side was reconnected
    ///
    /// Sample ordering does not carry across sessions: a restarted host
    /// numbers its samples from the start again.
    fn session(&self) -> u64 {
        0
    }

    fn describe(&self) -> String;
}
