//! ProGlove tactile client
//!
//! The glove exposes a single status channel carrying tactile frames.

use crate::config::GloveConfig;
use crate::error::{ClientError, Result};
use prohand_core::{StatusPayload, TactileFrame};
use prohand_ipc::{Endpoint, SocketSubscriber, StatusChannel, SubscribeTransport};
use std::time::Duration;
use tokio::time::{sleep, Instant};
use tracing::{debug, info, trace};

const PING_POLL: Duration = Duration::from_millis(10);

pub struct GloveClient {
    status: Option<StatusChannel>,
    ping_timeout: Duration,
    /// Frame seen by `ping`, handed out by the next read
    pending: Option<TactileFrame>,
}

impl GloveClient {
    /// Subscribe to the glove's status endpoint; must run inside a tokio runtime
    pub fn connect(config: &GloveConfig) -> Result<Self> {
        if config.status_endpoint.trim().is_empty() {
            return Err(ClientError::InvalidArgument("status endpoint is empty".into()));
        }
        let endpoint = Endpoint::parse(&config.status_endpoint)?;
        info!(endpoint = %endpoint, "Opening ProGlove client");
        let transport = SocketSubscriber::new(endpoint, config.queue_depth);
        Ok(Self::with_transport(
            Box::new(transport),
            Duration::from_millis(config.ping_timeout_ms),
        ))
    }

    pub fn with_transport(transport: Box<dyn SubscribeTransport>, ping_timeout: Duration) -> Self {
        Self {
            status: Some(StatusChannel::new(transport)),
            ping_timeout,
            pending: None,
        }
    }

    pub fn is_connected(&self) -> bool {
        self.status.is_some()
    }

    /// Wait for the first valid tactile frame
    ///
    /// Fails with `Connection` when none arrives within the ping timeout.
    pub async fn ping(&mut self) -> Result<()> {
        if self.pending.is_some() {
            return Ok(());
        }
        let deadline = Instant::now() + self.ping_timeout;
        loop {
            if let Some(frame) = self.next_frame()? {
                if frame.valid {
                    self.pending = Some(frame);
                    return Ok(());
                }
                trace!(uid = frame.uid, "Ignoring invalid tactile frame");
            }
            let now = Instant::now();
            if now >= deadline {
                debug!(
                    timeout_ms = self.ping_timeout.as_millis() as u64,
                    "No tactile frame from glove"
                );
                return Err(ClientError::Connection(format!(
                    "no tactile frame within {:?}",
                    self.ping_timeout
                )));
            }
            sleep(PING_POLL.min(deadline - now)).await;
        }
    }

    /// Next tactile frame, newest first; never blocks
    pub fn try_recv_status(&mut self) -> Result<Option<TactileFrame>> {
        if let Some(frame) = self.pending.take() {
            return Ok(Some(frame));
        }
        self.next_frame()
    }

    fn next_frame(&mut self) -> Result<Option<TactileFrame>> {
        let status = self.status.as_mut().ok_or(ClientError::NullHandle)?;
        while let Some(env) = status.try_recv()? {
            match env.payload {
                StatusPayload::Tactile(frame) => return Ok(Some(frame)),
                other => trace!(kind = other.name(), "Skipping non-tactile status"),
            }
        }
        Ok(None)
    }

    pub fn close(&mut self) {
        if let Some(status) = self.status.take() {
            info!(status = %status.describe(), "Closing ProGlove client");
        }
        self.pending = None;
    }
}

impl Drop for GloveClient {
    fn drop(&mut self) {
        self.close();
    }
}
