//! Fire-and-forget pose streaming
//!
//! A successful send only means the frame was encoded and handed to the
//! transport. Frames sent before the host is streaming may be ignored.

use crate::error::Result;
use crate::transport::PublishTransport;
use prohand_core::{wire, PoseCommand};
use tracing::trace;

pub struct StreamingChannel {
    transport: Box<dyn PublishTransport>,
}

impl StreamingChannel {
    pub fn new(transport: Box<dyn PublishTransport>) -> Self {
        Self { transport }
    }

    pub fn send(&mut self, cmd: &PoseCommand) -> Result<()> {
        let frame = wire::encode_stream(cmd)?;
        trace!(kind = %cmd.kind(), len = frame.len(), "Streaming pose");
        self.transport.publish(frame)
    }

    pub fn describe(&self) -> String {
        self.transport.describe()
    }
}
