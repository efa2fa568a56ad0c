//! ProHand IPC - Channels between the client and the host process
//!
//! Three independent channels reach the host:
//! - [`CommandChannel`]: request/acknowledge, one request in flight
//! - [`StreamingChannel`]: fire-and-forget pose frames
//! - [`StatusChannel`]: non-blocking, newest-first telemetry
//!
//! Each channel sits on a transport trait so the socket transports can be
//! swapped for the in-memory host (feature `mock`).

pub mod command;
pub mod endpoint;
pub mod error;
pub mod frame;
pub mod mailbox;
pub mod socket;
pub mod status;
pub mod streaming;
pub mod transport;

#[cfg(any(test, feature = "mock"))]
pub mod mock;

pub use command::CommandChannel;
pub use endpoint::Endpoint;
pub use error::{Result, TransportError};
pub use mailbox::Mailbox;
pub use socket::{SocketPublisher, SocketRequester, SocketSubscriber};
pub use status::StatusChannel;
pub use streaming::StreamingChannel;
pub use transport::{PublishTransport, RequestTransport, SubscribeTransport};
