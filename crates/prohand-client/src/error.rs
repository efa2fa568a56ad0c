//! Client error taxonomy
//!
//! Channel failures are wrapped here; nothing is downgraded to a default
//! value except by the two boolean readiness queries.

use prohand_core::CodecError;
use prohand_ipc::TransportError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("client handle is closed")]
    NullHandle,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("not connected: {0}")]
    NotConnected(&'static str),

    #[error("unsupported: {0}")]
    Unsupported(&'static str),

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, ClientError>;

impl ClientError {
    /// Numeric result code shared with the host
    pub fn code(&self) -> i32 {
        match self {
            ClientError::NullHandle => -1,
            ClientError::Connection(_) => -2,
            ClientError::InvalidArgument(_) => -3,
            ClientError::NotConnected(_) => -4,
            ClientError::Unsupported(_) => -5,
            ClientError::Other(_) => -99,
        }
    }
}

impl From<CodecError> for ClientError {
    fn from(err: CodecError) -> Self {
        match err {
            CodecError::Arity { .. } | CodecError::NonFinite { .. } => {
                ClientError::InvalidArgument(err.to_string())
            }
            other => ClientError::Other(other.to_string()),
        }
    }
}

impl From<TransportError> for ClientError {
    fn from(err: TransportError) -> Self {
        match err {
            TransportError::Codec(codec) => codec.into(),
            TransportError::InvalidEndpoint(endpoint) => ClientError::InvalidArgument(endpoint),
            TransportError::Rejected { rc } => match rc {
                -2 => ClientError::Connection(format!("host reported a connection failure (rc={rc})")),
                -3 => ClientError::InvalidArgument(format!("host rejected the arguments (rc={rc})")),
                -4 => ClientError::NotConnected("host reports the device is not connected"),
                -5 => ClientError::Unsupported("host does not support this request"),
                rc => ClientError::Other(format!("host rejected the request (rc={rc})")),
            },
            TransportError::Io(_)
            | TransportError::Timeout(_)
            | TransportError::Closed
            | TransportError::FrameTooLarge(_) => ClientError::Connection(err.to_string()),
        }
    }
}
