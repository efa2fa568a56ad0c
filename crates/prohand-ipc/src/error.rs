//! Transport-level errors

use prohand_core::CodecError;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TransportError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("no reply within {0:?}")]
    Timeout(Duration),

    #[error("connection closed")]
    Closed,

    #[error("frame of {0} bytes exceeds the maximum")]
    FrameTooLarge(usize),

    #[error("invalid endpoint: {0}")]
    InvalidEndpoint(String),

    #[error(transparent)]
    Codec(#[from] CodecError),

    #[error("request rejected by host (rc={rc})")]
    Rejected { rc: i32 },
}

pub type Result<T> = std::result::Result<T, TransportError>;
