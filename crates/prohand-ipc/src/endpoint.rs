//! Endpoint strings
//!
//! Endpoints use the `tcp://host:port` network form or the `ipc:///path`
//! local-socket form.

use crate::error::{Result, TransportError};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;

/// Byte stream to the host
pub trait Connection: AsyncRead + AsyncWrite + Send + Unpin {}

impl<T: AsyncRead + AsyncWrite + Send + Unpin> Connection for T {}

pub type BoxedConnection = Box<dyn Connection>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Endpoint {
    /// `host:port`
    Tcp(String),
    /// Unix domain socket path
    Ipc(PathBuf),
}

impl Endpoint {
    pub fn parse(s: &str) -> Result<Self> {
        let s = s.trim();
        if s.is_empty() {
            return Err(TransportError::InvalidEndpoint("empty endpoint".into()));
        }

        if let Some(addr) = s.strip_prefix("tcp://") {
            if addr.is_empty() || !addr.contains(':') {
                return Err(TransportError::InvalidEndpoint(format!(
                    "{s}: expected tcp://host:port"
                )));
            }
            return Ok(Endpoint::Tcp(addr.to_string()));
        }

        if let Some(path) = s.strip_prefix("ipc://") {
            if path.is_empty() {
                return Err(TransportError::InvalidEndpoint(format!(
                    "{s}: missing socket path"
                )));
            }
            return Ok(Endpoint::Ipc(PathBuf::from(path)));
        }

        Err(TransportError::InvalidEndpoint(format!(
            "{s}: unsupported scheme"
        )))
    }

    /// Open a stream to the endpoint
    pub async fn connect(&self) -> Result<BoxedConnection> {
        match self {
            Endpoint::Tcp(addr) => {
                let stream = TcpStream::connect(addr.as_str()).await?;
                stream.set_nodelay(true)?;
                Ok(Box::new(stream))
            }
            #[cfg(unix)]
            Endpoint::Ipc(path) => {
                let stream = tokio::net::UnixStream::connect(path).await?;
                Ok(Box::new(stream))
            }
            #[cfg(not(unix))]
            Endpoint::Ipc(path) => Err(TransportError::InvalidEndpoint(format!(
                "ipc://{} is not supported on this platform",
                path.display()
            ))),
        }
    }
}

impl FromStr for Endpoint {
    type Err = TransportError;

    fn from_str(s: &str) -> Result<Self> {
        Endpoint::parse(s)
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Endpoint::Tcp(addr) => write!(f, "tcp://{addr}"),
            Endpoint::Ipc(path) => write!(f, "ipc://{}", path.display()),
        }
    }
}
