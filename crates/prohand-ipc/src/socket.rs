//! Socket transports (TCP or Unix domain) to a host process
//!
//! All three connect lazily, the host binds. Publisher and subscriber run a
//! background task that reconnects on failure; frames published while no
//! connection exists are discarded, mirroring the slow-joiner behavior of a
//! pub/sub bus.

use crate::endpoint::{BoxedConnection, Endpoint};
use crate::error::{Result, TransportError};
use crate::frame::{read_frame, write_frame};
use crate::mailbox::Mailbox;
use crate::transport::{PublishTransport, RequestTransport, SubscribeTransport};
use async_trait::async_trait;
use std::time::Duration;
use tokio::sync::mpsc::{self, error::TryRecvError, error::TrySendError};
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{debug, trace, warn};

/// Delay between reconnect attempts of the background tasks
pub const RECONNECT_BACKOFF: Duration = Duration::from_millis(100);

/// Request/reply socket; the connection is opened on first send
pub struct SocketRequester {
    endpoint: Endpoint,
    conn: Option<BoxedConnection>,
}

impl SocketRequester {
    pub fn new(endpoint: Endpoint) -> Self {
        Self {
            endpoint,
            conn: None,
        }
    }

    pub fn is_connected(&self) -> bool {
        self.conn.is_some()
    }
}

#[async_trait]
impl RequestTransport for SocketRequester {
    async fn send(&mut self, frame: &[u8]) -> Result<()> {
        if self.conn.is_none() {
            let conn = self.endpoint.connect().await?;
            debug!(endpoint = %self.endpoint, "Command connection opened");
            self.conn = Some(conn);
        }
        let conn = self.conn.as_mut().ok_or(TransportError::Closed)?;
        if let Err(e) = write_frame(conn, frame).await {
            self.conn = None;
            return Err(e);
        }
        Ok(())
    }

    async fn recv(&mut self) -> Result<Vec<u8>> {
        let conn = self.conn.as_mut().ok_or(TransportError::Closed)?;
        match read_frame(conn).await {
            Ok(Some(frame)) => Ok(frame),
            Ok(None) => {
                self.conn = None;
                Err(TransportError::Closed)
            }
            Err(e) => {
                self.conn = None;
                Err(e)
            }
        }
    }

    fn reset(&mut self) {
        if self.conn.take().is_some() {
            debug!(endpoint = %self.endpoint, "Command connection reset");
        }
    }

    fn describe(&self) -> String {
        self.endpoint.to_string()
    }
}

/// Fire-and-forget publisher backed by a bounded queue and a writer task
pub struct SocketPublisher {
    endpoint: Endpoint,
    tx: mpsc::Sender<Vec<u8>>,
    task: JoinHandle<()>,
}

impl SocketPublisher {
    /// Start the writer task; must be called inside a tokio runtime
    pub fn new(endpoint: Endpoint, queue_depth: usize) -> Self {
        let (tx, rx) = mpsc::channel(queue_depth.max(1));
        let task = tokio::spawn(run_publisher(endpoint.clone(), rx));
        Self { endpoint, tx, task }
    }
}

impl PublishTransport for SocketPublisher {
    fn publish(&mut self, frame: Vec<u8>) -> Result<()> {
        match self.tx.try_send(frame) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(_)) => {
                trace!(endpoint = %self.endpoint, "Publish queue full, frame dropped");
                Ok(())
            }
            Err(TrySendError::Closed(_)) => Err(TransportError::Closed),
        }
    }

    fn describe(&self) -> String {
        self.endpoint.to_string()
    }
}

impl Drop for SocketPublisher {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn run_publisher(endpoint: Endpoint, mut rx: mpsc::Receiver<Vec<u8>>) {
    loop {
        let mut conn = match endpoint.connect().await {
            Ok(conn) => {
                debug!(endpoint = %endpoint, "Publisher connected");
                conn
            }
            Err(e) => {
                trace!(endpoint = %endpoint, error = %e, "Publisher connect failed");
                // Nobody is listening: whatever was queued is lost
                loop {
                    match rx.try_recv() {
                        Ok(_) => trace!(endpoint = %endpoint, "Frame dropped, no subscriber"),
                        Err(TryRecvError::Empty) => break,
                        Err(TryRecvError::Disconnected) => return,
                    }
                }
                sleep(RECONNECT_BACKOFF).await;
                continue;
            }
        };

        loop {
            let Some(frame) = rx.recv().await else {
                return;
            };
            if let Err(e) = write_frame(&mut conn, &frame).await {
                warn!(endpoint = %endpoint, error = %e, "Publisher connection lost");
                break;
            }
        }
    }
}

/// Subscriber whose reader task fills a newest-first mailbox
pub struct SocketSubscriber {
    endpoint: Endpoint,
    mailbox: Mailbox,
    task: JoinHandle<()>,
}

impl SocketSubscriber {
    /// Start the reader task; must be called inside a tokio runtime
    pub fn new(endpoint: Endpoint, queue_depth: usize) -> Self {
        let mailbox = Mailbox::new(queue_depth);
        let task = tokio::spawn(run_subscriber(endpoint.clone(), mailbox.clone()));
        Self {
            endpoint,
            mailbox,
            task,
        }
    }

    pub fn mailbox(&self) -> &Mailbox {
        &self.mailbox
    }
}

impl SubscribeTransport for SocketSubscriber {
    fn try_recv(&mut self) -> Result<Option<Vec<u8>>> {
        if self.task.is_finished() {
            return Err(TransportError::Closed);
        }
        Ok(self.mailbox.pop_newest())
    }

    fn session(&self) -> u64 {
        self.mailbox.session()
    }

    fn describe(&self) -> String {
        self.endpoint.to_string()
    }
}

impl Drop for SocketSubscriber {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn run_subscriber(endpoint: Endpoint, mailbox: Mailbox) {
    loop {
        match endpoint.connect().await {
            Ok(mut conn) => {
                debug!(endpoint = %endpoint, "Subscriber connected");
                mailbox.begin_session();
                loop {
                    match read_frame(&mut conn).await {
                        Ok(Some(frame)) => mailbox.push(frame),
                        Ok(None) => {
                            debug!(endpoint = %endpoint, "Publisher closed the connection");
                            break;
                        }
                        Err(e) => {
                            warn!(endpoint = %endpoint, error = %e, "Subscriber read failed");
                            break;
                        }
                    }
                }
            }
            Err(e) => trace!(endpoint = %endpoint, error = %e, "Subscriber connect failed"),
        }
        sleep(RECONNECT_BACKOFF).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    async fn listener() -> (TcpListener, Endpoint) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        (listener, Endpoint::Tcp(addr.to_string()))
    }

    #[tokio::test]
    async fn test_requester_roundtrip() {
        let (listener, endpoint) = listener().await;
        let host = tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            while let Some(frame) = read_frame(&mut stream).await.unwrap() {
                let mut reply = frame.clone();
                reply.reverse();
                write_frame(&mut stream, &reply).await.unwrap();
            }
        });

        let mut requester = SocketRequester::new(endpoint);
        assert!(!requester.is_connected());
        requester.send(b"abc").await.unwrap();
        assert_eq!(requester.recv().await.unwrap(), b"cba");
        assert!(requester.is_connected());

        requester.reset();
        assert!(!requester.is_connected());
        assert!(matches!(
            requester.recv().await,
            Err(TransportError::Closed)
        ));
        host.abort();
    }

    #[tokio::test]
    async fn test_requester_connect_refused() {
        let (listener, endpoint) = listener().await;
        drop(listener);
        let mut requester = SocketRequester::new(endpoint);
        assert!(matches!(
            requester.send(b"x").await,
            Err(TransportError::Io(_))
        ));
    }

    #[tokio::test]
    async fn test_publisher_delivers_in_order() {
        let (listener, endpoint) = listener().await;
        let mut publisher = SocketPublisher::new(endpoint, 16);

        let (mut stream, _) = listener.accept().await.unwrap();
        // Frames published once the host side is connected arrive in order
        for i in 0..5u8 {
            publisher.publish(vec![i]).unwrap();
        }
        for i in 0..5u8 {
            let frame = read_frame(&mut stream).await.unwrap().unwrap();
            assert_eq!(frame, vec![i]);
        }
    }

    #[tokio::test]
    async fn test_subscriber_fills_mailbox() {
        let (listener, endpoint) = listener().await;
        let mut subscriber = SocketSubscriber::new(endpoint, 8);

        let (mut stream, _) = listener.accept().await.unwrap();
        for i in 1..=3u8 {
            write_frame(&mut stream, &[i]).await.unwrap();
        }

        for _ in 0..200 {
            if subscriber.mailbox().len() == 3 {
                break;
            }
            sleep(Duration::from_millis(5)).await;
        }

        assert_eq!(subscriber.try_recv().unwrap(), Some(vec![3]));
        assert_eq!(subscriber.try_recv().unwrap(), Some(vec![2]));
        assert_eq!(subscriber.try_recv().unwrap(), Some(vec![1]));
        assert_eq!(subscriber.try_recv().unwrap(), None);
    }

    #[tokio::test]
    async fn test_subscriber_reconnect_starts_new_session() {
        let (listener, endpoint) = listener().await;
        let mut subscriber = SocketSubscriber::new(endpoint, 8);

        let (mut stream, _) = listener.accept().await.unwrap();
        write_frame(&mut stream, &[1]).await.unwrap();
        for _ in 0..200 {
            if subscriber.mailbox().len() == 1 {
                break;
            }
            sleep(Duration::from_millis(5)).await;
        }
        let first = subscriber.session();
        assert_eq!(subscriber.mailbox().len(), 1);

        // Publisher goes away and comes back
        drop(stream);
        let (mut stream, _) = listener.accept().await.unwrap();
        for _ in 0..200 {
            if subscriber.session() > first {
                break;
            }
            sleep(Duration::from_millis(5)).await;
        }
        assert!(subscriber.session() > first);
        assert!(subscriber.mailbox().is_empty());

        write_frame(&mut stream, &[2]).await.unwrap();
        for _ in 0..200 {
            if !subscriber.mailbox().is_empty() {
                break;
            }
            sleep(Duration::from_millis(5)).await;
        }
        assert_eq!(subscriber.try_recv().unwrap(), Some(vec![2]));
    }
}
