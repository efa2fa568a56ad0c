//! In-memory host for tests
//!
//! `MockHost` plays the host side of all three channels. It decodes what the
//! client sends, answers requests, records pose frames and publishes
//! group-status telemetry once streaming has been requested. Knobs on
//! [`MockHostConfig`] reproduce lossy enables, a host that never runs,
//! start-up lag, slow-joining subscribers, failing pings and late replies.
//!
//! All timing uses `tokio::time`, so tests can run on a paused clock.

use crate::error::{Result, TransportError};
use crate::transport::{PublishTransport, RequestTransport, SubscribeTransport};
use async_trait::async_trait;
use prohand_core::wire;
use prohand_core::{
    ActuatorGroup, CodecError, CommandEnvelope, GroupMode, GroupStatus, PoseCommand,
    ServiceCommand, StatusEnvelope, StatusPayload,
};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::time::{sleep_until, Instant};

/// How the host treats "streaming on" requests
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum EnableLoss {
    #[default]
    None,
    /// Every odd-numbered enable is lost in transit: no effect, no reply
    DropFirstOfPair,
    /// Every odd-numbered enable is acknowledged but has no effect
    IgnoreFirstOfPair,
}

#[derive(Debug, Clone)]
pub struct MockHostConfig {
    pub enable_loss: EnableLoss,
    /// Group status never reports Running
    pub never_run: bool,
    /// Delay between an effective enable and the groups reporting Running
    pub running_lag: Duration,
    /// Status published before a subscriber has joined is lost
    pub subscriber_join_delay: Duration,
    /// Pings are swallowed without a reply
    pub ping_fails: bool,
    /// Delay before each reply becomes readable
    pub reply_delay: Duration,
    /// Group-status publish period once streaming has been requested
    pub status_period: Duration,
}

impl Default for MockHostConfig {
    fn default() -> Self {
        Self {
            enable_loss: EnableLoss::None,
            never_run: false,
            running_lag: Duration::ZERO,
            subscriber_join_delay: Duration::ZERO,
            ping_fails: false,
            reply_delay: Duration::ZERO,
            status_period: Duration::from_millis(20),
        }
    }
}

/// A request the host received
#[derive(Debug, Clone)]
pub struct CommandRecord {
    pub at: Instant,
    pub seq: u32,
    pub command: CommandEnvelope,
}

/// A pose frame the host received on a streaming channel
#[derive(Debug, Clone)]
pub struct StreamRecord {
    pub at: Instant,
    pub command: PoseCommand,
    /// Whether the host was running when the frame arrived
    pub host_running: bool,
}

struct PendingReply {
    ready_at: Instant,
    frame: Option<Vec<u8>>,
}

struct HostState {
    config: MockHostConfig,
    started: Instant,
    streaming: bool,
    running_at: Option<Instant>,
    enable_attempts: usize,
    reject_rc: Option<i32>,
    commands: Vec<CommandRecord>,
    stream_frames: Vec<StreamRecord>,
    replies: VecDeque<PendingReply>,
    status: VecDeque<Vec<u8>>,
    next_uid: u32,
    next_group_status: Option<Instant>,
    session: u64,
}

impl HostState {
    fn is_running(&self, now: Instant) -> bool {
        self.running_at.map_or(false, |at| now >= at)
    }

    /// Apply a request; returns the reply frame, or `None` if the host stays silent
    fn handle(&mut self, seq: u32, command: CommandEnvelope, now: Instant) -> Option<Vec<u8>> {
        let silent = matches!(command, CommandEnvelope::Ping) && self.config.ping_fails;

        match command {
            CommandEnvelope::Service(ServiceCommand::Streaming(true)) => {
                self.enable_attempts += 1;
                let first_of_pair = self.enable_attempts % 2 == 1;
                match self.config.enable_loss {
                    EnableLoss::DropFirstOfPair if first_of_pair => return None,
                    EnableLoss::IgnoreFirstOfPair if first_of_pair => {}
                    _ => {
                        self.streaming = true;
                        if !self.config.never_run && self.running_at.is_none() {
                            self.running_at = Some(now + self.config.running_lag);
                        }
                    }
                }
                self.next_group_status.get_or_insert(now);
            }
            CommandEnvelope::Service(ServiceCommand::Streaming(false)) => {
                self.streaming = false;
                self.running_at = None;
            }
            _ => {}
        }

        self.record(seq, command, now);
        if silent {
            return None;
        }
        let rc = self.reject_rc.unwrap_or(0);
        wire::encode_reply(seq, rc).ok()
    }

    fn record(&mut self, seq: u32, command: CommandEnvelope, at: Instant) {
        self.commands.push(CommandRecord { at, seq, command });
    }

    fn next_uid(&mut self) -> u32 {
        self.next_uid = self.next_uid.wrapping_add(1);
        self.next_uid
    }

    fn timestamp_ms(&self, now: Instant) -> u32 {
        now.saturating_duration_since(self.started).as_millis() as u32
    }

    fn publish(&mut self, payload: StatusPayload, now: Instant) {
        let env = StatusEnvelope::new(self.timestamp_ms(now), self.next_uid(), payload);
        if let Ok(frame) = wire::encode_status(&env) {
            self.status.push_back(frame);
        }
    }

    fn publish_due(&mut self, now: Instant) {
        let Some(next) = self.next_group_status else {
            return;
        };
        if now < next {
            return;
        }
        let mode = if self.is_running(now) {
            GroupMode::Running
        } else {
            GroupMode::Idle
        };
        for group in [ActuatorGroup::Linear, ActuatorGroup::Rotary] {
            self.publish(StatusPayload::Group(GroupStatus { group, mode }), now);
        }
        self.next_group_status = Some(now + self.config.status_period);
    }
}

fn lock(state: &Mutex<HostState>) -> MutexGuard<'_, HostState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Shared handle to the in-memory host
#[derive(Clone)]
pub struct MockHost {
    state: Arc<Mutex<HostState>>,
}

impl MockHost {
    pub fn new(config: MockHostConfig) -> Self {
        Self {
            state: Arc::new(Mutex::new(HostState {
                config,
                started: Instant::now(),
                streaming: false,
                running_at: None,
                enable_attempts: 0,
                reject_rc: None,
                commands: Vec::new(),
                stream_frames: Vec::new(),
                replies: VecDeque::new(),
                status: VecDeque::new(),
                next_uid: 0,
                next_group_status: None,
                session: 0,
            })),
        }
    }

    /// Client end of the command channel
    pub fn requester(&self) -> MockRequester {
        MockRequester {
            state: Arc::clone(&self.state),
        }
    }

    /// Client end of a streaming channel
    pub fn publisher(&self) -> MockPublisher {
        MockPublisher {
            state: Arc::clone(&self.state),
        }
    }

    /// Client end of the status channel; joins after the configured delay
    pub fn subscriber(&self) -> MockSubscriber {
        let joined_at = Instant::now() + lock(&self.state).config.subscriber_join_delay;
        MockSubscriber {
            state: Arc::clone(&self.state),
            joined_at,
        }
    }

    /// Publish a status envelope as-is (uid and timestamp are kept)
    pub fn push_status(&self, env: StatusEnvelope) {
        if let Ok(frame) = wire::encode_status(&env) {
            lock(&self.state).status.push_back(frame);
        }
    }

    /// Publish a payload with a host-assigned uid and timestamp
    pub fn publish(&self, payload: StatusPayload) {
        lock(&self.state).publish(payload, Instant::now());
    }

    /// Publish raw bytes on the status channel
    pub fn push_raw_status(&self, frame: Vec<u8>) {
        lock(&self.state).status.push_back(frame);
    }

    pub fn commands(&self) -> Vec<CommandRecord> {
        lock(&self.state).commands.clone()
    }

    pub fn stream_frames(&self) -> Vec<StreamRecord> {
        lock(&self.state).stream_frames.clone()
    }

    /// Number of "streaming on" requests sent, including lost ones
    pub fn enable_attempts(&self) -> usize {
        lock(&self.state).enable_attempts
    }

    pub fn is_streaming(&self) -> bool {
        lock(&self.state).streaming
    }

    pub fn is_running(&self) -> bool {
        lock(&self.state).is_running(Instant::now())
    }

    pub fn running_since(&self) -> Option<Instant> {
        lock(&self.state).running_at
    }

    pub fn set_reply_delay(&self, delay: Duration) {
        lock(&self.state).config.reply_delay = delay;
    }

    pub fn set_ping_fails(&self, fails: bool) {
        lock(&self.state).config.ping_fails = fails;
    }

    /// Groups stop reporting Running while streaming stays requested
    pub fn halt(&self) {
        lock(&self.state).running_at = None;
    }

    /// Restart the host process
    ///
    /// Pending status is lost, subscribers see a new session and uids count
    /// from the start again. Streaming must be requested anew.
    pub fn restart(&self) {
        let mut state = lock(&self.state);
        state.status.clear();
        state.session += 1;
        state.next_uid = 0;
        state.streaming = false;
        state.running_at = None;
        state.next_group_status = None;
    }

    /// Answer every request with `rc` instead of success
    pub fn set_reject_rc(&self, rc: Option<i32>) {
        lock(&self.state).reject_rc = rc;
    }
}

pub struct MockRequester {
    state: Arc<Mutex<HostState>>,
}

#[async_trait]
impl RequestTransport for MockRequester {
    async fn send(&mut self, frame: &[u8]) -> Result<()> {
        let (header, command) = wire::decode_command(frame)?;
        let now = Instant::now();
        let mut state = lock(&self.state);
        let reply = state.handle(header.seq, command, now);
        let ready_at = now + state.config.reply_delay;
        state.replies.push_back(PendingReply {
            ready_at,
            frame: reply,
        });
        Ok(())
    }

    async fn recv(&mut self) -> Result<Vec<u8>> {
        loop {
            let front = lock(&self.state)
                .replies
                .front()
                .map(|reply| (reply.ready_at, reply.frame.is_some()));

            match front {
                Some((ready_at, true)) => {
                    sleep_until(ready_at).await;
                    if let Some(PendingReply {
                        frame: Some(frame),
                        ..
                    }) = lock(&self.state).replies.pop_front()
                    {
                        return Ok(frame);
                    }
                }
                // Nothing will ever arrive for a swallowed request
                _ => std::future::pending::<()>().await,
            }
        }
    }

    fn reset(&mut self) {
        lock(&self.state)
            .replies
            .retain(|reply| reply.frame.is_some());
    }

    fn describe(&self) -> String {
        "mock://commands".to_string()
    }
}

pub struct MockPublisher {
    state: Arc<Mutex<HostState>>,
}

impl PublishTransport for MockPublisher {
    fn publish(&mut self, frame: Vec<u8>) -> Result<()> {
        let (_, command) = wire::decode_command(&frame)?;
        let CommandEnvelope::Pose(command) = command else {
            return Err(TransportError::Codec(CodecError::Malformed(
                "non-pose frame on streaming channel".into(),
            )));
        };
        let now = Instant::now();
        let mut state = lock(&self.state);
        let host_running = state.is_running(now);
        state.stream_frames.push(StreamRecord {
            at: now,
            command,
            host_running,
        });
        Ok(())
    }

    fn describe(&self) -> String {
        "mock://streaming".to_string()
    }
}

pub struct MockSubscriber {
    state: Arc<Mutex<HostState>>,
    joined_at: Instant,
}

impl SubscribeTransport for MockSubscriber {
    fn try_recv(&mut self) -> Result<Option<Vec<u8>>> {
        let now = Instant::now();
        let mut state = lock(&self.state);
        state.publish_due(now);
        if now < self.joined_at {
            state.status.clear();
            return Ok(None);
        }
        Ok(state.status.pop_back())
    }

    fn session(&self) -> u64 {
        lock(&self.state).session
    }

    fn describe(&self) -> String {
        "mock://status".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::advance;

    #[tokio::test(start_paused = true)]
    async fn test_group_status_follows_enable() {
        let host = MockHost::new(MockHostConfig {
            running_lag: Duration::from_millis(100),
            ..Default::default()
        });
        let mut requester = host.requester();
        let mut subscriber = host.subscriber();

        assert_eq!(subscriber.try_recv().unwrap(), None);

        let enable =
            wire::encode_request(1, &CommandEnvelope::Service(ServiceCommand::Streaming(true)))
                .unwrap();
        requester.send(&enable).await.unwrap();
        let reply = wire::decode_reply(&requester.recv().await.unwrap()).unwrap();
        assert_eq!(reply.seq, 1);
        assert!(host.is_streaming());
        assert!(!host.is_running());

        let frame = subscriber.try_recv().unwrap().unwrap();
        assert!(!wire::decode_status(&frame).unwrap().reports_running(None));

        advance(Duration::from_millis(120)).await;
        let frame = subscriber.try_recv().unwrap().unwrap();
        assert!(wire::decode_status(&frame).unwrap().reports_running(None));
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropped_enable_has_no_reply() {
        let host = MockHost::new(MockHostConfig {
            enable_loss: EnableLoss::DropFirstOfPair,
            ..Default::default()
        });
        let mut requester = host.requester();
        let enable =
            wire::encode_request(1, &CommandEnvelope::Service(ServiceCommand::Streaming(true)))
                .unwrap();
        requester.send(&enable).await.unwrap();
        assert!(
            tokio::time::timeout(Duration::from_millis(50), requester.recv())
                .await
                .is_err()
        );
        assert!(!host.is_streaming());
        assert!(host.commands().is_empty());

        requester.reset();
        requester.send(&enable).await.unwrap();
        assert!(requester.recv().await.is_ok());
        assert!(host.is_streaming());
        assert_eq!(host.enable_attempts(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_joiner_loses_early_status() {
        let host = MockHost::new(MockHostConfig {
            subscriber_join_delay: Duration::from_millis(30),
            ..Default::default()
        });
        let mut subscriber = host.subscriber();
        host.publish(StatusPayload::Pong);
        assert_eq!(subscriber.try_recv().unwrap(), None);

        advance(Duration::from_millis(40)).await;
        assert_eq!(subscriber.try_recv().unwrap(), None);
        host.publish(StatusPayload::Pong);
        assert!(subscriber.try_recv().unwrap().is_some());
    }
}
