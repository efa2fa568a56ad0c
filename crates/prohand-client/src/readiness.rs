//! Streaming readiness state machine
//!
//! "Streaming on" travels over the command channel, but whether the host
//! actually started streaming is only visible on the status channel, whose
//! subscription may still be joining when the first messages go out. The
//! controller therefore enables, waits a settle delay, then polls status and
//! re-sends the (idempotent) enable at a retry interval until a group
//! reports Running or the caller's deadline passes.
//!
//! ```text
//! Disabled --enable--> Enabling --settle--> Verifying --running--> Ready
//!     ^                    |                 |   ^ re-assert          |
//!     |                    +---- deadline ---+---+----> TimedOut      |
//!     +--------------------------- disable -------------------------- +
//! ```

use crate::view::StatusView;
use prohand_core::{ActuatorGroup, CommandEnvelope, ServiceCommand};
use prohand_ipc::{CommandChannel, StatusChannel, TransportError};
use std::fmt;
use std::time::Duration;
use tokio::time::{sleep_until, Instant};
use tracing::{debug, info, warn};

const STREAMING_ON: CommandEnvelope = CommandEnvelope::Service(ServiceCommand::Streaming(true));
const STREAMING_OFF: CommandEnvelope = CommandEnvelope::Service(ServiceCommand::Streaming(false));

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadinessState {
    Disabled,
    Enabling,
    Verifying,
    Ready,
    TimedOut,
}

impl fmt::Display for ReadinessState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ReadinessState::Disabled => "disabled",
            ReadinessState::Enabling => "enabling",
            ReadinessState::Verifying => "verifying",
            ReadinessState::Ready => "ready",
            ReadinessState::TimedOut => "timed-out",
        };
        f.write_str(name)
    }
}

/// Timing of the readiness handshake
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadinessConfig {
    /// Delay after the first enable before status is trusted
    pub settle: Duration,
    pub poll_interval: Duration,
    /// Default re-assert interval
    pub retry_interval: Duration,
    /// Default overall deadline
    pub timeout: Duration,
}

impl Default for ReadinessConfig {
    fn default() -> Self {
        Self {
            settle: Duration::from_millis(200),
            poll_interval: Duration::from_millis(50),
            retry_interval: Duration::from_millis(300),
            timeout: Duration::from_millis(1000),
        }
    }
}

pub struct ReadinessController {
    state: ReadinessState,
    config: ReadinessConfig,
    view: StatusView,
    last_enable: Option<Instant>,
    session: u64,
}

impl ReadinessController {
    pub fn new(config: ReadinessConfig) -> Self {
        Self {
            state: ReadinessState::Disabled,
            config,
            view: StatusView::default(),
            last_enable: None,
            session: 0,
        }
    }

    pub fn state(&self) -> ReadinessState {
        self.state
    }

    pub fn config(&self) -> &ReadinessConfig {
        &self.config
    }

    pub fn view(&self) -> &StatusView {
        &self.view
    }

    pub fn view_mut(&mut self) -> &mut StatusView {
        &mut self.view
    }

    fn transition(&mut self, next: ReadinessState) {
        if self.state != next {
            debug!(from = %self.state, to = %next, "Readiness transition");
            self.state = next;
        }
    }

    /// Ping the host, then request streaming
    ///
    /// A failed ping returns immediately and leaves the state untouched.
    pub async fn enable(&mut self, cmd: &mut CommandChannel) -> Result<(), TransportError> {
        cmd.request(&CommandEnvelope::Ping).await?;
        self.begin_enable();
        let result = cmd.request(&STREAMING_ON).await;
        if let Err(e) = &result {
            debug!(error = %e, "Streaming enable request failed");
        }
        result
    }

    fn begin_enable(&mut self) {
        self.view.clear_modes();
        self.last_enable = Some(Instant::now());
        self.transition(ReadinessState::Enabling);
    }

    /// Request streaming off; the state becomes Disabled whatever the outcome
    pub async fn disable(&mut self, cmd: &mut CommandChannel) -> Result<(), TransportError> {
        let result = cmd.request(&STREAMING_OFF).await;
        self.view.clear_modes();
        self.last_enable = None;
        self.transition(ReadinessState::Disabled);
        if let Err(e) = &result {
            debug!(error = %e, "Streaming disable request failed");
        }
        result
    }

    /// Forget group modes reported before the status publisher reconnected
    pub fn sync_session(&mut self, status: &StatusChannel) {
        let session = status.session();
        if session != self.session {
            debug!(session, "Status session changed, clearing group modes");
            self.session = session;
            self.view.clear_modes();
        }
    }

    /// Drain pending status into the view
    ///
    /// Returns whether `group` (any group with `None`) is known to be running.
    pub fn observe(&mut self, status: &mut StatusChannel, group: Option<ActuatorGroup>) -> bool {
        self.sync_session(status);
        loop {
            match status.try_recv() {
                Ok(Some(env)) => self.view.apply(&env),
                Ok(None) => break,
                Err(e) => {
                    debug!(error = %e, "Status channel unavailable");
                    break;
                }
            }
        }
        self.view.is_running(group)
    }

    fn mark_ready(&mut self, started: Instant) {
        self.transition(ReadinessState::Ready);
        info!(
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Streaming ready"
        );
    }

    /// Drive the host to a verified streaming state
    ///
    /// Returns `true` once `group` reports Running, `false` if the ping fails
    /// or `timeout` elapses. Re-assert failures are ignored; only the deadline
    /// ends the wait. A Ready controller is re-checked against current status
    /// and starts over if the group is no longer running.
    pub async fn wait_until_ready(
        &mut self,
        cmd: &mut CommandChannel,
        status: &mut StatusChannel,
        group: Option<ActuatorGroup>,
        timeout: Duration,
        retry_interval: Duration,
    ) -> bool {
        let lapsed = self.state == ReadinessState::Ready;
        if lapsed {
            if self.observe(status, group) {
                return true;
            }
            info!(group = ?group, "Host no longer running, re-enabling streaming");
            self.transition(ReadinessState::Verifying);
        }

        let started = Instant::now();
        let deadline = started + timeout;
        let retry_interval = retry_interval.max(Duration::from_millis(1));
        let poll_interval = self.config.poll_interval.max(Duration::from_millis(1));

        if lapsed
            || matches!(
                self.state,
                ReadinessState::Disabled | ReadinessState::TimedOut
            )
        {
            if let Err(e) = cmd.request_until(&CommandEnvelope::Ping, deadline).await {
                warn!(error = %e, "Host did not answer ping, streaming not enabled");
                if lapsed {
                    self.transition(ReadinessState::TimedOut);
                }
                return false;
            }
            self.begin_enable();
            let bound = deadline.min(Instant::now() + retry_interval);
            if let Err(e) = cmd.request_until(&STREAMING_ON, bound).await {
                debug!(error = %e, "Initial enable not acknowledged, will re-assert");
            }
        }

        let mut last_enable = self.last_enable.unwrap_or(started);
        sleep_until(deadline.min(last_enable + self.config.settle)).await;
        self.transition(ReadinessState::Verifying);

        loop {
            if self.observe(status, group) {
                self.mark_ready(started);
                return true;
            }

            let now = Instant::now();
            if now >= deadline {
                break;
            }

            if now.saturating_duration_since(last_enable) >= retry_interval {
                debug!(
                    elapsed_ms = now.duration_since(started).as_millis() as u64,
                    "No running status yet, re-asserting streaming"
                );
                last_enable = now;
                self.last_enable = Some(now);
                let bound = deadline.min(now + retry_interval);
                if let Err(e) = cmd.request_until(&STREAMING_ON, bound).await {
                    debug!(error = %e, "Re-assert failed");
                }
                continue;
            }

            sleep_until(deadline.min(now + poll_interval)).await;
        }

        if self.observe(status, group) {
            self.mark_ready(started);
            return true;
        }

        self.transition(ReadinessState::TimedOut);
        warn!(
            timeout_ms = timeout.as_millis() as u64,
            "Streaming did not become ready"
        );
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use prohand_core::{GroupMode, GroupStatus, StatusPayload};
    use prohand_ipc::mock::{EnableLoss, MockHost, MockHostConfig};

    const TIMEOUT: Duration = Duration::from_millis(1000);
    const RETRY: Duration = Duration::from_millis(300);

    fn channels(host: &MockHost) -> (CommandChannel, StatusChannel) {
        (
            CommandChannel::new(Box::new(host.requester()), Duration::from_millis(1000)),
            StatusChannel::new(Box::new(host.subscriber())),
        )
    }

    #[tokio::test(start_paused = true)]
    async fn test_ready_with_cooperative_host() {
        let host = MockHost::new(MockHostConfig::default());
        let (mut cmd, mut status) = channels(&host);
        let mut controller = ReadinessController::new(ReadinessConfig::default());

        let start = Instant::now();
        assert!(
            controller
                .wait_until_ready(&mut cmd, &mut status, None, TIMEOUT, RETRY)
                .await
        );
        assert_eq!(controller.state(), ReadinessState::Ready);
        // Ready right after the settle delay
        assert!(start.elapsed() >= Duration::from_millis(200));
        assert!(start.elapsed() < Duration::from_millis(300));
        assert_eq!(host.enable_attempts(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_never_running_host_times_out_on_deadline() {
        let host = MockHost::new(MockHostConfig {
            never_run: true,
            ..Default::default()
        });
        let (mut cmd, mut status) = channels(&host);
        let mut controller = ReadinessController::new(ReadinessConfig::default());

        let start = Instant::now();
        assert!(
            !controller
                .wait_until_ready(&mut cmd, &mut status, None, TIMEOUT, RETRY)
                .await
        );
        let elapsed = start.elapsed();
        assert!(elapsed >= TIMEOUT);
        assert!(elapsed < TIMEOUT + Duration::from_millis(10));
        assert_eq!(controller.state(), ReadinessState::TimedOut);
        // Initial enable plus re-asserts at 300, 600 and 900 ms
        assert_eq!(host.enable_attempts(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_silently_dropped_enables_recovered() {
        let host = MockHost::new(MockHostConfig {
            enable_loss: EnableLoss::DropFirstOfPair,
            ..Default::default()
        });
        let (mut cmd, mut status) = channels(&host);
        let mut controller = ReadinessController::new(ReadinessConfig::default());

        let start = Instant::now();
        assert!(
            controller
                .wait_until_ready(&mut cmd, &mut status, None, TIMEOUT, RETRY)
                .await
        );
        assert!(start.elapsed() < TIMEOUT);
        assert_eq!(host.enable_attempts(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_ignored_enables_recovered() {
        let host = MockHost::new(MockHostConfig {
            enable_loss: EnableLoss::IgnoreFirstOfPair,
            ..Default::default()
        });
        let (mut cmd, mut status) = channels(&host);
        let mut controller = ReadinessController::new(ReadinessConfig::default());

        let start = Instant::now();
        assert!(
            controller
                .wait_until_ready(&mut cmd, &mut status, None, TIMEOUT, Duration::from_millis(250))
                .await
        );
        assert!(start.elapsed() < TIMEOUT);
        assert_eq!(host.enable_attempts(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_joiner_and_startup_lag() {
        let host = MockHost::new(MockHostConfig {
            subscriber_join_delay: Duration::from_millis(400),
            running_lag: Duration::from_millis(150),
            ..Default::default()
        });
        let (mut cmd, mut status) = channels(&host);
        let mut controller = ReadinessController::new(ReadinessConfig::default());

        let start = Instant::now();
        assert!(
            controller
                .wait_until_ready(&mut cmd, &mut status, None, TIMEOUT, RETRY)
                .await
        );
        assert!(start.elapsed() >= Duration::from_millis(400));
        assert!(start.elapsed() < TIMEOUT);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_ping_fails_fast() {
        let host = MockHost::new(MockHostConfig {
            ping_fails: true,
            ..Default::default()
        });
        let (mut cmd, mut status) = channels(&host);
        let mut controller = ReadinessController::new(ReadinessConfig::default());

        assert!(controller.enable(&mut cmd).await.is_err());
        assert_eq!(controller.state(), ReadinessState::Disabled);
        assert_eq!(host.enable_attempts(), 0);

        assert!(
            !controller
                .wait_until_ready(&mut cmd, &mut status, None, TIMEOUT, RETRY)
                .await
        );
        assert_eq!(controller.state(), ReadinessState::Disabled);
        assert_eq!(host.enable_attempts(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_group_filter() {
        let host = MockHost::new(MockHostConfig::default());
        let (_cmd, mut status) = channels(&host);
        let mut controller = ReadinessController::new(ReadinessConfig::default());

        // Only the linear group comes up
        host.publish(StatusPayload::Group(GroupStatus {
            group: ActuatorGroup::Linear,
            mode: GroupMode::Running,
        }));
        assert!(controller.observe(&mut status, Some(ActuatorGroup::Linear)));
        assert!(!controller.view().is_running(Some(ActuatorGroup::Rotary)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_disable_always_disables() {
        let host = MockHost::new(MockHostConfig::default());
        let (mut cmd, mut status) = channels(&host);
        let mut controller = ReadinessController::new(ReadinessConfig::default());

        assert!(
            controller
                .wait_until_ready(&mut cmd, &mut status, None, TIMEOUT, RETRY)
                .await
        );
        controller.disable(&mut cmd).await.unwrap();
        assert_eq!(controller.state(), ReadinessState::Disabled);
        assert!(!host.is_streaming());

        host.set_reject_rc(Some(-99));
        assert!(controller.disable(&mut cmd).await.is_err());
        assert_eq!(controller.state(), ReadinessState::Disabled);
    }

    #[tokio::test(start_paused = true)]
    async fn test_ready_rechecked_after_host_stops_running() {
        let host = MockHost::new(MockHostConfig::default());
        let (mut cmd, mut status) = channels(&host);
        let mut controller = ReadinessController::new(ReadinessConfig::default());

        assert!(
            controller
                .wait_until_ready(&mut cmd, &mut status, None, TIMEOUT, RETRY)
                .await
        );
        // Still running: answered from status without another enable
        assert!(
            controller
                .wait_until_ready(&mut cmd, &mut status, None, TIMEOUT, RETRY)
                .await
        );
        assert_eq!(host.enable_attempts(), 1);

        host.halt();
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!controller.observe(&mut status, None));

        assert!(
            controller
                .wait_until_ready(&mut cmd, &mut status, None, TIMEOUT, RETRY)
                .await
        );
        assert_eq!(controller.state(), ReadinessState::Ready);
        assert_eq!(host.enable_attempts(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_ready_but_halted_host_times_out() {
        let host = MockHost::new(MockHostConfig::default());
        let (mut cmd, mut status) = channels(&host);
        let mut controller = ReadinessController::new(ReadinessConfig::default());

        assert!(
            controller
                .wait_until_ready(&mut cmd, &mut status, None, TIMEOUT, RETRY)
                .await
        );
        host.halt();
        host.set_reject_rc(Some(-5));
        tokio::time::sleep(Duration::from_millis(50)).await;

        assert!(
            !controller
                .wait_until_ready(&mut cmd, &mut status, None, TIMEOUT, RETRY)
                .await
        );
        assert_eq!(controller.state(), ReadinessState::TimedOut);
    }
}
