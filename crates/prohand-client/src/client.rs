//! Control client facade
//!
//! Owns the command, streaming and status channels plus the readiness
//! controller. Not safe for concurrent use; every operation takes `&mut self`.

use crate::config::ClientConfig;
use crate::error::{ClientError, Result};
use crate::readiness::{ReadinessController, ReadinessState};
use crate::view::HandStatus;
use prohand_core::joint::JOINTS_PER_FINGER;
use prohand_core::{
    CommandEnvelope, CommandKind, Handedness, JointPose, PoseCommand, ServiceCommand,
    StatusEnvelope, WristLimits,
};
use prohand_ipc::{
    CommandChannel, Endpoint, PublishTransport, RequestTransport, SocketPublisher,
    SocketRequester, SocketSubscriber, StatusChannel, StreamingChannel, SubscribeTransport,
};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tracing::{debug, info};

/// Options applied to IK-level hand commands before they are sent
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HandOptions {
    /// When false, finger abduction joints are sent as zero
    pub include_abduction: bool,
}

impl Default for HandOptions {
    fn default() -> Self {
        Self {
            include_abduction: true,
        }
    }
}

impl HandOptions {
    fn apply(&self, cmd: &mut PoseCommand) {
        if self.include_abduction || cmd.kind() != CommandKind::Hand {
            return;
        }
        let positions = cmd.pose_mut().positions_mut();
        // Joint 0 of index, middle, ring and pinky
        for finger in 1..5 {
            positions[finger * JOINTS_PER_FINGER] = 0.0;
        }
    }
}

/// Path a pose command takes to the host
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    /// Acknowledged, over the command channel
    Command,
    /// Fire-and-forget, over a streaming channel
    Stream,
}

/// Transports for [`ControlClient::with_transports`]
pub struct Transports {
    pub command: Box<dyn RequestTransport>,
    pub status: Box<dyn SubscribeTransport>,
    pub streaming: Option<Box<dyn PublishTransport>>,
    /// Used for wrist and linear frames when present
    pub wrist_streaming: Option<Box<dyn PublishTransport>>,
}

struct Channels {
    command: CommandChannel,
    status: StatusChannel,
    streaming: Option<StreamingChannel>,
    wrist_streaming: Option<StreamingChannel>,
}

pub struct ControlClient {
    channels: Option<Channels>,
    readiness: ReadinessController,
    hand: HandOptions,
}

fn parse_endpoint(name: &'static str, value: &str) -> Result<Endpoint> {
    if value.trim().is_empty() {
        return Err(ClientError::InvalidArgument(format!("{name} endpoint is empty")));
    }
    Ok(Endpoint::parse(value)?)
}

fn optional_endpoint(value: Option<&str>) -> Result<Option<Endpoint>> {
    match value.map(str::trim) {
        None | Some("") => Ok(None),
        Some(value) => Ok(Some(Endpoint::parse(value)?)),
    }
}

impl ControlClient {
    /// Open the channels described by `config`
    ///
    /// Connections are established lazily; nothing is sent until the first
    /// operation. Must be called inside a tokio runtime.
    pub fn connect(config: &ClientConfig) -> Result<Self> {
        let endpoints = &config.endpoints;
        let command = parse_endpoint("command", &endpoints.command)?;
        let status = parse_endpoint("status", &endpoints.status)?;
        let streaming = optional_endpoint(Some(&endpoints.streaming))?;
        let wrist_streaming = optional_endpoint(endpoints.wrist_streaming.as_deref())?;

        info!(
            command = %command,
            status = %status,
            streaming = ?streaming.as_ref().map(|e| e.to_string()),
            wrist_streaming = ?wrist_streaming.as_ref().map(|e| e.to_string()),
            "Opening ProHand client"
        );

        let streaming_depth = config.streaming.queue_depth;
        let transports = Transports {
            command: Box::new(SocketRequester::new(command)),
            status: Box::new(SocketSubscriber::new(status, config.status.queue_depth)),
            streaming: streaming.map(|ep| {
                Box::new(SocketPublisher::new(ep, streaming_depth)) as Box<dyn PublishTransport>
            }),
            wrist_streaming: wrist_streaming.map(|ep| {
                Box::new(SocketPublisher::new(ep, streaming_depth)) as Box<dyn PublishTransport>
            }),
        };
        Ok(Self::with_transports(transports, config))
    }

    /// Build a client over caller-supplied transports
    pub fn with_transports(transports: Transports, config: &ClientConfig) -> Self {
        let channels = Channels {
            command: CommandChannel::new(transports.command, config.command_timeout()),
            status: StatusChannel::new(transports.status),
            streaming: transports.streaming.map(StreamingChannel::new),
            wrist_streaming: transports.wrist_streaming.map(StreamingChannel::new),
        };
        Self {
            channels: Some(channels),
            readiness: ReadinessController::new(config.readiness_config()),
            hand: config.hand_options(),
        }
    }

    fn channels(&mut self) -> Result<&mut Channels> {
        self.channels.as_mut().ok_or(ClientError::NullHandle)
    }

    fn parts(&mut self) -> Result<(&mut Channels, &mut ReadinessController)> {
        let channels = self.channels.as_mut().ok_or(ClientError::NullHandle)?;
        Ok((channels, &mut self.readiness))
    }

    async fn request(&mut self, cmd: &CommandEnvelope) -> Result<()> {
        self.channels()?.command.request(cmd).await?;
        Ok(())
    }

    pub fn is_connected(&self) -> bool {
        self.channels.is_some()
    }

    pub fn readiness_state(&self) -> ReadinessState {
        self.readiness.state()
    }

    pub fn hand_options(&self) -> HandOptions {
        self.hand
    }

    pub fn set_hand_options(&mut self, options: HandOptions) {
        self.hand = options;
    }

    pub async fn ping(&mut self) -> Result<()> {
        self.request(&CommandEnvelope::Ping).await
    }

    /// Send the client's wall-clock time to the host
    pub async fn time_sync(&mut self) -> Result<()> {
        let client_time_ms = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_err(|e| ClientError::Other(e.to_string()))?
            .as_millis() as u64;
        self.request(&CommandEnvelope::TimeSync { client_time_ms })
            .await
    }

    pub async fn set_streaming_mode(&mut self, enabled: bool) -> Result<()> {
        if enabled {
            self.enable_streaming().await
        } else {
            self.disable_streaming().await
        }
    }

    /// Ping, then request streaming; does not wait for verification
    pub async fn enable_streaming(&mut self) -> Result<()> {
        let (channels, readiness) = self.parts()?;
        readiness.enable(&mut channels.command).await?;
        Ok(())
    }

    /// Request streaming off without verification
    pub async fn disable_streaming(&mut self) -> Result<()> {
        let (channels, readiness) = self.parts()?;
        readiness.disable(&mut channels.command).await?;
        Ok(())
    }

    /// Whether any actuator group is known to be running
    ///
    /// Drains pending status. Failures read as `false`.
    pub fn is_running_state(&mut self) -> bool {
        match self.parts() {
            Ok((channels, readiness)) => readiness.observe(&mut channels.status, None),
            Err(_) => false,
        }
    }

    /// Enable streaming and wait until any actuator group reports Running
    pub async fn wait_for_streaming_ready(&mut self, timeout: Duration, retry_interval: Duration) -> bool {
        self.wait_ready(None, timeout, retry_interval).await
    }

    /// Like [`wait_for_streaming_ready`](Self::wait_for_streaming_ready) but
    /// waits for the group that executes `kind`
    pub async fn wait_for_group_ready(
        &mut self,
        kind: CommandKind,
        timeout: Duration,
        retry_interval: Duration,
    ) -> bool {
        self.wait_ready(Some(kind), timeout, retry_interval).await
    }

    /// Wait with the configured timeout and retry interval
    pub async fn wait_for_streaming_ready_default(&mut self) -> bool {
        let config = *self.readiness.config();
        self.wait_ready(None, config.timeout, config.retry_interval)
            .await
    }

    async fn wait_ready(
        &mut self,
        kind: Option<CommandKind>,
        timeout: Duration,
        retry_interval: Duration,
    ) -> bool {
        let Ok((channels, readiness)) = self.parts() else {
            return false;
        };
        readiness
            .wait_until_ready(
                &mut channels.command,
                &mut channels.status,
                kind.map(CommandKind::group),
                timeout,
                retry_interval,
            )
            .await
    }

    /// Send a pose over the chosen route
    pub async fn send_pose(&mut self, cmd: PoseCommand, route: Route) -> Result<()> {
        match route {
            Route::Command => self.command_pose(cmd).await,
            Route::Stream => self.stream_pose(cmd),
        }
    }

    /// Build and send a pose; the arity is checked against `kind`
    pub async fn send_pose_command(
        &mut self,
        kind: CommandKind,
        pose: JointPose,
        use_profiler: bool,
        route: Route,
    ) -> Result<()> {
        let cmd = PoseCommand::new(kind, pose, use_profiler)?;
        self.send_pose(cmd, route).await
    }

    async fn command_pose(&mut self, mut cmd: PoseCommand) -> Result<()> {
        self.hand.apply(&mut cmd);
        self.request(&CommandEnvelope::Pose(cmd)).await
    }

    fn stream_pose(&mut self, mut cmd: PoseCommand) -> Result<()> {
        self.hand.apply(&mut cmd);
        let kind = cmd.kind();
        let channels = self.channels()?;
        let channel = match kind {
            CommandKind::Wrist | CommandKind::Linear => channels
                .wrist_streaming
                .as_mut()
                .or(channels.streaming.as_mut()),
            CommandKind::Hand | CommandKind::Rotary => channels.streaming.as_mut(),
        }
        .ok_or(ClientError::NotConnected("no streaming endpoint configured"))?;
        channel.send(&cmd)?;
        Ok(())
    }

    pub async fn send_rotary_commands(&mut self, positions: &[f32], torques: &[f32]) -> Result<()> {
        self.command_pose(PoseCommand::rotary(positions, torques)?)
            .await
    }

    pub fn send_rotary_streams(&mut self, positions: &[f32], torques: &[f32]) -> Result<()> {
        self.stream_pose(PoseCommand::rotary(positions, torques)?)
    }

    pub async fn send_hand_command(&mut self, positions: &[f32], torque: f32) -> Result<()> {
        self.command_pose(PoseCommand::hand(positions, torque)?)
            .await
    }

    pub fn send_hand_streams(&mut self, positions: &[f32], torque: f32) -> Result<()> {
        self.stream_pose(PoseCommand::hand(positions, torque)?)
    }

    pub async fn send_linear_commands(&mut self, positions: &[f32], speeds: &[f32]) -> Result<()> {
        self.command_pose(PoseCommand::linear(positions, speeds)?)
            .await
    }

    pub fn send_linear_streams(&mut self, positions: &[f32], speeds: &[f32]) -> Result<()> {
        self.stream_pose(PoseCommand::linear(positions, speeds)?)
    }

    pub async fn send_wrist_command(&mut self, positions: &[f32], use_profiler: bool) -> Result<()> {
        self.command_pose(PoseCommand::wrist(positions, use_profiler)?)
            .await
    }

    pub fn send_wrist_streams(&mut self, positions: &[f32], use_profiler: bool) -> Result<()> {
        self.stream_pose(PoseCommand::wrist(positions, use_profiler)?)
    }

    /// Zero-calibrate the actuators selected by a 16-entry mask
    pub async fn send_zero_calibration(&mut self, mask: &[bool]) -> Result<()> {
        let service = ServiceCommand::zero_calibration(mask)?;
        self.request(&CommandEnvelope::Service(service)).await
    }

    pub async fn set_auto_calibration(&mut self, enabled: bool) -> Result<()> {
        self.request(&CommandEnvelope::Service(ServiceCommand::AutoCalibration(enabled)))
            .await
    }

    pub async fn set_service_mode(&mut self, enabled: bool) -> Result<()> {
        self.request(&CommandEnvelope::Service(ServiceCommand::ServiceMode(enabled)))
            .await
    }

    /// Set the motion-profiler limits of the wrist IK joints
    #[cfg(feature = "motion-profiler")]
    pub async fn set_wrist_limits(&mut self, limits: WristLimits) -> Result<()> {
        let mut values = limits
            .max_velocity
            .iter()
            .chain(&limits.max_acceleration)
            .chain(&limits.max_jerk);
        if values.any(|v| !v.is_finite() || *v <= 0.0) {
            return Err(ClientError::InvalidArgument(
                "wrist limits must be positive and finite".into(),
            ));
        }
        self.request(&CommandEnvelope::WristLimits(limits)).await
    }

    /// Set the motion-profiler limits of the wrist IK joints
    #[cfg(not(feature = "motion-profiler"))]
    pub async fn set_wrist_limits(&mut self, _limits: WristLimits) -> Result<()> {
        self.channels()?;
        Err(ClientError::Unsupported(
            "wrist limits require the motion-profiler feature",
        ))
    }

    /// Next fresh status envelope, newest first; never blocks
    pub fn try_recv_status(&mut self) -> Result<Option<StatusEnvelope>> {
        let (channels, readiness) = self.parts()?;
        readiness.sync_session(&channels.status);
        let env = channels.status.try_recv()?;
        if let Some(env) = &env {
            readiness.view_mut().apply(env);
        }
        Ok(env)
    }

    /// Last aggregate hand state seen on the status channel
    pub fn hand_status(&self) -> Option<HandStatus> {
        self.readiness.view().hand().cloned()
    }

    pub fn handedness(&self) -> Option<Handedness> {
        self.readiness.view().handedness()
    }

    /// Release all channels; later operations fail with `NullHandle`
    pub fn close(&mut self) {
        if let Some(channels) = self.channels.take() {
            info!(command = %channels.command.describe(), "Closing ProHand client");
        }
    }

    /// Best-effort disable of streaming, then close
    pub async fn shutdown(mut self) {
        if self.is_connected() && self.readiness.state() != ReadinessState::Disabled {
            if let Err(e) = self.disable_streaming().await {
                debug!(error = %e, "Disable during shutdown failed");
            }
        }
        self.close();
    }
}

impl Drop for ControlClient {
    fn drop(&mut self) {
        self.close();
    }
}
