//! Command and status envelopes
//!
//! Both directions are closed tagged unions with exactly one active variant.
//! Status telemetry additionally carries an `Unhandled` arm so that variants
//! added by newer hosts decode instead of failing.

use crate::codec::{self, CodecError, Result};
use crate::joint::{ActuatorGroup, CommandKind, JointPose, ROTARY_JOINTS};
use crate::tactile::TactileFrame;

/// Default torque applied to IK-level hand commands
pub const DEFAULT_HAND_TORQUE: f32 = 0.45;

/// Wrist IK velocities are not exposed to callers
const WRIST_VELOCITY: f32 = 1.0;

/// Envelopes sent to the host over the command or streaming channel
#[derive(Debug, Clone, PartialEq)]
pub enum CommandEnvelope {
    Ping,
    TimeSync { client_time_ms: u64 },
    Service(ServiceCommand),
    Pose(PoseCommand),
    WristLimits(WristLimits),
}

impl CommandEnvelope {
    pub fn name(&self) -> &'static str {
        match self {
            CommandEnvelope::Ping => "ping",
            CommandEnvelope::TimeSync { .. } => "time_sync",
            CommandEnvelope::Service(service) => service.name(),
            CommandEnvelope::Pose(_) => "pose",
            CommandEnvelope::WristLimits(_) => "wrist_limits",
        }
    }
}

/// Host service-control requests
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceCommand {
    Streaming(bool),
    AutoCalibration(bool),
    ZeroCalibration([bool; ROTARY_JOINTS]),
    ServiceMode(bool),
}

impl ServiceCommand {
    /// Build a zero-calibration request from a per-actuator mask
    pub fn zero_calibration(mask: &[bool]) -> Result<Self> {
        let mask: [bool; ROTARY_JOINTS] = mask.try_into().map_err(|_| CodecError::Arity {
            kind: "zero_calibration",
            expected: ROTARY_JOINTS,
            actual: mask.len(),
        })?;
        Ok(ServiceCommand::ZeroCalibration(mask))
    }

    pub fn name(&self) -> &'static str {
        match self {
            ServiceCommand::Streaming(_) => "set_streaming",
            ServiceCommand::AutoCalibration(_) => "auto_calibration",
            ServiceCommand::ZeroCalibration(_) => "zero_calibration",
            ServiceCommand::ServiceMode(_) => "service_mode",
        }
    }
}

/// A joint-pose command with an arity-checked pose
///
/// The pose always carries one secondary scalar per joint; scalar torques and
/// implicit wrist velocities are expanded at construction.
#[derive(Debug, Clone, PartialEq)]
pub struct PoseCommand {
    kind: CommandKind,
    pose: JointPose,
    use_profiler: bool,
}

impl PoseCommand {
    /// Attach a pose to a command kind, checking the arity
    pub fn new(kind: CommandKind, pose: JointPose, use_profiler: bool) -> Result<Self> {
        codec::check_arity(kind.name(), kind.arity(), pose.len())?;
        Ok(Self {
            kind,
            pose,
            use_profiler,
        })
    }

    /// 16 rotary actuator targets with per-actuator torque
    pub fn rotary(positions: &[f32], torques: &[f32]) -> Result<Self> {
        let kind = CommandKind::Rotary;
        codec::check_arity(kind.name(), kind.arity(), positions.len())?;
        codec::check_arity("rotary torques", kind.arity(), torques.len())?;
        let pose = JointPose::new(positions, torques).ok_or_else(|| {
            CodecError::Malformed("rotary positions and torques differ in length".into())
        })?;
        Self::new(kind, pose, false)
    }

    /// 20 IK-level finger joints sharing one torque
    pub fn hand(positions: &[f32], torque: f32) -> Result<Self> {
        Self::new(CommandKind::Hand, JointPose::uniform(positions, torque), false)
    }

    /// 2 linear actuator targets with per-actuator speed
    pub fn linear(positions: &[f32], speeds: &[f32]) -> Result<Self> {
        let kind = CommandKind::Linear;
        codec::check_arity(kind.name(), kind.arity(), positions.len())?;
        codec::check_arity("linear speeds", kind.arity(), speeds.len())?;
        let pose = JointPose::new(positions, speeds).ok_or_else(|| {
            CodecError::Malformed("linear positions and speeds differ in length".into())
        })?;
        Self::new(kind, pose, false)
    }

    /// 2 IK-level wrist joints, optionally routed through the motion profiler
    pub fn wrist(positions: &[f32], use_profiler: bool) -> Result<Self> {
        Self::new(
            CommandKind::Wrist,
            JointPose::uniform(positions, WRIST_VELOCITY),
            use_profiler,
        )
    }

    pub fn kind(&self) -> CommandKind {
        self.kind
    }

    pub fn pose(&self) -> &JointPose {
        &self.pose
    }

    pub fn pose_mut(&mut self) -> &mut JointPose {
        &mut self.pose
    }

    pub fn use_profiler(&self) -> bool {
        self.use_profiler
    }
}

/// Motion-profiler limits for the two wrist IK joints
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WristLimits {
    pub max_velocity: [f32; 2],
    pub max_acceleration: [f32; 2],
    pub max_jerk: [f32; 2],
}

/// Status telemetry as published by the host
#[derive(Debug, Clone, PartialEq)]
pub struct StatusEnvelope {
    /// Device-side timestamp, non-decreasing per publisher
    pub timestamp_ms: u32,
    /// Per-sample identifier used to drop duplicates
    pub uid: u32,
    pub payload: StatusPayload,
}

impl StatusEnvelope {
    pub fn new(timestamp_ms: u32, uid: u32, payload: StatusPayload) -> Self {
        Self {
            timestamp_ms,
            uid,
            payload,
        }
    }

    /// Whether this envelope reports a group as running
    ///
    /// With `group == None` any group counts.
    pub fn reports_running(&self, group: Option<ActuatorGroup>) -> bool {
        match &self.payload {
            StatusPayload::Group(status) => {
                status.mode == GroupMode::Running && group.map_or(true, |g| g == status.group)
            }
            _ => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum StatusPayload {
    Pong,
    ServiceEcho(ServiceCommand),
    Actuator(ActuatorState),
    Hand(HandState),
    Alert(Alert),
    Group(GroupStatus),
    GroupTarget(GroupTarget),
    Handedness(Handedness),
    Tactile(TactileFrame),
    /// A variant this client does not know; carries the raw kind tag
    Unhandled { kind: u16 },
}

impl StatusPayload {
    pub fn name(&self) -> &'static str {
        match self {
            StatusPayload::Pong => "pong",
            StatusPayload::ServiceEcho(_) => "service_echo",
            StatusPayload::Actuator(_) => "actuator",
            StatusPayload::Hand(_) => "hand",
            StatusPayload::Alert(_) => "alert",
            StatusPayload::Group(_) => "group",
            StatusPayload::GroupTarget(_) => "group_target",
            StatusPayload::Handedness(_) => "handedness",
            StatusPayload::Tactile(_) => "tactile",
            StatusPayload::Unhandled { .. } => "unhandled",
        }
    }
}

/// State of a single actuator
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ActuatorState {
    pub group: ActuatorGroup,
    pub index: u8,
    pub position: f32,
    /// Torque for rotary actuators, speed for linear ones
    pub secondary: f32,
}

/// Aggregate physical state of the hand
#[derive(Debug, Clone, PartialEq)]
pub struct HandState {
    pub rotary_positions: Vec<f32>,
    pub linear_positions: Vec<f32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertSeverity {
    Info,
    Warning,
    Error,
    Critical,
}

impl AlertSeverity {
    pub fn code(self) -> u8 {
        match self {
            AlertSeverity::Info => 0,
            AlertSeverity::Warning => 1,
            AlertSeverity::Error => 2,
            AlertSeverity::Critical => 3,
        }
    }

    /// Unknown severities are treated as errors
    pub fn from_code(code: u8) -> Self {
        match code {
            0 => AlertSeverity::Info,
            1 => AlertSeverity::Warning,
            3 => AlertSeverity::Critical,
            _ => AlertSeverity::Error,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alert {
    pub code: u16,
    pub severity: AlertSeverity,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupMode {
    Idle,
    Calibrating,
    Running,
    Fault,
    Unknown(u8),
}

impl GroupMode {
    pub fn code(self) -> u8 {
        match self {
            GroupMode::Idle => 0,
            GroupMode::Calibrating => 1,
            GroupMode::Running => 2,
            GroupMode::Fault => 3,
            GroupMode::Unknown(code) => code,
        }
    }

    pub fn from_code(code: u8) -> Self {
        match code {
            0 => GroupMode::Idle,
            1 => GroupMode::Calibrating,
            2 => GroupMode::Running,
            3 => GroupMode::Fault,
            other => GroupMode::Unknown(other),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GroupStatus {
    pub group: ActuatorGroup,
    pub mode: GroupMode,
}

/// Echo of the target the host is currently tracking
#[derive(Debug, Clone, PartialEq)]
pub struct GroupTarget {
    pub kind: CommandKind,
    pub pose: JointPose,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Handedness {
    Left,
    Right,
    Unknown,
}

impl Handedness {
    pub fn code(self) -> u8 {
        match self {
            Handedness::Left => 0,
            Handedness::Right => 1,
            Handedness::Unknown => 0xff,
        }
    }

    pub fn from_code(code: u8) -> Self {
        match code {
            0 => Handedness::Left,
            1 => Handedness::Right,
            _ => Handedness::Unknown,
        }
    }
}
