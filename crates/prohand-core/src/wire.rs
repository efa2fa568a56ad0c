//! Binary envelope format shared by the three channels
//!
//! Every message is a 14-byte header followed by a packed CBOR body:
//!
//! ```text
//! 0       1       2       4               8               12      14
//! +-------+-------+-------+---------------+---------------+-------+
//! |version| class | kind  |  seq or uid   | timestamp ms  |body len|
//! +-------+-------+-------+---------------+---------------+-------+
//! ```
//!
//! All multi-byte fields are big-endian.

use crate::codec::{self, CodecError, Result};
use crate::envelope::{
    ActuatorState, Alert, AlertSeverity, CommandEnvelope, GroupMode, GroupStatus, GroupTarget,
    HandState, Handedness, PoseCommand, ServiceCommand, StatusEnvelope, StatusPayload,
    WristLimits,
};
use crate::joint::{
    ActuatorGroup, CommandKind, WireJointState, LINEAR_JOINTS, LINEAR_RANGES, ROTARY_JOINTS,
    ROTARY_RANGES,
};
use crate::tactile::TactileFrame;
use serde::{Deserialize, Serialize};
use tracing::trace;

pub const WIRE_VERSION: u8 = 1;
pub const HEADER_LEN: usize = 14;

/// Kind tags
pub mod kind {
    pub const PING: u16 = 0x0001;
    pub const TIME_SYNC: u16 = 0x0002;
    pub const SERVICE: u16 = 0x0010;
    pub const WRIST_LIMITS: u16 = 0x0011;
    pub const POSE_ROTARY: u16 = 0x0020;
    pub const POSE_HAND: u16 = 0x0021;
    pub const POSE_LINEAR: u16 = 0x0022;
    pub const POSE_WRIST: u16 = 0x0023;
    pub const ACK: u16 = 0x0040;

    pub const PONG: u16 = 0x0080;
    pub const SERVICE_ECHO: u16 = 0x0081;
    pub const ACTUATOR: u16 = 0x0082;
    pub const HAND_STATE: u16 = 0x0083;
    pub const ALERT: u16 = 0x0084;
    pub const GROUP_STATUS: u16 = 0x0085;
    pub const GROUP_TARGET: u16 = 0x0086;
    pub const HANDEDNESS: u16 = 0x0087;
    pub const TACTILE: u16 = 0x0090;
}

/// Message class carried in the header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameClass {
    Request,
    Reply,
    Stream,
    Status,
}

impl FrameClass {
    fn code(self) -> u8 {
        match self {
            FrameClass::Request => 0,
            FrameClass::Reply => 1,
            FrameClass::Stream => 2,
            FrameClass::Status => 3,
        }
    }

    fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(FrameClass::Request),
            1 => Some(FrameClass::Reply),
            2 => Some(FrameClass::Stream),
            3 => Some(FrameClass::Status),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    pub class: FrameClass,
    pub kind: u16,
    /// Request sequence number, or sample uid for status frames
    pub seq: u32,
    pub timestamp_ms: u32,
    pub body_len: u16,
}

impl Header {
    fn encode(&self) -> [u8; HEADER_LEN] {
        let mut header = [0u8; HEADER_LEN];
        header[0] = WIRE_VERSION;
        header[1] = self.class.code();
        header[2..4].copy_from_slice(&self.kind.to_be_bytes());
        header[4..8].copy_from_slice(&self.seq.to_be_bytes());
        header[8..12].copy_from_slice(&self.timestamp_ms.to_be_bytes());
        header[12..14].copy_from_slice(&self.body_len.to_be_bytes());
        header
    }

    /// Decode and validate a header, returning it with the body slice
    pub fn split(frame: &[u8]) -> Result<(Header, &[u8])> {
        if frame.len() < HEADER_LEN {
            return Err(CodecError::Malformed(format!(
                "frame too short: {} bytes",
                frame.len()
            )));
        }
        if frame[0] != WIRE_VERSION {
            return Err(CodecError::UnsupportedVersion(frame[0]));
        }
        let class = FrameClass::from_code(frame[1])
            .ok_or_else(|| CodecError::Malformed(format!("unknown class {}", frame[1])))?;
        let header = Header {
            class,
            kind: u16::from_be_bytes([frame[2], frame[3]]),
            seq: u32::from_be_bytes([frame[4], frame[5], frame[6], frame[7]]),
            timestamp_ms: u32::from_be_bytes([frame[8], frame[9], frame[10], frame[11]]),
            body_len: u16::from_be_bytes([frame[12], frame[13]]),
        };
        let body = &frame[HEADER_LEN..];
        if body.len() != header.body_len as usize {
            return Err(CodecError::Malformed(format!(
                "body length {} does not match header {}",
                body.len(),
                header.body_len
            )));
        }
        Ok((header, body))
    }
}

fn assemble(
    class: FrameClass,
    kind: u16,
    seq: u32,
    timestamp_ms: u32,
    body: Option<Vec<u8>>,
) -> Result<Vec<u8>> {
    let body = body.unwrap_or_default();
    let body_len = u16::try_from(body.len())
        .map_err(|_| CodecError::Malformed(format!("body too large: {} bytes", body.len())))?;
    let header = Header {
        class,
        kind,
        seq,
        timestamp_ms,
        body_len,
    };
    let mut frame = Vec::with_capacity(HEADER_LEN + body.len());
    frame.extend_from_slice(&header.encode());
    frame.extend_from_slice(&body);
    Ok(frame)
}

fn expect_class(header: &Header, class: FrameClass) -> Result<()> {
    if header.class != class {
        return Err(CodecError::Malformed(format!(
            "expected {:?} frame, got {:?}",
            class, header.class
        )));
    }
    Ok(())
}

fn body<T: Serialize>(value: &T) -> Result<Option<Vec<u8>>> {
    Ok(Some(serde_cbor::ser::to_vec_packed(value)?))
}

// CBOR bodies

#[derive(Serialize, Deserialize)]
struct TimeSyncBody {
    client_time_ms: u64,
}

#[derive(Serialize, Deserialize)]
struct ServiceBody {
    op: u8,
    enabled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    mask: Option<Vec<bool>>,
}

#[derive(Serialize, Deserialize)]
struct PoseBody {
    joints: Vec<WireJointState>,
    #[serde(default)]
    profiler: bool,
}

#[derive(Serialize, Deserialize)]
struct WristLimitsBody {
    max_velocity: [f32; 2],
    max_acceleration: [f32; 2],
    max_jerk: [f32; 2],
}

#[derive(Serialize, Deserialize)]
struct ReplyBody {
    rc: i32,
}

#[derive(Serialize, Deserialize)]
struct ActuatorBody {
    group: u8,
    index: u8,
    joint: WireJointState,
}

#[derive(Serialize, Deserialize)]
struct HandStateBody {
    rotary: Vec<i16>,
    linear: Vec<i16>,
}

#[derive(Serialize, Deserialize)]
struct AlertBody {
    code: u16,
    severity: u8,
    message: String,
}

#[derive(Serialize, Deserialize)]
struct GroupStatusBody {
    group: u8,
    mode: u8,
}

#[derive(Serialize, Deserialize)]
struct GroupTargetBody {
    kind: u8,
    joints: Vec<WireJointState>,
}

#[derive(Serialize, Deserialize)]
struct HandednessBody {
    hand: u8,
}

#[derive(Serialize, Deserialize)]
struct TactileBody {
    valid: bool,
    #[serde(with = "serde_bytes")]
    taxels: Vec<u8>,
}

impl ServiceBody {
    fn from_command(service: &ServiceCommand) -> Self {
        match *service {
            ServiceCommand::Streaming(enabled) => Self {
                op: 0,
                enabled,
                mask: None,
            },
            ServiceCommand::AutoCalibration(enabled) => Self {
                op: 1,
                enabled,
                mask: None,
            },
            ServiceCommand::ZeroCalibration(mask) => Self {
                op: 2,
                enabled: true,
                mask: Some(mask.to_vec()),
            },
            ServiceCommand::ServiceMode(enabled) => Self {
                op: 3,
                enabled,
                mask: None,
            },
        }
    }

    fn into_command(self) -> Result<ServiceCommand> {
        match self.op {
            0 => Ok(ServiceCommand::Streaming(self.enabled)),
            1 => Ok(ServiceCommand::AutoCalibration(self.enabled)),
            2 => ServiceCommand::zero_calibration(&self.mask.unwrap_or_default()),
            3 => Ok(ServiceCommand::ServiceMode(self.enabled)),
            op => Err(CodecError::Malformed(format!("unknown service op {op}"))),
        }
    }
}

fn pose_kind_tag(kind: CommandKind) -> u16 {
    match kind {
        CommandKind::Rotary => kind::POSE_ROTARY,
        CommandKind::Hand => kind::POSE_HAND,
        CommandKind::Linear => kind::POSE_LINEAR,
        CommandKind::Wrist => kind::POSE_WRIST,
    }
}

fn pose_kind_from_tag(tag: u16) -> Option<CommandKind> {
    match tag {
        kind::POSE_ROTARY => Some(CommandKind::Rotary),
        kind::POSE_HAND => Some(CommandKind::Hand),
        kind::POSE_LINEAR => Some(CommandKind::Linear),
        kind::POSE_WRIST => Some(CommandKind::Wrist),
        _ => None,
    }
}

fn pose_body(cmd: &PoseCommand) -> Result<PoseBody> {
    Ok(PoseBody {
        joints: codec::encode(cmd.pose(), cmd.kind().ranges())?,
        profiler: cmd.use_profiler(),
    })
}

fn command_parts(cmd: &CommandEnvelope) -> Result<(u16, Option<Vec<u8>>)> {
    Ok(match cmd {
        CommandEnvelope::Ping => (kind::PING, None),
        CommandEnvelope::TimeSync { client_time_ms } => (
            kind::TIME_SYNC,
            body(&TimeSyncBody {
                client_time_ms: *client_time_ms,
            })?,
        ),
        CommandEnvelope::Service(service) => {
            (kind::SERVICE, body(&ServiceBody::from_command(service))?)
        }
        CommandEnvelope::Pose(pose) => (pose_kind_tag(pose.kind()), body(&pose_body(pose)?)?),
        CommandEnvelope::WristLimits(limits) => (
            kind::WRIST_LIMITS,
            body(&WristLimitsBody {
                max_velocity: limits.max_velocity,
                max_acceleration: limits.max_acceleration,
                max_jerk: limits.max_jerk,
            })?,
        ),
    })
}

/// Encode a command-channel request
pub fn encode_request(seq: u32, cmd: &CommandEnvelope) -> Result<Vec<u8>> {
    let (kind, body) = command_parts(cmd)?;
    assemble(FrameClass::Request, kind, seq, 0, body)
}

/// Encode a streaming-channel pose frame
pub fn encode_stream(cmd: &PoseCommand) -> Result<Vec<u8>> {
    assemble(
        FrameClass::Stream,
        pose_kind_tag(cmd.kind()),
        0,
        0,
        body(&pose_body(cmd)?)?,
    )
}

/// Decode a request or stream frame as seen by the host
pub fn decode_command(frame: &[u8]) -> Result<(Header, CommandEnvelope)> {
    let (header, body) = Header::split(frame)?;
    if !matches!(header.class, FrameClass::Request | FrameClass::Stream) {
        return Err(CodecError::Malformed(format!(
            "expected command frame, got {:?}",
            header.class
        )));
    }

    let cmd = match header.kind {
        kind::PING => CommandEnvelope::Ping,
        kind::TIME_SYNC => {
            let b: TimeSyncBody = serde_cbor::from_slice(body)?;
            CommandEnvelope::TimeSync {
                client_time_ms: b.client_time_ms,
            }
        }
        kind::SERVICE => {
            let b: ServiceBody = serde_cbor::from_slice(body)?;
            CommandEnvelope::Service(b.into_command()?)
        }
        kind::WRIST_LIMITS => {
            let b: WristLimitsBody = serde_cbor::from_slice(body)?;
            CommandEnvelope::WristLimits(WristLimits {
                max_velocity: b.max_velocity,
                max_acceleration: b.max_acceleration,
                max_jerk: b.max_jerk,
            })
        }
        tag => {
            let kind = pose_kind_from_tag(tag)
                .ok_or_else(|| CodecError::Malformed(format!("unknown command kind {tag:#06x}")))?;
            let b: PoseBody = serde_cbor::from_slice(body)?;
            let pose = codec::decode(&b.joints, kind.ranges())?;
            CommandEnvelope::Pose(PoseCommand::new(kind, pose, b.profiler)?)
        }
    };
    Ok((header, cmd))
}

/// Acknowledgment for a command-channel request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reply {
    pub seq: u32,
    /// Host result code, zero on success
    pub rc: i32,
}

pub fn encode_reply(seq: u32, rc: i32) -> Result<Vec<u8>> {
    assemble(FrameClass::Reply, kind::ACK, seq, 0, body(&ReplyBody { rc })?)
}

pub fn decode_reply(frame: &[u8]) -> Result<Reply> {
    let (header, body) = Header::split(frame)?;
    expect_class(&header, FrameClass::Reply)?;
    // An empty body is a bare acknowledgment
    let rc = if body.is_empty() {
        0
    } else {
        serde_cbor::from_slice::<ReplyBody>(body)?.rc
    };
    Ok(Reply {
        seq: header.seq,
        rc,
    })
}

fn quantize_positions(values: &[f32], ranges: &[crate::joint::JointRange]) -> Vec<i16> {
    values
        .iter()
        .zip(ranges)
        .map(|(&x, r)| codec::quantize(if x.is_nan() { 0.0 } else { x }, r.position))
        .collect()
}

fn dequantize_positions(
    values: &[i16],
    ranges: &[crate::joint::JointRange],
    what: &'static str,
) -> Result<Vec<f32>> {
    codec::check_arity(what, ranges.len(), values.len())?;
    Ok(values
        .iter()
        .zip(ranges)
        .map(|(&q, r)| codec::dequantize(q, r.position))
        .collect())
}

fn status_parts(payload: &StatusPayload) -> Result<(u16, Option<Vec<u8>>)> {
    Ok(match payload {
        StatusPayload::Pong => (kind::PONG, None),
        StatusPayload::ServiceEcho(service) => (
            kind::SERVICE_ECHO,
            body(&ServiceBody::from_command(service))?,
        ),
        StatusPayload::Actuator(state) => {
            let range = state
                .group
                .ranges()
                .get(state.index as usize)
                .ok_or_else(|| {
                    CodecError::Malformed(format!("{} actuator {} out of range", state.group, state.index))
                })?;
            (
                kind::ACTUATOR,
                body(&ActuatorBody {
                    group: state.group.code(),
                    index: state.index,
                    joint: WireJointState {
                        position: codec::quantize(state.position, range.position),
                        secondary: codec::quantize(state.secondary, range.secondary),
                    },
                })?,
            )
        }
        StatusPayload::Hand(state) => {
            codec::check_arity("hand rotary", ROTARY_JOINTS, state.rotary_positions.len())?;
            codec::check_arity("hand linear", LINEAR_JOINTS, state.linear_positions.len())?;
            (
                kind::HAND_STATE,
                body(&HandStateBody {
                    rotary: quantize_positions(&state.rotary_positions, &ROTARY_RANGES),
                    linear: quantize_positions(&state.linear_positions, &LINEAR_RANGES),
                })?,
            )
        }
        StatusPayload::Alert(alert) => (
            kind::ALERT,
            body(&AlertBody {
                code: alert.code,
                severity: alert.severity.code(),
                message: alert.message.clone(),
            })?,
        ),
        StatusPayload::Group(status) => (
            kind::GROUP_STATUS,
            body(&GroupStatusBody {
                group: status.group.code(),
                mode: status.mode.code(),
            })?,
        ),
        StatusPayload::GroupTarget(target) => (
            kind::GROUP_TARGET,
            body(&GroupTargetBody {
                kind: target.kind.code(),
                joints: codec::encode(&target.pose, target.kind.ranges())?,
            })?,
        ),
        StatusPayload::Handedness(hand) => (
            kind::HANDEDNESS,
            body(&HandednessBody { hand: hand.code() })?,
        ),
        StatusPayload::Tactile(frame) => (
            kind::TACTILE,
            body(&TactileBody {
                valid: frame.valid,
                taxels: frame.to_packed(),
            })?,
        ),
        StatusPayload::Unhandled { kind } => (*kind, None),
    })
}

/// Encode a status frame as published by the host
pub fn encode_status(env: &StatusEnvelope) -> Result<Vec<u8>> {
    let (kind, body) = status_parts(&env.payload)?;
    assemble(FrameClass::Status, kind, env.uid, env.timestamp_ms, body)
}

/// Decode a status frame; unknown kind tags yield `StatusPayload::Unhandled`
pub fn decode_status(frame: &[u8]) -> Result<StatusEnvelope> {
    let (header, body) = Header::split(frame)?;
    expect_class(&header, FrameClass::Status)?;

    let payload = match header.kind {
        kind::PONG => StatusPayload::Pong,
        kind::SERVICE_ECHO => {
            let b: ServiceBody = serde_cbor::from_slice(body)?;
            StatusPayload::ServiceEcho(b.into_command()?)
        }
        kind::ACTUATOR => {
            let b: ActuatorBody = serde_cbor::from_slice(body)?;
            let group = ActuatorGroup::from_code(b.group)
                .ok_or_else(|| CodecError::Malformed(format!("unknown actuator group {}", b.group)))?;
            let range = group.ranges().get(b.index as usize).ok_or_else(|| {
                CodecError::Malformed(format!("{group} actuator {} out of range", b.index))
            })?;
            StatusPayload::Actuator(ActuatorState {
                group,
                index: b.index,
                position: codec::dequantize(b.joint.position, range.position),
                secondary: codec::dequantize(b.joint.secondary, range.secondary),
            })
        }
        kind::HAND_STATE => {
            let b: HandStateBody = serde_cbor::from_slice(body)?;
            StatusPayload::Hand(HandState {
                rotary_positions: dequantize_positions(&b.rotary, &ROTARY_RANGES, "hand rotary")?,
                linear_positions: dequantize_positions(&b.linear, &LINEAR_RANGES, "hand linear")?,
            })
        }
        kind::ALERT => {
            let b: AlertBody = serde_cbor::from_slice(body)?;
            StatusPayload::Alert(Alert {
                code: b.code,
                severity: AlertSeverity::from_code(b.severity),
                message: b.message,
            })
        }
        kind::GROUP_STATUS => {
            let b: GroupStatusBody = serde_cbor::from_slice(body)?;
            let group = ActuatorGroup::from_code(b.group)
                .ok_or_else(|| CodecError::Malformed(format!("unknown actuator group {}", b.group)))?;
            StatusPayload::Group(GroupStatus {
                group,
                mode: GroupMode::from_code(b.mode),
            })
        }
        kind::GROUP_TARGET => {
            let b: GroupTargetBody = serde_cbor::from_slice(body)?;
            let kind = CommandKind::from_code(b.kind)
                .ok_or_else(|| CodecError::Malformed(format!("unknown command kind {}", b.kind)))?;
            StatusPayload::GroupTarget(GroupTarget {
                kind,
                pose: codec::decode(&b.joints, kind.ranges())?,
            })
        }
        kind::HANDEDNESS => {
            let b: HandednessBody = serde_cbor::from_slice(body)?;
            StatusPayload::Handedness(Handedness::from_code(b.hand))
        }
        kind::TACTILE => {
            let b: TactileBody = serde_cbor::from_slice(body)?;
            let frame = TactileFrame::from_packed(b.valid, header.timestamp_ms, header.seq, &b.taxels)
                .ok_or_else(|| {
                    CodecError::Malformed(format!("tactile frame with {} taxels", b.taxels.len()))
                })?;
            StatusPayload::Tactile(frame)
        }
        other => {
            trace!(kind = other, "unhandled status kind");
            StatusPayload::Unhandled { kind: other }
        }
    };

    Ok(StatusEnvelope {
        timestamp_ms: header.timestamp_ms,
        uid: header.seq,
        payload,
    })
}

/// Peek at the header without decoding the body
pub fn peek_header(frame: &[u8]) -> Result<Header> {
    Header::split(frame).map(|(header, _)| header)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::envelope::DEFAULT_HAND_TORQUE;
    use crate::joint::JointPose;

    #[test]
    fn test_header_layout() {
        let frame = encode_request(0x01020304, &CommandEnvelope::Ping).unwrap();
        assert_eq!(frame.len(), HEADER_LEN);
        assert_eq!(frame[0], WIRE_VERSION);
        assert_eq!(frame[1], 0);
        assert_eq!(&frame[2..4], &kind::PING.to_be_bytes());
        assert_eq!(&frame[4..8], &[1, 2, 3, 4]);
        assert_eq!(&frame[12..14], &[0, 0]);
    }

    #[test]
    fn test_request_decodes_on_host_side() {
        let cmd = CommandEnvelope::Pose(PoseCommand::hand(&[0.0; 20], DEFAULT_HAND_TORQUE).unwrap());
        let frame = encode_request(7, &cmd).unwrap();
        let (header, decoded) = decode_command(&frame).unwrap();
        assert_eq!(header.seq, 7);
        assert_eq!(header.kind, kind::POSE_HAND);
        match decoded {
            CommandEnvelope::Pose(pose) => {
                assert_eq!(pose.kind(), CommandKind::Hand);
                assert!((pose.pose().secondary()[0] - DEFAULT_HAND_TORQUE).abs() < 1e-4);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_service_streaming_request() {
        let frame =
            encode_request(1, &CommandEnvelope::Service(ServiceCommand::Streaming(true))).unwrap();
        let (_, decoded) = decode_command(&frame).unwrap();
        assert_eq!(
            decoded,
            CommandEnvelope::Service(ServiceCommand::Streaming(true))
        );
    }

    #[test]
    fn test_stream_frame_class() {
        let frame = encode_stream(&PoseCommand::wrist(&[0.2, -0.1], true).unwrap()).unwrap();
        let header = peek_header(&frame).unwrap();
        assert_eq!(header.class, FrameClass::Stream);
        assert_eq!(header.seq, 0);
        assert!(decode_reply(&frame).is_err());
    }

    #[test]
    fn test_reply_rc() {
        let frame = encode_reply(9, -3).unwrap();
        assert_eq!(decode_reply(&frame).unwrap(), Reply { seq: 9, rc: -3 });
    }

    #[test]
    fn test_unknown_status_kind_is_unhandled() {
        let env = StatusEnvelope::new(5, 6, StatusPayload::Unhandled { kind: 0x7777 });
        let frame = encode_status(&env).unwrap();
        let decoded = decode_status(&frame).unwrap();
        assert_eq!(decoded.payload, StatusPayload::Unhandled { kind: 0x7777 });
        assert_eq!(decoded.uid, 6);
        assert_eq!(decoded.timestamp_ms, 5);
    }

    #[test]
    fn test_group_status_and_hand_state() {
        let env = StatusEnvelope::new(
            100,
            1,
            StatusPayload::Group(GroupStatus {
                group: ActuatorGroup::Rotary,
                mode: GroupMode::Running,
            }),
        );
        let decoded = decode_status(&encode_status(&env).unwrap()).unwrap();
        assert!(decoded.reports_running(Some(ActuatorGroup::Rotary)));

        let hand = StatusEnvelope::new(
            101,
            2,
            StatusPayload::Hand(HandState {
                rotary_positions: vec![0.5; 16],
                linear_positions: vec![-0.25; 2],
            }),
        );
        match decode_status(&encode_status(&hand).unwrap()).unwrap().payload {
            StatusPayload::Hand(state) => {
                assert!((state.rotary_positions[15] - 0.5).abs() < 1e-3);
                assert!((state.linear_positions[0] + 0.25).abs() < 1e-3);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_tactile_frame_carries_header_ids() {
        let mut frame = TactileFrame {
            valid: true,
            ..Default::default()
        };
        frame.palm.middle[4] = 200;
        let env = StatusEnvelope::new(42, 17, StatusPayload::Tactile(frame));
        match decode_status(&encode_status(&env).unwrap()).unwrap().payload {
            StatusPayload::Tactile(decoded) => {
                assert_eq!(decoded.uid, 17);
                assert_eq!(decoded.timestamp_ms, 42);
                assert_eq!(decoded.palm.middle[4], 200);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_group_target_arity_checked() {
        let pose = JointPose::uniform(&[0.0; 3], 1.0);
        let env = StatusEnvelope::new(
            0,
            0,
            StatusPayload::GroupTarget(GroupTarget {
                kind: CommandKind::Linear,
                pose,
            }),
        );
        assert!(encode_status(&env).is_err());
    }

    #[test]
    fn test_bad_frames_rejected() {
        assert!(matches!(
            decode_status(&[1, 3, 0]),
            Err(CodecError::Malformed(_))
        ));

        let mut frame = encode_reply(1, 0).unwrap();
        frame[0] = 2;
        assert!(matches!(
            decode_reply(&frame),
            Err(CodecError::UnsupportedVersion(2))
        ));

        let mut frame = encode_reply(1, 0).unwrap();
        frame.push(0);
        assert!(decode_reply(&frame).is_err());
    }
}
