//! ProHand Core - Data model and wire codec for the ProHand client
//!
//! This crate provides the pure, transport-agnostic pieces of the client:
//! - Joint-space types and per-kind joint range tables
//! - The pose codec mapping physical joint values onto 16-bit wire values
//! - Command and status envelopes (closed tagged unions)
//! - The glove's tactile frame
//! - The binary envelope format shared by all three channels

pub mod codec;
pub mod envelope;
pub mod joint;
pub mod tactile;
pub mod wire;

pub use codec::{decode, encode, CodecError};
pub use envelope::{
    ActuatorState, Alert, AlertSeverity, CommandEnvelope, GroupMode, GroupStatus, GroupTarget,
    HandState, Handedness, PoseCommand, ServiceCommand, StatusEnvelope, StatusPayload,
    WristLimits,
};
pub use joint::{
    ActuatorGroup, CommandKind, JointPose, JointRange, Span, WireJointState, HAND_JOINTS,
    LINEAR_JOINTS, ROTARY_JOINTS, WRIST_JOINTS,
};
pub use tactile::TactileFrame;
