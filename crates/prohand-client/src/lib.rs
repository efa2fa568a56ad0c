//! ProHand Client - Control facade for the ProHand and the ProGlove
//!
//! [`ControlClient`] owns the command, streaming and status channels to the
//! host and a [`ReadinessController`] that turns the unacknowledged
//! "streaming on" request into a verified transition. [`GloveClient`] reads
//! tactile frames from the glove's status channel.

pub mod client;
pub mod config;
pub mod error;
pub mod glove;
pub mod logging;
pub mod readiness;
pub mod view;

pub use client::{ControlClient, HandOptions, Route, Transports};
pub use config::{load_config, load_glove_config, ClientConfig, GloveConfig};
pub use error::{ClientError, Result};
pub use glove::GloveClient;
pub use readiness::{ReadinessConfig, ReadinessController, ReadinessState};
pub use view::{HandStatus, StatusView};

pub use prohand_core::envelope::DEFAULT_HAND_TORQUE;
pub use prohand_core::{
    ActuatorGroup, CommandKind, Handedness, JointPose, PoseCommand, StatusEnvelope,
    StatusPayload, TactileFrame, WristLimits,
};

/// Crate version
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
