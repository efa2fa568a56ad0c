//! Joint-space types and per-kind joint range tables
//!
//! Every command kind has a fixed arity and a table of physical ranges, one
//! entry per joint. The tables are the compatibility constants shared with
//! the host: both sides quantize against the same ranges.

use serde::{Deserialize, Serialize};
use std::f32::consts::{FRAC_PI_2, FRAC_PI_3, FRAC_PI_6, PI};

/// Raw rotary actuators driven by the hand
pub const ROTARY_JOINTS: usize = 16;
/// IK-level hand joints (5 fingers x 4 joints)
pub const HAND_JOINTS: usize = 20;
/// Raw linear wrist actuators
pub const LINEAR_JOINTS: usize = 2;
/// IK-level wrist joints
pub const WRIST_JOINTS: usize = 2;
/// Joints per finger in the IK-level hand pose
pub const JOINTS_PER_FINGER: usize = 4;

/// Closed interval of physical values for one scalar
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Span {
    pub min: f32,
    pub max: f32,
}

impl Span {
    /// Clamp a finite or infinite value into the interval
    pub fn clamp(&self, value: f32) -> f32 {
        value.clamp(self.min, self.max)
    }

    pub fn width(&self) -> f32 {
        self.max - self.min
    }
}

/// Physical ranges for the two scalars a joint carries on the wire
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct JointRange {
    pub position: Span,
    /// Torque, speed or velocity depending on the command kind
    pub secondary: Span,
}

const UNIT: Span = Span { min: 0.0, max: 1.0 };

const ROTARY: JointRange = JointRange {
    position: Span { min: -PI, max: PI },
    secondary: UNIT,
};

const THUMB: JointRange = JointRange {
    position: Span {
        min: -FRAC_PI_2,
        max: FRAC_PI_2,
    },
    secondary: UNIT,
};

const ABDUCTION: JointRange = JointRange {
    position: Span {
        min: -FRAC_PI_6,
        max: FRAC_PI_6,
    },
    secondary: UNIT,
};

const FLEXION: JointRange = JointRange {
    position: Span {
        min: -PI / 18.0,
        max: FRAC_PI_2 + PI / 18.0,
    },
    secondary: UNIT,
};

const LINEAR: JointRange = JointRange {
    position: Span {
        min: -FRAC_PI_2,
        max: FRAC_PI_2,
    },
    secondary: UNIT,
};

const WRIST_DEVIATION: JointRange = JointRange {
    position: Span {
        min: -FRAC_PI_3,
        max: FRAC_PI_3,
    },
    secondary: UNIT,
};

const WRIST_FLEXION: JointRange = JointRange {
    position: Span {
        min: -FRAC_PI_2,
        max: FRAC_PI_2,
    },
    secondary: UNIT,
};

pub static ROTARY_RANGES: [JointRange; ROTARY_JOINTS] = [ROTARY; ROTARY_JOINTS];

/// Thumb first, then index..pinky as [abduction, flexion, flexion, flexion]
pub static HAND_RANGES: [JointRange; HAND_JOINTS] = [
    THUMB, THUMB, THUMB, THUMB, //
    ABDUCTION, FLEXION, FLEXION, FLEXION, //
    ABDUCTION, FLEXION, FLEXION, FLEXION, //
    ABDUCTION, FLEXION, FLEXION, FLEXION, //
    ABDUCTION, FLEXION, FLEXION, FLEXION,
];

pub static LINEAR_RANGES: [JointRange; LINEAR_JOINTS] = [LINEAR; LINEAR_JOINTS];

pub static WRIST_RANGES: [JointRange; WRIST_JOINTS] = [WRIST_DEVIATION, WRIST_FLEXION];

/// Actuator group reported by group-status telemetry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActuatorGroup {
    Rotary,
    Linear,
}

impl ActuatorGroup {
    pub fn code(self) -> u8 {
        match self {
            ActuatorGroup::Rotary => 0,
            ActuatorGroup::Linear => 1,
        }
    }

    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(ActuatorGroup::Rotary),
            1 => Some(ActuatorGroup::Linear),
            _ => None,
        }
    }

    /// Range table used for per-actuator telemetry of this group
    pub fn ranges(self) -> &'static [JointRange] {
        match self {
            ActuatorGroup::Rotary => &ROTARY_RANGES,
            ActuatorGroup::Linear => &LINEAR_RANGES,
        }
    }
}

impl std::fmt::Display for ActuatorGroup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ActuatorGroup::Rotary => write!(f, "rotary"),
            ActuatorGroup::Linear => write!(f, "linear"),
        }
    }
}

/// Joint-pose command kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommandKind {
    /// Raw rotary actuator targets
    Rotary,
    /// IK-level finger joints
    Hand,
    /// Raw linear wrist actuator targets
    Linear,
    /// IK-level wrist joints
    Wrist,
}

impl CommandKind {
    pub fn arity(self) -> usize {
        self.ranges().len()
    }

    pub fn ranges(self) -> &'static [JointRange] {
        match self {
            CommandKind::Rotary => &ROTARY_RANGES,
            CommandKind::Hand => &HAND_RANGES,
            CommandKind::Linear => &LINEAR_RANGES,
            CommandKind::Wrist => &WRIST_RANGES,
        }
    }

    /// Actuator group that executes commands of this kind on the host
    pub fn group(self) -> ActuatorGroup {
        match self {
            CommandKind::Rotary | CommandKind::Hand => ActuatorGroup::Rotary,
            CommandKind::Linear | CommandKind::Wrist => ActuatorGroup::Linear,
        }
    }

    pub fn code(self) -> u8 {
        match self {
            CommandKind::Rotary => 0,
            CommandKind::Hand => 1,
            CommandKind::Linear => 2,
            CommandKind::Wrist => 3,
        }
    }

    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(CommandKind::Rotary),
            1 => Some(CommandKind::Hand),
            2 => Some(CommandKind::Linear),
            3 => Some(CommandKind::Wrist),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            CommandKind::Rotary => "rotary",
            CommandKind::Hand => "hand",
            CommandKind::Linear => "linear",
            CommandKind::Wrist => "wrist",
        }
    }
}

impl std::fmt::Display for CommandKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Ordered per-joint positions (radians) with one secondary scalar per joint
///
/// The length of `positions` and `secondary` always match; the arity against a
/// command kind is checked when the pose is attached to a command.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct JointPose {
    positions: Vec<f32>,
    secondary: Vec<f32>,
}

impl JointPose {
    /// Build a pose from matching position and secondary slices
    ///
    /// Returns `None` when the lengths differ.
    pub fn new(positions: &[f32], secondary: &[f32]) -> Option<Self> {
        if positions.len() != secondary.len() {
            return None;
        }
        Some(Self {
            positions: positions.to_vec(),
            secondary: secondary.to_vec(),
        })
    }

    /// Build a pose where every joint shares one secondary value
    pub fn uniform(positions: &[f32], secondary: f32) -> Self {
        Self {
            positions: positions.to_vec(),
            secondary: vec![secondary; positions.len()],
        }
    }

    pub(crate) fn with_capacity(arity: usize) -> Self {
        Self {
            positions: Vec::with_capacity(arity),
            secondary: Vec::with_capacity(arity),
        }
    }

    pub(crate) fn push(&mut self, position: f32, secondary: f32) {
        self.positions.push(position);
        self.secondary.push(secondary);
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn positions(&self) -> &[f32] {
        &self.positions
    }

    pub fn secondary(&self) -> &[f32] {
        &self.secondary
    }

    /// Mutable view of the positions; the arity cannot change through it
    pub fn positions_mut(&mut self) -> &mut [f32] {
        &mut self.positions
    }
}

/// Fixed-width (position, secondary) pair as carried on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct WireJointState {
    pub position: i16,
    pub secondary: i16,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_arity_per_kind() {
        assert_eq!(CommandKind::Rotary.arity(), 16);
        assert_eq!(CommandKind::Hand.arity(), 20);
        assert_eq!(CommandKind::Linear.arity(), 2);
        assert_eq!(CommandKind::Wrist.arity(), 2);
    }

    #[test]
    fn test_kind_groups() {
        assert_eq!(CommandKind::Hand.group(), ActuatorGroup::Rotary);
        assert_eq!(CommandKind::Rotary.group(), ActuatorGroup::Rotary);
        assert_eq!(CommandKind::Wrist.group(), ActuatorGroup::Linear);
        assert_eq!(CommandKind::Linear.group(), ActuatorGroup::Linear);
    }

    #[test]
    fn test_hand_range_layout() {
        for finger in 0..5 {
            let base = finger * JOINTS_PER_FINGER;
            if finger == 0 {
                assert_eq!(HAND_RANGES[base], THUMB);
            } else {
                assert_eq!(HAND_RANGES[base], ABDUCTION);
                assert_eq!(HAND_RANGES[base + 3], FLEXION);
            }
        }
    }

    #[test]
    fn test_codes_roundtrip() {
        for kind in [
            CommandKind::Rotary,
            CommandKind::Hand,
            CommandKind::Linear,
            CommandKind::Wrist,
        ] {
            assert_eq!(CommandKind::from_code(kind.code()), Some(kind));
        }
        assert_eq!(CommandKind::from_code(9), None);
        assert_eq!(ActuatorGroup::from_code(1), Some(ActuatorGroup::Linear));
        assert_eq!(ActuatorGroup::from_code(7), None);
    }

    #[test]
    fn test_joint_pose_length_mismatch() {
        assert!(JointPose::new(&[0.0, 1.0], &[0.5]).is_none());
        let pose = JointPose::uniform(&[0.0; 4], 0.45);
        assert_eq!(pose.secondary(), &[0.45; 4]);
    }
}
