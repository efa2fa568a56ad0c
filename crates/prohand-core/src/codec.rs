//! Pose codec: physical joint values <-> 16-bit wire values
//!
//! Each scalar is clamped into its joint's range and mapped linearly onto the
//! full `i16` domain:
//!
//! ```text
//! q = round((clamp(x) - min) / (max - min) * 65535) - 32768
//! x = min + (q + 32768) / 65535 * (max - min)
//! ```

use crate::joint::{JointPose, JointRange, Span, WireJointState};
use thiserror::Error;

const STEPS: f64 = 65535.0;
const OFFSET: f64 = 32768.0;

/// Errors raised while encoding or decoding poses and envelopes
#[derive(Error, Debug)]
pub enum CodecError {
    #[error("{kind}: expected {expected} values, got {actual}")]
    Arity {
        kind: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("value at index {index} is not a number")]
    NonFinite { index: usize },

    #[error("malformed frame: {0}")]
    Malformed(String),

    #[error("unsupported envelope version {0}")]
    UnsupportedVersion(u8),

    #[error("CBOR error: {0}")]
    Cbor(#[from] serde_cbor::Error),
}

pub type Result<T> = std::result::Result<T, CodecError>;

/// Quantize one physical value into the span
///
/// NaN must be filtered by the caller; infinities clamp to the span edges.
pub fn quantize(value: f32, span: Span) -> i16 {
    let clamped = span.clamp(value) as f64;
    let unit = (clamped - span.min as f64) / span.width() as f64;
    let q = (unit * STEPS).round() - OFFSET;
    q.clamp(i16::MIN as f64, i16::MAX as f64) as i16
}

pub fn dequantize(q: i16, span: Span) -> f32 {
    let unit = (q as f64 + OFFSET) / STEPS;
    (span.min as f64 + unit * span.width() as f64) as f32
}

/// Size of one quantization step for the span, in physical units
pub fn step(span: Span) -> f32 {
    (span.width() as f64 / STEPS) as f32
}

/// Encode a pose against a range table
///
/// The pose arity must equal the table length. Out-of-range values clamp;
/// NaN is rejected.
pub fn encode(pose: &JointPose, ranges: &[JointRange]) -> Result<Vec<WireJointState>> {
    check_arity("pose", ranges.len(), pose.len())?;

    let mut out = Vec::with_capacity(ranges.len());
    for (index, ((&position, &secondary), range)) in pose
        .positions()
        .iter()
        .zip(pose.secondary())
        .zip(ranges)
        .enumerate()
    {
        if position.is_nan() || secondary.is_nan() {
            return Err(CodecError::NonFinite { index });
        }
        out.push(WireJointState {
            position: quantize(position, range.position),
            secondary: quantize(secondary, range.secondary),
        });
    }
    Ok(out)
}

/// Decode wire values back into a pose against a range table
pub fn decode(states: &[WireJointState], ranges: &[JointRange]) -> Result<JointPose> {
    check_arity("pose", ranges.len(), states.len())?;

    let mut pose = JointPose::with_capacity(ranges.len());
    for (state, range) in states.iter().zip(ranges) {
        pose.push(
            dequantize(state.position, range.position),
            dequantize(state.secondary, range.secondary),
        );
    }
    Ok(pose)
}

pub(crate) fn check_arity(kind: &'static str, expected: usize, actual: usize) -> Result<()> {
    if expected != actual {
        return Err(CodecError::Arity {
            kind,
            expected,
            actual,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::joint::{CommandKind, HAND_RANGES, ROTARY_RANGES, WRIST_RANGES};
    use std::f32::consts::PI;

    #[test]
    fn test_quantize_endpoints() {
        let span = Span { min: -PI, max: PI };
        assert_eq!(quantize(-PI, span), i16::MIN);
        assert_eq!(quantize(PI, span), i16::MAX);
        assert_eq!(quantize(0.0, span), 0);
    }

    #[test]
    fn test_out_of_range_clamps() {
        let span = Span { min: 0.0, max: 1.0 };
        assert_eq!(quantize(5.0, span), i16::MAX);
        assert_eq!(quantize(-5.0, span), i16::MIN);
        assert_eq!(quantize(f32::INFINITY, span), i16::MAX);
        assert_eq!(quantize(f32::NEG_INFINITY, span), i16::MIN);
    }

    #[test]
    fn test_roundtrip_within_one_step() {
        for kind in [
            CommandKind::Rotary,
            CommandKind::Hand,
            CommandKind::Linear,
            CommandKind::Wrist,
        ] {
            let ranges = kind.ranges();
            let positions: Vec<f32> = ranges
                .iter()
                .enumerate()
                .map(|(i, r)| r.position.min + r.position.width() * (i as f32 + 0.37) / ranges.len() as f32)
                .collect();
            let secondary: Vec<f32> = (0..ranges.len()).map(|i| i as f32 / 23.0).collect();
            let pose = JointPose::new(&positions, &secondary).unwrap();

            let wire = encode(&pose, ranges).unwrap();
            let back = decode(&wire, ranges).unwrap();

            for (i, range) in ranges.iter().enumerate() {
                let dp = (back.positions()[i] - positions[i]).abs();
                let ds = (back.secondary()[i] - secondary[i]).abs();
                assert!(dp <= step(range.position), "{kind} joint {i}: {dp}");
                assert!(ds <= step(range.secondary), "{kind} joint {i}: {ds}");
            }
        }
    }

    #[test]
    fn test_monotonic() {
        let span = HAND_RANGES[5].position;
        let mut last = i16::MIN;
        for i in 0..=100 {
            let x = span.min + span.width() * i as f32 / 100.0;
            let q = quantize(x, span);
            assert!(q >= last);
            last = q;
        }
    }

    #[test]
    fn test_arity_mismatch() {
        let pose = JointPose::uniform(&[0.0; 15], 0.5);
        let err = encode(&pose, &ROTARY_RANGES).unwrap_err();
        assert!(matches!(
            err,
            CodecError::Arity {
                expected: 16,
                actual: 15,
                ..
            }
        ));

        let wire = vec![WireJointState::default(); 3];
        assert!(decode(&wire, &WRIST_RANGES).is_err());
    }

    #[test]
    fn test_nan_rejected() {
        let mut positions = [0.0f32; 2];
        positions[1] = f32::NAN;
        let pose = JointPose::uniform(&positions, 1.0);
        let err = encode(&pose, &WRIST_RANGES).unwrap_err();
        assert!(matches!(err, CodecError::NonFinite { index: 1 }));
    }
}
