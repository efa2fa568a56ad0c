//! Latest-known device state assembled from status telemetry

use prohand_core::{ActuatorGroup, AlertSeverity, GroupMode, Handedness, StatusEnvelope, StatusPayload};
use std::collections::HashMap;
use tracing::{debug, error, warn};

/// Aggregate physical state of the hand
#[derive(Debug, Clone, PartialEq)]
pub struct HandStatus {
    pub rotary_positions: [f32; 16],
    pub linear_positions: [f32; 2],
    pub timestamp_ms: u32,
}

#[derive(Debug, Default)]
pub struct StatusView {
    modes: HashMap<ActuatorGroup, GroupMode>,
    hand: Option<HandStatus>,
    handedness: Option<Handedness>,
    alerts: u64,
}

impl StatusView {
    /// Fold one envelope into the view
    pub fn apply(&mut self, env: &StatusEnvelope) {
        match &env.payload {
            StatusPayload::Group(status) => {
                let previous = self.modes.insert(status.group, status.mode);
                if previous != Some(status.mode) {
                    debug!(group = %status.group, mode = ?status.mode, "Group mode changed");
                }
            }
            StatusPayload::Hand(state) => {
                let (Ok(rotary), Ok(linear)) = (
                    <[f32; 16]>::try_from(state.rotary_positions.as_slice()),
                    <[f32; 2]>::try_from(state.linear_positions.as_slice()),
                ) else {
                    return;
                };
                self.hand = Some(HandStatus {
                    rotary_positions: rotary,
                    linear_positions: linear,
                    timestamp_ms: env.timestamp_ms,
                });
            }
            StatusPayload::Handedness(hand) => self.handedness = Some(*hand),
            StatusPayload::Alert(alert) => {
                self.alerts += 1;
                match alert.severity {
                    AlertSeverity::Info | AlertSeverity::Warning => {
                        warn!(code = alert.code, severity = ?alert.severity, message = %alert.message, "Device alert")
                    }
                    AlertSeverity::Error | AlertSeverity::Critical => {
                        error!(code = alert.code, severity = ?alert.severity, message = %alert.message, "Device alert")
                    }
                }
            }
            _ => {}
        }
    }

    /// Last reported mode of a group
    pub fn mode(&self, group: ActuatorGroup) -> Option<GroupMode> {
        self.modes.get(&group).copied()
    }

    /// Whether the group (or, with `None`, any group) last reported Running
    pub fn is_running(&self, group: Option<ActuatorGroup>) -> bool {
        match group {
            Some(group) => self.mode(group) == Some(GroupMode::Running),
            None => self.modes.values().any(|mode| *mode == GroupMode::Running),
        }
    }

    pub fn hand(&self) -> Option<&HandStatus> {
        self.hand.as_ref()
    }

    pub fn handedness(&self) -> Option<Handedness> {
        self.handedness
    }

    pub fn alerts_seen(&self) -> u64 {
        self.alerts
    }

    /// Forget group modes, e.g. when streaming is switched
    pub fn clear_modes(&mut self) {
        self.modes.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use prohand_core::{Alert, GroupStatus, HandState};

    fn group(group: ActuatorGroup, mode: GroupMode) -> StatusEnvelope {
        StatusEnvelope::new(0, 0, StatusPayload::Group(GroupStatus { group, mode }))
    }

    #[test]
    fn test_running_per_group() {
        let mut view = StatusView::default();
        assert!(!view.is_running(None));

        view.apply(&group(ActuatorGroup::Rotary, GroupMode::Running));
        view.apply(&group(ActuatorGroup::Linear, GroupMode::Idle));
        assert!(view.is_running(None));
        assert!(view.is_running(Some(ActuatorGroup::Rotary)));
        assert!(!view.is_running(Some(ActuatorGroup::Linear)));

        view.clear_modes();
        assert!(!view.is_running(None));
    }

    #[test]
    fn test_hand_status_and_alerts() {
        let mut view = StatusView::default();
        view.apply(&StatusEnvelope::new(
            77,
            1,
            StatusPayload::Hand(HandState {
                rotary_positions: vec![0.25; 16],
                linear_positions: vec![0.0; 2],
            }),
        ));
        view.apply(&StatusEnvelope::new(
            78,
            2,
            StatusPayload::Alert(Alert {
                code: 12,
                severity: AlertSeverity::Warning,
                message: "over temperature".into(),
            }),
        ));

        let hand = view.hand().unwrap();
        assert_eq!(hand.timestamp_ms, 77);
        assert_eq!(hand.rotary_positions[15], 0.25);
        assert_eq!(view.alerts_seen(), 1);
    }
}
