// Wire message types exchanged over zenoh

use serde::{Deserialize, Serialize};

/// Telemetry sample from the platform's state topic.
///
/// Only `yaw` is consumed by the controller; position and timestamp are
/// carried along when the platform provides them.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PoseSample {
    /// Heading in radians (rotation about the vertical axis).
    pub yaw: f32,
    #[serde(default)]
    pub position: Option<[f32; 3]>,
    #[serde(default)]
    pub timestamp_ms: Option<u64>,
}

/// Body velocity command sent to the actuator topic.
///
/// Every command fully replaces prior intent; nothing is queued. The
/// default value is the stop command.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct MotionCommand {
    /// Forward velocity in m/s (positive = forward)
    pub vx: f32,
    /// Lateral velocity in m/s (positive = left)
    pub vy: f32,
    /// Rotational velocity in rad/s (positive = counter-clockwise)
    pub omega: f32,
}

impl MotionCommand {
    pub fn stop() -> Self {
        Self::default()
    }

    pub fn is_stop(&self) -> bool {
        *self == Self::default()
    }
}
