// Topics, loop timing, and control gains
use std::time::Duration;

// Zenoh topics
pub const TOPIC_POSE: &str = "go2/rt/pose"; // telemetry (yaw + optional position)
pub const TOPIC_CMD_VEL: &str = "go2/cmd/vel"; // body velocity commands
pub const TOPIC_LIDAR_SWITCH: &str = "go2/cmd/lidar"; // lidar "ON"/"OFF" payloads

// Control loop period (50 Hz)
pub const TICK_PERIOD: Duration = Duration::from_millis(20);

// How long the driver waits for the first pose sample before giving up
pub const INIT_TIMEOUT: Duration = Duration::from_secs(3);

// Forward maneuver: commanded speed and proportional heading correction
pub const FORWARD_SPEED: f32 = 0.5; // m/s
pub const YAW_GAIN: f32 = 0.5; // rad/s per rad of error
pub const MAX_YAW_CORRECTION: f32 = 0.3; // rad/s

// Turn maneuver: fixed rotation rate and completion tolerance
pub const TURN_SPEED: f32 = 0.5; // rad/s
pub const ANGLE_TOLERANCE: f32 = 0.05; // rad (~2.9 degrees)
