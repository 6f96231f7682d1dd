// Heading-hold control core
//
// Provides:
// - Total angle normalization into (-pi, pi]
// - Last-value pose slot bridging telemetry into the control loop
// - MotionSink actuator abstraction (zenoh-backed in deployment)
// - Closed-loop straight-line and turn-to-heading maneuvers

mod angle;
mod controller;
mod pose_feed;
mod sink;

pub use angle::normalize_angle;
pub use controller::{
    CancelFlag, ControlError, ControlParams, HeadingController, ManeuverState, MoveReport, Outcome,
    TurnReport,
};
pub use pose_feed::{PoseFeed, PoseWriter, pose_feed};
pub use sink::{MotionSink, SinkError, ZenohMotionSink};
