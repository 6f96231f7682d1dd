// Heading-hold maneuvers: straight-line drive and turn-to-heading
//
// Two distinct control laws: forward motion uses proportional yaw
// correction, turning uses a fixed-rate bang-bang law that switches on the
// sign of the error. Unifying them would change behavior near the
// tolerance band, so they stay separate.

use std::f32::consts::{FRAC_PI_2, PI};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::time::{Instant, interval};
use tracing::{info, trace};

use crate::control::angle::normalize_angle;
use crate::control::pose_feed::PoseFeed;
use crate::control::sink::{MotionSink, SinkError};
use crate::{config, messages::MotionCommand};

#[derive(Debug, thiserror::Error)]
pub enum ControlError {
    /// The pose feed has not delivered a sample yet, or the maneuver
    /// arguments are unusable. Raised before any motion command is sent.
    #[error("controller not ready to start maneuver")]
    NotReady,

    #[error("motion sink failed: {0}")]
    Sink(#[from] SinkError),
}

/// Cooperative cancellation flag, checked once per control tick.
#[derive(Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManeuverState {
    Idle,
    MovingForward,
    Turning,
}

/// How a maneuver ended. Cancellation is a normal outcome, not an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Completed,
    Cancelled,
}

#[derive(Debug, Clone, Copy)]
pub struct MoveReport {
    pub outcome: Outcome,
    /// Dead-reckoned distance: commanded speed times elapsed time, not
    /// measured displacement. Diverges from ground truth under slip.
    pub distance_m: f32,
}

#[derive(Debug, Clone, Copy)]
pub struct TurnReport {
    pub outcome: Outcome,
    /// Remaining yaw error when the maneuver ended.
    pub residual_rad: f32,
}

/// Tunable gains and timing. Defaults come from `config`.
#[derive(Debug, Clone, Copy)]
pub struct ControlParams {
    pub tick: std::time::Duration,
    pub forward_speed: f32,
    pub yaw_gain: f32,
    pub max_correction: f32,
    pub turn_speed: f32,
    pub angle_tolerance: f32,
}

impl Default for ControlParams {
    fn default() -> Self {
        Self {
            tick: config::TICK_PERIOD,
            forward_speed: config::FORWARD_SPEED,
            yaw_gain: config::YAW_GAIN,
            max_correction: config::MAX_YAW_CORRECTION,
            turn_speed: config::TURN_SPEED,
            angle_tolerance: config::ANGLE_TOLERANCE,
        }
    }
}

/// Closed-loop heading controller over a pose feed and a velocity sink.
///
/// Maneuvers block the caller until completion or cancellation and always
/// leave the actuator with a stop command, whatever the exit path.
///
/// Maneuver futures must be polled to completion: dropping one mid-await
/// (say, losing a `select!` race) skips the final stop and leaves the
/// actuator with the last nonzero command. To abort early, raise the
/// [`CancelFlag`] instead; the loop observes it within one tick and stops.
pub struct HeadingController<S: MotionSink> {
    feed: PoseFeed,
    sink: S,
    cancel: CancelFlag,
    params: ControlParams,
    target_yaw: Option<f32>,
    state: ManeuverState,
}

impl<S: MotionSink> HeadingController<S> {
    pub fn new(feed: PoseFeed, sink: S, cancel: CancelFlag) -> Self {
        Self::with_params(feed, sink, cancel, ControlParams::default())
    }

    pub fn with_params(feed: PoseFeed, sink: S, cancel: CancelFlag, params: ControlParams) -> Self {
        Self { feed, sink, cancel, params, target_yaw: None, state: ManeuverState::Idle }
    }

    pub fn state(&self) -> ManeuverState {
        self.state
    }

    /// Current heading goal, if a maneuver has ever seeded one.
    pub fn target_yaw(&self) -> Option<f32> {
        self.target_yaw
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Seed the heading goal from the latched initial heading on first use.
    fn ensure_ready(&mut self) -> Result<f32, ControlError> {
        let initial = self.feed.initial_yaw().ok_or(ControlError::NotReady)?;
        Ok(*self.target_yaw.get_or_insert(initial))
    }

    /// Drive straight for `distance_m` meters, holding the current target
    /// heading with proportional yaw correction.
    ///
    /// Distance is dead-reckoned from the commanded speed; the target
    /// heading stays fixed at the value captured when the maneuver began
    /// (drift is corrected back onto a straight line, the controller does
    /// not re-aim at a waypoint).
    pub async fn move_forward(&mut self, distance_m: f32) -> Result<MoveReport, ControlError> {
        if !distance_m.is_finite() || distance_m < 0.0 {
            return Err(ControlError::NotReady);
        }
        let target_yaw = self.ensure_ready()?;
        info!("Moving forward {:.2} m, holding yaw {:.3} rad", distance_m, target_yaw);

        self.state = ManeuverState::MovingForward;
        let result = self.forward_loop(distance_m, target_yaw).await;
        let stopped = self.sink.stop().await;
        self.state = ManeuverState::Idle;

        let report = result?;
        stopped?;
        info!("Forward maneuver {:?}, traveled {:.2} m", report.outcome, report.distance_m);
        Ok(report)
    }

    async fn forward_loop(
        &mut self,
        distance_m: f32,
        target_yaw: f32,
    ) -> Result<MoveReport, ControlError> {
        let start = Instant::now();
        let mut ticker = interval(self.params.tick);

        loop {
            ticker.tick().await;

            let traveled = self.params.forward_speed * start.elapsed().as_secs_f32();
            if self.cancel.is_cancelled() {
                return Ok(MoveReport { outcome: Outcome::Cancelled, distance_m: traveled });
            }
            if traveled >= distance_m {
                return Ok(MoveReport { outcome: Outcome::Completed, distance_m: traveled });
            }

            let yaw = self.feed.current_yaw().ok_or(ControlError::NotReady)?;
            let yaw_error = normalize_angle(target_yaw - yaw);
            let correction = (yaw_error * self.params.yaw_gain)
                .clamp(-self.params.max_correction, self.params.max_correction);

            trace!("forward: traveled {:.2} m, yaw error {:.3} rad", traveled, yaw_error);
            self.sink
                .send(MotionCommand { vx: self.params.forward_speed, vy: 0.0, omega: correction })
                .await?;
        }
    }

    /// Rotate in place by `relative_rad`, accumulated into the heading goal.
    ///
    /// Bang-bang law: fixed-magnitude rotation whose sign follows the
    /// error, stopping once inside the tolerance band. If a tick's worth
    /// of rotation exceeds the band this overshoots and swings back.
    pub async fn turn_to(&mut self, relative_rad: f32) -> Result<TurnReport, ControlError> {
        let target_yaw = self.ensure_ready()?;
        let target_yaw = normalize_angle(target_yaw + relative_rad);
        self.target_yaw = Some(target_yaw);
        info!("Turning {:.3} rad to yaw {:.3} rad", relative_rad, target_yaw);

        self.state = ManeuverState::Turning;
        let result = self.turn_loop(target_yaw).await;
        let stopped = self.sink.stop().await;
        self.state = ManeuverState::Idle;

        let report = result?;
        stopped?;
        info!("Turn maneuver {:?}, residual {:.3} rad", report.outcome, report.residual_rad);
        Ok(report)
    }

    async fn turn_loop(&mut self, target_yaw: f32) -> Result<TurnReport, ControlError> {
        let mut ticker = interval(self.params.tick);

        loop {
            ticker.tick().await;

            let yaw = self.feed.current_yaw().ok_or(ControlError::NotReady)?;
            let angle_error = normalize_angle(target_yaw - yaw);
            if self.cancel.is_cancelled() {
                return Ok(TurnReport { outcome: Outcome::Cancelled, residual_rad: angle_error });
            }
            if angle_error.abs() < self.params.angle_tolerance {
                return Ok(TurnReport { outcome: Outcome::Completed, residual_rad: angle_error });
            }

            let omega =
                if angle_error > 0.0 { self.params.turn_speed } else { -self.params.turn_speed };
            trace!("turn: error {:.3} rad, omega {:.2} rad/s", angle_error, omega);
            self.sink.send(MotionCommand { vx: 0.0, vy: 0.0, omega }).await?;
        }
    }

    pub async fn turn_left_90(&mut self) -> Result<TurnReport, ControlError> {
        self.turn_to(FRAC_PI_2).await
    }

    pub async fn turn_right_90(&mut self) -> Result<TurnReport, ControlError> {
        self.turn_to(-FRAC_PI_2).await
    }

    pub async fn turn_left_20(&mut self) -> Result<TurnReport, ControlError> {
        self.turn_to(PI / 9.0).await
    }

    pub async fn turn_right_20(&mut self) -> Result<TurnReport, ControlError> {
        self.turn_to(-PI / 9.0).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::control::pose_feed::{PoseWriter, pose_feed};
    use crate::messages::PoseSample;
    use std::time::Duration;

    fn pose(yaw: f32) -> PoseSample {
        PoseSample { yaw, position: None, timestamp_ms: None }
    }

    /// Records every command; with a plant attached it integrates the
    /// commanded rotation back into the pose feed, closing the loop.
    #[derive(Default)]
    struct SimSink {
        commands: Vec<MotionCommand>,
        plant: Option<Plant>,
    }

    struct Plant {
        writer: PoseWriter,
        yaw: f32,
        dt: f32,
    }

    impl SimSink {
        fn with_plant(writer: PoseWriter, yaw: f32, dt: f32) -> Self {
            Self { commands: Vec::new(), plant: Some(Plant { writer, yaw, dt }) }
        }

        fn motion_commands(&self) -> &[MotionCommand] {
            let n = self.commands.len();
            // everything before the trailing stop
            &self.commands[..n.saturating_sub(1)]
        }
    }

    impl MotionSink for SimSink {
        async fn send(&mut self, cmd: MotionCommand) -> Result<(), SinkError> {
            self.commands.push(cmd);
            if let Some(plant) = &mut self.plant {
                plant.yaw += cmd.omega * plant.dt;
                plant.writer.push(&pose(plant.yaw));
            }
            Ok(())
        }
    }

    #[tokio::test]
    async fn maneuvers_fail_fast_when_feed_uninitialized() {
        let (_writer, feed) = pose_feed();
        let mut ctl = HeadingController::new(feed, SimSink::default(), CancelFlag::default());

        assert!(matches!(ctl.move_forward(1.0).await, Err(ControlError::NotReady)));
        assert!(matches!(ctl.turn_to(1.0).await, Err(ControlError::NotReady)));
        assert!(ctl.sink().commands.is_empty(), "no motion command may be issued");
        assert_eq!(ctl.state(), ManeuverState::Idle);
    }

    #[tokio::test]
    async fn negative_or_nan_distance_is_rejected() {
        let (writer, feed) = pose_feed();
        writer.push(&pose(0.0));
        let mut ctl = HeadingController::new(feed, SimSink::default(), CancelFlag::default());

        assert!(matches!(ctl.move_forward(-1.0).await, Err(ControlError::NotReady)));
        assert!(matches!(ctl.move_forward(f32::NAN).await, Err(ControlError::NotReady)));
        assert!(ctl.sink().commands.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn move_forward_runs_expected_tick_count() {
        let (writer, feed) = pose_feed();
        writer.push(&pose(0.0));
        let mut ctl = HeadingController::new(feed, SimSink::default(), CancelFlag::default());

        // 1.0 m at 0.5 m/s with 20 ms ticks: distance crosses at t = 2.0 s,
        // so roughly 100 command ticks before the stop.
        let report = ctl.move_forward(1.0).await.unwrap();
        assert_eq!(report.outcome, Outcome::Completed);
        assert!((report.distance_m - 1.0).abs() < 0.02);

        let moves = ctl.sink().motion_commands();
        assert!((99..=101).contains(&moves.len()), "got {} command ticks", moves.len());
        assert!(moves.iter().all(|c| c.vx == config::FORWARD_SPEED && c.vy == 0.0));
        assert!(ctl.sink().commands.last().unwrap().is_stop());
        assert_eq!(ctl.state(), ManeuverState::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn zero_distance_issues_only_stop() {
        let (writer, feed) = pose_feed();
        writer.push(&pose(0.0));
        let mut ctl = HeadingController::new(feed, SimSink::default(), CancelFlag::default());

        let report = ctl.move_forward(0.0).await.unwrap();
        assert_eq!(report.outcome, Outcome::Completed);
        assert_eq!(report.distance_m, 0.0);
        assert_eq!(ctl.sink().commands.len(), 1);
        assert!(ctl.sink().commands[0].is_stop());
    }

    #[tokio::test(start_paused = true)]
    async fn heading_drift_gets_proportional_correction() {
        let (writer, feed) = pose_feed();
        writer.push(&pose(0.0)); // latches initial (and target) yaw at 0
        writer.push(&pose(0.2)); // drifted left by 0.2 rad
        let mut ctl = HeadingController::new(feed, SimSink::default(), CancelFlag::default());

        ctl.move_forward(0.1).await.unwrap();
        let moves = ctl.sink().motion_commands();
        assert!(!moves.is_empty());
        for cmd in moves {
            // error -0.2 rad, gain 0.5 -> omega -0.1 rad/s
            assert!((cmd.omega + 0.1).abs() < 1e-6, "omega was {}", cmd.omega);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn correction_is_clamped_for_large_drift() {
        let (writer, feed) = pose_feed();
        writer.push(&pose(0.0));
        writer.push(&pose(1.5)); // raw correction would be -0.75 rad/s
        let mut ctl = HeadingController::new(feed, SimSink::default(), CancelFlag::default());

        ctl.move_forward(0.1).await.unwrap();
        for cmd in ctl.sink().motion_commands() {
            assert_eq!(cmd.omega, -config::MAX_YAW_CORRECTION);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn turn_converges_with_positive_rotation() {
        let (writer, feed) = pose_feed();
        writer.push(&pose(0.0));
        let sink = SimSink::with_plant(writer.clone(), 0.0, 0.02);
        let mut ctl = HeadingController::new(feed, sink, CancelFlag::default());

        let report = ctl.turn_left_90().await.unwrap();
        assert_eq!(report.outcome, Outcome::Completed);
        assert!(report.residual_rad.abs() < config::ANGLE_TOLERANCE);

        // approaching pi/2 from below: every rotation command is positive
        // and fixed-magnitude, and the loop stops once yaw >= 1.5208
        let moves = ctl.sink().motion_commands();
        assert!(moves.iter().all(|c| c.omega == config::TURN_SPEED && c.vx == 0.0));
        // 1.5208 rad of rotation at 0.01 rad per tick
        assert!((150..=156).contains(&moves.len()), "got {} command ticks", moves.len());
        assert!(ctl.sink().commands.last().unwrap().is_stop());

        let target = ctl.target_yaw().unwrap();
        assert!((target - FRAC_PI_2).abs() < 1e-6);
    }

    #[tokio::test(start_paused = true)]
    async fn turn_is_bang_bang_not_proportional() {
        let (writer, feed) = pose_feed();
        writer.push(&pose(0.0));
        let sink = SimSink::with_plant(writer.clone(), 0.0, 0.02);
        let mut ctl = HeadingController::new(feed, sink, CancelFlag::default());

        ctl.turn_to(-0.3).await.unwrap();
        // magnitude never tapers as the error shrinks
        for cmd in ctl.sink().motion_commands() {
            assert_eq!(cmd.omega, -config::TURN_SPEED);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn turn_goal_accumulates_and_normalizes() {
        let (writer, feed) = pose_feed();
        writer.push(&pose(0.0));
        let sink = SimSink::with_plant(writer.clone(), 0.0, 0.02);
        let mut ctl = HeadingController::new(feed, sink, CancelFlag::default());

        ctl.turn_left_90().await.unwrap();
        ctl.turn_left_90().await.unwrap();
        // 0 + pi/2 + pi/2 = pi, which normalizes to pi exactly
        let target = ctl.target_yaw().unwrap();
        assert!((target - PI).abs() < 1e-5);

        ctl.turn_right_20().await.unwrap();
        let target = ctl.target_yaw().unwrap();
        assert!((target - (PI - PI / 9.0)).abs() < 1e-5);
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_mid_move_stops_within_one_tick() {
        let (writer, feed) = pose_feed();
        writer.push(&pose(0.0));
        let cancel = CancelFlag::default();
        let mut ctl = HeadingController::new(feed, SimSink::default(), cancel.clone());

        let canceller = tokio::spawn({
            let cancel = cancel.clone();
            async move {
                tokio::time::sleep(Duration::from_millis(510)).await;
                cancel.cancel();
            }
        });

        let report = ctl.move_forward(10.0).await.unwrap();
        canceller.await.unwrap();

        assert_eq!(report.outcome, Outcome::Cancelled);
        // cancelled at ~520 ms, nowhere near the 20 s the full distance needs
        assert!(report.distance_m > 0.2 && report.distance_m < 0.3);
        assert!(ctl.sink().commands.last().unwrap().is_stop());
        assert_eq!(ctl.state(), ManeuverState::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn pre_cancelled_turn_issues_only_stop() {
        let (writer, feed) = pose_feed();
        writer.push(&pose(0.0));
        let cancel = CancelFlag::default();
        cancel.cancel();
        let mut ctl = HeadingController::new(feed, SimSink::default(), cancel);

        let report = ctl.turn_left_90().await.unwrap();
        assert_eq!(report.outcome, Outcome::Cancelled);
        assert_eq!(ctl.sink().commands.len(), 1);
        assert!(ctl.sink().commands[0].is_stop());
    }
}
