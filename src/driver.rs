// Scripted route driver
//
// Wires the control core to zenoh: a background task feeds pose telemetry
// into the PoseWriter while the foreground task walks a fixed table of
// maneuvers. Ctrl-C raises the cancel flag; the active maneuver observes
// it at the next tick and leaves the actuator stopped.

use std::f32::consts::{FRAC_PI_2, PI};
use std::time::Duration;

use tokio::time::{sleep, timeout};
use tracing::{error, info, warn};

use crate::config::{INIT_TIMEOUT, TOPIC_POSE};
use crate::control::{
    CancelFlag, ControlError, HeadingController, MotionSink, Outcome, ZenohMotionSink, pose_feed,
};
use crate::messages::PoseSample;

#[derive(Debug, Clone, Copy)]
enum Leg {
    /// Drive straight for this many meters.
    Forward(f32),
    /// Rotate in place by this relative angle in radians.
    Turn(f32),
}

// The demo course: a closed-ish loop with two 20-degree dog-legs.
const ROUTE: &[Leg] = &[
    Leg::Forward(1.0),
    Leg::Turn(PI / 9.0),
    Leg::Forward(1.3),
    Leg::Turn(-PI / 9.0),
    Leg::Forward(3.2),
    Leg::Turn(FRAC_PI_2),
    Leg::Forward(5.3),
    Leg::Turn(FRAC_PI_2),
    Leg::Forward(7.5),
    Leg::Turn(FRAC_PI_2),
    Leg::Forward(0.8),
    Leg::Turn(FRAC_PI_2),
    Leg::Forward(6.0),
    Leg::Turn(-FRAC_PI_2),
    Leg::Forward(3.5),
    Leg::Turn(-FRAC_PI_2),
    Leg::Forward(5.0),
];

pub async fn run() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    info!("Opening Zenoh session...");
    let session = zenoh::open(zenoh::Config::default()).await?;

    let (writer, mut feed) = pose_feed();
    let telemetry_session = session.clone();
    tokio::spawn(async move {
        let subscriber = match telemetry_session.declare_subscriber(TOPIC_POSE).await {
            Ok(sub) => sub,
            Err(e) => {
                error!("Failed to subscribe to {}: {}", TOPIC_POSE, e);
                return;
            }
        };
        while let Ok(sample) = subscriber.recv_async().await {
            let payload = sample.payload().to_bytes();
            match serde_json::from_slice::<PoseSample>(&payload) {
                Ok(pose) => writer.push(&pose),
                Err(e) => warn!("Failed to parse pose sample: {}", e),
            }
        }
    });

    let cancel = CancelFlag::default();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Ctrl-C received, cancelling at next tick");
                cancel.cancel();
            }
        });
    }

    info!("Waiting for first pose sample on {}...", TOPIC_POSE);
    if !matches!(timeout(INIT_TIMEOUT, feed.wait_initialized()).await, Ok(true)) {
        error!("No pose telemetry within {:?}", INIT_TIMEOUT);
        return Err(ControlError::NotReady.into());
    }
    info!("Pose feed ready, initial yaw {:.3} rad", feed.initial_yaw().unwrap_or(0.0));

    let sink = ZenohMotionSink::new(session.clone());
    let mut controller = HeadingController::new(feed, sink, cancel);

    run_route(&mut controller, ROUTE).await
}

async fn run_route<S: MotionSink>(
    controller: &mut HeadingController<S>,
    route: &[Leg],
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    for (i, leg) in route.iter().enumerate() {
        info!("Route leg {}/{}: {:?}", i + 1, route.len(), leg);
        let outcome = match *leg {
            Leg::Forward(distance_m) => controller.move_forward(distance_m).await?.outcome,
            Leg::Turn(angle_rad) => controller.turn_to(angle_rad).await?.outcome,
        };
        if outcome == Outcome::Cancelled {
            info!("Route cancelled during leg {}", i + 1);
            return Ok(());
        }
        // settle between maneuvers
        sleep(Duration::from_secs(1)).await;
    }
    info!("Route complete");
    Ok(())
}
