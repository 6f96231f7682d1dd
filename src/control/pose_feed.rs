// Last-value pose slot between the telemetry task and the control loop
//
// Telemetry arrives at whatever rate the platform publishes; the control
// loop only ever wants the newest yaw. A watch channel holds exactly one
// value, so stale samples are overwritten instead of queued.

use tokio::sync::watch;
use tracing::debug;

use crate::control::angle::normalize_angle;
use crate::messages::PoseSample;

#[derive(Debug, Clone, Copy)]
struct PoseState {
    yaw: f32,
    initial_yaw: f32,
}

/// Create a connected writer/reader pair around an empty pose slot.
pub fn pose_feed() -> (PoseWriter, PoseFeed) {
    let (tx, rx) = watch::channel(None);
    (PoseWriter { tx }, PoseFeed { rx })
}

/// Producer half, owned by the telemetry task.
#[derive(Clone)]
pub struct PoseWriter {
    tx: watch::Sender<Option<PoseState>>,
}

impl PoseWriter {
    /// Overwrite the slot with the newest sample.
    ///
    /// The very first sample latches `initial_yaw`, capturing the
    /// platform's heading at the moment control begins; later samples
    /// never reset it.
    pub fn push(&self, sample: &PoseSample) {
        let yaw = normalize_angle(sample.yaw);
        self.tx.send_modify(|slot| {
            let initial_yaw = match slot {
                Some(state) => state.initial_yaw,
                None => {
                    debug!("First pose sample, initial yaw {:.3} rad", yaw);
                    yaw
                }
            };
            *slot = Some(PoseState { yaw, initial_yaw });
        });
    }
}

/// Consumer half, read by the control loop. Cheap to clone.
#[derive(Clone)]
pub struct PoseFeed {
    rx: watch::Receiver<Option<PoseState>>,
}

impl PoseFeed {
    /// Latest yaw in `(-pi, pi]`, or `None` before the first sample.
    pub fn current_yaw(&self) -> Option<f32> {
        self.rx.borrow().map(|state| state.yaw)
    }

    /// Heading latched from the first sample ever received.
    pub fn initial_yaw(&self) -> Option<f32> {
        self.rx.borrow().map(|state| state.initial_yaw)
    }

    pub fn is_initialized(&self) -> bool {
        self.rx.borrow().is_some()
    }

    /// Wait until at least one sample has arrived.
    ///
    /// Returns `false` if the writer went away before that happened.
    pub async fn wait_initialized(&mut self) -> bool {
        self.rx.wait_for(|slot| slot.is_some()).await.is_ok()
    }
}
