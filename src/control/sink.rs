// Actuator abstraction: where velocity commands go
//
// The real sink publishes over zenoh; tests substitute a recording sink.
// Commands are fire-and-forget: no acknowledgment is awaited and every
// command fully replaces the previous one on the actuator side.

use tracing::debug;

use crate::config::TOPIC_CMD_VEL;
use crate::messages::MotionCommand;

#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("command serialization failed: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Exclusive-access velocity command sink.
///
/// `&mut self` enforces the single-writer contract: only one controller
/// (or driver) may command the actuator at a time.
#[allow(async_fn_in_trait)]
pub trait MotionSink {
    async fn send(&mut self, cmd: MotionCommand) -> Result<(), SinkError>;

    /// Issue the zero-velocity command.
    async fn stop(&mut self) -> Result<(), SinkError> {
        self.send(MotionCommand::stop()).await
    }
}

/// Publishes `MotionCommand` JSON on the command topic.
pub struct ZenohMotionSink {
    session: zenoh::Session,
    topic: &'static str,
}

impl ZenohMotionSink {
    pub fn new(session: zenoh::Session) -> Self {
        Self { session, topic: TOPIC_CMD_VEL }
    }
}

impl MotionSink for ZenohMotionSink {
    async fn send(&mut self, cmd: MotionCommand) -> Result<(), SinkError> {
        debug!("cmd vx={:.2} vy={:.2} omega={:.2}", cmd.vx, cmd.vy, cmd.omega);
        let payload = serde_json::to_string(&cmd)?;
        self.session
            .put(self.topic, payload)
            .await
            .map_err(|e| SinkError::Transport(e.to_string()))
    }
}
