// Keyboard teleop: WASD drive/turn, Q/E strafe, R/F speed, Space stop, Esc quit
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind},
    terminal::{disable_raw_mode, enable_raw_mode},
};
use std::time::{Duration, Instant};
use tracing::info;

use go2_heading_control::config::{FORWARD_SPEED, TOPIC_CMD_VEL, TURN_SPEED};
use go2_heading_control::messages::MotionCommand;

const SPEED_SCALES: [f32; 3] = [0.5, 1.0, 2.0];
const SCALE_LABELS: [&str; 3] = ["LOW", "MED", "HIGH"];
const LATERAL_SPEED: f32 = 0.3; // m/s
const INPUT_TIMEOUT: Duration = Duration::from_millis(200); // back to Stop after this much silence

/// Current drive intent, replacing the free-floating mode global of
/// typical teleop scripts with one explicit enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum DriveMode {
    #[default]
    Stop,
    Forward,
    Backward,
    TurnLeft,
    TurnRight,
    StrafeLeft,
    StrafeRight,
}

impl DriveMode {
    fn command(self, scale: f32) -> MotionCommand {
        let zero = MotionCommand::stop();
        match self {
            DriveMode::Stop => zero,
            DriveMode::Forward => MotionCommand { vx: FORWARD_SPEED * scale, ..zero },
            DriveMode::Backward => MotionCommand { vx: -FORWARD_SPEED * scale, ..zero },
            DriveMode::TurnLeft => MotionCommand { omega: TURN_SPEED * scale, ..zero },
            DriveMode::TurnRight => MotionCommand { omega: -TURN_SPEED * scale, ..zero },
            DriveMode::StrafeLeft => MotionCommand { vy: LATERAL_SPEED * scale, ..zero },
            DriveMode::StrafeRight => MotionCommand { vy: -LATERAL_SPEED * scale, ..zero },
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    tracing_subscriber::fmt().with_env_filter("info").init();

    info!("Opening Zenoh session...");
    let session = zenoh::open(zenoh::Config::default()).await?;
    let publisher = session.declare_publisher(TOPIC_CMD_VEL).await?;

    info!("Controls: W/S=forward/back, A/D=turn, Q/E=strafe, R/F=speed, Space=stop, Esc=quit");
    info!("Speed: {}", SCALE_LABELS[1]);

    enable_raw_mode()?;
    let result = run_teleop(&publisher).await;
    disable_raw_mode()?;

    // Whatever happened above, leave the platform stopped.
    let stop = serde_json::to_string(&MotionCommand::stop())?;
    publisher.put(stop).await?;

    result
}

async fn run_teleop(
    publisher: &zenoh::pubsub::Publisher<'_>,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let mut mode = DriveMode::Stop;
    let mut scale_idx: usize = 1;
    let mut last_input = Instant::now();

    loop {
        // Poll for key with 20ms timeout (50Hz effective rate)
        if event::poll(Duration::from_millis(20))? {
            if let Event::Key(KeyEvent { code, kind, .. }) = event::read()? {
                let pressed = kind == KeyEventKind::Press || kind == KeyEventKind::Repeat;
                if pressed {
                    match code {
                        KeyCode::Char('w') => mode = DriveMode::Forward,
                        KeyCode::Char('s') => mode = DriveMode::Backward,
                        KeyCode::Char('a') => mode = DriveMode::TurnLeft,
                        KeyCode::Char('d') => mode = DriveMode::TurnRight,
                        KeyCode::Char('q') => mode = DriveMode::StrafeLeft,
                        KeyCode::Char('e') => mode = DriveMode::StrafeRight,
                        KeyCode::Char(' ') => mode = DriveMode::Stop,

                        KeyCode::Char('r') => {
                            scale_idx = (scale_idx + 1).min(SPEED_SCALES.len() - 1);
                            info!("Speed: {}", SCALE_LABELS[scale_idx]);
                        }
                        KeyCode::Char('f') => {
                            scale_idx = scale_idx.saturating_sub(1);
                            info!("Speed: {}", SCALE_LABELS[scale_idx]);
                        }

                        KeyCode::Esc => break,
                        _ => {}
                    }
                    last_input = Instant::now();
                }
            }
        }

        // Dead-man: drop back to Stop when the keys go quiet
        if mode != DriveMode::Stop && last_input.elapsed() > INPUT_TIMEOUT {
            mode = DriveMode::Stop;
        }

        let cmd = mode.command(SPEED_SCALES[scale_idx]);
        publisher.put(serde_json::to_string(&cmd)?).await?;
    }

    Ok(())
}
