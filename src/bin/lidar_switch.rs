// Publish lidar power commands on the switch topic
//
// The lidar listens for plain "ON"/"OFF" string payloads. Delivery is
// best-effort, so the command is repeated a few times like the vendor
// tooling does.
use clap::{Parser, ValueEnum};
use std::time::Duration;
use tokio::time::sleep;
use tracing::info;

use go2_heading_control::config::TOPIC_LIDAR_SWITCH;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum SwitchState {
    On,
    Off,
}

impl SwitchState {
    fn payload(self) -> &'static str {
        match self {
            SwitchState::On => "ON",
            SwitchState::Off => "OFF",
        }
    }
}

#[derive(Parser)]
#[command(about = "Toggle the onboard lidar over zenoh")]
struct Args {
    /// Desired lidar state
    #[arg(value_enum, default_value = "on")]
    state: SwitchState,

    /// How many times to repeat the command
    #[arg(long, default_value_t = 5)]
    repeat: u32,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    tracing_subscriber::fmt().with_env_filter("info").init();
    let args = Args::parse();

    info!("Opening Zenoh session...");
    let session = zenoh::open(zenoh::Config::default()).await?;
    let publisher = session.declare_publisher(TOPIC_LIDAR_SWITCH).await?;

    info!("Turning lidar {} ({}x on {})", args.state.payload(), args.repeat, TOPIC_LIDAR_SWITCH);
    for i in 0..args.repeat {
        publisher.put(args.state.payload()).await?;
        if i + 1 < args.repeat {
            sleep(Duration::from_secs(1)).await;
        }
    }
    info!("Lidar switch command sent: {}", args.state.payload());

    Ok(())
}
