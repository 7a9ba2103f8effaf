use std::path::PathBuf;
use std::time::Duration;

use bevy::log::LogPlugin;
use bevy::prelude::*;
use bevy::time::TimeUpdateStrategy;
use clap::Parser;

use reroute::{MonitorConfig, RerouteMonitorPlugin};

mod agent_mode;
mod demo;
mod waypoint_directions;

/// Virtual time added by each frame of the headless app.
pub const FRAME: Duration = Duration::from_secs(1);

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// JSON config file; missing fields keep their defaults
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// Speak newline-delimited JSON on stdin/stdout instead of running the demo
    #[arg(long)]
    agent: bool,
    /// Simulated minutes for the demo session
    #[arg(short, long, default_value_t = 30)]
    minutes: u64,
}

fn main() {
    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref());
    let mut app = build_headless_app(config);

    if cli.agent {
        agent_mode::run_agent_mode(&mut app);
    } else {
        demo::run_demo(&mut app, cli.minutes);
    }
}

/// Falls back to the defaults when the file is missing or invalid.
fn load_config(path: Option<&std::path::Path>) -> MonitorConfig {
    let Some(path) = path else {
        return MonitorConfig::default();
    };
    match MonitorConfig::load(path) {
        Ok(config) => config,
        Err(e) => {
            // The log subscriber is not up yet.
            eprintln!(
                "failed to load config {}: {e}; using defaults",
                path.display()
            );
            MonitorConfig::default()
        }
    }
}

/// Monitor plugin on top of `MinimalPlugins`, stepped manually one
/// [`FRAME`] per update so session time is independent of wall-clock time.
pub fn build_headless_app(config: MonitorConfig) -> App {
    let mut app = App::new();
    app.add_plugins(MinimalPlugins);
    // Writes to stderr, so agent mode keeps stdout for the protocol.
    app.add_plugins(LogPlugin::default());
    app.insert_resource(TimeUpdateStrategy::ManualDuration(FRAME));
    app.insert_resource(config);
    app.add_plugins(RerouteMonitorPlugin);
    app.world_mut()
        .resource_mut::<Time<Virtual>>()
        .set_max_delta(Duration::from_secs(3600));

    // Prime the clocks; the first update has a zero delta.
    app.update();
    app
}
