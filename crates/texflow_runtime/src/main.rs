//! Texflow Runtime
//!
//! Opens a window and runs the texture-resident particle simulation.
//!
//! Keys: `P`/`Space` toggles ping-pong, `T` toggles the raw texture view,
//! `Esc` quits.

mod app;
mod camera;
mod cli;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;
use winit::event_loop::{ControlFlow, EventLoop};

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = cli::Args::parse().into_config()?;
    tracing::info!("texflow v{}", texflow_core::VERSION);
    tracing::info!(
        particles = config.particle_count,
        width = config.texture_width,
        height = config.texture_height,
        mode = ?config.output_mode(),
        "starting"
    );

    let event_loop = EventLoop::new()?;
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = app::App::new(config);
    event_loop.run_app(&mut app)?;
    app.finish()
}
