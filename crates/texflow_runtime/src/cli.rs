//! Command-line options
//!
//! Flags override whatever the JSON config file (or the defaults) say.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use texflow_core::SimulationConfig;

#[derive(Parser, Debug)]
#[command(name = "texflow", version, about = "Texture-resident particle simulation")]
pub struct Args {
    /// JSON simulation config (camelCase keys)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Number of particles
    #[arg(short = 'n', long)]
    pub particles: Option<u32>,

    /// State texture width in texels
    #[arg(long)]
    pub width: Option<u32>,

    /// State texture height in texels
    #[arg(long)]
    pub height: Option<u32>,

    /// Draw the raw position texture over the scene
    #[arg(long)]
    pub show_texture: bool,

    /// Stop advancing the simulation
    #[arg(long)]
    pub no_ping_pong: bool,

    /// Integration timestep in seconds
    #[arg(long)]
    pub timestep: Option<f32>,
}

impl Args {
    /// Resolve the final, validated simulation config.
    pub fn into_config(self) -> Result<SimulationConfig> {
        let mut config = match &self.config {
            Some(path) => SimulationConfig::from_json_file(path)
                .with_context(|| format!("loading config from {}", path.display()))?,
            None => SimulationConfig::default(),
        };

        if let Some(count) = self.particles {
            config.particle_count = count;
            // Grow a square-ish texture unless the caller pinned its size.
            if self.width.is_none() && self.height.is_none() {
                let width = (count as f64).sqrt().ceil().max(1.0) as u32;
                config.texture_width = width;
                config.texture_height = count.div_ceil(width).max(1);
            }
        }
        if let Some(width) = self.width {
            config.texture_width = width;
        }
        if let Some(height) = self.height {
            config.texture_height = height;
        }
        if let Some(timestep) = self.timestep {
            config.timestep = timestep;
        }
        if self.show_texture {
            config.show_texture = true;
        }
        if self.no_ping_pong {
            config.ping_pong = false;
        }

        config.validate()?;
        Ok(config)
    }
}
