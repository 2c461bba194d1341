//! Simulation configuration
//!
//! Loaded from JSON with camelCase keys, e.g.
//! `{ "pingPong": true, "showTexture": false, "particleCount": 64 }`.
//! Missing keys fall back to the defaults below.

use crate::population::{Population, TextureExtent};
use crate::seed::SeedLayout;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("state texture extent {width}x{height} has no texels")]
    EmptyExtent { width: u32, height: u32 },

    #[error("particle population must contain at least one particle")]
    EmptyPopulation,

    #[error("{count} particles do not fit in a {width}x{height} state texture")]
    PopulationExceedsCapacity { count: u32, width: u32, height: u32 },

    #[error("timestep must be finite and positive, got {0}")]
    InvalidTimestep(f32),

    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Which of the update pass's output actions run each tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// Integrate into the next buffers and flip.
    Advance,
    /// Draw the raw current position texture to the screen only.
    Inspect,
    /// Both of the above.
    AdvanceAndInspect,
    /// Neither flag set. The scene is drawn but never advances.
    Paused,
}

impl OutputMode {
    pub fn advances(self) -> bool {
        matches!(self, OutputMode::Advance | OutputMode::AdvanceAndInspect)
    }

    pub fn inspects(self) -> bool {
        matches!(self, OutputMode::Inspect | OutputMode::AdvanceAndInspect)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SimulationConfig {
    /// Advance the simulation through the double buffers each tick.
    pub ping_pong: bool,
    /// Draw the raw position texture to the screen for debugging.
    pub show_texture: bool,
    /// Fixed integration timestep in seconds.
    pub timestep: f32,
    pub particle_count: u32,
    pub texture_width: u32,
    pub texture_height: u32,
    /// Clear color of the visible framebuffer (RGBA).
    pub clear_color: [f32; 4],
    pub seed: u64,
    pub layout: SeedLayout,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            ping_pong: true,
            show_texture: false,
            timestep: 1.0 / 60.0,
            particle_count: 64,
            texture_width: 8,
            texture_height: 8,
            clear_color: [0.5, 0.5, 0.5, 0.9],
            seed: 0x5eed,
            layout: SeedLayout::Cloud,
        }
    }
}

impl SimulationConfig {
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        let config = Self::from_json_str(&text)?;
        tracing::debug!(path = %path.display(), ?config, "loaded simulation config");
        Ok(config)
    }

    pub fn extent(&self) -> TextureExtent {
        TextureExtent::new(self.texture_width, self.texture_height)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let extent = self.extent();
        if extent.capacity() == 0 {
            return Err(ConfigError::EmptyExtent {
                width: extent.width,
                height: extent.height,
            });
        }
        if self.particle_count == 0 {
            return Err(ConfigError::EmptyPopulation);
        }
        if u64::from(self.particle_count) > extent.capacity() {
            return Err(ConfigError::PopulationExceedsCapacity {
                count: self.particle_count,
                width: extent.width,
                height: extent.height,
            });
        }
        if !self.timestep.is_finite() || self.timestep <= 0.0 {
            return Err(ConfigError::InvalidTimestep(self.timestep));
        }
        Ok(())
    }

    /// Validated population described by this config.
    pub fn population(&self) -> Result<Population, ConfigError> {
        self.validate()?;
        Population::new(self.particle_count, self.extent())
    }

    pub fn output_mode(&self) -> OutputMode {
        match (self.ping_pong, self.show_texture) {
            (true, false) => OutputMode::Advance,
            (false, true) => OutputMode::Inspect,
            (true, true) => OutputMode::AdvanceAndInspect,
            (false, false) => OutputMode::Paused,
        }
    }
}
