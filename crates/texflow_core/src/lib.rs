//! Texflow Core
//!
//! Backend-agnostic data model for the texture-resident particle pipeline:
//! - Simulation configuration and output modes
//! - Population sizing and texel addressing
//! - Ping-pong state pairs
//! - Simulation clock and deterministic seeding

pub mod config;
pub mod ping_pong;
pub mod population;
pub mod seed;
pub mod time;

pub use glam;

pub use config::{ConfigError, OutputMode, SimulationConfig};
pub use ping_pong::{BufferSlot, PingPong};
pub use population::{Population, TextureExtent};
pub use seed::{DeterministicRng, SeedLayout};
pub use time::SimulationClock;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_is_set() {
        assert!(!VERSION.is_empty());
    }
}
