//! Texflow Render
//!
//! GPU-resident particle pipeline. Particle state lives in floating-point
//! textures and every tick runs as a handful of draws:
//!
//! - [`state`]: ping-pong position/velocity sets plus the force scratch
//! - [`quad`]: the full-screen quad every simulation kernel is drawn with
//! - [`passes`]: collision, update and render
//! - [`driver`]: per-tick orchestration and readiness
//!
//! Draws go through the [`GpuBackend`] trait. [`wgpu_backend`] targets real
//! devices; [`software`] is a CPU reference with an inspectable command log.

pub mod backend;
pub mod driver;
pub mod error;
pub mod passes;
pub mod programs;
pub mod quad;
pub mod software;
pub mod state;
pub mod wgpu_backend;
pub mod window;

pub use wgpu;
pub use winit;

pub use backend::{BackendType, GpuBackend};
pub use driver::{DriverState, FrameDriver, FrameSummary, TickCounters, TickOutcome};
pub use error::PipelineError;
pub use programs::ProgramSet;
pub use software::SoftwareBackend;
pub use wgpu_backend::WgpuBackend;
