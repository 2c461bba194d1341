//! GPU-resident particle state
//!
//! Position and velocity live in two texture sets (A and B). Each set owns
//! a framebuffer with both textures attached, so one update draw writes a
//! whole set. The sets are held in a single [`PingPong`] so position and
//! velocity can only ever flip together.

use crate::backend::{GpuBackend, TextureHandle};
use crate::error::PipelineError;
use glam::Vec4;
use texflow_core::{BufferSlot, PingPong, Population};

/// One member of the ping-pong pair.
pub struct StateSet<B: GpuBackend> {
    pub position: B::Texture,
    pub velocity: B::Texture,
    /// Color attachment 0 = position, 1 = velocity.
    pub target: B::Framebuffer,
}

pub struct StateTextures<B: GpuBackend> {
    sets: PingPong<StateSet<B>>,
    /// Per-tick scratch written by collision and read by update.
    force: B::Texture,
    force_target: B::Framebuffer,
}

impl<B: GpuBackend> StateTextures<B> {
    pub fn allocate(backend: &mut B, population: &Population) -> Result<Self, PipelineError> {
        let extent = population.extent();
        let mut make_set = |name: &str| -> Result<StateSet<B>, PipelineError> {
            let position = backend.create_state_texture(&format!("Position {name}"), extent)?;
            let velocity = backend.create_state_texture(&format!("Velocity {name}"), extent)?;
            let target = backend
                .create_framebuffer(&format!("State Target {name}"), &[&position, &velocity])?;
            Ok(StateSet {
                position,
                velocity,
                target,
            })
        };
        let a = make_set("A")?;
        let b = make_set("B")?;

        let force = backend.create_state_texture("Force", extent)?;
        let force_target = backend.create_framebuffer("Force Target", &[&force])?;

        tracing::debug!(
            width = extent.width,
            height = extent.height,
            particles = population.count(),
            "allocated state textures"
        );

        Ok(Self {
            sets: PingPong::new(a, b),
            force,
            force_target,
        })
    }

    #[inline]
    pub fn current(&self) -> &StateSet<B> {
        self.sets.current()
    }

    #[inline]
    pub fn next(&self) -> &StateSet<B> {
        self.sets.next()
    }

    #[inline]
    pub fn current_slot(&self) -> BufferSlot {
        self.sets.current_slot()
    }

    /// `(current, next)`; the two never alias.
    #[inline]
    pub fn read_write(&self) -> (&StateSet<B>, &StateSet<B>) {
        self.sets.read_write()
    }

    /// Must only be called after the draw writing `next()` was submitted.
    pub fn flip(&mut self) -> BufferSlot {
        self.sets.flip()
    }

    pub fn force(&self) -> &B::Texture {
        &self.force
    }

    pub fn force_target(&self) -> &B::Framebuffer {
        &self.force_target
    }

    /// Upload state into the current set.
    pub fn seed(
        &self,
        backend: &mut B,
        positions: &[Vec4],
        velocities: &[Vec4],
    ) -> Result<(), PipelineError> {
        let current = self.current();
        backend.write_texture(&current.position, positions)?;
        backend.write_texture(&current.velocity, velocities)?;
        tracing::debug!(
            slot = ?self.current_slot(),
            texture = ?current.position.id(),
            "seeded current state"
        );
        Ok(())
    }
}
