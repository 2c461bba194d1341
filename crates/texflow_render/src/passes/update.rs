//! Update pass
//!
//! Two independent output actions, each gated by its own config flag:
//! - [`advance`] integrates the current state plus force into the next
//!   set and flips the pair.
//! - [`show_texture`] draws the raw current position texture to the screen
//!   without touching simulation state.

use crate::backend::{check_feedback, Bindings, GpuBackend, ProgramSlots, ScreenOps, Target};
use crate::error::PipelineError;
use crate::programs::slots;
use crate::quad::FullScreenQuad;
use crate::state::StateTextures;
use texflow_core::BufferSlot;

/// Write the next state set, then flip. Returns the new current slot.
pub fn advance<B: GpuBackend>(
    backend: &mut B,
    quad: &FullScreenQuad<B>,
    program: &B::Program,
    state: &mut StateTextures<B>,
    timestep: f32,
) -> Result<BufferSlot, PipelineError> {
    {
        let (current, next) = state.read_write();
        let bindings = Bindings::new()
            .sampler(slots::POS_TEX, &current.position)
            .sampler(slots::VEL_TEX, &current.velocity)
            .sampler(slots::FORCE_TEX, state.force())
            .scalar(slots::TIMESTEP, timestep);
        let target = Target::Offscreen(&next.target);

        check_feedback(program.label(), &bindings, &target)?;
        quad.draw(backend, program, target, &bindings)?;
    }

    // The draw above is already on the command stream, so the flip cannot
    // race it.
    let slot = state.flip();
    tracing::trace!(current = ?slot, "flipped state buffers");
    Ok(slot)
}

/// Overlay the raw current position texture on the visible framebuffer.
pub fn show_texture<B: GpuBackend>(
    backend: &mut B,
    quad: &FullScreenQuad<B>,
    program: &B::Program,
    state: &StateTextures<B>,
) -> Result<(), PipelineError> {
    let bindings = Bindings::new().sampler(slots::POS_TEX, &state.current().position);
    quad.draw(backend, program, Target::Screen(ScreenOps::load()), &bindings)
}
