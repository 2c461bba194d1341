//! Collision/force pass
//!
//! Samples the current position and velocity and writes one force value per
//! particle texel into the force texture.

use crate::backend::{check_feedback, Bindings, GpuBackend, ProgramSlots, Target};
use crate::error::PipelineError;
use crate::programs::slots;
use crate::quad::FullScreenQuad;
use crate::state::StateTextures;
use texflow_core::Population;

pub fn execute<B: GpuBackend>(
    backend: &mut B,
    quad: &FullScreenQuad<B>,
    program: &B::Program,
    state: &StateTextures<B>,
    population: &Population,
) -> Result<(), PipelineError> {
    let current = state.current();
    let bindings = Bindings::new()
        .sampler(slots::POS_TEX, &current.position)
        .sampler(slots::VEL_TEX, &current.velocity)
        .uint(slots::PARTICLE_COUNT, population.count());
    let target = Target::Offscreen(state.force_target());

    check_feedback(program.label(), &bindings, &target)?;
    quad.draw(backend, program, target, &bindings)
}
