//! Render pass
//!
//! One point per particle. The vertex stage looks up each particle's
//! position in the current position texture through its UV attribute.

use crate::backend::{Bindings, DrawCall, GpuBackend, ScreenOps, Target, Topology};
use crate::error::PipelineError;
use crate::programs::slots;
use crate::state::StateTextures;
use glam::Mat4;
use texflow_core::Population;

pub fn execute<B: GpuBackend>(
    backend: &mut B,
    program: &B::Program,
    state: &StateTextures<B>,
    uv_buffer: &B::VertexBuffer,
    population: &Population,
    camera: &Mat4,
    clear_color: [f32; 4],
) -> Result<(), PipelineError> {
    let bindings = Bindings::new()
        .matrix(slots::CAMERA_MAT, *camera)
        .sampler(slots::POS_TEX, &state.current().position);
    let draw = DrawCall::new(Topology::Points, population.count()).attribute(slots::UV, uv_buffer);

    backend.submit(
        program,
        Target::Screen(ScreenOps::clear(clear_color)),
        &bindings,
        &draw,
    )
}
