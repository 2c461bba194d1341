//! Full-screen quad
//!
//! Four vertices forming a triangle strip over clip space `[-1, 1]²`.
//! Drawing it into a state-sized target runs the bound fragment program
//! once per texel, which is how every simulation kernel executes.

use crate::backend::{Bindings, DrawCall, GpuBackend, Target, Topology};
use crate::error::PipelineError;
use crate::programs::slots;

/// Strip order: bottom-left, bottom-right, top-left, top-right.
pub const QUAD_VERTICES: [[f32; 3]; 4] = [
    [-1.0, -1.0, 0.0],
    [1.0, -1.0, 0.0],
    [-1.0, 1.0, 0.0],
    [1.0, 1.0, 0.0],
];

/// Quad geometry uploaded once during driver initialization.
pub struct FullScreenQuad<B: GpuBackend> {
    vertices: B::VertexBuffer,
}

impl<B: GpuBackend> FullScreenQuad<B> {
    pub fn new(backend: &mut B) -> Result<Self, PipelineError> {
        let data: Vec<f32> = QUAD_VERTICES.iter().flatten().copied().collect();
        let vertices = backend.create_vertex_buffer("Full-Screen Quad", &data, 3)?;
        Ok(Self { vertices })
    }

    /// Bind the quad to the program's `position` attribute and draw it.
    pub fn draw(
        &self,
        backend: &mut B,
        program: &B::Program,
        target: Target<'_, B::Framebuffer>,
        bindings: &Bindings<'_, B::Texture>,
    ) -> Result<(), PipelineError> {
        let draw = DrawCall::new(Topology::TriangleStrip, QUAD_VERTICES.len() as u32)
            .attribute(slots::POSITION, &self.vertices);
        backend.submit(program, target, bindings, &draw)
    }
}
