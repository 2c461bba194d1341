//! CPU kernels for the software backend
//!
//! A [`TexelKernel`] is the fragment stage: it runs once per covered texel
//! and writes one value per color attachment. A [`VertexKernel`] is the
//! point stage: it maps one vertex to a clip-space position.

use crate::programs::slots;
use glam::{Mat4, UVec2, Vec2, Vec4};
use texflow_core::TextureExtent;

/// Read access to one bound texture.
#[derive(Clone, Copy)]
pub struct SampledTexture<'a> {
    pub extent: TextureExtent,
    pub texels: &'a [Vec4],
}

impl SampledTexture<'_> {
    /// Texel fetch; out-of-range reads return zero.
    pub fn fetch(&self, texel: UVec2) -> Vec4 {
        if !self.extent.contains(texel) {
            return Vec4::ZERO;
        }
        self.texels[self.extent.linear(texel)]
    }

    /// Nearest-texel lookup at a normalized coordinate.
    pub fn sample(&self, uv: Vec2) -> Vec4 {
        let size = Vec2::new(self.extent.width as f32, self.extent.height as f32);
        let texel = (uv * size).floor().max(Vec2::ZERO).as_uvec2();
        let clamped = texel.min(UVec2::new(self.extent.width - 1, self.extent.height - 1));
        self.fetch(clamped)
    }
}

/// Uniform state visible to a kernel invocation.
pub struct KernelInputs<'a> {
    pub(crate) samplers: Vec<(&'static str, SampledTexture<'a>)>,
    pub(crate) matrices: Vec<(&'static str, Mat4)>,
    pub(crate) scalars: Vec<(&'static str, f32)>,
    pub(crate) uints: Vec<(&'static str, u32)>,
}

impl<'a> KernelInputs<'a> {
    pub fn texture(&self, slot: &str) -> Option<SampledTexture<'a>> {
        self.samplers
            .iter()
            .find(|(name, _)| *name == slot)
            .map(|(_, texture)| *texture)
    }

    /// Unbound scalars read as zero.
    pub fn scalar(&self, slot: &str) -> f32 {
        self.scalars
            .iter()
            .find(|(name, _)| *name == slot)
            .map(|(_, value)| *value)
            .unwrap_or(0.0)
    }

    /// Unbound integers read as zero.
    pub fn uint(&self, slot: &str) -> u32 {
        self.uints
            .iter()
            .find(|(name, _)| *name == slot)
            .map(|(_, value)| *value)
            .unwrap_or(0)
    }

    /// Unbound matrices read as identity.
    pub fn matrix(&self, slot: &str) -> Mat4 {
        self.matrices
            .iter()
            .find(|(name, _)| *name == slot)
            .map(|(_, value)| *value)
            .unwrap_or(Mat4::IDENTITY)
    }
}

/// One fragment invocation.
pub struct TexelContext<'a> {
    pub texel: UVec2,
    /// Extent of the render target.
    pub extent: TextureExtent,
    pub inputs: &'a KernelInputs<'a>,
}

impl TexelContext<'_> {
    pub fn uv(&self) -> Vec2 {
        (self.texel.as_vec2() + Vec2::splat(0.5))
            / Vec2::new(self.extent.width as f32, self.extent.height as f32)
    }

    /// Sample `slot` at this fragment's UV. Unbound slots read zero.
    pub fn sample(&self, slot: &str) -> Vec4 {
        self.inputs
            .texture(slot)
            .map(|texture| texture.sample(self.uv()))
            .unwrap_or(Vec4::ZERO)
    }

    pub fn fetch(&self, slot: &str, texel: UVec2) -> Vec4 {
        self.inputs
            .texture(slot)
            .map(|texture| texture.fetch(texel))
            .unwrap_or(Vec4::ZERO)
    }

    pub fn scalar(&self, slot: &str) -> f32 {
        self.inputs.scalar(slot)
    }

    pub fn uint(&self, slot: &str) -> u32 {
        self.inputs.uint(slot)
    }
}

/// One vertex invocation.
pub struct VertexContext<'a> {
    pub index: u32,
    pub(crate) attributes: Vec<(&'static str, Vec4)>,
    pub inputs: &'a KernelInputs<'a>,
}

impl VertexContext<'_> {
    /// Attribute value padded with zeros to four components.
    pub fn attribute(&self, slot: &str) -> Vec4 {
        self.attributes
            .iter()
            .find(|(name, _)| *name == slot)
            .map(|(_, value)| *value)
            .unwrap_or(Vec4::ZERO)
    }

    pub fn sample(&self, slot: &str, uv: Vec2) -> Vec4 {
        self.inputs
            .texture(slot)
            .map(|texture| texture.sample(uv))
            .unwrap_or(Vec4::ZERO)
    }
}

pub trait TexelKernel: Send + Sync {
    /// Color outputs written per invocation; must match the target's attachments.
    fn outputs(&self) -> usize {
        1
    }

    fn shade(&self, ctx: &TexelContext<'_>, out: &mut [Vec4]);
}

pub trait VertexKernel: Send + Sync {
    /// Clip-space position of the vertex.
    fn transform(&self, ctx: &VertexContext<'_>) -> Vec4;
}

// ============================================================================
// Built-in kernels
// ============================================================================

/// Same force for every particle.
pub struct ConstantForce(pub Vec4);

impl TexelKernel for ConstantForce {
    fn shade(&self, _ctx: &TexelContext<'_>, out: &mut [Vec4]) {
        out[0] = self.0;
    }
}

/// Softened inverse-square repulsion between all particle pairs, a linear
/// pull toward the origin, and linear velocity damping.
pub struct PairwiseRepulsion {
    pub strength: f32,
    pub softening: f32,
    pub centering: f32,
    pub damping: f32,
}

impl Default for PairwiseRepulsion {
    fn default() -> Self {
        Self {
            strength: 0.002,
            softening: 0.05,
            centering: 0.5,
            damping: 0.1,
        }
    }
}

impl TexelKernel for PairwiseRepulsion {
    fn shade(&self, ctx: &TexelContext<'_>, out: &mut [Vec4]) {
        let count = ctx.uint(slots::PARTICLE_COUNT);
        let width = ctx.extent.width;
        let own = ctx.extent.linear(ctx.texel);
        if own >= count as usize {
            out[0] = Vec4::ZERO;
            return;
        }

        let p = ctx.fetch(slots::POS_TEX, ctx.texel).truncate();
        let mut force = -self.centering * p;
        for other in (0..count).filter(|&i| i as usize != own) {
            let q = ctx
                .fetch(slots::POS_TEX, UVec2::new(other % width, other / width))
                .truncate();
            let d = p - q;
            let r2 = d.length_squared() + self.softening;
            force += self.strength * d / (r2 * r2.sqrt());
        }
        force -= self.damping * ctx.fetch(slots::VEL_TEX, ctx.texel).truncate();
        out[0] = force.extend(0.0);
    }
}

/// Semi-implicit Euler: `v' = v + f·dt`, `p' = p + v'·dt`.
///
/// Output 0 is position, output 1 is velocity. The `w` channels pass through.
pub struct EulerIntegrator;

impl TexelKernel for EulerIntegrator {
    fn outputs(&self) -> usize {
        2
    }

    fn shade(&self, ctx: &TexelContext<'_>, out: &mut [Vec4]) {
        let dt = ctx.scalar(slots::TIMESTEP);
        let position = ctx.fetch(slots::POS_TEX, ctx.texel);
        let velocity = ctx.fetch(slots::VEL_TEX, ctx.texel);
        let force = ctx.fetch(slots::FORCE_TEX, ctx.texel);

        let v = velocity.truncate() + force.truncate() * dt;
        let p = position.truncate() + v * dt;
        out[0] = p.extend(position.w);
        out[1] = v.extend(velocity.w);
    }
}

/// Looks up the particle position through its UV and applies the camera.
pub struct ParticleTransform;

impl VertexKernel for ParticleTransform {
    fn transform(&self, ctx: &VertexContext<'_>) -> Vec4 {
        let uv = ctx.attribute(slots::UV);
        let position = ctx.sample(slots::POS_TEX, Vec2::new(uv.x, uv.y));
        ctx.inputs.matrix(slots::CAMERA_MAT) * position.truncate().extend(1.0)
    }
}

/// Copies the raw position texture to the output.
pub struct ShowTexture;

impl TexelKernel for ShowTexture {
    fn shade(&self, ctx: &TexelContext<'_>, out: &mut [Vec4]) {
        out[0] = ctx.sample(slots::POS_TEX);
    }
}
