//! Rendering backend abstraction
//!
//! Passes describe *what* to draw (program, target, bound slots, geometry)
//! and a [`GpuBackend`] decides how to issue it. Two backends exist:
//! wgpu for real devices and a software reference used for testing.

use crate::error::PipelineError;
use glam::{Mat4, Vec4};
use texflow_core::TextureExtent;

/// Rendering backend type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendType {
    /// Vulkan (cross-platform)
    Vulkan,
    /// Metal (macOS, iOS)
    Metal,
    /// DirectX 12 (Windows)
    DirectX12,
    /// OpenGL (cross-platform, fallback)
    OpenGL,
    /// WebGPU (web)
    WebGpu,
    /// CPU reference implementation
    Software,
}

/// Backend-assigned identity of a state texture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TextureId(pub u32);

pub trait TextureHandle {
    fn id(&self) -> TextureId;
    fn extent(&self) -> TextureExtent;
}

/// An off-screen render target with one or more color attachments.
pub trait FramebufferHandle {
    fn label(&self) -> &str;
    fn attachments(&self) -> &[TextureId];
    fn extent(&self) -> TextureExtent;
}

/// Named attribute and uniform slots exposed by a linked program.
pub trait ProgramSlots {
    fn label(&self) -> &str;
    fn has_attribute(&self, name: &str) -> bool;
    fn has_uniform(&self, name: &str) -> bool;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Topology {
    TriangleStrip,
    Points,
}

/// Load behaviour of the visible framebuffer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScreenOps {
    /// Clear color and depth before drawing, or keep prior contents.
    pub clear: Option<[f32; 4]>,
}

impl ScreenOps {
    pub fn clear(color: [f32; 4]) -> Self {
        Self { clear: Some(color) }
    }

    pub fn load() -> Self {
        Self { clear: None }
    }
}

pub enum Target<'a, F> {
    /// The visible framebuffer of the current frame.
    Screen(ScreenOps),
    Offscreen(&'a F),
}

impl<F: FramebufferHandle> Target<'_, F> {
    /// Textures written by a draw into this target.
    pub fn writes(&self) -> &[TextureId] {
        match self {
            Target::Screen(_) => &[],
            Target::Offscreen(framebuffer) => framebuffer.attachments(),
        }
    }
}

/// Textures and uniform values bound to named program slots for one draw.
pub struct Bindings<'a, T> {
    samplers: Vec<(&'static str, &'a T)>,
    matrices: Vec<(&'static str, Mat4)>,
    scalars: Vec<(&'static str, f32)>,
    uints: Vec<(&'static str, u32)>,
}

impl<T> Default for Bindings<'_, T> {
    fn default() -> Self {
        Self {
            samplers: Vec::new(),
            matrices: Vec::new(),
            scalars: Vec::new(),
            uints: Vec::new(),
        }
    }
}

impl<'a, T> Bindings<'a, T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sampler(mut self, slot: &'static str, texture: &'a T) -> Self {
        self.samplers.push((slot, texture));
        self
    }

    pub fn matrix(mut self, slot: &'static str, value: Mat4) -> Self {
        self.matrices.push((slot, value));
        self
    }

    pub fn scalar(mut self, slot: &'static str, value: f32) -> Self {
        self.scalars.push((slot, value));
        self
    }

    /// Integer uniform, for counts that must stay exact past 2^24.
    pub fn uint(mut self, slot: &'static str, value: u32) -> Self {
        self.uints.push((slot, value));
        self
    }

    pub fn texture(&self, slot: &str) -> Option<&'a T> {
        self.samplers
            .iter()
            .find(|(name, _)| *name == slot)
            .map(|(_, texture)| *texture)
    }

    pub fn samplers(&self) -> impl Iterator<Item = (&'static str, &'a T)> + '_ {
        self.samplers.iter().map(|(name, texture)| (*name, *texture))
    }

    pub fn matrices(&self) -> impl Iterator<Item = (&'static str, Mat4)> + '_ {
        self.matrices.iter().copied()
    }

    pub fn scalars(&self) -> impl Iterator<Item = (&'static str, f32)> + '_ {
        self.scalars.iter().copied()
    }

    pub fn uints(&self) -> impl Iterator<Item = (&'static str, u32)> + '_ {
        self.uints.iter().copied()
    }

    pub fn matrix_value(&self, slot: &str) -> Option<Mat4> {
        self.matrices
            .iter()
            .find(|(name, _)| *name == slot)
            .map(|(_, value)| *value)
    }

    pub fn scalar_value(&self, slot: &str) -> Option<f32> {
        self.scalars
            .iter()
            .find(|(name, _)| *name == slot)
            .map(|(_, value)| *value)
    }

    pub fn uint_value(&self, slot: &str) -> Option<u32> {
        self.uints
            .iter()
            .find(|(name, _)| *name == slot)
            .map(|(_, value)| *value)
    }
}

/// Geometry for one draw: vertex buffers bound to attribute slots.
pub struct DrawCall<'a, V> {
    pub attributes: Vec<(&'static str, &'a V)>,
    pub topology: Topology,
    pub vertex_count: u32,
}

impl<'a, V> DrawCall<'a, V> {
    pub fn new(topology: Topology, vertex_count: u32) -> Self {
        Self {
            attributes: Vec::new(),
            topology,
            vertex_count,
        }
    }

    pub fn attribute(mut self, slot: &'static str, buffer: &'a V) -> Self {
        self.attributes.push((slot, buffer));
        self
    }

    pub fn buffer(&self, slot: &str) -> Option<&'a V> {
        self.attributes
            .iter()
            .find(|(name, _)| *name == slot)
            .map(|(_, buffer)| *buffer)
    }
}

/// A device able to run the particle pipeline.
///
/// All submissions go to a single command stream in call order. That order
/// is the only synchronization the pipeline relies on.
pub trait GpuBackend {
    type Texture: TextureHandle;
    type Framebuffer: FramebufferHandle;
    type VertexBuffer;
    type Program: ProgramSlots;

    fn backend_type(&self) -> BackendType;

    /// Allocate a floating-point RGBA texture usable as sampler and render target.
    fn create_state_texture(
        &mut self,
        label: &str,
        extent: TextureExtent,
    ) -> Result<Self::Texture, PipelineError>;

    /// Off-screen target whose color attachments are `attachments`, in order.
    fn create_framebuffer(
        &mut self,
        label: &str,
        attachments: &[&Self::Texture],
    ) -> Result<Self::Framebuffer, PipelineError>;

    /// Static vertex data with `components` floats per vertex.
    fn create_vertex_buffer(
        &mut self,
        label: &str,
        data: &[f32],
        components: u32,
    ) -> Result<Self::VertexBuffer, PipelineError>;

    /// Upload one texel per entry in raster order.
    fn write_texture(
        &mut self,
        texture: &Self::Texture,
        texels: &[Vec4],
    ) -> Result<(), PipelineError>;

    /// Blocking readback in raster order.
    fn read_texture(&mut self, texture: &Self::Texture) -> Result<Vec<Vec4>, PipelineError>;

    /// Acquire the visible framebuffer for this tick.
    fn begin_frame(&mut self) -> Result<(), PipelineError>;

    fn submit(
        &mut self,
        program: &Self::Program,
        target: Target<'_, Self::Framebuffer>,
        bindings: &Bindings<'_, Self::Texture>,
        draw: &DrawCall<'_, Self::VertexBuffer>,
    ) -> Result<(), PipelineError>;

    /// Present the visible framebuffer.
    fn end_frame(&mut self) -> Result<(), PipelineError>;
}

/// Reject a draw that samples any texture attached to its own target.
pub fn check_feedback<T: TextureHandle, F: FramebufferHandle>(
    program: &str,
    bindings: &Bindings<'_, T>,
    target: &Target<'_, F>,
) -> Result<(), PipelineError> {
    let writes = target.writes();
    for (_, texture) in bindings.samplers() {
        if writes.contains(&texture.id()) {
            return Err(PipelineError::FeedbackLoop {
                program: program.to_string(),
                texture: texture.id(),
            });
        }
    }
    Ok(())
}

/// Completeness rules shared by every backend's framebuffers.
///
/// Returns the common extent of the attachments.
pub fn validate_attachments<T: TextureHandle>(
    label: &str,
    attachments: &[&T],
) -> Result<TextureExtent, PipelineError> {
    let incomplete = |reason: String| PipelineError::IncompleteFramebuffer {
        label: label.to_string(),
        reason,
    };

    let first = attachments
        .first()
        .ok_or_else(|| incomplete("no color attachments".to_string()))?;
    let extent = first.extent();

    for (i, texture) in attachments.iter().enumerate() {
        if texture.extent() != extent {
            return Err(incomplete(format!(
                "attachment {i} is {}x{}, expected {}x{}",
                texture.extent().width,
                texture.extent().height,
                extent.width,
                extent.height
            )));
        }
        if attachments[..i].iter().any(|t| t.id() == texture.id()) {
            return Err(incomplete(format!(
                "texture {:?} attached twice",
                texture.id()
            )));
        }
    }
    Ok(extent)
}
