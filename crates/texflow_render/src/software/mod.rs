//! Software rasterizer backend
//!
//! A CPU reference implementation of [`GpuBackend`]. Textures are plain
//! `Vec<Vec4>` storage and programs carry Rust kernels instead of shaders.
//! Every submission is recorded so pipeline mechanics (what was read, what
//! was written, how many vertices were drawn) can be checked without a GPU.

pub mod kernels;

use crate::backend::{
    check_feedback, validate_attachments, BackendType, Bindings, DrawCall, FramebufferHandle,
    GpuBackend, ProgramSlots, Target, TextureHandle, TextureId, Topology,
};
use crate::error::PipelineError;
use crate::programs::{self, ProgramSet, RoleSlots};
use glam::{UVec2, Vec2, Vec4};
use kernels::{
    EulerIntegrator, KernelInputs, ParticleTransform, SampledTexture, ShowTexture, TexelContext,
    TexelKernel, VertexContext, VertexKernel,
};
use std::sync::Arc;
use texflow_core::TextureExtent;

/// Default size of the simulated visible framebuffer.
pub const DEFAULT_SCREEN: TextureExtent = TextureExtent::new(64, 64);

#[derive(Debug)]
pub struct SoftTexture {
    id: TextureId,
    extent: TextureExtent,
}

impl TextureHandle for SoftTexture {
    fn id(&self) -> TextureId {
        self.id
    }

    fn extent(&self) -> TextureExtent {
        self.extent
    }
}

#[derive(Debug)]
pub struct SoftFramebuffer {
    label: String,
    attachments: Vec<TextureId>,
    extent: TextureExtent,
}

impl FramebufferHandle for SoftFramebuffer {
    fn label(&self) -> &str {
        &self.label
    }

    fn attachments(&self) -> &[TextureId] {
        &self.attachments
    }

    fn extent(&self) -> TextureExtent {
        self.extent
    }
}

#[derive(Debug)]
pub struct SoftVertexBuffer {
    index: usize,
    components: u32,
    vertices: u32,
}

#[derive(Clone)]
pub enum ProgramStage {
    /// Runs per covered texel of a full-screen draw.
    Fragment(Arc<dyn TexelKernel>),
    /// Runs per vertex of a point draw.
    Points(Arc<dyn VertexKernel>),
}

#[derive(Clone)]
pub struct SoftProgram {
    label: String,
    attributes: Vec<&'static str>,
    uniforms: Vec<&'static str>,
    stage: ProgramStage,
}

impl SoftProgram {
    /// Program with no slots. Add them with [`with_attribute`](Self::with_attribute)
    /// and [`with_uniform`](Self::with_uniform).
    pub fn new(label: impl Into<String>, stage: ProgramStage) -> Self {
        Self {
            label: label.into(),
            attributes: Vec::new(),
            uniforms: Vec::new(),
            stage,
        }
    }

    /// Program exposing exactly the slots a role requires.
    pub fn for_role(role: &RoleSlots, stage: ProgramStage) -> Self {
        Self {
            label: role.role.to_string(),
            attributes: role.attributes.to_vec(),
            uniforms: role.uniforms.to_vec(),
            stage,
        }
    }

    pub fn with_attribute(mut self, slot: &'static str) -> Self {
        self.attributes.push(slot);
        self
    }

    pub fn with_uniform(mut self, slot: &'static str) -> Self {
        self.uniforms.push(slot);
        self
    }

    pub fn collision(kernel: impl TexelKernel + 'static) -> Self {
        Self::for_role(&programs::COLLISION, ProgramStage::Fragment(Arc::new(kernel)))
    }

    pub fn update(kernel: impl TexelKernel + 'static) -> Self {
        Self::for_role(&programs::UPDATE, ProgramStage::Fragment(Arc::new(kernel)))
    }

    pub fn particle() -> Self {
        Self::for_role(&programs::PARTICLE, ProgramStage::Points(Arc::new(ParticleTransform)))
    }

    pub fn display() -> Self {
        Self::for_role(&programs::DISPLAY, ProgramStage::Fragment(Arc::new(ShowTexture)))
    }
}

impl ProgramSlots for SoftProgram {
    fn label(&self) -> &str {
        &self.label
    }

    fn has_attribute(&self, name: &str) -> bool {
        self.attributes.contains(&name)
    }

    fn has_uniform(&self, name: &str) -> bool {
        self.uniforms.contains(&name)
    }
}

/// Full program set driven by `force`, integrating with [`EulerIntegrator`].
pub fn reference_programs(force: impl TexelKernel + 'static) -> ProgramSet<SoftProgram> {
    ProgramSet {
        collision: SoftProgram::collision(force),
        update: SoftProgram::update(EulerIntegrator),
        particle: SoftProgram::particle(),
        display: Some(SoftProgram::display()),
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RecordedTarget {
    Screen { cleared: bool },
    Offscreen(String),
}

/// One submitted draw.
#[derive(Debug, Clone, PartialEq)]
pub struct SubmitRecord {
    /// Frame the draw belonged to; zero outside any frame.
    pub frame: u64,
    pub program: String,
    pub target: RecordedTarget,
    pub topology: Topology,
    pub vertex_count: u32,
    pub reads: Vec<TextureId>,
    pub writes: Vec<TextureId>,
}

/// Contents of the simulated visible framebuffer.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScreenFrame {
    pub clear_color: Option<[f32; 4]>,
    pub depth_cleared: bool,
    /// Clip-space positions of every point drawn since the last clear.
    pub points: Vec<Vec4>,
    /// Last full-screen image drawn, in raster order.
    pub image: Option<Vec<Vec4>>,
    pub draws: u32,
}

struct TextureData {
    label: String,
    extent: TextureExtent,
    texels: Vec<Vec4>,
}

pub struct SoftwareBackend {
    textures: Vec<TextureData>,
    vertex_buffers: Vec<Vec<f32>>,
    screen_extent: TextureExtent,
    frame: Option<ScreenFrame>,
    last_frame: Option<ScreenFrame>,
    frames_begun: u64,
    frames_presented: u64,
    log: Vec<SubmitRecord>,
}

impl Default for SoftwareBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl SoftwareBackend {
    pub fn new() -> Self {
        Self::with_screen(DEFAULT_SCREEN)
    }

    pub fn with_screen(screen_extent: TextureExtent) -> Self {
        Self {
            textures: Vec::new(),
            vertex_buffers: Vec::new(),
            screen_extent,
            frame: None,
            last_frame: None,
            frames_begun: 0,
            frames_presented: 0,
            log: Vec::new(),
        }
    }

    /// Every submission since creation or the last [`clear_log`](Self::clear_log).
    pub fn log(&self) -> &[SubmitRecord] {
        &self.log
    }

    pub fn clear_log(&mut self) {
        self.log.clear();
    }

    pub fn last_frame(&self) -> Option<&ScreenFrame> {
        self.last_frame.as_ref()
    }

    pub fn frames_presented(&self) -> u64 {
        self.frames_presented
    }

    pub fn texture_label(&self, id: TextureId) -> Option<&str> {
        self.textures.get(id.0 as usize).map(|t| t.label.as_str())
    }

    /// Direct view of a texture's storage.
    pub fn texels(&self, texture: &SoftTexture) -> &[Vec4] {
        &self.textures[texture.id.0 as usize].texels
    }

    fn texture_data(&self, id: TextureId) -> Result<&TextureData, PipelineError> {
        self.textures
            .get(id.0 as usize)
            .ok_or(PipelineError::UnknownResource {
                kind: "texture",
                id: id.0,
            })
    }

    fn vertex_data(&self, buffer: &SoftVertexBuffer) -> Result<&[f32], PipelineError> {
        self.vertex_buffers
            .get(buffer.index)
            .map(Vec::as_slice)
            .ok_or(PipelineError::UnknownResource {
                kind: "vertex buffer",
                id: buffer.index as u32,
            })
    }

    /// Clip-space bounds of a triangle-strip draw, as `(min, max)`.
    fn strip_bounds(
        &self,
        draw: &DrawCall<'_, SoftVertexBuffer>,
    ) -> Result<(Vec2, Vec2), PipelineError> {
        let buffer = draw
            .buffer(programs::slots::POSITION)
            .ok_or_else(|| PipelineError::Device("strip draw without a position".into()))?;
        let data = self.vertex_data(buffer)?;
        let stride = buffer.components as usize;
        let mut min = Vec2::splat(f32::INFINITY);
        let mut max = Vec2::splat(f32::NEG_INFINITY);
        for vertex in data.chunks(stride).take(draw.vertex_count as usize) {
            let p = Vec2::new(vertex[0], vertex.get(1).copied().unwrap_or(0.0));
            min = min.min(p);
            max = max.max(p);
        }
        Ok((min, max))
    }

    fn kernel_inputs<'s>(
        &'s self,
        bindings: &Bindings<'_, SoftTexture>,
    ) -> Result<KernelInputs<'s>, PipelineError> {
        let mut samplers = Vec::new();
        for (slot, texture) in bindings.samplers() {
            let data = self.texture_data(texture.id)?;
            samplers.push((
                slot,
                SampledTexture {
                    extent: data.extent,
                    texels: &data.texels,
                },
            ));
        }
        Ok(KernelInputs {
            samplers,
            matrices: bindings.matrices().collect(),
            scalars: bindings.scalars().collect(),
            uints: bindings.uints().collect(),
        })
    }

    /// Shade every texel of `extent` whose center lies inside `bounds`.
    ///
    /// Uncovered texels keep `previous` contents (one vector per output).
    fn rasterize(
        &self,
        kernel: &dyn TexelKernel,
        inputs: &KernelInputs<'_>,
        extent: TextureExtent,
        bounds: (Vec2, Vec2),
        mut outputs: Vec<Vec<Vec4>>,
    ) -> Vec<Vec<Vec4>> {
        let size = Vec2::new(extent.width as f32, extent.height as f32);
        let mut values = vec![Vec4::ZERO; outputs.len()];
        for y in 0..extent.height {
            for x in 0..extent.width {
                let texel = UVec2::new(x, y);
                let ndc = (texel.as_vec2() + Vec2::splat(0.5)) / size * 2.0 - Vec2::ONE;
                if ndc.cmplt(bounds.0).any() || ndc.cmpgt(bounds.1).any() {
                    continue;
                }
                let ctx = TexelContext {
                    texel,
                    extent,
                    inputs,
                };
                kernel.shade(&ctx, &mut values);
                let index = extent.linear(texel);
                for (output, value) in outputs.iter_mut().zip(&values) {
                    output[index] = *value;
                }
            }
        }
        outputs
    }

    fn submit_fragment(
        &mut self,
        program: &SoftProgram,
        kernel: &dyn TexelKernel,
        target: &Target<'_, SoftFramebuffer>,
        bindings: &Bindings<'_, SoftTexture>,
        draw: &DrawCall<'_, SoftVertexBuffer>,
    ) -> Result<(), PipelineError> {
        if draw.topology != Topology::TriangleStrip {
            return Err(PipelineError::Device(format!(
                "fragment program '{}' drawn with {:?}",
                program.label, draw.topology
            )));
        }
        let bounds = self.strip_bounds(draw)?;

        match target {
            Target::Offscreen(framebuffer) => {
                if framebuffer.attachments.len() != kernel.outputs() {
                    return Err(PipelineError::IncompleteFramebuffer {
                        label: framebuffer.label.clone(),
                        reason: format!(
                            "program '{}' writes {} outputs but {} are attached",
                            program.label,
                            kernel.outputs(),
                            framebuffer.attachments.len()
                        ),
                    });
                }
                let previous = framebuffer
                    .attachments
                    .iter()
                    .map(|id| self.texture_data(*id).map(|t| t.texels.clone()))
                    .collect::<Result<Vec<_>, _>>()?;
                let inputs = self.kernel_inputs(bindings)?;
                let written = self.rasterize(kernel, &inputs, framebuffer.extent, bounds, previous);
                for (id, texels) in framebuffer.attachments.iter().zip(written) {
                    self.textures[id.0 as usize].texels = texels;
                }
            }
            Target::Screen(ops) => {
                let extent = self.screen_extent;
                let previous = self
                    .frame
                    .as_ref()
                    .and_then(|frame| frame.image.clone())
                    .unwrap_or_else(|| vec![Vec4::ZERO; extent.capacity() as usize]);
                let mut outputs = vec![previous];
                outputs.resize(kernel.outputs(), vec![Vec4::ZERO; extent.capacity() as usize]);
                let inputs = self.kernel_inputs(bindings)?;
                let mut written = self.rasterize(kernel, &inputs, extent, bounds, outputs);
                let frame = self.screen_frame(ops.clear)?;
                frame.image = Some(written.swap_remove(0));
            }
        }
        Ok(())
    }

    fn submit_points(
        &mut self,
        program: &SoftProgram,
        kernel: &dyn VertexKernel,
        target: &Target<'_, SoftFramebuffer>,
        bindings: &Bindings<'_, SoftTexture>,
        draw: &DrawCall<'_, SoftVertexBuffer>,
    ) -> Result<(), PipelineError> {
        let Target::Screen(ops) = target else {
            return Err(PipelineError::Device(format!(
                "point program '{}' can only draw to the screen",
                program.label
            )));
        };
        if draw.topology != Topology::Points {
            return Err(PipelineError::Device(format!(
                "point program '{}' drawn with {:?}",
                program.label, draw.topology
            )));
        }

        let mut attribute_data = Vec::new();
        for (slot, buffer) in &draw.attributes {
            attribute_data.push((*slot, buffer.components as usize, self.vertex_data(buffer)?));
        }
        let inputs = self.kernel_inputs(bindings)?;
        let points: Vec<Vec4> = (0..draw.vertex_count)
            .map(|index| {
                let attributes = attribute_data
                    .iter()
                    .map(|(slot, stride, data)| {
                        let start = index as usize * stride;
                        let mut value = [0.0; 4];
                        for (c, v) in data[start..start + stride].iter().take(4).enumerate() {
                            value[c] = *v;
                        }
                        (*slot, Vec4::from_array(value))
                    })
                    .collect();
                let ctx = VertexContext {
                    index,
                    attributes,
                    inputs: &inputs,
                };
                kernel.transform(&ctx)
            })
            .collect();

        let frame = self.screen_frame(ops.clear)?;
        frame.points.extend(points);
        Ok(())
    }

    /// The in-progress frame, cleared first when `clear` is set.
    fn screen_frame(&mut self, clear: Option<[f32; 4]>) -> Result<&mut ScreenFrame, PipelineError> {
        let frame = self
            .frame
            .as_mut()
            .ok_or_else(|| PipelineError::Device("screen draw outside of a frame".into()))?;
        if let Some(color) = clear {
            frame.clear_color = Some(color);
            frame.depth_cleared = true;
            frame.points.clear();
            frame.image = None;
        }
        frame.draws += 1;
        Ok(frame)
    }
}

impl GpuBackend for SoftwareBackend {
    type Texture = SoftTexture;
    type Framebuffer = SoftFramebuffer;
    type VertexBuffer = SoftVertexBuffer;
    type Program = SoftProgram;

    fn backend_type(&self) -> BackendType {
        BackendType::Software
    }

    fn create_state_texture(
        &mut self,
        label: &str,
        extent: TextureExtent,
    ) -> Result<SoftTexture, PipelineError> {
        let id = TextureId(self.textures.len() as u32);
        self.textures.push(TextureData {
            label: label.to_string(),
            extent,
            texels: vec![Vec4::ZERO; extent.capacity() as usize],
        });
        Ok(SoftTexture { id, extent })
    }

    fn create_framebuffer(
        &mut self,
        label: &str,
        attachments: &[&SoftTexture],
    ) -> Result<SoftFramebuffer, PipelineError> {
        let extent = validate_attachments(label, attachments)?;
        for texture in attachments {
            self.texture_data(texture.id)?;
        }
        Ok(SoftFramebuffer {
            label: label.to_string(),
            attachments: attachments.iter().map(|t| t.id).collect(),
            extent,
        })
    }

    fn create_vertex_buffer(
        &mut self,
        label: &str,
        data: &[f32],
        components: u32,
    ) -> Result<SoftVertexBuffer, PipelineError> {
        if components == 0 || data.len() % components as usize != 0 {
            return Err(PipelineError::Device(format!(
                "vertex buffer '{label}' has {} floats, not a multiple of {components}",
                data.len()
            )));
        }
        let index = self.vertex_buffers.len();
        self.vertex_buffers.push(data.to_vec());
        Ok(SoftVertexBuffer {
            index,
            components,
            vertices: (data.len() / components as usize) as u32,
        })
    }

    fn write_texture(
        &mut self,
        texture: &SoftTexture,
        texels: &[Vec4],
    ) -> Result<(), PipelineError> {
        let expected = texture.extent.capacity() as usize;
        if texels.len() != expected {
            return Err(PipelineError::TexelCountMismatch {
                texture: texture.id,
                expected,
                actual: texels.len(),
            });
        }
        self.texture_data(texture.id)?;
        self.textures[texture.id.0 as usize].texels.copy_from_slice(texels);
        Ok(())
    }

    fn read_texture(&mut self, texture: &SoftTexture) -> Result<Vec<Vec4>, PipelineError> {
        Ok(self.texture_data(texture.id)?.texels.clone())
    }

    fn begin_frame(&mut self) -> Result<(), PipelineError> {
        self.frames_begun += 1;
        self.frame = Some(ScreenFrame::default());
        Ok(())
    }

    fn submit(
        &mut self,
        program: &SoftProgram,
        target: Target<'_, SoftFramebuffer>,
        bindings: &Bindings<'_, SoftTexture>,
        draw: &DrawCall<'_, SoftVertexBuffer>,
    ) -> Result<(), PipelineError> {
        check_feedback(&program.label, bindings, &target)?;

        for &(slot, buffer) in &draw.attributes {
            if !program.has_attribute(slot) {
                return Err(PipelineError::MissingAttribute {
                    program: program.label.clone(),
                    slot,
                });
            }
            if buffer.vertices < draw.vertex_count {
                return Err(PipelineError::VertexRange {
                    attribute: slot.to_string(),
                    requested: draw.vertex_count,
                    available: buffer.vertices,
                });
            }
        }

        match &program.stage {
            ProgramStage::Fragment(kernel) => {
                self.submit_fragment(program, kernel.as_ref(), &target, bindings, draw)?
            }
            ProgramStage::Points(kernel) => {
                self.submit_points(program, kernel.as_ref(), &target, bindings, draw)?
            }
        }

        let recorded_target = match &target {
            Target::Screen(ops) => RecordedTarget::Screen {
                cleared: ops.clear.is_some(),
            },
            Target::Offscreen(framebuffer) => RecordedTarget::Offscreen(framebuffer.label.clone()),
        };
        self.log.push(SubmitRecord {
            frame: if self.frame.is_some() { self.frames_begun } else { 0 },
            program: program.label.clone(),
            target: recorded_target,
            topology: draw.topology,
            vertex_count: draw.vertex_count,
            reads: bindings.samplers().map(|(_, t)| t.id).collect(),
            writes: target.writes().to_vec(),
        });
        Ok(())
    }

    fn end_frame(&mut self) -> Result<(), PipelineError> {
        if let Some(frame) = self.frame.take() {
            self.last_frame = Some(frame);
            self.frames_presented += 1;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::kernels::{ConstantForce, PairwiseRepulsion};
    use super::*;
    use crate::programs::slots;
    use crate::quad::FullScreenQuad;

    fn state_pair(backend: &mut SoftwareBackend) -> (SoftTexture, SoftTexture, SoftFramebuffer) {
        let extent = TextureExtent::new(2, 2);
        let a = backend.create_state_texture("a", extent).unwrap();
        let b = backend.create_state_texture("b", extent).unwrap();
        let fb = backend.create_framebuffer("b target", &[&b]).unwrap();
        (a, b, fb)
    }

    #[test]
    fn quad_shades_every_texel() {
        let mut backend = SoftwareBackend::new();
        let (_, out, fb) = state_pair(&mut backend);
        let quad = FullScreenQuad::new(&mut backend).unwrap();
        let program = SoftProgram::collision(ConstantForce(Vec4::new(1.0, 2.0, 3.0, 4.0)));

        quad.draw(&mut backend, &program, Target::Offscreen(&fb), &Bindings::new())
            .unwrap();

        assert!(backend
            .texels(&out)
            .iter()
            .all(|t| *t == Vec4::new(1.0, 2.0, 3.0, 4.0)));
        let record = &backend.log()[0];
        assert_eq!(record.topology, Topology::TriangleStrip);
        assert_eq!(record.vertex_count, 4);
        assert_eq!(record.writes, vec![out.id()]);
        assert_eq!(record.frame, 0);
    }

    #[test]
    fn partial_strip_only_covers_its_bounds() {
        let mut backend = SoftwareBackend::new();
        let (_, out, fb) = state_pair(&mut backend);
        // Left half of clip space only.
        let half = backend
            .create_vertex_buffer(
                "half",
                &[-1.0, -1.0, 0.0, 0.0, -1.0, 0.0, -1.0, 1.0, 0.0, 0.0, 1.0, 0.0],
                3,
            )
            .unwrap();
        let program = SoftProgram::collision(ConstantForce(Vec4::ONE));
        let draw = DrawCall::new(Topology::TriangleStrip, 4).attribute(slots::POSITION, &half);

        backend
            .submit(&program, Target::Offscreen(&fb), &Bindings::new(), &draw)
            .unwrap();

        assert_eq!(
            backend.texels(&out),
            &[Vec4::ONE, Vec4::ZERO, Vec4::ONE, Vec4::ZERO]
        );
    }

    #[test]
    fn sampling_the_target_is_a_feedback_loop() {
        let mut backend = SoftwareBackend::new();
        let (_, out, fb) = state_pair(&mut backend);
        let quad = FullScreenQuad::new(&mut backend).unwrap();
        let program = SoftProgram::display();
        let bindings = Bindings::new().sampler(slots::POS_TEX, &out);

        let result = quad.draw(&mut backend, &program, Target::Offscreen(&fb), &bindings);
        assert!(matches!(result, Err(PipelineError::FeedbackLoop { .. })));
        assert!(backend.log().is_empty());
    }

    #[test]
    fn output_count_must_match_attachments() {
        let mut backend = SoftwareBackend::new();
        let (_, _, fb) = state_pair(&mut backend);
        let quad = FullScreenQuad::new(&mut backend).unwrap();
        let program = SoftProgram::update(EulerIntegrator);

        let result = quad.draw(&mut backend, &program, Target::Offscreen(&fb), &Bindings::new());
        assert!(matches!(
            result,
            Err(PipelineError::IncompleteFramebuffer { .. })
        ));
    }

    #[test]
    fn screen_draws_need_a_frame() {
        let mut backend = SoftwareBackend::new();
        let (a, _, _) = state_pair(&mut backend);
        let quad = FullScreenQuad::new(&mut backend).unwrap();
        let program = SoftProgram::display();
        let bindings = Bindings::new().sampler(slots::POS_TEX, &a);
        let screen = || Target::Screen(crate::backend::ScreenOps::load());

        assert!(quad.draw(&mut backend, &program, screen(), &bindings).is_err());

        backend.begin_frame().unwrap();
        quad.draw(&mut backend, &program, screen(), &bindings).unwrap();
        backend.end_frame().unwrap();

        let frame = backend.last_frame().unwrap();
        assert_eq!(frame.draws, 1);
        assert_eq!(frame.image.as_ref().map(Vec::len), Some(64 * 64));
        assert_eq!(backend.frames_presented(), 1);
    }

    #[test]
    fn point_draws_respect_vertex_range() {
        let mut backend = SoftwareBackend::new();
        let (a, _, _) = state_pair(&mut backend);
        let uvs = backend
            .create_vertex_buffer("uv", &[0.25, 0.25, 0.75, 0.25], 2)
            .unwrap();
        let program = SoftProgram::particle();
        let bindings = Bindings::new().sampler(slots::POS_TEX, &a);
        backend.begin_frame().unwrap();

        let too_many = DrawCall::new(Topology::Points, 3).attribute(slots::UV, &uvs);
        assert!(matches!(
            backend.submit(
                &program,
                Target::Screen(crate::backend::ScreenOps::clear([0.0; 4])),
                &bindings,
                &too_many
            ),
            Err(PipelineError::VertexRange { requested: 3, available: 2, .. })
        ));
    }

    #[test]
    fn write_texture_checks_size() {
        let mut backend = SoftwareBackend::new();
        let (a, _, _) = state_pair(&mut backend);
        assert!(matches!(
            backend.write_texture(&a, &[Vec4::ONE; 3]),
            Err(PipelineError::TexelCountMismatch { expected: 4, actual: 3, .. })
        ));
        backend.write_texture(&a, &[Vec4::ONE; 4]).unwrap();
        assert_eq!(backend.read_texture(&a).unwrap(), vec![Vec4::ONE; 4]);
        assert_eq!(backend.texture_label(a.id()), Some("a"));
    }

    #[test]
    fn pairwise_repulsion_pushes_particles_apart() {
        let mut backend = SoftwareBackend::new();
        let extent = TextureExtent::new(2, 1);
        let pos = backend.create_state_texture("pos", extent).unwrap();
        let force = backend.create_state_texture("force", extent).unwrap();
        let fb = backend.create_framebuffer("force target", &[&force]).unwrap();
        backend
            .write_texture(
                &pos,
                &[Vec4::new(-0.5, 0.0, 0.0, 1.0), Vec4::new(0.5, 0.0, 0.0, 1.0)],
            )
            .unwrap();
        let quad = FullScreenQuad::new(&mut backend).unwrap();
        let program = SoftProgram::collision(PairwiseRepulsion {
            strength: 1.0,
            softening: 0.0,
            centering: 0.0,
            damping: 0.0,
        });
        let bindings = Bindings::new()
            .sampler(slots::POS_TEX, &pos)
            .uint(slots::PARTICLE_COUNT, 2);

        quad.draw(&mut backend, &program, Target::Offscreen(&fb), &bindings)
            .unwrap();

        let forces = backend.texels(&force);
        assert!(forces[0].x < 0.0);
        assert!(forces[1].x > 0.0);
        assert!((forces[0].x + forces[1].x).abs() < 1e-6);
    }

    #[test]
    fn pairwise_repulsion_damps_velocity() {
        let mut backend = SoftwareBackend::new();
        let extent = TextureExtent::new(1, 1);
        let pos = backend.create_state_texture("pos", extent).unwrap();
        let vel = backend.create_state_texture("vel", extent).unwrap();
        let force = backend.create_state_texture("force", extent).unwrap();
        let fb = backend.create_framebuffer("force target", &[&force]).unwrap();
        backend.write_texture(&pos, &[Vec4::W]).unwrap();
        backend
            .write_texture(&vel, &[Vec4::new(2.0, -4.0, 0.0, 0.0)])
            .unwrap();
        let quad = FullScreenQuad::new(&mut backend).unwrap();
        let program = SoftProgram::collision(PairwiseRepulsion {
            damping: 0.5,
            ..PairwiseRepulsion::default()
        });
        let bindings = Bindings::new()
            .sampler(slots::POS_TEX, &pos)
            .sampler(slots::VEL_TEX, &vel)
            .uint(slots::PARTICLE_COUNT, 1);

        quad.draw(&mut backend, &program, Target::Offscreen(&fb), &bindings)
            .unwrap();

        assert_eq!(backend.texels(&force), vec![Vec4::new(-1.0, 2.0, 0.0, 0.0)]);
    }

    /// Writes 1.0 where the bound count arrives exactly.
    struct CountEquals(u32);

    impl TexelKernel for CountEquals {
        fn shade(&self, ctx: &TexelContext<'_>, out: &mut [Vec4]) {
            let exact = ctx.uint(slots::PARTICLE_COUNT) == self.0;
            out[0] = Vec4::splat(if exact { 1.0 } else { 0.0 });
        }
    }

    #[test]
    fn particle_count_stays_exact_past_float_precision() {
        // 2^24 + 1 is the first integer an f32 cannot hold.
        let count = 16_777_217;
        assert_ne!(count as f32 as u32, count);

        let mut backend = SoftwareBackend::new();
        let (a, b, fb) = state_pair(&mut backend);
        let quad = FullScreenQuad::new(&mut backend).unwrap();
        let program = SoftProgram::collision(CountEquals(count));
        let bindings = Bindings::new()
            .sampler(slots::POS_TEX, &a)
            .uint(slots::PARTICLE_COUNT, count);

        quad.draw(&mut backend, &program, Target::Offscreen(&fb), &bindings)
            .unwrap();

        assert_eq!(backend.texels(&b), vec![Vec4::ONE; 4]);
    }
}
