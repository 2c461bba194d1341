//! wgpu backend
//!
//! State textures are `Rgba32Float` render targets. Each [`GpuBackend::submit`]
//! records one render pass into its own encoder and submits it right away,
//! so the queue order is exactly the call order.

pub mod shaders;

use crate::backend::{
    check_feedback, validate_attachments, BackendType, Bindings, DrawCall, FramebufferHandle,
    GpuBackend, ProgramSlots, Target, TextureHandle, TextureId, Topology,
};
use crate::error::PipelineError;
use crate::programs::{slots, ProgramSet};
use glam::{Mat4, Vec4};
use std::sync::Arc;
use texflow_core::TextureExtent;
use wgpu::util::DeviceExt;
use winit::window::Window;

pub const STATE_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba32Float;
pub const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

const TEXEL_BYTES: u32 = 16;

/// Host mirror of the WGSL `Params` block.
#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
struct Params {
    camera_mat: [[f32; 4]; 4],
    timestep: f32,
    particle_count: u32,
    screen_size: [f32; 2],
}

pub struct WgpuTexture {
    id: TextureId,
    extent: TextureExtent,
    texture: wgpu::Texture,
    view: wgpu::TextureView,
}

impl TextureHandle for WgpuTexture {
    fn id(&self) -> TextureId {
        self.id
    }

    fn extent(&self) -> TextureExtent {
        self.extent
    }
}

pub struct WgpuFramebuffer {
    label: String,
    attachments: Vec<TextureId>,
    extent: TextureExtent,
    views: Vec<wgpu::TextureView>,
}

impl FramebufferHandle for WgpuFramebuffer {
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

pub struct WgpuVertexBuffer {
    buffer: wgpu::Buffer,
    vertices: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgramOutput {
    /// Writes `attachments` state textures.
    State { attachments: usize },
    /// Writes the visible framebuffer.
    Screen { depth_test: bool },
}

/// Everything needed to build a pipeline for one program.
pub struct ProgramDesc {
    pub label: &'static str,
    pub source: &'static str,
    pub vertex_entry: &'static str,
    /// One vertex buffer per attribute, at locations 0.. in order.
    pub attributes: &'static [(&'static str, wgpu::VertexFormat)],
    /// Texture slots, at bindings 1.. in order.
    pub samplers: &'static [&'static str],
    /// Slots carried in the `Params` block.
    pub params: &'static [&'static str],
    pub topology: Topology,
    pub output: ProgramOutput,
}

pub struct WgpuProgram {
    label: String,
    pipeline: wgpu::RenderPipeline,
    layout: wgpu::BindGroupLayout,
    params_buffer: wgpu::Buffer,
    attributes: Vec<&'static str>,
    samplers: Vec<&'static str>,
    params: Vec<&'static str>,
    topology: Topology,
    output: ProgramOutput,
}

impl ProgramSlots for WgpuProgram {
    fn label(&self) -> &str {
        &self.label
    }

    fn has_attribute(&self, name: &str) -> bool {
        self.attributes.contains(&name)
    }

    fn has_uniform(&self, name: &str) -> bool {
        self.samplers.contains(&name) || self.params.contains(&name)
    }
}

struct ScreenFrame {
    surface_texture: wgpu::SurfaceTexture,
    view: wgpu::TextureView,
}

pub struct WgpuBackend {
    surface: wgpu::Surface<'static>,
    device: wgpu::Device,
    queue: wgpu::Queue,
    config: wgpu::SurfaceConfiguration,
    adapter_info: wgpu::AdapterInfo,
    depth_view: wgpu::TextureView,
    frame: Option<ScreenFrame>,
    next_texture: u32,
}

impl WgpuBackend {
    pub async fn new(window: Arc<Window>) -> Result<Self, PipelineError> {
        let size = window.inner_size();

        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        let surface = instance
            .create_surface(window)
            .map_err(|e| PipelineError::Device(e.to_string()))?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::default(),
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .ok_or_else(|| PipelineError::Device("no compatible adapter found".to_string()))?;

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("texflow device"),
                    required_features: wgpu::Features::empty(),
                    required_limits: wgpu::Limits::default(),
                    memory_hints: wgpu::MemoryHints::default(),
                },
                None,
            )
            .await
            .map_err(|e| PipelineError::Device(e.to_string()))?;

        let adapter_info = adapter.get_info();
        let surface_caps = surface.get_capabilities(&adapter);
        let format = surface_caps
            .formats
            .first()
            .copied()
            .ok_or_else(|| PipelineError::Device("surface reports no formats".to_string()))?;

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: wgpu::PresentMode::AutoVsync,
            alpha_mode: surface_caps.alpha_modes[0],
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);
        let depth_view = create_depth_view(&device, &config);

        tracing::info!(
            adapter = %adapter_info.name,
            backend = ?adapter_info.backend,
            ?format,
            width = config.width,
            height = config.height,
            "wgpu backend ready"
        );

        Ok(Self {
            surface,
            device,
            queue,
            config,
            adapter_info,
            depth_view,
            frame: None,
            next_texture: 0,
        })
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        self.config.width = width;
        self.config.height = height;
        self.reconfigure();
    }

    /// Reconfigure the surface after it was lost or outdated.
    pub fn reconfigure(&mut self) {
        self.surface.configure(&self.device, &self.config);
        self.depth_view = create_depth_view(&self.device, &self.config);
        tracing::debug!(
            width = self.config.width,
            height = self.config.height,
            "surface reconfigured"
        );
    }

    /// Build the built-in WGSL program set.
    pub fn create_programs(&self) -> ProgramSet<WgpuProgram> {
        ProgramSet {
            collision: self.create_program(&shaders::collision()),
            update: self.create_program(&shaders::update()),
            particle: self.create_program(&shaders::particle()),
            display: Some(self.create_program(&shaders::display())),
        }
    }

    pub fn create_program(&self, desc: &ProgramDesc) -> WgpuProgram {
        let source = format!("{}{}", shaders::PARAMS, desc.source);
        let module = self
            .device
            .create_shader_module(wgpu::ShaderModuleDescriptor {
                label: Some(desc.label),
                source: wgpu::ShaderSource::Wgsl(source.into()),
            });

        let mut entries = vec![wgpu::BindGroupLayoutEntry {
            binding: 0,
            visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Uniform,
                has_dynamic_offset: false,
                min_binding_size: None,
            },
            count: None,
        }];
        for binding in 1..=desc.samplers.len() as u32 {
            entries.push(wgpu::BindGroupLayoutEntry {
                binding,
                visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                ty: wgpu::BindingType::Texture {
                    sample_type: wgpu::TextureSampleType::Float { filterable: false },
                    view_dimension: wgpu::TextureViewDimension::D2,
                    multisampled: false,
                },
                count: None,
            });
        }
        let layout = self
            .device
            .create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some(desc.label),
                entries: &entries,
            });

        let pipeline_layout = self
            .device
            .create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some(desc.label),
                bind_group_layouts: &[&layout],
                push_constant_ranges: &[],
            });

        let vertex_attributes: Vec<[wgpu::VertexAttribute; 1]> = desc
            .attributes
            .iter()
            .enumerate()
            .map(|(location, (_, format))| {
                [wgpu::VertexAttribute {
                    format: *format,
                    offset: 0,
                    shader_location: location as u32,
                }]
            })
            .collect();
        let vertex_buffers: Vec<wgpu::VertexBufferLayout> = desc
            .attributes
            .iter()
            .zip(&vertex_attributes)
            .map(|((_, format), attributes)| wgpu::VertexBufferLayout {
                array_stride: format.size(),
                step_mode: wgpu::VertexStepMode::Vertex,
                attributes,
            })
            .collect();

        let (targets, depth_stencil) = match desc.output {
            ProgramOutput::State { attachments } => (
                vec![
                    Some(wgpu::ColorTargetState {
                        format: STATE_FORMAT,
                        blend: None,
                        write_mask: wgpu::ColorWrites::ALL,
                    });
                    attachments
                ],
                None,
            ),
            ProgramOutput::Screen { depth_test } => (
                vec![Some(wgpu::ColorTargetState {
                    format: self.config.format,
                    blend: None,
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                Some(wgpu::DepthStencilState {
                    format: DEPTH_FORMAT,
                    depth_write_enabled: depth_test,
                    depth_compare: if depth_test {
                        wgpu::CompareFunction::Less
                    } else {
                        wgpu::CompareFunction::Always
                    },
                    stencil: wgpu::StencilState::default(),
                    bias: wgpu::DepthBiasState::default(),
                }),
            ),
        };

        let pipeline = self
            .device
            .create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some(desc.label),
                layout: Some(&pipeline_layout),
                vertex: wgpu::VertexState {
                    module: &module,
                    entry_point: Some(desc.vertex_entry),
                    buffers: &vertex_buffers,
                    compilation_options: wgpu::PipelineCompilationOptions::default(),
                },
                fragment: Some(wgpu::FragmentState {
                    module: &module,
                    entry_point: Some("fs_main"),
                    targets: &targets,
                    compilation_options: wgpu::PipelineCompilationOptions::default(),
                }),
                primitive: wgpu::PrimitiveState {
                    topology: match desc.topology {
                        Topology::TriangleStrip => wgpu::PrimitiveTopology::TriangleStrip,
                        Topology::Points => wgpu::PrimitiveTopology::PointList,
                    },
                    strip_index_format: None,
                    front_face: wgpu::FrontFace::Ccw,
                    cull_mode: None,
                    polygon_mode: wgpu::PolygonMode::Fill,
                    unclipped_depth: false,
                    conservative: false,
                },
                depth_stencil,
                multisample: wgpu::MultisampleState::default(),
                multiview: None,
                cache: None,
            });

        let params_buffer = self
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(desc.label),
                contents: bytemuck::bytes_of(&<Params as bytemuck::Zeroable>::zeroed()),
                usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            });

        tracing::debug!(program = desc.label, "created pipeline");

        WgpuProgram {
            label: desc.label.to_string(),
            pipeline,
            layout,
            params_buffer,
            attributes: desc.attributes.iter().map(|(slot, _)| *slot).collect(),
            samplers: desc.samplers.to_vec(),
            params: desc.params.to_vec(),
            topology: desc.topology,
            output: desc.output,
        }
    }

    fn params_for(&self, bindings: &Bindings<'_, WgpuTexture>) -> Params {
        let mut params = Params {
            camera_mat: Mat4::IDENTITY.to_cols_array_2d(),
            timestep: 0.0,
            particle_count: 0,
            screen_size: [self.config.width as f32, self.config.height as f32],
        };
        for (slot, value) in bindings.matrices() {
            if slot == slots::CAMERA_MAT {
                params.camera_mat = value.to_cols_array_2d();
            }
        }
        for (slot, value) in bindings.scalars() {
            if slot == slots::TIMESTEP {
                params.timestep = value;
            }
        }
        for (slot, value) in bindings.uints() {
            if slot == slots::PARTICLE_COUNT {
                params.particle_count = value;
            }
        }
        params
    }

    /// Match the target against the program's declared output.
    fn check_output(
        program: &WgpuProgram,
        target: &Target<'_, WgpuFramebuffer>,
    ) -> Result<(), PipelineError> {
        match (program.output, target) {
            (ProgramOutput::State { attachments }, Target::Offscreen(framebuffer)) => {
                if framebuffer.views.len() != attachments {
                    return Err(PipelineError::IncompleteFramebuffer {
                        label: framebuffer.label.clone(),
                        reason: format!(
                            "program '{}' writes {attachments} outputs but {} are attached",
                            program.label,
                            framebuffer.views.len()
                        ),
                    });
                }
                Ok(())
            }
            (ProgramOutput::Screen { .. }, Target::Screen(_)) => Ok(()),
            (output, _) => Err(PipelineError::Device(format!(
                "program '{}' with output {output:?} cannot draw to this target",
                program.label
            ))),
        }
    }
}

fn create_depth_view(
    device: &wgpu::Device,
    config: &wgpu::SurfaceConfiguration,
) -> wgpu::TextureView {
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some("Depth Texture"),
        size: wgpu::Extent3d {
            width: config.width,
            height: config.height,
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: DEPTH_FORMAT,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
        view_formats: &[],
    });
    texture.create_view(&wgpu::TextureViewDescriptor::default())
}

fn texture_copy(texture: &wgpu::Texture) -> wgpu::ImageCopyTexture<'_> {
    wgpu::ImageCopyTexture {
        texture,
        mip_level: 0,
        origin: wgpu::Origin3d::ZERO,
        aspect: wgpu::TextureAspect::All,
    }
}

fn extent_3d(extent: TextureExtent) -> wgpu::Extent3d {
    wgpu::Extent3d {
        width: extent.width,
        height: extent.height,
        depth_or_array_layers: 1,
    }
}

impl GpuBackend for WgpuBackend {
    type Texture = WgpuTexture;
    type Framebuffer = WgpuFramebuffer;
    type VertexBuffer = WgpuVertexBuffer;
    type Program = WgpuProgram;

    fn backend_type(&self) -> BackendType {
        match self.adapter_info.backend {
            wgpu::Backend::Vulkan => BackendType::Vulkan,
            wgpu::Backend::Metal => BackendType::Metal,
            wgpu::Backend::Dx12 => BackendType::DirectX12,
            wgpu::Backend::Gl => BackendType::OpenGL,
            wgpu::Backend::BrowserWebGpu => BackendType::WebGpu,
            _ => BackendType::Software,
        }
    }

    fn create_state_texture(
        &mut self,
        label: &str,
        extent: TextureExtent,
    ) -> Result<WgpuTexture, PipelineError> {
        let texture = self.device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size: extent_3d(extent),
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: STATE_FORMAT,
            usage: wgpu::TextureUsages::TEXTURE_BINDING
                | wgpu::TextureUsages::RENDER_ATTACHMENT
                | wgpu::TextureUsages::COPY_DST
                | wgpu::TextureUsages::COPY_SRC,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let id = TextureId(self.next_texture);
        self.next_texture += 1;
        Ok(WgpuTexture {
            id,
            extent,
            texture,
            view,
        })
    }

    fn create_framebuffer(
        &mut self,
        label: &str,
        attachments: &[&WgpuTexture],
    ) -> Result<WgpuFramebuffer, PipelineError> {
        let extent = validate_attachments(label, attachments)?;
        Ok(WgpuFramebuffer {
            label: label.to_string(),
            attachments: attachments.iter().map(|t| t.id).collect(),
            extent,
            views: attachments
                .iter()
                .map(|t| t.texture.create_view(&wgpu::TextureViewDescriptor::default()))
                .collect(),
        })
    }

    fn create_vertex_buffer(
        &mut self,
        label: &str,
        data: &[f32],
        components: u32,
    ) -> Result<WgpuVertexBuffer, PipelineError> {
        if components == 0 || data.len() % components as usize != 0 {
            return Err(PipelineError::Device(format!(
                "vertex buffer '{label}' has {} floats, not a multiple of {components}",
                data.len()
            )));
        }
        let buffer = self
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(label),
                contents: bytemuck::cast_slice(data),
                usage: wgpu::BufferUsages::VERTEX,
            });
        Ok(WgpuVertexBuffer {
            buffer,
            vertices: (data.len() / components as usize) as u32,
        })
    }

    fn write_texture(
        &mut self,
        texture: &WgpuTexture,
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
        let data: Vec<[f32; 4]> = texels.iter().map(|t| t.to_array()).collect();
        self.queue.write_texture(
            texture_copy(&texture.texture),
            bytemuck::cast_slice(&data),
            wgpu::ImageDataLayout {
                offset: 0,
                bytes_per_row: Some(texture.extent.width * TEXEL_BYTES),
                rows_per_image: Some(texture.extent.height),
            },
            extent_3d(texture.extent),
        );
        Ok(())
    }

    fn read_texture(&mut self, texture: &WgpuTexture) -> Result<Vec<Vec4>, PipelineError> {
        let extent = texture.extent;
        // Rows in a copy must be multiples of COPY_BYTES_PER_ROW_ALIGNMENT (256).
        let unpadded_bytes_per_row = extent.width * TEXEL_BYTES;
        let align = wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;
        let padded_bytes_per_row = unpadded_bytes_per_row.div_ceil(align) * align;

        let staging = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Readback Buffer"),
            size: u64::from(padded_bytes_per_row) * u64::from(extent.height),
            usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Readback Encoder"),
            });
        encoder.copy_texture_to_buffer(
            texture_copy(&texture.texture),
            wgpu::ImageCopyBuffer {
                buffer: &staging,
                layout: wgpu::ImageDataLayout {
                    offset: 0,
                    bytes_per_row: Some(padded_bytes_per_row),
                    rows_per_image: Some(extent.height),
                },
            },
            extent_3d(extent),
        );
        self.queue.submit(std::iter::once(encoder.finish()));

        let slice = staging.slice(..);
        let (tx, rx) = std::sync::mpsc::channel();
        slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = tx.send(result);
        });
        self.device.poll(wgpu::Maintain::Wait);
        rx.recv()
            .map_err(|e| PipelineError::Device(e.to_string()))?
            .map_err(|e| PipelineError::Device(e.to_string()))?;

        let texels = {
            let data = slice.get_mapped_range();
            data.chunks(padded_bytes_per_row as usize)
                .flat_map(|row| {
                    row[..unpadded_bytes_per_row as usize].chunks_exact(TEXEL_BYTES as usize)
                })
                .map(|texel| Vec4::from_array(bytemuck::pod_read_unaligned(texel)))
                .collect()
        };
        staging.unmap();
        Ok(texels)
    }

    fn begin_frame(&mut self) -> Result<(), PipelineError> {
        let surface_texture = match self.surface.get_current_texture() {
            Ok(texture) => texture,
            Err(
                wgpu::SurfaceError::Lost
                | wgpu::SurfaceError::Outdated
                | wgpu::SurfaceError::Timeout,
            ) => {
                return Err(PipelineError::SurfaceLost)
            }
            Err(e) => return Err(PipelineError::Device(e.to_string())),
        };
        let view = surface_texture
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        self.frame = Some(ScreenFrame {
            surface_texture,
            view,
        });
        Ok(())
    }

    fn submit(
        &mut self,
        program: &WgpuProgram,
        target: Target<'_, WgpuFramebuffer>,
        bindings: &Bindings<'_, WgpuTexture>,
        draw: &DrawCall<'_, WgpuVertexBuffer>,
    ) -> Result<(), PipelineError> {
        check_feedback(&program.label, bindings, &target)?;
        Self::check_output(program, &target)?;
        if draw.topology != program.topology {
            return Err(PipelineError::Device(format!(
                "program '{}' drawn with {:?}",
                program.label, draw.topology
            )));
        }

        for &(slot, _) in &draw.attributes {
            if !program.has_attribute(slot) {
                return Err(PipelineError::MissingAttribute {
                    program: program.label.clone(),
                    slot,
                });
            }
        }
        let mut vertex_buffers = Vec::with_capacity(program.attributes.len());
        for &slot in &program.attributes {
            let buffer = draw.buffer(slot).ok_or_else(|| PipelineError::MissingAttribute {
                program: program.label.clone(),
                slot,
            })?;
            if buffer.vertices < draw.vertex_count {
                return Err(PipelineError::VertexRange {
                    attribute: slot.to_string(),
                    requested: draw.vertex_count,
                    available: buffer.vertices,
                });
            }
            vertex_buffers.push(buffer);
        }

        let mut entries = vec![wgpu::BindGroupEntry {
            binding: 0,
            resource: program.params_buffer.as_entire_binding(),
        }];
        for (i, slot) in program.samplers.iter().enumerate() {
            let texture = bindings
                .texture(slot)
                .ok_or_else(|| PipelineError::UnboundSampler {
                    program: program.label.clone(),
                    slot: slot.to_string(),
                })?;
            entries.push(wgpu::BindGroupEntry {
                binding: i as u32 + 1,
                resource: wgpu::BindingResource::TextureView(&texture.view),
            });
        }
        let bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(program.label.as_str()),
            layout: &program.layout,
            entries: &entries,
        });

        self.queue.write_buffer(
            &program.params_buffer,
            0,
            bytemuck::bytes_of(&self.params_for(bindings)),
        );

        let (color_attachments, depth_stencil_attachment) = match &target {
            Target::Offscreen(framebuffer) => (
                framebuffer
                    .views
                    .iter()
                    .map(|view| {
                        Some(wgpu::RenderPassColorAttachment {
                            view,
                            resolve_target: None,
                            ops: wgpu::Operations {
                                load: wgpu::LoadOp::Load,
                                store: wgpu::StoreOp::Store,
                            },
                        })
                    })
                    .collect::<Vec<_>>(),
                None,
            ),
            Target::Screen(ops) => {
                let frame = self.frame.as_ref().ok_or_else(|| {
                    PipelineError::Device("screen draw outside of a frame".into())
                })?;
                let (color_load, depth_load) = match ops.clear {
                    Some([r, g, b, a]) => (
                        wgpu::LoadOp::Clear(wgpu::Color {
                            r: f64::from(r),
                            g: f64::from(g),
                            b: f64::from(b),
                            a: f64::from(a),
                        }),
                        wgpu::LoadOp::Clear(1.0),
                    ),
                    None => (wgpu::LoadOp::Load, wgpu::LoadOp::Load),
                };
                (
                    vec![Some(wgpu::RenderPassColorAttachment {
                        view: &frame.view,
                        resolve_target: None,
                        ops: wgpu::Operations {
                            load: color_load,
                            store: wgpu::StoreOp::Store,
                        },
                    })],
                    Some(wgpu::RenderPassDepthStencilAttachment {
                        view: &self.depth_view,
                        depth_ops: Some(wgpu::Operations {
                            load: depth_load,
                            store: wgpu::StoreOp::Store,
                        }),
                        stencil_ops: None,
                    }),
                )
            }
        };

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some(program.label.as_str()),
            });
        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some(program.label.as_str()),
                color_attachments: &color_attachments,
                depth_stencil_attachment,
                occlusion_query_set: None,
                timestamp_writes: None,
            });
            pass.set_pipeline(&program.pipeline);
            pass.set_bind_group(0, &bind_group, &[]);
            for (slot, buffer) in vertex_buffers.iter().enumerate() {
                pass.set_vertex_buffer(slot as u32, buffer.buffer.slice(..));
            }
            pass.draw(0..draw.vertex_count, 0..1);
        }
        self.queue.submit(std::iter::once(encoder.finish()));
        Ok(())
    }

    fn end_frame(&mut self) -> Result<(), PipelineError> {
        if let Some(frame) = self.frame.take() {
            frame.surface_texture.present();
        }
        Ok(())
    }
}
