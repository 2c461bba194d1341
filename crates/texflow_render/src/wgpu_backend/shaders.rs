//! WGSL sources for the built-in programs
//!
//! Every program shares the [`PARAMS`] block at binding 0. Textures follow
//! at bindings 1.. in the order their slots are declared, and are read with
//! `textureLoad` since `Rgba32Float` is not filterable.

use super::{ProgramDesc, ProgramOutput};
use crate::backend::Topology;
use crate::programs::slots;

/// Uniform block shared by all programs. Mirrors `Params` on the host side.
pub const PARAMS: &str = r#"
struct Params {
    camera_mat: mat4x4<f32>,
    timestep: f32,
    particle_count: u32,
    screen_size: vec2<f32>,
};

@group(0) @binding(0) var<uniform> params: Params;

struct QuadOut {
    @builtin(position) clip: vec4<f32>,
};

@vertex
fn vs_quad(@location(0) position: vec3<f32>) -> QuadOut {
    var out: QuadOut;
    out.clip = vec4<f32>(position, 1.0);
    return out;
}
"#;

const COLLISION: &str = r#"
@group(0) @binding(1) var pos_tex: texture_2d<f32>;
@group(0) @binding(2) var vel_tex: texture_2d<f32>;

const STRENGTH: f32 = 0.002;
const SOFTENING: f32 = 0.05;
const CENTERING: f32 = 0.5;
const DAMPING: f32 = 0.1;

@fragment
fn fs_main(in: QuadOut) -> @location(0) vec4<f32> {
    let dims = textureDimensions(pos_tex);
    let texel = vec2<u32>(in.clip.xy);
    let own = texel.y * dims.x + texel.x;
    let count = params.particle_count;
    if (own >= count) {
        return vec4<f32>(0.0);
    }

    let p = textureLoad(pos_tex, texel, 0).xyz;
    var force = -CENTERING * p;
    for (var i = 0u; i < count; i++) {
        if (i == own) {
            continue;
        }
        let q = textureLoad(pos_tex, vec2<u32>(i % dims.x, i / dims.x), 0).xyz;
        let d = p - q;
        let r2 = dot(d, d) + SOFTENING;
        force += STRENGTH * d / (r2 * sqrt(r2));
    }
    force -= DAMPING * textureLoad(vel_tex, texel, 0).xyz;
    return vec4<f32>(force, 0.0);
}
"#;

const UPDATE: &str = r#"
@group(0) @binding(1) var pos_tex: texture_2d<f32>;
@group(0) @binding(2) var vel_tex: texture_2d<f32>;
@group(0) @binding(3) var force_tex: texture_2d<f32>;

struct StateOut {
    @location(0) position: vec4<f32>,
    @location(1) velocity: vec4<f32>,
};

@fragment
fn fs_main(in: QuadOut) -> StateOut {
    let texel = vec2<u32>(in.clip.xy);
    let p = textureLoad(pos_tex, texel, 0);
    let v = textureLoad(vel_tex, texel, 0);
    let f = textureLoad(force_tex, texel, 0);

    let dt = params.timestep;
    let nv = v.xyz + f.xyz * dt;
    let np = p.xyz + nv * dt;

    var out: StateOut;
    out.position = vec4<f32>(np, p.w);
    out.velocity = vec4<f32>(nv, v.w);
    return out;
}
"#;

const PARTICLE: &str = r#"
@group(0) @binding(1) var pos_tex: texture_2d<f32>;

struct ParticleOut {
    @builtin(position) clip: vec4<f32>,
    @location(0) color: vec4<f32>,
};

@vertex
fn vs_main(@location(0) uv: vec2<f32>) -> ParticleOut {
    let dims = textureDimensions(pos_tex);
    let texel = min(vec2<u32>(uv * vec2<f32>(dims)), dims - vec2<u32>(1u));
    let p = textureLoad(pos_tex, texel, 0).xyz;

    var out: ParticleOut;
    out.clip = params.camera_mat * vec4<f32>(p, 1.0);
    out.color = vec4<f32>(clamp(p * 0.5 + vec3<f32>(0.5), vec3<f32>(0.0), vec3<f32>(1.0)), 1.0);
    return out;
}

@fragment
fn fs_main(in: ParticleOut) -> @location(0) vec4<f32> {
    return in.color;
}
"#;

const DISPLAY: &str = r#"
@group(0) @binding(1) var pos_tex: texture_2d<f32>;

@fragment
fn fs_main(in: QuadOut) -> @location(0) vec4<f32> {
    let dims = textureDimensions(pos_tex);
    let uv = in.clip.xy / params.screen_size;
    let texel = min(vec2<u32>(uv * vec2<f32>(dims)), dims - vec2<u32>(1u));
    return textureLoad(pos_tex, texel, 0);
}
"#;

pub fn collision() -> ProgramDesc {
    ProgramDesc {
        label: "collision",
        source: COLLISION,
        vertex_entry: "vs_quad",
        attributes: &[(slots::POSITION, wgpu::VertexFormat::Float32x3)],
        samplers: &[slots::POS_TEX, slots::VEL_TEX],
        params: &[slots::PARTICLE_COUNT],
        topology: Topology::TriangleStrip,
        output: ProgramOutput::State { attachments: 1 },
    }
}

pub fn update() -> ProgramDesc {
    ProgramDesc {
        label: "update",
        source: UPDATE,
        vertex_entry: "vs_quad",
        attributes: &[(slots::POSITION, wgpu::VertexFormat::Float32x3)],
        samplers: &[slots::POS_TEX, slots::VEL_TEX, slots::FORCE_TEX],
        params: &[slots::TIMESTEP],
        topology: Topology::TriangleStrip,
        output: ProgramOutput::State { attachments: 2 },
    }
}

pub fn particle() -> ProgramDesc {
    ProgramDesc {
        label: "particle",
        source: PARTICLE,
        vertex_entry: "vs_main",
        attributes: &[(slots::UV, wgpu::VertexFormat::Float32x2)],
        samplers: &[slots::POS_TEX],
        params: &[slots::CAMERA_MAT],
        topology: Topology::Points,
        output: ProgramOutput::Screen { depth_test: true },
    }
}

pub fn display() -> ProgramDesc {
    ProgramDesc {
        label: "display",
        source: DISPLAY,
        vertex_entry: "vs_quad",
        attributes: &[(slots::POSITION, wgpu::VertexFormat::Float32x3)],
        samplers: &[slots::POS_TEX],
        params: &[],
        topology: Topology::TriangleStrip,
        output: ProgramOutput::Screen { depth_test: false },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use naga::valid::{Capabilities, ValidationFlags, Validator};

    fn validate(desc: &ProgramDesc) -> naga::Module {
        let source = format!("{}{}", PARAMS, desc.source);
        let module = naga::front::wgsl::parse_str(&source).unwrap_or_else(|e| {
            panic!("{} failed to parse:\n{}", desc.label, e.emit_to_string(&source))
        });
        Validator::new(ValidationFlags::all(), Capabilities::all())
            .validate(&module)
            .unwrap_or_else(|e| panic!("{} failed validation: {e:?}", desc.label));
        module
    }

    #[test]
    fn builtin_programs_validate() {
        for desc in [collision(), update(), particle(), display()] {
            let module = validate(&desc);
            let entries: Vec<_> = module.entry_points.iter().map(|e| e.name.as_str()).collect();
            assert!(entries.contains(&desc.vertex_entry), "{}", desc.label);
            assert!(entries.contains(&"fs_main"), "{}", desc.label);
        }
    }

    #[test]
    fn texture_bindings_follow_declared_samplers() {
        for desc in [collision(), update(), particle(), display()] {
            let module = validate(&desc);
            let mut textures: Vec<_> = module
                .global_variables
                .iter()
                .filter_map(|(_, var)| {
                    let binding = var.binding.as_ref()?;
                    matches!(module.types[var.ty].inner, naga::TypeInner::Image { .. })
                        .then_some(binding.binding)
                })
                .collect();
            textures.sort_unstable();
            let expected: Vec<u32> = (1..=desc.samplers.len() as u32).collect();
            assert_eq!(textures, expected, "{}", desc.label);
        }
    }

    #[test]
    fn params_block_matches_host_layout() {
        let module = validate(&display());
        let (_, params) = module
            .global_variables
            .iter()
            .find(|(_, var)| var.name.as_deref() == Some("params"))
            .expect("params uniform");
        let naga::TypeInner::Struct { ref members, span } = module.types[params.ty].inner else {
            panic!("params is not a struct");
        };
        assert_eq!(span as usize, std::mem::size_of::<super::super::Params>());
        let count = members
            .iter()
            .find(|m| m.name.as_deref() == Some("particle_count"))
            .expect("particle_count member");
        assert_eq!(
            module.types[count.ty].inner,
            naga::TypeInner::Scalar(naga::Scalar::U32)
        );
    }
}
