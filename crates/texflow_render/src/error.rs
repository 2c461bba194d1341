use crate::backend::TextureId;
use texflow_core::ConfigError;
use thiserror::Error;

/// Resource precondition violations raised by the pipeline.
///
/// None of these are transient except [`PipelineError::SurfaceLost`]: they
/// indicate a setup error in a collaborator and must reach the caller
/// rather than be retried.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("required program '{role}' was not supplied")]
    MissingProgram { role: &'static str },

    #[error("program '{program}' has no attribute slot '{slot}'")]
    MissingAttribute { program: String, slot: &'static str },

    #[error("program '{program}' has no uniform slot '{slot}'")]
    MissingUniform { program: String, slot: &'static str },

    #[error("program '{program}' samples '{slot}' but no texture is bound to it")]
    UnboundSampler { program: String, slot: String },

    #[error("framebuffer '{label}' is incomplete: {reason}")]
    IncompleteFramebuffer { label: String, reason: String },

    #[error("texture {texture:?} is both sampled and written by program '{program}'")]
    FeedbackLoop { program: String, texture: TextureId },

    #[error("texture {texture:?} holds {expected} texels but {actual} were supplied")]
    TexelCountMismatch {
        texture: TextureId,
        expected: usize,
        actual: usize,
    },

    #[error("draw of {requested} vertices exceeds '{attribute}' ({available} vertices)")]
    VertexRange {
        attribute: String,
        requested: u32,
        available: u32,
    },

    #[error("unknown {kind} handle {id}")]
    UnknownResource { kind: &'static str, id: u32 },

    #[error("presentation surface lost or outdated")]
    SurfaceLost,

    #[error("device error: {0}")]
    Device(String),
}

impl PipelineError {
    /// True when the caller can recover (reconfigure and try the next tick).
    pub fn is_recoverable(&self) -> bool {
        matches!(self, PipelineError::SurfaceLost)
    }
}
