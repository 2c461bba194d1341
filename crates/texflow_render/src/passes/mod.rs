//! The per-tick passes
//!
//! Each pass is a free function over a [`GpuBackend`](crate::backend::GpuBackend):
//! it picks the read and write resources for this tick and issues one draw.
//! Ordering between passes is the caller's job (see [`crate::driver`]).

pub mod collision;
pub mod render;
pub mod update;

/// Pass names used for profiling and logs.
pub const COLLISION: &str = "collision";
pub const UPDATE: &str = "update";
pub const RENDER: &str = "render";
pub const SHOW_TEXTURE: &str = "show_texture";
