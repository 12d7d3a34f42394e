//! GPU side of the effect.
//!
//! - `context` wraps the device/queue pair the host renders with, and can
//!   stand one up headlessly for offline export and tests.
//! - `pipeline` compiles the GLSL stages into a blended render pipeline over a
//!   four-vertex triangle-strip quad.
//! - `uniforms` mirrors the std140 parameter block and lays out one slot per
//!   pass behind dynamic offsets.
//! - `engine` owns all of the above and records the two draws per frame.
//! - `textures` holds host helpers: the output texture pool, frame upload and
//!   readback.

mod context;
mod engine;
mod pipeline;
mod textures;
mod uniforms;

pub use context::{AdapterProfile, GpuContext, GpuOptions};
pub use engine::SideBlurEngine;
pub use textures::{
    check_texture_size, read_rgba8, read_rgba_f32, upload_rgba8, OutputTexture, OutputTexturePool,
};
pub use uniforms::EffectUniforms;
