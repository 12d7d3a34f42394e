//! Blurred side-panel video effect for wgpu hosts.
//!
//! Each input frame is drawn twice into the host's output texture:
//!
//! ```text
//!   input texture ──▶ pass 1: quad × 3.5, 49-tap disc blur ──┐
//!          │                                                 ├─▶ output (source-over)
//!          └────────▶ pass 2: quad × 1, plain sample ────────┘
//! ```
//!
//! The magnified background spills past the canvas, so any margin the sharp
//! frame leaves uncovered (or transparent, as with letterbox bars) shows a
//! soft, colour-matched fill instead of black.
//!
//! Hosts create a [`SideBlurEngine`] through [`SideBlurEffect`], announce the
//! input resolution with [`FrameProcessor::configure`] and then call
//! [`FrameProcessor::draw_frame`] once per frame. [`reference`] renders the
//! same composite on the CPU.

mod compile;
pub mod effect;
pub mod error;
pub mod gpu;
pub mod lifecycle;
pub mod matrix;
pub mod reference;
pub mod types;

pub use effect::{FrameProcessor, OutputTarget, SideBlurEffect, VideoEffect};
pub use error::EffectError;
pub use gpu::{
    check_texture_size, read_rgba8, read_rgba_f32, upload_rgba8, AdapterProfile, EffectUniforms,
    GpuContext, GpuOptions, OutputTexture, OutputTexturePool, SideBlurEngine,
};
pub use reference::ReferenceEngine;
pub use types::{
    ColorPrecision, DrawMode, EngineState, FrameSize, GpuPowerPreference, ShaderCompiler,
    BACKGROUND_SCALE, BLUR_DIRECTIONS, BLUR_QUALITY, BLUR_RADIUS_PX, BLUR_SAMPLE_COUNT,
};
