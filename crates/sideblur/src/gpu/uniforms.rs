use bytemuck::{Pod, Zeroable};

use crate::matrix::{self, Mat4};
use crate::types::{DrawMode, FrameSize, BACKGROUND_SCALE};

/// CPU mirror of the `EffectParams` std140 block.
#[repr(C, align(16))]
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EffectUniforms {
    pub transformation: Mat4,
    pub tex_transformation: Mat4,
    pub resolution: [f32; 2],
    pub draw_mode: i32,
    pub _padding: f32,
}

unsafe impl Zeroable for EffectUniforms {}
unsafe impl Pod for EffectUniforms {}

impl EffectUniforms {
    /// Uniform values for one pass; the resolution is filled in by `configure`.
    pub fn for_pass(mode: DrawMode) -> Self {
        let transformation = match mode {
            DrawMode::Background => matrix::scale(BACKGROUND_SCALE, BACKGROUND_SCALE, 1.0),
            DrawMode::Foreground => matrix::IDENTITY,
        };
        Self {
            transformation,
            tex_transformation: matrix::IDENTITY,
            resolution: [1.0, 1.0],
            draw_mode: mode.as_uniform(),
            _padding: 0.0,
        }
    }

    pub fn set_resolution(&mut self, size: FrameSize) {
        self.resolution = size.as_vec2();
    }
}

/// Both passes live in one buffer; each slot is addressed by a dynamic offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct UniformSlots {
    stride: u64,
}

impl UniformSlots {
    pub(crate) const PASSES: [DrawMode; 2] = [DrawMode::Background, DrawMode::Foreground];

    pub(crate) fn new(min_offset_alignment: u32) -> Self {
        let size = std::mem::size_of::<EffectUniforms>() as u64;
        let align = u64::from(min_offset_alignment.max(1));
        Self {
            stride: size.div_ceil(align) * align,
        }
    }

    pub(crate) fn stride(&self) -> u64 {
        self.stride
    }

    pub(crate) fn buffer_size(&self) -> u64 {
        self.stride * Self::PASSES.len() as u64
    }

    pub(crate) fn offset(&self, mode: DrawMode) -> u32 {
        let index = match mode {
            DrawMode::Background => 0,
            DrawMode::Foreground => 1,
        };
        (self.stride * index) as u32
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::mem::{align_of, size_of};

    /// The CPU mirror must line up with the std140 block in the shaders.
    #[test]
    fn effect_uniforms_follow_std140_layout() {
        let uniforms = EffectUniforms::for_pass(DrawMode::Background);
        let base = &uniforms as *const _ as usize;

        assert_eq!(align_of::<EffectUniforms>(), 16);
        assert_eq!(size_of::<EffectUniforms>(), 144);
        assert_eq!((&uniforms.transformation as *const _ as usize) - base, 0);
        assert_eq!((&uniforms.tex_transformation as *const _ as usize) - base, 64);
        assert_eq!((&uniforms.resolution as *const _ as usize) - base, 128);
        assert_eq!((&uniforms.draw_mode as *const _ as usize) - base, 136);
    }

    #[test]
    fn passes_carry_their_matrix_and_mode() {
        let background = EffectUniforms::for_pass(DrawMode::Background);
        assert_eq!(background.draw_mode, 1);
        assert_eq!(background.transformation[0][0], 3.5);
        assert_eq!(background.transformation[1][1], 3.5);
        assert_eq!(background.transformation[2][2], 1.0);

        let foreground = EffectUniforms::for_pass(DrawMode::Foreground);
        assert_eq!(foreground.draw_mode, 2);
        assert_eq!(foreground.transformation, matrix::IDENTITY);
        assert_eq!(foreground.tex_transformation, matrix::IDENTITY);
    }

    #[test]
    fn resolution_tracks_configured_size() {
        let mut uniforms = EffectUniforms::for_pass(DrawMode::Background);
        uniforms.set_resolution(FrameSize::new(1280, 720).unwrap());
        assert_eq!(uniforms.resolution, [1280.0, 720.0]);
    }

    #[test]
    fn slots_respect_offset_alignment() {
        let slots = UniformSlots::new(256);
        assert_eq!(slots.stride(), 256);
        assert_eq!(slots.offset(DrawMode::Background), 0);
        assert_eq!(slots.offset(DrawMode::Foreground), 256);
        assert_eq!(slots.buffer_size(), 512);

        let tight = UniformSlots::new(16);
        assert_eq!(tight.stride(), 144);
        assert_eq!(tight.offset(DrawMode::Foreground), 144);
    }
}
