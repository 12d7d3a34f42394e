use crate::error::EffectError;

/// Pixel radius of the background blur before normalisation by the frame size.
pub const BLUR_RADIUS_PX: f32 = 16.0;
/// Number of evenly spaced angles sampled around each pixel.
pub const BLUR_DIRECTIONS: u32 = 16;
/// Number of radial steps taken along each direction.
pub const BLUR_QUALITY: u32 = 3;
/// Samples averaged per background pixel, including the centre sample.
pub const BLUR_SAMPLE_COUNT: u32 = BLUR_DIRECTIONS * BLUR_QUALITY + 1;
/// Uniform magnification applied to the background quad in X and Y.
pub const BACKGROUND_SCALE: f32 = 3.5;

/// Resolution of the input stream announced through `configure`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrameSize {
    pub width: u32,
    pub height: u32,
}

impl FrameSize {
    /// Validates host-supplied dimensions; both must be strictly positive.
    pub fn new(width: i32, height: i32) -> Result<Self, EffectError> {
        if width <= 0 || height <= 0 {
            return Err(EffectError::InvalidDimensions { width, height });
        }
        Ok(Self {
            width: width as u32,
            height: height as u32,
        })
    }

    pub fn as_vec2(self) -> [f32; 2] {
        [self.width as f32, self.height as f32]
    }

    pub fn extent(self) -> wgpu::Extent3d {
        wgpu::Extent3d {
            width: self.width,
            height: self.height,
            depth_or_array_layers: 1,
        }
    }
}

impl std::fmt::Display for FrameSize {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Branch selector consumed by the fragment stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum DrawMode {
    /// Magnified, disc-blurred fill behind the frame.
    Background = 1,
    /// Unscaled, unfiltered copy of the frame.
    Foreground = 2,
}

impl DrawMode {
    pub fn as_uniform(self) -> i32 {
        self as i32
    }
}

/// Colour precision requested by the host for the effect output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ColorPrecision {
    /// 8 bits per channel, normalised.
    #[default]
    Standard,
    /// 16-bit float per channel for extended range / HDR chains.
    High,
}

impl ColorPrecision {
    pub fn from_high_precision(high: bool) -> Self {
        if high {
            Self::High
        } else {
            Self::Standard
        }
    }

    /// Colour target format used for the effect's render pipeline and output textures.
    pub fn texture_format(self) -> wgpu::TextureFormat {
        match self {
            ColorPrecision::Standard => wgpu::TextureFormat::Rgba8Unorm,
            ColorPrecision::High => wgpu::TextureFormat::Rgba16Float,
        }
    }
}

/// Shader compilation backend requested by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShaderCompiler {
    /// Compile GLSL through shaderc into SPIR-V.
    Shaderc,
    /// Hand GLSL to naga's built-in frontend.
    NagaGlsl,
}

impl Default for ShaderCompiler {
    fn default() -> Self {
        if cfg!(feature = "shaderc") {
            ShaderCompiler::Shaderc
        } else {
            ShaderCompiler::NagaGlsl
        }
    }
}

impl std::fmt::Display for ShaderCompiler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ShaderCompiler::Shaderc => f.write_str("shaderc"),
            ShaderCompiler::NagaGlsl => f.write_str("naga"),
        }
    }
}

/// Adapter selection hint for headless contexts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GpuPowerPreference {
    #[default]
    Low,
    High,
}

/// Lifecycle of a frame render engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    /// Constructed, no resolution announced yet.
    Uninitialized,
    /// A resolution is cached; no frame drawn at it yet.
    Configured,
    /// At least one frame has been drawn at the current resolution.
    Ready,
    /// GPU resources have been released.
    Released,
}
