use crate::error::EffectError;
use crate::gpu::{GpuContext, SideBlurEngine};
use crate::types::{ColorPrecision, EngineState, FrameSize};

/// Output surface the host has selected for the current frame.
#[derive(Debug, Clone, Copy)]
pub struct OutputTarget<'a> {
    pub view: &'a wgpu::TextureView,
    /// Colour the target is cleared to before drawing; `None` keeps its contents.
    pub clear: Option<wgpu::Color>,
}

impl<'a> OutputTarget<'a> {
    /// Target cleared to transparent black before the effect draws.
    pub fn cleared(view: &'a wgpu::TextureView) -> Self {
        Self {
            view,
            clear: Some(wgpu::Color::TRANSPARENT),
        }
    }

    /// Target whose existing contents are kept underneath the effect.
    pub fn load(view: &'a wgpu::TextureView) -> Self {
        Self { view, clear: None }
    }
}

/// A video effect that can hand out per-chain render engines.
pub trait VideoEffect {
    fn name(&self) -> &'static str;

    /// Builds one engine whose output format follows `precision`.
    fn create_render_engine(
        &self,
        gpu: &GpuContext,
        precision: ColorPrecision,
    ) -> Result<Box<dyn FrameProcessor>, EffectError>;
}

/// Stateful per-frame renderer driven by the host on the graphics thread.
pub trait FrameProcessor {
    /// Announces the input resolution and returns the output resolution.
    fn configure(&mut self, input_width: i32, input_height: i32) -> Result<FrameSize, EffectError>;

    /// Records the effect for one input frame into `encoder`.
    fn draw_frame(
        &mut self,
        encoder: &mut wgpu::CommandEncoder,
        input: &wgpu::Texture,
        target: &OutputTarget<'_>,
        presentation_time_us: i64,
    ) -> Result<(), EffectError>;

    /// Frees GPU resources. Safe to call more than once.
    fn release(&mut self);

    fn output_format(&self) -> wgpu::TextureFormat;

    fn state(&self) -> EngineState;

    fn size(&self) -> Option<FrameSize>;

    fn gpu(&self) -> &GpuContext;

    /// Records and submits one frame, for hosts without their own encoder.
    fn render_frame(
        &mut self,
        input: &wgpu::Texture,
        target: &OutputTarget<'_>,
        presentation_time_us: i64,
    ) -> Result<(), EffectError> {
        let mut encoder = self
            .gpu()
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("effect frame encoder"),
            });
        self.draw_frame(&mut encoder, input, target, presentation_time_us)?;
        self.gpu().queue.submit(std::iter::once(encoder.finish()));
        Ok(())
    }
}

/// Fills letterbox margins with a magnified, blurred copy of the frame.
#[derive(Debug, Clone, Copy, Default)]
pub struct SideBlurEffect;

impl SideBlurEffect {
    pub fn new() -> Self {
        Self
    }

    /// Concrete counterpart of [`VideoEffect::create_render_engine`].
    pub fn create_engine(
        &self,
        gpu: &GpuContext,
        high_precision_color: bool,
    ) -> Result<SideBlurEngine, EffectError> {
        SideBlurEngine::new(gpu, ColorPrecision::from_high_precision(high_precision_color))
    }
}

impl VideoEffect for SideBlurEffect {
    fn name(&self) -> &'static str {
        "side-blur"
    }

    fn create_render_engine(
        &self,
        gpu: &GpuContext,
        precision: ColorPrecision,
    ) -> Result<Box<dyn FrameProcessor>, EffectError> {
        Ok(Box::new(SideBlurEngine::new(gpu, precision)?))
    }
}
