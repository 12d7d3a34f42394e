use tracing::{debug, trace, warn};
use wgpu::util::DeviceExt;

use crate::effect::{FrameProcessor, OutputTarget};
use crate::error::EffectError;
use crate::lifecycle::FrameState;
use crate::types::{ColorPrecision, EngineState, FrameSize};

use super::context::GpuContext;
use super::pipeline::{EffectProgram, QUAD_VERTEX_COUNT};
use super::uniforms::{EffectUniforms, UniformSlots};

/// GPU objects owned by an engine between construction and release.
struct EngineResources {
    program: EffectProgram,
    uniform_buffer: wgpu::Buffer,
    uniform_bind_group: wgpu::BindGroup,
    slots: UniformSlots,
    uniforms: [EffectUniforms; 2],
}

/// Both pass slots laid out at their dynamic offsets.
fn slot_contents(slots: &UniformSlots, uniforms: &[EffectUniforms; 2]) -> Vec<u8> {
    let mut contents = vec![0u8; slots.buffer_size() as usize];
    for (mode, values) in UniformSlots::PASSES.iter().zip(uniforms.iter()) {
        let offset = slots.offset(*mode) as usize;
        let bytes = bytemuck::bytes_of(values);
        contents[offset..offset + bytes.len()].copy_from_slice(bytes);
    }
    contents
}

impl EngineResources {
    /// Records a copy of the current uniforms into the slots used by the next
    /// pass, so each frame sees the size it was recorded with.
    fn stage_uniforms(&self, device: &wgpu::Device, encoder: &mut wgpu::CommandEncoder) {
        let staging = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("effect uniform staging"),
            contents: &slot_contents(&self.slots, &self.uniforms),
            usage: wgpu::BufferUsages::COPY_SRC,
        });
        encoder.copy_buffer_to_buffer(
            &staging,
            0,
            &self.uniform_buffer,
            0,
            self.slots.buffer_size(),
        );
    }
}

/// Two-pass blurred side panel renderer.
///
/// Each frame records one render pass with two draws of the same quad: a
/// background pass magnified by [`BACKGROUND_SCALE`] and disc-blurred, then a
/// sharp foreground pass at identity, composited source-over.
///
/// [`BACKGROUND_SCALE`]: crate::BACKGROUND_SCALE
pub struct SideBlurEngine {
    gpu: GpuContext,
    precision: ColorPrecision,
    frame: FrameState,
    resources: Option<EngineResources>,
}

impl SideBlurEngine {
    /// Compiles the effect program and allocates its uniform storage.
    pub fn new(gpu: &GpuContext, precision: ColorPrecision) -> Result<Self, EffectError> {
        let device = &gpu.device;
        let format = precision.texture_format();

        device.push_error_scope(wgpu::ErrorFilter::Validation);
        let program = EffectProgram::new(device, format, gpu.compiler());
        let scope_error = pollster::block_on(device.pop_error_scope());
        let program = match (program, scope_error) {
            (Ok(program), None) => program,
            (Err(err), _) => return Err(EffectError::ShaderCompilation(format!("{err:#}"))),
            (Ok(_), Some(err)) => return Err(EffectError::ShaderCompilation(err.to_string())),
        };

        let slots = UniformSlots::new(device.limits().min_uniform_buffer_offset_alignment);
        let uniforms = UniformSlots::PASSES.map(EffectUniforms::for_pass);
        let uniform_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("effect uniforms"),
            contents: &slot_contents(&slots, &uniforms),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });
        let uniform_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("effect uniform bind group"),
            layout: &program.uniform_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                    buffer: &uniform_buffer,
                    offset: 0,
                    size: wgpu::BufferSize::new(std::mem::size_of::<EffectUniforms>() as u64),
                }),
            }],
        });

        debug!(
            ?format,
            compiler = %gpu.compiler(),
            uniform_stride = slots.stride(),
            "side blur engine ready"
        );

        Ok(Self {
            gpu: gpu.clone(),
            precision,
            frame: FrameState::new(),
            resources: Some(EngineResources {
                program,
                uniform_buffer,
                uniform_bind_group,
                slots,
                uniforms,
            }),
        })
    }

    pub fn precision(&self) -> ColorPrecision {
        self.precision
    }
}

impl FrameProcessor for SideBlurEngine {
    fn configure(&mut self, input_width: i32, input_height: i32) -> Result<FrameSize, EffectError> {
        let configured = self.frame.configure(input_width, input_height)?;
        let resources = self.resources.as_mut().ok_or(EffectError::Released)?;
        if configured.changed {
            for uniforms in resources.uniforms.iter_mut() {
                uniforms.set_resolution(configured.size);
            }
        }
        debug!(size = %configured.size, changed = configured.changed, "configured side blur");
        Ok(configured.size)
    }

    fn draw_frame(
        &mut self,
        encoder: &mut wgpu::CommandEncoder,
        input: &wgpu::Texture,
        target: &OutputTarget<'_>,
        presentation_time_us: i64,
    ) -> Result<(), EffectError> {
        let size = self.frame.begin_frame()?;
        let resources = self.resources.as_ref().ok_or(EffectError::Released)?;

        let input_size = input.size();
        if input_size.width != size.width || input_size.height != size.height {
            warn!(
                configured = %size,
                input_width = input_size.width,
                input_height = input_size.height,
                "input texture does not match configured size"
            );
        }

        let input_view = input.create_view(&wgpu::TextureViewDescriptor::default());
        let frame_bind_group = resources
            .program
            .frame_bind_group(&self.gpu.device, &input_view);

        resources.stage_uniforms(&self.gpu.device, encoder);

        let load = match target.clear {
            Some(color) => wgpu::LoadOp::Clear(color),
            None => wgpu::LoadOp::Load,
        };
        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("side blur pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: target.view,
                    depth_slice: None,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load,
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                occlusion_query_set: None,
                timestamp_writes: None,
            });
            render_pass.set_pipeline(&resources.program.pipeline);
            render_pass.set_vertex_buffer(0, resources.program.vertex_buffer.slice(..));
            render_pass.set_bind_group(1, &frame_bind_group, &[]);
            // Background first so the sharp frame composites over it.
            for mode in UniformSlots::PASSES {
                render_pass.set_bind_group(
                    0,
                    &resources.uniform_bind_group,
                    &[resources.slots.offset(mode)],
                );
                render_pass.draw(0..QUAD_VERTEX_COUNT, 0..1);
            }
        }

        trace!(pts_us = presentation_time_us, size = %size, "recorded side blur frame");
        self.frame.finish_frame();
        Ok(())
    }

    fn release(&mut self) {
        if self.frame.release() {
            debug!("releasing side blur engine");
        }
        // Dropping the handles keeps already-recorded frames valid until
        // the host submits them.
        self.resources = None;
    }

    fn output_format(&self) -> wgpu::TextureFormat {
        self.precision.texture_format()
    }

    fn state(&self) -> EngineState {
        self.frame.state()
    }

    fn size(&self) -> Option<FrameSize> {
        self.frame.size()
    }

    fn gpu(&self) -> &GpuContext {
        &self.gpu
    }
}

impl Drop for SideBlurEngine {
    fn drop(&mut self) {
        self.release();
    }
}
