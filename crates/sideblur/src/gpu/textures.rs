use std::sync::mpsc;

use wgpu::util::{DeviceExt, TextureDataOrder};

use crate::error::EffectError;
use crate::types::FrameSize;

use super::context::GpuContext;

const COPY_ROW_ALIGNMENT: u32 = wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;

/// Output texture handed to the engine as a render target.
#[derive(Debug)]
pub struct OutputTexture {
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
}

/// Fixed-capacity set of output textures sized to the configured frame.
#[derive(Debug)]
pub struct OutputTexturePool {
    format: wgpu::TextureFormat,
    capacity: usize,
    size: Option<FrameSize>,
    slots: Vec<OutputTexture>,
    next: usize,
}

impl OutputTexturePool {
    pub fn new(format: wgpu::TextureFormat, capacity: usize) -> Self {
        Self {
            format,
            capacity: capacity.max(1),
            size: None,
            slots: Vec::new(),
            next: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn format(&self) -> wgpu::TextureFormat {
        self.format
    }

    pub fn size(&self) -> Option<FrameSize> {
        self.size
    }

    /// Reallocates every slot when `size` differs from the current allocation.
    pub fn ensure_size(
        &mut self,
        device: &wgpu::Device,
        size: FrameSize,
    ) -> Result<(), EffectError> {
        if self.size == Some(size) && self.slots.len() == self.capacity {
            return Ok(());
        }
        check_texture_size(device, size)?;
        self.release_all();
        self.slots = (0..self.capacity)
            .map(|index| {
                let texture = device.create_texture(&wgpu::TextureDescriptor {
                    label: Some(&format!("effect output #{index}")),
                    size: size.extent(),
                    mip_level_count: 1,
                    sample_count: 1,
                    dimension: wgpu::TextureDimension::D2,
                    format: self.format,
                    usage: wgpu::TextureUsages::RENDER_ATTACHMENT
                        | wgpu::TextureUsages::TEXTURE_BINDING
                        | wgpu::TextureUsages::COPY_SRC,
                    view_formats: &[],
                });
                let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
                OutputTexture { texture, view }
            })
            .collect();
        self.size = Some(size);
        tracing::debug!(%size, capacity = self.capacity, format = ?self.format, "allocated output textures");
        Ok(())
    }

    /// Next texture in round-robin order, or `None` before `ensure_size`.
    pub fn acquire(&mut self) -> Option<&OutputTexture> {
        if self.slots.is_empty() {
            return None;
        }
        let index = self.next % self.slots.len();
        self.next = (index + 1) % self.slots.len();
        self.slots.get(index)
    }

    /// Drops every slot. Frames already recorded against a slot stay valid.
    pub fn release_all(&mut self) {
        self.slots.clear();
        self.size = None;
        self.next = 0;
    }
}

impl Drop for OutputTexturePool {
    fn drop(&mut self) {
        self.release_all();
    }
}

fn exceeds_limit(size: FrameSize, max_dimension: u32) -> bool {
    size.width > max_dimension || size.height > max_dimension
}

/// Fails when `size` is larger than the device allows for a 2D texture.
pub fn check_texture_size(device: &wgpu::Device, size: FrameSize) -> Result<(), EffectError> {
    let max = device.limits().max_texture_dimension_2d;
    if exceeds_limit(size, max) {
        return Err(EffectError::Gpu(format!(
            "{size} exceeds the device texture limit of {max} pixels per side"
        )));
    }
    Ok(())
}

/// Uploads tightly packed RGBA8 pixels as a sampled input frame.
pub fn upload_rgba8(
    gpu: &GpuContext,
    size: FrameSize,
    pixels: &[u8],
) -> Result<wgpu::Texture, EffectError> {
    let expected = size.width as usize * size.height as usize * 4;
    if pixels.len() != expected {
        return Err(EffectError::Gpu(format!(
            "frame upload expected {expected} bytes for {size}, got {}",
            pixels.len()
        )));
    }
    check_texture_size(&gpu.device, size)?;
    Ok(gpu.device.create_texture_with_data(
        &gpu.queue,
        &wgpu::TextureDescriptor {
            label: Some("input frame"),
            size: size.extent(),
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba8Unorm,
            usage: wgpu::TextureUsages::TEXTURE_BINDING
                | wgpu::TextureUsages::COPY_DST
                | wgpu::TextureUsages::COPY_SRC,
            view_formats: &[],
        },
        TextureDataOrder::LayerMajor,
        pixels,
    ))
}

fn bytes_per_pixel(format: wgpu::TextureFormat) -> Result<u32, EffectError> {
    match format {
        wgpu::TextureFormat::Rgba8Unorm => Ok(4),
        wgpu::TextureFormat::Rgba16Float => Ok(8),
        other => Err(EffectError::Gpu(format!(
            "readback does not support {other:?}"
        ))),
    }
}

/// Pads a row to the copy alignment required for texture-to-buffer copies.
pub(crate) fn padded_bytes_per_row(unpadded: u32) -> u32 {
    unpadded.div_ceil(COPY_ROW_ALIGNMENT) * COPY_ROW_ALIGNMENT
}

/// Reads a texture back as normalised RGBA floats, row-major from the top.
pub fn read_rgba_f32(gpu: &GpuContext, texture: &wgpu::Texture) -> Result<Vec<f32>, EffectError> {
    let format = texture.format();
    let bpp = bytes_per_pixel(format)?;
    let wgpu::Extent3d { width, height, .. } = texture.size();
    let unpadded = width * bpp;
    let padded = padded_bytes_per_row(unpadded);

    let buffer = gpu.device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("effect readback"),
        size: u64::from(padded) * u64::from(height),
        usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    });
    let mut encoder = gpu
        .device
        .create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("readback encoder"),
        });
    encoder.copy_texture_to_buffer(
        wgpu::TexelCopyTextureInfo {
            texture,
            mip_level: 0,
            origin: wgpu::Origin3d::ZERO,
            aspect: wgpu::TextureAspect::All,
        },
        wgpu::TexelCopyBufferInfo {
            buffer: &buffer,
            layout: wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(padded),
                rows_per_image: Some(height),
            },
        },
        texture.size(),
    );
    gpu.queue.submit(std::iter::once(encoder.finish()));

    let slice = buffer.slice(..);
    let (tx, rx) = mpsc::channel();
    slice.map_async(wgpu::MapMode::Read, move |result| {
        let _ = tx.send(result);
    });
    gpu.wait_idle()?;
    rx.recv()
        .map_err(EffectError::gpu)?
        .map_err(EffectError::gpu)?;

    let mut out = Vec::with_capacity(width as usize * height as usize * 4);
    {
        let data = slice.get_mapped_range();
        for row in data.chunks(padded as usize).take(height as usize) {
            let row = &row[..unpadded as usize];
            match format {
                wgpu::TextureFormat::Rgba16Float => out.extend(
                    row.chunks_exact(2)
                        .map(|c| half::f16::from_le_bytes([c[0], c[1]]).to_f32()),
                ),
                _ => out.extend(row.iter().map(|&b| f32::from(b) / 255.0)),
            }
        }
    }
    buffer.unmap();
    Ok(out)
}

/// Reads a texture back as tightly packed RGBA8.
pub fn read_rgba8(gpu: &GpuContext, texture: &wgpu::Texture) -> Result<Vec<u8>, EffectError> {
    Ok(read_rgba_f32(gpu, texture)?
        .into_iter()
        .map(|value| (value.clamp(0.0, 1.0) * 255.0).round() as u8)
        .collect())
}
