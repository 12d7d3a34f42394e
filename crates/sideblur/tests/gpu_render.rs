use image::{Rgba, Rgba32FImage};
use sideblur::{
    read_rgba_f32, reference, upload_rgba8, ColorPrecision, EffectError, EngineState,
    FrameProcessor, FrameSize, GpuContext, GpuOptions, OutputTarget, OutputTexturePool,
    SideBlurEffect, VideoEffect,
};

fn gpu() -> Option<GpuContext> {
    match GpuContext::headless(GpuOptions::default()) {
        Ok(gpu) => Some(gpu),
        Err(err) => {
            eprintln!("skipping GPU test: {err}");
            None
        }
    }
}

fn solid_rgba8(size: FrameSize, pixel: [u8; 4]) -> Vec<u8> {
    pixel.repeat(size.width as usize * size.height as usize)
}

/// Runs one frame through a fresh engine and reads the output back as floats.
fn render_once(
    gpu: &GpuContext,
    high_precision: bool,
    size: FrameSize,
    pixels: &[u8],
) -> Result<(wgpu::TextureFormat, Vec<f32>), EffectError> {
    let mut engine = SideBlurEffect::new().create_engine(gpu, high_precision)?;
    engine.configure(size.width as i32, size.height as i32)?;
    let input = upload_rgba8(gpu, size, pixels)?;
    let mut pool = OutputTexturePool::new(engine.output_format(), 1);
    pool.ensure_size(&gpu.device, size)?;
    let output = pool
        .acquire()
        .ok_or_else(|| EffectError::Gpu("empty output pool".into()))?;
    engine.render_frame(&input, &OutputTarget::cleared(&output.view), 0)?;
    Ok((output.texture.format(), read_rgba_f32(gpu, &output.texture)?))
}

fn to_bytes(values: &[f32]) -> Vec<u8> {
    values
        .iter()
        .map(|v| (v.clamp(0.0, 1.0) * 255.0).round() as u8)
        .collect()
}

#[test]
fn solid_red_1080p_frame_reads_back_red() {
    let Some(gpu) = gpu() else { return };
    let size = FrameSize::new(1920, 1080).unwrap();
    let (_, values) = render_once(&gpu, false, size, &solid_rgba8(size, [255, 0, 0, 255])).unwrap();

    let pixels = to_bytes(&values);
    assert_eq!(pixels.len(), 1920 * 1080 * 4);
    assert!(pixels.chunks_exact(4).all(|p| p == [255, 0, 0, 255]));
}

#[test]
fn high_precision_output_is_half_float() {
    let Some(gpu) = gpu() else { return };
    let engine = SideBlurEffect::new()
        .create_render_engine(&gpu, ColorPrecision::High)
        .unwrap();
    assert_eq!(engine.output_format(), wgpu::TextureFormat::Rgba16Float);

    let size = FrameSize::new(32, 18).unwrap();
    let (format, values) =
        render_once(&gpu, true, size, &solid_rgba8(size, [0, 255, 0, 255])).unwrap();
    assert_eq!(format, wgpu::TextureFormat::Rgba16Float);
    for pixel in values.chunks_exact(4) {
        assert!((pixel[1] - 1.0).abs() < 1e-3, "{pixel:?}");
        assert!(pixel[0].abs() < 1e-3);
    }
}

#[test]
fn draw_before_configure_is_rejected() {
    let Some(gpu) = gpu() else { return };
    let mut engine = SideBlurEffect::new().create_engine(&gpu, false).unwrap();
    assert_eq!(engine.state(), EngineState::Uninitialized);

    let size = FrameSize::new(4, 4).unwrap();
    let input = upload_rgba8(&gpu, size, &solid_rgba8(size, [0, 0, 0, 255])).unwrap();
    let mut pool = OutputTexturePool::new(engine.output_format(), 1);
    pool.ensure_size(&gpu.device, size).unwrap();
    let output = pool.acquire().unwrap();
    let err = engine
        .render_frame(&input, &OutputTarget::cleared(&output.view), 0)
        .unwrap_err();
    assert!(matches!(err, EffectError::NotConfigured));
}

#[test]
fn configure_validates_and_echoes_size() {
    let Some(gpu) = gpu() else { return };
    let mut engine = SideBlurEffect::new().create_engine(&gpu, false).unwrap();

    assert!(matches!(
        engine.configure(0, 1080),
        Err(EffectError::InvalidDimensions { width: 0, height: 1080 })
    ));
    assert_eq!(engine.state(), EngineState::Uninitialized);

    let size = engine.configure(1080, 1920).unwrap();
    assert_eq!((size.width, size.height), (1080, 1920));
    assert_eq!(engine.state(), EngineState::Configured);

    assert!(engine.configure(-5, 10).is_err());
    assert_eq!(engine.size(), Some(size));
}

#[test]
fn release_twice_then_draw_reports_released() {
    let Some(gpu) = gpu() else { return };
    let mut engine = SideBlurEffect::new().create_engine(&gpu, false).unwrap();
    engine.configure(8, 8).unwrap();
    engine.release();
    engine.release();
    assert_eq!(engine.state(), EngineState::Released);

    let size = FrameSize::new(8, 8).unwrap();
    let input = upload_rgba8(&gpu, size, &solid_rgba8(size, [0, 0, 0, 255])).unwrap();
    let mut pool = OutputTexturePool::new(engine.output_format(), 1);
    pool.ensure_size(&gpu.device, size).unwrap();
    let output = pool.acquire().unwrap();
    assert!(matches!(
        engine.render_frame(&input, &OutputTarget::cleared(&output.view), 0),
        Err(EffectError::Released)
    ));
    assert!(matches!(engine.configure(8, 8), Err(EffectError::Released)));
}

fn letterboxed_band(width: u32, height: u32) -> Rgba32FImage {
    let mut image = Rgba32FImage::from_pixel(width, height, Rgba([0.0; 4]));
    let band = height / 3..height * 2 / 3;
    for (x, y, pixel) in image.enumerate_pixels_mut() {
        if band.contains(&y) {
            let t = x as f32 / width as f32;
            *pixel = Rgba([1.0, t, 0.0, 1.0]);
        }
    }
    image
}

fn to_rgba8(image: &Rgba32FImage) -> Vec<u8> {
    to_bytes(image.as_raw())
}

#[test]
fn transparent_bars_are_filled_and_centre_stays_sharp() {
    let Some(gpu) = gpu() else { return };
    let input = letterboxed_band(60, 180);
    let pixels = to_rgba8(&input);
    let size = FrameSize::new(60, 180).unwrap();
    let (_, values) = render_once(&gpu, false, size, &pixels).unwrap();
    let out = to_bytes(&values);
    let at = |x: usize, y: usize| &out[(y * 60 + x) * 4..(y * 60 + x) * 4 + 4];

    let centre = at(30, 90);
    let source = &pixels[(90 * 60 + 30) * 4..(90 * 60 + 30) * 4 + 4];
    for (a, b) in centre.iter().zip(source) {
        assert!(a.abs_diff(*b) <= 1, "centre {centre:?} vs input {source:?}");
    }

    let margin = at(30, 58);
    assert!(margin[0] > 100, "bar should carry blurred colour: {margin:?}");
    assert!(margin[3] > 100);
}

fn quantised(pixels: &[u8], size: FrameSize) -> Rgba32FImage {
    Rgba32FImage::from_raw(
        size.width,
        size.height,
        pixels.iter().map(|&b| f32::from(b) / 255.0).collect(),
    )
    .unwrap()
}

fn assert_close_to_reference(gpu_values: &[f32], input: &Rgba32FImage, size: FrameSize) {
    let cpu = reference::render(input, size, None);
    assert_eq!(gpu_values.len(), cpu.as_raw().len());

    let mut max_diff = 0.0f32;
    let mut total = 0.0f32;
    for (a, b) in gpu_values.iter().zip(cpu.as_raw()) {
        let diff = (a - b).abs();
        max_diff = max_diff.max(diff);
        total += diff;
    }
    let mean = total / gpu_values.len() as f32;
    assert!(mean < 0.01, "mean difference {mean}");
    assert!(max_diff < 0.1, "max difference {max_diff}");
}

#[test]
fn gpu_matches_cpu_reference() {
    let Some(gpu) = gpu() else { return };
    let pixels = to_rgba8(&letterboxed_band(48, 96));
    let size = FrameSize::new(48, 96).unwrap();

    let (_, gpu_values) = render_once(&gpu, true, size, &pixels).unwrap();
    assert_close_to_reference(&gpu_values, &quantised(&pixels, size), size);
}

#[test]
fn recorded_frame_keeps_its_size_across_reconfigure() {
    let Some(gpu) = gpu() else { return };
    let size = FrameSize::new(64, 64).unwrap();
    let pixels = to_rgba8(&letterboxed_band(64, 64));
    let mut engine = SideBlurEffect::new().create_engine(&gpu, true).unwrap();
    engine.configure(64, 64).unwrap();
    let input = upload_rgba8(&gpu, size, &pixels).unwrap();
    let mut pool = OutputTexturePool::new(engine.output_format(), 1);
    pool.ensure_size(&gpu.device, size).unwrap();
    let output = pool.acquire().unwrap();

    let mut encoder = gpu
        .device
        .create_command_encoder(&wgpu::CommandEncoderDescriptor { label: None });
    engine
        .draw_frame(&mut encoder, &input, &OutputTarget::cleared(&output.view), 0)
        .unwrap();
    // Reconfigure before the recorded frame is submitted.
    engine.configure(4, 4).unwrap();
    gpu.queue.submit(std::iter::once(encoder.finish()));

    let values = read_rgba_f32(&gpu, &output.texture).unwrap();
    assert_close_to_reference(&values, &quantised(&pixels, size), size);
}

#[test]
fn release_between_record_and_submit_is_safe() {
    let Some(gpu) = gpu() else { return };
    let size = FrameSize::new(16, 16).unwrap();
    let mut engine = SideBlurEffect::new().create_engine(&gpu, false).unwrap();
    engine.configure(16, 16).unwrap();
    let input = upload_rgba8(&gpu, size, &solid_rgba8(size, [255, 0, 0, 255])).unwrap();
    let mut pool = OutputTexturePool::new(engine.output_format(), 1);
    pool.ensure_size(&gpu.device, size).unwrap();
    let output = pool.acquire().unwrap();

    let mut encoder = gpu
        .device
        .create_command_encoder(&wgpu::CommandEncoderDescriptor { label: None });
    engine
        .draw_frame(&mut encoder, &input, &OutputTarget::cleared(&output.view), 0)
        .unwrap();
    engine.release();
    drop(input);
    gpu.queue.submit(std::iter::once(encoder.finish()));

    assert_eq!(engine.state(), EngineState::Released);
    let pixels = to_bytes(&read_rgba_f32(&gpu, &output.texture).unwrap());
    assert!(pixels.chunks_exact(4).all(|p| p == [255, 0, 0, 255]));
}

#[test]
fn pool_release_before_submit_is_safe() {
    let Some(gpu) = gpu() else { return };
    let size = FrameSize::new(8, 8).unwrap();
    let mut engine = SideBlurEffect::new().create_engine(&gpu, false).unwrap();
    engine.configure(8, 8).unwrap();
    let input = upload_rgba8(&gpu, size, &solid_rgba8(size, [0, 0, 255, 255])).unwrap();
    let mut pool = OutputTexturePool::new(engine.output_format(), 2);
    pool.ensure_size(&gpu.device, size).unwrap();

    let mut encoder = gpu
        .device
        .create_command_encoder(&wgpu::CommandEncoderDescriptor { label: None });
    let output = pool.acquire().unwrap();
    engine
        .draw_frame(&mut encoder, &input, &OutputTarget::cleared(&output.view), 0)
        .unwrap();
    pool.release_all();
    assert!(pool.size().is_none());
    gpu.queue.submit(std::iter::once(encoder.finish()));
    gpu.wait_idle().unwrap();
}

#[test]
fn oversized_frames_are_rejected_before_allocation() {
    let Some(gpu) = gpu() else { return };
    let max = gpu.device.limits().max_texture_dimension_2d;
    let Some(size) = i32::try_from(max)
        .ok()
        .and_then(|side| FrameSize::new(side.saturating_add(1), 1).ok())
    else {
        return;
    };
    let mut pool = OutputTexturePool::new(wgpu::TextureFormat::Rgba8Unorm, 1);
    assert!(matches!(
        pool.ensure_size(&gpu.device, size),
        Err(EffectError::Gpu(_))
    ));
    assert!(pool.acquire().is_none());
    assert!(matches!(
        upload_rgba8(&gpu, size, &solid_rgba8(size, [0, 0, 0, 255])),
        Err(EffectError::Gpu(_))
    ));
}
