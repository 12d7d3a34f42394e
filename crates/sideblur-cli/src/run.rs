use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, bail, Context, Result};
use image::{DynamicImage, ImageFormat, RgbaImage};
use sideblur::{
    read_rgba8, upload_rgba8, ColorPrecision, FrameProcessor, FrameSize, GpuContext, GpuOptions,
    OutputTarget, OutputTexturePool, ReferenceEngine, SideBlurEffect, SideBlurEngine, VideoEffect,
};
use tracing_subscriber::EnvFilter;

use crate::cli::{EffectArgs, RenderArgs, SequenceArgs};
use crate::config::SideBlurConfig;
use crate::export::{presentation_time_us, ExportManifest, FrameRecord};
use crate::paths;
use crate::present::{self, AspectRatio};

pub fn initialise_tracing() {
    let default_filter = "warn,sideblur=info,naga=error,wgpu=error,wgpu_core=error,wgpu_hal=error";
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

/// Effect settings after merging the config file with command-line flags.
#[derive(Debug, Clone)]
struct Settings {
    aspect: Option<AspectRatio>,
    precision: ColorPrecision,
    cpu: bool,
    gpu: GpuOptions,
    fps: u32,
}

impl Settings {
    fn resolve(args: &EffectArgs, fps: Option<u32>) -> Result<Self> {
        let config_path = paths::resolve_config_file(args.config.as_deref())?;
        let config = SideBlurConfig::load(config_path.as_deref())?;

        let mut gpu = GpuOptions {
            power: args.power.unwrap_or_else(|| config.power()),
            ..GpuOptions::default()
        };
        if let Some(compiler) = args.shader_compiler.or_else(|| config.compiler()) {
            gpu.compiler = compiler;
        }

        Ok(Self {
            aspect: args.aspect.or_else(|| config.aspect()),
            precision: ColorPrecision::from_high_precision(
                args.high_precision().unwrap_or(config.output.high_precision),
            ),
            cpu: args.cpu,
            gpu,
            fps: fps.unwrap_or_else(|| config.fps()),
        })
    }
}

/// GPU engine plus the textures it renders into.
struct GpuBackend {
    gpu: GpuContext,
    engine: SideBlurEngine,
    pool: OutputTexturePool,
}

enum Backend {
    Gpu(Box<GpuBackend>),
    Cpu(ReferenceEngine),
}

impl Backend {
    fn new(settings: &Settings) -> Result<Self> {
        if settings.cpu {
            tracing::info!("rendering with the CPU reference path");
            return Ok(Self::Cpu(ReferenceEngine::new()));
        }

        let gpu = GpuContext::headless(settings.gpu).context("failed to initialise GPU")?;
        if let Some(profile) = gpu.adapter_profile() {
            tracing::info!(adapter = %profile.name, backend = ?profile.backend, "rendering on GPU");
        }
        let effect = SideBlurEffect::new();
        let engine = effect
            .create_engine(&gpu, settings.precision == ColorPrecision::High)
            .with_context(|| format!("failed to create {} engine", effect.name()))?;
        let pool = OutputTexturePool::new(engine.output_format(), 1);
        Ok(Self::Gpu(Box::new(GpuBackend { gpu, engine, pool })))
    }

    fn name(&self) -> &'static str {
        match self {
            Backend::Gpu(_) => "gpu",
            Backend::Cpu(_) => "cpu",
        }
    }

    fn output_format(&self) -> String {
        match self {
            Backend::Gpu(backend) => format!("{:?}", backend.engine.output_format()),
            Backend::Cpu(_) => "Rgba32Float".to_string(),
        }
    }

    fn configure(&mut self, width: u32, height: u32) -> Result<FrameSize> {
        if let Backend::Gpu(backend) = self {
            let max = backend.gpu.device.limits().max_texture_dimension_2d;
            check_texture_limit(width, height, max)?;
        }
        let width = i32::try_from(width).context("frame width out of range")?;
        let height = i32::try_from(height).context("frame height out of range")?;
        match self {
            Backend::Gpu(backend) => {
                let size = backend.engine.configure(width, height)?;
                backend
                    .pool
                    .ensure_size(&backend.gpu.device, size)
                    .context("failed to allocate output textures")?;
                Ok(size)
            }
            Backend::Cpu(engine) => Ok(engine.configure(width, height)?),
        }
    }

    fn process(&mut self, frame: &RgbaImage, pts_us: i64) -> Result<RgbaImage> {
        match self {
            Backend::Gpu(backend) => {
                let GpuBackend { gpu, engine, pool } = backend.as_mut();
                let size = FrameSize::new(frame.width() as i32, frame.height() as i32)?;
                let input = upload_rgba8(gpu, size, frame.as_raw())?;
                let output = pool
                    .acquire()
                    .ok_or_else(|| anyhow!("output textures were not allocated"))?;
                engine.render_frame(&input, &OutputTarget::cleared(&output.view), pts_us)?;
                let pixels = read_rgba8(gpu, &output.texture)?;
                RgbaImage::from_raw(size.width, size.height, pixels)
                    .ok_or_else(|| anyhow!("readback returned an unexpected number of bytes"))
            }
            Backend::Cpu(engine) => {
                let input = DynamicImage::ImageRgba8(frame.clone()).into_rgba32f();
                let output = engine.draw_frame(&input, pts_us)?;
                Ok(DynamicImage::ImageRgba32F(output).into_rgba8())
            }
        }
    }

    fn release(&mut self) {
        match self {
            Backend::Gpu(backend) => {
                backend.engine.release();
                backend.pool.release_all();
            }
            Backend::Cpu(engine) => engine.release(),
        }
    }
}

fn check_texture_limit(width: u32, height: u32, max: u32) -> Result<()> {
    if width > max || height > max {
        bail!(
            "frame of {width}x{height} exceeds the GPU texture limit of {max} pixels per side; \
             use a smaller --aspect canvas or --cpu"
        );
    }
    Ok(())
}

fn load_frame(path: &Path, aspect: Option<AspectRatio>) -> Result<RgbaImage> {
    let frame = image::open(path)
        .with_context(|| format!("failed to decode {}", path.display()))?
        .into_rgba8();
    Ok(match aspect {
        Some(aspect) => present::letterbox(&frame, aspect),
        None => frame,
    })
}

fn save_frame(frame: RgbaImage, path: &Path) -> Result<()> {
    let format = ImageFormat::from_path(path)
        .with_context(|| format!("unsupported output format for {}", path.display()))?;
    let result = match format {
        // JPEG has no alpha channel.
        ImageFormat::Jpeg => DynamicImage::ImageRgba8(frame).into_rgb8().save(path),
        _ => frame.save_with_format(path, format),
    };
    result.with_context(|| format!("failed to write {}", path.display()))
}

pub fn render(args: RenderArgs) -> Result<()> {
    let settings = Settings::resolve(&args.effect, None)?;
    let frame = load_frame(&args.input, settings.aspect)?;

    let mut backend = Backend::new(&settings)?;
    let size = backend.configure(frame.width(), frame.height())?;
    let output = backend.process(&frame, args.pts)?;
    backend.release();

    if let Some(parent) = args.output.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    save_frame(output, &args.output)?;
    tracing::info!(
        input = %args.input.display(),
        output = %args.output.display(),
        %size,
        renderer = backend.name(),
        "rendered frame"
    );
    Ok(())
}

fn is_frame_file(path: &Path) -> bool {
    path.is_file()
        && matches!(
            ImageFormat::from_path(path),
            Ok(ImageFormat::Png | ImageFormat::Jpeg | ImageFormat::Bmp)
        )
}

fn collect_frames(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut frames = Vec::new();
    for entry in
        fs::read_dir(dir).with_context(|| format!("failed to read directory {}", dir.display()))?
    {
        let path = entry
            .with_context(|| format!("failed to read entry in {}", dir.display()))?
            .path();
        if is_frame_file(&path) {
            frames.push(path);
        }
    }
    frames.sort();
    Ok(frames)
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}

pub fn sequence(args: SequenceArgs) -> Result<()> {
    let settings = Settings::resolve(&args.effect, args.fps)?;
    let frames = collect_frames(&args.input)?;
    if frames.is_empty() {
        bail!("no PNG, JPEG or BMP frames found in {}", args.input.display());
    }
    fs::create_dir_all(&args.output)
        .with_context(|| format!("failed to create {}", args.output.display()))?;

    let mut backend = Backend::new(&settings)?;
    let mut configured: Option<(u32, u32)> = None;
    let mut records = Vec::with_capacity(frames.len());

    for (index, source) in frames.iter().enumerate() {
        let frame = load_frame(source, settings.aspect)?;
        let dimensions = frame.dimensions();
        let reconfigure = configured != Some(dimensions);
        if reconfigure {
            let size = backend.configure(dimensions.0, dimensions.1)?;
            tracing::info!(%size, frame = index, "configured effect");
            configured = Some(dimensions);
        }

        let pts = presentation_time_us(index, settings.fps);
        let output = backend.process(&frame, pts)?;
        let output_name = source
            .file_stem()
            .map(|stem| format!("{}.png", stem.to_string_lossy()))
            .unwrap_or_else(|| format!("frame-{index:05}.png"));
        save_frame(output, &args.output.join(&output_name))?;
        tracing::debug!(frame = index, pts_us = pts, output = %output_name, "processed frame");

        records.push(FrameRecord {
            index,
            source: file_name(source),
            output: output_name,
            width: dimensions.0,
            height: dimensions.1,
            presentation_time_us: pts,
            configured: reconfigure,
        });
    }

    let manifest = ExportManifest {
        effect: SideBlurEffect::new().name().to_string(),
        renderer: backend.name().to_string(),
        output_format: backend.output_format(),
        fps: settings.fps,
        frames: records,
    };
    backend.release();
    manifest.write(&args.output)?;
    tracing::info!(
        frames = manifest.frames.len(),
        output = %args.output.display(),
        "exported sequence"
    );
    Ok(())
}
