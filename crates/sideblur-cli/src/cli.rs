use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use sideblur::{GpuPowerPreference, ShaderCompiler};

use crate::present::AspectRatio;

#[derive(Parser, Debug)]
#[command(
    name = "sideblur",
    author,
    version,
    about = "Fill letterbox bars with a blurred, magnified copy of the frame"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Apply the effect to a single image.
    Render(RenderArgs),
    /// Apply the effect to every image in a directory as one frame sequence.
    Sequence(SequenceArgs),
}

#[derive(Args, Debug)]
pub struct RenderArgs {
    /// Source image (PNG, JPEG or BMP).
    #[arg(value_name = "INPUT")]
    pub input: PathBuf,

    /// Destination image; the format follows the extension.
    #[arg(short, long, value_name = "OUTPUT")]
    pub output: PathBuf,

    /// Presentation timestamp passed to the engine, in microseconds.
    #[arg(long, value_name = "MICROS", default_value_t = 0)]
    pub pts: i64,

    #[command(flatten)]
    pub effect: EffectArgs,
}

#[derive(Args, Debug)]
pub struct SequenceArgs {
    /// Directory of frames, processed in file name order.
    #[arg(value_name = "DIR")]
    pub input: PathBuf,

    /// Directory the processed frames and `export.json` are written to.
    #[arg(short, long, value_name = "DIR")]
    pub output: PathBuf,

    /// Frame rate used to derive presentation timestamps.
    #[arg(long, value_name = "FPS", value_parser = clap::value_parser!(u32).range(1..))]
    pub fps: Option<u32>,

    #[command(flatten)]
    pub effect: EffectArgs,
}

#[derive(Args, Debug)]
pub struct EffectArgs {
    /// Letterbox frames to this aspect ratio before the effect (e.g. `9:16`).
    #[arg(long, value_name = "W:H", value_parser = parse_aspect)]
    pub aspect: Option<AspectRatio>,

    /// Render into a 16-bit float target.
    #[arg(long, overrides_with = "no_high_precision")]
    pub high_precision: bool,

    /// Render into an 8-bit target even when the config asks for high precision.
    #[arg(long, overrides_with = "high_precision")]
    pub no_high_precision: bool,

    /// Render with the CPU reference path instead of the GPU.
    #[arg(long)]
    pub cpu: bool,

    /// Configuration file (defaults to `$SIDEBLUR_CONFIG_DIR/sideblur.toml`).
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Adapter power preference (`low` or `high`).
    #[arg(long, value_name = "PREFERENCE", value_parser = parse_power)]
    pub power: Option<GpuPowerPreference>,

    /// Shader compiler backend (`naga` or `shaderc`).
    #[arg(long, value_name = "COMPILER", value_parser = parse_shader_compiler)]
    pub shader_compiler: Option<ShaderCompiler>,
}

impl EffectArgs {
    /// Precision chosen on the command line, if any; the last flag wins.
    pub fn high_precision(&self) -> Option<bool> {
        match (self.high_precision, self.no_high_precision) {
            (true, _) => Some(true),
            (_, true) => Some(false),
            _ => None,
        }
    }
}

pub fn parse() -> Cli {
    Cli::parse()
}

pub fn parse_aspect(value: &str) -> Result<AspectRatio, String> {
    AspectRatio::parse(value)
}

pub fn parse_power(value: &str) -> Result<GpuPowerPreference, String> {
    match value.trim().to_ascii_lowercase().as_str() {
        "low" | "low-power" => Ok(GpuPowerPreference::Low),
        "high" | "high-performance" => Ok(GpuPowerPreference::High),
        "" => Err("power preference must not be empty".to_string()),
        other => Err(format!("unknown power preference '{other}' (expected low or high)")),
    }
}

pub fn parse_shader_compiler(value: &str) -> Result<ShaderCompiler, String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err("shader compiler must not be empty".to_string());
    }

    let normalized = trimmed.to_ascii_lowercase();
    match normalized.as_str() {
        "shaderc" => {
            if cfg!(feature = "shaderc") {
                Ok(ShaderCompiler::Shaderc)
            } else {
                Err("shaderc support is not enabled in this build".to_string())
            }
        }
        "naga" | "naga-glsl" => Ok(ShaderCompiler::NagaGlsl),
        _ => Err("unknown shader compiler (expected shaderc or naga)".to_string()),
    }
}
