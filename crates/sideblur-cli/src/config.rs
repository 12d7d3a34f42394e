use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use sideblur::{GpuPowerPreference, ShaderCompiler};

use crate::present::AspectRatio;

pub const CONFIG_FILE_NAME: &str = "sideblur.toml";
pub const DEFAULT_FPS: u32 = 30;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SideBlurConfig {
    #[serde(default)]
    pub output: OutputSection,
    #[serde(default)]
    pub gpu: GpuSection,
    #[serde(default)]
    pub sequence: SequenceSection,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct OutputSection {
    /// Letterbox target such as `"9:16"`; unset leaves frames at their own shape.
    pub aspect: Option<String>,
    #[serde(default)]
    pub high_precision: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PowerSetting {
    #[default]
    Low,
    High,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CompilerSetting {
    #[serde(alias = "naga-glsl")]
    Naga,
    Shaderc,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct GpuSection {
    #[serde(default)]
    pub power: PowerSetting,
    pub compiler: Option<CompilerSetting>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SequenceSection {
    pub fps: Option<u32>,
}

impl SideBlurConfig {
    pub fn from_toml_str(input: &str) -> Result<Self, ConfigError> {
        let raw: SideBlurConfig = toml::from_str(input)?;
        raw.validate()?;
        Ok(raw)
    }

    /// Reads `path`, or returns defaults when `path` is `None`.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let contents = fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        let config = Self::from_toml_str(&contents)
            .with_context(|| format!("failed to load config {}", path.display()))?;
        tracing::debug!(path = %path.display(), "loaded configuration");
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(aspect) = &self.output.aspect {
            AspectRatio::parse(aspect)
                .map_err(|err| ConfigError::Invalid(format!("output.aspect: {err}")))?;
        }

        if self.sequence.fps == Some(0) {
            return Err(ConfigError::Invalid(
                "sequence.fps must be greater than zero".into(),
            ));
        }

        if self.gpu.compiler == Some(CompilerSetting::Shaderc) && !cfg!(feature = "shaderc") {
            return Err(ConfigError::Invalid(
                "gpu.compiler = \"shaderc\" requires a build with the shaderc feature".into(),
            ));
        }

        Ok(())
    }

    pub fn aspect(&self) -> Option<AspectRatio> {
        self.output
            .aspect
            .as_deref()
            .and_then(|value| AspectRatio::parse(value).ok())
    }

    pub fn power(&self) -> GpuPowerPreference {
        match self.gpu.power {
            PowerSetting::Low => GpuPowerPreference::Low,
            PowerSetting::High => GpuPowerPreference::High,
        }
    }

    pub fn compiler(&self) -> Option<ShaderCompiler> {
        self.gpu.compiler.map(|setting| match setting {
            CompilerSetting::Naga => ShaderCompiler::NagaGlsl,
            CompilerSetting::Shaderc => ShaderCompiler::Shaderc,
        })
    }

    pub fn fps(&self) -> u32 {
        self.sequence.fps.unwrap_or(DEFAULT_FPS)
    }
}
