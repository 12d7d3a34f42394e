/// Failures surfaced by the effect factory and render engine.
#[derive(Debug, thiserror::Error)]
pub enum EffectError {
    #[error("invalid input dimensions {width}x{height}; both must be positive")]
    InvalidDimensions { width: i32, height: i32 },
    #[error("draw_frame called before configure")]
    NotConfigured,
    #[error("failed to compile effect shader program: {0}")]
    ShaderCompilation(String),
    #[error("render engine has already been released")]
    Released,
    #[error("gpu error: {0}")]
    Gpu(String),
}

impl EffectError {
    pub(crate) fn gpu(err: impl std::fmt::Display) -> Self {
        EffectError::Gpu(err.to_string())
    }
}
