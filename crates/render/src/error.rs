use compute::ComputeError;
use thiserror::Error;

/// Errors that abort a single frame. The caller decides whether to continue.
#[derive(Error, Debug)]
pub enum RenderError {
    #[error("no light source assigned")]
    NoLightSource,
    #[error("no ray-march kernel assigned")]
    ShaderNotAssigned,
    #[error("invalid viewport {width}x{height}")]
    InvalidViewport { width: u32, height: u32 },
    #[error("invalid render config: {0}")]
    Config(String),
    #[error(transparent)]
    Compute(#[from] ComputeError),
    #[error("scene error: {0}")]
    Scene(String),
}
