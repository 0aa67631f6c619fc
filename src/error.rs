// error.rs — configuration and runtime errors of the viewer

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("invalid dynamic config: wrap requires min == 0 (got min = {min})")]
    WrapWithNonZeroMin { min: f64 },

    #[error("unknown speed unit \"{0}\"")]
    UnknownSpeedUnit(String),

    #[error("unknown angle \"{0}\"")]
    UnknownAngle(String),

    #[error("unknown angle unit \"{0}\"")]
    UnknownAngleUnit(String),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Error)]
pub enum ViewerError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The load was superseded by a newer `begin_load` call.
    #[error("loading was aborted")]
    Aborted,

    #[error("current adapter does not support texture coordinates or no texture has been loaded")]
    NoTextureData,

    #[error("texture position is outside of the panorama")]
    InvalidTextureCoords,

    #[error("failed to read configuration: {0}")]
    Json(#[from] serde_json::Error),

    #[error("failed to read configuration: {0}")]
    Io(#[from] std::io::Error),
}

impl ViewerError {
    /// Distinguishes "you were pre-empted" from an actual failure.
    pub fn is_abort(&self) -> bool {
        matches!(self, ViewerError::Aborted)
    }
}

pub type Result<T, E = ViewerError> = std::result::Result<T, E>;
