use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CityError {
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("unknown building category or tool: {0}")]
    UnknownCategory(String),

    #[error("visual creation failed at ({x}, {y}): {reason}")]
    VisualCreationFailed { x: usize, y: usize, reason: String },
}

pub type Result<T> = std::result::Result<T, CityError>;
