//! Core error types for Mycotax

use thiserror::Error;

/// Main error type for Mycotax operations
#[derive(Error, Debug)]
pub enum MycotaxError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Incompatible model components or invalid construction parameters.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Classifier input that does not normalise to an encoded tensor dataset.
    #[error("Input type error: {0}")]
    InputType(String),

    /// Failures raised by the tensor engine, shape mismatches included.
    #[error("Tensor error: {0}")]
    Tensor(#[from] candle_core::Error),

    #[error("Parsing error: {0}")]
    Parse(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Other error: {0}")]
    Other(String),
}

/// Result type alias for Mycotax operations
pub type MycotaxResult<T> = Result<T, MycotaxError>;

// Conversion implementations for common error types
impl From<serde_json::Error> for MycotaxError {
    fn from(err: serde_json::Error) -> Self {
        MycotaxError::Serialization(err.to_string())
    }
}

impl From<toml::de::Error> for MycotaxError {
    fn from(err: toml::de::Error) -> Self {
        MycotaxError::Configuration(format!("Failed to parse config: {}", err))
    }
}

impl From<toml::ser::Error> for MycotaxError {
    fn from(err: toml::ser::Error) -> Self {
        MycotaxError::Configuration(format!("Failed to serialize config: {}", err))
    }
}

impl From<anyhow::Error> for MycotaxError {
    fn from(err: anyhow::Error) -> Self {
        MycotaxError::Other(err.to_string())
    }
}
