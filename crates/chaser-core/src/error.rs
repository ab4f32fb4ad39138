//! Error types for Mouse Chaser.

use thiserror::Error;

/// Main error type for Mouse Chaser operations.
#[derive(Error, Debug)]
pub enum ChaserError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Decoder error: {0}")]
    Decoder(String),

    #[error("Encoder error: {0}")]
    Encoder(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Video contains no decodable frames: {0}")]
    EmptyVideo(String),

    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    /// A collaborator handed over pixel data that does not match the
    /// declared or established frame shape.
    #[error("Frame shape mismatch: expected {expected}, got {actual}")]
    ShapeMismatch { expected: String, actual: String },

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("No video loaded")]
    NoVideoLoaded,

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl ChaserError {
    /// Whether the error is a contract violation that must stop the engine.
    ///
    /// Everything else is reported to the operator and the engine keeps
    /// running with its previous state.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::ShapeMismatch { .. })
    }
}

/// Result type alias for Mouse Chaser operations.
pub type Result<T> = std::result::Result<T, ChaserError>;
