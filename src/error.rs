//! Error types for the center-of-mass overlay library.

use thiserror::Error;

/// Main error type for the library
#[derive(Error, Debug)]
pub enum Error {
    /// `OpenCV` operation failed
    #[error("OpenCV error: {0}")]
    OpenCV(#[from] opencv::Error),

    /// `ONNX` Runtime inference failed
    #[error("ONNX Runtime error: {0}")]
    OnnxRuntime(#[from] ort::OrtError),

    /// File I/O operation failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid input parameters provided (subject mass, thresholds, indices)
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// The frame source (video file or camera) could not be opened
    #[error("Failed to open source: {0}")]
    SourceOpen(String),

    /// The frame sink (output container or display) could not be opened
    #[error("Failed to open sink: {0}")]
    SinkOpen(String),

    /// A file source failed mid-stream
    #[error("Decode error: {0}")]
    Decode(String),

    /// Flushing or closing the output failed; the output is not usable
    #[error("Failed to finalize output: {0}")]
    Finalize(String),

    /// A single frame could not be converted, annotated or emitted
    #[error("Frame processing error: {0}")]
    FrameProcessing(String),

    /// Center-of-mass computation refused its inputs
    #[error("Center of mass estimation error: {0}")]
    Estimation(String),

    /// Model loading or inference error
    #[error("Model error: {0}")]
    ModelError(String),

    /// Model output processing error
    #[error("Model output error: {0}")]
    ModelOutputError(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl Error {
    /// Whether this error only affects the frame it was raised on.
    ///
    /// The pipeline recovers from these locally and keeps the run going.
    #[must_use]
    pub const fn is_frame_local(&self) -> bool {
        matches!(
            self,
            Self::FrameProcessing(_) | Self::Estimation(_) | Self::OpenCV(_) | Self::ModelOutputError(_)
        )
    }
}

/// Convenience type alias for Results with our Error type
pub type Result<T> = std::result::Result<T, Error>;
