//! Error types for the virtual piano library.

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

    /// MIDI output initialization failed
    #[error("MIDI init error: {0}")]
    MidiInit(#[from] midir::InitError),

    /// MIDI port connection failed
    #[error("MIDI connect error: {0}")]
    MidiConnect(String),

    /// MIDI message could not be sent
    #[error("MIDI send error: {0}")]
    MidiSend(#[from] midir::SendError),

    /// File I/O operation failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Triangulation rays are parallel or otherwise unsolvable
    #[error("Degenerate stereo geometry: {0}")]
    DegenerateGeometry(String),

    /// `find_key` resolved to an index outside the keyboard
    #[error("Key index {index} outside keyboard of {total} keys")]
    KeyOutOfRange {
        /// Resolved key index
        index: usize,
        /// Total keys on the keyboard
        total: usize,
    },

    /// Invalid input parameters provided
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Model loading or inference error
    #[error("Model error: {0}")]
    ModelError(String),

    /// Model input configuration error
    #[error("Model input error: {0}")]
    ModelInputError(String),

    /// Model output processing error
    #[error("Model output error: {0}")]
    ModelOutputError(String),

    /// Model data shape or format error
    #[error("Model data format error: {0}")]
    ModelDataFormatError(String),

    /// Camera or frame-source failure
    #[error("Camera error: {0}")]
    Camera(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Convenience type alias for Results with our Error type
pub type Result<T> = std::result::Result<T, Error>;
