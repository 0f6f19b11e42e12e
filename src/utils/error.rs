//! Error Handling Module
//!
//! Defines the error type shared by the dataset adapters, models, the
//! training loop, the result aggregator and the GAN driver.

use std::path::PathBuf;

use thiserror::Error;

/// Main error type for lab operations
#[derive(Error, Debug)]
pub enum LabError {
    /// Flattened feature count differs from the size the classifier was built for
    #[error("Shape mismatch in {context}: expected {expected} features, got {actual}")]
    ShapeMismatch {
        context: String,
        expected: usize,
        actual: usize,
    },

    /// Result table received a curve mapping that does not cover every column
    #[error("Not enough columns: table has {expected}, curves provide {actual}")]
    ColumnMismatch { expected: usize, actual: usize },

    /// Indexed access past the end of a dataset
    #[error("Index {index} out of range for dataset of length {len}")]
    IndexOutOfRange { index: usize, len: usize },

    /// Error with dataset operations
    #[error("Dataset error: {0}")]
    Dataset(String),

    /// Error with model construction or forward pass
    #[error("Model error: {0}")]
    Model(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Error loading or saving an image
    #[error("Image error at '{0}': {1}")]
    Image(PathBuf, String),

    /// Error loading a model checkpoint
    #[error("Checkpoint error at '{0}': {1}")]
    Checkpoint(PathBuf, String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for LabError {
    fn from(e: serde_json::Error) -> Self {
        LabError::Serialization(e.to_string())
    }
}

/// Convenience Result type for lab operations
pub type Result<T> = std::result::Result<T, LabError>;

/// Extension trait for adding context to errors
pub trait ResultExt<T> {
    /// Add context with a closure (lazy evaluation)
    fn with_context<F: FnOnce() -> String>(self, f: F) -> Result<T>;
}

impl<T, E: std::error::Error> ResultExt<T> for std::result::Result<T, E> {
    fn with_context<F: FnOnce() -> String>(self, f: F) -> Result<T> {
        self.map_err(|e| LabError::Dataset(format!("{}: {}", f(), e)))
    }
}
