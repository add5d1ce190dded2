//! Error types for loading data, training and reporting.

use thiserror::Error;

/// Errors that can occur anywhere in the pipeline.
#[derive(Debug, Error)]
pub enum SoftmaxError {
    /// Filesystem failure while reading a dataset or writing a report.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed CSV at the reader level (bad quoting, invalid UTF-8, ...).
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// A dataset record could not be turned into a sample.
    #[error("line {line}: {message}")]
    Parse { line: u64, message: String },

    /// A malformed IDX image or label file.
    #[error("IDX error: {0}")]
    Idx(String),

    /// Label outside `0..num_classes`.
    #[error("label {label} out of range for {num_classes} classes")]
    InvalidLabel { label: usize, num_classes: usize },

    /// A dataset with no samples.
    #[error("dataset is empty")]
    EmptyDataset,

    /// Matrix arguments with incompatible shapes.
    #[error("shape mismatch in {context}: expected {expected:?}, found {found:?}")]
    ShapeMismatch {
        context: &'static str,
        expected: (usize, usize),
        found: (usize, usize),
    },

    /// Invalid hyperparameters.
    #[error("invalid config: {0}")]
    InvalidConfig(String),

    /// PNG encoding failure.
    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    /// Plot rendering failure.
    #[error("plot error: {0}")]
    Plot(String),
}

/// Result type used throughout the crate.
pub type Result<T> = std::result::Result<T, SoftmaxError>;
