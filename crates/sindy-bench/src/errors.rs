use std::error::Error as StdError;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Custom error types for the benchmark runner
#[derive(Error, Debug)]
pub enum BenchError {
    #[error("Invalid configuration: {0}")]
    ConfigError(String),

    #[error("Unsupported {selector}: {value}")]
    UnsupportedStrategy {
        selector: &'static str,
        value: String,
    },

    #[error("dt is required: provide --dt or set dt in system.yaml")]
    MissingTimeStep,

    #[error("Dataset not found: {}(.npz/.npy/.csv)", .0.display())]
    DatasetNotFound(PathBuf),

    #[error("Unsupported data format: {}", .0.display())]
    UnsupportedFormat(PathBuf),

    #[error("dims mismatch: spec.dims={expected} but X.shape={actual:?}")]
    DimsMismatch {
        expected: usize,
        actual: (usize, usize),
    },

    #[error("Failed to read dataset {}: {reason}", .path.display())]
    DataError { path: PathBuf, reason: String },

    #[error("Model error: {0}")]
    ModelError(String),

    #[error("Model panicked: {0}")]
    ModelPanic(String),

    #[error("Cannot find coefficients on the fitted model: {0}")]
    CoefficientsUnavailable(String),

    #[error("Failed to write {}: {reason}", .path.display())]
    ArtifactError { path: PathBuf, reason: String },

    #[error("Failed to parse JSON: {0}")]
    JsonParseError(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    IoError(#[from] io::Error),
}

/// Result type for benchmark operations
pub type BenchResult<T> = Result<T, BenchError>;

impl BenchError {
    /// Category name written to the `error_type` field of a run record.
    pub fn kind(&self) -> &'static str {
        match self {
            BenchError::ConfigError(_)
            | BenchError::UnsupportedStrategy { .. }
            | BenchError::MissingTimeStep
            | BenchError::JsonParseError(_) => "ConfigError",
            BenchError::DatasetNotFound(_)
            | BenchError::UnsupportedFormat(_)
            | BenchError::DimsMismatch { .. }
            | BenchError::DataError { .. } => "DataError",
            BenchError::ModelError(_) | BenchError::ModelPanic(_) => "ModelError",
            BenchError::CoefficientsUnavailable(_) => "CoefficientError",
            BenchError::ArtifactError { .. } | BenchError::IoError(_) => "IoError",
        }
    }

    pub(crate) fn data<E: std::fmt::Display>(path: impl Into<PathBuf>, err: E) -> Self {
        BenchError::DataError {
            path: path.into(),
            reason: err.to_string(),
        }
    }
}

/// Utility functions for working with BenchError
pub mod util {
    use super::*;

    /// Render an error and every `source()` beneath it, one cause per line.
    pub fn render_chain(err: &(dyn StdError + 'static)) -> String {
        let mut out = format!("Error: {}", err);
        let mut causes = Vec::new();
        let mut source = err.source();
        while let Some(cause) = source {
            causes.push(cause.to_string());
            source = cause.source();
        }
        if !causes.is_empty() {
            out.push_str("\n\nCaused by:");
            for (i, cause) in causes.iter().enumerate() {
                out.push_str(&format!("\n    {}: {}", i, cause));
            }
        }
        out
    }
}
