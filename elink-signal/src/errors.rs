use thiserror::Error;

use elink_core::ElinkCoreError;
use elink_ranges::AnnotationError;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SignalError {
    #[error(transparent)]
    Core(#[from] ElinkCoreError),

    #[error(transparent)]
    Annotation(#[from] AnnotationError),

    #[error("Expected {expected} values for the matrix, got {found}")]
    ShapeMismatch { expected: usize, found: usize },

    #[error("The {0} assay has not been computed")]
    MissingAssay(&'static str),

    #[error("No sample columns for cell type {0}")]
    UnknownCellType(String),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),
}

pub type Result<T> = std::result::Result<T, SignalError>;
