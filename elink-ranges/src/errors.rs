use thiserror::Error;

use elink_core::ElinkCoreError;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum AnnotationError {
    #[error(transparent)]
    Core(#[from] ElinkCoreError),

    #[error("Feature of transcript {transcript_id} ends at {end}, past the end of {chr} ({length})")]
    FeatureOutOfBounds {
        transcript_id: String,
        chr: String,
        end: u32,
        length: u32,
    },

    #[error("Unknown feature type: {0}")]
    UnknownFeatureType(String),

    #[error("Unknown transcript type: {0}")]
    UnknownTxType(String),

    #[error("Got {regions} regions but {peaks} peak positions")]
    PeakCountMismatch { regions: usize, peaks: usize },
}

pub type Result<T> = std::result::Result<T, AnnotationError>;
