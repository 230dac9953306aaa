use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ElinkCoreError {
    #[error("Chromosome not found in genome info: {0}")]
    UnknownChromosome(String),

    #[error("Malformed interval {chr}:{start}-{end} (start > end)")]
    MalformedInterval { chr: String, start: u32, end: u32 },

    #[error("Chromosome listed twice in genome info: {0}")]
    DuplicateChromosome(String),

    #[error("Chromosome {0} has an invalid length of 0")]
    InvalidChromosomeLength(String),

    #[error("Metadata has {metadata} rows but the collection has {intervals} intervals")]
    MetadataLengthMismatch { intervals: usize, metadata: usize },

    #[error("Invalid strand: {0}")]
    InvalidStrand(String),
}

pub type Result<T> = std::result::Result<T, ElinkCoreError>;
