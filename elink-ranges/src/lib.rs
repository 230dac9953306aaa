//! Interval algebra and transcript-model annotation for elink.
//!
//! - [`IntervalRanges`]: trim, promoters, merge (with reverse map)
//! - [`annotation`]: [`TranscriptModel`], [`classify`] and dual [`annotate`]
//!
//! # Example
//!
//! ```
//! use elink_core::models::{GenomeInfo, GenomicInterval, IntervalCollection};
//! use elink_ranges::IntervalRanges;
//!
//! let genome = GenomeInfo::new(vec![("chr5", 181_538_259)]).unwrap();
//! let anchors = IntervalCollection::from(vec![
//!     GenomicInterval::unstranded("chr5", 5_009_000, 5_011_000).unwrap(),
//!     GenomicInterval::unstranded("chr5", 5_009_500, 5_012_000).unwrap(),
//! ]);
//!
//! let (anchors, report) = anchors.trim(&genome);
//! assert_eq!(report.dropped, 0);
//!
//! let merged = anchors.merge();
//! assert_eq!(merged.intervals()[0].locus(), "chr5:5009000-5012000");
//! ```

pub mod annotation;
pub mod errors;
pub mod interval_ranges;

pub use annotation::{
    FeatureType, RegionAnnotation, TranscriptFeature, TranscriptModel, TxType, annotate, classify,
};
pub use errors::AnnotationError;
pub use interval_ranges::{IntervalRanges, TrimReport};
