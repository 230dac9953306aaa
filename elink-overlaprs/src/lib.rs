//! Genomic interval overlap queries for elink.
//!
//! Every overlap question in the workspace goes through this crate. The
//! building block is the [`AIList`], an augmented interval list over half-open
//! numeric ranges. [`multi_chrom_overlapper`] lifts it to a genome-wide index
//! over an [`IntervalCollection`](elink_core::models::IntervalCollection), and
//! [`overlaps`] answers the pairwise question between two collections.
//!
//! ## Quick Start
//!
//! ```rust
//! use elink_core::models::{GenomicInterval, IntervalCollection, Strand};
//! use elink_overlaprs::overlaps;
//!
//! let anchors = IntervalCollection::from(vec![
//!     GenomicInterval::new("chr5", 5_009_000, 5_011_000, Strand::Unstranded).unwrap(),
//! ]);
//! let enhancers = IntervalCollection::from(vec![
//!     GenomicInterval::new("chr5", 5_009_500, 5_009_800, Strand::Unstranded).unwrap(),
//!     GenomicInterval::new("chr5", 6_000_000, 6_000_400, Strand::Unstranded).unwrap(),
//! ]);
//!
//! assert_eq!(overlaps(&anchors, &enhancers), vec![(0, 0)]);
//! ```

/// Augmented Interval List implementation.
///
/// See [`AIList`] for details.
pub mod ailist;

pub mod multi_chrom_overlapper;
pub mod overlaps;
pub mod traits;

pub use self::ailist::AIList;
pub use self::overlaps::{overlap_mask, overlaps};
pub use self::traits::{Interval, Overlapper};
