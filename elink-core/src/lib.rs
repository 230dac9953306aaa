//! Core models shared by every elink crate.
//!
//! - [`GenomicInterval`](models::GenomicInterval): a 1-based, inclusive, stranded interval
//! - [`IntervalCollection`](models::IntervalCollection): intervals plus one typed metadata record each
//! - [`GenomeInfo`](models::GenomeInfo): the chromosome-length reference table
//! - [`Interval`](models::Interval): the half-open payload-carrying range stored in overlap indices
//!
//! # Example
//!
//! ```
//! use elink_core::models::{GenomeInfo, GenomicInterval, IntervalCollection, Strand};
//!
//! let genome = GenomeInfo::new(vec![("chr1", 248_956_422)]).unwrap();
//! let tss = GenomicInterval::new("chr1", 100, 110, Strand::Plus).unwrap();
//!
//! let regions = IntervalCollection::from(vec![tss]);
//! assert!(regions.validate(&genome).is_ok());
//! ```

pub mod errors;
pub mod models;

pub use errors::{ElinkCoreError, Result};
