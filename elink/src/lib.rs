//! Enhancer calling and RNA-DNA contact joins.
//!
//! Each module is a separate crate behind a feature of the same name; all of
//! them are enabled by default.
//!
//! ```
//! # fn main() -> anyhow::Result<()> {
//! use elink::core::models::{GenomeInfo, GenomicInterval, IntervalCollection, Strand};
//! use elink::ranges::IntervalRanges;
//!
//! let genome = GenomeInfo::new(vec![("chr5", 181_538_259)])?;
//! let anchors = IntervalCollection::from(vec![
//!     GenomicInterval::new("chr5", 5_009_000, 5_011_000, Strand::Unstranded)?,
//!     GenomicInterval::new("chr5", 5_009_500, 5_012_000, Strand::Unstranded)?,
//! ]);
//! anchors.validate(&genome)?;
//!
//! let merged = anchors.merge();
//! assert_eq!(merged.intervals()[0].locus(), "chr5:5009000-5012000");
//! # Ok(())
//! # }
//! ```

#[cfg(feature = "core")]
#[doc(inline)]
pub use elink_core as core;

#[cfg(feature = "overlaprs")]
#[doc(inline)]
pub use elink_overlaprs as overlaprs;

#[cfg(feature = "ranges")]
#[doc(inline)]
pub use elink_ranges as ranges;

#[cfg(feature = "signal")]
#[doc(inline)]
pub use elink_signal as signal;

#[cfg(feature = "contacts")]
#[doc(inline)]
pub use elink_contacts as contacts;
