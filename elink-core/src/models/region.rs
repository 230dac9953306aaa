use std::fmt::{self, Display};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::errors::{ElinkCoreError, Result};
use crate::models::Strand;

///
/// GenomicInterval struct, one stranded stretch of a chromosome.
///
/// Coordinates are 1-based and both ends are inclusive, so `start == end`
/// is a single base.
///
#[derive(Eq, PartialEq, Hash, Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct GenomicInterval {
    pub chr: String,
    pub start: u32,
    pub end: u32,
    pub strand: Strand,
}

impl GenomicInterval {
    /// Build an interval, rejecting `start > end`.
    pub fn new(chr: &str, start: u32, end: u32, strand: Strand) -> Result<Self> {
        if start > end {
            return Err(ElinkCoreError::MalformedInterval {
                chr: chr.to_string(),
                start,
                end,
            });
        }
        Ok(GenomicInterval {
            chr: chr.to_string(),
            start,
            end,
            strand,
        })
    }

    pub fn unstranded(chr: &str, start: u32, end: u32) -> Result<Self> {
        Self::new(chr, start, end, Strand::Unstranded)
    }

    /// `[mid - flank, mid + flank]`, both bounds saturating.
    pub fn around(chr: &str, mid: u32, flank: u32, strand: Strand) -> Self {
        GenomicInterval {
            chr: chr.to_string(),
            start: mid.saturating_sub(flank),
            end: mid.saturating_add(flank),
            strand,
        }
    }

    ///
    /// Number of bases covered
    ///
    pub fn width(&self) -> u32 {
        debug_assert!(self.start <= self.end, "inverted interval {self}");
        self.end - self.start + 1
    }

    pub fn mid_point(&self) -> u32 {
        debug_assert!(self.start <= self.end, "inverted interval {self}");
        self.start + (self.end - self.start) / 2
    }

    /// Shares at least one base on the same chromosome with compatible strands.
    pub fn overlaps(&self, other: &GenomicInterval) -> bool {
        self.chr == other.chr
            && self.strand.is_compatible(&other.strand)
            && self.start.max(other.start) <= self.end.min(other.end)
    }

    pub fn contains_position(&self, pos: u32) -> bool {
        self.start <= pos && pos <= self.end
    }

    pub fn with_strand(&self, strand: Strand) -> GenomicInterval {
        GenomicInterval {
            strand,
            ..self.clone()
        }
    }

    /// `chr:start-end`, the identifier used for unstranded regions.
    pub fn locus(&self) -> String {
        format!("{}:{}-{}", self.chr, self.start, self.end)
    }

    /// `chr:start-end;strand`, the identifier used for stranded regions.
    pub fn stranded_locus(&self) -> String {
        format!("{};{}", self.locus(), self.strand)
    }
}

impl Display for GenomicInterval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.strand {
            Strand::Unstranded => write!(f, "{}", self.locus()),
            _ => write!(f, "{}", self.stranded_locus()),
        }
    }
}
