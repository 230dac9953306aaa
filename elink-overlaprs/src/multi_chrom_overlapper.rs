//! Genome-wide interval indexing.
//!
//! [`MultiChromOverlapper`] keeps one [`AIList`](crate::AIList) per chromosome.
//! Each stored interval carries the row index it came from, so hits can be
//! mapped back to the collection (and its metadata) that built the index.
//!
//! ```
//! use elink_core::models::{GenomicInterval, IntervalCollection, Strand};
//! use elink_overlaprs::multi_chrom_overlapper::IntoMultiChromOverlapper;
//!
//! let genes = IntervalCollection::from(vec![
//!     GenomicInterval::new("chr1", 1000, 2000, Strand::Plus).unwrap(),
//!     GenomicInterval::new("chr2", 1000, 3000, Strand::Minus).unwrap(),
//! ]);
//! let index = genes.into_multi_chrom_overlapper();
//!
//! let query = GenomicInterval::new("chr1", 1500, 2500, Strand::Unstranded).unwrap();
//! let rows: Vec<usize> = index.find_rows(&query).collect();
//! assert_eq!(rows, vec![0]);
//! ```

use fxhash::FxHashMap;

use elink_core::models::{GenomicInterval, Interval, IntervalCollection};

use crate::{AIList, Overlapper};

/// Half-open index coordinates of a 1-based inclusive interval.
#[inline]
pub fn index_bounds(interval: &GenomicInterval) -> (u32, u32) {
    (interval.start, interval.end.saturating_add(1))
}

/// A genome-wide index: one overlap structure per chromosome.
pub struct MultiChromOverlapper {
    index_maps: FxHashMap<String, Box<dyn Overlapper<u32, usize>>>,
    n_intervals: usize,
}

impl MultiChromOverlapper {
    /// Row indices of all stored intervals sharing a base with `query`.
    /// Strand is not looked at here.
    pub fn find_rows<'a>(&'a self, query: &GenomicInterval) -> Box<dyn Iterator<Item = usize> + 'a> {
        match self.index_maps.get(&query.chr) {
            Some(lapper) => {
                let (start, end) = index_bounds(query);
                Box::new(lapper.find_iter(start, end).map(|iv| iv.val))
            }
            None => Box::new(std::iter::empty()),
        }
    }

    /// For every query row, the stored rows it hits, as `(query_row, stored_row)`.
    pub fn find_overlaps_iter<'a, 'b, M>(
        &'a self,
        queries: &'b IntervalCollection<M>,
    ) -> impl Iterator<Item = (usize, usize)> + use<'a, 'b, M> {
        queries
            .intervals()
            .iter()
            .enumerate()
            .flat_map(move |(qi, q)| self.find_rows(q).map(move |si| (qi, si)))
    }

    pub fn has_chr(&self, chr: &str) -> bool {
        self.index_maps.contains_key(chr)
    }

    pub fn len(&self) -> usize {
        self.n_intervals
    }

    pub fn is_empty(&self) -> bool {
        self.n_intervals == 0
    }
}

/// Build a [`MultiChromOverlapper`] from something holding genomic intervals.
pub trait IntoMultiChromOverlapper {
    fn into_multi_chrom_overlapper(self) -> MultiChromOverlapper;
}

impl<M> IntoMultiChromOverlapper for &IntervalCollection<M> {
    fn into_multi_chrom_overlapper(self) -> MultiChromOverlapper {
        let mut per_chr: FxHashMap<String, Vec<Interval<u32, usize>>> = FxHashMap::default();

        // group by chromosome, remembering the source row
        for (row, region) in self.intervals().iter().enumerate() {
            let (start, end) = index_bounds(region);
            per_chr.entry(region.chr.clone()).or_default().push(Interval {
                start,
                end,
                val: row,
            });
        }

        let index_maps = per_chr
            .into_iter()
            .map(|(chr, ivs)| {
                let lapper: Box<dyn Overlapper<u32, usize>> = Box::new(AIList::build(ivs));
                (chr, lapper)
            })
            .collect();

        MultiChromOverlapper {
            index_maps,
            n_intervals: self.len(),
        }
    }
}

impl<M> IntoMultiChromOverlapper for IntervalCollection<M> {
    fn into_multi_chrom_overlapper(self) -> MultiChromOverlapper {
        (&self).into_multi_chrom_overlapper()
    }
}
