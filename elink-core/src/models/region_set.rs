use std::fmt::{self, Display};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::errors::{ElinkCoreError, Result};
use crate::models::{GenomeInfo, GenomicInterval};

///
/// IntervalCollection struct, an ordered set of genomic intervals with one
/// metadata record per interval.
///
/// The metadata type is declared per pipeline stage (`()` when there is none),
/// and `intervals[i]` always belongs with `meta[i]`: every reordering moves
/// both.
///
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct IntervalCollection<M = ()> {
    intervals: Vec<GenomicInterval>,
    meta: Vec<M>,
}

pub struct IntervalCollectionIterator<'a, M> {
    collection: &'a IntervalCollection<M>,
    index: usize,
}

impl<M> Default for IntervalCollection<M> {
    fn default() -> Self {
        IntervalCollection {
            intervals: Vec::new(),
            meta: Vec::new(),
        }
    }
}

impl From<Vec<GenomicInterval>> for IntervalCollection<()> {
    fn from(intervals: Vec<GenomicInterval>) -> Self {
        let meta = vec![(); intervals.len()];
        IntervalCollection { intervals, meta }
    }
}

impl<M> FromIterator<(GenomicInterval, M)> for IntervalCollection<M> {
    fn from_iter<T: IntoIterator<Item = (GenomicInterval, M)>>(iter: T) -> Self {
        let (intervals, meta): (Vec<_>, Vec<_>) = iter.into_iter().unzip();
        IntervalCollection { intervals, meta }
    }
}

impl<'a, M> Iterator for IntervalCollectionIterator<'a, M> {
    type Item = (&'a GenomicInterval, &'a M);

    fn next(&mut self) -> Option<Self::Item> {
        if self.index < self.collection.intervals.len() {
            let i = self.index;
            self.index += 1;
            Some((&self.collection.intervals[i], &self.collection.meta[i]))
        } else {
            None
        }
    }
}

impl<'a, M> IntoIterator for &'a IntervalCollection<M> {
    type Item = (&'a GenomicInterval, &'a M);
    type IntoIter = IntervalCollectionIterator<'a, M>;

    fn into_iter(self) -> Self::IntoIter {
        IntervalCollectionIterator {
            collection: self,
            index: 0,
        }
    }
}

impl<M> IntervalCollection<M> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pair intervals with their metadata; both must have the same length.
    pub fn from_parts(intervals: Vec<GenomicInterval>, meta: Vec<M>) -> Result<Self> {
        if intervals.len() != meta.len() {
            return Err(ElinkCoreError::MetadataLengthMismatch {
                intervals: intervals.len(),
                metadata: meta.len(),
            });
        }
        Ok(IntervalCollection { intervals, meta })
    }

    pub fn push(&mut self, interval: GenomicInterval, meta: M) {
        self.intervals.push(interval);
        self.meta.push(meta);
    }

    pub fn len(&self) -> usize {
        self.intervals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.intervals.is_empty()
    }

    pub fn intervals(&self) -> &[GenomicInterval] {
        &self.intervals
    }

    pub fn meta(&self) -> &[M] {
        &self.meta
    }

    pub fn get(&self, i: usize) -> Option<(&GenomicInterval, &M)> {
        Some((self.intervals.get(i)?, self.meta.get(i)?))
    }

    pub fn into_parts(self) -> (Vec<GenomicInterval>, Vec<M>) {
        (self.intervals, self.meta)
    }

    ///
    /// Every interval must sit on a chromosome of the reference.
    ///
    pub fn validate(&self, genome: &GenomeInfo) -> Result<()> {
        for interval in &self.intervals {
            genome.validate(interval)?;
        }
        Ok(())
    }

    ///
    /// Sort by chromosome name, start, then end. Metadata moves with its interval.
    ///
    pub fn sort(&mut self) {
        self.reorder_by(|a, b| {
            a.chr
                .cmp(&b.chr)
                .then_with(|| a.start.cmp(&b.start))
                .then_with(|| a.end.cmp(&b.end))
        });
    }

    ///
    /// Sort by the chromosome order of `genome`, then start and end.
    /// Chromosomes unknown to the reference go last, by name.
    ///
    pub fn sort_by_genome(&mut self, genome: &GenomeInfo) {
        self.reorder_by(|a, b| {
            let ra = genome.rank(&a.chr).unwrap_or(usize::MAX);
            let rb = genome.rank(&b.chr).unwrap_or(usize::MAX);
            ra.cmp(&rb)
                .then_with(|| a.chr.cmp(&b.chr))
                .then_with(|| a.start.cmp(&b.start))
                .then_with(|| a.end.cmp(&b.end))
                .then_with(|| a.strand.cmp(&b.strand))
        });
    }

    fn reorder_by<F>(&mut self, mut cmp: F)
    where
        F: FnMut(&GenomicInterval, &GenomicInterval) -> std::cmp::Ordering,
    {
        let mut order: Vec<usize> = (0..self.intervals.len()).collect();
        order.sort_by(|&i, &j| cmp(&self.intervals[i], &self.intervals[j]));

        let mut intervals: Vec<Option<GenomicInterval>> =
            std::mem::take(&mut self.intervals).into_iter().map(Some).collect();
        let mut meta: Vec<Option<M>> = std::mem::take(&mut self.meta).into_iter().map(Some).collect();

        for i in order {
            if let (Some(iv), Some(m)) = (intervals[i].take(), meta[i].take()) {
                self.intervals.push(iv);
                self.meta.push(m);
            }
        }
    }

    /// Keep the rows whose index is in `keep` (in the given order).
    pub fn select(&self, keep: &[usize]) -> IntervalCollection<M>
    where
        M: Clone,
    {
        keep.iter()
            .filter_map(|&i| self.get(i).map(|(iv, m)| (iv.clone(), m.clone())))
            .collect()
    }

    pub fn map_meta<N, F>(&self, f: F) -> IntervalCollection<N>
    where
        F: FnMut(&M) -> N,
    {
        IntervalCollection {
            intervals: self.intervals.clone(),
            meta: self.meta.iter().map(f).collect(),
        }
    }

    /// Same intervals, metadata dropped.
    pub fn without_meta(&self) -> IntervalCollection<()> {
        IntervalCollection::from(self.intervals.clone())
    }
}

impl<M> Display for IntervalCollection<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "IntervalCollection with {} intervals.", self.len())
    }
}
