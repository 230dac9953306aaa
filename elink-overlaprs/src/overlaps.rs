use rayon::prelude::*;

use elink_core::models::IntervalCollection;

use crate::multi_chrom_overlapper::IntoMultiChromOverlapper;

///
/// All `(i, j)` pairs where `a[i]` and `b[j]` share at least one base on the
/// same chromosome and their strands are compatible.
///
/// The result is many-to-many and sorted by `(i, j)`. An index is built over
/// `b` and the rows of `a` are queried in parallel.
///
pub fn overlaps<A, B>(a: &IntervalCollection<A>, b: &IntervalCollection<B>) -> Vec<(usize, usize)>
where
    A: Sync,
    B: Sync,
{
    if a.is_empty() || b.is_empty() {
        return Vec::new();
    }

    let index = b.into_multi_chrom_overlapper();
    let targets = b.intervals();

    // indexed collect keeps the rows of `a` in order
    a.intervals()
        .par_iter()
        .enumerate()
        .flat_map_iter(|(i, query)| {
            let mut hits: Vec<usize> = index
                .find_rows(query)
                .filter(|&j| query.strand.is_compatible(&targets[j].strand))
                .collect();
            hits.sort_unstable();
            hits.into_iter().map(move |j| (i, j))
        })
        .collect()
}

/// Rows of `a` overlapping at least one row of `b`, as a mask.
pub fn overlap_mask<A, B>(a: &IntervalCollection<A>, b: &IntervalCollection<B>) -> Vec<bool>
where
    A: Sync,
    B: Sync,
{
    let mut mask = vec![false; a.len()];
    for (i, _) in overlaps(a, b) {
        mask[i] = true;
    }
    mask
}
