//! Interval set algebra on [`IntervalCollection`]s.
//!
//! Provides GenomicRanges-style operations: trim, promoters and merge
//! (reduce). All coordinates are 1-based and inclusive. Merging cannot carry
//! metadata forward and returns unstranded collections with `()` metadata.

use std::ops::AddAssign;

use log::info;
use serde::Serialize;

use elink_core::models::{GenomeInfo, GenomicInterval, IntervalCollection, Strand};

/// Counts of records changed by [`IntervalRanges::trim`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TrimReport {
    /// Records kept but shortened to the chromosome bounds.
    pub clipped: usize,
    /// Records removed: unknown chromosome or entirely outside `[1, length]`.
    pub dropped: usize,
}

impl AddAssign for TrimReport {
    fn add_assign(&mut self, rhs: TrimReport) {
        self.clipped += rhs.clipped;
        self.dropped += rhs.dropped;
    }
}

/// Interval set algebra operations on genomic interval collections.
pub trait IntervalRanges<M> {
    /// Clip intervals to `[1, length]` of their chromosome.
    ///
    /// Intervals on chromosomes absent from `genome`, and intervals lying
    /// entirely outside the chromosome, are dropped. Both cases are counted
    /// in the returned [`TrimReport`], never raised as errors.
    fn trim(&self, genome: &GenomeInfo) -> (IntervalCollection<M>, TrimReport)
    where
        M: Clone;

    /// Strand-aware promoter windows around each interval's TSS.
    ///
    /// The TSS is `start` on the plus strand (and for unstranded intervals)
    /// and `end` on the minus strand. The window spans `upstream` bases
    /// before the TSS and `downstream` bases after it, in transcription
    /// direction; the lower bound saturates at 1.
    fn promoters(&self, upstream: u32, downstream: u32) -> IntervalCollection<M>
    where
        M: Clone;

    /// Merge overlapping and adjacent intervals per chromosome.
    ///
    /// Intervals coalesce when `next.start <= current.end + 1`. The output is
    /// unstranded and ordered by chromosome name, then start.
    fn merge(&self) -> IntervalCollection<()>;

    /// Same as [`merge`](IntervalRanges::merge), also returning for every
    /// input row the index of the merged interval that absorbed it.
    fn merge_with_revmap(&self) -> (IntervalCollection<()>, Vec<usize>);
}

impl<M> IntervalRanges<M> for IntervalCollection<M> {
    fn trim(&self, genome: &GenomeInfo) -> (IntervalCollection<M>, TrimReport)
    where
        M: Clone,
    {
        let mut report = TrimReport::default();

        let trimmed: IntervalCollection<M> = self
            .into_iter()
            .filter_map(|(region, meta)| {
                let Some(length) = genome.length(&region.chr) else {
                    report.dropped += 1;
                    return None;
                };
                if region.start > length || region.end < 1 {
                    report.dropped += 1;
                    return None;
                }
                let start = region.start.max(1);
                let end = region.end.min(length);
                if start != region.start || end != region.end {
                    report.clipped += 1;
                }
                let clipped = GenomicInterval {
                    chr: region.chr.clone(),
                    start,
                    end,
                    strand: region.strand,
                };
                Some((clipped, meta.clone()))
            })
            .collect();

        if report.clipped > 0 || report.dropped > 0 {
            info!(
                "trim: {} of {} intervals clipped, {} dropped",
                report.clipped,
                self.len(),
                report.dropped
            );
        }

        (trimmed, report)
    }

    fn promoters(&self, upstream: u32, downstream: u32) -> IntervalCollection<M>
    where
        M: Clone,
    {
        self.into_iter()
            .map(|(region, meta)| {
                let (start, end) = match region.strand {
                    Strand::Minus => (
                        region.end.saturating_sub(downstream),
                        region.end.saturating_add(upstream),
                    ),
                    _ => (
                        region.start.saturating_sub(upstream),
                        region.start.saturating_add(downstream),
                    ),
                };
                let promoter = GenomicInterval {
                    chr: region.chr.clone(),
                    start: start.max(1),
                    end: end.max(1),
                    strand: region.strand,
                };
                (promoter, meta.clone())
            })
            .collect()
    }

    fn merge(&self) -> IntervalCollection<()> {
        self.merge_with_revmap().0
    }

    fn merge_with_revmap(&self) -> (IntervalCollection<()>, Vec<usize>) {
        let intervals = self.intervals();
        let mut revmap = vec![0usize; intervals.len()];
        if intervals.is_empty() {
            return (IntervalCollection::new(), revmap);
        }

        let mut order: Vec<usize> = (0..intervals.len()).collect();
        order.sort_by(|&i, &j| {
            let (a, b) = (&intervals[i], &intervals[j]);
            a.chr
                .cmp(&b.chr)
                .then_with(|| a.start.cmp(&b.start))
                .then_with(|| a.end.cmp(&b.end))
        });

        let mut merged: Vec<GenomicInterval> = Vec::new();
        let first = &intervals[order[0]];
        let mut current = GenomicInterval {
            chr: first.chr.clone(),
            start: first.start,
            end: first.end,
            strand: Strand::Unstranded,
        };
        revmap[order[0]] = 0;

        for &i in &order[1..] {
            let r = &intervals[i];
            if r.chr == current.chr && r.start <= current.end.saturating_add(1) {
                // overlapping or touching, extend
                current.end = current.end.max(r.end);
            } else {
                let next = GenomicInterval {
                    chr: r.chr.clone(),
                    start: r.start,
                    end: r.end,
                    strand: Strand::Unstranded,
                };
                merged.push(std::mem::replace(&mut current, next));
            }
            revmap[i] = merged.len();
        }
        merged.push(current);

        (IntervalCollection::from(merged), revmap)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::*;

    fn make_region(chr: &str, start: u32, end: u32) -> GenomicInterval {
        GenomicInterval::unstranded(chr, start, end).unwrap()
    }

    fn make_stranded(chr: &str, start: u32, end: u32, strand: Strand) -> GenomicInterval {
        GenomicInterval::new(chr, start, end, strand).unwrap()
    }

    fn make_set(regions: Vec<(&str, u32, u32)>) -> IntervalCollection<()> {
        regions
            .into_iter()
            .map(|(chr, start, end)| (make_region(chr, start, end), ()))
            .collect()
    }

    #[fixture]
    fn genome() -> GenomeInfo {
        GenomeInfo::new(vec![("chr1", 1000), ("chr5", 181_538_259)]).unwrap()
    }

    // ── trim tests ──────────────────────────────────────────────────────

    #[rstest]
    fn test_trim_clips_and_counts(genome: GenomeInfo) {
        let rs = make_set(vec![("chr1", 0, 50), ("chr1", 900, 1500), ("chr1", 10, 20)]);
        let (trimmed, report) = rs.trim(&genome);
        assert_eq!(
            trimmed.intervals(),
            &[make_region("chr1", 1, 50), make_region("chr1", 900, 1000), make_region("chr1", 10, 20)]
        );
        assert_eq!(report, TrimReport { clipped: 2, dropped: 0 });
    }

    #[rstest]
    fn test_trim_drops_unknown_and_outside(genome: GenomeInfo) {
        let rs: IntervalCollection<&str> = vec![
            (make_region("chrX", 1, 50), "x"),
            (make_region("chr1", 1001, 1200), "past-end"),
            (make_region("chr1", 10, 20), "kept"),
        ]
        .into_iter()
        .collect();
        let (trimmed, report) = rs.trim(&genome);
        assert_eq!(trimmed.meta(), &["kept"]);
        assert_eq!(report, TrimReport { clipped: 0, dropped: 2 });
    }

    #[rstest]
    fn test_trim_report_accumulates() {
        let mut total = TrimReport::default();
        total += TrimReport { clipped: 1, dropped: 2 };
        total += TrimReport { clipped: 3, dropped: 0 };
        assert_eq!(total, TrimReport { clipped: 4, dropped: 2 });
    }

    // ── promoters tests ─────────────────────────────────────────────────

    #[rstest]
    fn test_promoters_strand_aware() {
        let rs = IntervalCollection::from(vec![
            make_stranded("chr1", 1000, 2000, Strand::Plus),
            make_stranded("chr1", 1000, 2000, Strand::Minus),
        ]);
        let p = rs.promoters(500, 100);
        assert_eq!(p.intervals()[0], make_stranded("chr1", 500, 1100, Strand::Plus));
        assert_eq!(p.intervals()[1], make_stranded("chr1", 1900, 2500, Strand::Minus));
    }

    #[rstest]
    fn test_promoters_saturate_at_one() {
        let rs = make_set(vec![("chr1", 100, 500)]);
        let p = rs.promoters(200, 50);
        assert_eq!(p.intervals()[0], make_region("chr1", 1, 150));
    }

    // ── merge tests ─────────────────────────────────────────────────────

    #[rstest]
    fn test_merge_overlapping_anchors() {
        let rs = make_set(vec![("chr5", 5_009_500, 5_012_000), ("chr5", 5_009_000, 5_011_000)]);
        let merged = rs.merge();
        assert_eq!(merged.intervals(), &[make_region("chr5", 5_009_000, 5_012_000)]);
    }

    #[rstest]
    #[case(vec![("chr1", 1, 10), ("chr1", 11, 20)], vec![("chr1", 1, 20)])]
    #[case(vec![("chr1", 1, 10), ("chr1", 12, 20)], vec![("chr1", 1, 10), ("chr1", 12, 20)])]
    #[case(vec![("chr1", 1, 100), ("chr1", 20, 30)], vec![("chr1", 1, 100)])]
    #[case(vec![("chr2", 1, 10), ("chr10", 1, 10), ("chr1", 5, 6)], vec![("chr1", 5, 6), ("chr10", 1, 10), ("chr2", 1, 10)])]
    fn test_merge_cases(#[case] input: Vec<(&str, u32, u32)>, #[case] expected: Vec<(&str, u32, u32)>) {
        assert_eq!(make_set(input).merge(), make_set(expected));
    }

    #[rstest]
    fn test_merge_drops_strand() {
        let rs = IntervalCollection::from(vec![
            make_stranded("chr1", 1, 10, Strand::Plus),
            make_stranded("chr1", 5, 15, Strand::Minus),
        ]);
        assert_eq!(rs.merge().intervals(), &[make_region("chr1", 1, 15)]);
    }

    #[rstest]
    fn test_merge_is_idempotent() {
        let rs = make_set(vec![
            ("chr1", 50, 60),
            ("chr1", 1, 10),
            ("chr1", 8, 30),
            ("chr2", 100, 200),
            ("chr1", 31, 40),
            ("chr2", 150, 160),
        ]);
        let once = rs.merge();
        assert_eq!(once.merge(), once);
    }

    #[rstest]
    fn test_merge_with_revmap() {
        let rs = make_set(vec![("chr2", 1, 10), ("chr1", 50, 60), ("chr1", 1, 10), ("chr1", 5, 20)]);
        let (merged, revmap) = rs.merge_with_revmap();
        assert_eq!(
            merged,
            make_set(vec![("chr1", 1, 20), ("chr1", 50, 60), ("chr2", 1, 10)])
        );
        assert_eq!(revmap, vec![2, 1, 0, 0]);
        for (i, &m) in revmap.iter().enumerate() {
            let (input, merged) = (&rs.intervals()[i], &merged.intervals()[m]);
            assert!(merged.start <= input.start && input.end <= merged.end);
        }
    }

    #[rstest]
    fn test_merge_empty() {
        let (merged, revmap) = IntervalCollection::<()>::new().merge_with_revmap();
        assert!(merged.is_empty());
        assert!(revmap.is_empty());
    }
}
