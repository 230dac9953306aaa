//! Signal clustering: tag clusters and bidirectional clusters.
//!
//! Both callers work on a [`PooledSignal`]. Chromosomes are independent and
//! run in parallel; positions within a chromosome are scanned in order.
//! Results come out in the chromosome order of the [`GenomeInfo`].
//!
//! **Tag clusters** group same-strand positions lying at most `merge_dist`
//! apart, and are kept when their summed signal reaches `pooled_cutoff`.
//!
//! **Bidirectional clusters** look for divergent transcription: around each
//! signal position `p`, minus-strand signal upstream (`[p - window, p]`) is
//! balanced against plus-strand signal downstream (`[p, p + window]`).
//! Windows whose balance reaches `balance_threshold` are merged into the
//! candidate enhancers.

use log::{info, warn};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use elink_core::models::{GenomeInfo, GenomicInterval, IntervalCollection, Strand};
use elink_overlaprs::overlap_mask;
use elink_ranges::{IntervalRanges, TxType};

use crate::errors::{Result, SignalError};
use crate::pooled::PooledSignal;
use crate::tracks::SignalTrack;

/// Parameters of both clustering passes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClusteringConfig {
    /// Largest gap between consecutive positions of one tag cluster.
    pub merge_dist: u32,
    /// Minimum summed signal of an emitted tag cluster.
    pub pooled_cutoff: f64,
    /// Half-width of a bidirectional window.
    pub window: u32,
    /// Minimum `min / max` of the two strands in a bidirectional window.
    pub balance_threshold: f64,
}

impl Default for ClusteringConfig {
    fn default() -> Self {
        ClusteringConfig {
            merge_dist: 20,
            pooled_cutoff: 3.0,
            window: 199,
            balance_threshold: 0.9,
        }
    }
}

impl ClusteringConfig {
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.balance_threshold) {
            return Err(SignalError::InvalidParameter(format!(
                "balance_threshold must lie in [0, 1], got {}",
                self.balance_threshold
            )));
        }
        if self.pooled_cutoff < 0.0 {
            return Err(SignalError::InvalidParameter(format!(
                "pooled_cutoff must not be negative, got {}",
                self.pooled_cutoff
            )));
        }
        Ok(())
    }
}

/// Metadata of a unidirectional (same-strand) cluster.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TagCluster {
    /// `chr:start-end;strand`
    pub id: String,
    /// Summed pooled signal.
    pub score: f64,
    /// Position with the highest pooled signal, leftmost on ties.
    pub peak: u32,
    /// Score reached the pooled cutoff.
    pub pooled_presence: bool,
}

/// Metadata of a bidirectional cluster (candidate enhancer).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BidirectionalCluster {
    /// `chr:start-end`
    pub id: String,
    pub plus: f64,
    pub minus: f64,
    pub balance: f64,
    pub midpoint: u32,
}

/// `min / max` of the two strand totals, 0 when either side is empty.
pub fn balance(plus: f64, minus: f64) -> f64 {
    let (low, high) = if plus < minus { (plus, minus) } else { (minus, plus) };
    if low <= 0.0 { 0.0 } else { low / high }
}

fn chromosome_length(genome: &GenomeInfo, chr: &str) -> Result<u32> {
    genome
        .length(chr)
        .ok_or_else(|| elink_core::ElinkCoreError::UnknownChromosome(chr.to_string()).into())
}

// ── tag clusters ─────────────────────────────────────────────────────────

struct Growing {
    start: u32,
    end: u32,
    score: f64,
    peak: u32,
    peak_value: f64,
}

/// Clusters of one strand on one chromosome, plus the number of positions
/// skipped for lying outside `1..=length`.
fn tag_clusters_on(
    track: &SignalTrack,
    chr: &str,
    strand: Strand,
    length: u32,
    config: &ClusteringConfig,
) -> Result<(Vec<(GenomicInterval, TagCluster)>, usize)> {
    let mut grown: Vec<Growing> = Vec::new();
    let mut skipped = 0;

    for (pos, value) in track.positions(chr) {
        if value <= 0.0 {
            continue;
        }
        if pos < 1 || pos > length {
            skipped += 1;
            continue;
        }
        match grown.last_mut() {
            Some(c) if pos - c.end <= config.merge_dist => {
                c.end = pos;
                c.score += value;
                if value > c.peak_value {
                    c.peak = pos;
                    c.peak_value = value;
                }
            }
            _ => grown.push(Growing {
                start: pos,
                end: pos,
                score: value,
                peak: pos,
                peak_value: value,
            }),
        }
    }

    let mut out = Vec::new();
    for c in grown.into_iter().filter(|c| c.score >= config.pooled_cutoff) {
        let interval = GenomicInterval::new(chr, c.start, c.end, strand)?;
        let meta = TagCluster {
            id: interval.stranded_locus(),
            score: c.score,
            peak: c.peak,
            pooled_presence: true,
        };
        out.push((interval, meta));
    }
    Ok((out, skipped))
}

///
/// Call unidirectional tag clusters from pooled signal.
///
/// Per chromosome and strand, positions with signal are scanned in order; a
/// position at most `merge_dist` after the previous one joins its cluster.
/// Clusters with summed signal below `pooled_cutoff` are discarded.
///
pub fn tag_clusters(
    pooled: &PooledSignal,
    genome: &GenomeInfo,
    config: &ClusteringConfig,
) -> Result<IntervalCollection<TagCluster>> {
    config.validate()?;
    let chroms = pooled.chroms_in_genome_order(genome)?;

    let per_chr: Vec<(Vec<(GenomicInterval, TagCluster)>, usize)> = chroms
        .par_iter()
        .map(|&chr| -> Result<(Vec<(GenomicInterval, TagCluster)>, usize)> {
            let length = chromosome_length(genome, chr)?;
            let (mut found, plus_skipped) = tag_clusters_on(&pooled.plus, chr, Strand::Plus, length, config)?;
            let (minus_found, minus_skipped) = tag_clusters_on(&pooled.minus, chr, Strand::Minus, length, config)?;
            found.extend(minus_found);
            found.sort_by(|(a, _), (b, _)| {
                a.start
                    .cmp(&b.start)
                    .then_with(|| a.end.cmp(&b.end))
                    .then_with(|| a.strand.cmp(&b.strand))
            });
            Ok((found, plus_skipped + minus_skipped))
        })
        .collect::<Result<_>>()?;

    let skipped: usize = per_chr.iter().map(|(_, n)| n).sum();
    if skipped > 0 {
        warn!("skipped {skipped} pooled positions outside chromosome bounds while calling tag clusters");
    }

    let clusters: IntervalCollection<TagCluster> = per_chr.into_iter().flat_map(|(found, _)| found).collect();
    info!("called {} tag clusters on {} chromosomes", clusters.len(), chroms.len());
    Ok(clusters)
}

// ── bidirectional clusters ───────────────────────────────────────────────

/// Positions and running sums of one strand on one chromosome.
struct PrefixSums {
    positions: Vec<u32>,
    // cumulative[k] is the sum of the first k values
    cumulative: Vec<f64>,
    // positions with signal outside 1..=length
    skipped: usize,
}

impl PrefixSums {
    fn new(track: &SignalTrack, chr: &str, length: u32) -> Self {
        let mut positions = Vec::new();
        let mut cumulative = vec![0.0];
        let mut running = 0.0;
        let mut skipped = 0;
        for (pos, value) in track.positions(chr) {
            if value <= 0.0 {
                continue;
            }
            if pos < 1 || pos > length {
                skipped += 1;
                continue;
            }
            running += value;
            positions.push(pos);
            cumulative.push(running);
        }
        PrefixSums {
            positions,
            cumulative,
            skipped,
        }
    }

    /// Signal over `start..=end`.
    fn sum(&self, start: u32, end: u32) -> f64 {
        if start > end {
            return 0.0;
        }
        let from = self.positions.partition_point(|&p| p < start);
        let to = self.positions.partition_point(|&p| p <= end);
        self.cumulative[to] - self.cumulative[from]
    }
}

fn bidirectional_on(
    pooled: &PooledSignal,
    chr: &str,
    length: u32,
    config: &ClusteringConfig,
) -> Result<(Vec<(GenomicInterval, BidirectionalCluster)>, usize)> {
    let plus = PrefixSums::new(&pooled.plus, chr, length);
    let minus = PrefixSums::new(&pooled.minus, chr, length);

    // every center lies in 1..=length
    let mut centers: Vec<u32> = plus.positions.iter().chain(&minus.positions).copied().collect();
    centers.sort_unstable();
    centers.dedup();

    let w = config.window;
    let windows: IntervalCollection<()> = centers
        .into_iter()
        .filter(|&p| {
            let downstream = plus.sum(p, p.saturating_add(w));
            let upstream = minus.sum(p.saturating_sub(w), p);
            upstream + downstream > 0.0 && balance(downstream, upstream) >= config.balance_threshold
        })
        .map(|p| -> Result<(GenomicInterval, ())> {
            let start = p.saturating_sub(w).max(1);
            let end = p.saturating_add(w).min(length);
            Ok((GenomicInterval::new(chr, start, end, Strand::Unstranded)?, ()))
        })
        .collect::<Result<_>>()?;

    let clusters = windows
        .merge()
        .intervals()
        .iter()
        .map(|span| {
            let p = plus.sum(span.start, span.end);
            let m = minus.sum(span.start, span.end);
            let meta = BidirectionalCluster {
                id: span.locus(),
                plus: p,
                minus: m,
                balance: balance(p, m),
                midpoint: span.mid_point(),
            };
            (span.clone(), meta)
        })
        .collect();
    Ok((clusters, plus.skipped + minus.skipped))
}

///
/// Call bidirectional clusters (candidate enhancers) from pooled signal.
///
/// Every position holding signal on either strand is a window center `p`.
/// The window qualifies when the minus signal in `[p - window, p]` and the
/// plus signal in `[p, p + window]` are both present and their balance
/// reaches `balance_threshold`. Qualifying windows `[p - window, p + window]`
/// are clipped to the chromosome and merged; strand totals and balance are
/// then recomputed over each merged span. Signal outside the chromosome is
/// skipped and counted.
///
pub fn bidirectional_clusters(
    pooled: &PooledSignal,
    genome: &GenomeInfo,
    config: &ClusteringConfig,
) -> Result<IntervalCollection<BidirectionalCluster>> {
    config.validate()?;
    let chroms = pooled.chroms_in_genome_order(genome)?;

    let per_chr: Vec<(Vec<(GenomicInterval, BidirectionalCluster)>, usize)> = chroms
        .par_iter()
        .map(|&chr| -> Result<(Vec<(GenomicInterval, BidirectionalCluster)>, usize)> {
            bidirectional_on(pooled, chr, chromosome_length(genome, chr)?, config)
        })
        .collect::<Result<_>>()?;

    let skipped: usize = per_chr.iter().map(|(_, n)| n).sum();
    if skipped > 0 {
        warn!("skipped {skipped} pooled positions outside chromosome bounds while calling bidirectional clusters");
    }

    let clusters: IntervalCollection<BidirectionalCluster> =
        per_chr.into_iter().flat_map(|(found, _)| found).collect();
    info!(
        "called {} bidirectional clusters on {} chromosomes",
        clusters.len(),
        chroms.len()
    );
    Ok(clusters)
}

// ── post-filters ─────────────────────────────────────────────────────────

/// Drop tag clusters overlapping any bidirectional cluster.
pub fn remove_overlapping_tag_clusters(
    tag_clusters: &IntervalCollection<TagCluster>,
    bidirectional: &IntervalCollection<BidirectionalCluster>,
) -> IntervalCollection<TagCluster> {
    let overlapping = overlap_mask(tag_clusters, bidirectional);
    let kept: Vec<usize> = overlapping
        .iter()
        .enumerate()
        .filter(|(_, hit)| !**hit)
        .map(|(i, _)| i)
        .collect();
    info!(
        "removed {} tag clusters overlapping bidirectional clusters",
        tag_clusters.len() - kept.len()
    );
    tag_clusters.select(&kept)
}

/// Drop bidirectional clusters whose transcript type is in `excluded`.
/// `labels[i]` is the type of `clusters[i]`.
pub fn filter_enhancers_by_annotation(
    clusters: &IntervalCollection<BidirectionalCluster>,
    labels: &[TxType],
    excluded: &[TxType],
) -> Result<IntervalCollection<BidirectionalCluster>> {
    if labels.len() != clusters.len() {
        return Err(SignalError::ShapeMismatch {
            expected: clusters.len(),
            found: labels.len(),
        });
    }
    let kept: Vec<usize> = labels
        .iter()
        .enumerate()
        .filter(|(_, label)| !excluded.contains(label))
        .map(|(i, _)| i)
        .collect();
    info!(
        "kept {} of {} bidirectional clusters after annotation filter",
        kept.len(),
        clusters.len()
    );
    Ok(clusters.select(&kept))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::*;

    fn track(values: Vec<(u32, f64)>) -> SignalTrack {
        values.into_iter().map(|(p, v)| ("chr1", p, v)).collect()
    }

    fn pooled(plus: Vec<(u32, f64)>, minus: Vec<(u32, f64)>) -> PooledSignal {
        PooledSignal {
            plus: track(plus),
            minus: track(minus),
        }
    }

    #[fixture]
    fn genome() -> GenomeInfo {
        GenomeInfo::new(vec![("chr1", 10_000)]).unwrap()
    }

    // ── tag clusters ────────────────────────────────────────────────────

    #[rstest]
    fn test_two_nearby_positions_form_one_cluster(genome: GenomeInfo) {
        let signal = pooled(vec![(100, 2.0), (110, 2.0)], vec![]);
        let clusters = tag_clusters(&signal, &genome, &ClusteringConfig::default()).unwrap();

        assert_eq!(clusters.len(), 1);
        let (interval, meta) = clusters.get(0).unwrap();
        assert_eq!((interval.start, interval.end, interval.strand), (100, 110, Strand::Plus));
        assert_eq!(meta.score, 4.0);
        assert_eq!(meta.id, "chr1:100-110;+");
        assert!(meta.pooled_presence);
    }

    #[rstest]
    #[case(120, 1)]
    #[case(121, 2)]
    fn test_merge_distance_contract(genome: GenomeInfo, #[case] second: u32, #[case] n: usize) {
        let signal = pooled(vec![(100, 3.0), (second, 3.0)], vec![]);
        let clusters = tag_clusters(&signal, &genome, &ClusteringConfig::default()).unwrap();
        assert_eq!(clusters.len(), n);
    }

    #[rstest]
    fn test_cutoff_and_peak(genome: GenomeInfo) {
        let signal = pooled(
            vec![(100, 1.0), (500, 2.0), (505, 5.0), (510, 5.0)],
            vec![(300, 3.0)],
        );
        let clusters = tag_clusters(&signal, &genome, &ClusteringConfig::default()).unwrap();
        let ids: Vec<&str> = clusters.meta().iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, vec!["chr1:300-300;-", "chr1:500-510;+"]);
        // leftmost of the tied maxima
        assert_eq!(clusters.meta()[1].peak, 505);
    }

    #[rstest]
    fn test_zero_signal_gives_nothing(genome: GenomeInfo) {
        let signal = pooled(vec![(100, 0.0)], vec![(200, 0.0)]);
        assert!(tag_clusters(&signal, &genome, &ClusteringConfig::default()).unwrap().is_empty());
        assert!(
            bidirectional_clusters(&signal, &genome, &ClusteringConfig::default())
                .unwrap()
                .is_empty()
        );
    }

    #[rstest]
    fn test_tag_clusters_skip_signal_past_chromosome_end(genome: GenomeInfo) {
        let signal = pooled(vec![(9_995, 4.0), (10_005, 4.0), (12_000, 9.0)], vec![(10_450, 5.0)]);
        let clusters = tag_clusters(&signal, &genome, &ClusteringConfig::default()).unwrap();

        let ids: Vec<&str> = clusters.meta().iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, vec!["chr1:9995-9995;+"]);
        assert_eq!(clusters.meta()[0].score, 4.0);

        let (found, skipped) =
            tag_clusters_on(&signal.plus, "chr1", Strand::Plus, 10_000, &ClusteringConfig::default()).unwrap();
        assert_eq!((found.len(), skipped), (1, 2));
    }

    #[rstest]
    fn test_unknown_chromosome_is_an_error(genome: GenomeInfo) {
        let signal = PooledSignal {
            plus: vec![("chrUn", 5, 1.0)].into_iter().collect(),
            minus: SignalTrack::new(),
        };
        assert!(tag_clusters(&signal, &genome, &ClusteringConfig::default()).is_err());
    }

    // ── bidirectional clusters ──────────────────────────────────────────

    #[rstest]
    fn test_balance_bounds() {
        assert_eq!(balance(5.0, 5.0), 1.0);
        assert_eq!(balance(0.0, 5.0), 0.0);
        assert_eq!(balance(2.0, 8.0), 0.25);
        assert_eq!(balance(8.0, 2.0), 0.25);
        for (p, m) in [(1.0, 3.0), (7.5, 0.1), (0.0, 0.0)] {
            let b = balance(p, m);
            assert!((0.0..=1.0).contains(&b));
        }
    }

    #[rstest]
    fn test_divergent_pair_is_called(genome: GenomeInfo) {
        // minus upstream of plus: divergent transcription
        let signal = pooled(vec![(1_050, 10.0)], vec![(1_000, 10.0)]);
        let clusters = bidirectional_clusters(&signal, &genome, &ClusteringConfig::default()).unwrap();

        assert_eq!(clusters.len(), 1);
        let (span, meta) = clusters.get(0).unwrap();
        // windows centered on 1000 and 1050 qualify and merge
        assert_eq!((span.start, span.end), (801, 1_249));
        assert_eq!(span.strand, Strand::Unstranded);
        assert_eq!((meta.plus, meta.minus, meta.balance), (10.0, 10.0, 1.0));
        assert_eq!(meta.midpoint, 1_025);
        assert_eq!(meta.id, "chr1:801-1249");
    }

    #[rstest]
    fn test_convergent_pair_is_not_called(genome: GenomeInfo) {
        // plus upstream of minus is not divergent
        let signal = pooled(vec![(1_000, 10.0)], vec![(1_300, 10.0)]);
        let clusters = bidirectional_clusters(&signal, &genome, &ClusteringConfig::default()).unwrap();
        assert!(clusters.is_empty());
    }

    #[rstest]
    fn test_unbalanced_pair_is_not_called(genome: GenomeInfo) {
        let signal = pooled(vec![(1_050, 10.0)], vec![(1_000, 5.0)]);
        let clusters = bidirectional_clusters(&signal, &genome, &ClusteringConfig::default()).unwrap();
        assert!(clusters.is_empty());
    }

    #[rstest]
    fn test_windows_are_clipped_to_the_chromosome(genome: GenomeInfo) {
        let signal = pooled(vec![(9_990, 4.0)], vec![(9_950, 4.0)]);
        let clusters = bidirectional_clusters(&signal, &genome, &ClusteringConfig::default()).unwrap();
        assert_eq!(clusters.intervals()[0].end, 10_000);
    }

    #[rstest]
    fn test_signal_past_chromosome_end_is_skipped(genome: GenomeInfo) {
        // a divergent pair lying wholly beyond the 10,000 bp chromosome
        let signal = pooled(vec![(10_500, 5.0)], vec![(10_450, 5.0)]);
        let clusters = bidirectional_clusters(&signal, &genome, &ClusteringConfig::default()).unwrap();
        assert!(clusters.is_empty());

        let (found, skipped) = bidirectional_on(&signal, "chr1", 10_000, &ClusteringConfig::default()).unwrap();
        assert!(found.is_empty());
        assert_eq!(skipped, 2);
    }

    #[rstest]
    fn test_out_of_range_signal_does_not_feed_in_range_windows(genome: GenomeInfo) {
        // the in-range pair is called, the stray plus signal past the end is not summed
        let signal = pooled(vec![(9_990, 4.0), (10_100, 50.0)], vec![(9_950, 4.0)]);
        let clusters = bidirectional_clusters(&signal, &genome, &ClusteringConfig::default()).unwrap();

        assert_eq!(clusters.len(), 1);
        let (span, meta) = clusters.get(0).unwrap();
        assert!(span.start <= span.end && span.end <= 10_000);
        assert_eq!((meta.plus, meta.minus), (4.0, 4.0));
    }

    #[rstest]
    fn test_invalid_threshold(genome: GenomeInfo) {
        let config = ClusteringConfig {
            balance_threshold: 1.5,
            ..Default::default()
        };
        assert!(matches!(
            bidirectional_clusters(&PooledSignal::default(), &genome, &config),
            Err(SignalError::InvalidParameter(_))
        ));
    }

    // ── post-filters ────────────────────────────────────────────────────

    #[rstest]
    fn test_post_filters(genome: GenomeInfo) {
        let signal = pooled(
            vec![(1_050, 10.0), (5_000, 4.0)],
            vec![(1_000, 10.0)],
        );
        let config = ClusteringConfig::default();
        let tcs = tag_clusters(&signal, &genome, &config).unwrap();
        let bcs = bidirectional_clusters(&signal, &genome, &config).unwrap();
        assert_eq!(tcs.len(), 3);

        let remaining = remove_overlapping_tag_clusters(&tcs, &bcs);
        assert_eq!(remaining.meta()[0].id, "chr1:5000-5000;+");
        assert_eq!(remaining.len(), 1);

        let labels = vec![TxType::Promoter];
        let kept = filter_enhancers_by_annotation(&bcs, &labels, &TxType::default_enhancer_exclusions()).unwrap();
        assert!(kept.is_empty());
        let kept = filter_enhancers_by_annotation(&bcs, &[TxType::Intergenic], &TxType::default_enhancer_exclusions())
            .unwrap();
        assert_eq!(kept.len(), 1);
        assert!(filter_enhancers_by_annotation(&bcs, &[], &[]).is_err());
    }
}
