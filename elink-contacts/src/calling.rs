//! Building the two expression matrices the join reads: called enhancers
//! and called TSSs.
//!
//! Both come out of the same samples. Enhancers are balanced bidirectional
//! clusters; TSSs are tag clusters on strictly supported signal that do not
//! overlap a retained enhancer.

use log::{info, warn};

use elink_core::models::{GenomeInfo, IntervalCollection};
use elink_ranges::{TranscriptModel, annotate, classify};
use elink_signal::{
    BidirectionalCluster, ExpressionMatrix, PooledSignal, RowMeta, SampleTracks, bidirectional_clusters,
    filter_enhancers_by_annotation, quantify, remove_overlapping_tag_clusters, support_filter_tracks,
    tag_clusters,
};

use crate::config::PipelineConfig;
use crate::errors::Result;

/// Enhancer and TSS matrices called from one set of samples.
#[derive(Debug, Clone)]
pub struct CalledRegions {
    pub enhancers: ExpressionMatrix,
    pub tss: ExpressionMatrix,
}

/// Copies of `samples` with positions outside the genome dropped.
fn validated(samples: &[SampleTracks], genome: &GenomeInfo) -> Result<Vec<SampleTracks>> {
    let mut checked = samples.to_vec();
    let mut dropped = 0;
    for sample in checked.iter_mut() {
        dropped += sample.validate(genome)?;
    }
    if dropped > 0 {
        warn!(
            "dropped {} out-of-bounds positions across {} samples",
            dropped,
            samples.len()
        );
    }
    Ok(checked)
}

/// Bidirectional clusters surviving the transcript type filter.
fn enhancer_clusters(
    samples: &[SampleTracks],
    model: &TranscriptModel,
    genome: &GenomeInfo,
    config: &PipelineConfig,
) -> Result<IntervalCollection<BidirectionalCluster>> {
    let annotation = &config.annotation;

    let supported = support_filter_tracks(samples, &config.support.bidirectional);
    let pooled = PooledSignal::from_samples(&supported, true);
    let clusters = bidirectional_clusters(&pooled, genome, &config.clustering)?;

    let labels = classify(&clusters, model, annotation.tss_window, annotation.proximal_window);
    Ok(filter_enhancers_by_annotation(&clusters, &labels, &annotation.excluded)?)
}

/// Quantify `rows` over the raw samples and attach the dual annotation,
/// `peaks[i]` being the peak of `rows[i]`.
fn quantified(
    rows: IntervalCollection<RowMeta>,
    peaks: &[u32],
    samples: &[SampleTracks],
    model: &TranscriptModel,
    config: &PipelineConfig,
) -> Result<ExpressionMatrix> {
    let annotation = &config.annotation;
    let annotations = annotate(&rows, peaks, model, annotation.tss_window, annotation.proximal_window)?;

    let mut matrix = quantify(rows, samples)?;
    matrix.normalize_tpm();
    matrix.compute_pooled_tpm()?;
    matrix.set_annotations(&annotations)?;
    Ok(matrix)
}

fn enhancer_matrix(
    clusters: &IntervalCollection<BidirectionalCluster>,
    samples: &[SampleTracks],
    model: &TranscriptModel,
    config: &PipelineConfig,
) -> Result<ExpressionMatrix> {
    let peaks: Vec<u32> = clusters.meta().iter().map(|c| c.midpoint).collect();
    let rows = clusters.map_meta(|c| RowMeta::new(c.id.clone()));
    let matrix = quantified(rows, &peaks, samples, model, config)?;

    info!(
        "called {} enhancers from {} samples",
        matrix.n_rows(),
        matrix.n_samples()
    );
    Ok(matrix)
}

fn tss_matrix(
    samples: &[SampleTracks],
    enhancers: &IntervalCollection<BidirectionalCluster>,
    model: &TranscriptModel,
    genome: &GenomeInfo,
    config: &PipelineConfig,
) -> Result<ExpressionMatrix> {
    let supported = support_filter_tracks(samples, &config.support.tss);
    let pooled = PooledSignal::from_samples(&supported, true);
    let clusters = tag_clusters(&pooled, genome, &config.clustering)?;
    let clusters = remove_overlapping_tag_clusters(&clusters, enhancers);

    let peaks: Vec<u32> = clusters.meta().iter().map(|c| c.peak).collect();
    let rows = clusters.map_meta(|c| RowMeta::new(c.id.clone()));
    let matrix = quantified(rows, &peaks, samples, model, config)?;

    info!("called {} TSSs from {} samples", matrix.n_rows(), matrix.n_samples());
    Ok(matrix)
}

///
/// Call candidate enhancers and quantify them across `samples`.
///
/// Positions outside the genome are dropped and positions without enough
/// replicate support are removed, the rest is pooled as TPM and scanned for
/// balanced bidirectional clusters. Clusters falling into an excluded
/// transcript type are discarded. Every surviving cluster becomes one matrix
/// row, carrying its whole-region and midpoint annotation, with counts, TPM
/// and pooled TPM assays filled in.
///
pub fn call_enhancers(
    samples: &[SampleTracks],
    model: &TranscriptModel,
    genome: &GenomeInfo,
    config: &PipelineConfig,
) -> Result<ExpressionMatrix> {
    let samples = validated(samples, genome)?;
    let clusters = enhancer_clusters(&samples, model, genome, config)?;
    enhancer_matrix(&clusters, &samples, model, config)
}

///
/// Call TSSs: tag clusters on signal passing `support.tss`, minus those
/// overlapping any of `enhancers`.
///
/// Rows are named `chr:start-end;strand` and annotated over the whole
/// cluster and at its peak.
///
pub fn call_tss(
    samples: &[SampleTracks],
    enhancers: &IntervalCollection<BidirectionalCluster>,
    model: &TranscriptModel,
    genome: &GenomeInfo,
    config: &PipelineConfig,
) -> Result<ExpressionMatrix> {
    let samples = validated(samples, genome)?;
    tss_matrix(&samples, enhancers, model, genome, config)
}

/// Call both matrices, the TSS set excluding every retained enhancer.
pub fn call_regions(
    samples: &[SampleTracks],
    model: &TranscriptModel,
    genome: &GenomeInfo,
    config: &PipelineConfig,
) -> Result<CalledRegions> {
    let samples = validated(samples, genome)?;
    let clusters = enhancer_clusters(&samples, model, genome, config)?;
    Ok(CalledRegions {
        enhancers: enhancer_matrix(&clusters, &samples, model, config)?,
        tss: tss_matrix(&samples, &clusters, model, genome, config)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use elink_core::models::Strand;
    use elink_ranges::{FeatureType, TranscriptFeature, TxType};
    use elink_signal::{Assay, SampleInfo, SignalTrack};
    use pretty_assertions::assert_eq;
    use rstest::*;

    #[fixture]
    fn genome() -> GenomeInfo {
        GenomeInfo::new(vec![("chr1", 100_000)]).unwrap()
    }

    #[fixture]
    fn model(genome: GenomeInfo) -> TranscriptModel {
        let features = vec![TranscriptFeature {
            chr: "chr1".to_string(),
            start: 10_000,
            end: 20_000,
            strand: Strand::Plus,
            feature: FeatureType::Transcript,
            transcript_id: "tx1".to_string(),
        }];
        TranscriptModel::new(features, &genome).unwrap()
    }

    /// Two replicates with a divergent pair at 50,000, signal on the TSS of
    /// tx1 and an unannotated plus-strand cluster at 30,000.
    #[fixture]
    fn samples() -> Vec<SampleTracks> {
        ["a", "b"]
            .iter()
            .map(|name| {
                let plus: SignalTrack = vec![
                    ("chr1", 50_010, 5.0),
                    ("chr1", 10_000, 5.0),
                    ("chr1", 30_000, 50.0),
                    ("chr1", 30_010, 50.0),
                ]
                .into_iter()
                .collect();
                let minus: SignalTrack = vec![("chr1", 49_990, 5.0)].into_iter().collect();
                SampleTracks::new(SampleInfo::new(name, "HeLa"), plus, minus)
            })
            .collect()
    }

    #[rstest]
    fn test_call_enhancers(samples: Vec<SampleTracks>, model: TranscriptModel, genome: GenomeInfo) {
        let matrix = call_enhancers(&samples, &model, &genome, &PipelineConfig::default()).unwrap();

        assert_eq!(matrix.n_rows(), 1);
        let region = &matrix.regions().intervals()[0];
        assert!(region.contains_position(49_990) && region.contains_position(50_010));

        let meta = &matrix.regions().meta()[0];
        assert_eq!(meta.txtype, Some(TxType::Intergenic));
        assert_eq!(meta.peak_txtype, Some(TxType::Intergenic));
        // both sides of the pair, in both replicates
        assert_eq!(matrix.row(Assay::Counts, 0).unwrap(), &[10.0, 10.0]);
        assert!(matrix.pooled_tpm().is_some());
    }

    #[rstest]
    fn test_call_regions_builds_tss_from_tag_clusters(
        samples: Vec<SampleTracks>,
        model: TranscriptModel,
        genome: GenomeInfo,
    ) {
        let called = call_regions(&samples, &model, &genome, &PipelineConfig::default()).unwrap();
        assert_eq!(called.enhancers.n_rows(), 1);

        // the two clusters inside the enhancer are gone
        let tss = &called.tss;
        let ids: Vec<&str> = tss.regions().meta().iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, vec!["chr1:10000-10000;+", "chr1:30000-30010;+"]);

        assert_eq!(tss.regions().meta()[0].txtype, Some(TxType::Promoter));
        assert_eq!(tss.regions().meta()[1].txtype, Some(TxType::Intergenic));
        assert_eq!(tss.regions().meta()[1].peak_txtype, Some(TxType::Intergenic));
        assert_eq!(tss.row(Assay::Counts, 0).unwrap(), &[5.0, 5.0]);
        assert_eq!(tss.row(Assay::Counts, 1).unwrap(), &[100.0, 100.0]);
        assert!(tss.pooled_tpm().is_some());
    }

    #[rstest]
    fn test_call_tss_needs_two_supporting_replicates(model: TranscriptModel, genome: GenomeInfo) {
        let samples: Vec<SampleTracks> = [("a", 50.0), ("b", 0.5)]
            .iter()
            .map(|&(name, value)| {
                let plus: SignalTrack = vec![("chr1", 30_000, value), ("chr1", 60_000, 5.0)]
                    .into_iter()
                    .collect();
                SampleTracks::new(SampleInfo::new(name, "HeLa"), plus, SignalTrack::new())
            })
            .collect();

        let matrix = call_tss(&samples, &IntervalCollection::new(), &model, &genome, &PipelineConfig::default()).unwrap();
        let ids: Vec<&str> = matrix.regions().meta().iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, vec!["chr1:60000-60000;+"]);
    }

    #[rstest]
    fn test_signal_past_chromosome_end_is_dropped(
        mut samples: Vec<SampleTracks>,
        model: TranscriptModel,
        genome: GenomeInfo,
    ) {
        for sample in samples.iter_mut() {
            sample.plus.add("chr1", 100_500, 5.0);
            sample.minus.add("chr1", 100_450, 5.0);
        }
        let called = call_regions(&samples, &model, &genome, &PipelineConfig::default()).unwrap();

        assert_eq!(called.enhancers.n_rows(), 1);
        assert_eq!(called.tss.n_rows(), 2);
        assert!(called.enhancers.regions().intervals().iter().all(|r| r.end <= 100_000));
        // the dropped positions do not count towards the enhancer
        assert_eq!(called.enhancers.row(Assay::Counts, 0).unwrap(), &[10.0, 10.0]);
    }
}
