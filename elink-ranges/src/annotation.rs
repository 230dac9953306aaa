//! Transcript-model annotation of genomic regions.
//!
//! Classifies regions into transcript types (promoter, proximal, UTRs, exon,
//! intron, antisense, intergenic) against a [`TranscriptModel`].
//!
//! Each region is assigned to the first partition it overlaps in a fixed
//! priority order:
//!
//! ```text
//! promoter > proximal > fiveUTR > threeUTR > exon > intron > antisense > intergenic
//! ```
//!
//! The order of records in the transcript model never affects the result.

use std::fmt::{self, Display};
use std::str::FromStr;

use fxhash::{FxHashMap, FxHashSet};
use log::info;
use serde::{Deserialize, Serialize};

use elink_core::models::{GenomeInfo, GenomicInterval, IntervalCollection, Strand};
use elink_overlaprs::overlap_mask;

use crate::errors::{AnnotationError, Result};
use crate::interval_ranges::IntervalRanges;

/// Transcript type of a region. Variants are declared in priority order, so
/// `Ord` sorts the highest-priority type first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum TxType {
    #[serde(rename = "promoter")]
    Promoter,
    #[serde(rename = "proximal")]
    Proximal,
    #[serde(rename = "fiveUTR")]
    FiveUtr,
    #[serde(rename = "threeUTR")]
    ThreeUtr,
    #[serde(rename = "exon")]
    Exon,
    #[serde(rename = "intron")]
    Intron,
    #[serde(rename = "antisense")]
    Antisense,
    #[serde(rename = "intergenic")]
    Intergenic,
}

impl TxType {
    pub const PRIORITY: [TxType; 8] = [
        TxType::Promoter,
        TxType::Proximal,
        TxType::FiveUtr,
        TxType::ThreeUtr,
        TxType::Exon,
        TxType::Intron,
        TxType::Antisense,
        TxType::Intergenic,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TxType::Promoter => "promoter",
            TxType::Proximal => "proximal",
            TxType::FiveUtr => "fiveUTR",
            TxType::ThreeUtr => "threeUTR",
            TxType::Exon => "exon",
            TxType::Intron => "intron",
            TxType::Antisense => "antisense",
            TxType::Intergenic => "intergenic",
        }
    }

    /// Types whose regions most likely belong to a canonical promoter or
    /// exonic transcription rather than a distal enhancer.
    pub fn default_enhancer_exclusions() -> Vec<TxType> {
        vec![TxType::Promoter, TxType::FiveUtr, TxType::ThreeUtr, TxType::Exon]
    }
}

impl Display for TxType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for TxType {
    type Err = AnnotationError;

    fn from_str(s: &str) -> Result<Self> {
        TxType::PRIORITY
            .iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(s))
            .copied()
            .ok_or_else(|| AnnotationError::UnknownTxType(s.to_string()))
    }
}

/// Feature kinds accepted in a transcript model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FeatureType {
    Transcript,
    Exon,
    FiveUtr,
    ThreeUtr,
    Cds,
}

impl FromStr for FeatureType {
    type Err = AnnotationError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "transcript" => Ok(FeatureType::Transcript),
            "exon" => Ok(FeatureType::Exon),
            "five_prime_utr" | "fiveUTR" | "5UTR" => Ok(FeatureType::FiveUtr),
            "three_prime_utr" | "threeUTR" | "3UTR" => Ok(FeatureType::ThreeUtr),
            "CDS" | "cds" => Ok(FeatureType::Cds),
            other => Err(AnnotationError::UnknownFeatureType(other.to_string())),
        }
    }
}

/// One parsed transcript feature record, as handed over by the annotation
/// file reader.
#[derive(Debug, Clone, PartialEq)]
pub struct TranscriptFeature {
    pub chr: String,
    pub start: u32,
    pub end: u32,
    pub strand: Strand,
    pub feature: FeatureType,
    pub transcript_id: String,
}

///
/// Transcript annotations split by feature kind.
///
/// Transcript bodies come from `transcript` records. A transcript with
/// features but no `transcript` record gets the span of its features as
/// its body. CDS records are folded into exons.
///
#[derive(Debug, Clone)]
pub struct TranscriptModel {
    transcripts: IntervalCollection<String>,
    exons: IntervalCollection<()>,
    five_utr: IntervalCollection<()>,
    three_utr: IntervalCollection<()>,
}

impl TranscriptModel {
    ///
    /// Build and validate a model. Any record with `start > end`, on a
    /// chromosome missing from `genome`, or ending past the chromosome end
    /// aborts construction.
    ///
    pub fn new<F>(features: F, genome: &GenomeInfo) -> Result<Self>
    where
        F: IntoIterator<Item = TranscriptFeature>,
    {
        let mut bodies: Vec<(GenomicInterval, String)> = Vec::new();
        let mut with_body: FxHashSet<String> = FxHashSet::default();
        let mut spans: FxHashMap<String, GenomicInterval> = FxHashMap::default();
        let mut exons: IntervalCollection<()> = IntervalCollection::new();
        let mut five_utr: IntervalCollection<()> = IntervalCollection::new();
        let mut three_utr: IntervalCollection<()> = IntervalCollection::new();

        for record in features {
            let interval = GenomicInterval::new(&record.chr, record.start, record.end, record.strand)?;
            genome.validate(&interval)?;
            // validate() guarantees the chromosome is present
            let length = genome.length(&interval.chr).unwrap_or(u32::MAX);
            if interval.end > length {
                return Err(AnnotationError::FeatureOutOfBounds {
                    transcript_id: record.transcript_id,
                    chr: record.chr,
                    end: record.end,
                    length,
                });
            }

            spans
                .entry(record.transcript_id.clone())
                .and_modify(|span| {
                    span.start = span.start.min(interval.start);
                    span.end = span.end.max(interval.end);
                })
                .or_insert_with(|| interval.clone());

            match record.feature {
                FeatureType::Transcript => {
                    with_body.insert(record.transcript_id.clone());
                    bodies.push((interval, record.transcript_id));
                }
                FeatureType::Exon | FeatureType::Cds => exons.push(interval, ()),
                FeatureType::FiveUtr => five_utr.push(interval, ()),
                FeatureType::ThreeUtr => three_utr.push(interval, ()),
            }
        }

        let mut implied: Vec<(GenomicInterval, String)> = spans
            .into_iter()
            .filter(|(id, _)| !with_body.contains(id))
            .map(|(id, span)| (span, id))
            .collect();
        implied.sort_by(|a, b| a.1.cmp(&b.1));
        bodies.extend(implied);

        let mut transcripts: IntervalCollection<String> = bodies.into_iter().collect();
        transcripts.sort_by_genome(genome);

        info!(
            "transcript model: {} transcripts, {} exon/CDS, {} 5'UTR, {} 3'UTR records",
            transcripts.len(),
            exons.len(),
            five_utr.len(),
            three_utr.len()
        );

        Ok(TranscriptModel {
            transcripts,
            exons,
            five_utr,
            three_utr,
        })
    }

    pub fn transcripts(&self) -> &IntervalCollection<String> {
        &self.transcripts
    }

    /// One base at each transcript's start site, carrying its strand.
    pub fn tss(&self) -> IntervalCollection<String> {
        self.transcripts.promoters(0, 0)
    }

    /// The sense partitions in priority order.
    fn partitions(&self, tss_window: u32, proximal_window: u32) -> Vec<(TxType, IntervalCollection<()>)> {
        let tss = self.tss().without_meta();
        vec![
            (TxType::Promoter, tss.promoters(tss_window, tss_window)),
            (TxType::Proximal, tss.promoters(proximal_window, proximal_window)),
            (TxType::FiveUtr, self.five_utr.clone()),
            (TxType::ThreeUtr, self.three_utr.clone()),
            (TxType::Exon, self.exons.clone()),
            (TxType::Intron, self.transcripts.without_meta()),
        ]
    }
}

/// Whole-region and peak transcript types of one region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegionAnnotation {
    pub txtype: TxType,
    pub peak_txtype: TxType,
}

///
/// Classify every region by its highest-priority overlap with the model.
///
/// Promoter and proximal partitions are `± tss_window` and
/// `± proximal_window` around each TSS. A stranded region that only overlaps
/// a transcript on the opposite strand is antisense.
///
pub fn classify<M>(
    regions: &IntervalCollection<M>,
    model: &TranscriptModel,
    tss_window: u32,
    proximal_window: u32,
) -> Vec<TxType>
where
    M: Sync,
{
    let mut assigned: Vec<Option<TxType>> = vec![None; regions.len()];

    for (txtype, partition) in model.partitions(tss_window, proximal_window) {
        if partition.is_empty() {
            continue;
        }
        let hits = overlap_mask(regions, &partition);
        for (slot, hit) in assigned.iter_mut().zip(hits) {
            if slot.is_none() && hit {
                *slot = Some(txtype);
            }
        }
    }

    let flipped: IntervalCollection<()> = regions
        .intervals()
        .iter()
        .map(|r| (r.with_strand(r.strand.flip()), ()))
        .collect();
    let antisense = overlap_mask(&flipped, model.transcripts());

    assigned
        .into_iter()
        .zip(regions.intervals())
        .zip(antisense)
        .map(|((slot, region), antisense)| match slot {
            Some(txtype) => txtype,
            None if antisense && region.strand.is_stranded() => TxType::Antisense,
            None => TxType::Intergenic,
        })
        .collect()
}

///
/// Dual annotation: classify each region as a whole and at its peak (a
/// single base on the region's strand). `peaks[i]` belongs to `regions[i]`.
///
pub fn annotate<M>(
    regions: &IntervalCollection<M>,
    peaks: &[u32],
    model: &TranscriptModel,
    tss_window: u32,
    proximal_window: u32,
) -> Result<Vec<RegionAnnotation>>
where
    M: Sync,
{
    if regions.len() != peaks.len() {
        return Err(AnnotationError::PeakCountMismatch {
            regions: regions.len(),
            peaks: peaks.len(),
        });
    }

    let peak_regions: IntervalCollection<()> = regions
        .intervals()
        .iter()
        .zip(peaks)
        .map(|(r, &p)| GenomicInterval::new(&r.chr, p, p, r.strand).map(|iv| (iv, ())))
        .collect::<std::result::Result<_, _>>()?;

    let whole = classify(regions, model, tss_window, proximal_window);
    let at_peak = classify(&peak_regions, model, tss_window, proximal_window);

    Ok(whole
        .into_iter()
        .zip(at_peak)
        .map(|(txtype, peak_txtype)| RegionAnnotation { txtype, peak_txtype })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use elink_core::ElinkCoreError;
    use pretty_assertions::assert_eq;
    use rstest::*;

    fn feature(start: u32, end: u32, strand: Strand, feature: FeatureType, id: &str) -> TranscriptFeature {
        TranscriptFeature {
            chr: "chr1".to_string(),
            start,
            end,
            strand,
            feature,
            transcript_id: id.to_string(),
        }
    }

    fn gi(start: u32, end: u32, strand: Strand) -> GenomicInterval {
        GenomicInterval::new("chr1", start, end, strand).unwrap()
    }

    #[fixture]
    fn genome() -> GenomeInfo {
        GenomeInfo::new(vec![("chr1", 100_000), ("chr2", 50_000)]).unwrap()
    }

    /// A plus-strand transcript at 10,000-20,000 with a 5'UTR, an exon, a CDS
    /// and a 3'UTR. The 5'UTR reaches past the proximal window.
    #[fixture]
    fn model(genome: GenomeInfo) -> TranscriptModel {
        TranscriptModel::new(
            vec![
                feature(10_000, 20_000, Strand::Plus, FeatureType::Transcript, "tx1"),
                feature(10_000, 12_000, Strand::Plus, FeatureType::FiveUtr, "tx1"),
                feature(10_000, 12_500, Strand::Plus, FeatureType::Exon, "tx1"),
                feature(14_000, 15_000, Strand::Plus, FeatureType::Cds, "tx1"),
                feature(19_000, 20_000, Strand::Plus, FeatureType::ThreeUtr, "tx1"),
            ],
            &genome,
        )
        .unwrap()
    }

    #[rstest]
    #[case(gi(9_950, 9_960, Strand::Plus), TxType::Promoter)]
    #[case(gi(9_500, 9_600, Strand::Unstranded), TxType::Proximal)]
    #[case(gi(11_200, 11_300, Strand::Plus), TxType::FiveUtr)]
    #[case(gi(19_500, 19_600, Strand::Plus), TxType::ThreeUtr)]
    #[case(gi(14_100, 14_200, Strand::Plus), TxType::Exon)]
    #[case(gi(13_000, 13_100, Strand::Unstranded), TxType::Intron)]
    #[case(gi(13_000, 13_100, Strand::Minus), TxType::Antisense)]
    #[case(gi(50_000, 50_100, Strand::Plus), TxType::Intergenic)]
    fn test_classify_cases(model: TranscriptModel, #[case] region: GenomicInterval, #[case] expected: TxType) {
        let regions = IntervalCollection::from(vec![region]);
        assert_eq!(classify(&regions, &model, 100, 1000), vec![expected]);
    }

    #[rstest]
    fn test_priority_ignores_model_order(genome: GenomeInfo) {
        // the same features listed in reverse order
        let reversed = TranscriptModel::new(
            vec![
                feature(10_000, 11_000, Strand::Plus, FeatureType::Exon, "tx1"),
                feature(10_000, 10_500, Strand::Plus, FeatureType::FiveUtr, "tx1"),
                feature(10_000, 20_000, Strand::Plus, FeatureType::Transcript, "tx1"),
            ],
            &genome,
        )
        .unwrap();
        // overlaps promoter, 5'UTR, exon and intron at once
        let regions = IntervalCollection::from(vec![gi(9_990, 10_400, Strand::Unstranded)]);
        assert_eq!(classify(&regions, &reversed, 100, 1000), vec![TxType::Promoter]);
    }

    #[rstest]
    fn test_minus_strand_tss_is_the_end(genome: GenomeInfo) {
        let model = TranscriptModel::new(
            vec![feature(30_000, 40_000, Strand::Minus, FeatureType::Transcript, "tx2")],
            &genome,
        )
        .unwrap();
        let regions = IntervalCollection::from(vec![
            gi(40_050, 40_060, Strand::Minus),
            gi(29_950, 29_960, Strand::Minus),
        ]);
        assert_eq!(
            classify(&regions, &model, 100, 1000),
            vec![TxType::Promoter, TxType::Intergenic]
        );
    }

    #[rstest]
    fn test_implied_transcript_body(genome: GenomeInfo) {
        let model = TranscriptModel::new(
            vec![
                feature(1_000, 1_200, Strand::Plus, FeatureType::Exon, "tx3"),
                feature(5_000, 5_200, Strand::Plus, FeatureType::Exon, "tx3"),
            ],
            &genome,
        )
        .unwrap();
        assert_eq!(model.transcripts().intervals(), &[gi(1_000, 5_200, Strand::Plus)]);
        assert_eq!(model.transcripts().meta(), &["tx3".to_string()]);
    }

    #[rstest]
    fn test_dual_annotation(model: TranscriptModel) {
        // whole region reaches the promoter, its peak sits in the intron
        let regions = IntervalCollection::from(vec![gi(9_950, 13_500, Strand::Plus)]);
        let annotations = annotate(&regions, &[13_000], &model, 100, 1000).unwrap();
        assert_eq!(
            annotations,
            vec![RegionAnnotation {
                txtype: TxType::Promoter,
                peak_txtype: TxType::Intron
            }]
        );
    }

    #[rstest]
    fn test_annotate_length_mismatch(model: TranscriptModel) {
        let regions = IntervalCollection::from(vec![gi(100, 200, Strand::Plus)]);
        assert_eq!(
            annotate(&regions, &[], &model, 100, 1000).unwrap_err(),
            AnnotationError::PeakCountMismatch { regions: 1, peaks: 0 }
        );
    }

    #[rstest]
    fn test_model_validation(genome: GenomeInfo) {
        let unknown = TranscriptFeature {
            chr: "chrUn".to_string(),
            ..feature(1, 10, Strand::Plus, FeatureType::Exon, "tx")
        };
        assert_eq!(
            TranscriptModel::new(vec![unknown], &genome).unwrap_err(),
            AnnotationError::Core(ElinkCoreError::UnknownChromosome("chrUn".to_string()))
        );

        let inverted = feature(10, 1, Strand::Plus, FeatureType::Exon, "tx");
        assert!(matches!(
            TranscriptModel::new(vec![inverted], &genome).unwrap_err(),
            AnnotationError::Core(ElinkCoreError::MalformedInterval { .. })
        ));

        let past_end = feature(99_000, 100_001, Strand::Plus, FeatureType::Exon, "tx");
        assert!(matches!(
            TranscriptModel::new(vec![past_end], &genome).unwrap_err(),
            AnnotationError::FeatureOutOfBounds { length: 100_000, .. }
        ));
    }

    #[rstest]
    fn test_txtype_names() {
        assert_eq!("fiveUTR".parse::<TxType>().unwrap(), TxType::FiveUtr);
        assert_eq!(TxType::ThreeUtr.to_string(), "threeUTR");
        assert_eq!(serde_json::to_string(&TxType::Promoter).unwrap(), "\"promoter\"");
        assert!(TxType::Promoter < TxType::Intergenic);
        assert!("enhancer".parse::<TxType>().is_err());
    }
}
