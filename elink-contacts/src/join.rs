//! Joining RNA-DNA contacts with enhancers and expressed TSSs.

use std::collections::BTreeMap;

use fxhash::{FxHashMap, FxHashSet};
use log::{debug, info};
use rayon::prelude::*;
use serde::Serialize;

use elink_core::models::{GenomeInfo, GenomicInterval, IntervalCollection};
use elink_overlaprs::overlaps;
use elink_ranges::{IntervalRanges, TrimReport};
use elink_signal::{ExpressionMatrix, SupportFilter};

use crate::config::PipelineConfig;
use crate::contacts::{ContactRecord, DropReason, GroupKey, RawContact, group_contacts};
use crate::errors::Result;

/// One (contact, enhancer) pair.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JoinedInteraction {
    pub contact: ContactRecord,
    pub enhancer_id: String,
    pub enhancer_midpoint: u32,
    /// `chr:start-end` of the merged DNA region holding the contact's anchor.
    pub dna_region_id: String,
    pub dna_region_midpoint: u32,
    /// Both the enhancer and the RNA-side TSS pass the expression filter.
    pub expressed: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EnhancerStats {
    pub enhancer_id: String,
    pub n_dna_regions: usize,
    pub n_genes: usize,
    pub n_contacts: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DnaRegionStats {
    pub dna_region_id: String,
    pub n_enhancers: usize,
}

/// RNA-to-DNA distances, split by whether the DNA side hits an enhancer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DistanceSets {
    pub enhancer: Vec<u32>,
    pub non_enhancer: Vec<u32>,
}

/// Record counts at every stage of one group.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StageReport {
    pub n_input: usize,
    pub dropped_unknown_chromosome: usize,
    pub dropped_missing_midpoint: usize,
    pub dropped_invalid_midpoint: usize,
    /// Anchors clipped to chromosome bounds, RNA and DNA together.
    pub clipped: usize,
    /// Contacts lost because an anchor fell entirely off its chromosome.
    pub dropped_out_of_bounds: usize,
    pub n_contacts: usize,
    pub n_matched_contacts: usize,
    pub n_joined: usize,
    pub n_expressed: usize,
    pub n_dna_regions: usize,
    pub n_non_enhancer_contacts: usize,
    pub inter_chromosomal: usize,
}

impl StageReport {
    fn count_drop(&mut self, reason: DropReason) {
        match reason {
            DropReason::UnknownChromosome => self.dropped_unknown_chromosome += 1,
            DropReason::MissingMidpoint => self.dropped_missing_midpoint += 1,
            DropReason::InvalidMidpoint => self.dropped_invalid_midpoint += 1,
        }
    }

    fn log(&self, key: &GroupKey) {
        info!(
            "[{} / {}] {} contacts in, dropped {} unknown chromosome, {} missing midpoint, {} invalid midpoint, {} out of bounds ({} anchors clipped)",
            key.cell_type,
            key.treatment,
            self.n_input,
            self.dropped_unknown_chromosome,
            self.dropped_missing_midpoint,
            self.dropped_invalid_midpoint,
            self.dropped_out_of_bounds,
            self.clipped
        );
        info!(
            "[{} / {}] {} of {} contacts hit an enhancer, {} joined rows ({} expressed) over {} DNA regions, {} inter-chromosomal",
            key.cell_type,
            key.treatment,
            self.n_matched_contacts,
            self.n_contacts,
            self.n_joined,
            self.n_expressed,
            self.n_dna_regions,
            self.inter_chromosomal
        );
    }
}

/// Everything computed for one (cell type, treatment) group.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupResult {
    pub key: GroupKey,
    pub joined: Vec<JoinedInteraction>,
    pub enhancer_stats: Vec<EnhancerStats>,
    pub dna_region_stats: Vec<DnaRegionStats>,
    pub distances: DistanceSets,
    /// Contacts behind the non-enhancer distances, in input order.
    pub non_enhancer_contacts: Vec<ContactRecord>,
    pub report: StageReport,
}

///
/// Links contacts to enhancers and to the expression of their RNA side.
///
/// The enhancer matrix rows are the candidate enhancers; both matrices need
/// their TPM assay. All reference data is borrowed and never modified, so
/// groups run in parallel.
///
pub struct InteractionJoinPipeline<'a> {
    pub genome: &'a GenomeInfo,
    pub enhancers: &'a ExpressionMatrix,
    pub tss: &'a ExpressionMatrix,
    pub config: &'a PipelineConfig,
}

/// Distance from the RNA anchor midpoint to `dna_mid`, `None` across chromosomes.
fn distance(rna: &GenomicInterval, dna_chr: &str, dna_mid: u32) -> Option<u32> {
    (rna.chr == dna_chr).then(|| rna.mid_point().abs_diff(dna_mid))
}

/// Merge the DNA anchors of `rows` and map each row to its merged region.
fn merge_dna(contacts: &[ContactRecord], rows: &[usize]) -> (IntervalCollection<()>, FxHashMap<usize, usize>) {
    let anchors: IntervalCollection<()> = rows.iter().map(|&i| (contacts[i].dna.clone(), ())).collect();
    let (merged, revmap) = anchors.merge_with_revmap();
    let region_of = rows.iter().copied().zip(revmap).collect();
    (merged, region_of)
}

impl<'a> InteractionJoinPipeline<'a> {
    pub fn new(
        genome: &'a GenomeInfo,
        enhancers: &'a ExpressionMatrix,
        tss: &'a ExpressionMatrix,
        config: &'a PipelineConfig,
    ) -> Self {
        InteractionJoinPipeline {
            genome,
            enhancers,
            tss,
            config,
        }
    }

    /// Run every (cell type, treatment) group, in key order.
    pub fn run(&self, raw: &[RawContact]) -> Result<Vec<GroupResult>> {
        let groups: Vec<(GroupKey, Vec<&RawContact>)> = group_contacts(raw).into_iter().collect();
        info!("joining {} contacts in {} groups", raw.len(), groups.len());

        groups
            .into_par_iter()
            .map(|(key, contacts)| self.run_group(key, &contacts))
            .collect()
    }

    /// Build and trim contact records; both anchors must survive trimming.
    fn prepare(&self, raw: &[&RawContact], report: &mut StageReport) -> Vec<ContactRecord> {
        let flank = self.config.contacts.flank;
        let records: Vec<ContactRecord> = raw
            .iter()
            .filter_map(|contact| match ContactRecord::from_raw(contact, self.genome, flank) {
                Ok(record) => Some(record),
                Err(reason) => {
                    report.count_drop(reason);
                    None
                }
            })
            .collect();

        let rna: IntervalCollection<usize> = records.iter().enumerate().map(|(i, r)| (r.rna.clone(), i)).collect();
        let dna: IntervalCollection<usize> = records.iter().enumerate().map(|(i, r)| (r.dna.clone(), i)).collect();
        let (rna, rna_report) = rna.trim(self.genome);
        let (dna, dna_report) = dna.trim(self.genome);

        let mut trim: TrimReport = rna_report;
        trim += dna_report;
        report.clipped = trim.clipped;

        let trimmed_rna: FxHashMap<usize, &GenomicInterval> = rna
            .intervals()
            .iter()
            .zip(rna.meta())
            .map(|(r, &i)| (i, r))
            .collect();
        let trimmed_dna: FxHashMap<usize, &GenomicInterval> = dna
            .intervals()
            .iter()
            .zip(dna.meta())
            .map(|(r, &i)| (i, r))
            .collect();
        let n_records = records.len();

        let prepared: Vec<ContactRecord> = records
            .into_iter()
            .enumerate()
            .filter_map(|(i, record)| {
                let (rna, dna) = (trimmed_rna.get(&i)?, trimmed_dna.get(&i)?);
                Some(ContactRecord {
                    rna: (*rna).clone(),
                    dna: (*dna).clone(),
                    meta: record.meta,
                })
            })
            .collect();

        report.dropped_out_of_bounds = n_records - prepared.len();
        prepared
    }

    /// Per contact, whether any strand-compatible TSS overlapping its RNA
    /// anchor is expressed in `cell_type`.
    fn rna_expressed(&self, contacts: &[ContactRecord], cell_type: &str, filter: &SupportFilter) -> Result<Vec<bool>> {
        let tss_expressed = self.tss.expressed_in(cell_type, filter)?;
        let rna: IntervalCollection<()> = contacts.iter().map(|c| (c.rna.clone(), ())).collect();

        let mut expressed = vec![false; contacts.len()];
        for (i, j) in overlaps(&rna, self.tss.regions()) {
            expressed[i] |= tss_expressed[j];
        }
        Ok(expressed)
    }

    fn run_group(&self, key: GroupKey, raw: &[&RawContact]) -> Result<GroupResult> {
        let mut report = StageReport {
            n_input: raw.len(),
            ..StageReport::default()
        };
        let filter = self.config.expression.filter();

        let contacts = self.prepare(raw, &mut report);
        report.n_contacts = contacts.len();

        let enhancer_expressed = self.enhancers.expressed_in(&key.cell_type, &filter)?;
        let rna_expressed = self.rna_expressed(&contacts, &key.cell_type, &filter)?;

        let dna: IntervalCollection<()> = contacts.iter().map(|c| (c.dna.clone(), ())).collect();
        let pairs = overlaps(&dna, self.enhancers.regions());

        let mut matched: Vec<usize> = pairs.iter().map(|&(i, _)| i).collect();
        matched.dedup();
        report.n_matched_contacts = matched.len();

        let (merged, region_of) = merge_dna(&contacts, &matched);
        report.n_dna_regions = merged.len();
        let merged_ids: Vec<String> = merged.intervals().iter().map(|r| r.locus()).collect();

        let enhancer_regions = self.enhancers.regions();
        let joined: Vec<JoinedInteraction> = pairs
            .iter()
            .map(|&(i, j)| {
                let region = region_of[&i];
                JoinedInteraction {
                    contact: contacts[i].clone(),
                    enhancer_id: enhancer_regions.meta()[j].id.clone(),
                    enhancer_midpoint: enhancer_regions.intervals()[j].mid_point(),
                    dna_region_id: merged_ids[region].clone(),
                    dna_region_midpoint: merged.intervals()[region].mid_point(),
                    expressed: enhancer_expressed[j] && rna_expressed[i],
                }
            })
            .collect();
        report.n_joined = joined.len();
        report.n_expressed = joined.iter().filter(|row| row.expressed).count();

        let (enhancer_stats, dna_region_stats) = self.region_stats(&pairs, &joined, &region_of, &merged_ids);
        let hit: FxHashSet<usize> = pairs.iter().map(|&(i, _)| i).collect();
        let background: Vec<usize> = (0..contacts.len())
            .filter(|i| !hit.contains(i) && rna_expressed[*i])
            .collect();
        report.n_non_enhancer_contacts = background.len();

        let distances = self.distances(&contacts, &pairs, &joined, &background, &mut report);
        let non_enhancer_contacts = background.iter().map(|&i| contacts[i].clone()).collect();

        report.log(&key);
        Ok(GroupResult {
            key,
            joined,
            enhancer_stats,
            dna_region_stats,
            distances,
            non_enhancer_contacts,
            report,
        })
    }

    /// Per-enhancer and per-DNA-region counts over the expressed rows.
    fn region_stats(
        &self,
        pairs: &[(usize, usize)],
        joined: &[JoinedInteraction],
        region_of: &FxHashMap<usize, usize>,
        merged_ids: &[String],
    ) -> (Vec<EnhancerStats>, Vec<DnaRegionStats>) {
        #[derive(Default)]
        struct Acc<'r> {
            regions: FxHashSet<usize>,
            genes: FxHashSet<&'r str>,
            contacts: usize,
        }

        let mut per_enhancer: BTreeMap<usize, Acc> = BTreeMap::new();
        let mut per_region: BTreeMap<usize, FxHashSet<usize>> = BTreeMap::new();

        for (&(i, j), row) in pairs.iter().zip(joined).filter(|(_, row)| row.expressed) {
            let region = region_of[&i];
            let acc = per_enhancer.entry(j).or_default();
            acc.regions.insert(region);
            acc.genes.insert(row.contact.meta.rna_gene_id.as_str());
            acc.contacts += 1;
            per_region.entry(region).or_default().insert(j);
        }

        let ids = self.enhancers.regions().meta();
        let enhancer_stats = per_enhancer
            .into_iter()
            .map(|(j, acc)| EnhancerStats {
                enhancer_id: ids[j].id.clone(),
                n_dna_regions: acc.regions.len(),
                n_genes: acc.genes.len(),
                n_contacts: acc.contacts,
            })
            .collect();
        let dna_region_stats = per_region
            .into_iter()
            .map(|(region, enhancers)| DnaRegionStats {
                dna_region_id: merged_ids[region].clone(),
                n_enhancers: enhancers.len(),
            })
            .collect();

        (enhancer_stats, dna_region_stats)
    }

    ///
    /// Distances from RNA anchor midpoints to merged DNA region midpoints.
    ///
    /// The enhancer set holds one value per expressed matched contact. The
    /// non-enhancer set covers the `background` contacts, whose DNA anchor
    /// hits no enhancer and whose RNA side is expressed; their anchors are
    /// merged on their own.
    ///
    fn distances(
        &self,
        contacts: &[ContactRecord],
        pairs: &[(usize, usize)],
        joined: &[JoinedInteraction],
        background: &[usize],
        report: &mut StageReport,
    ) -> DistanceSets {
        let mut sets = DistanceSets::default();

        let mut seen: FxHashSet<usize> = FxHashSet::default();
        for (&(i, _), row) in pairs.iter().zip(joined) {
            if !row.expressed || !seen.insert(i) {
                continue;
            }
            match distance(&contacts[i].rna, &contacts[i].dna.chr, row.dna_region_midpoint) {
                Some(d) => sets.enhancer.push(d),
                None => report.inter_chromosomal += 1,
            }
        }

        let (merged, region_of) = merge_dna(contacts, background);
        for &i in background {
            let region = &merged.intervals()[region_of[&i]];
            match distance(&contacts[i].rna, &region.chr, region.mid_point()) {
                Some(d) => sets.non_enhancer.push(d),
                None => report.inter_chromosomal += 1,
            }
        }

        debug!(
            "distances: {} enhancer, {} non-enhancer",
            sets.enhancer.len(),
            sets.non_enhancer.len()
        );
        sets
    }
}
