//! Contact records: ingestion of raw rows and grouping.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use elink_core::models::{GenomeInfo, GenomicInterval, Strand};

/// One pre-parsed contact row as handed over by the ingestion layer.
/// A midpoint of `None` could not be parsed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawContact {
    pub rna_chr: String,
    pub rna_mid: Option<i64>,
    pub dna_chr: String,
    pub dna_mid: Option<i64>,
    pub cell_type: String,
    pub treatment: String,
    pub rna_strand: Strand,
    pub rna_gene_id: String,
    pub rna_class: String,
    pub rna_feature_type: String,
    pub dna_bin_id: String,
    pub p_value: f64,
    pub p_adj: f64,
}

/// Metadata carried by every contact through the pipeline.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContactMeta {
    pub cell_type: String,
    pub treatment: String,
    pub rna_strand: Strand,
    pub rna_gene_id: String,
    pub rna_class: String,
    pub rna_feature_type: String,
    pub dna_bin_id: String,
    pub p_value: f64,
    pub p_adj: f64,
}

/// A contact with both anchors derived.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContactRecord {
    /// RNA anchor, on the RNA strand.
    pub rna: GenomicInterval,
    /// DNA anchor, unstranded.
    pub dna: GenomicInterval,
    pub meta: ContactMeta,
}

/// Why a raw contact was not turned into a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
    UnknownChromosome,
    MissingMidpoint,
    InvalidMidpoint,
}

/// The (cell type, treatment) pair contacts are grouped by.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct GroupKey {
    pub cell_type: String,
    pub treatment: String,
}

impl RawContact {
    pub fn group_key(&self) -> GroupKey {
        GroupKey {
            cell_type: self.cell_type.clone(),
            treatment: self.treatment.clone(),
        }
    }
}

fn midpoint(mid: Option<i64>) -> Result<u32, DropReason> {
    let mid = mid.ok_or(DropReason::MissingMidpoint)?;
    u32::try_from(mid).map_err(|_| DropReason::InvalidMidpoint)
}

impl ContactRecord {
    ///
    /// Derive both anchors from the reported midpoints with a symmetric
    /// flank. Anchors are not yet trimmed to chromosome bounds.
    ///
    pub fn from_raw(raw: &RawContact, genome: &GenomeInfo, flank: u32) -> Result<Self, DropReason> {
        if !genome.contains(&raw.rna_chr) || !genome.contains(&raw.dna_chr) {
            return Err(DropReason::UnknownChromosome);
        }
        let rna_mid = midpoint(raw.rna_mid)?;
        let dna_mid = midpoint(raw.dna_mid)?;

        Ok(ContactRecord {
            rna: GenomicInterval::around(&raw.rna_chr, rna_mid, flank, raw.rna_strand),
            dna: GenomicInterval::around(&raw.dna_chr, dna_mid, flank, Strand::Unstranded),
            meta: ContactMeta {
                cell_type: raw.cell_type.clone(),
                treatment: raw.treatment.clone(),
                rna_strand: raw.rna_strand,
                rna_gene_id: raw.rna_gene_id.clone(),
                rna_class: raw.rna_class.clone(),
                rna_feature_type: raw.rna_feature_type.clone(),
                dna_bin_id: raw.dna_bin_id.clone(),
                p_value: raw.p_value,
                p_adj: raw.p_adj,
            },
        })
    }

    /// Both anchors on the same chromosome.
    pub fn is_cis(&self) -> bool {
        self.rna.chr == self.dna.chr
    }
}

/// Group raw contacts by (cell type, treatment), in key order.
pub fn group_contacts(raw: &[RawContact]) -> BTreeMap<GroupKey, Vec<&RawContact>> {
    let mut groups: BTreeMap<GroupKey, Vec<&RawContact>> = BTreeMap::new();
    for contact in raw {
        groups.entry(contact.group_key()).or_default().push(contact);
    }
    groups
}
