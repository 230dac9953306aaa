//! Region x sample expression matrices.

use log::debug;
use rayon::prelude::*;
use serde::Serialize;

use elink_core::models::{GenomicInterval, IntervalCollection};
use elink_ranges::{RegionAnnotation, TxType};

use crate::errors::{Result, SignalError};
use crate::support::SupportFilter;
use crate::tracks::{SampleInfo, SampleTracks};

/// Library scale of TPM values.
pub const TPM_SCALE: f64 = 1e6;

/// Row annotation of an [`ExpressionMatrix`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RowMeta {
    pub id: String,
    pub txtype: Option<TxType>,
    pub peak_txtype: Option<TxType>,
}

impl RowMeta {
    pub fn new(id: impl Into<String>) -> Self {
        RowMeta {
            id: id.into(),
            txtype: None,
            peak_txtype: None,
        }
    }

    /// Row named after its interval (`chr:start-end`, with `;strand` when stranded).
    pub fn from_interval(interval: &GenomicInterval) -> Self {
        Self::new(interval.to_string())
    }
}

/// Which value layer of the matrix to read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Assay {
    Counts,
    Tpm,
}

impl Assay {
    fn name(&self) -> &'static str {
        match self {
            Assay::Counts => "counts",
            Assay::Tpm => "TPM",
        }
    }
}

///
/// Quantified regions by samples.
///
/// Values are stored flat and row-major: row `i`, sample `j` lives at
/// `i * n_samples + j`. Raw counts are always present; TPM and pooled TPM
/// exist once computed.
///
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExpressionMatrix {
    regions: IntervalCollection<RowMeta>,
    samples: Vec<SampleInfo>,
    counts: Vec<f64>,
    tpm: Option<Vec<f64>>,
    pooled_tpm: Option<Vec<f64>>,
}

impl ExpressionMatrix {
    pub fn new(regions: IntervalCollection<RowMeta>, samples: Vec<SampleInfo>, counts: Vec<f64>) -> Result<Self> {
        let expected = regions.len() * samples.len();
        if counts.len() != expected {
            return Err(SignalError::ShapeMismatch {
                expected,
                found: counts.len(),
            });
        }
        Ok(ExpressionMatrix {
            regions,
            samples,
            counts,
            tpm: None,
            pooled_tpm: None,
        })
    }

    pub fn n_rows(&self) -> usize {
        self.regions.len()
    }

    pub fn n_samples(&self) -> usize {
        self.samples.len()
    }

    pub fn regions(&self) -> &IntervalCollection<RowMeta> {
        &self.regions
    }

    pub fn samples(&self) -> &[SampleInfo] {
        &self.samples
    }

    pub fn assay(&self, assay: Assay) -> Result<&[f64]> {
        match assay {
            Assay::Counts => Ok(&self.counts),
            Assay::Tpm => self
                .tpm
                .as_deref()
                .ok_or(SignalError::MissingAssay(assay.name())),
        }
    }

    pub fn row(&self, assay: Assay, row: usize) -> Result<&[f64]> {
        let n = self.n_samples();
        Ok(&self.assay(assay)?[row * n..(row + 1) * n])
    }

    pub fn value(&self, assay: Assay, row: usize, sample: usize) -> Result<f64> {
        Ok(self.row(assay, row)?[sample])
    }

    pub fn pooled_tpm(&self) -> Option<&[f64]> {
        self.pooled_tpm.as_deref()
    }

    /// Column indices of the samples of `cell_type`.
    pub fn columns_for_cell_type(&self, cell_type: &str) -> Vec<usize> {
        self.samples
            .iter()
            .enumerate()
            .filter(|(_, s)| s.cell_type == cell_type)
            .map(|(j, _)| j)
            .collect()
    }

    ///
    /// Compute the TPM assay: every column is scaled to sum to 1e6. A column
    /// whose raw total is 0 stays 0.
    ///
    pub fn normalize_tpm(&mut self) {
        let n = self.n_samples();
        let mut totals = vec![0.0; n];
        for row in self.counts.chunks(n.max(1)) {
            for (total, value) in totals.iter_mut().zip(row) {
                *total += value;
            }
        }

        let tpm = self
            .counts
            .iter()
            .enumerate()
            .map(|(k, &value)| {
                let total = totals[k % n];
                if total > 0.0 { value / total * TPM_SCALE } else { 0.0 }
            })
            .collect();

        debug!("normalized {} columns to TPM", n);
        self.tpm = Some(tpm);
    }

    /// Per-row sum across all sample columns of `assay`.
    pub fn pool(&self, assay: Assay) -> Result<Vec<f64>> {
        let n = self.n_samples();
        let values = self.assay(assay)?;
        if n == 0 {
            return Ok(vec![0.0; self.n_rows()]);
        }
        Ok(values.chunks(n).map(|row| row.iter().sum()).collect())
    }

    /// Compute TPM if needed, then store the pooled TPM assay.
    pub fn compute_pooled_tpm(&mut self) -> Result<()> {
        if self.tpm.is_none() {
            self.normalize_tpm();
        }
        self.pooled_tpm = Some(self.pool(Assay::Tpm)?);
        Ok(())
    }

    /// Whether `row` passes `filter` on `assay`, looking at all sample columns.
    pub fn row_passes(&self, assay: Assay, row: usize, filter: &SupportFilter) -> Result<bool> {
        Ok(filter.passes(self.row(assay, row)?.iter().copied()))
    }

    ///
    /// For every row, whether it passes `filter` on the TPM assay when only
    /// the columns of `cell_type` are considered.
    ///
    pub fn expressed_in(&self, cell_type: &str, filter: &SupportFilter) -> Result<Vec<bool>> {
        let columns = self.columns_for_cell_type(cell_type);
        if columns.is_empty() {
            return Err(SignalError::UnknownCellType(cell_type.to_string()));
        }
        let n = self.n_samples();
        let tpm = self.assay(Assay::Tpm)?;
        Ok(tpm
            .chunks(n)
            .map(|row| filter.passes(columns.iter().map(|&j| row[j])))
            .collect())
    }

    /// Keep the rows listed in `keep`, in that order, across every assay.
    pub fn select_rows(&self, keep: &[usize]) -> ExpressionMatrix {
        let n = self.n_samples();
        let take = |values: &[f64]| -> Vec<f64> {
            keep.iter()
                .flat_map(|&i| values[i * n..(i + 1) * n].iter().copied())
                .collect()
        };
        ExpressionMatrix {
            regions: self.regions.select(keep),
            samples: self.samples.clone(),
            counts: take(&self.counts),
            tpm: self.tpm.as_deref().map(take),
            pooled_tpm: self
                .pooled_tpm
                .as_ref()
                .map(|p| keep.iter().map(|&i| p[i]).collect()),
        }
    }

    /// Rows passing `filter` on `assay`.
    pub fn subset_by_support(&self, assay: Assay, filter: &SupportFilter) -> Result<ExpressionMatrix> {
        let keep: Vec<usize> = (0..self.n_rows())
            .map(|i| self.row_passes(assay, i, filter).map(|ok| ok.then_some(i)))
            .filter_map(|r| r.transpose())
            .collect::<Result<_>>()?;
        debug!(
            "support filter on {}: kept {} of {} rows",
            assay.name(),
            keep.len(),
            self.n_rows()
        );
        Ok(self.select_rows(&keep))
    }

    /// Attach whole-region and peak transcript types, one per row.
    pub fn set_annotations(&mut self, annotations: &[RegionAnnotation]) -> Result<()> {
        if annotations.len() != self.n_rows() {
            return Err(SignalError::ShapeMismatch {
                expected: self.n_rows(),
                found: annotations.len(),
            });
        }
        let (intervals, meta) = std::mem::take(&mut self.regions).into_parts();
        let meta = meta
            .into_iter()
            .zip(annotations)
            .map(|(m, a)| RowMeta {
                txtype: Some(a.txtype),
                peak_txtype: Some(a.peak_txtype),
                ..m
            })
            .collect();
        self.regions = IntervalCollection::from_parts(intervals, meta)?;
        Ok(())
    }
}

///
/// Sum the signal of every sample inside every region.
///
/// Plus-strand regions read the plus track, minus-strand regions the minus
/// track and unstranded regions both. Samples are processed in parallel.
///
pub fn quantify(regions: IntervalCollection<RowMeta>, samples: &[SampleTracks]) -> Result<ExpressionMatrix> {
    let columns: Vec<Vec<f64>> = samples
        .par_iter()
        .map(|sample| {
            regions
                .intervals()
                .iter()
                .map(|region| sample.region_sum(region))
                .collect()
        })
        .collect();

    let n_rows = regions.len();
    let mut counts = Vec::with_capacity(n_rows * samples.len());
    for i in 0..n_rows {
        counts.extend(columns.iter().map(|column| column[i]));
    }

    let infos = samples.iter().map(|s| s.info.clone()).collect();
    ExpressionMatrix::new(regions, infos, counts)
}
