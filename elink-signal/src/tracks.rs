//! Sparse base-pair resolution signal tracks.

use std::collections::BTreeMap;

use fxhash::FxHashMap;
use log::{info, warn};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use elink_core::ElinkCoreError;
use elink_core::models::{GenomeInfo, GenomicInterval, Strand};

use crate::errors::Result;
use crate::support::SupportFilter;

/// Column annotation of one sequenced library.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SampleInfo {
    pub name: String,
    pub cell_type: String,
}

impl SampleInfo {
    pub fn new(name: &str, cell_type: &str) -> Self {
        SampleInfo {
            name: name.to_string(),
            cell_type: cell_type.to_string(),
        }
    }
}

///
/// Signal of one strand: chromosome -> position -> value.
///
/// Positions are 1-based. Adding to a position that already holds signal
/// accumulates.
///
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SignalTrack {
    chroms: FxHashMap<String, BTreeMap<u32, f64>>,
}

impl SignalTrack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, chr: &str, pos: u32, value: f64) {
        *self
            .chroms
            .entry(chr.to_string())
            .or_default()
            .entry(pos)
            .or_insert(0.0) += value;
    }

    pub fn get(&self, chr: &str, pos: u32) -> f64 {
        self.chroms
            .get(chr)
            .and_then(|positions| positions.get(&pos))
            .copied()
            .unwrap_or(0.0)
    }

    /// Chromosomes carrying any signal, sorted by name.
    pub fn chroms(&self) -> Vec<&str> {
        let mut chroms: Vec<&str> = self.chroms.keys().map(|c| c.as_str()).collect();
        chroms.sort_unstable();
        chroms
    }

    pub fn has_chr(&self, chr: &str) -> bool {
        self.chroms.contains_key(chr)
    }

    /// Positions of one chromosome in coordinate order.
    pub fn positions<'a>(&'a self, chr: &str) -> impl Iterator<Item = (u32, f64)> + use<'a> {
        self.chroms
            .get(chr)
            .into_iter()
            .flat_map(|positions| positions.iter().map(|(&p, &v)| (p, v)))
    }

    /// Summed signal over `start..=end` on `chr`.
    pub fn range_sum(&self, chr: &str, start: u32, end: u32) -> f64 {
        match self.chroms.get(chr) {
            Some(positions) if start <= end => positions.range(start..=end).map(|(_, v)| v).sum(),
            _ => 0.0,
        }
    }

    pub fn total(&self) -> f64 {
        self.chroms.values().flat_map(|p| p.values()).sum()
    }

    /// Number of positions holding a value.
    pub fn len(&self) -> usize {
        self.chroms.values().map(|p| p.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    ///
    /// Check the track against the reference. A chromosome absent from
    /// `genome` is an error; positions outside `[1, length]` are dropped
    /// and their number returned.
    ///
    pub fn validate(&mut self, genome: &GenomeInfo) -> Result<usize> {
        let mut dropped = 0;
        for (chr, positions) in self.chroms.iter_mut() {
            let length = genome
                .length(chr)
                .ok_or_else(|| ElinkCoreError::UnknownChromosome(chr.clone()))?;
            let before = positions.len();
            positions.retain(|&pos, _| pos >= 1 && pos <= length);
            dropped += before - positions.len();
        }
        Ok(dropped)
    }

    /// Keep only the positions for which `keep` returns true.
    pub fn retain<F>(&mut self, mut keep: F)
    where
        F: FnMut(&str, u32, f64) -> bool,
    {
        for (chr, positions) in self.chroms.iter_mut() {
            positions.retain(|&pos, value| keep(chr.as_str(), pos, *value));
        }
        self.chroms.retain(|_, positions| !positions.is_empty());
    }

    /// A copy with every value multiplied by `factor`.
    pub fn scaled(&self, factor: f64) -> SignalTrack {
        let chroms = self
            .chroms
            .iter()
            .map(|(chr, positions)| {
                let scaled = positions.iter().map(|(&p, &v)| (p, v * factor)).collect();
                (chr.clone(), scaled)
            })
            .collect();
        SignalTrack { chroms }
    }

    /// Add every value of `other` into this track.
    pub fn accumulate(&mut self, other: &SignalTrack) {
        for (chr, positions) in &other.chroms {
            let target = self.chroms.entry(chr.clone()).or_default();
            for (&pos, &value) in positions {
                *target.entry(pos).or_insert(0.0) += value;
            }
        }
    }
}

impl<S: AsRef<str>> FromIterator<(S, u32, f64)> for SignalTrack {
    fn from_iter<T: IntoIterator<Item = (S, u32, f64)>>(iter: T) -> Self {
        let mut track = SignalTrack::new();
        for (chr, pos, value) in iter {
            track.add(chr.as_ref(), pos, value);
        }
        track
    }
}

/// Plus and minus strand signal of one sample.
#[derive(Debug, Clone, PartialEq)]
pub struct SampleTracks {
    pub info: SampleInfo,
    pub plus: SignalTrack,
    pub minus: SignalTrack,
}

impl SampleTracks {
    pub fn new(info: SampleInfo, plus: SignalTrack, minus: SignalTrack) -> Self {
        SampleTracks { info, plus, minus }
    }

    /// The track read by regions on `strand`. Unstranded regions read both.
    pub fn tracks_for(&self, strand: Strand) -> Vec<&SignalTrack> {
        match strand {
            Strand::Plus => vec![&self.plus],
            Strand::Minus => vec![&self.minus],
            Strand::Unstranded => vec![&self.plus, &self.minus],
        }
    }

    /// Summed signal inside `region`, strand-aware.
    pub fn region_sum(&self, region: &GenomicInterval) -> f64 {
        self.tracks_for(region.strand)
            .into_iter()
            .map(|t| t.range_sum(&region.chr, region.start, region.end))
            .sum()
    }

    /// Library size: total signal over both strands.
    pub fn library_size(&self) -> f64 {
        self.plus.total() + self.minus.total()
    }

    /// Validate both strands, returning the number of dropped positions.
    pub fn validate(&mut self, genome: &GenomeInfo) -> Result<usize> {
        let dropped = self.plus.validate(genome)? + self.minus.validate(genome)?;
        if dropped > 0 {
            warn!(
                "sample {}: dropped {} positions outside chromosome bounds",
                self.info.name, dropped
            );
        }
        Ok(dropped)
    }
}

///
/// Keep only positions supported by enough samples.
///
/// A position (chromosome, strand, coordinate) is kept in every sample when
/// at least `filter.min_samples` samples hold a value there that passes
/// `filter`. Positions without such support are removed from all samples.
///
pub fn support_filter_tracks(samples: &[SampleTracks], filter: &SupportFilter) -> Vec<SampleTracks> {
    let mut support: [FxHashMap<(&str, u32), usize>; 2] = [FxHashMap::default(), FxHashMap::default()];

    for sample in samples {
        for (strand, track) in [&sample.plus, &sample.minus].into_iter().enumerate() {
            for chr in track.chroms() {
                for (pos, value) in track.positions(chr) {
                    if filter.supports(value) {
                        *support[strand].entry((chr, pos)).or_insert(0) += 1;
                    }
                }
            }
        }
    }

    let kept = |strand: usize, chr: &str, pos: u32| {
        support[strand]
            .get(&(chr, pos))
            .is_some_and(|&n| n >= filter.min_samples)
    };

    let filtered: Vec<SampleTracks> = samples
        .par_iter()
        .map(|sample| {
            let mut sample = sample.clone();
            sample.plus.retain(|chr, pos, _| kept(0, chr, pos));
            sample.minus.retain(|chr, pos, _| kept(1, chr, pos));
            sample
        })
        .collect();

    let before: usize = samples.iter().map(|s| s.plus.len() + s.minus.len()).sum();
    let after: usize = filtered.iter().map(|s| s.plus.len() + s.minus.len()).sum();
    info!(
        "support filter (>= {} in >= {} samples): kept {} of {} sample positions",
        filter.min_value,
        filter.min_samples,
        after,
        before
    );

    filtered
}
