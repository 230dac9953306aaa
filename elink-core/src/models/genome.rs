use fxhash::FxHashMap;

use crate::errors::{ElinkCoreError, Result};
use crate::models::GenomicInterval;

///
/// The chromosome-length reference table.
///
/// Order matters: it is the order in which per-chromosome stages emit their
/// results. The table is built once and handed around by reference.
///
#[derive(Debug, Clone, PartialEq)]
pub struct GenomeInfo {
    chroms: Vec<(String, u32)>,
    index: FxHashMap<String, usize>,
}

impl GenomeInfo {
    pub fn new<S: Into<String>>(pairs: Vec<(S, u32)>) -> Result<Self> {
        let mut chroms: Vec<(String, u32)> = Vec::with_capacity(pairs.len());
        let mut index: FxHashMap<String, usize> = FxHashMap::default();

        for (name, length) in pairs {
            let name: String = name.into();
            if length == 0 {
                return Err(ElinkCoreError::InvalidChromosomeLength(name));
            }
            if index.contains_key(&name) {
                return Err(ElinkCoreError::DuplicateChromosome(name));
            }
            index.insert(name.clone(), chroms.len());
            chroms.push((name, length));
        }

        Ok(GenomeInfo { chroms, index })
    }

    pub fn length(&self, chr: &str) -> Option<u32> {
        self.index.get(chr).map(|&i| self.chroms[i].1)
    }

    pub fn contains(&self, chr: &str) -> bool {
        self.index.contains_key(chr)
    }

    /// Position of `chr` in the table.
    pub fn rank(&self, chr: &str) -> Option<usize> {
        self.index.get(chr).copied()
    }

    pub fn chromosomes(&self) -> impl Iterator<Item = &str> {
        self.chroms.iter().map(|(name, _)| name.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, u32)> {
        self.chroms.iter().map(|(name, len)| (name.as_str(), *len))
    }

    pub fn len(&self) -> usize {
        self.chroms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chroms.is_empty()
    }

    /// Check that the interval's chromosome is part of the reference.
    pub fn validate(&self, interval: &GenomicInterval) -> Result<()> {
        if self.contains(&interval.chr) {
            Ok(())
        } else {
            Err(ElinkCoreError::UnknownChromosome(interval.chr.clone()))
        }
    }
}
