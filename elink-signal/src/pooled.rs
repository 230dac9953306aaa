use rayon::prelude::*;

use elink_core::ElinkCoreError;
use elink_core::models::GenomeInfo;

use crate::errors::Result;
use crate::matrix::TPM_SCALE;
use crate::tracks::{SampleTracks, SignalTrack};

/// Per-position signal summed across samples, one track per strand.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PooledSignal {
    pub plus: SignalTrack,
    pub minus: SignalTrack,
}

impl PooledSignal {
    ///
    /// Pool samples position by position. With `normalize`, each sample is
    /// first scaled to TPM using its library size (total signal over both
    /// strands); an empty library contributes nothing.
    ///
    pub fn from_samples(samples: &[SampleTracks], normalize: bool) -> PooledSignal {
        let scaled: Vec<(SignalTrack, SignalTrack)> = samples
            .par_iter()
            .map(|sample| {
                if !normalize {
                    return (sample.plus.clone(), sample.minus.clone());
                }
                let library = sample.library_size();
                let factor = if library > 0.0 { TPM_SCALE / library } else { 0.0 };
                (sample.plus.scaled(factor), sample.minus.scaled(factor))
            })
            .collect();

        let mut pooled = PooledSignal::default();
        for (plus, minus) in &scaled {
            pooled.plus.accumulate(plus);
            pooled.minus.accumulate(minus);
        }
        pooled
    }

    /// Chromosomes carrying signal on either strand, in `genome` order.
    /// A chromosome missing from `genome` is an error.
    pub fn chroms_in_genome_order<'a>(&self, genome: &'a GenomeInfo) -> Result<Vec<&'a str>> {
        for chr in self.plus.chroms().into_iter().chain(self.minus.chroms()) {
            if !genome.contains(chr) {
                return Err(ElinkCoreError::UnknownChromosome(chr.to_string()).into());
            }
        }
        Ok(genome
            .chromosomes()
            .filter(|chr| self.plus.has_chr(chr) || self.minus.has_chr(chr))
            .collect())
    }
}
