use serde::{Deserialize, Serialize};

///
/// Replicate-support threshold.
///
/// A value *supports* a row (or position) when it is at least `min_value`
/// and strictly positive. A row passes when at least `min_samples` of its
/// columns support it.
///
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SupportFilter {
    pub min_value: f64,
    pub min_samples: usize,
}

impl SupportFilter {
    pub fn new(min_value: f64, min_samples: usize) -> Self {
        SupportFilter {
            min_value,
            min_samples,
        }
    }

    /// Observed at all in at least one sample. Feeds bidirectional calling.
    pub fn observed() -> Self {
        Self::new(0.0, 1)
    }

    /// At least 1 in at least 2 samples. Feeds TSS calling.
    pub fn strict() -> Self {
        Self::new(1.0, 2)
    }

    #[inline]
    pub fn supports(&self, value: f64) -> bool {
        value > 0.0 && value >= self.min_value
    }

    pub fn passes<I>(&self, values: I) -> bool
    where
        I: IntoIterator<Item = f64>,
    {
        values.into_iter().filter(|&v| self.supports(v)).count() >= self.min_samples
    }
}

impl Default for SupportFilter {
    /// The expression threshold: at least 1 TPM in at least 2 replicates.
    fn default() -> Self {
        Self::strict()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(SupportFilter::observed(), vec![0.0, 0.1], true)]
    #[case(SupportFilter::observed(), vec![0.0, 0.0], false)]
    #[case(SupportFilter::strict(), vec![1.0, 0.5, 3.0], true)]
    #[case(SupportFilter::strict(), vec![1.0, 0.99, 0.0], false)]
    #[case(SupportFilter::new(1.0, 0), vec![], true)]
    fn test_passes(#[case] filter: SupportFilter, #[case] values: Vec<f64>, #[case] expected: bool) {
        assert_eq!(filter.passes(values), expected);
    }
}
