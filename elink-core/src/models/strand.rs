use std::fmt::{self, Display};
use std::str::FromStr;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::errors::ElinkCoreError;

/// Strand of a genomic interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Strand {
    Plus,
    Minus,
    Unstranded,
}

impl Strand {
    pub fn from_char(c: char) -> Strand {
        match c {
            '+' => Strand::Plus,
            '-' => Strand::Minus,
            _ => Strand::Unstranded,
        }
    }

    pub fn as_char(&self) -> char {
        match self {
            Strand::Plus => '+',
            Strand::Minus => '-',
            Strand::Unstranded => '*',
        }
    }

    /// Two strands are compatible unless both are set and they differ.
    #[inline]
    pub fn is_compatible(&self, other: &Strand) -> bool {
        matches!(self, Strand::Unstranded) || matches!(other, Strand::Unstranded) || self == other
    }

    pub fn flip(&self) -> Strand {
        match self {
            Strand::Plus => Strand::Minus,
            Strand::Minus => Strand::Plus,
            Strand::Unstranded => Strand::Unstranded,
        }
    }

    pub fn is_stranded(&self) -> bool {
        !matches!(self, Strand::Unstranded)
    }
}

impl FromStr for Strand {
    type Err = ElinkCoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "+" => Ok(Strand::Plus),
            "-" => Ok(Strand::Minus),
            "." | "*" => Ok(Strand::Unstranded),
            other => Err(ElinkCoreError::InvalidStrand(other.to_string())),
        }
    }
}

impl Display for Strand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_char())
    }
}
