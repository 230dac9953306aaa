pub mod genome;
pub mod interval;
pub mod region;
pub mod region_set;
pub mod strand;

// re-export for cleaner imports
pub use self::genome::GenomeInfo;
pub use self::interval::Interval;
pub use self::region::GenomicInterval;
pub use self::region_set::IntervalCollection;
pub use self::strand::Strand;
