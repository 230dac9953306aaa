//! RNA-DNA contact joins for elink.
//!
//! The last stage of the workflow. Enhancer and TSS matrices come from
//! [`calling`]; raw contact rows are grouped by (cell type, treatment) and
//! each group is run through the [`InteractionJoinPipeline`]:
//!
//! 1. anchors are derived from the reported midpoints and trimmed to the genome
//! 2. DNA anchors are overlapped with the enhancers
//! 3. matched DNA anchors are merged into DNA regions
//! 4. rows are flagged expressed when both the enhancer and the RNA-side TSS pass
//! 5. per-enhancer and per-DNA-region counts plus distance sets are derived
//!
//! Every dropped or clipped record is counted in the group's [`StageReport`].
//!
//! # Example
//!
//! ```
//! use elink_contacts::{InteractionJoinPipeline, PipelineConfig};
//! use elink_core::models::{GenomeInfo, GenomicInterval, IntervalCollection, Strand};
//! use elink_signal::{ExpressionMatrix, RowMeta, SampleInfo};
//!
//! let genome = GenomeInfo::new(vec![("chr5", 181_538_259)]).unwrap();
//! let samples = vec![SampleInfo::new("rep1", "HeLa"), SampleInfo::new("rep2", "HeLa")];
//!
//! let enhancer = GenomicInterval::new("chr5", 5_009_500, 5_009_800, Strand::Unstranded).unwrap();
//! let regions: IntervalCollection<RowMeta> = vec![(enhancer.clone(), RowMeta::from_interval(&enhancer))]
//!     .into_iter()
//!     .collect();
//! let mut enhancers = ExpressionMatrix::new(regions, samples, vec![5.0, 5.0]).unwrap();
//! enhancers.normalize_tpm();
//!
//! let config = PipelineConfig::default();
//! let pipeline = InteractionJoinPipeline::new(&genome, &enhancers, &enhancers, &config);
//! let results = pipeline.run(&[]).unwrap();
//! assert!(results.is_empty());
//! ```

pub mod calling;
pub mod config;
pub mod contacts;
pub mod errors;
pub mod join;

pub use calling::{CalledRegions, call_enhancers, call_regions, call_tss};
pub use config::{
    AnnotationConfig, ConfigError, ContactsConfig, ExpressionConfig, PipelineConfig, SupportConfig,
};
pub use contacts::{ContactMeta, ContactRecord, DropReason, GroupKey, RawContact, group_contacts};
pub use errors::ContactError;
pub use join::{
    DistanceSets, DnaRegionStats, EnhancerStats, GroupResult, InteractionJoinPipeline,
    JoinedInteraction, StageReport,
};
