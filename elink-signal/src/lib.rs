//! Signal quantification and clustering for elink.
//!
//! This crate turns base-pair resolution, strand-specific signal into
//! regions and region x sample matrices:
//!
//! - [`tracks`]: sparse per-sample [`SignalTrack`]s, validation against the
//!   genome and replicate support filtering
//! - [`matrix`]: [`ExpressionMatrix`] with raw counts, TPM and pooled TPM,
//!   built by [`quantify`]
//! - [`pooled`]: [`PooledSignal`], signal summed across samples
//! - [`clusters`]: tag clusters, bidirectional clusters and their post-filters
//!
//! # Example
//!
//! ```
//! use elink_core::models::GenomeInfo;
//! use elink_signal::{ClusteringConfig, PooledSignal, SampleInfo, SampleTracks, SignalTrack, tag_clusters};
//!
//! let genome = GenomeInfo::new(vec![("chr1", 248_956_422)]).unwrap();
//! let plus: SignalTrack = vec![("chr1", 100, 2.0), ("chr1", 110, 2.0)].into_iter().collect();
//! let sample = SampleTracks::new(SampleInfo::new("rep1", "HeLa"), plus, SignalTrack::new());
//!
//! let pooled = PooledSignal::from_samples(&[sample], false);
//! let clusters = tag_clusters(&pooled, &genome, &ClusteringConfig::default()).unwrap();
//! assert_eq!(clusters.meta()[0].id, "chr1:100-110;+");
//! assert_eq!(clusters.meta()[0].score, 4.0);
//! ```

pub mod clusters;
pub mod errors;
pub mod matrix;
pub mod pooled;
pub mod support;
pub mod tracks;

pub use clusters::{
    BidirectionalCluster, ClusteringConfig, TagCluster, balance, bidirectional_clusters,
    filter_enhancers_by_annotation, remove_overlapping_tag_clusters, tag_clusters,
};
pub use errors::SignalError;
pub use matrix::{Assay, ExpressionMatrix, RowMeta, quantify};
pub use pooled::PooledSignal;
pub use support::SupportFilter;
pub use tracks::{SampleInfo, SampleTracks, SignalTrack, support_filter_tracks};
