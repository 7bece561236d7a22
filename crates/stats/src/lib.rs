//! `sl-stats` — Statistics for surface maps.
//!
//! - **Adjacency**: `MeshAdjacency`, an undirected CSR vertex graph built from triangle faces
//! - **Correction**: Bonferroni and Benjamini–Hochberg FDR over per-vertex p-values
//! - **Cluster**: connected-component thresholding over the mesh graph
//! - **Dist**: Student-t / normal tail probabilities and t→z conversion

pub mod adjacency;
pub mod cluster;
pub mod correction;
pub mod dist;
pub mod error;

pub use adjacency::MeshAdjacency;
pub use cluster::{cluster_threshold, ClusterOptions, ClusterResult};
pub use correction::{bonferroni, fdr_bh, CorrectionResult};
pub use error::StatsError;
