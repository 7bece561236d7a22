//! Cluster-extent thresholding over the mesh graph.
//!
//! Supra-threshold vertices (`|value| ≥ threshold`) are grouped into
//! connected components of the induced subgraph. Components smaller than
//! `min_cluster_size` are discarded.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::adjacency::MeshAdjacency;
use crate::error::StatsError;

/// Cluster-forming options.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterOptions {
    pub min_cluster_size: usize,
    /// Keep positive and negative candidates in separate components.
    #[serde(default)]
    pub split_by_sign: bool,
}

impl ClusterOptions {
    pub fn new(min_cluster_size: usize) -> Self {
        Self {
            min_cluster_size,
            split_by_sign: false,
        }
    }
}

/// Retained clusters and per-vertex annotations.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterResult {
    pub mask: Vec<bool>,
    /// 0-based cluster index per vertex, `-1` when not in a retained cluster.
    /// Clusters are numbered in discovery order (lowest vertex index first).
    pub cluster_index: Vec<i32>,
    pub cluster_sizes: Vec<usize>,
    /// Components dropped for being smaller than the minimum size.
    pub discarded: usize,
}

impl ClusterResult {
    /// Size of the retained cluster containing `vertex`.
    pub fn cluster_size(&self, vertex: usize) -> Option<usize> {
        let idx = *self.cluster_index.get(vertex)?;
        usize::try_from(idx)
            .ok()
            .and_then(|i| self.cluster_sizes.get(i).copied())
    }

    pub fn cluster_count(&self) -> usize {
        self.cluster_sizes.len()
    }
}

/// Find connected supra-threshold components and keep the large ones.
///
/// Traversal is an iterative BFS with an explicit visited array, O(V + E).
pub fn cluster_threshold(
    values: &[f32],
    adjacency: &MeshAdjacency,
    threshold: f32,
    options: &ClusterOptions,
) -> Result<ClusterResult, StatsError> {
    if values.len() != adjacency.vertex_count() {
        return Err(StatsError::AdjacencyMismatch {
            expected: adjacency.vertex_count(),
            got: values.len(),
        });
    }
    if !threshold.is_finite() || threshold < 0.0 {
        return Err(StatsError::InvalidParameter {
            name: "threshold",
            value: f64::from(threshold),
            reason: "must be finite and non-negative",
        });
    }

    let n = values.len();
    let candidate = |v: usize| values[v].is_finite() && values[v].abs() >= threshold;
    let same_side = |a: usize, b: usize| (values[a] >= 0.0) == (values[b] >= 0.0);

    let mut visited = vec![false; n];
    let mut cluster_index = vec![-1i32; n];
    let mut cluster_sizes = Vec::new();
    let mut discarded = 0;
    let mut queue = VecDeque::new();
    let mut members = Vec::new();

    for seed in 0..n {
        if visited[seed] || !candidate(seed) {
            continue;
        }
        visited[seed] = true;
        queue.push_back(seed);
        members.clear();

        while let Some(v) = queue.pop_front() {
            members.push(v);
            for &nb in adjacency.neighbors(v) {
                let nb = nb as usize;
                if visited[nb] || !candidate(nb) {
                    continue;
                }
                if options.split_by_sign && !same_side(seed, nb) {
                    continue;
                }
                visited[nb] = true;
                queue.push_back(nb);
            }
        }

        if members.len() >= options.min_cluster_size {
            let idx = cluster_sizes.len() as i32;
            for &v in &members {
                cluster_index[v] = idx;
            }
            cluster_sizes.push(members.len());
        } else {
            discarded += 1;
        }
    }

    let mask = cluster_index.iter().map(|&c| c >= 0).collect();

    debug!(
        threshold,
        min_size = options.min_cluster_size,
        retained = cluster_sizes.len(),
        discarded,
        "Cluster threshold"
    );

    Ok(ClusterResult {
        mask,
        cluster_index,
        cluster_sizes,
        discarded,
    })
}
