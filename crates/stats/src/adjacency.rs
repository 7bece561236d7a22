//! Vertex adjacency graph in compressed sparse row form.
//!
//! Built once per mesh from its triangle faces and shared read-only (via
//! `Arc`) by every statistical layer that needs cluster thresholding.

use crate::error::StatsError;

/// Undirected, deduplicated vertex graph.
///
/// Neighbors of vertex `v` are `neighbors[offsets[v]..offsets[v + 1]]`,
/// sorted ascending. Self loops are never stored.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MeshAdjacency {
    offsets: Vec<usize>,
    neighbors: Vec<u32>,
}

impl MeshAdjacency {
    /// Build from triangle faces. Each face contributes its three edges in
    /// both directions; repeated edges collapse to one.
    pub fn from_faces(vertex_count: usize, faces: &[[u32; 3]]) -> Result<Self, StatsError> {
        let mut edges = Vec::with_capacity(faces.len() * 6);
        for (face, tri) in faces.iter().enumerate() {
            for &vertex in tri {
                if vertex as usize >= vertex_count {
                    return Err(StatsError::InvalidFace {
                        face,
                        vertex,
                        vertex_count,
                    });
                }
            }
            let [a, b, c] = *tri;
            for (u, v) in [(a, b), (b, c), (c, a)] {
                edges.push((u, v));
                edges.push((v, u));
            }
        }
        Ok(Self::from_edges(vertex_count, edges))
    }

    /// Build from per-vertex neighbor lists. Lists need not be symmetric or
    /// unique; the result is both.
    pub fn from_neighbor_lists(lists: &[Vec<u32>]) -> Result<Self, StatsError> {
        let vertex_count = lists.len();
        let mut edges = Vec::new();
        for (v, list) in lists.iter().enumerate() {
            for &n in list {
                if n as usize >= vertex_count {
                    return Err(StatsError::InvalidFace {
                        face: v,
                        vertex: n,
                        vertex_count,
                    });
                }
                edges.push((v as u32, n));
                edges.push((n, v as u32));
            }
        }
        Ok(Self::from_edges(vertex_count, edges))
    }

    /// A graph with no edges.
    pub fn empty(vertex_count: usize) -> Self {
        Self {
            offsets: vec![0; vertex_count + 1],
            neighbors: Vec::new(),
        }
    }

    fn from_edges(vertex_count: usize, mut edges: Vec<(u32, u32)>) -> Self {
        edges.retain(|(u, v)| u != v);
        edges.sort_unstable();
        edges.dedup();

        let mut offsets = vec![0usize; vertex_count + 1];
        for &(u, _) in &edges {
            offsets[u as usize + 1] += 1;
        }
        for i in 0..vertex_count {
            offsets[i + 1] += offsets[i];
        }
        // Edges are sorted by source, so targets land in CSR order directly.
        let neighbors = edges.into_iter().map(|(_, v)| v).collect();

        Self { offsets, neighbors }
    }

    pub fn vertex_count(&self) -> usize {
        self.offsets.len() - 1
    }

    /// Number of undirected edges.
    pub fn edge_count(&self) -> usize {
        self.neighbors.len() / 2
    }

    /// Sorted neighbors of `vertex`. Empty for out-of-range vertices.
    pub fn neighbors(&self, vertex: usize) -> &[u32] {
        if vertex >= self.vertex_count() {
            return &[];
        }
        &self.neighbors[self.offsets[vertex]..self.offsets[vertex + 1]]
    }

    pub fn degree(&self, vertex: usize) -> usize {
        self.neighbors(vertex).len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn two_triangles_share_an_edge() {
        // 0-1-2 and 1-3-2 share edge 1-2.
        let adj = MeshAdjacency::from_faces(4, &[[0, 1, 2], [1, 3, 2]]).unwrap();
        assert_eq!(adj.vertex_count(), 4);
        assert_eq!(adj.edge_count(), 5);
        assert_eq!(adj.neighbors(0), &[1, 2]);
        assert_eq!(adj.neighbors(1), &[0, 2, 3]);
        assert_eq!(adj.neighbors(2), &[0, 1, 3]);
        assert_eq!(adj.neighbors(3), &[1, 2]);
    }

    #[test]
    fn isolated_vertices_have_no_neighbors() {
        let adj = MeshAdjacency::from_faces(5, &[[0, 1, 2]]).unwrap();
        assert!(adj.neighbors(3).is_empty());
        assert!(adj.neighbors(4).is_empty());
        assert!(adj.neighbors(42).is_empty());
    }

    #[test]
    fn degenerate_face_drops_self_loops() {
        let adj = MeshAdjacency::from_faces(2, &[[0, 0, 1]]).unwrap();
        assert_eq!(adj.neighbors(0), &[1]);
        assert_eq!(adj.edge_count(), 1);
    }

    #[test]
    fn out_of_range_face_rejected() {
        let err = MeshAdjacency::from_faces(3, &[[0, 1, 2], [0, 1, 7]]).unwrap_err();
        assert_eq!(
            err,
            StatsError::InvalidFace {
                face: 1,
                vertex: 7,
                vertex_count: 3
            }
        );
    }

    #[test]
    fn neighbor_lists_are_symmetrized() {
        let adj = MeshAdjacency::from_neighbor_lists(&[vec![1, 1], vec![], vec![0]]).unwrap();
        assert_eq!(adj.neighbors(0), &[1, 2]);
        assert_eq!(adj.neighbors(1), &[0]);
        assert_eq!(adj.neighbors(2), &[0]);
        assert_eq!(adj.edge_count(), 2);
    }

    #[test]
    fn empty_graph() {
        let adj = MeshAdjacency::empty(3);
        assert_eq!(adj.vertex_count(), 3);
        assert_eq!(adj.edge_count(), 0);
        assert_eq!(adj.degree(1), 0);
    }
}
