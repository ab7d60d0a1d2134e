//! Vertex adjacency graph.
//!
//! [`MeshGraph`] stores, for every vertex index, the sorted list of directly
//! connected neighbor indices in compressed (CSR) form. It is derived from a
//! mesh's live edge topology and rebuilt for every operation that needs it.
//!
//! Invariants:
//! - adjacency is symmetric: `u` lists `v` iff `v` lists `u`
//! - no self-loops and no duplicate neighbors

use crate::error::{Result, ShapeError};

use super::host::DeformableMesh;

/// Undirected adjacency over a fixed vertex set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MeshGraph {
    /// `offsets[v]..offsets[v + 1]` is the neighbor range of vertex `v`.
    offsets: Vec<usize>,
    /// Concatenated, per-vertex sorted neighbor lists.
    neighbors: Vec<usize>,
}

impl MeshGraph {
    /// Create a graph with `num_vertices` isolated vertices.
    pub fn isolated(num_vertices: usize) -> Self {
        Self {
            offsets: vec![0; num_vertices + 1],
            neighbors: Vec::new(),
        }
    }

    /// Build a graph from an edge list.
    ///
    /// Self-loops are dropped and duplicate edges (in either direction) are
    /// merged. An edge referencing a vertex `>= num_vertices` is an error.
    ///
    /// # Example
    ///
    /// ```
    /// use shapekit::mesh::MeshGraph;
    ///
    /// let graph = MeshGraph::from_edges(4, [[0, 1], [1, 2], [2, 3], [3, 0]]).unwrap();
    /// assert_eq!(graph.neighbors(0), &[1, 3]);
    /// assert_eq!(graph.num_edges(), 4);
    /// ```
    pub fn from_edges<E>(num_vertices: usize, edges: E) -> Result<Self>
    where
        E: IntoIterator<Item = [usize; 2]>,
    {
        let mut adjacency: Vec<Vec<usize>> = vec![Vec::new(); num_vertices];

        for (ei, [a, b]) in edges.into_iter().enumerate() {
            for v in [a, b] {
                if v >= num_vertices {
                    return Err(ShapeError::InvalidVertexIndex { face: ei, vertex: v });
                }
            }
            if a == b {
                continue;
            }
            adjacency[a].push(b);
            adjacency[b].push(a);
        }

        let mut offsets = Vec::with_capacity(num_vertices + 1);
        let mut neighbors = Vec::new();
        offsets.push(0);
        for mut list in adjacency {
            list.sort_unstable();
            list.dedup();
            neighbors.extend_from_slice(&list);
            offsets.push(neighbors.len());
        }

        Ok(Self { offsets, neighbors })
    }

    /// Build a graph from a mesh's current evaluated topology.
    ///
    /// A mesh without vertices yields an empty graph.
    pub fn from_mesh<M: DeformableMesh + ?Sized>(mesh: &M) -> Result<Self> {
        Self::from_edges(mesh.num_vertices(), mesh.evaluated_edges())
    }

    /// Number of vertices in the graph.
    #[inline]
    pub fn num_vertices(&self) -> usize {
        self.offsets.len() - 1
    }

    /// Number of undirected edges.
    #[inline]
    pub fn num_edges(&self) -> usize {
        self.neighbors.len() / 2
    }

    /// Check if the graph has no vertices.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.num_vertices() == 0
    }

    /// Sorted neighbors of vertex `v`.
    #[inline]
    pub fn neighbors(&self, v: usize) -> &[usize] {
        &self.neighbors[self.offsets[v]..self.offsets[v + 1]]
    }

    /// Number of neighbors of vertex `v`.
    #[inline]
    pub fn degree(&self, v: usize) -> usize {
        self.offsets[v + 1] - self.offsets[v]
    }

    /// Check if vertex `v` has no neighbors.
    #[inline]
    pub fn is_isolated(&self, v: usize) -> bool {
        self.degree(v) == 0
    }

    /// Check whether `a` and `b` are directly connected.
    pub fn contains_edge(&self, a: usize, b: usize) -> bool {
        a < self.num_vertices() && self.neighbors(a).binary_search(&b).is_ok()
    }
}
