use super::edge::{Edge, EdgeKey};
use crate::error::{Error, Result};
use crate::types::VertexId;
use std::collections::{BTreeSet, HashMap};

#[derive(Clone, Copy, Debug)]
struct EdgeEntry {
    weight: f64,
    seq: u64,
}

/// Undirected weighted graph over DEM cells.
///
/// Vertices are linearized grid indices. Edges live in a hash map keyed by
/// the unordered endpoint pair and remember their insertion sequence, which
/// [`Graph::edges`] uses to return a deterministic order. Adjacency lists keep
/// neighbour queries O(degree).
#[derive(Clone, Debug, Default)]
pub struct Graph {
    vertices: BTreeSet<VertexId>,
    edges: HashMap<EdgeKey, EdgeEntry>,
    adjacency: HashMap<VertexId, Vec<EdgeKey>>,
    next_seq: u64,
}

impl Graph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_vertices<I: IntoIterator<Item = VertexId>>(vertices: I) -> Self {
        let mut graph = Self::new();
        for v in vertices {
            graph.insert_vertex(v);
        }
        graph
    }

    /// Returns `false` when the vertex already existed.
    pub fn insert_vertex(&mut self, v: VertexId) -> bool {
        self.vertices.insert(v)
    }

    /// Removes `v` together with its incident edges.
    pub fn remove_vertex(&mut self, v: VertexId) -> bool {
        if !self.vertices.remove(&v) {
            return false;
        }
        if let Some(keys) = self.adjacency.remove(&v) {
            for key in keys {
                self.edges.remove(&key);
                if let Some(other) = key.other(v) {
                    if let Some(list) = self.adjacency.get_mut(&other) {
                        list.retain(|k| *k != key);
                    }
                }
            }
        }
        true
    }

    pub fn contains_vertex(&self, v: VertexId) -> bool {
        self.vertices.contains(&v)
    }

    /// Inserts `{a, b}` with `weight`.
    ///
    /// Re-inserting an existing pair in either order overwrites its weight but
    /// keeps the original insertion position; the call then returns `false`.
    pub fn insert_edge(&mut self, a: VertexId, b: VertexId, weight: f64) -> Result<bool> {
        let key = EdgeKey::new(a, b)
            .ok_or_else(|| Error::bad_argument(format!("self-loop on vertex {a}")))?;
        for x in [a, b] {
            if !self.vertices.contains(&x) {
                return Err(Error::out_of_bound(format!("vertex {x} not in graph")));
            }
        }
        if let Some(entry) = self.edges.get_mut(&key) {
            entry.weight = weight;
            return Ok(false);
        }
        let seq = self.next_seq;
        self.next_seq += 1;
        self.edges.insert(key, EdgeEntry { weight, seq });
        self.adjacency.entry(key.u).or_default().push(key);
        self.adjacency.entry(key.v).or_default().push(key);
        Ok(true)
    }

    /// Returns `false` when the edge was not present.
    pub fn remove_edge(&mut self, a: VertexId, b: VertexId) -> bool {
        let Some(key) = EdgeKey::new(a, b) else {
            return false;
        };
        if self.edges.remove(&key).is_none() {
            return false;
        }
        for x in [key.u, key.v] {
            if let Some(list) = self.adjacency.get_mut(&x) {
                list.retain(|k| *k != key);
            }
        }
        true
    }

    pub fn contains_edge(&self, a: VertexId, b: VertexId) -> bool {
        EdgeKey::new(a, b).is_some_and(|k| self.edges.contains_key(&k))
    }

    pub fn edge(&self, a: VertexId, b: VertexId) -> Result<Edge> {
        let key = EdgeKey::new(a, b)
            .ok_or_else(|| Error::out_of_bound(format!("no self-loop edge at {a}")))?;
        self.edges
            .get(&key)
            .map(|e| Edge {
                u: key.u,
                v: key.v,
                weight: e.weight,
            })
            .ok_or_else(|| Error::out_of_bound(format!("edge {{{a}, {b}}} not in graph")))
    }

    /// Drops every vertex and edge.
    pub fn clear(&mut self) {
        self.vertices.clear();
        self.edges.clear();
        self.adjacency.clear();
        self.next_seq = 0;
    }

    /// Drops every edge but keeps the vertex set.
    pub fn clear_edges(&mut self) {
        self.edges.clear();
        self.adjacency.clear();
    }

    pub fn num_vertices(&self) -> usize {
        self.vertices.len()
    }

    pub fn num_edges(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    /// Vertices in ascending id order.
    pub fn vertices(&self) -> impl Iterator<Item = VertexId> + '_ {
        self.vertices.iter().copied()
    }

    /// All edges in insertion order.
    pub fn edges(&self) -> Vec<Edge> {
        let mut entries: Vec<(u64, Edge)> = self
            .edges
            .iter()
            .map(|(k, e)| {
                (
                    e.seq,
                    Edge {
                        u: k.u,
                        v: k.v,
                        weight: e.weight,
                    },
                )
            })
            .collect();
        entries.sort_unstable_by_key(|(seq, _)| *seq);
        entries.into_iter().map(|(_, e)| e).collect()
    }

    /// Neighbours of `v` in edge insertion order.
    pub fn neighbors(&self, v: VertexId) -> Result<Vec<VertexId>> {
        Ok(self
            .incident_edges(v)?
            .into_iter()
            .filter_map(|e| e.key().other(v))
            .collect())
    }

    pub fn incident_edges(&self, v: VertexId) -> Result<Vec<Edge>> {
        if !self.vertices.contains(&v) {
            return Err(Error::out_of_bound(format!("vertex {v} not in graph")));
        }
        let mut out: Vec<(u64, Edge)> = self
            .adjacency
            .get(&v)
            .map(|keys| {
                keys.iter()
                    .filter_map(|k| {
                        self.edges.get(k).map(|e| {
                            (
                                e.seq,
                                Edge {
                                    u: k.u,
                                    v: k.v,
                                    weight: e.weight,
                                },
                            )
                        })
                    })
                    .collect()
            })
            .unwrap_or_default();
        out.sort_unstable_by_key(|(seq, _)| *seq);
        Ok(out.into_iter().map(|(_, e)| e).collect())
    }

    pub fn degree(&self, v: VertexId) -> usize {
        self.adjacency.get(&v).map_or(0, Vec::len)
    }
}
