use crate::types::VertexId;
use serde::Serialize;
use std::hash::{Hash, Hasher};

/// Unordered vertex pair `{u, v}` stored with `u < v`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct EdgeKey {
    pub u: VertexId,
    pub v: VertexId,
}

impl EdgeKey {
    /// `None` for self-loops.
    pub fn new(a: VertexId, b: VertexId) -> Option<Self> {
        match a.cmp(&b) {
            std::cmp::Ordering::Less => Some(Self { u: a, v: b }),
            std::cmp::Ordering::Greater => Some(Self { u: b, v: a }),
            std::cmp::Ordering::Equal => None,
        }
    }

    /// The endpoint opposite to `x`, if `x` is one of the endpoints.
    pub fn other(&self, x: VertexId) -> Option<VertexId> {
        if x == self.u {
            Some(self.v)
        } else if x == self.v {
            Some(self.u)
        } else {
            None
        }
    }
}

/// Undirected weighted edge.
///
/// Equality and hashing look only at the endpoint pair, so `{u, v}` and
/// `{v, u}` are the same edge regardless of weight.
#[derive(Clone, Copy, Debug, Serialize)]
pub struct Edge {
    pub u: VertexId,
    pub v: VertexId,
    pub weight: f64,
}

impl Edge {
    pub fn new(a: VertexId, b: VertexId, weight: f64) -> Option<Self> {
        EdgeKey::new(a, b).map(|k| Self {
            u: k.u,
            v: k.v,
            weight,
        })
    }

    pub fn key(&self) -> EdgeKey {
        EdgeKey {
            u: self.u,
            v: self.v,
        }
    }
}

impl PartialEq for Edge {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl Eq for Edge {}

impl Hash for Edge {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key().hash(state);
    }
}
