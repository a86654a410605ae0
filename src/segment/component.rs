use crate::types::VertexId;
use serde::Serialize;

/// Segmentation region: member vertices plus the internal difference `Int(C)`,
/// the largest edge weight with both endpoints inside the region.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Component {
    pub id: usize,
    pub members: Vec<VertexId>,
    pub internal_diff: f64,
}

impl Component {
    pub fn singleton(id: usize, vertex: VertexId) -> Self {
        Self {
            id,
            members: vec![vertex],
            internal_diff: 0.0,
        }
    }

    pub fn size(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Merge threshold `Int(C) + k / |C|`.
    pub fn threshold(&self, k: f64) -> f64 {
        self.internal_diff + k / self.members.len().max(1) as f64
    }

    /// Absorbs `other` through an edge of weight `w`; `other` is left empty.
    pub fn merge(&mut self, other: &mut Component, w: f64) {
        self.members.append(&mut other.members);
        self.internal_diff = self.internal_diff.max(other.internal_diff).max(w);
        other.internal_diff = 0.0;
    }

    /// Records an edge found to lie inside the component.
    pub fn observe_internal(&mut self, w: f64) {
        if w > self.internal_diff {
            self.internal_diff = w;
        }
    }
}
