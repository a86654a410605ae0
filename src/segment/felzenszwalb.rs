use super::component::Component;
use super::options::SegmentOptions;
use crate::error::{Error, Result};
use crate::graph::{Edge, Graph};
use crate::types::VertexId;
use log::debug;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

/// Partition of the graph vertices into regions.
#[derive(Clone, Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Segmentation {
    /// Vertex → component id.
    pub labels: BTreeMap<VertexId, usize>,
    /// Live components, ids `0..n` in order of their smallest member.
    pub components: Vec<Component>,
}

impl Segmentation {
    pub fn num_components(&self) -> usize {
        self.components.len()
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    pub fn component_of(&self, v: VertexId) -> Option<usize> {
        self.labels.get(&v).copied()
    }

    pub fn region_sizes(&self) -> Vec<usize> {
        self.components.iter().map(Component::size).collect()
    }

    /// Ids of the `n` largest components, largest first; ties by id.
    pub fn largest(&self, n: usize) -> Vec<usize> {
        let mut ids: Vec<usize> = (0..self.components.len()).collect();
        ids.sort_by(|&a, &b| {
            self.components[b]
                .size()
                .cmp(&self.components[a].size())
                .then(a.cmp(&b))
        });
        ids.truncate(n);
        ids
    }
}

/// Disjoint-set forest over dense vertex slots; each root owns its component.
struct Forest {
    parent: Vec<usize>,
    slots: Vec<Component>,
}

impl Forest {
    fn new(vertices: &[VertexId]) -> Self {
        Self {
            parent: (0..vertices.len()).collect(),
            slots: vertices
                .iter()
                .enumerate()
                .map(|(i, &v)| Component::singleton(i, v))
                .collect(),
        }
    }

    fn find(&mut self, mut i: usize) -> usize {
        while self.parent[i] != i {
            self.parent[i] = self.parent[self.parent[i]];
            i = self.parent[i];
        }
        i
    }

    /// Union by size; the lower slot wins ties so results are reproducible.
    fn union(&mut self, a: usize, b: usize, w: f64) -> usize {
        let (sa, sb) = (self.slots[a].size(), self.slots[b].size());
        let (root, child) = if sa > sb || (sa == sb && a < b) {
            (a, b)
        } else {
            (b, a)
        };
        let mut absorbed = std::mem::replace(
            &mut self.slots[child],
            Component {
                id: child,
                members: Vec::new(),
                internal_diff: 0.0,
            },
        );
        self.slots[root].merge(&mut absorbed, w);
        self.parent[child] = root;
        root
    }
}

/// Felzenszwalb-Huttenlocher greedy graph segmentation.
///
/// Edges are processed by ascending weight; ties keep the graph's insertion
/// order (stable sort), so identical input always yields identical output.
/// Two regions merge through edge `w` iff
/// `w <= min(Int(Cu) + k/|Cu|, Int(Cv) + k/|Cv|)`. An edge met after its
/// endpoints already share a region raises that region's `Int(C)` if larger,
/// which keeps `Int(C)` equal to the heaviest edge inside `C`.
///
/// With `min_size > 1` a second pass joins regions smaller than `min_size`
/// to their cheapest neighbour.
pub fn segment_graph(graph: &Graph, options: &SegmentOptions) -> Result<Segmentation> {
    options.validate()?;
    let vertices: Vec<VertexId> = graph.vertices().collect();
    if vertices.is_empty() {
        return Ok(Segmentation::default());
    }
    let slot_of: HashMap<VertexId, usize> =
        vertices.iter().enumerate().map(|(i, &v)| (v, i)).collect();

    let mut edges: Vec<Edge> = graph.edges();
    if let Some(bad) = edges.iter().find(|e| !e.weight.is_finite()) {
        return Err(Error::bad_argument(format!(
            "edge {{{}, {}}} has non-finite weight {}",
            bad.u, bad.v, bad.weight
        )));
    }
    edges.sort_by(|a, b| a.weight.total_cmp(&b.weight));

    let mut forest = Forest::new(&vertices);
    let mut merges = 0usize;
    for e in &edges {
        let ru = forest.find(slot_of[&e.u]);
        let rv = forest.find(slot_of[&e.v]);
        if ru == rv {
            // Unlike the paper, which skips this edge, it still counts toward
            // Int(C) so that Int(C) stays the heaviest edge inside C.
            forest.slots[ru].observe_internal(e.weight);
            continue;
        }
        let mint = forest.slots[ru]
            .threshold(options.k)
            .min(forest.slots[rv].threshold(options.k));
        if e.weight <= mint {
            forest.union(ru, rv, e.weight);
            merges += 1;
        }
    }

    let mut small_merges = 0usize;
    if options.min_size > 1 {
        for e in &edges {
            let ru = forest.find(slot_of[&e.u]);
            let rv = forest.find(slot_of[&e.v]);
            if ru == rv {
                forest.slots[ru].observe_internal(e.weight);
                continue;
            }
            if forest.slots[ru].size() < options.min_size
                || forest.slots[rv].size() < options.min_size
            {
                forest.union(ru, rv, e.weight);
                small_merges += 1;
            }
        }
    }

    let segmentation = collect(&vertices, &mut forest);
    debug!(
        "segmentation: k={} vertices={} edges={} merges={} small_merges={} regions={}",
        options.k,
        vertices.len(),
        edges.len(),
        merges,
        small_merges,
        segmentation.num_components()
    );
    Ok(segmentation)
}

fn collect(vertices: &[VertexId], forest: &mut Forest) -> Segmentation {
    let mut id_of_root: HashMap<usize, usize> = HashMap::new();
    let mut components: Vec<Component> = Vec::new();
    let mut labels = BTreeMap::new();
    for (slot, &v) in vertices.iter().enumerate() {
        let root = forest.find(slot);
        let id = *id_of_root.entry(root).or_insert_with(|| {
            components.push(Component {
                id: components.len(),
                members: Vec::with_capacity(forest.slots[root].size()),
                internal_diff: forest.slots[root].internal_diff,
            });
            components.len() - 1
        });
        components[id].members.push(v);
        labels.insert(v, id);
    }
    Segmentation { labels, components }
}
