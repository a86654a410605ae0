//! Graph-based DEM segmentation.
//!
//! Implements the greedy region merging of Felzenszwalb and Huttenlocher,
//! "Efficient Graph-Based Image Segmentation" (2004), on the cell graph built
//! by [`crate::graph::build_graph`]. Regions carry their internal difference,
//! and the output labeling is deterministic for a given graph and `k`.

mod component;
mod felzenszwalb;
mod options;

pub use component::Component;
pub use felzenszwalb::{segment_graph, Segmentation};
pub use options::SegmentOptions;
