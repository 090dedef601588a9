//! Boundary to the externally owned graph
//!
//! The layout engine never creates or removes nodes or edges. It reads the
//! node list, seed positions, degrees and edges, and writes positions back
//! once per tick.

use std::fmt::Debug;
use std::hash::Hash;

/// A graph the simulation can lay out
pub trait LayoutGraph {
    /// Stable node identifier
    type NodeId: Clone + Eq + Hash + Debug;

    /// All nodes, in a stable iteration order
    fn nodes(&self) -> impl Iterator<Item = Self::NodeId> + '_;

    /// Current position of a node, if it has one
    fn position(&self, id: &Self::NodeId) -> Option<(f64, f64)>;

    /// Store a new position on a node
    fn set_position(&mut self, id: &Self::NodeId, x: f64, y: f64);

    /// Number of edge endpoints attached to a node
    fn degree(&self, id: &Self::NodeId) -> usize;

    /// All edges as `(source, target)` pairs
    fn edges(&self) -> impl Iterator<Item = (Self::NodeId, Self::NodeId)> + '_;

    /// Whether a node is held in place (e.g. while the user drags it)
    fn is_pinned(&self, _id: &Self::NodeId) -> bool {
        false
    }
}
