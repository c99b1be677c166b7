//! Node ID for the string computation graph
//!
//! A node's identity is its position in the graph's flat array.

use std::fmt;

/// Positional identifier of a node.
///
/// Handed back by [`Graph`](super::Graph) when a node is appended. The
/// value equals the node's position in the serialized array and never
/// changes afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(pub usize);

impl NodeId {
    /// Create a new NodeId with the given position.
    ///
    /// # Examples
    ///
    /// ```
    /// use strgraph::graph::NodeId;
    ///
    /// let id = NodeId::new(42);
    /// assert_eq!(id.index(), 42);
    /// ```
    #[inline]
    pub fn new(index: usize) -> Self {
        NodeId(index)
    }

    /// Returns the position of the node in the flat array.
    #[inline]
    pub fn index(&self) -> usize {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl From<NodeId> for usize {
    fn from(id: NodeId) -> Self {
        id.0
    }
}
