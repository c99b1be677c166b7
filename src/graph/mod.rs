//! String computation graph
//!
//! Construction side of the crate: an append-only store that hands back
//! positional ids and flattens itself into the wire array the evaluator
//! consumes.
//!
//! # Architecture
//!
//! - [`NodeId`](node_id::NodeId) - Positional identity of a node
//! - [`Graph`] - Append-only node store and builder
//! - [`FlatNode`](record::FlatNode) - One record of the flat array
//! - [`EvalRequest`](record::EvalRequest) - Flat array plus output index (JSON envelope)
//! - [`Node`](node::Node) / [`NodeKind`](node::NodeKind) - Decoded, validated operation
//!
//! # Example
//!
//! ```
//! use strgraph::graph::{CaseKind, Graph};
//!
//! let mut graph = Graph::new();
//! let hello = graph.new_constant("Hello");
//! let world = graph.new_constant("World");
//! let upper = graph.new_case_conversion(world, CaseKind::Upper);
//! let joined = graph.new_concatenation(&[hello, upper]);
//!
//! assert_eq!(graph.eval(joined).unwrap(), "HelloWORLD");
//! ```

pub mod node;
pub mod node_id;
pub mod record;

pub use node::{CaseKind, Node, NodeKind, NodeType, Operands, PatternMode};
pub use node_id::NodeId;
pub use record::{EvalRequest, FlatNode, GraphBody};

use serde_json::Value;

use crate::error::EvalError;

/// Append-only store of nodes.
///
/// Nodes are never removed or changed once added, so every [`NodeId`]
/// handed out stays valid for the life of the graph.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Graph {
    nodes: Vec<FlatNode>,
}

impl Graph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            nodes: Vec::with_capacity(capacity),
        }
    }

    /// Append a node and return its position.
    fn push(
        &mut self,
        node_type: NodeType,
        operands: Option<&[NodeId]>,
    ) -> &mut FlatNode {
        let index = self.nodes.len();
        let mut node = FlatNode::new(index, node_type.tag());
        if let Some(operands) = operands {
            node.operands = Some(operands.iter().map(|id| Value::from(id.0)).collect());
        }
        self.nodes.push(node);
        &mut self.nodes[index]
    }

    fn last_id(&self) -> NodeId {
        NodeId(self.nodes.len() - 1)
    }

    pub fn new_constant(
        &mut self,
        value: impl Into<String>,
    ) -> NodeId {
        let node = self.push(NodeType::Constant, None);
        node.args.insert("value".into(), Value::String(value.into()));
        self.last_id()
    }

    pub fn new_concatenation(
        &mut self,
        nodes: &[NodeId],
    ) -> NodeId {
        self.push(NodeType::Concatenation, Some(nodes));
        self.last_id()
    }

    /// Characters `[start, end)` of `node`; bounds are clamped when evaluated.
    pub fn new_substring(
        &mut self,
        node: NodeId,
        start: i64,
        end: i64,
    ) -> NodeId {
        let record = self.push(NodeType::Substring, Some(&[node][..]));
        record.args.insert("start".into(), start.into());
        record.args.insert("end".into(), end.into());
        self.last_id()
    }

    /// Every occurrence of `old`'s value in `node`'s value, replaced by `new`'s value.
    pub fn new_replacement(
        &mut self,
        node: NodeId,
        old: NodeId,
        new: NodeId,
    ) -> NodeId {
        self.push(NodeType::Replacement, Some(&[node, old, new][..]));
        self.last_id()
    }

    /// First match of the regular expression `pattern` in `node`.
    pub fn new_pattern_matching(
        &mut self,
        node: NodeId,
        pattern: NodeId,
    ) -> NodeId {
        self.push(NodeType::PatternMatching, Some(&[node, pattern][..]));
        self.last_id()
    }

    pub fn new_pattern_matching_with(
        &mut self,
        node: NodeId,
        pattern: NodeId,
        mode: PatternMode,
    ) -> NodeId {
        let record = self.push(NodeType::PatternMatching, Some(&[node, pattern][..]));
        record.args.insert("mode".into(), mode.tag().into());
        self.last_id()
    }

    pub fn new_case_conversion(
        &mut self,
        node: NodeId,
        case: CaseKind,
    ) -> NodeId {
        let record = self.push(NodeType::CaseConversion, Some(&[node][..]));
        record.args.insert("type".into(), case.tag().into());
        self.last_id()
    }

    pub fn new_length_calculation(
        &mut self,
        node: NodeId,
    ) -> NodeId {
        self.push(NodeType::LengthCalculation, Some(&[node][..]));
        self.last_id()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// The flat array, borrowed.
    #[inline]
    pub fn nodes(&self) -> &[FlatNode] {
        &self.nodes
    }

    /// The flat array, owned.
    pub fn serialize(&self) -> Vec<FlatNode> {
        self.nodes.clone()
    }

    pub fn eval_request(
        &self,
        output: NodeId,
    ) -> EvalRequest {
        EvalRequest::new(self.serialize(), output.0)
    }

    /// Evaluate `output` with the default configuration.
    pub fn eval(
        &self,
        output: NodeId,
    ) -> Result<String, EvalError> {
        crate::eval::evaluate(&self.nodes, output.0)
    }
}

/// Relocate every record of `nodes` under `perm` (old position `i` moves
/// to `perm[i]`) and rewrite operand references to match.
///
/// References that are out of range or not integers stay untouched. Returns `None` when
/// `perm` is not a permutation of `0..nodes.len()`.
pub fn permute(
    nodes: &[FlatNode],
    perm: &[usize],
) -> Option<Vec<FlatNode>> {
    let len = nodes.len();
    if perm.len() != len {
        return None;
    }
    let mut placed: Vec<Option<FlatNode>> = vec![None; len];
    for (old, node) in nodes.iter().enumerate() {
        let new = perm[old];
        let slot = placed.get_mut(new)?;
        if slot.is_some() {
            return None;
        }
        let mut node = node.clone();
        node.index = Some(new.into());
        if let Some(Value::Array(operands)) = node.operands.as_mut() {
            for operand in operands.iter_mut() {
                let target = operand
                    .as_u64()
                    .and_then(|i| usize::try_from(i).ok())
                    .and_then(|i| perm.get(i));
                if let Some(&target) = target {
                    *operand = target.into();
                }
            }
        }
        *slot = Some(node);
    }
    placed.into_iter().collect()
}
