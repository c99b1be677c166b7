//! Flat wire records
//!
//! The serialized form of a graph: an ordered array of loosely typed
//! records. Literal fields stay as JSON values here; the evaluator checks
//! their shape only when it reaches the node.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::DecodeError;

/// One node of the flat array.
///
/// ```json
/// {"index": 3, "node_type": "concatenation", "nodes": [0, 2]}
/// ```
///
/// Every field is kept as raw JSON. A record whose fields have the wrong
/// shape still decodes here and only fails once the evaluator reaches it,
/// so unreachable records are never checked.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "Value")]
pub struct FlatNode {
    /// Must equal the record's position in the array
    #[serde(skip_serializing_if = "Option::is_none")]
    pub index: Option<Value>,
    /// Operation tag, e.g. `"substring"`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub node_type: Option<Value>,
    /// Operand node indices
    #[serde(rename = "nodes", skip_serializing_if = "Option::is_none")]
    pub operands: Option<Value>,
    /// Type-specific literal fields (`value`, `start`, `end`, `type`, `mode`)
    #[serde(flatten)]
    pub args: Map<String, Value>,
    /// A record that is not a JSON object at all
    #[serde(skip)]
    pub(crate) stray: Option<Value>,
}

impl From<Value> for FlatNode {
    fn from(value: Value) -> Self {
        let mut args = match value {
            Value::Object(map) => map,
            other => {
                return Self {
                    stray: Some(other),
                    ..Self::default()
                }
            }
        };
        let mut take = |key: &str| args.remove(key).filter(|v| !v.is_null());
        let index = take("index");
        let node_type = take("node_type");
        let operands = take("nodes");
        Self {
            index,
            node_type,
            operands,
            args,
            stray: None,
        }
    }
}

impl FlatNode {
    pub fn new(
        index: usize,
        node_type: impl Into<String>,
    ) -> Self {
        Self {
            index: Some(index.into()),
            node_type: Some(Value::String(node_type.into())),
            ..Self::default()
        }
    }

    /// Set the operand list.
    pub fn with_operands<I>(
        mut self,
        operands: I,
    ) -> Self
    where
        I: IntoIterator,
        I::Item: Into<Value>,
    {
        self.operands = Some(Value::Array(operands.into_iter().map(Into::into).collect()));
        self
    }

    /// Set a literal field.
    pub fn with_arg(
        mut self,
        key: &str,
        value: impl Into<Value>,
    ) -> Self {
        self.args.insert(key.to_string(), value.into());
        self
    }

    /// Look up a literal field.
    #[inline]
    pub fn arg(
        &self,
        key: &str,
    ) -> Option<&Value> {
        self.args.get(key)
    }

    /// The `node_type` tag, when it is a string.
    pub fn tag(&self) -> Option<&str> {
        self.node_type.as_ref().and_then(Value::as_str)
    }

    /// The declared `index`, when it is a non-negative integer.
    pub fn declared_index(&self) -> Option<u64> {
        self.index.as_ref().and_then(Value::as_u64)
    }

    /// Operand entries that are integers, in order. Other entries are skipped.
    pub fn operand_refs(&self) -> impl Iterator<Item = i64> + '_ {
        self.operands
            .as_ref()
            .and_then(Value::as_array)
            .into_iter()
            .flatten()
            .filter_map(Value::as_i64)
    }
}

/// `{"nodes": [...]}`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphBody {
    pub nodes: Vec<FlatNode>,
}

/// A flat array paired with the node to evaluate.
///
/// ```json
/// {"graph": {"nodes": [...]}, "output_node_index": 5}
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvalRequest {
    pub graph: GraphBody,
    pub output_node_index: usize,
}

impl EvalRequest {
    pub fn new(
        nodes: Vec<FlatNode>,
        output_node_index: usize,
    ) -> Self {
        Self {
            graph: GraphBody { nodes },
            output_node_index,
        }
    }

    /// Decode a request from its JSON text.
    pub fn from_json(json: &str) -> Result<Self, DecodeError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Decode a request from a reader.
    pub fn from_reader<R: std::io::Read>(reader: R) -> Result<Self, DecodeError> {
        Ok(serde_json::from_reader(reader)?)
    }

    /// Encode the request as JSON text.
    pub fn to_json(&self) -> Result<String, DecodeError> {
        Ok(serde_json::to_string(self)?)
    }

    /// The flat array.
    #[inline]
    pub fn nodes(&self) -> &[FlatNode] {
        &self.graph.nodes
    }
}
