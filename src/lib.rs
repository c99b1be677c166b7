//! strgraph - string computation graphs
//!
//! A string-valued computation is a directed acyclic graph: nodes are
//! operations (constants, concatenation, substring, replacement, pattern
//! matching, case conversion, length), edges are operand indices into a
//! flat array. Evaluating an output node resolves the graph bottom-up,
//! computing every shared sub-expression once, independent of how indices
//! were assigned.
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
//! let llo = graph.new_constant("llo");
//! let out = graph.new_replacement(joined, llo, joined);
//!
//! assert_eq!(graph.eval(out).unwrap(), "HeHelloWORLDWORLD");
//! ```
//!
//! The same computation as a JSON request:
//!
//! ```
//! let json = r#"{
//!     "graph": {"nodes": [
//!         {"index": 0, "node_type": "constant", "value": "abc"},
//!         {"index": 1, "node_type": "length_calculation", "nodes": [0]}
//!     ]},
//!     "output_node_index": 1
//! }"#;
//! assert_eq!(strgraph::eval_graph_json(json).unwrap(), "3");
//! ```

#![warn(rust_2018_idioms)]

pub mod error;
pub mod eval;
pub mod graph;

// Utility modules
pub mod util;

// Re-exports
pub use error::{DecodeError, Error, ErrorKind, EvalError};
pub use eval::{evaluate, evaluate_with, EvalConfig, EvalStats, Evaluator, ParallelEvaluator};
pub use graph::{CaseKind, EvalRequest, FlatNode, Graph, NodeId, PatternMode};

use tracing::debug;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name
pub const NAME: &str = "strgraph";

/// Evaluate a JSON request with the default configuration.
pub fn eval_graph_json(json: &str) -> Result<String, Error> {
    eval_graph_json_with(json, &EvalConfig::default())
}

/// Evaluate a JSON request with `config`.
pub fn eval_graph_json_with(
    json: &str,
    config: &EvalConfig,
) -> Result<String, Error> {
    let request = EvalRequest::from_json(json)?;
    debug!(
        nodes = request.nodes().len(),
        output = request.output_node_index,
        "decoded request"
    );
    Ok(evaluate_with(
        request.nodes(),
        request.output_node_index,
        config,
    )?)
}
