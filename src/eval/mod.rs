//! Graph evaluator
//!
//! Resolves one output node of a flat array into its string value.
//!
//! Resolution is a memoized depth-first walk from the output node:
//!
//! 1. A node already computed in this run is served from the memo.
//! 2. A node found `InProgress` is being re-entered: cyclic dependency.
//! 3. Otherwise the node is decoded (all shape checks happen here), marked
//!    `InProgress`, its operands are resolved, its value rule runs, and the
//!    value is memoized.
//!
//! Only nodes reachable from the output are ever visited, and results do
//! not depend on how indices were assigned. The memo and visitation state
//! belong to a single call; the flat array is only borrowed, so one array
//! may be evaluated from many threads at once.
//!
//! [`parallel`] offers an evaluator that spreads independent nodes over a
//! thread pool.

pub mod ops;
pub mod parallel;

pub use parallel::ParallelEvaluator;

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use tracing::{debug, trace, warn};

use crate::error::EvalError;
use crate::graph::{FlatNode, Node};

/// Minimum stack space to keep available before recursing (100KB red zone).
pub(crate) const RED_ZONE: usize = 100 * 1024;

/// Stack space allocated when the red zone is reached (1MB).
pub(crate) const STACK_PER_RECURSION: usize = 1024 * 1024;

/// Evaluator settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvalConfig {
    /// Longest dependency chain followed below the output node
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,
    /// Use [`ParallelEvaluator`]
    #[serde(default)]
    pub parallel: bool,
    /// Worker threads for parallel evaluation, 0 for the global pool
    #[serde(default)]
    pub threads: usize,
}

fn default_max_depth() -> usize {
    10_000
}

impl Default for EvalConfig {
    fn default() -> Self {
        Self {
            max_depth: default_max_depth(),
            parallel: false,
            threads: 0,
        }
    }
}

impl EvalConfig {
    pub fn with_max_depth(
        mut self,
        max_depth: usize,
    ) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn with_parallel(
        mut self,
        threads: usize,
    ) -> Self {
        self.parallel = true;
        self.threads = threads;
        self
    }
}

/// Counters for one evaluation run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EvalStats {
    /// Value rules executed (one per distinct reachable node)
    pub computed: usize,
    /// References served from the memo
    pub cache_hits: usize,
    /// Deepest dependency chain followed
    pub max_depth_reached: usize,
}

/// Evaluate `output` over `nodes` with the default configuration.
pub fn evaluate(
    nodes: &[FlatNode],
    output: usize,
) -> Result<String, EvalError> {
    Evaluator::new(nodes).evaluate(output)
}

/// Evaluate `output` over `nodes`, picking the evaluator from `config`.
pub fn evaluate_with(
    nodes: &[FlatNode],
    output: usize,
    config: &EvalConfig,
) -> Result<String, EvalError> {
    if config.parallel {
        ParallelEvaluator::new(nodes, config.clone()).evaluate(output)
    } else {
        Evaluator::with_config(nodes, config.clone()).evaluate(output)
    }
}

/// Sequential memoizing evaluator over a borrowed flat array.
#[derive(Debug, Clone)]
pub struct Evaluator<'a> {
    nodes: &'a [FlatNode],
    config: EvalConfig,
}

impl<'a> Evaluator<'a> {
    pub fn new(nodes: &'a [FlatNode]) -> Self {
        Self::with_config(nodes, EvalConfig::default())
    }

    pub fn with_config(
        nodes: &'a [FlatNode],
        config: EvalConfig,
    ) -> Self {
        Self { nodes, config }
    }

    #[inline]
    pub fn config(&self) -> &EvalConfig {
        &self.config
    }

    /// Compute the value of node `output`.
    pub fn evaluate(
        &self,
        output: usize,
    ) -> Result<String, EvalError> {
        self.evaluate_with_stats(output).map(|(value, _)| value)
    }

    /// Compute the value of node `output` and report run counters.
    pub fn evaluate_with_stats(
        &self,
        output: usize,
    ) -> Result<(String, EvalStats), EvalError> {
        if output >= self.nodes.len() {
            return Err(EvalError::InvalidOutput {
                output,
                len: self.nodes.len(),
            });
        }

        let mut run = Run {
            nodes: self.nodes,
            max_depth: self.config.max_depth,
            slots: HashMap::new(),
            stats: EvalStats::default(),
        };

        if let Err(err) = run.resolve(output, 0) {
            warn!(code = err.kind().code(), "evaluation failed: {}", err);
            return Err(err);
        }

        debug!(
            output,
            computed = run.stats.computed,
            cache_hits = run.stats.cache_hits,
            "evaluation finished"
        );
        let value = match run.slots.remove(&output) {
            Some(Slot::Done(value)) => value,
            _ => return Err(EvalError::CyclicDependency { index: output }),
        };
        Ok((value, run.stats))
    }
}

/// Visitation state of one node within a run.
#[derive(Debug)]
enum Slot {
    InProgress,
    Done(String),
}

/// State private to one `evaluate` call.
struct Run<'a> {
    nodes: &'a [FlatNode],
    max_depth: usize,
    slots: HashMap<usize, Slot>,
    stats: EvalStats,
}

impl<'a> Run<'a> {
    fn resolve(
        &mut self,
        index: usize,
        depth: usize,
    ) -> Result<(), EvalError> {
        match self.slots.get(&index) {
            Some(Slot::Done(_)) => {
                self.stats.cache_hits += 1;
                trace!(index, "memo hit");
                return Ok(());
            }
            Some(Slot::InProgress) => return Err(EvalError::CyclicDependency { index }),
            None => {}
        }

        if depth > self.max_depth {
            return Err(EvalError::DepthLimitExceeded {
                index,
                max_depth: self.max_depth,
            });
        }
        self.stats.max_depth_reached = self.stats.max_depth_reached.max(depth);

        let nodes = self.nodes;
        let node = Node::decode(index, &nodes[index], nodes.len())?;
        let operands = node.operands();

        self.slots.insert(index, Slot::InProgress);
        for &operand in &operands {
            stacker::maybe_grow(RED_ZONE, STACK_PER_RECURSION, || {
                self.resolve(operand, depth + 1)
            })?;
        }

        let value = {
            let values: Option<SmallVec<[&str; 4]>> =
                operands.iter().map(|op| self.memoized(*op)).collect();
            let values = values.ok_or(EvalError::CyclicDependency { index })?;
            ops::apply(index, node.kind(), &values)?
        };
        self.stats.computed += 1;
        debug!(index, node_type = node.node_type().tag(), "computed node");

        self.slots.insert(index, Slot::Done(value));
        Ok(())
    }

    fn memoized(
        &self,
        index: usize,
    ) -> Option<&str> {
        match self.slots.get(&index) {
            Some(Slot::Done(value)) => Some(value.as_str()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests;
