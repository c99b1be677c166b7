//! Level-sharded parallel evaluation
//!
//! Two phases:
//!
//! 1. **Plan** (sequential): a depth-first walk of the reachable subgraph
//!    decodes every node, checks references, detects cycles and assigns
//!    each node a level, `1 + max(level of its operands)`.
//! 2. **Execute**: levels run in increasing order. Nodes of one level never
//!    depend on each other, so they are computed on the thread pool at
//!    once, reading operand values from the shared memo. The memo is
//!    written only between levels.
//!
//! A node sits in exactly one level, so its value rule runs exactly once.
//! When several nodes of a level fail, the first in plan order wins.

use std::collections::HashMap;
use std::sync::Arc;

use once_cell::sync::Lazy;
use parking_lot::{Mutex, RwLock};
use rayon::prelude::*;
use smallvec::SmallVec;
use tracing::{debug, trace, warn};

use super::{ops, EvalConfig, EvalStats, RED_ZONE, STACK_PER_RECURSION};
use crate::error::EvalError;
use crate::graph::{FlatNode, Node};

/// Dedicated pools, one per requested thread count, shared by every
/// evaluator for the life of the process.
static POOLS: Lazy<Mutex<HashMap<usize, Arc<rayon::ThreadPool>>>> =
    Lazy::new(|| Mutex::new(HashMap::new()));

/// The shared pool with `threads` workers, built on first use.
pub(crate) fn shared_pool(
    threads: usize,
) -> Result<Arc<rayon::ThreadPool>, rayon::ThreadPoolBuildError> {
    let mut pools = POOLS.lock();
    if let Some(pool) = pools.get(&threads) {
        return Ok(Arc::clone(pool));
    }
    let pool = Arc::new(
        rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(move |i| format!("strgraph-eval-{threads}-{i}"))
            .build()?,
    );
    debug!(threads, "built evaluation thread pool");
    pools.insert(threads, Arc::clone(&pool));
    Ok(pool)
}

/// Evaluator that computes independent nodes concurrently.
///
/// Evaluators asking for the same `threads` count share one pool, so
/// constructing one per request is cheap.
#[derive(Debug)]
pub struct ParallelEvaluator<'a> {
    nodes: &'a [FlatNode],
    config: EvalConfig,
    pool: Option<Arc<rayon::ThreadPool>>,
}

impl<'a> ParallelEvaluator<'a> {
    pub fn new(
        nodes: &'a [FlatNode],
        config: EvalConfig,
    ) -> Self {
        let pool = match config.threads {
            0 => None,
            threads => match shared_pool(threads) {
                Ok(pool) => Some(pool),
                Err(err) => {
                    warn!("falling back to the global thread pool: {}", err);
                    None
                }
            },
        };
        Self {
            nodes,
            config,
            pool,
        }
    }

    pub fn evaluate(
        &self,
        output: usize,
    ) -> Result<String, EvalError> {
        self.evaluate_with_stats(output).map(|(value, _)| value)
    }

    pub fn evaluate_with_stats(
        &self,
        output: usize,
    ) -> Result<(String, EvalStats), EvalError> {
        let result = self.plan(output).and_then(|plan| self.execute(output, plan));
        if let Err(err) = &result {
            warn!(code = err.kind().code(), "parallel evaluation failed: {}", err);
        }
        result
    }

    fn plan(
        &self,
        output: usize,
    ) -> Result<Plan<'a>, EvalError> {
        if output >= self.nodes.len() {
            return Err(EvalError::InvalidOutput {
                output,
                len: self.nodes.len(),
            });
        }
        let mut planner = Planner {
            nodes: self.nodes,
            max_depth: self.config.max_depth,
            marks: HashMap::new(),
            plan: Plan::default(),
        };
        planner.visit(output, 0)?;
        debug!(
            output,
            levels = planner.plan.levels.len(),
            nodes = planner.plan.stats.computed,
            "planned evaluation"
        );
        Ok(planner.plan)
    }

    fn execute(
        &self,
        output: usize,
        plan: Plan<'a>,
    ) -> Result<(String, EvalStats), EvalError> {
        let memo: RwLock<HashMap<usize, String>> =
            RwLock::new(HashMap::with_capacity(plan.stats.computed));

        for (depth, level) in plan.levels.iter().enumerate() {
            let computed = match &self.pool {
                Some(pool) => pool.install(|| compute_level(&memo, level)),
                None => compute_level(&memo, level),
            }?;
            trace!(level = depth, width = level.len(), "level done");
            memo.write().extend(computed);
        }

        let value = memo
            .write()
            .remove(&output)
            .ok_or(EvalError::CyclicDependency { index: output })?;
        Ok((value, plan.stats))
    }
}

fn compute_level(
    memo: &RwLock<HashMap<usize, String>>,
    level: &[Node<'_>],
) -> Result<Vec<(usize, String)>, EvalError> {
    level
        .par_iter()
        .map(|node| {
            let memo = memo.read();
            let index = node.index();
            let values: Option<SmallVec<[&str; 4]>> = node
                .operands()
                .iter()
                .map(|op| memo.get(op).map(String::as_str))
                .collect();
            let values = values.ok_or(EvalError::CyclicDependency { index })?;
            let value = ops::apply(index, node.kind(), &values)?;
            debug!(index, node_type = node.node_type().tag(), "computed node");
            Ok((index, value))
        })
        .collect::<Vec<_>>()
        .into_iter()
        .collect()
}

/// Reachable nodes grouped by level.
#[derive(Debug, Default)]
struct Plan<'a> {
    levels: Vec<Vec<Node<'a>>>,
    stats: EvalStats,
}

#[derive(Debug, Clone, Copy)]
enum Mark {
    InProgress,
    Level(usize),
}

struct Planner<'a> {
    nodes: &'a [FlatNode],
    max_depth: usize,
    marks: HashMap<usize, Mark>,
    plan: Plan<'a>,
}

impl<'a> Planner<'a> {
    /// Plan `index` and everything below it; returns its level.
    fn visit(
        &mut self,
        index: usize,
        depth: usize,
    ) -> Result<usize, EvalError> {
        match self.marks.get(&index) {
            Some(Mark::Level(level)) => {
                self.plan.stats.cache_hits += 1;
                return Ok(*level);
            }
            Some(Mark::InProgress) => return Err(EvalError::CyclicDependency { index }),
            None => {}
        }

        if depth > self.max_depth {
            return Err(EvalError::DepthLimitExceeded {
                index,
                max_depth: self.max_depth,
            });
        }
        let stats = &mut self.plan.stats;
        stats.max_depth_reached = stats.max_depth_reached.max(depth);

        let nodes = self.nodes;
        let node = Node::decode(index, &nodes[index], nodes.len())?;

        self.marks.insert(index, Mark::InProgress);
        let mut level = 0;
        for operand in node.operands() {
            let below = stacker::maybe_grow(RED_ZONE, STACK_PER_RECURSION, || {
                self.visit(operand, depth + 1)
            })?;
            level = level.max(below + 1);
        }
        self.marks.insert(index, Mark::Level(level));

        if self.plan.levels.len() <= level {
            self.plan.levels.resize_with(level + 1, Vec::new);
        }
        self.plan.levels[level].push(node);
        self.plan.stats.computed += 1;
        Ok(level)
    }
}
