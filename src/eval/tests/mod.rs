//! Evaluator unit tests

use crate::error::{EvalError, ErrorKind};
use crate::eval::{evaluate, evaluate_with, EvalConfig, Evaluator};
use crate::graph::{permute, CaseKind, FlatNode, Graph, NodeId, PatternMode};


/// `constant("Hello")`, `constant("World")`, upper-case the second,
/// concatenate, then replace `"llo"` with the concatenation itself.
fn reference_graph() -> (Graph, NodeId) {
    let mut graph = Graph::new();
    let hello = graph.new_constant("Hello");
    let world = graph.new_constant("World");
    let upper = graph.new_case_conversion(world, CaseKind::Upper);
    let joined = graph.new_concatenation(&[hello, upper]);
    let llo = graph.new_constant("llo");
    let replaced = graph.new_replacement(joined, llo, joined);
    (graph, replaced)
}

/// Node 0 and node 1 reference each other.
fn two_cycle() -> Vec<FlatNode> {
    vec![
        FlatNode::new(0, "concatenation").with_operands([1]),
        FlatNode::new(1, "concatenation").with_operands([0]),
    ]
}

#[cfg(test)]
mod scenario_tests {
    use super::*;

    #[test]
    fn test_reference_scenario() {
        let (graph, output) = reference_graph();
        assert_eq!(graph.eval(output).unwrap(), "HeHelloWORLDWORLD");
    }

    #[test]
    fn test_intermediate_values() {
        let (graph, _) = reference_graph();
        assert_eq!(graph.eval(NodeId(2)).unwrap(), "WORLD");
        assert_eq!(graph.eval(NodeId(3)).unwrap(), "HelloWORLD");
    }

    #[test]
    fn test_reversed_indices_evaluate_identically() {
        let (graph, output) = reference_graph();
        let len = graph.len();
        let perm: Vec<usize> = (0..len).rev().collect();
        let shuffled = permute(graph.nodes(), &perm).unwrap();

        for i in 0..len {
            assert_eq!(
                evaluate(&shuffled, perm[i]).unwrap(),
                graph.eval(NodeId(i)).unwrap()
            );
        }
        assert_eq!(
            evaluate(&shuffled, perm[output.index()]).unwrap(),
            "HeHelloWORLDWORLD"
        );
    }

    #[test]
    fn test_forward_references() {
        let nodes = vec![
            FlatNode::new(0, "concatenation").with_operands([2, 1]),
            FlatNode::new(1, "constant").with_arg("value", "b"),
            FlatNode::new(2, "constant").with_arg("value", "a"),
        ];
        assert_eq!(evaluate(&nodes, 0).unwrap(), "ab");
    }
}

#[cfg(test)]
mod semantics_tests {
    use super::*;

    #[test]
    fn test_concatenation_identity() {
        let mut graph = Graph::new();
        let empty = graph.new_concatenation(&[]);
        let a = graph.new_constant("a");
        let single = graph.new_concatenation(&[a]);

        assert_eq!(graph.eval(empty).unwrap(), "");
        assert_eq!(graph.eval(single).unwrap(), "a");
    }

    #[test]
    fn test_concatenation_order_and_repeats() {
        let mut graph = Graph::new();
        let a = graph.new_constant("a");
        let b = graph.new_constant("b");
        let out = graph.new_concatenation(&[b, a, b, b]);
        assert_eq!(graph.eval(out).unwrap(), "babb");
    }

    #[test]
    fn test_substring_clamping() {
        let mut graph = Graph::new();
        let abc = graph.new_constant("abc");
        let head = graph.new_substring(abc, -5, 2);
        let past = graph.new_substring(abc, 5, 9);
        let inverted = graph.new_substring(abc, 2, 1);
        let whole = graph.new_substring(abc, 0, 100);

        assert_eq!(graph.eval(head).unwrap(), "ab");
        assert_eq!(graph.eval(past).unwrap(), "");
        assert_eq!(graph.eval(inverted).unwrap(), "");
        assert_eq!(graph.eval(whole).unwrap(), "abc");
    }

    #[test]
    fn test_replacement_does_not_rescan() {
        let mut graph = Graph::new();
        let a = graph.new_constant("llo");
        let he = graph.new_constant("He");
        let llo = graph.new_constant("llo");
        let b = graph.new_concatenation(&[he, llo]);
        let out = graph.new_replacement(b, a, b);

        assert_eq!(graph.eval(b).unwrap(), "Hello");
        assert_eq!(graph.eval(out).unwrap(), "HeHello");
    }

    #[test]
    fn test_replacement_with_empty_old_is_noop() {
        let mut graph = Graph::new();
        let text = graph.new_constant("abc");
        let empty = graph.new_constant("");
        let x = graph.new_constant("x");
        let out = graph.new_replacement(text, empty, x);
        assert_eq!(graph.eval(out).unwrap(), "abc");
    }

    #[test]
    fn test_length_feeds_other_nodes() {
        let mut graph = Graph::new();
        let word = graph.new_constant("héllo");
        let len = graph.new_length_calculation(word);
        let label = graph.new_constant("len=");
        let out = graph.new_concatenation(&[label, len]);
        assert_eq!(graph.eval(out).unwrap(), "len=5");
    }

    #[test]
    fn test_pattern_matching_modes() {
        let mut graph = Graph::new();
        let text = graph.new_constant("order 1234 shipped");
        let digits = graph.new_constant(r"\d+");
        let shipped = graph.new_constant("shipped");
        let missing = graph.new_constant("lost");

        let regex = graph.new_pattern_matching(text, digits);
        let literal = graph.new_pattern_matching_with(text, shipped, PatternMode::Literal);
        let literal_miss = graph.new_pattern_matching_with(text, missing, PatternMode::Literal);
        let test = graph.new_pattern_matching_with(text, shipped, PatternMode::Test);
        let test_miss = graph.new_pattern_matching_with(text, missing, PatternMode::Test);

        assert_eq!(graph.eval(regex).unwrap(), "1234");
        assert_eq!(graph.eval(literal).unwrap(), "shipped");
        assert_eq!(graph.eval(literal_miss).unwrap(), "");
        assert_eq!(graph.eval(test).unwrap(), "true");
        assert_eq!(graph.eval(test_miss).unwrap(), "false");
    }

    #[test]
    fn test_invalid_regex_is_reported() {
        let mut graph = Graph::new();
        let text = graph.new_constant("abc");
        let bad = graph.new_constant("(unclosed");
        let out = graph.new_pattern_matching(text, bad);

        let err = graph.eval(out).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidPattern);
        assert_eq!(err.index(), out.index());
    }
}

#[cfg(test)]
mod memo_tests {
    use super::*;

    #[test]
    fn test_shared_node_computed_once() {
        let mut graph = Graph::new();
        let shared = graph.new_constant("x");
        let upper = graph.new_case_conversion(shared, CaseKind::Upper);
        let parents: Vec<NodeId> = (0..5)
            .map(|_| graph.new_concatenation(&[upper, upper]))
            .collect();
        let out = graph.new_concatenation(&parents);

        let (value, stats) = Evaluator::new(graph.nodes())
            .evaluate_with_stats(out.index())
            .unwrap();
        assert_eq!(value, "X".repeat(10));
        // shared + upper + 5 parents + out
        assert_eq!(stats.computed, 8);
        // the first parent computes `upper` and then hits it, the other four hit it twice
        assert_eq!(stats.cache_hits, 9);
    }

    #[test]
    fn test_replacement_operands_resolved_once() {
        let (graph, output) = reference_graph();
        let (_, stats) = Evaluator::new(graph.nodes())
            .evaluate_with_stats(output.index())
            .unwrap();
        assert_eq!(stats.computed, graph.len());
        assert_eq!(stats.cache_hits, 1);
    }

    #[test]
    fn test_unreachable_nodes_are_never_validated() {
        let nodes = vec![
            FlatNode::new(0, "constant").with_arg("value", "ok"),
            FlatNode::new(1, "no_such_type"),
            FlatNode::new(2, "length_calculation").with_operands([99]),
            FlatNode::new(3, "concatenation").with_operands([3]),
            FlatNode::new(4, "concatenation").with_operands(["x"]),
            FlatNode::from(serde_json::json!({"node_type": 7, "nodes": "x"})),
            FlatNode::from(serde_json::json!("not a record")),
        ];
        let (value, stats) = Evaluator::new(&nodes).evaluate_with_stats(0).unwrap();
        assert_eq!(value, "ok");
        assert_eq!(stats.computed, 1);
    }

    #[test]
    fn test_each_call_owns_its_memo() {
        let (graph, output) = reference_graph();
        let evaluator = Evaluator::new(graph.nodes());
        let (_, first) = evaluator.evaluate_with_stats(output.index()).unwrap();
        let (_, second) = evaluator.evaluate_with_stats(output.index()).unwrap();
        assert_eq!(first, second);
    }
}

#[cfg(test)]
mod error_tests {
    use super::*;

    #[test]
    fn test_two_node_cycle() {
        let nodes = two_cycle();
        for output in 0..2 {
            let err = evaluate(&nodes, output).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::CyclicDependency);
            assert_eq!(err, EvalError::CyclicDependency { index: output });
        }
    }

    #[test]
    fn test_cycle_reached_from_outside() {
        let mut nodes = two_cycle();
        nodes.push(FlatNode::new(2, "length_calculation").with_operands([1]));
        let err = evaluate(&nodes, 2).unwrap_err();
        assert_eq!(err, EvalError::CyclicDependency { index: 1 });
    }

    #[test]
    fn test_self_reference() {
        let nodes = vec![FlatNode::new(0, "replacement").with_operands([0, 0, 0])];
        assert_eq!(
            evaluate(&nodes, 0).unwrap_err(),
            EvalError::CyclicDependency { index: 0 }
        );
    }

    #[test]
    fn test_invalid_output() {
        let (graph, _) = reference_graph();
        let err = evaluate(graph.nodes(), 100).unwrap_err();
        assert_eq!(
            err,
            EvalError::InvalidOutput {
                output: 100,
                len: graph.len()
            }
        );
        assert!(evaluate(&[], 0).is_err());
    }

    #[test]
    fn test_fault_deep_in_graph_names_offending_node() {
        let nodes = vec![
            FlatNode::new(0, "concatenation").with_operands([1, 2]),
            FlatNode::new(1, "constant").with_arg("value", "a"),
            FlatNode::new(2, "case_conversion")
                .with_operands([1])
                .with_arg("type", "sideways"),
        ];
        let err = evaluate(&nodes, 0).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MalformedArguments);
        assert_eq!(err.index(), 2);
    }

    #[test]
    fn test_depth_limit() {
        let mut graph = Graph::new();
        let mut last = graph.new_constant("x");
        for _ in 0..50 {
            last = graph.new_concatenation(&[last]);
        }

        let shallow = EvalConfig::default().with_max_depth(10);
        let err = Evaluator::with_config(graph.nodes(), shallow)
            .evaluate(last.index())
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DepthLimitExceeded);

        let exact = EvalConfig::default().with_max_depth(50);
        let (value, stats) = Evaluator::with_config(graph.nodes(), exact)
            .evaluate_with_stats(last.index())
            .unwrap();
        assert_eq!(value, "x");
        assert_eq!(stats.max_depth_reached, 50);
    }

    #[test]
    fn test_deep_chain_within_default_limit() {
        let mut graph = Graph::with_capacity(5_001);
        let mut last = graph.new_constant("a");
        for _ in 0..5_000 {
            last = graph.new_concatenation(&[last]);
        }
        assert_eq!(graph.eval(last).unwrap(), "a");
    }

    #[test]
    fn test_error_codes_are_distinct() {
        let kinds = [
            ErrorKind::OutOfRangeReference,
            ErrorKind::UnknownNodeType,
            ErrorKind::MalformedArguments,
            ErrorKind::CyclicDependency,
            ErrorKind::DepthLimitExceeded,
            ErrorKind::InvalidPattern,
            ErrorKind::InvalidOutput,
        ];
        let mut codes: Vec<&str> = kinds.iter().map(|k| k.code()).collect();
        codes.sort_unstable();
        codes.dedup();
        assert_eq!(codes.len(), kinds.len());
    }

    #[test]
    fn test_evaluate_with_selects_evaluator() {
        let (graph, output) = reference_graph();
        let sequential = evaluate_with(graph.nodes(), output.index(), &EvalConfig::default());
        let parallel = evaluate_with(
            graph.nodes(),
            output.index(),
            &EvalConfig::default().with_parallel(2),
        );
        assert_eq!(sequential.unwrap(), parallel.unwrap());
    }
}
