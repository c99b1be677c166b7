//! One flat array shared by many concurrent evaluations

use std::thread;

use strgraph::graph::{CaseKind, Graph, NodeId};
use strgraph::{evaluate, Evaluator};

fn layered_graph() -> (Graph, Vec<NodeId>) {
    let mut graph = Graph::new();
    let base = graph.new_constant("ab");
    let mut outputs = Vec::new();
    let mut previous = base;
    for i in 0..16 {
        let tag = graph.new_constant(i.to_string());
        let joined = graph.new_concatenation(&[previous, tag]);
        let upper = graph.new_case_conversion(joined, CaseKind::Upper);
        outputs.push(upper);
        previous = joined;
    }
    (graph, outputs)
}

#[test]
fn test_concurrent_calls_share_the_array() {
    let (graph, outputs) = layered_graph();
    let nodes = graph.nodes();
    let expected: Vec<String> = outputs
        .iter()
        .map(|id| evaluate(nodes, id.index()).unwrap())
        .collect();

    thread::scope(|scope| {
        let handles: Vec<_> = outputs
            .iter()
            .map(|id| {
                scope.spawn(move || {
                    let (value, stats) = Evaluator::new(nodes)
                        .evaluate_with_stats(id.index())
                        .unwrap();
                    assert!(stats.computed > 0);
                    value
                })
            })
            .collect();
        for (handle, expected) in handles.into_iter().zip(&expected) {
            assert_eq!(&handle.join().unwrap(), expected);
        }
    });

    assert_eq!(expected[2], "AB012");
}
