use std::sync::Arc;

use raccoon_ecs::{DependencyGraph, SystemDependencyTracer, SystemState};

fn tracer_over(nodes: usize, edges: &[(usize, usize)]) -> SystemDependencyTracer {
    let mut graph = DependencyGraph::new();
    graph.init_nodes(nodes);
    for &(dependency, dependent) in edges {
        graph.add_dependency(dependency, dependent);
    }
    graph.finalize();
    SystemDependencyTracer::new(Arc::new(graph))
}

fn assert_ready(tracer: &SystemDependencyTracer, expected: &[usize]) {
    let mut ready = tracer.get_next_systems_to_run();
    ready.sort_unstable();
    assert_eq!(ready, expected);
}

#[test]
fn two_independent_systems() {
    let mut tracer = tracer_over(2, &[]);
    assert_ready(&tracer, &[0, 1]);

    tracer.run_system(1);
    assert_ready(&tracer, &[0]);
    tracer.finish_system(1);
    assert_ready(&tracer, &[0]);

    tracer.run_system(0);
    assert_ready(&tracer, &[]);
    tracer.finish_system(0);
    assert_ready(&tracer, &[]);
    assert!(tracer.is_finished());
}

#[test]
fn two_systems_in_a_chain() {
    let mut tracer = tracer_over(2, &[(0, 1)]);
    assert_ready(&tracer, &[0]);

    tracer.run_system(0);
    assert_ready(&tracer, &[]);
    assert_eq!(tracer.state(0), SystemState::Running);
    tracer.finish_system(0);
    assert_ready(&tracer, &[1]);

    tracer.run_system(1);
    assert_ready(&tracer, &[]);
    tracer.finish_system(1);
    assert_ready(&tracer, &[]);
    assert_eq!(tracer.state(1), SystemState::Finished);
}

#[test]
fn independent_systems_run_in_parallel() {
    let mut tracer = tracer_over(2, &[]);
    tracer.run_system(1);
    tracer.run_system(0);
    assert_eq!(tracer.running_count(), 2);
    assert_ready(&tracer, &[]);

    tracer.finish_system(1);
    tracer.finish_system(0);
    assert_ready(&tracer, &[]);
    assert!(tracer.is_finished());
}

#[test]
fn four_systems_in_two_parallel_chains() {
    let mut tracer = tracer_over(4, &[(0, 1), (2, 3)]);
    assert_ready(&tracer, &[0, 2]);

    tracer.run_system(2);
    assert_ready(&tracer, &[0]);
    tracer.run_system(0);
    assert_ready(&tracer, &[]);
    tracer.finish_system(2);
    assert_ready(&tracer, &[3]);
    tracer.finish_system(0);
    assert_ready(&tracer, &[1, 3]);

    tracer.run_system(3);
    assert_ready(&tracer, &[1]);
    tracer.finish_system(3);
    assert_ready(&tracer, &[1]);
    assert!(!tracer.is_finished());
}

#[test]
fn topological_order_respects_edges() {
    let mut graph = DependencyGraph::new();
    graph.init_nodes(4);
    graph.add_dependency(3, 0);
    graph.add_dependency(0, 1);
    graph.add_dependency(2, 1);
    graph.finalize();

    let order = graph.topological_order().unwrap();
    let position = |node| order.iter().position(|&n| n == node).unwrap();
    assert!(position(3) < position(0));
    assert!(position(0) < position(1));
    assert!(position(2) < position(1));
    assert_eq!(graph.successors(0), [1]);
    assert_eq!(graph.predecessors(1), [0, 2]);
}
