//! # System Dependencies
//!
//! [`DependencyGraph`] records which systems must finish before others may
//! start. [`SystemDependencyTracer`] walks one execution of that graph.
//!
//! ## Graph
//! - Nodes are dense [`SystemIndex`] values `0..n`.
//! - `add_dependency(a, b)` records an edge *a → b*: `b` starts only after
//!   `a` has finished.
//! - `finalize` closes the graph; a finalized graph is read-only and can be
//!   shared by every tracer built from it.
//!
//! ## Tracer
//! Each node moves through `NotStarted → Running → Finished`. A node is
//! *ready* when it has not started and all of its predecessors have
//! finished. Any number of nodes may be running at once.
//!
//! ## Invariants
//! - `run_system` is only called on ready nodes and `finish_system` only on
//!   running ones; debug builds assert on both.

use std::sync::Arc;

use crate::engine::types::SystemIndex;


/// Directed acyclic graph of system ordering constraints.
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    predecessors: Vec<Vec<SystemIndex>>,
    successors: Vec<Vec<SystemIndex>>,
    finalized: bool,
}

impl DependencyGraph {
    /// Graph without nodes.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the graph with `count` unconnected nodes.
    pub fn init_nodes(&mut self, count: usize) {
        self.predecessors = vec![Vec::new(); count];
        self.successors = vec![Vec::new(); count];
        self.finalized = false;
    }

    /// Records that `dependent` may only start after `dependency` finished.
    pub fn add_dependency(&mut self, dependency: SystemIndex, dependent: SystemIndex) {
        debug_assert!(!self.finalized, "dependency added to a finalized graph");
        debug_assert!(
            dependency < self.node_count() && dependent < self.node_count(),
            "dependency {dependency} -> {dependent} is out of range for {} nodes",
            self.node_count()
        );
        if self.predecessors[dependent].contains(&dependency) {
            return;
        }
        self.predecessors[dependent].push(dependency);
        self.successors[dependency].push(dependent);
    }

    /// Closes the graph to further edges.
    pub fn finalize(&mut self) {
        self.finalized = true;
    }

    /// Returns `true` once [`DependencyGraph::finalize`] was called.
    #[inline]
    pub fn is_finalized(&self) -> bool {
        self.finalized
    }

    /// Number of nodes.
    #[inline]
    pub fn node_count(&self) -> usize {
        self.predecessors.len()
    }

    /// Nodes that must finish before `node` starts.
    pub fn predecessors(&self, node: SystemIndex) -> &[SystemIndex] {
        &self.predecessors[node]
    }

    /// Nodes waiting on `node`.
    pub fn successors(&self, node: SystemIndex) -> &[SystemIndex] {
        &self.successors[node]
    }

    /// A valid execution order, or the nodes that sit on or behind a cycle.
    pub fn topological_order(&self) -> Result<Vec<SystemIndex>, Vec<SystemIndex>> {
        let mut remaining: Vec<usize> = self.predecessors.iter().map(Vec::len).collect();
        let mut ready: Vec<SystemIndex> = (0..self.node_count()).filter(|&node| remaining[node] == 0).collect();
        let mut order = Vec::with_capacity(self.node_count());

        while let Some(node) = ready.pop() {
            order.push(node);
            for &next in &self.successors[node] {
                remaining[next] -= 1;
                if remaining[next] == 0 {
                    ready.push(next);
                }
            }
        }

        if order.len() == self.node_count() {
            Ok(order)
        } else {
            Err((0..self.node_count()).filter(|&node| remaining[node] > 0).collect())
        }
    }
}


/// Execution state of one node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SystemState {
    /// Not dispatched yet in this pass.
    NotStarted,
    /// Dispatched and not finished.
    Running,
    /// Done for this pass.
    Finished,
}

/// Tracks one pass over a finalized [`DependencyGraph`].
///
/// ## Example
/// ```
/// use std::sync::Arc;
/// use raccoon_ecs::{DependencyGraph, SystemDependencyTracer};
///
/// let mut graph = DependencyGraph::new();
/// graph.init_nodes(2);
/// graph.add_dependency(0, 1);
/// graph.finalize();
///
/// let mut tracer = SystemDependencyTracer::new(Arc::new(graph));
/// assert_eq!(tracer.get_next_systems_to_run(), vec![0]);
/// tracer.run_system(0);
/// tracer.finish_system(0);
/// assert_eq!(tracer.get_next_systems_to_run(), vec![1]);
/// ```
#[derive(Debug, Clone)]
pub struct SystemDependencyTracer {
    graph: Arc<DependencyGraph>,
    states: Vec<SystemState>,
    unfinished_predecessors: Vec<usize>,
    running: usize,
    finished: usize,
}

impl SystemDependencyTracer {
    /// Starts a pass with every node not started.
    pub fn new(graph: Arc<DependencyGraph>) -> Self {
        debug_assert!(graph.is_finalized(), "tracer built over an unfinalized graph");
        let unfinished_predecessors = graph.predecessors.iter().map(Vec::len).collect();
        Self {
            states: vec![SystemState::NotStarted; graph.node_count()],
            unfinished_predecessors,
            graph,
            running: 0,
            finished: 0,
        }
    }

    /// Every node that has not started and whose predecessors all finished,
    /// in ascending order.
    pub fn get_next_systems_to_run(&self) -> Vec<SystemIndex> {
        (0..self.states.len())
            .filter(|&node| self.states[node] == SystemState::NotStarted && self.unfinished_predecessors[node] == 0)
            .collect()
    }

    /// Marks a ready node as running.
    pub fn run_system(&mut self, node: SystemIndex) {
        debug_assert_eq!(self.states[node], SystemState::NotStarted, "system {node} started twice");
        debug_assert_eq!(self.unfinished_predecessors[node], 0, "system {node} started before its dependencies");
        self.states[node] = SystemState::Running;
        self.running += 1;
    }

    /// Marks a running node as finished, releasing its successors.
    pub fn finish_system(&mut self, node: SystemIndex) {
        debug_assert_eq!(self.states[node], SystemState::Running, "system {node} finished without running");
        self.states[node] = SystemState::Finished;
        self.running -= 1;
        self.finished += 1;
        for &next in self.graph.successors(node) {
            self.unfinished_predecessors[next] -= 1;
        }
    }

    /// Current state of `node`.
    pub fn state(&self, node: SystemIndex) -> SystemState {
        self.states[node]
    }

    /// Number of nodes currently running.
    pub fn running_count(&self) -> usize {
        self.running
    }

    /// Returns `true` once every node has finished.
    pub fn is_finished(&self) -> bool {
        self.finished == self.states.len()
    }
}
