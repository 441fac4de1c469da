//! Per-request execution plan: which nodes run, in what order, and how many
//! consumers each output waits for before it is retired.
use std::collections::{HashSet, VecDeque};

use anyhow::Result;

use crate::error::ExecutorError;
use crate::graph::{parse_node_name, Graph};

#[derive(Debug, Clone)]
pub(crate) struct ExecutionPlan {
    /// Nodes reachable backwards from the outputs, including available ones.
    pub used: Vec<bool>,
    /// Used nodes that must actually run (not fed, not weights).
    pub executed: Vec<bool>,
    /// Topological order of executed nodes; empty for control-flow graphs.
    pub order: Vec<usize>,
    /// Starting points for dynamic scheduling.
    pub seeds: Vec<usize>,
    /// Consumers to wait for before retiring each node's outputs; zero keeps
    /// the outputs until the request ends.
    pub consumers: Vec<usize>,
}

impl ExecutionPlan {
    pub fn executed_count(&self) -> usize {
        self.executed.iter().filter(|run| **run).count()
    }
}

fn producers(graph: &Graph, idx: usize) -> Vec<usize> {
    let node = graph.node_at(idx);
    let mut out = Vec::new();
    for input in node.inputs.iter().chain(node.control_inputs.iter()) {
        if let Some(producer) = graph.node_index(parse_node_name(input).0) {
            if !out.contains(&producer) {
                out.push(producer);
            }
        }
    }
    out
}

/// Build the plan for `outputs` given the node names whose values are
/// supplied up front (feeds and weights).
pub(crate) fn compile(graph: &Graph, available: &HashSet<String>, outputs: &[usize]) -> Result<ExecutionPlan> {
    let len = graph.len();
    let mut used = vec![false; len];
    let mut stack: Vec<usize> = outputs.to_vec();
    while let Some(idx) = stack.pop() {
        if used[idx] {
            continue;
        }
        used[idx] = true;
        if available.contains(&graph.node_at(idx).name) {
            continue;
        }
        stack.extend(producers(graph, idx).into_iter().filter(|p| !used[*p]));
    }

    let missing: Vec<String> = (0..len)
        .filter(|idx| used[*idx])
        .map(|idx| graph.node_at(idx))
        .filter(|node| node.op == "Placeholder" && !available.contains(&node.name))
        .map(|node| node.name.clone())
        .collect();
    if !missing.is_empty() {
        return Err(ExecutorError::MissingInputs { names: missing }.into());
    }

    let executed: Vec<bool> = (0..len)
        .map(|idx| used[idx] && !available.contains(&graph.node_at(idx).name))
        .collect();

    let order = if graph.has_control_flow() {
        Vec::new()
    } else {
        topological_order(graph, &executed)?
    };

    let seeds = (0..len)
        .filter(|idx| used[*idx])
        .filter(|idx| {
            let node = graph.node_at(*idx);
            !executed[*idx] || (node.inputs.is_empty() && node.control_inputs.is_empty())
        })
        .collect();

    let consumers = (0..len)
        .map(|idx| {
            if !used[idx] || graph.node_at(idx).is_control_flow() {
                return 0;
            }
            let children: Vec<usize> = graph
                .children(idx)
                .iter()
                .copied()
                .filter(|child| executed[*child])
                .collect();
            if children.iter().any(|child| graph.node_at(*child).is_control_flow()) {
                0
            } else {
                children.len()
            }
        })
        .collect();

    Ok(ExecutionPlan {
        used,
        executed,
        order,
        seeds,
        consumers,
    })
}

fn topological_order(graph: &Graph, executed: &[bool]) -> Result<Vec<usize>> {
    let mut pending: Vec<usize> = (0..graph.len())
        .map(|idx| {
            if !executed[idx] {
                return 0;
            }
            producers(graph, idx).into_iter().filter(|p| executed[*p]).count()
        })
        .collect();
    let mut ready: VecDeque<usize> = (0..graph.len())
        .filter(|idx| executed[*idx] && pending[*idx] == 0)
        .collect();
    let mut order = Vec::new();
    while let Some(idx) = ready.pop_front() {
        order.push(idx);
        for &child in graph.children(idx) {
            if !executed[child] {
                continue;
            }
            pending[child] -= 1;
            if pending[child] == 0 {
                ready.push_back(child);
            }
        }
    }
    let total = executed.iter().filter(|run| **run).count();
    if order.len() != total {
        let stuck = (0..graph.len())
            .find(|idx| executed[*idx] && pending[*idx] > 0)
            .map(|idx| graph.node_at(idx).name.clone())
            .unwrap_or_default();
        return Err(ExecutorError::CyclicGraph { node: stuck }.into());
    }
    Ok(order)
}
