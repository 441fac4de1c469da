//! Frozen graph model consumed by the executor.
//!
//! A `Graph` is an immutable, validated list of nodes plus the derived
//! adjacency the executor schedules from.
use std::collections::HashMap;

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};

mod node;
mod types;

pub use node::{parse_node_name, Node, CONTROL_FLOW_OPS};
pub use types::AttrValue;

/// Serializable graph definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphDef {
    pub nodes: Vec<Node>,
    #[serde(default)]
    pub outputs: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct Graph {
    nodes: Vec<Node>,
    index: HashMap<String, usize>,
    children: Vec<Vec<usize>>,
    outputs: Vec<String>,
    with_control_flow: bool,
}

impl Graph {
    /// Validate `nodes` and derive adjacency. When `outputs` is empty the
    /// nodes without consumers become the default outputs.
    pub fn new(nodes: Vec<Node>, outputs: Vec<String>) -> Result<Self> {
        let mut nodes = nodes;
        let mut index = HashMap::with_capacity(nodes.len());
        for (idx, node) in nodes.iter_mut().enumerate() {
            let (data, control): (Vec<String>, Vec<String>) =
                node.inputs.drain(..).partition(|input| !input.starts_with('^'));
            node.inputs = data;
            node.control_inputs
                .extend(control.into_iter().map(|c| c.trim_start_matches('^').to_string()));
            if index.insert(node.name.clone(), idx).is_some() {
                return Err(anyhow!("duplicate node name {}", node.name));
            }
        }

        let mut children = vec![Vec::new(); nodes.len()];
        for (idx, node) in nodes.iter().enumerate() {
            let producers = node
                .inputs
                .iter()
                .chain(node.control_inputs.iter())
                .map(|input| parse_node_name(input).0);
            for producer in producers {
                let producer_idx = *index.get(producer).ok_or_else(|| {
                    anyhow!("node {} references unknown input {}", node.name, producer)
                })?;
                let list: &mut Vec<usize> = &mut children[producer_idx];
                if !list.contains(&idx) {
                    list.push(idx);
                }
            }
        }

        let outputs = if outputs.is_empty() {
            nodes
                .iter()
                .enumerate()
                .filter(|(idx, _)| children[*idx].is_empty())
                .map(|(_, node)| node.name.clone())
                .collect()
        } else {
            for output in &outputs {
                let (name, _) = parse_node_name(output);
                if !index.contains_key(name) {
                    return Err(anyhow!("graph output {} is not a node", output));
                }
            }
            outputs
        };
        let with_control_flow = nodes.iter().any(Node::is_control_flow);

        Ok(Self {
            nodes,
            index,
            children,
            outputs,
            with_control_flow,
        })
    }

    pub fn from_def(def: GraphDef) -> Result<Self> {
        Self::new(def.nodes, def.outputs)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let def: GraphDef = serde_json::from_str(json).context("failed to parse graph json")?;
        Self::from_def(def)
    }

    pub fn to_def(&self) -> GraphDef {
        GraphDef {
            nodes: self.nodes.clone(),
            outputs: self.outputs.clone(),
        }
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node(&self, name: &str) -> Option<&Node> {
        self.index.get(name).map(|idx| &self.nodes[*idx])
    }

    pub fn node_index(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    pub fn node_at(&self, idx: usize) -> &Node {
        &self.nodes[idx]
    }

    /// Consumers of node `idx` (data and control), in graph order of first use.
    pub fn children(&self, idx: usize) -> &[usize] {
        &self.children[idx]
    }

    pub fn outputs(&self) -> &[String] {
        &self.outputs
    }

    pub fn placeholders(&self) -> impl Iterator<Item = &Node> {
        self.nodes
            .iter()
            .filter(|node| node.op == "Placeholder" || node.op == "PlaceholderWithDefault")
    }

    /// `Const` nodes whose value is embedded as a `value` attribute.
    pub fn weights(&self) -> impl Iterator<Item = (&str, &crate::tensor::TensorValue)> {
        self.nodes.iter().filter(|node| node.op == "Const").filter_map(|node| {
            node.attr("value")
                .and_then(AttrValue::as_tensor)
                .map(|value| (node.name.as_str(), value))
        })
    }

    pub fn has_control_flow(&self) -> bool {
        self.with_control_flow
    }
}
