use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::AttrValue;

/// Ops that take part in frame-based control flow.
pub const CONTROL_FLOW_OPS: &[&str] = &["Enter", "Exit", "Merge", "Switch", "NextIteration", "LoopCond"];

/// One operation of a frozen graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub name: String,
    pub op: String,
    /// Data inputs as `node` or `node:index`.
    #[serde(default)]
    pub inputs: Vec<String>,
    /// Nodes that must run first without feeding a value.
    #[serde(default)]
    pub control_inputs: Vec<String>,
    #[serde(default)]
    pub attrs: BTreeMap<String, AttrValue>,
}

impl Node {
    pub fn new(name: impl Into<String>, op: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            op: op.into(),
            inputs: Vec::new(),
            control_inputs: Vec::new(),
            attrs: BTreeMap::new(),
        }
    }

    /// Append data inputs; entries starting with `^` become control inputs.
    pub fn with_inputs<I, S>(mut self, inputs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for input in inputs {
            let input = input.into();
            match input.strip_prefix('^') {
                Some(control) => self.control_inputs.push(control.to_string()),
                None => self.inputs.push(input),
            }
        }
        self
    }

    pub fn with_control_input(mut self, name: impl Into<String>) -> Self {
        self.control_inputs.push(name.into());
        self
    }

    pub fn with_attr(mut self, name: impl Into<String>, value: impl Into<AttrValue>) -> Self {
        self.attrs.insert(name.into(), value.into());
        self
    }

    pub fn attr(&self, name: &str) -> Option<&AttrValue> {
        self.attrs.get(name)
    }

    pub fn is_control_flow(&self) -> bool {
        CONTROL_FLOW_OPS.contains(&self.op.as_str())
    }

    pub fn describe(&self) -> String {
        if self.inputs.is_empty() {
            format!("{} = {}()", self.name, self.op)
        } else {
            format!("{} = {}({})", self.name, self.op, self.inputs.join(", "))
        }
    }
}

/// Split `node:index` into its parts; a bare name refers to output 0.
pub fn parse_node_name(name: &str) -> (&str, usize) {
    let name = name.strip_prefix('^').unwrap_or(name);
    match name.rsplit_once(':') {
        Some((node, index)) => match index.parse::<usize>() {
            Ok(index) => (node, index),
            Err(_) => (name, 0),
        },
        None => (name, 0),
    }
}
