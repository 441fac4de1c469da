//! Request-scoped storage of node outputs, keyed by node and context id.
use std::collections::{HashMap, HashSet};

use crate::tensor::TensorValue;

#[derive(Debug, Default)]
pub(crate) struct TensorArena {
    values: HashMap<String, HashMap<String, Vec<Option<TensorValue>>>>,
    /// Outstanding consumer edges per stored (node, context).
    pending: HashMap<(String, String), usize>,
    kept: HashSet<String>,
}

impl TensorArena {
    pub fn new(kept: HashSet<String>) -> Self {
        Self {
            kept,
            ..Self::default()
        }
    }

    /// Store outputs. `consumers` is the number of reads to wait for before
    /// the value may be dropped; zero keeps it until the request ends.
    pub fn insert(&mut self, node: &str, context: &str, outputs: Vec<Option<TensorValue>>, consumers: usize) {
        if consumers > 0 && !self.kept.contains(node) {
            self.pending
                .insert((node.to_string(), context.to_string()), consumers);
        }
        self.values
            .entry(node.to_string())
            .or_default()
            .insert(context.to_string(), outputs);
    }

    /// Innermost context among `context_ids` holding outputs of `node`.
    pub fn visible_context<'a>(&self, node: &str, context_ids: &'a [String]) -> Option<&'a str> {
        let by_context = self.values.get(node)?;
        context_ids
            .iter()
            .find(|id| by_context.contains_key(id.as_str()))
            .map(String::as_str)
    }

    pub fn lookup(&self, node: &str, index: usize, context_ids: &[String]) -> Option<&TensorValue> {
        let by_context = self.values.get(node)?;
        context_ids
            .iter()
            .find_map(|id| by_context.get(id))
            .and_then(|outputs| outputs.get(index))
            .and_then(Option::as_ref)
    }

    /// Record one read of `node` in `context`, dropping its outputs once all
    /// consumers have read them.
    pub fn release(&mut self, node: &str, context: &str) -> bool {
        let key = (node.to_string(), context.to_string());
        let Some(remaining) = self.pending.get_mut(&key) else {
            return false;
        };
        *remaining = remaining.saturating_sub(1);
        if *remaining > 0 {
            return false;
        }
        self.pending.remove(&key);
        if let Some(by_context) = self.values.get_mut(node) {
            by_context.remove(context);
            if by_context.is_empty() {
                self.values.remove(node);
            }
        }
        true
    }

    pub fn live_values(&self) -> usize {
        self.values.values().map(HashMap::len).sum()
    }
}
