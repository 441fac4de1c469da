use std::fmt;
use std::time::Duration;

use serde::Serialize;

/// Execution record for one node run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TraceEvent {
    pub node: String,
    pub op: String,
    pub category: String,
    /// Frame context the node ran in; empty at the root.
    pub context: String,
    /// Shape of every output slot, `None` for dead outputs.
    pub outputs: Vec<Option<Vec<usize>>>,
    pub micros: String,
    pub micros_parts: [u64; 3],
    /// Producers whose outputs were dropped once this node had read them.
    pub retired: Vec<String>,
    /// Node outputs still held by the request after this node finished.
    pub live_values: usize,
}

impl TraceEvent {
    pub(crate) fn set_timing(&mut self, duration: Duration) {
        let total_ns = duration.as_nanos();
        let ms = (total_ns / 1_000_000) as u64;
        let us = ((total_ns / 1_000) % 1_000) as u64;
        let ns = (total_ns % 1_000) as u64;
        self.micros = format!("{ms}ms {us}us {ns}ns");
        self.micros_parts = [ms, us, ns];
    }
}

impl fmt::Display for TraceEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let shapes = self
            .outputs
            .iter()
            .map(|shape| match shape {
                Some(shape) => format!("{:?}", shape),
                None => "dead".to_string(),
            })
            .collect::<Vec<_>>()
            .join(", ");
        write!(f, "{} = {}({}) [{}] -> {}", self.node, self.op, self.category, self.context, shapes)?;
        if !self.micros.is_empty() {
            write!(f, " ({})", self.micros)?;
        }
        Ok(())
    }
}
