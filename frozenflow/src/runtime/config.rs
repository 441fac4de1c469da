use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Per-executor switches.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutorConfig {
    /// Collect a [`TraceEvent`](super::TraceEvent) for every executed node.
    pub trace: bool,
    /// Time each node; reported through trace events and `trace!` logs.
    pub timer: bool,
    /// Reject feeds that do not name a graph node.
    pub strict_inputs: bool,
}

impl ExecutorConfig {
    pub fn with_trace(mut self) -> Self {
        self.trace = true;
        self
    }

    pub fn with_timer(mut self) -> Self {
        self.timer = true;
        self
    }

    pub fn with_strict_inputs(mut self) -> Self {
        self.strict_inputs = true;
        self
    }

    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).context("failed to parse executor config")
    }
}
