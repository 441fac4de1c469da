use thiserror::Error;

use crate::tensor::{DType, PartialShape};

/// Contract violations raised by [`FifoQueue`](crate::FifoQueue).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QueueError {
    #[error("queue {name} has been closed")]
    Closed { name: String },

    #[error("queue {name} has reached maximum capacity {capacity} (holding {size}, adding {requested})")]
    CapacityExceeded {
        name: String,
        capacity: usize,
        size: usize,
        requested: usize,
    },

    #[error("queue {name}: component {index} has shape {actual}, expected {expected}")]
    ShapeMismatch {
        name: String,
        index: usize,
        expected: PartialShape,
        actual: PartialShape,
    },

    #[error("queue {name}: component {index} has dtype {actual}, expected {expected}")]
    TypeMismatch {
        name: String,
        index: usize,
        expected: DType,
        actual: DType,
    },

    #[error("queue {name} is empty")]
    Empty { name: String },

    #[error("invalid dequeue count {count} for queue {name} holding {size} elements")]
    InvalidCount { name: String, count: i64, size: usize },

    #[error("queue {name} expects {expected} components per element, got {actual}")]
    ArityMismatch {
        name: String,
        expected: usize,
        actual: usize,
    },
}

/// Failures of an execution request that are not raised by an op itself.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExecutorError {
    #[error("node '{node}' uses unknown op '{op}'")]
    UnknownOp { op: String, node: String },

    #[error("requested output '{name}' was not produced")]
    MissingOutput { name: String },

    #[error("missing graph inputs: {}", names.join(", "))]
    MissingInputs { names: Vec<String> },

    #[error("input '{name}' does not name a graph node")]
    UnknownInput { name: String },

    #[error("graph has a cycle through node '{node}'")]
    CyclicGraph { node: String },
}
