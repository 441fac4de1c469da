//! Executor for frozen dataflow graphs with loop and conditional control
//! flow, a bounded FIFO queue primitive, and a custom op registry layered
//! over the built-in op table.

mod macros;

mod error;
mod formatting;
mod graph;
pub mod logging;
mod ops;
mod random;
pub mod registry;
mod runtime;
mod tensor;

pub use error::{ExecutorError, QueueError};
pub use formatting::{format_truncated, FormatValue};
pub use graph::{parse_node_name, AttrValue, Graph, GraphDef, Node, CONTROL_FLOW_OPS};
pub use random::{Random, RandomValue};
pub use registry::{
    deregister_op, get_registered_op, register_op, Category, CustomOpRegistry, NodeValue,
    OpExecutorFn, OpMapper,
};
pub use runtime::{
    ExecutorConfig, FifoQueue, GraphExecutor, NamedTensorMap, QueueElement, ResourceManager,
    TensorArray, TraceEvent,
};
pub use tensor::{
    broadcast_shapes, concat_values, numel, stack_values, unstack_value, DType, PartialShape,
    Tensor, TensorElement, TensorOptions, TensorValue,
};
