mod arena;
mod compile;
mod config;
mod context;
mod executor;
mod fifo_queue;
mod resources;
mod tensor_array;
mod trace;

pub use config::ExecutorConfig;
pub use executor::{GraphExecutor, NamedTensorMap};
pub use fifo_queue::{FifoQueue, QueueElement};
pub use resources::ResourceManager;
pub use tensor_array::TensorArray;
pub use trace::TraceEvent;
