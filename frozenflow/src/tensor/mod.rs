//! Host tensors used by the executor, the queue and the built-in kernels.

mod dtype;
mod layout;
mod partial_shape;
mod shape;
mod tensor;
mod value;

pub use dtype::DType;
pub use layout::{concat_values, gather_leading, slice_leading, stack_values, unstack_value};
pub use partial_shape::PartialShape;
pub use shape::{broadcast_shapes, compute_strides, linear_to_indices, numel};
pub use tensor::{Tensor, TensorOptions};
pub use value::{TensorElement, TensorValue};
