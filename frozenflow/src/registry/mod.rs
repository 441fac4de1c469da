//! Op resolution: built-in mappers plus the custom op overlay.
use std::sync::Arc;

mod builtin;
mod custom;
mod mapper;
mod params;

pub use builtin::{builtin_op, builtin_op_names};
pub use custom::{
    deregister_op, get_registered_op, register_op, CustomOpRegistry, CustomOpRegistryHandle,
};
pub use mapper::{
    AttrParamMapper, Category, InputParamMapper, OpExecutorFn, OpMapper, ParamType,
};
pub use params::{NodeValue, ParamValue};

/// Authoritative mapper for `op`: a custom registration wins over a built-in.
pub fn resolve_op(custom: &CustomOpRegistry, op: &str) -> Option<Arc<OpMapper>> {
    custom.get_registered_op(op).or_else(|| builtin_op(op))
}
