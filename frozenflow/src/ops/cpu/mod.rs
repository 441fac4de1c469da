//! Host kernels backing the built-in executors.
pub(crate) mod broadcast;
pub(crate) mod elementwise;
pub(crate) mod matmul;
pub(crate) mod reduce;
