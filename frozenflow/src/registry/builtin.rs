//! Static table of built-in op mappers, built once per process.
use std::collections::HashMap;
use std::sync::Arc;

use once_cell::sync::Lazy;

use super::OpMapper;

static BUILTIN_OPS: Lazy<HashMap<String, Arc<OpMapper>>> = Lazy::new(|| {
    crate::ops::mappers()
        .into_iter()
        .map(|mapper| (mapper.tf_op_name.clone(), Arc::new(mapper)))
        .collect()
});

pub fn builtin_op(name: &str) -> Option<Arc<OpMapper>> {
    BUILTIN_OPS.get(name).cloned()
}

pub fn builtin_op_names() -> Vec<&'static str> {
    let mut names = BUILTIN_OPS
        .keys()
        .map(String::as_str)
        .collect::<Vec<_>>();
    names.sort_unstable();
    names
}
