//! Runtime registry of user-defined ops.
//!
//! Entries shadow built-in mappers of the same name until they are
//! deregistered. Mutations take effect for the next resolution; callers that
//! execute concurrently must serialise registration themselves.
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use anyhow::Result;
use once_cell::sync::Lazy;
use tracing::debug;

use super::{NodeValue, OpMapper};
use crate::tensor::TensorValue;

/// Shared pointer to a custom op registry.
pub type CustomOpRegistryHandle = Arc<CustomOpRegistry>;

static GLOBAL_REGISTRY: Lazy<CustomOpRegistryHandle> =
    Lazy::new(|| Arc::new(CustomOpRegistry::new()));

#[derive(Debug, Default)]
pub struct CustomOpRegistry {
    ops: RwLock<HashMap<String, Arc<OpMapper>>>,
}

impl CustomOpRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Process-wide registry used by executors built without an explicit one.
    pub fn global() -> CustomOpRegistryHandle {
        Arc::clone(&GLOBAL_REGISTRY)
    }

    /// Register `executor` under `name`, replacing any earlier registration.
    pub fn register_op<F>(&self, name: &str, executor: F)
    where
        F: Fn(&NodeValue<'_>) -> Result<Vec<TensorValue>> + Send + Sync + 'static,
    {
        self.register_mapper(OpMapper::custom(name, Arc::new(executor)));
    }

    /// Register a fully described mapper, keyed by its op name.
    pub fn register_mapper(&self, mapper: OpMapper) {
        let name = mapper.tf_op_name.clone();
        let replaced = self
            .ops
            .write()
            .expect("custom op registry lock poisoned")
            .insert(name.clone(), Arc::new(mapper))
            .is_some();
        debug!(op = %name, replaced, "registered custom op");
    }

    pub fn get_registered_op(&self, name: &str) -> Option<Arc<OpMapper>> {
        self.ops
            .read()
            .expect("custom op registry lock poisoned")
            .get(name)
            .cloned()
    }

    /// Remove `name`; absent names are ignored.
    pub fn deregister_op(&self, name: &str) {
        let removed = self
            .ops
            .write()
            .expect("custom op registry lock poisoned")
            .remove(name)
            .is_some();
        if removed {
            debug!(op = %name, "deregistered custom op");
        }
    }

    pub fn registered_names(&self) -> Vec<String> {
        let mut names = self
            .ops
            .read()
            .expect("custom op registry lock poisoned")
            .keys()
            .cloned()
            .collect::<Vec<_>>();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.ops
            .read()
            .expect("custom op registry lock poisoned")
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Register `executor` in the process-wide registry.
pub fn register_op<F>(name: &str, executor: F)
where
    F: Fn(&NodeValue<'_>) -> Result<Vec<TensorValue>> + Send + Sync + 'static,
{
    GLOBAL_REGISTRY.register_op(name, executor);
}

pub fn get_registered_op(name: &str) -> Option<Arc<OpMapper>> {
    GLOBAL_REGISTRY.get_registered_op(name)
}

pub fn deregister_op(name: &str) {
    GLOBAL_REGISTRY.deregister_op(name);
}
