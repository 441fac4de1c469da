//! Queues and tensor arrays created while one request runs.
use std::collections::HashMap;

use anyhow::{anyhow, Result};

use super::{FifoQueue, TensorArray};
use crate::tensor::TensorValue;

#[derive(Debug, Default)]
pub struct ResourceManager {
    queues: HashMap<i32, FifoQueue>,
    tensor_arrays: HashMap<i32, TensorArray>,
    shared_queues: HashMap<String, i32>,
    next_handle: i32,
}

impl ResourceManager {
    pub fn new() -> Self {
        Self::default()
    }

    fn allocate(&mut self) -> i32 {
        self.next_handle += 1;
        self.next_handle
    }

    fn handle_id(handle: &TensorValue) -> Result<i32> {
        Ok(handle.as_scalar_i64()? as i32)
    }

    /// Store `queue` and return its handle tensor. A queue created under an
    /// existing shared name resolves to the earlier instance.
    pub fn add_queue(&mut self, queue: FifoQueue, shared_name: Option<&str>) -> TensorValue {
        if let Some(id) = shared_name.and_then(|name| self.shared_queues.get(name)) {
            return TensorValue::from(*id);
        }
        let id = self.allocate();
        if let Some(name) = shared_name {
            self.shared_queues.insert(name.to_string(), id);
        }
        self.queues.insert(id, queue);
        TensorValue::from(id)
    }

    pub fn queue(&self, handle: &TensorValue) -> Result<&FifoQueue> {
        let id = Self::handle_id(handle)?;
        self.queues
            .get(&id)
            .ok_or_else(|| anyhow!("no queue for handle {}", id))
    }

    pub fn queue_mut(&mut self, handle: &TensorValue) -> Result<&mut FifoQueue> {
        let id = Self::handle_id(handle)?;
        self.queues
            .get_mut(&id)
            .ok_or_else(|| anyhow!("no queue for handle {}", id))
    }

    pub fn add_tensor_array(&mut self, array: TensorArray) -> TensorValue {
        let id = self.allocate();
        self.tensor_arrays.insert(id, array);
        TensorValue::from(id)
    }

    pub fn tensor_array_mut(&mut self, handle: &TensorValue) -> Result<&mut TensorArray> {
        let id = Self::handle_id(handle)?;
        self.tensor_arrays
            .get_mut(&id)
            .ok_or_else(|| anyhow!("no tensor array for handle {}", id))
    }

    pub fn queue_count(&self) -> usize {
        self.queues.len()
    }

    pub fn tensor_array_count(&self) -> usize {
        self.tensor_arrays.len()
    }
}
