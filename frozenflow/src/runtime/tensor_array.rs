//! Indexed tensor storage used by loop bodies (`TensorArray*` ops).
use anyhow::{anyhow, Result};

use crate::tensor::{
    concat_values, slice_leading, stack_values, unstack_value, DType, PartialShape, TensorValue,
};

#[derive(Debug, Clone, Default)]
struct Slot {
    tensor: Option<TensorValue>,
    written: bool,
    read: bool,
    cleared: bool,
}

#[derive(Debug, Clone)]
pub struct TensorArray {
    name: String,
    dtype: DType,
    element_shape: Option<PartialShape>,
    identical_element_shapes: bool,
    dynamic_size: bool,
    clear_after_read: bool,
    closed: bool,
    slots: Vec<Slot>,
}

impl TensorArray {
    pub fn new(name: impl Into<String>, dtype: DType, size: usize) -> Self {
        Self {
            name: name.into(),
            dtype,
            element_shape: None,
            identical_element_shapes: false,
            dynamic_size: false,
            clear_after_read: true,
            closed: false,
            slots: vec![Slot::default(); size],
        }
    }

    pub fn with_element_shape(mut self, shape: Option<PartialShape>) -> Self {
        self.element_shape = shape;
        self
    }

    pub fn with_identical_element_shapes(mut self, identical: bool) -> Self {
        self.identical_element_shapes = identical;
        self
    }

    pub fn with_dynamic_size(mut self, dynamic: bool) -> Self {
        self.dynamic_size = dynamic;
        self
    }

    pub fn with_clear_after_read(mut self, clear: bool) -> Self {
        self.clear_after_read = clear;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn dtype(&self) -> DType {
        self.dtype
    }

    pub fn size(&self) -> usize {
        self.slots.len()
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn clear_and_close(&mut self) {
        self.slots.clear();
        self.closed = true;
    }

    fn ensure_open(&self) -> Result<()> {
        if self.closed {
            return Err(anyhow!("tensor array {} has already been closed", self.name));
        }
        Ok(())
    }

    fn ensure_dtype(&self, dtype: DType, action: &str) -> Result<()> {
        if dtype != self.dtype {
            return Err(anyhow!(
                "tensor array {} holds {} but {} used {}",
                self.name,
                self.dtype,
                action,
                dtype
            ));
        }
        Ok(())
    }

    pub fn read(&mut self, index: usize) -> Result<TensorValue> {
        self.ensure_open()?;
        let size = self.size();
        let clear_after_read = self.clear_after_read;
        let name = self.name.clone();
        let slot = self
            .slots
            .get_mut(index)
            .ok_or_else(|| anyhow!("read of index {} on tensor array {} of size {}", index, name, size))?;
        if slot.cleared {
            return Err(anyhow!(
                "tensor array {}: index {} was cleared by a previous read (clear_after_read is set)",
                name,
                index
            ));
        }
        let tensor = slot
            .tensor
            .clone()
            .ok_or_else(|| anyhow!("tensor array {}: index {} was never written", name, index))?;
        if clear_after_read {
            slot.cleared = true;
            slot.tensor = None;
        }
        slot.read = true;
        Ok(tensor)
    }

    pub fn read_many(&mut self, indices: &[usize]) -> Result<Vec<TensorValue>> {
        indices.iter().map(|index| self.read(*index)).collect()
    }

    pub fn write(&mut self, index: usize, tensor: TensorValue) -> Result<()> {
        self.ensure_open()?;
        if index >= self.size() && !self.dynamic_size {
            return Err(anyhow!(
                "write to index {} on tensor array {} which is not resizeable and has size {}",
                index,
                self.name,
                self.size()
            ));
        }
        self.ensure_dtype(tensor.dtype(), "write")?;
        match &self.element_shape {
            Some(expected) if !expected.matches(tensor.shape()) => {
                return Err(anyhow!(
                    "tensor array {}: index {} written with shape {:?}, expected {}",
                    self.name,
                    index,
                    tensor.shape(),
                    expected
                ));
            }
            Some(_) => {}
            None if self.identical_element_shapes => {
                self.element_shape = Some(PartialShape::from(tensor.shape()))
            }
            None => {}
        }
        if index >= self.size() {
            self.slots.resize(index + 1, Slot::default());
        }
        let slot = &mut self.slots[index];
        if slot.read {
            return Err(anyhow!(
                "tensor array {}: index {} has already been read",
                self.name,
                index
            ));
        }
        if slot.written {
            return Err(anyhow!(
                "tensor array {}: index {} has already been written",
                self.name,
                index
            ));
        }
        slot.tensor = Some(tensor);
        slot.written = true;
        Ok(())
    }

    pub fn write_many(&mut self, indices: &[usize], tensors: Vec<TensorValue>) -> Result<()> {
        if indices.len() != tensors.len() {
            return Err(anyhow!(
                "tensor array {}: {} indices for {} tensors",
                self.name,
                indices.len(),
                tensors.len()
            ));
        }
        for (index, tensor) in indices.iter().zip(tensors) {
            self.write(*index, tensor)?;
        }
        Ok(())
    }

    fn empty_value(&self) -> TensorValue {
        let mut shape = vec![0];
        if let Some(element) = &self.element_shape {
            shape.extend(element.to_concrete(0));
        }
        TensorValue::zeros(self.dtype, shape)
    }

    /// Stack the elements at `indices` (all elements when `None`).
    pub fn gather(&mut self, indices: Option<&[usize]>, dtype: DType) -> Result<TensorValue> {
        self.ensure_dtype(dtype, "gather")?;
        let all = (0..self.size()).collect::<Vec<_>>();
        let indices = indices.unwrap_or(&all);
        if indices.is_empty() {
            return Ok(self.empty_value());
        }
        let tensors = self.read_many(indices)?;
        stack_values(&tensors, 0)
    }

    /// Concatenate every element along the leading axis.
    pub fn concat(&mut self, dtype: DType) -> Result<TensorValue> {
        self.ensure_dtype(dtype, "concat")?;
        if self.size() == 0 {
            return Ok(self.empty_value());
        }
        let indices = (0..self.size()).collect::<Vec<_>>();
        let tensors = self.read_many(&indices)?;
        concat_values(&tensors, 0)
    }

    /// Leading-axis lengths of every element, as produced alongside `concat`.
    pub fn lengths(&self) -> Vec<i32> {
        self.slots
            .iter()
            .map(|slot| {
                slot.tensor
                    .as_ref()
                    .and_then(|t| t.shape().first().copied())
                    .unwrap_or(0) as i32
            })
            .collect()
    }

    pub fn scatter(&mut self, indices: &[usize], tensor: &TensorValue) -> Result<()> {
        self.ensure_dtype(tensor.dtype(), "scatter")?;
        let leading = tensor.shape().first().copied().unwrap_or(0);
        if indices.len() != leading {
            return Err(anyhow!(
                "tensor array {}: scatter of {} indices with leading dim {}",
                self.name,
                indices.len(),
                leading
            ));
        }
        if !self.dynamic_size {
            if let Some(max) = indices.iter().max() {
                if *max >= self.size() {
                    return Err(anyhow!(
                        "tensor array {}: scatter index {} must be < array size {}",
                        self.name,
                        max,
                        self.size()
                    ));
                }
            }
        }
        let parts = unstack_value(tensor, 0)?;
        self.write_many(indices, parts)
    }

    /// Split `tensor` along its leading axis into pieces of `lengths` rows.
    pub fn split(&mut self, lengths: &[usize], tensor: &TensorValue) -> Result<()> {
        self.ensure_dtype(tensor.dtype(), "split")?;
        let leading = tensor.shape().first().copied().unwrap_or(0);
        let total: usize = lengths.iter().sum();
        if total != leading {
            return Err(anyhow!(
                "tensor array {}: split lengths sum to {} but leading dim is {}",
                self.name,
                total,
                leading
            ));
        }
        if !self.dynamic_size && lengths.len() != self.size() {
            return Err(anyhow!(
                "tensor array {}: split into {} pieces but array size is {}",
                self.name,
                lengths.len(),
                self.size()
            ));
        }
        let mut start = 0;
        let mut parts = Vec::with_capacity(lengths.len());
        for len in lengths {
            parts.push(slice_leading(tensor, start, *len)?);
            start += len;
        }
        let indices = (0..lengths.len()).collect::<Vec<_>>();
        self.write_many(&indices, parts)
    }
}
