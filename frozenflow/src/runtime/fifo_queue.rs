//! Bounded FIFO queue of tensor tuples.
//!
//! Each element is a tuple of components whose dtypes are fixed when the
//! queue is built. Component shapes are either declared up front or taken
//! from the first enqueued element, and every later element must match them
//! position-wise, with `-1` dims acting as wildcards.
use std::collections::VecDeque;

use tracing::debug;
use uuid::Uuid;

use crate::error::QueueError;
use crate::tensor::{concat_values, DType, PartialShape, TensorValue};

/// One queue element: an ordered tuple of component tensors.
pub type QueueElement = Vec<TensorValue>;

#[derive(Debug, Clone)]
pub struct FifoQueue {
    id: Uuid,
    name: Option<String>,
    container: Option<String>,
    dtypes: Vec<DType>,
    shapes: Option<Vec<PartialShape>>,
    capacity: Option<usize>,
    closed: bool,
    elements: VecDeque<QueueElement>,
}

impl FifoQueue {
    /// Unbounded queue with inferred shapes.
    pub fn new(dtypes: Vec<DType>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: None,
            container: None,
            dtypes,
            shapes: None,
            capacity: None,
            closed: false,
            elements: VecDeque::new(),
        }
    }

    /// Declare component shapes. An empty list leaves them to be inferred.
    pub fn with_shapes(mut self, shapes: Vec<PartialShape>) -> Self {
        self.shapes = if shapes.is_empty() { None } else { Some(shapes) };
        self
    }

    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = Some(capacity);
        self
    }

    /// Capacity in graph-attribute form, where a negative value means unbounded.
    pub fn with_signed_capacity(mut self, capacity: i64) -> Self {
        self.capacity = usize::try_from(capacity).ok();
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_container(mut self, container: impl Into<String>) -> Self {
        self.container = Some(container.into());
        self
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Name used in diagnostics; falls back to the instance id.
    pub fn label(&self) -> String {
        match &self.name {
            Some(name) => name.clone(),
            None => self.id.to_string(),
        }
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn container(&self) -> Option<&str> {
        self.container.as_deref()
    }

    pub fn dtypes(&self) -> &[DType] {
        &self.dtypes
    }

    /// Declared or inferred component shapes, if known yet.
    pub fn shapes(&self) -> Option<&[PartialShape]> {
        self.shapes.as_deref()
    }

    pub fn capacity(&self) -> Option<usize> {
        self.capacity
    }

    pub fn size(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Mark the queue closed. Buffered elements stay dequeueable.
    pub fn close(&mut self) {
        if !self.closed {
            debug!(queue = %self.label(), size = self.size(), "queue closed");
        }
        self.closed = true;
    }

    pub fn enqueue(&mut self, element: QueueElement) -> Result<(), QueueError> {
        self.ensure_open()?;
        self.ensure_room(1)?;
        let shapes = self.check_element(&element, self.shapes.as_deref())?;
        if self.shapes.is_none() {
            self.shapes = Some(shapes);
        }
        self.elements.push_back(element);
        Ok(())
    }

    /// Enqueue a batch atomically: every element is validated before any
    /// is appended.
    pub fn enqueue_many(&mut self, elements: Vec<QueueElement>) -> Result<(), QueueError> {
        self.ensure_open()?;
        self.ensure_room(elements.len())?;
        let mut established = self.shapes.clone();
        for element in &elements {
            let shapes = self.check_element(element, established.as_deref())?;
            if established.is_none() {
                established = Some(shapes);
            }
        }
        if self.shapes.is_none() {
            self.shapes = established;
        }
        self.elements.extend(elements);
        Ok(())
    }

    pub fn dequeue(&mut self) -> Result<QueueElement, QueueError> {
        self.elements.pop_front().ok_or_else(|| QueueError::Empty {
            name: self.label(),
        })
    }

    /// Dequeue exactly `count` elements and batch them component-wise.
    pub fn dequeue_many(&mut self, count: i64) -> Result<QueueElement, QueueError> {
        let n = usize::try_from(count)
            .ok()
            .filter(|n| *n <= self.size())
            .ok_or_else(|| self.invalid_count(count))?;
        self.take_batch(n)
    }

    /// Dequeue up to `count` elements; fails only on a non-positive count or
    /// an empty queue.
    pub fn dequeue_up_to(&mut self, count: i64) -> Result<QueueElement, QueueError> {
        if count <= 0 {
            return Err(self.invalid_count(count));
        }
        if self.is_empty() {
            return Err(QueueError::Empty { name: self.label() });
        }
        let n = usize::try_from(count).map_or(self.size(), |n| n.min(self.size()));
        self.take_batch(n)
    }

    fn ensure_open(&self) -> Result<(), QueueError> {
        if self.closed {
            return Err(QueueError::Closed { name: self.label() });
        }
        Ok(())
    }

    fn ensure_room(&self, requested: usize) -> Result<(), QueueError> {
        if let Some(capacity) = self.capacity {
            if self.size() + requested > capacity {
                return Err(QueueError::CapacityExceeded {
                    name: self.label(),
                    capacity,
                    size: self.size(),
                    requested,
                });
            }
        }
        Ok(())
    }

    pub(crate) fn invalid_count(&self, count: i64) -> QueueError {
        QueueError::InvalidCount {
            name: self.label(),
            count,
            size: self.size(),
        }
    }

    /// Validate one element against `shapes` (or just arity and dtypes when
    /// no shapes are known) and return the shapes it establishes.
    fn check_element(
        &self,
        element: &[TensorValue],
        shapes: Option<&[PartialShape]>,
    ) -> Result<Vec<PartialShape>, QueueError> {
        if element.len() != self.dtypes.len() {
            return Err(QueueError::ArityMismatch {
                name: self.label(),
                expected: self.dtypes.len(),
                actual: element.len(),
            });
        }
        for (index, component) in element.iter().enumerate() {
            if let Some(expected) = shapes.and_then(|shapes| shapes.get(index)) {
                if !expected.matches(component.shape()) {
                    return Err(QueueError::ShapeMismatch {
                        name: self.label(),
                        index,
                        expected: expected.clone(),
                        actual: PartialShape::from(component.shape()),
                    });
                }
            }
            if component.dtype() != self.dtypes[index] {
                return Err(QueueError::TypeMismatch {
                    name: self.label(),
                    index,
                    expected: self.dtypes[index],
                    actual: component.dtype(),
                });
            }
        }
        Ok(match shapes {
            Some(shapes) => shapes.to_vec(),
            None => element
                .iter()
                .map(|component| PartialShape::from(component.shape()))
                .collect(),
        })
    }

    /// Whether component `index` already carries a leading axis of size one
    /// that batches concatenate along.
    fn has_batch_axis(&self, index: usize) -> bool {
        self.shapes
            .as_ref()
            .and_then(|shapes| shapes.get(index))
            .and_then(|shape| shape.dims().first().copied().flatten())
            == Some(1)
    }

    fn batch_component(&self, index: usize, value: &TensorValue) -> TensorValue {
        if self.has_batch_axis(index) {
            value.clone()
        } else {
            value.expand_leading()
        }
    }

    fn take_batch(&mut self, n: usize) -> Result<QueueElement, QueueError> {
        if n == 0 {
            return Ok(self.empty_batch());
        }
        // Pre-check the whole batch so a failed concat leaves the queue intact.
        let mut batched = Vec::with_capacity(self.dtypes.len());
        for index in 0..self.dtypes.len() {
            let parts = self
                .elements
                .iter()
                .take(n)
                .map(|element| self.batch_component(index, &element[index]))
                .collect::<Vec<_>>();
            let reference = parts[0].shape()[1..].to_vec();
            if let Some(bad) = parts.iter().find(|part| part.shape()[1..] != reference[..]) {
                return Err(QueueError::ShapeMismatch {
                    name: self.label(),
                    index,
                    expected: PartialShape::from(reference),
                    actual: PartialShape::from(&bad.shape()[1..]),
                });
            }
            let joined = concat_values(&parts, 0).map_err(|_| QueueError::TypeMismatch {
                name: self.label(),
                index,
                expected: self.dtypes[index],
                actual: parts[0].dtype(),
            })?;
            batched.push(joined);
        }
        self.elements.drain(..n);
        Ok(batched)
    }

    fn empty_batch(&self) -> QueueElement {
        self.dtypes
            .iter()
            .enumerate()
            .map(|(index, dtype)| {
                let dims = self
                    .shapes
                    .as_ref()
                    .and_then(|shapes| shapes.get(index))
                    .map(|shape| shape.to_concrete(0))
                    .unwrap_or_default();
                let mut shape = vec![0];
                if self.has_batch_axis(index) {
                    shape.extend_from_slice(&dims[1..]);
                } else {
                    shape.extend(dims);
                }
                TensorValue::zeros(*dtype, shape)
            })
            .collect()
    }
}
