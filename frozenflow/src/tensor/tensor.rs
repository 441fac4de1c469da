//! Tensor container.
//!
//! `Tensor<T>` owns flat row-major storage together with its shape.
use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};

use super::shape::{compute_strides, numel};

/// Tensor construction options.
#[derive(Debug, Clone, Default)]
pub struct TensorOptions {
    /// Optional explicit shape; a flat vector shape is used when absent.
    pub shape: Option<Vec<usize>>,
}

/// Owned tensor with shape metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tensor<T> {
    pub data: Vec<T>,
    shape: Vec<usize>,
}

impl<T> Tensor<T> {
    /// Build a rank-1 tensor from a flat data vector.
    ///
    /// # Example
    /// ```no_run
    /// # use frozenflow::Tensor;
    /// # fn main() -> anyhow::Result<()> {
    /// let t = Tensor::from_vec(vec![1.0f32, 2.0, 3.0])?;
    /// assert_eq!(t.shape(), &[3]);
    /// # Ok(()) }
    /// ```
    pub fn from_vec(data: Vec<T>) -> Result<Self> {
        Self::from_vec_with_opts(data, TensorOptions::default())
    }

    /// Build a tensor with explicit options.
    ///
    /// # Example
    /// ```no_run
    /// # use frozenflow::{Tensor, TensorOptions};
    /// # fn main() -> anyhow::Result<()> {
    /// let t = Tensor::from_vec_with_opts(
    ///     vec![1i32, 2, 3, 4],
    ///     TensorOptions { shape: Some(vec![2, 2]) },
    /// )?;
    /// # Ok(()) }
    /// ```
    pub fn from_vec_with_opts(data: Vec<T>, opts: TensorOptions) -> Result<Self> {
        let shape = match opts.shape {
            Some(shape) => shape,
            None => vec![data.len()],
        };
        let expected = numel(&shape);
        if expected != data.len() {
            return Err(anyhow!(
                "tensor data length {} does not match shape {:?}",
                data.len(),
                shape
            ));
        }
        Ok(Self { data, shape })
    }

    pub fn with_shape(data: Vec<T>, shape: Vec<usize>) -> Result<Self> {
        Self::from_vec_with_opts(data, TensorOptions { shape: Some(shape) })
    }

    /// Rank-0 tensor holding one value.
    pub fn scalar(value: T) -> Self {
        Self {
            data: vec![value],
            shape: Vec::new(),
        }
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    pub fn strides(&self) -> Vec<usize> {
        compute_strides(&self.shape)
    }

    pub fn rank(&self) -> usize {
        self.shape.len()
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Reinterpret the storage with a new shape of equal element count.
    pub fn reshape(self, shape: Vec<usize>) -> Result<Self> {
        if numel(&shape) != self.data.len() {
            return Err(anyhow!(
                "cannot reshape tensor of shape {:?} into {:?}",
                self.shape,
                shape
            ));
        }
        Ok(Self {
            data: self.data,
            shape,
        })
    }

    pub fn with_leading_axis(self) -> Self {
        let mut shape = Vec::with_capacity(self.shape.len() + 1);
        shape.push(1);
        shape.extend(self.shape);
        Self {
            data: self.data,
            shape,
        }
    }

    pub fn into_data(self) -> Vec<T> {
        self.data
    }

    pub fn map<U>(&self, f: impl FnMut(&T) -> U) -> Tensor<U> {
        Tensor {
            data: self.data.iter().map(f).collect(),
            shape: self.shape.clone(),
        }
    }
}

impl<T: Clone> Tensor<T> {
    pub fn filled(value: T, shape: Vec<usize>) -> Self {
        Self {
            data: vec![value; numel(&shape)],
            shape,
        }
    }
}
