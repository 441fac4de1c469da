use std::fmt;

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};

use super::{DType, Tensor};
use crate::formatting::format_truncated;
use crate::macros::{map_tensor, try_map_tensor, with_tensor};

/// Element type that can be converted to/from `TensorValue`.
pub trait TensorElement: Sized + Clone {
    const DTYPE: DType;
    /// Attempt to borrow a typed tensor from a generic value.
    fn from_value(value: &TensorValue) -> Option<&Tensor<Self>>;
    /// Wrap a typed tensor into a generic value.
    fn into_value(tensor: Tensor<Self>) -> TensorValue;
    fn from_f64(value: f64) -> Self;
    fn to_f64(&self) -> f64;
}

impl TensorElement for f32 {
    const DTYPE: DType = DType::Float32;

    fn from_value(value: &TensorValue) -> Option<&Tensor<Self>> {
        match value {
            TensorValue::F32(tensor) => Some(tensor),
            _ => None,
        }
    }

    fn into_value(tensor: Tensor<Self>) -> TensorValue {
        TensorValue::F32(tensor)
    }

    fn from_f64(value: f64) -> Self {
        value as f32
    }

    fn to_f64(&self) -> f64 {
        *self as f64
    }
}

impl TensorElement for i32 {
    const DTYPE: DType = DType::Int32;

    fn from_value(value: &TensorValue) -> Option<&Tensor<Self>> {
        match value {
            TensorValue::I32(tensor) => Some(tensor),
            _ => None,
        }
    }

    fn into_value(tensor: Tensor<Self>) -> TensorValue {
        TensorValue::I32(tensor)
    }

    fn from_f64(value: f64) -> Self {
        value as i32
    }

    fn to_f64(&self) -> f64 {
        *self as f64
    }
}

impl TensorElement for bool {
    const DTYPE: DType = DType::Bool;

    fn from_value(value: &TensorValue) -> Option<&Tensor<Self>> {
        match value {
            TensorValue::Bool(tensor) => Some(tensor),
            _ => None,
        }
    }

    fn into_value(tensor: Tensor<Self>) -> TensorValue {
        TensorValue::Bool(tensor)
    }

    fn from_f64(value: f64) -> Self {
        value != 0.0
    }

    fn to_f64(&self) -> f64 {
        if *self {
            1.0
        } else {
            0.0
        }
    }
}

/// Dynamically typed tensor flowing along graph edges.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TensorValue {
    F32(Tensor<f32>),
    I32(Tensor<i32>),
    Bool(Tensor<bool>),
}

impl TensorValue {
    pub fn dtype(&self) -> DType {
        match self {
            TensorValue::F32(_) => DType::Float32,
            TensorValue::I32(_) => DType::Int32,
            TensorValue::Bool(_) => DType::Bool,
        }
    }

    pub fn shape(&self) -> &[usize] {
        with_tensor!(self, t => t.shape())
    }

    pub fn rank(&self) -> usize {
        self.shape().len()
    }

    pub fn len(&self) -> usize {
        with_tensor!(self, t => t.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn from_i32(data: Vec<i32>, shape: Vec<usize>) -> Result<Self> {
        Ok(TensorValue::I32(Tensor::with_shape(data, shape)?))
    }

    pub fn from_f32(data: Vec<f32>, shape: Vec<usize>) -> Result<Self> {
        Ok(TensorValue::F32(Tensor::with_shape(data, shape)?))
    }

    pub fn from_bool(data: Vec<bool>, shape: Vec<usize>) -> Result<Self> {
        Ok(TensorValue::Bool(Tensor::with_shape(data, shape)?))
    }

    /// Build a tensor of `dtype` from `f64` data, casting element-wise.
    pub fn from_f64(dtype: DType, data: Vec<f64>, shape: Vec<usize>) -> Result<Self> {
        match dtype {
            DType::Float32 => Self::from_f32(data.into_iter().map(|v| v as f32).collect(), shape),
            DType::Int32 => Self::from_i32(data.into_iter().map(|v| v as i32).collect(), shape),
            DType::Bool => Self::from_bool(data.into_iter().map(|v| v != 0.0).collect(), shape),
        }
    }

    pub fn filled(dtype: DType, value: f64, shape: Vec<usize>) -> Self {
        match dtype {
            DType::Float32 => TensorValue::F32(Tensor::filled(value as f32, shape)),
            DType::Int32 => TensorValue::I32(Tensor::filled(value as i32, shape)),
            DType::Bool => TensorValue::Bool(Tensor::filled(value != 0.0, shape)),
        }
    }

    pub fn zeros(dtype: DType, shape: Vec<usize>) -> Self {
        Self::filled(dtype, 0.0, shape)
    }

    pub fn to_f64_vec(&self) -> Vec<f64> {
        with_tensor!(self, t => t.data.iter().map(TensorElement::to_f64).collect())
    }

    pub fn to_i64_vec(&self) -> Vec<i64> {
        self.to_f64_vec().into_iter().map(|v| v as i64).collect()
    }

    pub fn as_f32(&self) -> Option<&Tensor<f32>> {
        f32::from_value(self)
    }

    pub fn as_i32(&self) -> Option<&Tensor<i32>> {
        i32::from_value(self)
    }

    pub fn as_bool(&self) -> Option<&Tensor<bool>> {
        bool::from_value(self)
    }

    pub fn cast(&self, dtype: DType) -> Result<Self> {
        if dtype == self.dtype() {
            return Ok(self.clone());
        }
        Self::from_f64(dtype, self.to_f64_vec(), self.shape().to_vec())
    }

    pub fn reshape(&self, shape: Vec<usize>) -> Result<Self> {
        self.clone().into_reshaped(shape)
    }

    pub fn into_reshaped(self, shape: Vec<usize>) -> Result<Self> {
        Ok(try_map_tensor!(self, t => t.reshape(shape)))
    }

    /// Value with a new leading axis of size one.
    pub fn expand_leading(&self) -> Self {
        map_tensor!(self.clone(), t => t.with_leading_axis())
    }

    fn scalar_f64(&self) -> Result<f64> {
        if self.len() != 1 {
            return Err(anyhow!(
                "expected a single-element tensor, got shape {:?}",
                self.shape()
            ));
        }
        Ok(self.to_f64_vec()[0])
    }

    pub fn as_scalar_f64(&self) -> Result<f64> {
        self.scalar_f64()
    }

    pub fn as_scalar_i64(&self) -> Result<i64> {
        Ok(self.scalar_f64()? as i64)
    }

    pub fn as_scalar_bool(&self) -> Result<bool> {
        Ok(self.scalar_f64()? != 0.0)
    }
}

impl<T: TensorElement> From<Tensor<T>> for TensorValue {
    fn from(value: Tensor<T>) -> Self {
        T::into_value(value)
    }
}

impl From<f32> for TensorValue {
    fn from(value: f32) -> Self {
        TensorValue::F32(Tensor::scalar(value))
    }
}

impl From<i32> for TensorValue {
    fn from(value: i32) -> Self {
        TensorValue::I32(Tensor::scalar(value))
    }
}

impl From<bool> for TensorValue {
    fn from(value: bool) -> Self {
        TensorValue::Bool(Tensor::scalar(value))
    }
}

impl fmt::Display for TensorValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let data = with_tensor!(self, t => format_truncated(&t.data));
        write!(f, "{}{:?} {}", self.dtype(), self.shape(), data)
    }
}
