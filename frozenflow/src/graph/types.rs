//! Attribute values carried by graph nodes.
use serde::{Deserialize, Serialize};

use crate::tensor::{DType, PartialShape, TensorValue};

/// Attribute value used by ops in the graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttrValue {
    Int(i64),
    Float(f64),
    Bool(bool),
    Str(String),
    #[serde(rename = "dtype")]
    DType(DType),
    /// Dims with `-1` for unknown sizes.
    Shape(Vec<i64>),
    IntList(Vec<i64>),
    FloatList(Vec<f64>),
    #[serde(rename = "dtype_list")]
    DTypeList(Vec<DType>),
    ShapeList(Vec<Vec<i64>>),
    Tensor(TensorValue),
}

impl AttrValue {
    pub fn kind(&self) -> &'static str {
        match self {
            AttrValue::Int(_) => "int",
            AttrValue::Float(_) => "float",
            AttrValue::Bool(_) => "bool",
            AttrValue::Str(_) => "str",
            AttrValue::DType(_) => "dtype",
            AttrValue::Shape(_) => "shape",
            AttrValue::IntList(_) => "int_list",
            AttrValue::FloatList(_) => "float_list",
            AttrValue::DTypeList(_) => "dtype_list",
            AttrValue::ShapeList(_) => "shape_list",
            AttrValue::Tensor(_) => "tensor",
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            AttrValue::Int(v) => Some(*v as f64),
            AttrValue::Float(v) => Some(*v),
            AttrValue::Bool(v) => Some(if *v { 1.0 } else { 0.0 }),
            _ => None,
        }
    }

    pub fn as_f64_list(&self) -> Option<Vec<f64>> {
        match self {
            AttrValue::IntList(v) | AttrValue::Shape(v) => {
                Some(v.iter().map(|x| *x as f64).collect())
            }
            AttrValue::FloatList(v) => Some(v.clone()),
            _ => self.as_f64().map(|v| vec![v]),
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            AttrValue::Bool(v) => Some(*v),
            AttrValue::Int(v) => Some(*v != 0),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            AttrValue::Str(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_dtype(&self) -> Option<DType> {
        match self {
            AttrValue::DType(v) => Some(*v),
            AttrValue::Str(v) => DType::from_ident(v).ok(),
            _ => None,
        }
    }

    pub fn as_dtypes(&self) -> Option<Vec<DType>> {
        match self {
            AttrValue::DTypeList(v) => Some(v.clone()),
            _ => self.as_dtype().map(|dtype| vec![dtype]),
        }
    }

    pub fn as_shape(&self) -> Option<PartialShape> {
        match self {
            AttrValue::Shape(v) | AttrValue::IntList(v) => Some(PartialShape::from_dims(v)),
            _ => None,
        }
    }

    pub fn as_shapes(&self) -> Option<Vec<PartialShape>> {
        match self {
            AttrValue::ShapeList(v) => Some(v.iter().map(|dims| PartialShape::from_dims(dims)).collect()),
            _ => self.as_shape().map(|shape| vec![shape]),
        }
    }

    pub fn as_tensor(&self) -> Option<&TensorValue> {
        match self {
            AttrValue::Tensor(v) => Some(v),
            _ => None,
        }
    }
}

impl From<i64> for AttrValue {
    fn from(value: i64) -> Self {
        AttrValue::Int(value)
    }
}

impl From<i32> for AttrValue {
    fn from(value: i32) -> Self {
        AttrValue::Int(value as i64)
    }
}

impl From<f64> for AttrValue {
    fn from(value: f64) -> Self {
        AttrValue::Float(value)
    }
}

impl From<bool> for AttrValue {
    fn from(value: bool) -> Self {
        AttrValue::Bool(value)
    }
}

impl From<&str> for AttrValue {
    fn from(value: &str) -> Self {
        AttrValue::Str(value.to_string())
    }
}

impl From<DType> for AttrValue {
    fn from(value: DType) -> Self {
        AttrValue::DType(value)
    }
}

impl From<TensorValue> for AttrValue {
    fn from(value: TensorValue) -> Self {
        AttrValue::Tensor(value)
    }
}
