//! Parameter access for executors.
//!
//! `NodeValue` binds a node's resolved input tensors to its mapper so that
//! executors can ask for params by name instead of by position.
use anyhow::{anyhow, Result};

use super::{AttrParamMapper, InputParamMapper, OpMapper, ParamType};
use crate::graph::{AttrValue, Node};
use crate::tensor::{DType, PartialShape, TensorValue};

#[derive(Debug, Clone, PartialEq)]
pub enum ParamValue {
    Tensor(TensorValue),
    Tensors(Vec<TensorValue>),
    Number(f64),
    Numbers(Vec<f64>),
    Bool(bool),
    Str(String),
    DType(DType),
    DTypes(Vec<DType>),
    Shape(PartialShape),
    Shapes(Vec<PartialShape>),
}

impl ParamValue {
    fn from_attr(value: &AttrValue, param_type: Option<ParamType>) -> Option<Self> {
        let param_type = match param_type {
            Some(param_type) => param_type,
            None => return Some(Self::from_raw_attr(value)),
        };
        match param_type {
            ParamType::Number => value.as_f64().map(ParamValue::Number),
            ParamType::Numbers => value.as_f64_list().map(ParamValue::Numbers),
            ParamType::Bool => value.as_bool().map(ParamValue::Bool),
            ParamType::Str => value.as_str().map(|s| ParamValue::Str(s.to_string())),
            ParamType::DType => value.as_dtype().map(ParamValue::DType),
            ParamType::DTypes => value.as_dtypes().map(ParamValue::DTypes),
            ParamType::Shape => value.as_shape().map(ParamValue::Shape),
            ParamType::Shapes => value.as_shapes().map(ParamValue::Shapes),
            ParamType::Tensor => value.as_tensor().cloned().map(ParamValue::Tensor),
            ParamType::Tensors => value
                .as_tensor()
                .cloned()
                .map(|tensor| ParamValue::Tensors(vec![tensor])),
        }
    }

    fn from_raw_attr(value: &AttrValue) -> Self {
        match value {
            AttrValue::Int(v) => ParamValue::Number(*v as f64),
            AttrValue::Float(v) => ParamValue::Number(*v),
            AttrValue::Bool(v) => ParamValue::Bool(*v),
            AttrValue::Str(v) => ParamValue::Str(v.clone()),
            AttrValue::DType(v) => ParamValue::DType(*v),
            AttrValue::Shape(v) => ParamValue::Shape(PartialShape::from_dims(v)),
            AttrValue::IntList(v) => ParamValue::Numbers(v.iter().map(|x| *x as f64).collect()),
            AttrValue::FloatList(v) => ParamValue::Numbers(v.clone()),
            AttrValue::DTypeList(v) => ParamValue::DTypes(v.clone()),
            AttrValue::ShapeList(v) => {
                ParamValue::Shapes(v.iter().map(|dims| PartialShape::from_dims(dims)).collect())
            }
            AttrValue::Tensor(v) => ParamValue::Tensor(v.clone()),
        }
    }
}

/// A node ready to execute: its definition, mapper and input values.
pub struct NodeValue<'a> {
    node: &'a Node,
    mapper: &'a OpMapper,
    inputs: Vec<Option<TensorValue>>,
}

impl<'a> NodeValue<'a> {
    pub fn new(node: &'a Node, mapper: &'a OpMapper, inputs: Vec<Option<TensorValue>>) -> Self {
        Self {
            node,
            mapper,
            inputs,
        }
    }

    pub fn name(&self) -> &str {
        &self.node.name
    }

    pub fn op(&self) -> &str {
        &self.node.op
    }

    pub fn node(&self) -> &Node {
        self.node
    }

    pub fn mapper(&self) -> &OpMapper {
        self.mapper
    }

    pub fn num_inputs(&self) -> usize {
        self.inputs.len()
    }

    /// Input slots in declaration order; `None` marks a value that was not
    /// produced (an untaken branch feeding a `Merge`).
    pub fn inputs(&self) -> &[Option<TensorValue>] {
        &self.inputs
    }

    pub fn input_opt(&self, index: usize) -> Option<&TensorValue> {
        self.inputs.get(index).and_then(Option::as_ref)
    }

    pub fn input(&self, index: usize) -> Result<&TensorValue> {
        self.input_opt(index).ok_or_else(|| {
            anyhow!(
                "node {} ({}) has no value for input {}",
                self.node.name,
                self.node.op,
                index
            )
        })
    }

    pub fn attr(&self, name: &str) -> Option<&AttrValue> {
        self.node.attr(name)
    }

    fn input_range(&self, mapper: &InputParamMapper) -> (usize, usize) {
        let len = self.inputs.len() as isize;
        let resolve = |pos: isize| -> usize {
            if pos < 0 {
                (len + pos).max(0) as usize
            } else {
                pos.min(len) as usize
            }
        };
        let start = resolve(mapper.start);
        let end = match mapper.end {
            None => (start + 1).min(self.inputs.len()),
            Some(end) if end <= 0 => resolve(len + end),
            Some(end) => resolve(end),
        };
        (start, end.max(start))
    }

    fn input_param(&self, mapper: &InputParamMapper) -> Result<Option<ParamValue>> {
        let (start, end) = self.input_range(mapper);
        if mapper.param_type == ParamType::Tensors {
            let tensors = (start..end)
                .map(|i| self.input(i).cloned())
                .collect::<Result<Vec<_>>>()?;
            return Ok(Some(ParamValue::Tensors(tensors)));
        }
        let Some(tensor) = self.input_opt(start) else {
            return Ok(None);
        };
        Ok(Some(match mapper.param_type {
            ParamType::Number => ParamValue::Number(tensor.as_scalar_f64()?),
            ParamType::Numbers => ParamValue::Numbers(tensor.to_f64_vec()),
            ParamType::Bool => ParamValue::Bool(tensor.as_scalar_bool()?),
            _ => ParamValue::Tensor(tensor.clone()),
        }))
    }

    fn attr_param(&self, mapper: &AttrParamMapper) -> Result<Option<ParamValue>> {
        let raw = self
            .node
            .attr(&mapper.tf_name)
            .or(mapper.default_value.as_ref());
        let Some(raw) = raw else {
            return Ok(None);
        };
        ParamValue::from_attr(raw, Some(mapper.param_type))
            .map(Some)
            .ok_or_else(|| {
                anyhow!(
                    "node {} attribute {} is {} and cannot be read as {:?}",
                    self.node.name,
                    mapper.tf_name,
                    raw.kind(),
                    mapper.param_type
                )
            })
    }

    /// Look a param up by its mapper name, falling back to the raw attribute
    /// of that name.
    pub fn get(&self, name: &str) -> Result<Option<ParamValue>> {
        if let Some(input) = self.mapper.inputs.iter().find(|input| input.name == name) {
            return self.input_param(input);
        }
        if let Some(attr) = self.mapper.attrs.iter().find(|attr| attr.name == name) {
            return self.attr_param(attr);
        }
        Ok(self
            .node
            .attr(name)
            .and_then(|raw| ParamValue::from_attr(raw, None)))
    }

    fn require(&self, name: &str) -> Result<ParamValue> {
        self.get(name)?.ok_or_else(|| {
            anyhow!(
                "node {} ({}) is missing param {}",
                self.node.name,
                self.node.op,
                name
            )
        })
    }

    fn mismatch(&self, name: &str, wanted: &str, got: &ParamValue) -> anyhow::Error {
        anyhow!(
            "node {} param {} should be {}, got {:?}",
            self.node.name,
            name,
            wanted,
            got
        )
    }

    pub fn tensor(&self, name: &str) -> Result<TensorValue> {
        match self.require(name)? {
            ParamValue::Tensor(tensor) => Ok(tensor),
            other => Err(self.mismatch(name, "a tensor", &other)),
        }
    }

    pub fn tensors(&self, name: &str) -> Result<Vec<TensorValue>> {
        match self.require(name)? {
            ParamValue::Tensors(tensors) => Ok(tensors),
            ParamValue::Tensor(tensor) => Ok(vec![tensor]),
            other => Err(self.mismatch(name, "a tensor list", &other)),
        }
    }

    pub fn number(&self, name: &str) -> Result<f64> {
        match self.require(name)? {
            ParamValue::Number(value) => Ok(value),
            ParamValue::Tensor(tensor) => tensor.as_scalar_f64(),
            other => Err(self.mismatch(name, "a number", &other)),
        }
    }

    pub fn numbers(&self, name: &str) -> Result<Vec<f64>> {
        match self.require(name)? {
            ParamValue::Numbers(values) => Ok(values),
            ParamValue::Number(value) => Ok(vec![value]),
            ParamValue::Tensor(tensor) => Ok(tensor.to_f64_vec()),
            other => Err(self.mismatch(name, "a number list", &other)),
        }
    }

    pub fn boolean(&self, name: &str) -> Result<bool> {
        match self.require(name)? {
            ParamValue::Bool(value) => Ok(value),
            ParamValue::Number(value) => Ok(value != 0.0),
            ParamValue::Tensor(tensor) => tensor.as_scalar_bool(),
            other => Err(self.mismatch(name, "a bool", &other)),
        }
    }

    pub fn string(&self, name: &str) -> Result<String> {
        match self.require(name)? {
            ParamValue::Str(value) => Ok(value),
            other => Err(self.mismatch(name, "a string", &other)),
        }
    }

    pub fn dtype(&self, name: &str) -> Result<DType> {
        match self.require(name)? {
            ParamValue::DType(value) => Ok(value),
            other => Err(self.mismatch(name, "a dtype", &other)),
        }
    }

    pub fn dtypes(&self, name: &str) -> Result<Vec<DType>> {
        match self.require(name)? {
            ParamValue::DTypes(values) => Ok(values),
            ParamValue::DType(value) => Ok(vec![value]),
            other => Err(self.mismatch(name, "a dtype list", &other)),
        }
    }

    /// Optional shape param; absent means unknown.
    pub fn shape(&self, name: &str) -> Result<Option<PartialShape>> {
        match self.get(name)? {
            None => Ok(None),
            Some(ParamValue::Shape(shape)) => Ok(Some(shape)),
            Some(other) => Err(self.mismatch(name, "a shape", &other)),
        }
    }

    pub fn shapes(&self, name: &str) -> Result<Vec<PartialShape>> {
        match self.get(name)? {
            None => Ok(Vec::new()),
            Some(ParamValue::Shapes(shapes)) => Ok(shapes),
            Some(ParamValue::Shape(shape)) => Ok(vec![shape]),
            Some(other) => Err(self.mismatch(name, "a shape list", &other)),
        }
    }
}
