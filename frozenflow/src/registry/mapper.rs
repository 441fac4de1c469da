//! Op descriptors: how a graph op name binds to inputs, attributes and an
//! executor.
use std::fmt;
use std::sync::Arc;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use super::NodeValue;
use crate::graph::AttrValue;
use crate::tensor::TensorValue;

/// User-supplied executor for a custom op.
pub type OpExecutorFn = Arc<dyn Fn(&NodeValue<'_>) -> Result<Vec<TensorValue>> + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Arithmetic,
    BasicMath,
    Control,
    Creation,
    Graph,
    Logical,
    Matrices,
    Normalization,
    Reduction,
    SliceJoin,
    Transformation,
    Custom,
}

impl Category {
    pub fn as_str(self) -> &'static str {
        match self {
            Category::Arithmetic => "arithmetic",
            Category::BasicMath => "basic_math",
            Category::Control => "control",
            Category::Creation => "creation",
            Category::Graph => "graph",
            Category::Logical => "logical",
            Category::Matrices => "matrices",
            Category::Normalization => "normalization",
            Category::Reduction => "reduction",
            Category::SliceJoin => "slice_join",
            Category::Transformation => "transformation",
            Category::Custom => "custom",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamType {
    Tensor,
    Tensors,
    Number,
    Numbers,
    Bool,
    Str,
    DType,
    DTypes,
    Shape,
    Shapes,
}

/// Positional input binding. `end` selects a range of inputs; zero or a
/// negative value counts from the end.
#[derive(Debug, Clone, PartialEq)]
pub struct InputParamMapper {
    pub name: String,
    pub start: isize,
    pub end: Option<isize>,
    pub param_type: ParamType,
}

impl InputParamMapper {
    pub fn tensor(start: isize, name: &str) -> Self {
        Self {
            name: name.to_string(),
            start,
            end: None,
            param_type: ParamType::Tensor,
        }
    }

    pub fn tensors(start: isize, end: isize, name: &str) -> Self {
        Self {
            name: name.to_string(),
            start,
            end: Some(end),
            param_type: ParamType::Tensors,
        }
    }

    /// Input read as a number (the tensor's single element).
    pub fn number(start: isize, name: &str) -> Self {
        Self {
            param_type: ParamType::Number,
            ..Self::tensor(start, name)
        }
    }

    /// Input read as a flat list of numbers.
    pub fn numbers(start: isize, name: &str) -> Self {
        Self {
            param_type: ParamType::Numbers,
            ..Self::tensor(start, name)
        }
    }

    pub fn boolean(start: isize, name: &str) -> Self {
        Self {
            param_type: ParamType::Bool,
            ..Self::tensor(start, name)
        }
    }
}

/// Attribute binding from the graph's attribute name to a param name.
#[derive(Debug, Clone, PartialEq)]
pub struct AttrParamMapper {
    pub tf_name: String,
    pub name: String,
    pub param_type: ParamType,
    pub default_value: Option<AttrValue>,
    pub not_supported: bool,
}

impl AttrParamMapper {
    pub fn new(tf_name: &str, name: &str, param_type: ParamType) -> Self {
        Self {
            tf_name: tf_name.to_string(),
            name: name.to_string(),
            param_type,
            default_value: None,
            not_supported: false,
        }
    }

    pub fn with_default(mut self, value: impl Into<AttrValue>) -> Self {
        self.default_value = Some(value.into());
        self
    }

    pub fn not_supported(mut self) -> Self {
        self.not_supported = true;
        self
    }
}

#[derive(Clone)]
pub struct OpMapper {
    pub tf_op_name: String,
    pub category: Category,
    pub inputs: Vec<InputParamMapper>,
    pub attrs: Vec<AttrParamMapper>,
    pub custom_executor: Option<OpExecutorFn>,
}

impl OpMapper {
    pub fn new(tf_op_name: &str, category: Category) -> Self {
        Self {
            tf_op_name: tf_op_name.to_string(),
            category,
            inputs: Vec::new(),
            attrs: Vec::new(),
            custom_executor: None,
        }
    }

    /// Mapper for a user-registered op: no descriptors, just the executor.
    pub fn custom(name: &str, executor: OpExecutorFn) -> Self {
        Self {
            custom_executor: Some(executor),
            ..Self::new(name, Category::Custom)
        }
    }

    pub fn with_inputs(mut self, inputs: Vec<InputParamMapper>) -> Self {
        self.inputs = inputs;
        self
    }

    pub fn with_attrs(mut self, attrs: Vec<AttrParamMapper>) -> Self {
        self.attrs = attrs;
        self
    }

    pub fn is_custom(&self) -> bool {
        self.custom_executor.is_some()
    }
}

impl fmt::Debug for OpMapper {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpMapper")
            .field("tf_op_name", &self.tf_op_name)
            .field("category", &self.category)
            .field("inputs", &self.inputs)
            .field("attrs", &self.attrs)
            .field("custom_executor", &self.custom_executor.is_some())
            .finish()
    }
}
