use anyhow::{anyhow, Result};

use super::{normalize_axis, unsupported};
use crate::registry::{AttrParamMapper, Category, InputParamMapper, NodeValue, OpMapper, ParamType};
use crate::tensor::{concat_values, stack_values, unstack_value, TensorValue};

pub(super) fn mappers() -> Vec<OpMapper> {
    vec![
        OpMapper::new("ConcatV2", Category::SliceJoin)
            .with_inputs(vec![
                InputParamMapper::tensors(0, -1, "tensors"),
                InputParamMapper::number(-1, "axis"),
            ])
            .with_attrs(vec![AttrParamMapper::new("N", "n", ParamType::Number).with_default(2)]),
        OpMapper::new("Pack", Category::SliceJoin)
            .with_inputs(vec![InputParamMapper::tensors(0, 0, "tensors")])
            .with_attrs(vec![AttrParamMapper::new("axis", "axis", ParamType::Number).with_default(0)]),
        OpMapper::new("Unpack", Category::SliceJoin)
            .with_inputs(vec![InputParamMapper::tensor(0, "tensor")])
            .with_attrs(vec![
                AttrParamMapper::new("axis", "axis", ParamType::Number).with_default(0),
                AttrParamMapper::new("num", "num", ParamType::Number).not_supported(),
            ]),
    ]
}

pub(super) fn execute(node: &NodeValue<'_>) -> Result<Vec<TensorValue>> {
    match node.op() {
        "ConcatV2" => {
            let tensors = node.tensors("tensors")?;
            let rank = tensors
                .first()
                .map(TensorValue::rank)
                .ok_or_else(|| anyhow!("ConcatV2 {} has no tensors", node.name()))?;
            let axis = normalize_axis(node.number("axis")?, rank)?;
            Ok(vec![concat_values(&tensors, axis)?])
        }
        "Pack" => {
            let tensors = node.tensors("tensors")?;
            let rank = tensors
                .first()
                .map(TensorValue::rank)
                .ok_or_else(|| anyhow!("Pack {} has no tensors", node.name()))?;
            let axis = normalize_axis(node.number("axis")?, rank + 1)?;
            Ok(vec![stack_values(&tensors, axis)?])
        }
        "Unpack" => {
            let tensor = node.tensor("tensor")?;
            let axis = normalize_axis(node.number("axis")?, tensor.rank())?;
            unstack_value(&tensor, axis)
        }
        _ => Err(unsupported(node, Category::SliceJoin)),
    }
}
