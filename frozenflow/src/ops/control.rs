//! Frame-based control flow plus the stateful resource ops (queues and
//! tensor arrays) that loop bodies use.
use anyhow::{anyhow, Result};

use super::{FrameEffect, OpOutcome};
use crate::registry::{AttrParamMapper, Category, InputParamMapper, NodeValue, OpMapper, ParamType};
use crate::runtime::ResourceManager;
use crate::tensor::TensorValue;

mod queue;
mod tensor_array;

pub(super) fn mappers() -> Vec<OpMapper> {
    let single = || vec![InputParamMapper::tensor(0, "tensor")];
    let mut out = vec![
        OpMapper::new("LoopCond", Category::Control)
            .with_inputs(vec![InputParamMapper::tensor(0, "pred")]),
        OpMapper::new("Switch", Category::Control).with_inputs(vec![
            InputParamMapper::tensor(0, "data"),
            InputParamMapper::boolean(1, "pred"),
        ]),
        OpMapper::new("Merge", Category::Control)
            .with_inputs(vec![InputParamMapper::tensors(0, 0, "tensors")]),
        OpMapper::new("Enter", Category::Control)
            .with_inputs(single())
            .with_attrs(vec![
                AttrParamMapper::new("T", "dtype", ParamType::DType).not_supported(),
                AttrParamMapper::new("frame_name", "frameName", ParamType::Str),
                AttrParamMapper::new("is_constant", "isConstant", ParamType::Bool).with_default(false),
            ]),
        OpMapper::new("Exit", Category::Control).with_inputs(single()),
        OpMapper::new("NextIteration", Category::Control).with_inputs(single()),
    ];
    out.extend(tensor_array::mappers());
    out.extend(queue::mappers());
    out
}

pub(super) fn execute(node: &NodeValue<'_>, resources: &mut ResourceManager) -> Result<OpOutcome> {
    match node.op() {
        "LoopCond" => Ok(OpOutcome::single(node.tensor("pred")?)),
        "Switch" => {
            let data = node.tensor("data")?;
            let outputs = if node.boolean("pred")? {
                vec![None, Some(data)]
            } else {
                vec![Some(data), None]
            };
            Ok(OpOutcome::slots(outputs))
        }
        "Merge" => {
            let (index, value) = node
                .inputs()
                .iter()
                .enumerate()
                .find_map(|(i, slot)| slot.as_ref().map(|value| (i, value.clone())))
                .ok_or_else(|| anyhow!("Merge {} has no available input", node.name()))?;
            Ok(OpOutcome::values(vec![value, TensorValue::from(index as i32)]))
        }
        "Enter" => {
            let effect = FrameEffect::Enter {
                frame: node.string("frameName")?,
                is_constant: node.boolean("isConstant")?,
            };
            Ok(OpOutcome::single(node.tensor("tensor")?).with_effect(effect))
        }
        "Exit" => Ok(OpOutcome::single(node.tensor("tensor")?).with_effect(FrameEffect::Exit)),
        "NextIteration" => {
            Ok(OpOutcome::single(node.tensor("tensor")?).with_effect(FrameEffect::NextIteration))
        }
        op if op.starts_with("TensorArray") => tensor_array::execute(node, resources),
        op if op.starts_with("Queue") || op == "FIFOQueueV2" => queue::execute(node, resources),
        _ => Err(super::unsupported(node, Category::Control)),
    }
}

/// Non-negative index list from a numbers param.
fn indices(values: &[f64]) -> Result<Vec<usize>> {
    super::to_dims(values)
}
