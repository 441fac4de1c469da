use anyhow::{anyhow, Result};

use super::{normalize_axis, unsupported};
use crate::registry::{AttrParamMapper, Category, InputParamMapper, NodeValue, OpMapper, ParamType};
use crate::tensor::{numel, TensorValue};

pub(super) fn mappers() -> Vec<OpMapper> {
    vec![
        OpMapper::new("Cast", Category::Transformation)
            .with_inputs(vec![InputParamMapper::tensor(0, "x")])
            .with_attrs(vec![
                AttrParamMapper::new("SrcT", "sdtype", ParamType::DType).not_supported(),
                AttrParamMapper::new("DstT", "dtype", ParamType::DType),
            ]),
        OpMapper::new("ExpandDims", Category::Transformation).with_inputs(vec![
            InputParamMapper::tensor(0, "x"),
            InputParamMapper::number(1, "axis"),
        ]),
        OpMapper::new("Reshape", Category::Transformation).with_inputs(vec![
            InputParamMapper::tensor(0, "x"),
            InputParamMapper::numbers(1, "shape"),
        ]),
        OpMapper::new("Squeeze", Category::Transformation)
            .with_inputs(vec![InputParamMapper::tensor(0, "x")])
            .with_attrs(vec![AttrParamMapper::new("squeeze_dims", "axis", ParamType::Numbers)
                .with_default(crate::graph::AttrValue::IntList(Vec::new()))]),
    ]
}

/// Resolve a reshape target that may hold one `-1`.
fn infer_shape(target: &[f64], total: usize) -> Result<Vec<usize>> {
    let unknown = target.iter().filter(|d| **d < 0.0).count();
    if unknown > 1 {
        return Err(anyhow!("reshape target {:?} has more than one -1", target));
    }
    let known = target
        .iter()
        .filter(|d| **d >= 0.0)
        .map(|d| *d as usize)
        .product::<usize>();
    target
        .iter()
        .map(|d| {
            if *d >= 0.0 {
                Ok(*d as usize)
            } else if known == 0 || total % known != 0 {
                Err(anyhow!("cannot infer -1 in {:?} for {} elements", target, total))
            } else {
                Ok(total / known)
            }
        })
        .collect()
}

pub(super) fn execute(node: &NodeValue<'_>) -> Result<TensorValue> {
    let x = node.tensor("x")?;
    match node.op() {
        "Cast" => x.cast(node.dtype("dtype")?),
        "ExpandDims" => {
            let rank = x.rank();
            let axis = node.number("axis")?;
            let axis = normalize_axis(axis, rank + 1)?;
            let mut shape = x.shape().to_vec();
            shape.insert(axis, 1);
            x.into_reshaped(shape)
        }
        "Reshape" => {
            let shape = infer_shape(&node.numbers("shape")?, x.len())?;
            if numel(&shape) != x.len() {
                return Err(anyhow!(
                    "cannot reshape {:?} into {:?}",
                    x.shape(),
                    shape
                ));
            }
            x.into_reshaped(shape)
        }
        "Squeeze" => {
            let rank = x.rank();
            let axes = node
                .numbers("axis")?
                .into_iter()
                .map(|axis| normalize_axis(axis, rank))
                .collect::<Result<Vec<_>>>()?;
            let mut shape = Vec::with_capacity(rank);
            for (i, dim) in x.shape().iter().enumerate() {
                let listed = axes.contains(&i);
                if listed && *dim != 1 {
                    return Err(anyhow!("cannot squeeze axis {} of size {}", i, dim));
                }
                if listed || (axes.is_empty() && *dim == 1) {
                    continue;
                }
                shape.push(*dim);
            }
            x.into_reshaped(shape)
        }
        _ => Err(unsupported(node, Category::Transformation)),
    }
}
