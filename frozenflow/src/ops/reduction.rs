use anyhow::{anyhow, Result};

use super::cpu::reduce::reduce;
use super::{normalize_axis, unsupported};
use crate::registry::{AttrParamMapper, Category, InputParamMapper, NodeValue, OpMapper, ParamType};
use crate::tensor::{Tensor, TensorValue};

const REDUCE_OPS: &[&str] = &["Sum", "Mean", "Max", "Min", "Prod"];
const ARG_OPS: &[&str] = &["ArgMax", "ArgMin"];

pub(super) fn mappers() -> Vec<OpMapper> {
    let reduce_ops = REDUCE_OPS.iter().map(|op| {
        OpMapper::new(op, Category::Reduction)
            .with_inputs(vec![InputParamMapper::tensor(0, "x"), InputParamMapper::numbers(1, "axis")])
            .with_attrs(vec![
                AttrParamMapper::new("keep_dims", "keepDims", ParamType::Bool).with_default(false),
            ])
    });
    let arg_ops = ARG_OPS.iter().map(|op| {
        OpMapper::new(op, Category::Reduction)
            .with_inputs(vec![InputParamMapper::tensor(0, "x"), InputParamMapper::number(1, "axis")])
    });
    reduce_ops.chain(arg_ops).collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Reducer {
    Sum,
    Mean,
    Max,
    Min,
    Prod,
}

impl Reducer {
    fn from_op(op: &str) -> Option<Self> {
        Some(match op {
            "Sum" => Reducer::Sum,
            "Mean" => Reducer::Mean,
            "Max" => Reducer::Max,
            "Min" => Reducer::Min,
            "Prod" => Reducer::Prod,
            _ => return None,
        })
    }
}

pub(super) fn execute(node: &NodeValue<'_>) -> Result<TensorValue> {
    let x = node.tensor("x")?;
    if ARG_OPS.contains(&node.op()) {
        let axis = normalize_axis(node.number("axis")?, x.rank())?;
        let largest = node.op() == "ArgMax";
        return match &x {
            TensorValue::F32(t) => arg_reduce(t, axis, largest),
            TensorValue::I32(t) => arg_reduce(t, axis, largest),
            TensorValue::Bool(_) => Err(anyhow!("{} does not accept bool inputs", node.op())),
        };
    }

    let reducer = Reducer::from_op(node.op()).ok_or_else(|| unsupported(node, Category::Reduction))?;
    let mut axes = node
        .numbers("axis")?
        .into_iter()
        .map(|axis| normalize_axis(axis, x.rank()))
        .collect::<Result<Vec<_>>>()?;
    axes.sort_unstable();
    axes.dedup();
    let keep_dims = node.boolean("keepDims")?;
    let count = axes.iter().map(|axis| x.shape()[*axis]).product::<usize>();
    match &x {
        TensorValue::F32(t) => {
            let out = match reducer {
                Reducer::Sum => reduce(t, &axes, keep_dims, 0.0, |acc, v, _| acc + v)?,
                Reducer::Mean => {
                    reduce(t, &axes, keep_dims, 0.0, |acc, v, _| acc + v)?.map(|v| v / count as f32)
                }
                Reducer::Prod => reduce(t, &axes, keep_dims, 1.0, |acc, v, _| acc * v)?,
                Reducer::Max => extreme(t, &axes, keep_dims, node, |v, best| v > best)?,
                Reducer::Min => extreme(t, &axes, keep_dims, node, |v, best| v < best)?,
            };
            Ok(out.into())
        }
        TensorValue::I32(t) => {
            let out = match reducer {
                Reducer::Sum => reduce(t, &axes, keep_dims, 0i32, |acc, v, _| acc.wrapping_add(v))?,
                Reducer::Mean => {
                    if count == 0 {
                        return Err(anyhow!("{} over an empty axis", node.name()));
                    }
                    reduce(t, &axes, keep_dims, 0i32, |acc, v, _| acc.wrapping_add(v))?
                        .map(|v| v / count as i32)
                }
                Reducer::Prod => reduce(t, &axes, keep_dims, 1i32, |acc, v, _| acc.wrapping_mul(v))?,
                Reducer::Max => extreme(t, &axes, keep_dims, node, |v, best| v > best)?,
                Reducer::Min => extreme(t, &axes, keep_dims, node, |v, best| v < best)?,
            };
            Ok(out.into())
        }
        TensorValue::Bool(_) => Err(anyhow!("{} does not accept bool inputs", node.op())),
    }
}

/// Max or min: `better(candidate, best)` decides whether to replace.
fn extreme<T: Copy>(
    t: &Tensor<T>,
    axes: &[usize],
    keep_dims: bool,
    node: &NodeValue<'_>,
    better: impl Fn(T, T) -> bool,
) -> Result<Tensor<T>> {
    let folded = reduce(t, axes, keep_dims, None, |best: Option<T>, v, _| match best {
        Some(best) if !better(v, best) => Some(best),
        _ => Some(v),
    })?;
    let shape = folded.shape().to_vec();
    let data = folded
        .data
        .into_iter()
        .collect::<Option<Vec<T>>>()
        .ok_or_else(|| anyhow!("{} over an empty axis", node.name()))?;
    Tensor::with_shape(data, shape)
}

/// Position of the first largest (or smallest) element along `axis`.
fn arg_reduce<T: Copy + PartialOrd>(t: &Tensor<T>, axis: usize, largest: bool) -> Result<TensorValue> {
    if t.shape()[axis] == 0 {
        return Err(anyhow!("cannot take an arg reduction over an empty axis"));
    }
    let folded = reduce(t, &[axis], false, None, |best: Option<(usize, T)>, v, index| {
        let replace = match best {
            None => true,
            Some((_, b)) if largest => v > b,
            Some((_, b)) => v < b,
        };
        if replace {
            Some((index[axis], v))
        } else {
            best
        }
    })?;
    Ok(folded
        .map(|slot| slot.map_or(0, |(position, _)| position as i32))
        .into())
}
