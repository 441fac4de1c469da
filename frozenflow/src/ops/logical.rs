use anyhow::{anyhow, Result};

use super::cpu::elementwise::{binary_broadcast, select};
use super::unsupported;
use crate::registry::{Category, InputParamMapper, NodeValue, OpMapper};
use crate::tensor::{Tensor, TensorValue};

const COMPARE_OPS: &[&str] = &["Equal", "NotEqual", "Greater", "GreaterEqual", "Less", "LessEqual"];

pub(super) fn mappers() -> Vec<OpMapper> {
    let binary = || vec![InputParamMapper::tensor(0, "a"), InputParamMapper::tensor(1, "b")];
    let mut out = COMPARE_OPS
        .iter()
        .chain(["LogicalAnd", "LogicalOr"].iter())
        .map(|op| OpMapper::new(op, Category::Logical).with_inputs(binary()))
        .collect::<Vec<_>>();
    out.push(
        OpMapper::new("LogicalNot", Category::Logical)
            .with_inputs(vec![InputParamMapper::tensor(0, "a")]),
    );
    for op in ["Select", "SelectV2"] {
        out.push(OpMapper::new(op, Category::Logical).with_inputs(vec![
            InputParamMapper::tensor(0, "condition"),
            InputParamMapper::tensor(1, "a"),
            InputParamMapper::tensor(2, "b"),
        ]));
    }
    out
}

fn compare<T: Copy + PartialOrd>(op: &str, a: &Tensor<T>, b: &Tensor<T>) -> Result<Tensor<bool>> {
    let f: fn(T, T) -> bool = match op {
        "Equal" => |x, y| x == y,
        "NotEqual" => |x, y| x != y,
        "Greater" => |x, y| x > y,
        "GreaterEqual" => |x, y| x >= y,
        "Less" => |x, y| x < y,
        "LessEqual" => |x, y| x <= y,
        other => return Err(anyhow!("{} is not a comparison", other)),
    };
    binary_broadcast(a, b, f)
}

fn bool_input(node: &NodeValue<'_>, name: &str) -> Result<Tensor<bool>> {
    let value = node.tensor(name)?;
    value
        .as_bool()
        .cloned()
        .ok_or_else(|| anyhow!("{} expects bool input {}, got {}", node.op(), name, value.dtype()))
}

pub(super) fn execute(node: &NodeValue<'_>) -> Result<TensorValue> {
    let op = node.op();
    if COMPARE_OPS.contains(&op) {
        let a = node.tensor("a")?;
        let b = node.tensor("b")?;
        let out = match (&a, &b) {
            (TensorValue::F32(a), TensorValue::F32(b)) => compare(op, a, b)?,
            (TensorValue::I32(a), TensorValue::I32(b)) => compare(op, a, b)?,
            (TensorValue::Bool(a), TensorValue::Bool(b)) => compare(op, a, b)?,
            _ => {
                return Err(anyhow!(
                    "{} expects matching dtypes, got {} and {}",
                    op,
                    a.dtype(),
                    b.dtype()
                ))
            }
        };
        return Ok(out.into());
    }
    match op {
        "LogicalAnd" => Ok(binary_broadcast(&bool_input(node, "a")?, &bool_input(node, "b")?, |x, y| x && y)?.into()),
        "LogicalOr" => Ok(binary_broadcast(&bool_input(node, "a")?, &bool_input(node, "b")?, |x, y| x || y)?.into()),
        "LogicalNot" => Ok(bool_input(node, "a")?.map(|v| !v).into()),
        "Select" | "SelectV2" => {
            let cond = bool_input(node, "condition")?;
            let a = node.tensor("a")?;
            let b = node.tensor("b")?;
            match (&a, &b) {
                (TensorValue::F32(a), TensorValue::F32(b)) => Ok(select(&cond, a, b)?.into()),
                (TensorValue::I32(a), TensorValue::I32(b)) => Ok(select(&cond, a, b)?.into()),
                (TensorValue::Bool(a), TensorValue::Bool(b)) => Ok(select(&cond, a, b)?.into()),
                _ => Err(anyhow!("{} branches must share a dtype", op)),
            }
        }
        _ => Err(unsupported(node, Category::Logical)),
    }
}
