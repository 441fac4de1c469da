use anyhow::{anyhow, Result};

use super::unsupported;
use crate::registry::{Category, InputParamMapper, NodeValue, OpMapper};
use crate::tensor::TensorValue;

const UNARY_OPS: &[&str] = &[
    "Abs", "Neg", "Square", "Sqrt", "Rsqrt", "Exp", "Log", "Relu", "Sigmoid", "Tanh", "Floor",
    "Ceil", "Sign",
];

pub(super) fn mappers() -> Vec<OpMapper> {
    UNARY_OPS
        .iter()
        .map(|op| {
            OpMapper::new(op, Category::BasicMath).with_inputs(vec![InputParamMapper::tensor(0, "x")])
        })
        .collect()
}

fn float_fn(op: &str) -> Option<fn(f32) -> f32> {
    let f: fn(f32) -> f32 = match op {
        "Abs" => f32::abs,
        "Neg" => |v: f32| -v,
        "Square" => |v: f32| v * v,
        "Sqrt" => f32::sqrt,
        "Rsqrt" => |v: f32| 1.0 / v.sqrt(),
        "Exp" => f32::exp,
        "Log" => f32::ln,
        "Relu" => |v: f32| v.max(0.0),
        "Sigmoid" => |v: f32| 1.0 / (1.0 + (-v).exp()),
        "Tanh" => f32::tanh,
        "Floor" => f32::floor,
        "Ceil" => f32::ceil,
        "Sign" => |v: f32| if v == 0.0 { 0.0 } else { v.signum() },
        _ => return None,
    };
    Some(f)
}

fn int_fn(op: &str) -> Option<fn(i32) -> i32> {
    let f: fn(i32) -> i32 = match op {
        "Abs" => i32::wrapping_abs,
        "Neg" => i32::wrapping_neg,
        "Square" => |v: i32| v.wrapping_mul(v),
        "Relu" => |v: i32| v.max(0),
        "Floor" | "Ceil" => |v: i32| v,
        "Sign" => i32::signum,
        _ => return None,
    };
    Some(f)
}

pub(super) fn execute(node: &NodeValue<'_>) -> Result<TensorValue> {
    let x = node.tensor("x")?;
    match &x {
        TensorValue::F32(t) => {
            let f = float_fn(node.op()).ok_or_else(|| unsupported(node, Category::BasicMath))?;
            Ok(t.map(|v| f(*v)).into())
        }
        TensorValue::I32(t) => {
            let f = int_fn(node.op()).ok_or_else(|| {
                anyhow!("{} is only defined for float32 inputs, got int32", node.op())
            })?;
            Ok(t.map(|v| f(*v)).into())
        }
        TensorValue::Bool(_) => Err(anyhow!("{} does not accept bool inputs", node.op())),
    }
}
