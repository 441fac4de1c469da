use anyhow::{anyhow, Result};

use super::cpu::elementwise::binary_broadcast;
use super::unsupported;
use crate::registry::{AttrParamMapper, Category, InputParamMapper, NodeValue, OpMapper, ParamType};
use crate::tensor::TensorValue;

const BINARY_OPS: &[&str] = &[
    "Add",
    "AddV2",
    "BiasAdd",
    "Sub",
    "Mul",
    "RealDiv",
    "Div",
    "FloorDiv",
    "Maximum",
    "Minimum",
    "Pow",
    "SquaredDifference",
    "Mod",
    "FloorMod",
];

pub(super) fn mappers() -> Vec<OpMapper> {
    BINARY_OPS
        .iter()
        .map(|op| {
            OpMapper::new(op, Category::Arithmetic)
                .with_inputs(vec![InputParamMapper::tensor(0, "a"), InputParamMapper::tensor(1, "b")])
                .with_attrs(vec![AttrParamMapper::new("T", "dtype", ParamType::DType).not_supported()])
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    FloorDiv,
    Maximum,
    Minimum,
    Pow,
    SquaredDifference,
    Mod,
}

impl BinaryOp {
    fn from_op(op: &str) -> Option<Self> {
        Some(match op {
            "Add" | "AddV2" | "BiasAdd" => BinaryOp::Add,
            "Sub" => BinaryOp::Sub,
            "Mul" => BinaryOp::Mul,
            "RealDiv" | "Div" => BinaryOp::Div,
            "FloorDiv" => BinaryOp::FloorDiv,
            "Maximum" => BinaryOp::Maximum,
            "Minimum" => BinaryOp::Minimum,
            "Pow" => BinaryOp::Pow,
            "SquaredDifference" => BinaryOp::SquaredDifference,
            "Mod" | "FloorMod" => BinaryOp::Mod,
            _ => return None,
        })
    }

    fn apply_f32(self, a: f32, b: f32) -> f32 {
        match self {
            BinaryOp::Add => a + b,
            BinaryOp::Sub => a - b,
            BinaryOp::Mul => a * b,
            BinaryOp::Div => a / b,
            BinaryOp::FloorDiv => (a / b).floor(),
            BinaryOp::Maximum => a.max(b),
            BinaryOp::Minimum => a.min(b),
            BinaryOp::Pow => a.powf(b),
            BinaryOp::SquaredDifference => (a - b) * (a - b),
            BinaryOp::Mod => a - b * (a / b).floor(),
        }
    }

    fn apply_i32(self, a: i32, b: i32) -> i32 {
        match self {
            BinaryOp::Add => a.wrapping_add(b),
            BinaryOp::Sub => a.wrapping_sub(b),
            BinaryOp::Mul => a.wrapping_mul(b),
            BinaryOp::Div => a.wrapping_div(b),
            BinaryOp::FloorDiv => {
                let q = a.wrapping_div(b);
                if a.wrapping_rem(b) != 0 && ((a < 0) != (b < 0)) {
                    q - 1
                } else {
                    q
                }
            }
            BinaryOp::Maximum => a.max(b),
            BinaryOp::Minimum => a.min(b),
            BinaryOp::Pow => a.wrapping_pow(b as u32),
            BinaryOp::SquaredDifference => a.wrapping_sub(b).wrapping_mul(a.wrapping_sub(b)),
            BinaryOp::Mod => {
                let r = a.wrapping_rem(b);
                if r != 0 && ((r < 0) != (b < 0)) {
                    r + b
                } else {
                    r
                }
            }
        }
    }

    fn check_i32_rhs(self, rhs: &[i32]) -> Result<()> {
        match self {
            BinaryOp::Div | BinaryOp::FloorDiv | BinaryOp::Mod if rhs.contains(&0) => {
                Err(anyhow!("integer division by zero"))
            }
            BinaryOp::Pow if rhs.iter().any(|v| *v < 0) => {
                Err(anyhow!("integer pow with a negative exponent"))
            }
            _ => Ok(()),
        }
    }
}

pub(super) fn execute(node: &NodeValue<'_>) -> Result<TensorValue> {
    let op = BinaryOp::from_op(node.op()).ok_or_else(|| unsupported(node, Category::Arithmetic))?;
    let a = node.tensor("a")?;
    let b = node.tensor("b")?;
    match (&a, &b) {
        (TensorValue::F32(a), TensorValue::F32(b)) => {
            Ok(binary_broadcast(a, b, |x, y| op.apply_f32(x, y))?.into())
        }
        (TensorValue::I32(a), TensorValue::I32(b)) => {
            op.check_i32_rhs(&b.data)?;
            Ok(binary_broadcast(a, b, |x, y| op.apply_i32(x, y))?.into())
        }
        _ => Err(anyhow!(
            "{} expects matching numeric dtypes, got {} and {}",
            node.op(),
            a.dtype(),
            b.dtype()
        )),
    }
}
