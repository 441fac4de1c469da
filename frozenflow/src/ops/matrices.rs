use anyhow::{anyhow, Result};

use super::cpu::matmul::matmul;
use super::unsupported;
use crate::registry::{AttrParamMapper, Category, InputParamMapper, NodeValue, OpMapper, ParamType};
use crate::tensor::TensorValue;

pub(super) fn mappers() -> Vec<OpMapper> {
    vec![OpMapper::new("MatMul", Category::Matrices)
        .with_inputs(vec![InputParamMapper::tensor(0, "a"), InputParamMapper::tensor(1, "b")])
        .with_attrs(vec![
            AttrParamMapper::new("transpose_a", "transposeA", ParamType::Bool).with_default(false),
            AttrParamMapper::new("transpose_b", "transposeB", ParamType::Bool).with_default(false),
        ])]
}

pub(super) fn execute(node: &NodeValue<'_>) -> Result<TensorValue> {
    if node.op() != "MatMul" {
        return Err(unsupported(node, Category::Matrices));
    }
    let a = node.tensor("a")?;
    let b = node.tensor("b")?;
    let transpose_a = node.boolean("transposeA")?;
    let transpose_b = node.boolean("transposeB")?;
    match (&a, &b) {
        (TensorValue::F32(a), TensorValue::F32(b)) => Ok(matmul(a, b, transpose_a, transpose_b)?.into()),
        (TensorValue::I32(a), TensorValue::I32(b)) => Ok(matmul(a, b, transpose_a, transpose_b)?.into()),
        _ => Err(anyhow!(
            "MatMul expects matching numeric dtypes, got {} and {}",
            a.dtype(),
            b.dtype()
        )),
    }
}
