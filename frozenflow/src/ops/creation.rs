use anyhow::{anyhow, Result};

use super::{to_dims, unsupported};
use crate::graph::AttrValue;
use crate::random::Random;
use crate::registry::{AttrParamMapper, Category, InputParamMapper, NodeValue, OpMapper, ParamType};
use crate::tensor::{numel, DType, TensorOptions, TensorValue};

pub(super) fn mappers() -> Vec<OpMapper> {
    vec![
        OpMapper::new("Fill", Category::Creation).with_inputs(vec![
            InputParamMapper::numbers(0, "shape"),
            InputParamMapper::tensor(1, "value"),
        ]),
        OpMapper::new("ZerosLike", Category::Creation)
            .with_inputs(vec![InputParamMapper::tensor(0, "x")]),
        OpMapper::new("OnesLike", Category::Creation)
            .with_inputs(vec![InputParamMapper::tensor(0, "x")]),
        OpMapper::new("Range", Category::Creation)
            .with_inputs(vec![
                InputParamMapper::tensor(0, "start"),
                InputParamMapper::number(1, "stop"),
                InputParamMapper::number(2, "step"),
            ])
            .with_attrs(vec![AttrParamMapper::new("Tidx", "dtype", ParamType::DType).not_supported()]),
        OpMapper::new("RandomUniform", Category::Creation)
            .with_inputs(vec![InputParamMapper::numbers(0, "shape")])
            .with_attrs(vec![
                AttrParamMapper::new("minval", "minval", ParamType::Number).with_default(0.0),
                AttrParamMapper::new("maxval", "maxval", ParamType::Number).with_default(1.0),
                AttrParamMapper::new("dtype", "dtype", ParamType::DType)
                    .with_default(AttrValue::DType(DType::Float32)),
                AttrParamMapper::new("seed", "seed", ParamType::Number).with_default(0),
                AttrParamMapper::new("seed2", "seed2", ParamType::Number).with_default(0),
            ]),
    ]
}

fn range(start: &TensorValue, stop: f64, step: f64) -> Result<TensorValue> {
    if step == 0.0 {
        return Err(anyhow!("Range step must not be zero"));
    }
    let begin = start.as_scalar_f64()?;
    let count = ((stop - begin) / step).ceil().max(0.0) as usize;
    let data = (0..count).map(|i| begin + step * i as f64).collect();
    TensorValue::from_f64(start.dtype(), data, vec![count])
}

fn random_uniform(node: &NodeValue<'_>) -> Result<TensorValue> {
    let shape = to_dims(&node.numbers("shape")?)?;
    let dtype = node.dtype("dtype")?;
    let range = (node.number("minval")? as f32, node.number("maxval")? as f32);
    let seed = node.number("seed")? as u64;
    let seed2 = node.number("seed2")? as u64;
    let len = numel(&shape);
    let opts = TensorOptions { shape: Some(shape) };
    let tensor = if seed == 0 && seed2 == 0 {
        Random::<f32>::from_entropy().next_with_opts(range, len, opts)?
    } else {
        Random::<f32>::generate_with_seed_opts(seed ^ seed2.rotate_left(32), range, len, opts)?
    };
    TensorValue::from(tensor).cast(dtype)
}

pub(super) fn execute(node: &NodeValue<'_>) -> Result<TensorValue> {
    match node.op() {
        "Fill" => {
            let shape = to_dims(&node.numbers("shape")?)?;
            let value = node.tensor("value")?;
            Ok(TensorValue::filled(value.dtype(), value.as_scalar_f64()?, shape))
        }
        "ZerosLike" => {
            let x = node.tensor("x")?;
            Ok(TensorValue::filled(x.dtype(), 0.0, x.shape().to_vec()))
        }
        "OnesLike" => {
            let x = node.tensor("x")?;
            Ok(TensorValue::filled(x.dtype(), 1.0, x.shape().to_vec()))
        }
        "Range" => range(&node.tensor("start")?, node.number("stop")?, node.number("step")?),
        "RandomUniform" => random_uniform(node),
        _ => Err(unsupported(node, Category::Creation)),
    }
}
