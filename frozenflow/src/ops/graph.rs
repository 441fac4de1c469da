use anyhow::{anyhow, Result};
use tracing::warn;

use super::{unsupported, OpOutcome};
use crate::graph::AttrValue;
use crate::registry::{AttrParamMapper, Category, InputParamMapper, NodeValue, OpMapper, ParamType};
use crate::tensor::{DType, TensorValue};

pub(super) fn mappers() -> Vec<OpMapper> {
    let single = || vec![InputParamMapper::tensor(0, "x")];
    vec![
        OpMapper::new("Placeholder", Category::Graph).with_attrs(vec![
            AttrParamMapper::new("shape", "shape", ParamType::Shape),
            AttrParamMapper::new("dtype", "dtype", ParamType::DType),
        ]),
        OpMapper::new("PlaceholderWithDefault", Category::Graph)
            .with_inputs(vec![InputParamMapper::tensor(0, "default")])
            .with_attrs(vec![AttrParamMapper::new("shape", "shape", ParamType::Shape)]),
        OpMapper::new("Const", Category::Graph)
            .with_attrs(vec![AttrParamMapper::new("value", "value", ParamType::Tensor)]),
        OpMapper::new("Identity", Category::Graph).with_inputs(single()),
        OpMapper::new("Snapshot", Category::Graph).with_inputs(single()),
        OpMapper::new("StopGradient", Category::Graph).with_inputs(single()),
        OpMapper::new("IdentityN", Category::Graph)
            .with_inputs(vec![InputParamMapper::tensors(0, 0, "x")]),
        OpMapper::new("Rank", Category::Graph).with_inputs(single()),
        OpMapper::new("Size", Category::Graph).with_inputs(single()),
        OpMapper::new("Shape", Category::Graph)
            .with_inputs(single())
            .with_attrs(vec![AttrParamMapper::new("out_type", "dtype", ParamType::DType)
                .with_default(AttrValue::DType(DType::Int32))]),
        OpMapper::new("Print", Category::Graph)
            .with_inputs(vec![
                InputParamMapper::tensor(0, "x"),
                InputParamMapper::tensors(1, 0, "data"),
            ])
            .with_attrs(vec![
                AttrParamMapper::new("message", "message", ParamType::Str).with_default(""),
                AttrParamMapper::new("summarize", "summarize", ParamType::Number).with_default(3),
            ]),
        OpMapper::new("NoOp", Category::Graph),
    ]
}

pub(super) fn execute(node: &NodeValue<'_>) -> Result<OpOutcome> {
    let outcome = match node.op() {
        "Placeholder" => {
            return Err(anyhow!("placeholder {} was not fed", node.name()));
        }
        "PlaceholderWithDefault" => OpOutcome::single(node.tensor("default")?),
        "Const" => OpOutcome::single(node.tensor("value")?),
        "Identity" | "Snapshot" | "StopGradient" => OpOutcome::single(node.tensor("x")?),
        "IdentityN" => OpOutcome::values(node.tensors("x")?),
        "Rank" => OpOutcome::single(TensorValue::from(node.tensor("x")?.rank() as i32)),
        "Size" => OpOutcome::single(TensorValue::from(node.tensor("x")?.len() as i32)),
        "Shape" => {
            let x = node.tensor("x")?;
            let dims = x.shape().iter().map(|d| *d as f64).collect();
            OpOutcome::single(TensorValue::from_f64(node.dtype("dtype")?, dims, vec![x.rank()])?)
        }
        "Print" => {
            let x = node.tensor("x")?;
            let message = node.string("message")?;
            let data = node.tensors("data")?;
            let rendered = data.iter().map(ToString::to_string).collect::<Vec<_>>();
            warn!(node = node.name(), "{} {}", message, rendered.join(" "));
            OpOutcome::single(x)
        }
        "NoOp" => OpOutcome::default(),
        _ => return Err(unsupported(node, Category::Graph)),
    };
    Ok(outcome)
}
