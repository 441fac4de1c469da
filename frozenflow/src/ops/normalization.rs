use anyhow::{anyhow, Result};

use super::{to_dims, unsupported};
use crate::registry::{AttrParamMapper, Category, InputParamMapper, NodeValue, OpMapper, ParamType};
use crate::tensor::{compute_strides, numel, Tensor, TensorValue};

pub(super) fn mappers() -> Vec<OpMapper> {
    let x = || vec![InputParamMapper::tensor(0, "x")];
    let batch_norm = |op: &str| {
        OpMapper::new(op, Category::Normalization)
            .with_inputs(vec![
                InputParamMapper::tensor(0, "x"),
                InputParamMapper::tensor(1, "scale"),
                InputParamMapper::tensor(2, "offset"),
                InputParamMapper::tensor(3, "mean"),
                InputParamMapper::tensor(4, "variance"),
            ])
            .with_attrs(vec![
                AttrParamMapper::new("epsilon", "epsilon", ParamType::Number).with_default(0.001),
                AttrParamMapper::new("data_format", "dataFormat", ParamType::Str).not_supported(),
            ])
    };
    vec![
        batch_norm("FusedBatchNorm"),
        batch_norm("FusedBatchNormV2"),
        OpMapper::new("LRN", Category::Normalization).with_inputs(x()).with_attrs(vec![
            AttrParamMapper::new("depth_radius", "radius", ParamType::Number).with_default(5),
            AttrParamMapper::new("bias", "bias", ParamType::Number).with_default(1.0),
            AttrParamMapper::new("alpha", "alpha", ParamType::Number).with_default(1.0),
            AttrParamMapper::new("beta", "beta", ParamType::Number).with_default(0.5),
        ]),
        OpMapper::new("Softmax", Category::Normalization).with_inputs(x()),
        OpMapper::new("LogSoftmax", Category::Normalization).with_inputs(x()),
        OpMapper::new("SparseToDense", Category::Normalization)
            .with_inputs(vec![
                InputParamMapper::tensor(0, "sparseIndices"),
                InputParamMapper::numbers(1, "outputShape"),
                InputParamMapper::tensor(2, "sparseValues"),
                InputParamMapper::tensor(3, "defaultValue"),
            ])
            .with_attrs(vec![AttrParamMapper::new(
                "validate_indices",
                "validateIndices",
                ParamType::Bool,
            )
            .with_default(true)
            .not_supported()]),
    ]
}

pub(super) fn execute(node: &NodeValue<'_>) -> Result<TensorValue> {
    match node.op() {
        "FusedBatchNorm" | "FusedBatchNormV2" => batch_norm(node),
        "LRN" => {
            let x = float_input(node, "x")?;
            let radius = node.number("radius")?;
            if radius < 0.0 || radius.fract() != 0.0 {
                return Err(anyhow!("LRN depth_radius must be a non-negative integer, got {}", radius));
            }
            let out = local_response_norm(
                &x,
                radius as usize,
                node.number("bias")? as f32,
                node.number("alpha")? as f32,
                node.number("beta")? as f32,
            )?;
            Ok(out.into())
        }
        "Softmax" => Ok(softmax(&float_input(node, "x")?, false)?.into()),
        "LogSoftmax" => Ok(softmax(&float_input(node, "x")?, true)?.into()),
        "SparseToDense" => sparse_to_dense(node),
        _ => Err(unsupported(node, Category::Normalization)),
    }
}

fn float_input(node: &NodeValue<'_>, name: &str) -> Result<Tensor<f32>> {
    match node.tensor(name)? {
        TensorValue::F32(t) => Ok(t),
        other => Err(anyhow!("{} expects float32 {}, got {}", node.op(), name, other.dtype())),
    }
}

/// Per-channel `(x - mean) / sqrt(variance + epsilon) * scale + offset`,
/// channels on the last axis.
fn batch_norm(node: &NodeValue<'_>) -> Result<TensorValue> {
    let x = float_input(node, "x")?;
    let channels = x.shape().last().copied().unwrap_or(1);
    let params = ["scale", "offset", "mean", "variance"]
        .into_iter()
        .map(|name| {
            let t = float_input(node, name)?;
            if t.len() != channels {
                return Err(anyhow!(
                    "{} of {} has {} values for {} channels",
                    name,
                    node.name(),
                    t.len(),
                    channels
                ));
            }
            Ok(t.data)
        })
        .collect::<Result<Vec<_>>>()?;
    let (scale, offset, mean, variance) = (&params[0], &params[1], &params[2], &params[3]);
    let epsilon = node.number("epsilon")? as f32;
    let data = x
        .data
        .iter()
        .enumerate()
        .map(|(i, v)| {
            let c = i % channels.max(1);
            (v - mean[c]) / (variance[c] + epsilon).sqrt() * scale[c] + offset[c]
        })
        .collect();
    Ok(Tensor::with_shape(data, x.shape().to_vec())?.into())
}

/// Normalise each element by the squared sum of its neighbours within
/// `radius` along the last axis.
fn local_response_norm(x: &Tensor<f32>, radius: usize, bias: f32, alpha: f32, beta: f32) -> Result<Tensor<f32>> {
    let depth = x.shape().last().copied().unwrap_or(1).max(1);
    let data = x
        .data
        .chunks(depth)
        .flat_map(|row| {
            (0..row.len()).map(move |d| {
                let lo = d.saturating_sub(radius);
                let hi = (d + radius + 1).min(row.len());
                let sqr_sum: f32 = row[lo..hi].iter().map(|v| v * v).sum();
                row[d] / (bias + alpha * sqr_sum).powf(beta)
            })
        })
        .collect();
    Tensor::with_shape(data, x.shape().to_vec())
}

/// Softmax over the last axis, optionally in log space.
fn softmax(x: &Tensor<f32>, log: bool) -> Result<Tensor<f32>> {
    let depth = x.shape().last().copied().unwrap_or(1).max(1);
    let mut data = Vec::with_capacity(x.len());
    for row in x.data.chunks(depth) {
        let max = row.iter().copied().fold(f32::NEG_INFINITY, f32::max);
        let sum: f32 = row.iter().map(|v| (v - max).exp()).sum();
        if log {
            let log_sum = sum.ln();
            data.extend(row.iter().map(|v| v - max - log_sum));
        } else {
            data.extend(row.iter().map(|v| (v - max).exp() / sum));
        }
    }
    Tensor::with_shape(data, x.shape().to_vec())
}

/// Scatter `sparseValues` into a tensor of `outputShape` filled with
/// `defaultValue`.
fn sparse_to_dense(node: &NodeValue<'_>) -> Result<TensorValue> {
    let indices = node.tensor("sparseIndices")?;
    let shape = to_dims(&node.numbers("outputShape")?)?;
    let values = node.tensor("sparseValues")?;
    let default = node.tensor("defaultValue")?;
    if values.dtype() != default.dtype() {
        return Err(anyhow!(
            "SparseToDense values are {} but the default is {}",
            values.dtype(),
            default.dtype()
        ));
    }

    let rank = shape.len();
    let coords = indices.to_i64_vec();
    let rows = match indices.rank() {
        0 | 1 if rank <= 1 => coords.iter().map(|c| vec![*c]).collect::<Vec<_>>(),
        2 if indices.shape()[1] == rank => coords.chunks(rank.max(1)).map(<[i64]>::to_vec).collect(),
        _ => {
            return Err(anyhow!(
                "SparseToDense indices of shape {:?} do not address an output of rank {}",
                indices.shape(),
                rank
            ))
        }
    };
    let sparse = values.to_f64_vec();
    if sparse.len() != 1 && sparse.len() != rows.len() {
        return Err(anyhow!(
            "SparseToDense has {} indices but {} values",
            rows.len(),
            sparse.len()
        ));
    }

    let strides = compute_strides(&shape);
    let mut dense = vec![default.as_scalar_f64()?; numel(&shape)];
    for (i, row) in rows.iter().enumerate() {
        let mut offset = 0usize;
        for ((coord, dim), stride) in row.iter().zip(&shape).zip(&strides) {
            let coord = usize::try_from(*coord)
                .ok()
                .filter(|c| c < dim)
                .ok_or_else(|| anyhow!("SparseToDense index {:?} is out of bounds for {:?}", row, shape))?;
            offset += coord * stride;
        }
        dense[offset] = if sparse.len() == 1 { sparse[0] } else { sparse[i] };
    }
    TensorValue::from_f64(values.dtype(), dense, shape)
}
