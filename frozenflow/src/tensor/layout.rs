//! Structural helpers shared by the queue, tensor arrays and join kernels.
use anyhow::{anyhow, Result};

use super::{numel, DType, Tensor, TensorElement, TensorValue};

fn typed<T: TensorElement>(values: &[TensorValue]) -> Result<Vec<&Tensor<T>>> {
    values
        .iter()
        .map(|value| {
            T::from_value(value)
                .ok_or_else(|| anyhow!("expected {} tensor, got {}", T::DTYPE, value.dtype()))
        })
        .collect()
}

fn concat_typed<T: Clone>(tensors: &[&Tensor<T>], axis: usize) -> Result<Tensor<T>> {
    let first = tensors
        .first()
        .ok_or_else(|| anyhow!("concat requires at least one tensor"))?;
    let rank = first.rank();
    if axis >= rank {
        return Err(anyhow!("concat axis {} out of range for rank {}", axis, rank));
    }
    let mut out_shape = first.shape().to_vec();
    out_shape[axis] = 0;
    for tensor in tensors {
        let shape = tensor.shape();
        let same_outer = shape.len() == rank
            && shape
                .iter()
                .zip(first.shape())
                .enumerate()
                .all(|(i, (a, b))| i == axis || a == b);
        if !same_outer {
            return Err(anyhow!(
                "cannot concat shapes {:?} and {:?} along axis {}",
                first.shape(),
                shape,
                axis
            ));
        }
        out_shape[axis] += shape[axis];
    }
    let outer = numel(&first.shape()[..axis]);
    let mut data = Vec::with_capacity(numel(&out_shape));
    for o in 0..outer {
        for tensor in tensors {
            let chunk = numel(&tensor.shape()[axis..]);
            data.extend_from_slice(&tensor.data[o * chunk..(o + 1) * chunk]);
        }
    }
    Tensor::with_shape(data, out_shape)
}

/// Concatenate values of one dtype along `axis`.
pub fn concat_values(values: &[TensorValue], axis: usize) -> Result<TensorValue> {
    let dtype = values
        .first()
        .map(TensorValue::dtype)
        .ok_or_else(|| anyhow!("concat requires at least one tensor"))?;
    Ok(match dtype {
        DType::Float32 => concat_typed(&typed::<f32>(values)?, axis)?.into(),
        DType::Int32 => concat_typed(&typed::<i32>(values)?, axis)?.into(),
        DType::Bool => concat_typed(&typed::<bool>(values)?, axis)?.into(),
    })
}

/// Stack values along a new axis inserted at `axis`.
pub fn stack_values(values: &[TensorValue], axis: usize) -> Result<TensorValue> {
    let expanded = values
        .iter()
        .map(|value| {
            if axis > value.rank() {
                return Err(anyhow!(
                    "stack axis {} out of range for rank {}",
                    axis,
                    value.rank()
                ));
            }
            let mut shape = value.shape().to_vec();
            shape.insert(axis, 1);
            value.reshape(shape)
        })
        .collect::<Result<Vec<_>>>()?;
    concat_values(&expanded, axis)
}

fn unstack_typed<T: TensorElement>(tensor: &Tensor<T>, axis: usize) -> Result<Vec<TensorValue>> {
    let shape = tensor.shape();
    if axis >= shape.len() {
        return Err(anyhow!(
            "unstack axis {} out of range for rank {}",
            axis,
            shape.len()
        ));
    }
    let dim = shape[axis];
    let outer = numel(&shape[..axis]);
    let inner = numel(&shape[axis + 1..]);
    let mut out_shape = shape.to_vec();
    out_shape.remove(axis);
    let mut parts = Vec::with_capacity(dim);
    for i in 0..dim {
        let mut data = Vec::with_capacity(outer * inner);
        for o in 0..outer {
            let start = (o * dim + i) * inner;
            data.extend_from_slice(&tensor.data[start..start + inner]);
        }
        parts.push(Tensor::with_shape(data, out_shape.clone())?.into());
    }
    Ok(parts)
}

/// Split a value into its slices along `axis`, dropping that axis.
pub fn unstack_value(value: &TensorValue, axis: usize) -> Result<Vec<TensorValue>> {
    match value {
        TensorValue::F32(t) => unstack_typed(t, axis),
        TensorValue::I32(t) => unstack_typed(t, axis),
        TensorValue::Bool(t) => unstack_typed(t, axis),
    }
}

fn rows_typed<T: TensorElement>(tensor: &Tensor<T>, rows: &[usize]) -> Result<TensorValue> {
    let shape = tensor.shape();
    let leading = *shape
        .first()
        .ok_or_else(|| anyhow!("cannot take rows of a scalar"))?;
    let row = numel(&shape[1..]);
    let mut data = Vec::with_capacity(rows.len() * row);
    for &r in rows {
        if r >= leading {
            return Err(anyhow!("row {} out of range for leading dim {}", r, leading));
        }
        data.extend_from_slice(&tensor.data[r * row..(r + 1) * row]);
    }
    let mut out_shape = shape.to_vec();
    out_shape[0] = rows.len();
    Ok(Tensor::with_shape(data, out_shape)?.into())
}

/// Rows `start..start + len` of the leading axis.
pub fn slice_leading(value: &TensorValue, start: usize, len: usize) -> Result<TensorValue> {
    let rows = (start..start + len).collect::<Vec<_>>();
    gather_leading(value, &rows)
}

/// Rows at `indices` of the leading axis, in order.
pub fn gather_leading(value: &TensorValue, indices: &[usize]) -> Result<TensorValue> {
    match value {
        TensorValue::F32(t) => rows_typed(t, indices),
        TensorValue::I32(t) => rows_typed(t, indices),
        TensorValue::Bool(t) => rows_typed(t, indices),
    }
}
