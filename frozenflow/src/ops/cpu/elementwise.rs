use anyhow::{anyhow, Result};

use super::broadcast::{broadcast_strides, for_each_broadcast_index};
use crate::tensor::{broadcast_shapes, numel, Tensor};

pub fn binary_broadcast<T: Copy, U>(
    a: &Tensor<T>,
    b: &Tensor<T>,
    mut f: impl FnMut(T, T) -> U,
) -> Result<Tensor<U>> {
    let out_shape = broadcast_shapes(a.shape(), b.shape())?;
    let a_strides = broadcast_strides(a.shape(), out_shape.len());
    let b_strides = broadcast_strides(b.shape(), out_shape.len());
    let mut data = Vec::with_capacity(numel(&out_shape));
    for_each_broadcast_index(&out_shape, &a_strides, &b_strides, |a_offset, b_offset| {
        data.push(f(a.data[a_offset], b.data[b_offset]));
    });
    Tensor::with_shape(data, out_shape)
}

/// Pick from `then` where `cond` is true, else from `otherwise`.
///
/// `cond` may match the value shape, be a scalar, or be a vector selecting
/// whole rows along the leading axis.
pub fn select<T: Clone>(
    cond: &Tensor<bool>,
    then: &Tensor<T>,
    otherwise: &Tensor<T>,
) -> Result<Tensor<T>> {
    if then.shape() != otherwise.shape() {
        return Err(anyhow!(
            "select branches differ in shape: {:?} vs {:?}",
            then.shape(),
            otherwise.shape()
        ));
    }
    let shape = then.shape().to_vec();
    let data = if cond.shape() == then.shape() {
        cond.data
            .iter()
            .zip(then.data.iter().zip(otherwise.data.iter()))
            .map(|(c, (t, e))| if *c { t.clone() } else { e.clone() })
            .collect()
    } else if cond.len() == 1 {
        if cond.data[0] {
            then.data.clone()
        } else {
            otherwise.data.clone()
        }
    } else if cond.rank() == 1 && shape.first() == Some(&cond.len()) {
        let row = numel(&shape[1..]);
        let mut data = Vec::with_capacity(then.len());
        for (r, c) in cond.data.iter().enumerate() {
            let src = if *c { then } else { otherwise };
            data.extend_from_slice(&src.data[r * row..(r + 1) * row]);
        }
        data
    } else {
        return Err(anyhow!(
            "select condition shape {:?} does not fit value shape {:?}",
            cond.shape(),
            shape
        ));
    };
    Tensor::with_shape(data, shape)
}
