use std::ops::{Add, Mul};

use anyhow::{anyhow, Result};

use crate::tensor::Tensor;

fn matrix_dims(shape: &[usize], transpose: bool, which: &str) -> Result<(usize, usize)> {
    match shape {
        [rows, cols] if transpose => Ok((*cols, *rows)),
        [rows, cols] => Ok((*rows, *cols)),
        _ => Err(anyhow!("matmul expects 2D {}, got {:?}", which, shape)),
    }
}

/// Plain 2D matmul with optional transposed operands.
pub fn matmul<T>(a: &Tensor<T>, b: &Tensor<T>, transpose_a: bool, transpose_b: bool) -> Result<Tensor<T>>
where
    T: Copy + Default + Add<Output = T> + Mul<Output = T>,
{
    let (m, k) = matrix_dims(a.shape(), transpose_a, "lhs")?;
    let (k2, n) = matrix_dims(b.shape(), transpose_b, "rhs")?;
    if k != k2 {
        return Err(anyhow!(
            "matmul inner dims must match, got {:?} and {:?}",
            a.shape(),
            b.shape()
        ));
    }
    let a_at = |i: usize, p: usize| {
        if transpose_a {
            a.data[p * m + i]
        } else {
            a.data[i * k + p]
        }
    };
    let b_at = |p: usize, j: usize| {
        if transpose_b {
            b.data[j * k + p]
        } else {
            b.data[p * n + j]
        }
    };
    let mut data = Vec::with_capacity(m * n);
    for i in 0..m {
        for j in 0..n {
            let mut acc = T::default();
            for p in 0..k {
                acc = acc + a_at(i, p) * b_at(p, j);
            }
            data.push(acc);
        }
    }
    Tensor::with_shape(data, vec![m, n])
}
