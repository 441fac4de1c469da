use anyhow::{anyhow, Result};

pub fn numel(shape: &[usize]) -> usize {
    shape.iter().copied().product::<usize>()
}

pub fn compute_strides(shape: &[usize]) -> Vec<usize> {
    let mut strides = vec![0; shape.len()];
    let mut stride = 1usize;
    for (idx, dim) in shape.iter().rev().enumerate() {
        let i = shape.len() - 1 - idx;
        strides[i] = stride;
        stride = stride.saturating_mul(*dim);
    }
    strides
}

pub fn linear_to_indices(linear: usize, shape: &[usize]) -> Vec<usize> {
    if shape.is_empty() {
        return Vec::new();
    }
    let mut rem = linear;
    let mut out = Vec::with_capacity(shape.len());
    let strides = compute_strides(shape);
    for (dim, stride) in shape.iter().zip(strides.iter()) {
        if *stride == 0 || *dim == 0 {
            out.push(0);
        } else {
            let coord = rem / *stride;
            rem %= *stride;
            out.push(coord);
        }
    }
    out
}

/// Numpy-style broadcast of two shapes.
pub fn broadcast_shapes(a: &[usize], b: &[usize]) -> Result<Vec<usize>> {
    let out_rank = a.len().max(b.len());
    let mut out = vec![1usize; out_rank];
    for (i, slot) in out.iter_mut().enumerate() {
        let a_dim = dim_from_right(a, out_rank, i);
        let b_dim = dim_from_right(b, out_rank, i);
        if a_dim == b_dim || a_dim == 1 || b_dim == 1 {
            *slot = if a_dim == 1 { b_dim } else { a_dim };
        } else {
            return Err(anyhow!(
                "incompatible broadcast shapes {:?} and {:?}",
                a,
                b
            ));
        }
    }
    Ok(out)
}

fn dim_from_right(shape: &[usize], out_rank: usize, idx: usize) -> usize {
    let offset = out_rank.saturating_sub(shape.len());
    if idx < offset {
        1
    } else {
        shape[idx - offset]
    }
}
