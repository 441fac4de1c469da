use anyhow::Result;

use crate::tensor::{compute_strides, linear_to_indices, numel, Tensor};

/// Shape left after reducing `shape` over `axes`.
pub fn reduced_shape(shape: &[usize], axes: &[usize], keep_dims: bool) -> Vec<usize> {
    shape
        .iter()
        .enumerate()
        .filter_map(|(i, dim)| match (axes.contains(&i), keep_dims) {
            (false, _) => Some(*dim),
            (true, true) => Some(1),
            (true, false) => None,
        })
        .collect()
}

/// Fold every element of `input` into the output slot it reduces to. `fold`
/// also receives the element's coordinates in `input`.
pub fn reduce<T: Copy, A: Clone>(
    input: &Tensor<T>,
    axes: &[usize],
    keep_dims: bool,
    init: A,
    mut fold: impl FnMut(A, T, &[usize]) -> A,
) -> Result<Tensor<A>> {
    let shape = input.shape();
    let kept: Vec<usize> = reduced_shape(shape, axes, true);
    let strides = compute_strides(&kept);
    let mut out = vec![init; numel(&kept)];
    for (linear, value) in input.data.iter().enumerate() {
        let index = linear_to_indices(linear, shape);
        let offset: usize = index
            .iter()
            .enumerate()
            .filter(|(axis, _)| !axes.contains(axis))
            .map(|(axis, coord)| coord * strides[axis])
            .sum();
        out[offset] = fold(out[offset].clone(), *value, &index);
    }
    Tensor::with_shape(out, reduced_shape(shape, axes, keep_dims))
}
