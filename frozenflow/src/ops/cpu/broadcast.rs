use crate::tensor::compute_strides;

/// Strides of `shape` aligned to `out_rank`, zeroed on broadcast dims.
pub fn broadcast_strides(shape: &[usize], out_rank: usize) -> Vec<usize> {
    let strides = compute_strides(shape);
    let mut out = vec![0usize; out_rank];
    let offset = out_rank.saturating_sub(shape.len());
    for (i, slot) in out.iter_mut().enumerate().skip(offset) {
        let src_i = i - offset;
        *slot = if shape[src_i] == 1 { 0 } else { strides[src_i] };
    }
    out
}

/// Visit every output coordinate in row-major order, passing the matching
/// flat offsets into both inputs.
pub fn for_each_broadcast_index(
    out_shape: &[usize],
    a_strides: &[usize],
    b_strides: &[usize],
    mut f: impl FnMut(usize, usize),
) {
    if out_shape.is_empty() {
        f(0, 0);
        return;
    }
    let total = out_shape.iter().copied().product::<usize>();
    let mut index = vec![0usize; out_shape.len()];
    for _ in 0..total {
        f(linear_offset(&index, a_strides), linear_offset(&index, b_strides));
        bump_index(&mut index, out_shape);
    }
}

fn linear_offset(indices: &[usize], strides: &[usize]) -> usize {
    indices
        .iter()
        .zip(strides.iter())
        .map(|(i, s)| i.saturating_mul(*s))
        .sum()
}

fn bump_index(index: &mut [usize], shape: &[usize]) {
    for (i, dim) in shape.iter().enumerate().rev() {
        index[i] += 1;
        if index[i] < *dim {
            return;
        }
        index[i] = 0;
    }
}
