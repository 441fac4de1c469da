use std::marker::PhantomData;

use anyhow::{anyhow, Result};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::tensor::{numel, Tensor, TensorOptions};

/// Seeded uniform tensor generator.
pub struct Random<T> {
    rng: StdRng,
    _marker: PhantomData<T>,
}

impl<T> Random<T>
where
    T: RandomValue,
{
    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            _marker: PhantomData,
        }
    }

    /// Entropy-seeded generator.
    pub fn from_entropy() -> Self {
        Self {
            rng: StdRng::from_entropy(),
            _marker: PhantomData,
        }
    }

    pub fn generate_with_seed(seed: u64, range: (T, T), len: usize) -> Result<Tensor<T>> {
        Self::generate_with_seed_opts(seed, range, len, TensorOptions::default())
    }

    pub fn generate_with_seed_opts(
        seed: u64,
        range: (T, T),
        len: usize,
        opts: TensorOptions,
    ) -> Result<Tensor<T>> {
        let mut rng = StdRng::seed_from_u64(seed);
        generate_with_rng::<T>(&mut rng, range, len, opts)
    }

    pub fn next(&mut self, range: (T, T), len: usize) -> Result<Tensor<T>> {
        self.next_with_opts(range, len, TensorOptions::default())
    }

    pub fn next_with_opts(
        &mut self,
        range: (T, T),
        len: usize,
        opts: TensorOptions,
    ) -> Result<Tensor<T>> {
        generate_with_rng::<T>(&mut self.rng, range, len, opts)
    }
}

fn generate_with_rng<T: RandomValue>(
    rng: &mut StdRng,
    range: (T, T),
    len: usize,
    opts: TensorOptions,
) -> Result<Tensor<T>> {
    let shape = match opts.shape {
        Some(shape) => {
            let expected = numel(&shape);
            if expected != len {
                return Err(anyhow!(
                    "random tensor shape {:?} expects {} values, got {}",
                    shape,
                    expected,
                    len
                ));
            }
            shape
        }
        None => vec![len],
    };
    let mut data = Vec::with_capacity(len);
    for _ in 0..len {
        data.push(T::sample(rng, range)?);
    }
    Tensor::with_shape(data, shape)
}

pub trait RandomValue: Sized + Copy {
    fn sample(rng: &mut StdRng, range: (Self, Self)) -> Result<Self>;
}

impl RandomValue for f32 {
    fn sample(rng: &mut StdRng, range: (Self, Self)) -> Result<Self> {
        if range.0.is_nan() || range.1.is_nan() || range.0 >= range.1 {
            return Err(anyhow!("empty random range {}..{}", range.0, range.1));
        }
        Ok(rng.gen_range(range.0..range.1))
    }
}

impl RandomValue for i32 {
    fn sample(rng: &mut StdRng, range: (Self, Self)) -> Result<Self> {
        if range.0 >= range.1 {
            return Err(anyhow!("empty random range {}..{}", range.0, range.1));
        }
        Ok(rng.gen_range(range.0..range.1))
    }
}
