/// Bind the typed tensor inside a `TensorValue` and evaluate `$body` for it.
macro_rules! with_tensor {
    ($value:expr, $t:ident => $body:expr) => {
        match $value {
            $crate::tensor::TensorValue::F32($t) => $body,
            $crate::tensor::TensorValue::I32($t) => $body,
            $crate::tensor::TensorValue::Bool($t) => $body,
        }
    };
}

/// Like `with_tensor!`, but `$body` yields a `Tensor` of the same element
/// type which is wrapped back into the matching variant.
macro_rules! map_tensor {
    ($value:expr, $t:ident => $body:expr) => {
        match $value {
            $crate::tensor::TensorValue::F32($t) => $crate::tensor::TensorValue::F32($body),
            $crate::tensor::TensorValue::I32($t) => $crate::tensor::TensorValue::I32($body),
            $crate::tensor::TensorValue::Bool($t) => $crate::tensor::TensorValue::Bool($body),
        }
    };
}

/// Fallible variant of `map_tensor!`; `$body` yields `Result<Tensor<_>>`.
macro_rules! try_map_tensor {
    ($value:expr, $t:ident => $body:expr) => {
        match $value {
            $crate::tensor::TensorValue::F32($t) => $crate::tensor::TensorValue::F32($body?),
            $crate::tensor::TensorValue::I32($t) => $crate::tensor::TensorValue::I32($body?),
            $crate::tensor::TensorValue::Bool($t) => $crate::tensor::TensorValue::Bool($body?),
        }
    };
}

pub(crate) use map_tensor;
pub(crate) use try_map_tensor;
pub(crate) use with_tensor;
