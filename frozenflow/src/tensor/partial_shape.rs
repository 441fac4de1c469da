use std::fmt;

use serde::{Deserialize, Serialize};

/// Shape whose dimensions may be unknown.
///
/// Unknown dimensions are written as `-1` in graph attributes and match any
/// concrete size.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct PartialShape(Vec<Option<usize>>);

impl PartialShape {
    pub fn new(dims: Vec<Option<usize>>) -> Self {
        Self(dims)
    }

    /// Build from signed dims; negative values become wildcards.
    pub fn from_dims(dims: &[i64]) -> Self {
        Self(
            dims.iter()
                .map(|dim| usize::try_from(*dim).ok())
                .collect(),
        )
    }

    pub fn dims(&self) -> &[Option<usize>] {
        &self.0
    }

    pub fn rank(&self) -> usize {
        self.0.len()
    }

    pub fn is_fully_defined(&self) -> bool {
        self.0.iter().all(Option::is_some)
    }

    /// Position-wise comparison where a wildcard on either side matches.
    pub fn is_compatible_with(&self, other: &PartialShape) -> bool {
        self.0.len() == other.0.len()
            && self
                .0
                .iter()
                .zip(other.0.iter())
                .all(|(a, b)| match (a, b) {
                    (Some(a), Some(b)) => a == b,
                    _ => true,
                })
    }

    pub fn matches(&self, shape: &[usize]) -> bool {
        self.is_compatible_with(&PartialShape::from(shape))
    }

    /// Concrete dims with wildcards resolved to `fill`.
    pub fn to_concrete(&self, fill: usize) -> Vec<usize> {
        self.0.iter().map(|dim| dim.unwrap_or(fill)).collect()
    }
}

impl From<&[usize]> for PartialShape {
    fn from(shape: &[usize]) -> Self {
        Self(shape.iter().copied().map(Some).collect())
    }
}

impl From<Vec<usize>> for PartialShape {
    fn from(shape: Vec<usize>) -> Self {
        Self(shape.into_iter().map(Some).collect())
    }
}

impl fmt::Display for PartialShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let dims = self
            .0
            .iter()
            .map(|dim| match dim {
                Some(dim) => dim.to_string(),
                None => "-1".to_string(),
            })
            .collect::<Vec<_>>()
            .join(",");
        write!(f, "[{}]", dims)
    }
}
