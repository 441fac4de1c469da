//! Built-in op executors, grouped by mapper category.
//!
//! Each category module exposes its mapper descriptors (`mappers`) next to
//! the executor that interprets them.
use anyhow::{anyhow, Result};

use crate::registry::{Category, NodeValue, OpMapper};
use crate::runtime::ResourceManager;
use crate::tensor::TensorValue;

mod arithmetic;
mod basic_math;
mod control;
pub(crate) mod cpu;
mod creation;
mod graph;
mod logical;
mod matrices;
mod normalization;
mod reduction;
mod slice_join;
mod transformation;

/// Frame transition requested by a control-flow op.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum FrameEffect {
    Enter { frame: String, is_constant: bool },
    Exit,
    NextIteration,
}

/// Result of executing one node.
#[derive(Debug, Clone, Default)]
pub(crate) struct OpOutcome {
    /// One slot per output; `None` marks a dead output (untaken branch).
    pub outputs: Vec<Option<TensorValue>>,
    pub effect: Option<FrameEffect>,
}

impl OpOutcome {
    pub fn values(values: Vec<TensorValue>) -> Self {
        Self {
            outputs: values.into_iter().map(Some).collect(),
            effect: None,
        }
    }

    pub fn single(value: TensorValue) -> Self {
        Self::values(vec![value])
    }

    pub fn slots(outputs: Vec<Option<TensorValue>>) -> Self {
        Self {
            outputs,
            effect: None,
        }
    }

    pub fn with_effect(mut self, effect: FrameEffect) -> Self {
        self.effect = Some(effect);
        self
    }
}

pub(crate) fn mappers() -> Vec<OpMapper> {
    let mut all = Vec::new();
    all.extend(arithmetic::mappers());
    all.extend(basic_math::mappers());
    all.extend(control::mappers());
    all.extend(creation::mappers());
    all.extend(graph::mappers());
    all.extend(logical::mappers());
    all.extend(matrices::mappers());
    all.extend(normalization::mappers());
    all.extend(reduction::mappers());
    all.extend(slice_join::mappers());
    all.extend(transformation::mappers());
    all
}

/// Run `node` with its resolved mapper. Custom executors take precedence
/// over the category dispatch.
pub(crate) fn execute(node: &NodeValue<'_>, resources: &mut ResourceManager) -> Result<OpOutcome> {
    let mapper = node.mapper();
    if let Some(executor) = &mapper.custom_executor {
        return executor(node).map(OpOutcome::values);
    }
    match mapper.category {
        Category::Arithmetic => arithmetic::execute(node).map(OpOutcome::single),
        Category::BasicMath => basic_math::execute(node).map(OpOutcome::single),
        Category::Control => control::execute(node, resources),
        Category::Creation => creation::execute(node).map(OpOutcome::single),
        Category::Graph => graph::execute(node),
        Category::Logical => logical::execute(node).map(OpOutcome::single),
        Category::Matrices => matrices::execute(node).map(OpOutcome::single),
        Category::Normalization => normalization::execute(node).map(OpOutcome::single),
        Category::Reduction => reduction::execute(node).map(OpOutcome::single),
        Category::SliceJoin => slice_join::execute(node).map(OpOutcome::values),
        Category::Transformation => transformation::execute(node).map(OpOutcome::single),
        Category::Custom => Err(anyhow!("custom op {} has no executor", node.op())),
    }
}

fn unsupported(node: &NodeValue<'_>, category: Category) -> anyhow::Error {
    anyhow!("op {} is not implemented for category {}", node.op(), category)
}

/// Normalise a possibly negative axis against `rank`.
fn normalize_axis(axis: f64, rank: usize) -> Result<usize> {
    let axis = axis as i64;
    let resolved = if axis < 0 { axis + rank as i64 } else { axis };
    if resolved < 0 || resolved >= rank as i64 {
        return Err(anyhow!("axis {} out of range for rank {}", axis, rank));
    }
    Ok(resolved as usize)
}

fn to_dims(values: &[f64]) -> Result<Vec<usize>> {
    values
        .iter()
        .map(|v| {
            if *v < 0.0 {
                Err(anyhow!("negative dimension {}", v))
            } else {
                Ok(*v as usize)
            }
        })
        .collect()
}
