#![allow(dead_code)]

use std::sync::{Mutex, MutexGuard, OnceLock};

use anyhow::{anyhow, Result};
use frozenflow::{AttrValue, DType, Graph, NamedTensorMap, Node, TensorValue};

static TEST_LOCK: OnceLock<Mutex<()>> = OnceLock::new();

/// Serialise tests that touch the process-wide custom op registry.
pub fn registry_lock() -> MutexGuard<'static, ()> {
    TEST_LOCK
        .get_or_init(|| Mutex::new(()))
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
}

pub fn int(data: Vec<i32>, shape: Vec<usize>) -> TensorValue {
    TensorValue::from_i32(data, shape).expect("valid int32 tensor")
}

pub fn float(data: Vec<f32>, shape: Vec<usize>) -> TensorValue {
    TensorValue::from_f32(data, shape).expect("valid float32 tensor")
}

pub fn const_node(name: &str, value: TensorValue) -> Node {
    Node::new(name, "Const").with_attr("value", value)
}

pub fn placeholder(name: &str, dtype: DType) -> Node {
    Node::new(name, "Placeholder").with_attr("dtype", dtype)
}

pub fn fifo_queue(name: &str, dtypes: Vec<DType>, shapes: Vec<Vec<i64>>, capacity: i64) -> Node {
    Node::new(name, "FIFOQueueV2")
        .with_attr("component_types", AttrValue::DTypeList(dtypes))
        .with_attr("shapes", AttrValue::ShapeList(shapes))
        .with_attr("capacity", capacity)
}

pub fn feeds<const N: usize>(entries: [(&str, TensorValue); N]) -> NamedTensorMap {
    entries
        .into_iter()
        .map(|(name, value)| (name.to_string(), value))
        .collect()
}

pub fn i32_data(value: &TensorValue) -> Result<Vec<i32>> {
    value
        .as_i32()
        .map(|tensor| tensor.data.clone())
        .ok_or_else(|| anyhow!("expected int32 tensor, got {}", value.dtype()))
}

pub fn f32_data(value: &TensorValue) -> Result<Vec<f32>> {
    value
        .as_f32()
        .map(|tensor| tensor.data.clone())
        .ok_or_else(|| anyhow!("expected float32 tensor, got {}", value.dtype()))
}

pub fn output<'a>(outputs: &'a NamedTensorMap, name: &str) -> Result<&'a TensorValue> {
    outputs
        .get(name)
        .ok_or_else(|| anyhow!("output {} missing from result", name))
}

/// `counter = 0; while counter < limit { counter += 1 }` with `limit` fed.
pub fn counting_loop() -> Result<Graph> {
    let loop_attrs = |node: Node| node.with_attr("frame_name", "counting");
    Graph::new(
        vec![
            const_node("start", TensorValue::from(0i32)),
            const_node("one", TensorValue::from(1i32)),
            placeholder("limit", DType::Int32),
            loop_attrs(Node::new("enter_i", "Enter").with_inputs(["start"])),
            loop_attrs(Node::new("enter_limit", "Enter").with_inputs(["limit"]))
                .with_attr("is_constant", true),
            loop_attrs(Node::new("enter_one", "Enter").with_inputs(["one"]))
                .with_attr("is_constant", true),
            Node::new("merge_i", "Merge").with_inputs(["enter_i", "next_i"]),
            Node::new("less", "Less").with_inputs(["merge_i", "enter_limit"]),
            Node::new("cond", "LoopCond").with_inputs(["less"]),
            Node::new("switch_i", "Switch").with_inputs(["merge_i", "cond"]),
            Node::new("body", "AddV2").with_inputs(["switch_i:1", "enter_one"]),
            Node::new("next_i", "NextIteration").with_inputs(["body"]),
            Node::new("exit_i", "Exit").with_inputs(["switch_i"]),
        ],
        vec!["exit_i".into()],
    )
}

/// Like `counting_loop`, but the step is computed inside the frame from a
/// loop-invariant value: `counter += one * one`.
pub fn invariant_step_loop() -> Result<Graph> {
    let loop_attrs = |node: Node| node.with_attr("frame_name", "counting");
    Graph::new(
        vec![
            const_node("start", TensorValue::from(0i32)),
            const_node("one", TensorValue::from(1i32)),
            placeholder("limit", DType::Int32),
            loop_attrs(Node::new("enter_i", "Enter").with_inputs(["start"])),
            loop_attrs(Node::new("enter_limit", "Enter").with_inputs(["limit"]))
                .with_attr("is_constant", true),
            loop_attrs(Node::new("enter_one", "Enter").with_inputs(["one"]))
                .with_attr("is_constant", true),
            Node::new("merge_i", "Merge").with_inputs(["enter_i", "next_i"]),
            Node::new("less", "Less").with_inputs(["merge_i", "enter_limit"]),
            Node::new("cond", "LoopCond").with_inputs(["less"]),
            Node::new("switch_i", "Switch").with_inputs(["merge_i", "cond"]),
            Node::new("step", "Mul").with_inputs(["enter_one", "enter_one"]),
            Node::new("body", "AddV2").with_inputs(["switch_i:1", "step"]),
            Node::new("next_i", "NextIteration").with_inputs(["body"]),
            Node::new("exit_i", "Exit").with_inputs(["switch_i"]),
        ],
        vec!["exit_i".into()],
    )
}
