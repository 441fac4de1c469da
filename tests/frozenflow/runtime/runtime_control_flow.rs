use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use anyhow::Result;
use frozenflow::{
    CustomOpRegistry, DType, ExecutorError, Graph, GraphExecutor, Node, TensorValue,
};

use crate::common::{
    counting_loop, f32_data, feeds, float, i32_data, invariant_step_loop, output, placeholder,
};

/// `pred ? -x : tally(x)` where `tally` counts its invocations.
fn conditional(calls: Arc<AtomicUsize>) -> Result<GraphExecutor> {
    let registry = Arc::new(CustomOpRegistry::new());
    registry.register_op("Tally", move |node| {
        calls.fetch_add(1, Ordering::SeqCst);
        Ok(vec![node.input(0)?.clone()])
    });
    let graph = Graph::new(
        vec![
            placeholder("x", DType::Float32),
            placeholder("pred", DType::Bool),
            Node::new("switch", "Switch").with_inputs(["x", "pred"]),
            Node::new("tally", "Tally").with_inputs(["switch:0"]),
            Node::new("neg", "Neg").with_inputs(["switch:1"]),
            Node::new("merge", "Merge").with_inputs(["tally", "neg"]),
        ],
        vec!["merge".into()],
    )?;
    Ok(GraphExecutor::with_registry(graph, registry))
}

#[test]
fn untaken_branch_never_runs() -> Result<()> {
    let calls = Arc::new(AtomicUsize::new(0));
    let executor = conditional(calls.clone())?;

    let result = executor.execute(
        feeds([("x", float(vec![1.5, -2.0], vec![2])), ("pred", TensorValue::from(true))]),
        &["merge", "merge:1"],
    )?;
    assert_eq!(f32_data(output(&result, "merge")?)?, vec![-1.5, 2.0]);
    assert_eq!(output(&result, "merge:1")?, &TensorValue::from(1i32));
    assert_eq!(calls.load(Ordering::SeqCst), 0);

    let result = executor.execute(
        feeds([("x", float(vec![1.5, -2.0], vec![2])), ("pred", TensorValue::from(false))]),
        &["merge", "merge:1"],
    )?;
    assert_eq!(f32_data(output(&result, "merge")?)?, vec![1.5, -2.0]);
    assert_eq!(output(&result, "merge:1")?, &TensorValue::from(0i32));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    Ok(())
}

#[test]
fn outputs_of_skipped_nodes_are_missing() -> Result<()> {
    let executor = conditional(Arc::new(AtomicUsize::new(0)))?;
    let err = executor
        .execute(
            feeds([("x", float(vec![1.0], vec![1])), ("pred", TensorValue::from(false))]),
            &["merge", "neg"],
        )
        .unwrap_err();
    assert_eq!(
        err.downcast_ref::<ExecutorError>(),
        Some(&ExecutorError::MissingOutput { name: "neg".into() })
    );
    Ok(())
}

#[test]
fn loop_iterates_until_condition_fails() -> Result<()> {
    let executor = GraphExecutor::new(counting_loop()?);
    for limit in [0i32, 1, 5] {
        let result = executor.execute(feeds([("limit", TensorValue::from(limit))]), &[])?;
        assert_eq!(output(&result, "exit_i")?, &TensorValue::from(limit));
    }
    Ok(())
}

#[test]
fn loop_body_runs_once_per_iteration() -> Result<()> {
    let executor = GraphExecutor::new(counting_loop()?);
    let (result, events) =
        executor.execute_traced(feeds([("limit", TensorValue::from(3i32))]), &["exit_i"])?;
    assert_eq!(output(&result, "exit_i")?, &TensorValue::from(3i32));

    let body: Vec<&str> = events
        .iter()
        .filter(|event| event.node == "body")
        .map(|event| event.context.as_str())
        .collect();
    assert_eq!(body, ["/counting-0", "/counting-1", "/counting-2"]);
    let merges = events.iter().filter(|event| event.node == "merge_i").count();
    assert_eq!(merges, 4);
    let exit = events.iter().find(|event| event.node == "exit_i").expect("exit ran");
    assert_eq!(exit.context, "/counting-3");
    Ok(())
}

#[test]
fn loop_invariant_values_are_recomputed_each_iteration() -> Result<()> {
    let executor = GraphExecutor::new(invariant_step_loop()?);
    for limit in [0i32, 1, 3] {
        let (result, events) =
            executor.execute_traced(feeds([("limit", TensorValue::from(limit))]), &[])?;
        assert_eq!(output(&result, "exit_i")?, &TensorValue::from(limit));
        let bodies = events.iter().filter(|event| event.node == "body").count();
        assert_eq!(bodies, limit as usize);
    }

    let (_, events) = executor.execute_traced(feeds([("limit", TensorValue::from(3i32))]), &[])?;
    let steps: Vec<&str> = events
        .iter()
        .filter(|event| event.node == "step")
        .map(|event| event.context.as_str())
        .collect();
    for context in ["/counting-0", "/counting-1", "/counting-2"] {
        assert!(steps.contains(&context), "step did not run in {}", context);
    }
    Ok(())
}

#[test]
fn loop_accumulates_across_iterations() -> Result<()> {
    // acc = 0; i = 0; while i < n { acc += i * i; i += 1 }
    let frame = |node: Node| node.with_attr("frame_name", "squares");
    let constant = |node: Node| frame(node).with_attr("is_constant", true);
    let graph = Graph::new(
        vec![
            placeholder("n", DType::Int32),
            crate::common::const_node("zero", TensorValue::from(0i32)),
            crate::common::const_node("one", TensorValue::from(1i32)),
            frame(Node::new("enter_i", "Enter").with_inputs(["zero"])),
            frame(Node::new("enter_acc", "Enter").with_inputs(["zero"])),
            constant(Node::new("enter_n", "Enter").with_inputs(["n"])),
            constant(Node::new("enter_one", "Enter").with_inputs(["one"])),
            Node::new("merge_i", "Merge").with_inputs(["enter_i", "next_i"]),
            Node::new("merge_acc", "Merge").with_inputs(["enter_acc", "next_acc"]),
            Node::new("less", "Less").with_inputs(["merge_i", "enter_n"]),
            Node::new("cond", "LoopCond").with_inputs(["less"]),
            Node::new("switch_i", "Switch").with_inputs(["merge_i", "cond"]),
            Node::new("switch_acc", "Switch").with_inputs(["merge_acc", "cond"]),
            Node::new("square", "Mul").with_inputs(["switch_i:1", "switch_i:1"]),
            Node::new("add_acc", "AddV2").with_inputs(["switch_acc:1", "square"]),
            Node::new("add_i", "AddV2").with_inputs(["switch_i:1", "enter_one"]),
            Node::new("next_i", "NextIteration").with_inputs(["add_i"]),
            Node::new("next_acc", "NextIteration").with_inputs(["add_acc"]),
            Node::new("exit_acc", "Exit").with_inputs(["switch_acc"]),
        ],
        vec!["exit_acc".into()],
    )?;
    let executor = GraphExecutor::new(graph);
    let result = executor.execute(feeds([("n", TensorValue::from(4i32))]), &[])?;
    assert_eq!(i32_data(output(&result, "exit_acc")?)?, vec![14]);
    Ok(())
}
