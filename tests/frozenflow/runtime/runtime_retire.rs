use anyhow::Result;
use frozenflow::{DType, Graph, GraphExecutor, Node, TensorValue};

use crate::common::{
    const_node, f32_data, feeds, float, invariant_step_loop, output, placeholder,
};

/// `d = sqrt(abs(-x * w))`, also returning `a = -x`.
fn scaled_chain() -> Result<Graph> {
    Graph::new(
        vec![
            placeholder("x", DType::Float32),
            const_node("w", float(vec![4.0, 4.0], vec![2])),
            Node::new("a", "Neg").with_inputs(["x"]),
            Node::new("b", "Mul").with_inputs(["a", "w"]),
            Node::new("c", "Abs").with_inputs(["b"]),
            Node::new("d", "Sqrt").with_inputs(["c"]),
        ],
        vec!["d".into(), "a".into()],
    )
}

#[test]
fn intermediates_are_dropped_after_their_last_consumer() -> Result<()> {
    let executor = GraphExecutor::new(scaled_chain()?);
    let (result, events) =
        executor.execute_traced(feeds([("x", float(vec![1.0, 4.0], vec![2]))]), &[])?;
    assert_eq!(f32_data(output(&result, "d")?)?, vec![2.0, 4.0]);
    assert_eq!(f32_data(output(&result, "a")?)?, vec![-1.0, -4.0]);

    let nodes: Vec<&str> = events.iter().map(|event| event.node.as_str()).collect();
    assert_eq!(nodes, ["a", "b", "c", "d"]);
    let retired: Vec<Vec<String>> = events.iter().map(|event| event.retired.clone()).collect();
    assert_eq!(
        retired,
        vec![vec![], vec![], vec!["b".to_string()], vec!["c".to_string()]]
    );
    // The feed `x`, the weight `w` and the requested output `a` stay live.
    let live: Vec<usize> = events.iter().map(|event| event.live_values).collect();
    assert_eq!(live, [3, 4, 4, 4]);
    Ok(())
}

#[test]
fn loop_values_are_retired_per_iteration() -> Result<()> {
    let executor = GraphExecutor::new(invariant_step_loop()?);
    let (result, events) =
        executor.execute_traced(feeds([("limit", TensorValue::from(3i32))]), &[])?;
    assert_eq!(output(&result, "exit_i")?, &TensorValue::from(3i32));

    let bodies: Vec<_> = events.iter().filter(|event| event.node == "body").collect();
    assert_eq!(bodies.len(), 3);
    for body in bodies {
        assert_eq!(body.retired, ["step"], "in {}", body.context);
    }
    Ok(())
}

#[test]
fn values_read_from_an_outer_context_outlive_the_loop_body() -> Result<()> {
    // `scale` lives in the root context and is read directly by every
    // iteration of the loop body.
    let frame = |node: Node| node.with_attr("frame_name", "scaled");
    let graph = Graph::new(
        vec![
            const_node("start", TensorValue::from(0i32)),
            const_node("one", TensorValue::from(1i32)),
            placeholder("limit", DType::Int32),
            Node::new("scale", "Square").with_inputs(["one"]),
            frame(Node::new("enter_i", "Enter").with_inputs(["start"])),
            frame(Node::new("enter_limit", "Enter").with_inputs(["limit"]))
                .with_attr("is_constant", true),
            Node::new("merge_i", "Merge").with_inputs(["enter_i", "next_i"]),
            Node::new("less", "Less").with_inputs(["merge_i", "enter_limit"]),
            Node::new("cond", "LoopCond").with_inputs(["less"]),
            Node::new("switch_i", "Switch").with_inputs(["merge_i", "cond"]),
            Node::new("body", "AddV2").with_inputs(["switch_i:1", "scale"]),
            Node::new("next_i", "NextIteration").with_inputs(["body"]),
            Node::new("exit_i", "Exit").with_inputs(["switch_i"]),
        ],
        vec!["exit_i".into()],
    )?;
    let executor = GraphExecutor::new(graph);
    let (result, events) =
        executor.execute_traced(feeds([("limit", TensorValue::from(3i32))]), &[])?;
    assert_eq!(output(&result, "exit_i")?, &TensorValue::from(3i32));
    assert!(events.iter().all(|event| event.retired.is_empty()));
    Ok(())
}
