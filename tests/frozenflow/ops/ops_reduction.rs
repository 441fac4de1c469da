use anyhow::Result;
use frozenflow::{DType, Graph, GraphExecutor, Node, TensorValue};

use crate::common::{const_node, f32_data, feeds, float, i32_data, int, output, placeholder};

fn reduce_graph(op: &str, axis: TensorValue, keep_dims: bool) -> Result<GraphExecutor> {
    let graph = Graph::new(
        vec![
            placeholder("x", DType::Float32),
            const_node("axis", axis),
            Node::new("reduce", op)
                .with_inputs(["x", "axis"])
                .with_attr("keep_dims", keep_dims),
        ],
        vec!["reduce".into()],
    )?;
    Ok(GraphExecutor::new(graph))
}

fn matrix() -> TensorValue {
    float(vec![1.0, 5.0, 3.0, 4.0, 2.0, 6.0], vec![2, 3])
}

#[test]
fn reductions_over_one_axis() -> Result<()> {
    for (op, expected) in [
        ("Sum", vec![9.0, 12.0]),
        ("Mean", vec![3.0, 4.0]),
        ("Max", vec![5.0, 6.0]),
        ("Min", vec![1.0, 2.0]),
        ("Prod", vec![15.0, 48.0]),
    ] {
        let executor = reduce_graph(op, int(vec![-1], vec![1]), false)?;
        let result = executor.execute(feeds([("x", matrix())]), &[])?;
        let out = output(&result, "reduce")?;
        assert_eq!(out.shape(), &[2], "{}", op);
        assert_eq!(f32_data(out)?, expected, "{}", op);
    }
    Ok(())
}

#[test]
fn keep_dims_and_full_reductions() -> Result<()> {
    let executor = reduce_graph("Sum", int(vec![0], vec![1]), true)?;
    let result = executor.execute(feeds([("x", matrix())]), &[])?;
    let out = output(&result, "reduce")?;
    assert_eq!(out.shape(), &[1, 3]);
    assert_eq!(f32_data(out)?, vec![5.0, 7.0, 9.0]);

    let executor = reduce_graph("Max", int(vec![0, 1], vec![2]), false)?;
    let result = executor.execute(feeds([("x", matrix())]), &[])?;
    assert_eq!(output(&result, "reduce")?, &TensorValue::from(6.0f32));
    Ok(())
}

#[test]
fn arg_reductions_return_positions() -> Result<()> {
    let graph = Graph::new(
        vec![
            placeholder("x", DType::Float32),
            const_node("axis", TensorValue::from(1i32)),
            Node::new("arg_max", "ArgMax").with_inputs(["x", "axis"]),
            Node::new("arg_min", "ArgMin").with_inputs(["x", "axis"]),
        ],
        vec!["arg_max".into(), "arg_min".into()],
    )?;
    let result = GraphExecutor::new(graph).execute(feeds([("x", matrix())]), &[])?;
    assert_eq!(i32_data(output(&result, "arg_max")?)?, vec![1, 2]);
    assert_eq!(i32_data(output(&result, "arg_min")?)?, vec![0, 1]);
    Ok(())
}

#[test]
fn out_of_range_axis_is_rejected() -> Result<()> {
    let executor = reduce_graph("Sum", int(vec![2], vec![1]), false)?;
    let err = executor.execute(feeds([("x", matrix())]), &[]).unwrap_err();
    assert!(format!("{:#}", err).contains("out of range"));
    Ok(())
}
