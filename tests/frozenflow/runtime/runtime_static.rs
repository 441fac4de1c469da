use std::collections::HashMap;

use anyhow::Result;
use frozenflow::{
    DType, ExecutorConfig, ExecutorError, Graph, GraphExecutor, NamedTensorMap, Node, TensorValue,
};

use crate::common::{const_node, f32_data, feeds, float, i32_data, int, output, placeholder};

fn chain() -> Result<Graph> {
    Graph::new(
        vec![
            placeholder("x", DType::Float32),
            placeholder("y", DType::Float32),
            Node::new("neg", "Neg").with_inputs(["x"]),
            Node::new("sum", "Add").with_inputs(["neg", "neg"]),
            Node::new("other", "Square").with_inputs(["y"]),
        ],
        vec!["sum".into()],
    )
}

#[test]
fn executes_only_what_outputs_need() -> Result<()> {
    let executor = GraphExecutor::new(chain()?);
    let result = executor.execute(feeds([("x", float(vec![1.0, -2.0], vec![2]))]), &["sum"])?;
    assert_eq!(f32_data(output(&result, "sum")?)?, vec![-2.0, 4.0]);
    assert_eq!(result.len(), 1);
    Ok(())
}

#[test]
fn feeding_an_intermediate_skips_its_producers() -> Result<()> {
    let executor = GraphExecutor::new(chain()?);
    let result = executor.execute(feeds([("neg", float(vec![3.0], vec![1]))]), &["sum"])?;
    assert_eq!(f32_data(output(&result, "sum")?)?, vec![6.0]);
    Ok(())
}

#[test]
fn unfed_placeholders_are_reported() -> Result<()> {
    let executor = GraphExecutor::new(chain()?);
    let err = executor.execute(NamedTensorMap::new(), &["sum", "other"]).unwrap_err();
    assert_eq!(
        err.downcast_ref::<ExecutorError>(),
        Some(&ExecutorError::MissingInputs {
            names: vec!["x".into(), "y".into()],
        })
    );
    Ok(())
}

#[test]
fn unknown_outputs_are_reported() -> Result<()> {
    let executor = GraphExecutor::new(chain()?);
    let x = || feeds([("x", float(vec![1.0], vec![1]))]);
    let err = executor.execute(x(), &["missing"]).unwrap_err();
    assert_eq!(
        err.downcast_ref::<ExecutorError>(),
        Some(&ExecutorError::MissingOutput { name: "missing".into() })
    );
    let err = executor.execute(x(), &["sum:4"]).unwrap_err();
    assert_eq!(
        err.downcast_ref::<ExecutorError>(),
        Some(&ExecutorError::MissingOutput { name: "sum:4".into() })
    );
    Ok(())
}

#[test]
fn indexed_outputs_select_slots() -> Result<()> {
    let graph = Graph::new(
        vec![
            placeholder("m", DType::Int32),
            Node::new("rows", "Unpack").with_inputs(["m"]).with_attr("axis", 0i64),
            Node::new("total", "AddV2").with_inputs(["rows:0", "rows:1"]),
        ],
        vec![],
    )?;
    let executor = GraphExecutor::new(graph);
    let result = executor.execute(
        feeds([("m", int(vec![1, 2, 3, 4], vec![2, 2]))]),
        &["rows:1", "total"],
    )?;
    assert_eq!(i32_data(output(&result, "rows:1")?)?, vec![3, 4]);
    assert_eq!(i32_data(output(&result, "total")?)?, vec![4, 6]);
    Ok(())
}

#[test]
fn strict_inputs_reject_unknown_feeds() -> Result<()> {
    let inputs = || {
        feeds([
            ("x", float(vec![1.0], vec![1])),
            ("nowhere", float(vec![1.0], vec![1])),
        ])
    };
    let lenient = GraphExecutor::new(chain()?);
    assert!(lenient.execute(inputs(), &["sum"]).is_ok());

    let strict = GraphExecutor::new(chain()?)
        .with_config(ExecutorConfig::default().with_strict_inputs());
    let err = strict.execute(inputs(), &["sum"]).unwrap_err();
    assert_eq!(
        err.downcast_ref::<ExecutorError>(),
        Some(&ExecutorError::UnknownInput { name: "nowhere".into() })
    );
    Ok(())
}

#[test]
fn op_failures_name_the_node() -> Result<()> {
    let graph = Graph::new(
        vec![
            placeholder("a", DType::Int32),
            const_node("zero", TensorValue::from(0i32)),
            Node::new("bad", "FloorDiv").with_inputs(["a", "zero"]),
        ],
        vec![],
    )?;
    let executor = GraphExecutor::new(graph);
    let err = executor
        .execute(feeds([("a", TensorValue::from(4i32))]), &["bad"])
        .unwrap_err();
    assert!(format!("{:#}", err).contains("failed to execute node 'bad' (FloorDiv)"));
    Ok(())
}

#[test]
fn weights_can_be_replaced() -> Result<()> {
    let graph = Graph::new(
        vec![
            placeholder("x", DType::Int32),
            const_node("w", TensorValue::from(2i32)),
            Node::new("scaled", "Mul").with_inputs(["x", "w"]),
        ],
        vec![],
    )?;
    let mut executor = GraphExecutor::new(graph);
    let x = || feeds([("x", int(vec![1, 2], vec![2]))]);
    let result = executor.execute(x(), &[])?;
    assert_eq!(i32_data(output(&result, "scaled")?)?, vec![2, 4]);

    executor.set_weights(HashMap::from([("w".to_string(), vec![TensorValue::from(5i32)])]));
    let result = executor.execute(x(), &[])?;
    assert_eq!(i32_data(output(&result, "scaled")?)?, vec![5, 10]);
    Ok(())
}

#[test]
fn repeated_requests_are_independent() -> Result<()> {
    let executor = GraphExecutor::new(chain()?);
    for value in [1.0f32, 2.0, 3.0] {
        let result = executor.execute(feeds([("x", float(vec![value], vec![1]))]), &["sum"])?;
        assert_eq!(f32_data(output(&result, "sum")?)?, vec![-2.0 * value]);
    }
    let failed = executor.execute(NamedTensorMap::new(), &["sum"]);
    assert!(failed.is_err());
    let result = executor.execute(feeds([("x", float(vec![4.0], vec![1]))]), &["sum"])?;
    assert_eq!(f32_data(output(&result, "sum")?)?, vec![-8.0]);
    Ok(())
}
