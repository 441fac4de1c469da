use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use anyhow::Result;
use frozenflow::{
    deregister_op, get_registered_op, register_op, Category, CustomOpRegistry, ExecutorError,
    Graph, GraphExecutor, NamedTensorMap, Node, TensorValue,
};

use crate::common::{i32_data, int, output, registry_lock};

fn my_op_graph() -> Result<Graph> {
    Graph::new(vec![Node::new("out", "MyOp")], vec![])
}

#[test]
fn registered_op_runs_until_deregistered() -> Result<()> {
    let _guard = registry_lock();
    register_op("MyOp", |_| Ok(vec![TensorValue::from(42i32)]));
    let mapper = get_registered_op("MyOp").expect("MyOp registered");
    assert_eq!(mapper.category, Category::Custom);
    assert!(mapper.inputs.is_empty() && mapper.attrs.is_empty());

    let executor = GraphExecutor::new(my_op_graph()?);
    let result = executor.execute(NamedTensorMap::new(), &["out"])?;
    assert_eq!(output(&result, "out")?, &TensorValue::from(42i32));

    deregister_op("MyOp");
    assert!(get_registered_op("MyOp").is_none());
    let err = executor.execute(NamedTensorMap::new(), &["out"]).unwrap_err();
    assert_eq!(
        err.downcast_ref::<ExecutorError>(),
        Some(&ExecutorError::UnknownOp {
            op: "MyOp".into(),
            node: "out".into(),
        })
    );
    // Removing an absent name is not an error.
    deregister_op("MyOp");
    Ok(())
}

#[test]
fn later_registration_replaces_earlier() -> Result<()> {
    let registry = Arc::new(CustomOpRegistry::new());
    registry.register_op("MyOp", |_| Ok(vec![TensorValue::from(1i32)]));
    registry.register_op("MyOp", |_| Ok(vec![TensorValue::from(2i32)]));
    assert_eq!(registry.len(), 1);

    let executor = GraphExecutor::with_registry(my_op_graph()?, registry.clone());
    let result = executor.execute(NamedTensorMap::new(), &[])?;
    assert_eq!(output(&result, "out")?, &TensorValue::from(2i32));
    Ok(())
}

#[test]
fn custom_op_shadows_builtin() -> Result<()> {
    let registry = Arc::new(CustomOpRegistry::new());
    let graph = Graph::new(
        vec![
            Node::new("a", "Placeholder"),
            Node::new("b", "Placeholder"),
            Node::new("sum", "Add").with_inputs(["a", "b"]),
        ],
        vec!["sum".into()],
    )?;
    let executor = GraphExecutor::with_registry(graph, registry.clone());
    let feeds = || -> NamedTensorMap {
        [("a", int(vec![1, 2], vec![2])), ("b", int(vec![10, 20], vec![2]))]
            .into_iter()
            .map(|(name, value)| (name.to_string(), value))
            .collect()
    };

    let result = executor.execute(feeds(), &["sum"])?;
    assert_eq!(i32_data(output(&result, "sum")?)?, vec![11, 22]);

    registry.register_op("Add", |node| {
        let a = node.input(0)?;
        let b = node.input(1)?;
        let product: Vec<i32> = a
            .to_i64_vec()
            .iter()
            .zip(b.to_i64_vec())
            .map(|(x, y)| (x * y) as i32)
            .collect();
        Ok(vec![TensorValue::from_i32(product, a.shape().to_vec())?])
    });
    assert_eq!(executor.resolve_op("Add").map(|m| m.category), Some(Category::Custom));
    let result = executor.execute(feeds(), &["sum"])?;
    assert_eq!(i32_data(output(&result, "sum")?)?, vec![10, 40]);

    registry.deregister_op("Add");
    assert_eq!(executor.resolve_op("Add").map(|m| m.category), Some(Category::Arithmetic));
    let result = executor.execute(feeds(), &["sum"])?;
    assert_eq!(i32_data(output(&result, "sum")?)?, vec![11, 22]);
    Ok(())
}

#[test]
fn custom_executor_reads_attributes() -> Result<()> {
    let registry = Arc::new(CustomOpRegistry::new());
    registry.register_op("Scale", |node| {
        let factor = node.number("factor")? as i32;
        let values = node.input(0)?.to_i64_vec();
        let scaled = values.iter().map(|v| *v as i32 * factor).collect();
        Ok(vec![TensorValue::from_i32(scaled, node.input(0)?.shape().to_vec())?])
    });
    let graph = Graph::new(
        vec![
            Node::new("x", "Placeholder"),
            Node::new("scaled", "Scale")
                .with_inputs(["x"])
                .with_attr("factor", 3i64),
        ],
        vec![],
    )?;
    let executor = GraphExecutor::with_registry(graph, registry);
    let feeds: NamedTensorMap = [("x".to_string(), int(vec![1, 2, 3], vec![3]))].into();
    let result = executor.execute(feeds, &["scaled"])?;
    assert_eq!(i32_data(output(&result, "scaled")?)?, vec![3, 6, 9]);
    Ok(())
}

#[test]
fn unknown_op_aborts_before_any_node_runs() -> Result<()> {
    let registry = Arc::new(CustomOpRegistry::new());
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();
    registry.register_op("Count", move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
        Ok(vec![TensorValue::from(0i32)])
    });
    let graph = Graph::new(
        vec![
            Node::new("first", "Count"),
            Node::new("second", "NotAnOp").with_inputs(["first"]),
        ],
        vec![],
    )?;
    let executor = GraphExecutor::with_registry(graph, registry);
    let err = executor.execute(NamedTensorMap::new(), &["second"]).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<ExecutorError>(),
        Some(ExecutorError::UnknownOp { op, node }) if op == "NotAnOp" && node == "second"
    ));
    assert_eq!(calls.load(Ordering::SeqCst), 0);
    Ok(())
}
