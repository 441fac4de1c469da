use anyhow::Result;
use frozenflow::{AttrValue, DType, Graph, GraphExecutor, Node, QueueError, TensorValue};

use crate::common::{
    const_node, f32_data, feeds, fifo_queue, float, i32_data, int, output, placeholder,
};

fn queue_graph() -> Result<Graph> {
    Graph::new(
        vec![
            fifo_queue("q", vec![DType::Int32], vec![vec![1, 1]], 10),
            placeholder("a", DType::Int32),
            placeholder("b", DType::Int32),
            const_node("n", TensorValue::from(2i32)),
            Node::new("enq_a", "QueueEnqueueV2").with_inputs(["q", "a"]),
            Node::new("enq_b", "QueueEnqueueV2").with_inputs(["q", "b", "^enq_a"]),
            Node::new("size", "QueueSizeV2").with_inputs(["q", "^enq_b"]),
            Node::new("deq", "QueueDequeueManyV2").with_inputs(["q", "n", "^size"]),
        ],
        vec!["deq".into(), "size".into()],
    )
}

#[test]
fn queue_ops_batch_enqueued_values() -> Result<()> {
    let executor = GraphExecutor::new(queue_graph()?);
    for _ in 0..2 {
        let result = executor.execute(
            feeds([("a", int(vec![1], vec![1, 1])), ("b", int(vec![2], vec![1, 1]))]),
            &[],
        )?;
        // A fresh queue per request: the size never carries over.
        assert_eq!(output(&result, "size")?, &TensorValue::from(2i32));
        let batch = output(&result, "deq")?;
        assert_eq!(batch.shape(), &[2, 1]);
        assert_eq!(i32_data(batch)?, vec![1, 2]);
    }
    Ok(())
}

#[test]
fn queue_contract_violations_abort_the_request() -> Result<()> {
    let executor = GraphExecutor::new(queue_graph()?);
    let err = executor
        .execute(
            feeds([("a", int(vec![1, 2], vec![1, 2])), ("b", int(vec![2], vec![1, 1]))]),
            &["deq"],
        )
        .unwrap_err();
    assert!(matches!(
        err.downcast_ref::<QueueError>(),
        Some(QueueError::ShapeMismatch { index: 0, .. })
    ));
    assert!(format!("{:#}", err).contains("enq_a"));

    let err = executor
        .execute(
            feeds([("a", float(vec![1.0], vec![1, 1])), ("b", int(vec![2], vec![1, 1]))]),
            &["deq"],
        )
        .unwrap_err();
    assert!(matches!(
        err.downcast_ref::<QueueError>(),
        Some(QueueError::TypeMismatch { expected: DType::Int32, actual: DType::Float32, .. })
    ));
    Ok(())
}

#[test]
fn enqueue_many_beyond_capacity_fails() -> Result<()> {
    let graph = Graph::new(
        vec![
            fifo_queue("q", vec![DType::Int32], vec![vec![1, 1]], 10),
            placeholder("rows", DType::Int32),
            Node::new("fill", "QueueEnqueueManyV2").with_inputs(["q", "rows"]),
            Node::new("size", "QueueSizeV2").with_inputs(["q", "^fill"]),
        ],
        vec![],
    )?;
    let executor = GraphExecutor::new(graph);

    let ten = int((0..10).collect(), vec![10, 1, 1]);
    let result = executor.execute(feeds([("rows", ten)]), &["size"])?;
    assert_eq!(output(&result, "size")?, &TensorValue::from(10i32));

    let eleven = int((0..11).collect(), vec![11, 1, 1]);
    let err = executor.execute(feeds([("rows", eleven)]), &["size"]).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<QueueError>(),
        Some(QueueError::CapacityExceeded { capacity: 10, requested: 11, .. })
    ));
    Ok(())
}

#[test]
fn closed_queue_still_drains() -> Result<()> {
    let graph = Graph::new(
        vec![
            fifo_queue("q", vec![DType::Int32], vec![], -1),
            placeholder("x", DType::Int32),
            const_node("five", TensorValue::from(5i32)),
            Node::new("enq", "QueueEnqueueV2").with_inputs(["q", "x"]),
            Node::new("close", "QueueCloseV2").with_inputs(["q", "^enq"]),
            Node::new("drain", "QueueDequeueUpToV2").with_inputs(["q", "five", "^close"]),
            Node::new("late", "QueueEnqueueV2").with_inputs(["q", "x", "^close"]),
        ],
        vec![],
    )?;
    let executor = GraphExecutor::new(graph);
    let x = || feeds([("x", int(vec![3, 4], vec![2]))]);

    let result = executor.execute(x(), &["drain"])?;
    let drained = output(&result, "drain")?;
    assert_eq!(drained.shape(), &[1, 2]);
    assert_eq!(i32_data(drained)?, vec![3, 4]);

    let err = executor.execute(x(), &["late"]).unwrap_err();
    assert!(matches!(err.downcast_ref::<QueueError>(), Some(QueueError::Closed { .. })));
    Ok(())
}

#[test]
fn queue_buffers_values_across_loop_iterations() -> Result<()> {
    let frame = |node: Node| node.with_attr("frame_name", "fill");
    let constant = |node: Node| frame(node).with_attr("is_constant", true);
    let graph = Graph::new(
        vec![
            fifo_queue("q", vec![DType::Int32], vec![vec![]], 10),
            placeholder("limit", DType::Int32),
            const_node("start", TensorValue::from(0i32)),
            const_node("one", TensorValue::from(1i32)),
            frame(Node::new("enter_i", "Enter").with_inputs(["start"])),
            constant(Node::new("enter_limit", "Enter").with_inputs(["limit"])),
            constant(Node::new("enter_one", "Enter").with_inputs(["one"])),
            constant(Node::new("enter_q", "Enter").with_inputs(["q"])),
            Node::new("merge_i", "Merge").with_inputs(["enter_i", "next_i"]),
            Node::new("less", "Less").with_inputs(["merge_i", "enter_limit"]),
            Node::new("cond", "LoopCond").with_inputs(["less"]),
            Node::new("switch_i", "Switch").with_inputs(["merge_i", "cond"]),
            Node::new("enq", "QueueEnqueueV2").with_inputs(["enter_q", "switch_i:1"]),
            Node::new("add_i", "AddV2").with_inputs(["switch_i:1", "enter_one"]),
            Node::new("next_i", "NextIteration").with_inputs(["add_i", "^enq"]),
            Node::new("exit_i", "Exit").with_inputs(["switch_i"]),
            Node::new("deq", "QueueDequeueManyV2").with_inputs(["q", "limit", "^exit_i"]),
        ],
        vec!["deq".into()],
    )?;
    let executor = GraphExecutor::new(graph);
    let result = executor.execute(feeds([("limit", TensorValue::from(3i32))]), &[])?;
    let values = output(&result, "deq")?;
    assert_eq!(values.shape(), &[3]);
    assert_eq!(i32_data(values)?, vec![0, 1, 2]);
    Ok(())
}

#[test]
fn tensor_array_ops_write_and_gather() -> Result<()> {
    let graph = Graph::new(
        vec![
            const_node("size", TensorValue::from(2i32)),
            Node::new("ta", "TensorArrayV3")
                .with_inputs(["size"])
                .with_attr("dtype", DType::Float32)
                .with_attr("element_shape", AttrValue::Shape(vec![2])),
            placeholder("v0", DType::Float32),
            placeholder("v1", DType::Float32),
            const_node("i0", TensorValue::from(0i32)),
            const_node("i1", TensorValue::from(1i32)),
            Node::new("w0", "TensorArrayWriteV3").with_inputs(["ta", "i0", "v0", "ta:1"]),
            Node::new("w1", "TensorArrayWriteV3").with_inputs(["ta", "i1", "v1", "w0"]),
            const_node("order", int(vec![1, 0], vec![2])),
            Node::new("gather", "TensorArrayGatherV3")
                .with_inputs(["ta", "order", "w1"])
                .with_attr("dtype", DType::Float32),
            Node::new("count", "TensorArraySizeV3").with_inputs(["ta", "w1"]),
        ],
        vec!["gather".into(), "count".into()],
    )?;
    let executor = GraphExecutor::new(graph);
    let result = executor.execute(
        feeds([
            ("v0", float(vec![1.0, 2.0], vec![2])),
            ("v1", float(vec![3.0, 4.0], vec![2])),
        ]),
        &[],
    )?;
    let gathered = output(&result, "gather")?;
    assert_eq!(gathered.shape(), &[2, 2]);
    assert_eq!(f32_data(gathered)?, vec![3.0, 4.0, 1.0, 2.0]);
    assert_eq!(output(&result, "count")?, &TensorValue::from(2i32));

    let err = executor
        .execute(
            feeds([
                ("v0", float(vec![1.0, 2.0, 3.0], vec![3])),
                ("v1", float(vec![3.0, 4.0], vec![2])),
            ]),
            &[],
        )
        .unwrap_err();
    assert!(format!("{:#}", err).contains("w0"));
    Ok(())
}

#[test]
fn batched_dequeue_rejects_fractional_counts() -> Result<()> {
    let executor = GraphExecutor::new(queue_graph()?);
    for count in [1.5f32, f32::NAN] {
        let err = executor
            .execute(
                feeds([
                    ("a", int(vec![1], vec![1, 1])),
                    ("b", int(vec![2], vec![1, 1])),
                    ("n", TensorValue::from(count)),
                ]),
                &["deq"],
            )
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<QueueError>(),
            Some(QueueError::InvalidCount { size: 2, .. })
        ));
        assert!(format!("{:#}", err).contains("is not a whole number"));
    }
    Ok(())
}
