use frozenflow::registry::{builtin_op, builtin_op_names, resolve_op, ParamType};
use frozenflow::{Category, CustomOpRegistry};

#[test]
fn builtin_table_covers_every_category() {
    let names = builtin_op_names();
    for (op, category) in [
        ("Add", Category::Arithmetic),
        ("Sqrt", Category::BasicMath),
        ("Merge", Category::Control),
        ("QueueDequeueUpToV2", Category::Control),
        ("Fill", Category::Creation),
        ("Placeholder", Category::Graph),
        ("Select", Category::Logical),
        ("MatMul", Category::Matrices),
        ("Softmax", Category::Normalization),
        ("ArgMax", Category::Reduction),
        ("ConcatV2", Category::SliceJoin),
        ("Reshape", Category::Transformation),
    ] {
        assert!(names.contains(&op), "{} missing from built-in table", op);
        assert_eq!(builtin_op(op).map(|m| m.category), Some(category), "{}", op);
    }
    assert!(builtin_op("MyOp").is_none());
}

#[test]
fn builtin_mappers_describe_params() {
    let queue = builtin_op("FIFOQueueV2").expect("queue mapper");
    let capacity = queue
        .attrs
        .iter()
        .find(|attr| attr.tf_name == "capacity")
        .expect("capacity attr");
    assert_eq!(capacity.param_type, ParamType::Number);
    assert!(capacity.default_value.is_some());
    assert!(!queue.is_custom());

    let dequeue = builtin_op("QueueDequeueManyV2").expect("dequeue mapper");
    let names: Vec<&str> = dequeue.inputs.iter().map(|input| input.name.as_str()).collect();
    assert_eq!(names, ["queueId", "n"]);
}

#[test]
fn resolution_prefers_custom_registrations() {
    let registry = CustomOpRegistry::new();
    assert!(resolve_op(&registry, "MyOp").is_none());
    registry.register_op("MyOp", |_| Ok(vec![]));
    registry.register_op("Merge", |_| Ok(vec![]));
    assert_eq!(registry.registered_names(), vec!["Merge".to_string(), "MyOp".to_string()]);
    assert!(resolve_op(&registry, "Merge").is_some_and(|m| m.is_custom()));
    registry.deregister_op("Merge");
    assert!(resolve_op(&registry, "Merge").is_some_and(|m| !m.is_custom()));
    assert!(!registry.is_empty());
}
