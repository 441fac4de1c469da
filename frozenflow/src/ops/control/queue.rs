use anyhow::{anyhow, Context, Result};

use crate::ops::OpOutcome;
use crate::registry::{AttrParamMapper, Category, InputParamMapper, NodeValue, OpMapper, ParamType};
use crate::runtime::{FifoQueue, QueueElement, ResourceManager};
use crate::tensor::{unstack_value, TensorValue};

pub(super) fn mappers() -> Vec<OpMapper> {
    let handle = || InputParamMapper::tensor(0, "queueId");
    vec![
        OpMapper::new("FIFOQueueV2", Category::Control).with_attrs(vec![
            AttrParamMapper::new("component_types", "dtypes", ParamType::DTypes),
            AttrParamMapper::new("shapes", "shapes", ParamType::Shapes),
            AttrParamMapper::new("capacity", "capacity", ParamType::Number).with_default(-1),
            AttrParamMapper::new("container", "container", ParamType::Str).with_default(""),
            AttrParamMapper::new("shared_name", "sharedName", ParamType::Str).with_default(""),
        ]),
        OpMapper::new("QueueEnqueueV2", Category::Control)
            .with_inputs(vec![handle(), InputParamMapper::tensors(1, 0, "components")]),
        OpMapper::new("QueueEnqueueManyV2", Category::Control)
            .with_inputs(vec![handle(), InputParamMapper::tensors(1, 0, "components")]),
        OpMapper::new("QueueDequeueV2", Category::Control)
            .with_inputs(vec![handle()])
            .with_attrs(vec![
                AttrParamMapper::new("component_types", "dtypes", ParamType::DTypes).not_supported(),
            ]),
        OpMapper::new("QueueDequeueManyV2", Category::Control)
            .with_inputs(vec![handle(), InputParamMapper::number(1, "n")]),
        OpMapper::new("QueueDequeueUpToV2", Category::Control)
            .with_inputs(vec![handle(), InputParamMapper::number(1, "n")]),
        OpMapper::new("QueueCloseV2", Category::Control)
            .with_inputs(vec![handle()])
            .with_attrs(vec![AttrParamMapper::new(
                "cancel_pending_enqueues",
                "cancelPendingEnqueues",
                ParamType::Bool,
            )
            .with_default(false)]),
        OpMapper::new("QueueSizeV2", Category::Control).with_inputs(vec![handle()]),
    ]
}

/// Split batched components along their leading axis into queue elements.
fn split_batch(node: &NodeValue<'_>, components: Vec<TensorValue>) -> Result<Vec<QueueElement>> {
    let mut columns = components
        .iter()
        .map(|component| unstack_value(component, 0))
        .collect::<Result<Vec<_>>>()?;
    let count = columns.first().map_or(0, Vec::len);
    if columns.iter().any(|column| column.len() != count) {
        return Err(anyhow!(
            "{} components disagree on the batch size",
            node.name()
        ));
    }
    let mut elements = vec![Vec::with_capacity(columns.len()); count];
    for column in columns.iter_mut() {
        for (element, value) in elements.iter_mut().zip(column.drain(..)) {
            element.push(value);
        }
    }
    Ok(elements)
}

pub(super) fn execute(node: &NodeValue<'_>, resources: &mut ResourceManager) -> Result<OpOutcome> {
    if node.op() == "FIFOQueueV2" {
        let shared_name = node.string("sharedName")?;
        let name = if shared_name.is_empty() {
            node.name().to_string()
        } else {
            shared_name.clone()
        };
        let mut queue = FifoQueue::new(node.dtypes("dtypes")?)
            .with_shapes(node.shapes("shapes")?)
            .with_signed_capacity(node.number("capacity")? as i64)
            .with_name(name);
        let container = node.string("container")?;
        if !container.is_empty() {
            queue = queue.with_container(container);
        }
        let shared = (!shared_name.is_empty()).then_some(shared_name.as_str());
        return Ok(OpOutcome::single(resources.add_queue(queue, shared)));
    }

    let handle = node.tensor("queueId")?;
    let queue = resources.queue_mut(&handle)?;
    let outcome = match node.op() {
        "QueueEnqueueV2" => {
            queue.enqueue(node.tensors("components")?)?;
            OpOutcome::default()
        }
        "QueueEnqueueManyV2" => {
            let elements = split_batch(node, node.tensors("components")?)?;
            queue.enqueue_many(elements)?;
            OpOutcome::default()
        }
        "QueueDequeueV2" => OpOutcome::values(queue.dequeue()?),
        "QueueDequeueManyV2" => {
            let count = dequeue_count(node, queue)?;
            OpOutcome::values(queue.dequeue_many(count)?)
        }
        "QueueDequeueUpToV2" => {
            let count = dequeue_count(node, queue)?;
            OpOutcome::values(queue.dequeue_up_to(count)?)
        }
        "QueueCloseV2" => {
            queue.close();
            OpOutcome::default()
        }
        "QueueSizeV2" => OpOutcome::single(TensorValue::from(queue.size() as i32)),
        _ => return Err(crate::ops::unsupported(node, Category::Control)),
    };
    Ok(outcome)
}

/// Element count operand of the batched dequeues; must be a whole number.
fn dequeue_count(node: &NodeValue<'_>, queue: &FifoQueue) -> Result<i64> {
    let count = node.number("n")?;
    if count.is_finite() && count.fract() == 0.0 {
        return Ok(count as i64);
    }
    Err(queue.invalid_count(count as i64))
        .with_context(|| format!("dequeue count {} is not a whole number", count))
}
