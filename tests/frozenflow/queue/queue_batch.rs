use anyhow::Result;
use frozenflow::{DType, FifoQueue, PartialShape, QueueError, TensorValue};

use crate::common::{i32_data, int};

fn scenario_queue() -> FifoQueue {
    FifoQueue::new(vec![DType::Int32])
        .with_shapes(vec![PartialShape::from(vec![1, 1])])
        .with_capacity(10)
        .with_name("scenario")
}

#[test]
fn dequeue_many_batches_along_leading_axis() -> Result<()> {
    let mut queue = scenario_queue();
    queue.enqueue(vec![int(vec![1], vec![1, 1])])?;
    queue.enqueue(vec![int(vec![2], vec![1, 1])])?;

    let batch = queue.dequeue_many(2)?;
    assert_eq!(batch.len(), 1);
    assert_eq!(batch[0].shape(), &[2, 1]);
    assert_eq!(i32_data(&batch[0])?, vec![1, 2]);
    assert!(queue.is_empty());
    Ok(())
}

#[test]
fn eleventh_enqueue_exceeds_capacity() -> Result<()> {
    let mut queue = scenario_queue();
    for i in 0..10 {
        queue.enqueue(vec![int(vec![i], vec![1, 1])])?;
    }
    let err = queue.enqueue(vec![int(vec![10], vec![1, 1])]).unwrap_err();
    assert_eq!(
        err,
        QueueError::CapacityExceeded {
            name: "scenario".into(),
            capacity: 10,
            size: 10,
            requested: 1,
        }
    );
    assert_eq!(queue.size(), 10);
    Ok(())
}

#[test]
fn unbatched_components_gain_a_leading_axis() -> Result<()> {
    let mut queue = FifoQueue::new(vec![DType::Int32, DType::Bool]);
    for i in 0..3 {
        queue.enqueue(vec![int(vec![i, i * 10], vec![2]), TensorValue::from(i % 2 == 0)])?;
    }
    let batch = queue.dequeue_many(3)?;
    assert_eq!(batch[0].shape(), &[3, 2]);
    assert_eq!(i32_data(&batch[0])?, vec![0, 0, 1, 10, 2, 20]);
    assert_eq!(batch[1].shape(), &[3]);
    assert_eq!(batch[1].as_bool().map(|t| t.data.clone()), Some(vec![true, false, true]));
    Ok(())
}

#[test]
fn dequeue_many_rejects_bad_counts() -> Result<()> {
    let mut queue = scenario_queue();
    queue.enqueue(vec![int(vec![1], vec![1, 1])])?;
    assert!(matches!(
        queue.dequeue_many(2),
        Err(QueueError::InvalidCount { count: 2, size: 1, .. })
    ));
    assert!(matches!(
        queue.dequeue_many(-1),
        Err(QueueError::InvalidCount { count: -1, .. })
    ));
    assert_eq!(queue.size(), 1);

    let empty = queue.dequeue_many(0)?;
    assert_eq!(empty[0].shape(), &[0, 1]);
    assert_eq!(queue.size(), 1);
    Ok(())
}

#[test]
fn dequeue_up_to_returns_what_is_buffered() -> Result<()> {
    let mut queue = scenario_queue();
    queue.enqueue(vec![int(vec![4], vec![1, 1])])?;
    queue.enqueue(vec![int(vec![5], vec![1, 1])])?;
    queue.close();

    let batch = queue.dequeue_up_to(8)?;
    assert_eq!(batch[0].shape(), &[2, 1]);
    assert_eq!(i32_data(&batch[0])?, vec![4, 5]);

    assert!(matches!(queue.dequeue_up_to(1), Err(QueueError::Empty { .. })));
    assert!(matches!(queue.dequeue_up_to(0), Err(QueueError::InvalidCount { count: 0, .. })));
    Ok(())
}

#[test]
fn wildcard_batches_need_matching_trailing_dims() -> Result<()> {
    let mut queue = FifoQueue::new(vec![DType::Int32])
        .with_shapes(vec![PartialShape::from_dims(&[-1])])
        .with_name("ragged");
    queue.enqueue(vec![int(vec![1, 2], vec![2])])?;
    queue.enqueue(vec![int(vec![3], vec![1])])?;
    let err = queue.dequeue_many(2).unwrap_err();
    assert!(matches!(err, QueueError::ShapeMismatch { index: 0, .. }));
    // Nothing was removed by the failed batch.
    assert_eq!(queue.size(), 2);
    assert_eq!(i32_data(&queue.dequeue()?[0])?, vec![1, 2]);
    Ok(())
}
