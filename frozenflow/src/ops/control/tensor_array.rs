use anyhow::Result;

use super::indices;
use crate::ops::OpOutcome;
use crate::registry::{AttrParamMapper, Category, InputParamMapper, NodeValue, OpMapper, ParamType};
use crate::runtime::{ResourceManager, TensorArray};
use crate::tensor::{Tensor, TensorValue};

pub(super) fn mappers() -> Vec<OpMapper> {
    let handle = || InputParamMapper::tensor(0, "tensorArrayId");
    let dtype = || AttrParamMapper::new("dtype", "dtype", ParamType::DType);
    vec![
        OpMapper::new("TensorArrayV3", Category::Control)
            .with_inputs(vec![InputParamMapper::number(0, "size")])
            .with_attrs(vec![
                dtype(),
                AttrParamMapper::new("element_shape", "elementShape", ParamType::Shape),
                AttrParamMapper::new("dynamic_size", "dynamicSize", ParamType::Bool).with_default(false),
                AttrParamMapper::new("clear_after_read", "clearAfterRead", ParamType::Bool)
                    .with_default(true),
                AttrParamMapper::new("identical_element_shapes", "identicalElementShapes", ParamType::Bool)
                    .with_default(false),
                AttrParamMapper::new("tensor_array_name", "name", ParamType::Str).with_default(""),
            ]),
        OpMapper::new("TensorArrayWriteV3", Category::Control).with_inputs(vec![
            handle(),
            InputParamMapper::number(1, "index"),
            InputParamMapper::tensor(2, "tensor"),
            InputParamMapper::tensor(3, "flowIn"),
        ]),
        OpMapper::new("TensorArrayReadV3", Category::Control)
            .with_inputs(vec![
                handle(),
                InputParamMapper::number(1, "index"),
                InputParamMapper::tensor(2, "flowIn"),
            ])
            .with_attrs(vec![dtype().not_supported()]),
        OpMapper::new("TensorArrayGatherV3", Category::Control)
            .with_inputs(vec![
                handle(),
                InputParamMapper::numbers(1, "indices"),
                InputParamMapper::tensor(2, "flowIn"),
            ])
            .with_attrs(vec![dtype()]),
        OpMapper::new("TensorArrayScatterV3", Category::Control).with_inputs(vec![
            handle(),
            InputParamMapper::numbers(1, "indices"),
            InputParamMapper::tensor(2, "tensor"),
            InputParamMapper::tensor(3, "flowIn"),
        ]),
        OpMapper::new("TensorArrayConcatV3", Category::Control)
            .with_inputs(vec![handle(), InputParamMapper::tensor(1, "flowIn")])
            .with_attrs(vec![dtype()]),
        OpMapper::new("TensorArraySplitV3", Category::Control).with_inputs(vec![
            handle(),
            InputParamMapper::tensor(1, "tensor"),
            InputParamMapper::numbers(2, "lengths"),
            InputParamMapper::tensor(3, "flowIn"),
        ]),
        OpMapper::new("TensorArraySizeV3", Category::Control)
            .with_inputs(vec![handle(), InputParamMapper::tensor(1, "flowIn")]),
        OpMapper::new("TensorArrayCloseV3", Category::Control).with_inputs(vec![handle()]),
    ]
}

fn flow() -> TensorValue {
    TensorValue::from(0.0f32)
}

pub(super) fn execute(node: &NodeValue<'_>, resources: &mut ResourceManager) -> Result<OpOutcome> {
    if node.op() == "TensorArrayV3" {
        let size = indices(&[node.number("size")?])?[0];
        let name = match node.string("name")? {
            name if name.is_empty() => node.name().to_string(),
            name => name,
        };
        let array = TensorArray::new(name, node.dtype("dtype")?, size)
            .with_element_shape(node.shape("elementShape")?)
            .with_dynamic_size(node.boolean("dynamicSize")?)
            .with_clear_after_read(node.boolean("clearAfterRead")?)
            .with_identical_element_shapes(node.boolean("identicalElementShapes")?);
        let handle = resources.add_tensor_array(array);
        return Ok(OpOutcome::values(vec![handle, flow()]));
    }

    let handle = node.tensor("tensorArrayId")?;
    let array = resources.tensor_array_mut(&handle)?;
    let outcome = match node.op() {
        "TensorArrayWriteV3" => {
            let index = indices(&[node.number("index")?])?[0];
            array.write(index, node.tensor("tensor")?)?;
            OpOutcome::single(flow())
        }
        "TensorArrayReadV3" => {
            let index = indices(&[node.number("index")?])?[0];
            OpOutcome::single(array.read(index)?)
        }
        "TensorArrayGatherV3" => {
            let rows = indices(&node.numbers("indices")?)?;
            OpOutcome::single(array.gather(Some(&rows), node.dtype("dtype")?)?)
        }
        "TensorArrayScatterV3" => {
            let rows = indices(&node.numbers("indices")?)?;
            array.scatter(&rows, &node.tensor("tensor")?)?;
            OpOutcome::single(flow())
        }
        "TensorArrayConcatV3" => {
            let lengths = array.lengths();
            let count = lengths.len();
            let value = array.concat(node.dtype("dtype")?)?;
            let lengths = Tensor::with_shape(lengths, vec![count])?;
            OpOutcome::values(vec![value, lengths.into()])
        }
        "TensorArraySplitV3" => {
            let lengths = indices(&node.numbers("lengths")?)?;
            array.split(&lengths, &node.tensor("tensor")?)?;
            OpOutcome::single(flow())
        }
        "TensorArraySizeV3" => OpOutcome::single(TensorValue::from(array.size() as i32)),
        "TensorArrayCloseV3" => {
            array.clear_and_close();
            OpOutcome::default()
        }
        _ => return Err(crate::ops::unsupported(node, Category::Control)),
    };
    Ok(outcome)
}
