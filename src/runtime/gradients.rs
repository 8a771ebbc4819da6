use std::collections::HashMap;

use super::error::{Result, RuntimeError};
use super::{FeedDict, Graph, NodeId, Op};
use crate::tensor::functional::{relu_derivative, tanh_derivative};
use crate::tensor::{Numeric, Tensor};

/// Reverse-mode pass from `loss` back to the variables it depends on.
///
/// `values` must hold the forward value of every node visited while computing `loss`.
/// Fed nodes are treated as constants: gradients stop there.
pub(super) fn backward<T: Numeric>(
    graph: &Graph<T>,
    loss: NodeId,
    values: &HashMap<NodeId, Tensor<T>>,
    feed: &FeedDict<T>,
) -> Result<Vec<(NodeId, Tensor<T>)>> {
    let loss_value = value_of(values, loss)?;
    if loss_value.item().is_none() {
        return Err(RuntimeError::NonScalarLoss(loss_value.shape().to_vec()));
    }

    let mut grads: HashMap<NodeId, Tensor<T>> = HashMap::new();
    grads.insert(
        loss,
        Tensor::new_with_filler(loss_value.shape().to_vec(), T::one()),
    );
    let mut var_grads = Vec::new();

    for index in (0..=loss.0).rev() {
        let id = NodeId(index);
        let Some(grad) = grads.remove(&id) else {
            continue;
        };
        if feed.contains_key(&id) {
            continue;
        }
        match *graph.op(id)? {
            Op::Placeholder { .. } | Op::Constant(_) => {}
            Op::Variable { .. } => var_grads.push((id, grad)),
            Op::MatMul(a, b) => {
                let (va, vb) = (value_of(values, a)?, value_of(values, b)?);
                accumulate(&mut grads, a, grad.matmul(&vb.transpose()?)?)?;
                accumulate(&mut grads, b, va.transpose()?.matmul(&grad)?)?;
            }
            Op::Add(a, b) => {
                let (va, vb) = (value_of(values, a)?, value_of(values, b)?);
                accumulate(&mut grads, a, grad.sum_to_shape(va.shape())?)?;
                accumulate(&mut grads, b, grad.sum_to_shape(vb.shape())?)?;
            }
            Op::Sub(a, b) => {
                let (va, vb) = (value_of(values, a)?, value_of(values, b)?);
                accumulate(&mut grads, a, grad.sum_to_shape(va.shape())?)?;
                accumulate(&mut grads, b, (-&grad).sum_to_shape(vb.shape())?)?;
            }
            Op::Mul(a, b) => {
                let (va, vb) = (value_of(values, a)?, value_of(values, b)?);
                accumulate(&mut grads, a, grad.mul(vb)?.sum_to_shape(va.shape())?)?;
                accumulate(&mut grads, b, grad.mul(va)?.sum_to_shape(vb.shape())?)?;
            }
            Op::Tanh(a) => {
                let output = value_of(values, id)?;
                accumulate(&mut grads, a, grad.mul(&tanh_derivative(output))?)?;
            }
            Op::Relu(a) => {
                let input = value_of(values, a)?;
                accumulate(&mut grads, a, grad.mul(&relu_derivative(input))?)?;
            }
            Op::Square(a) => {
                let input = value_of(values, a)?;
                accumulate(&mut grads, a, grad.mul(&input.scale(T::from_f64(2.0)))?)?;
            }
            Op::Mean(a) => {
                let input = value_of(values, a)?;
                let count = T::from_f64(input.numel().max(1) as f64);
                let upstream = grad.item().unwrap_or_else(T::zero);
                accumulate(
                    &mut grads,
                    a,
                    Tensor::new_with_filler(input.shape().to_vec(), upstream / count),
                )?;
            }
            Op::Minimize { .. } => return Err(RuntimeError::NotDifferentiable(id)),
        }
    }

    var_grads.reverse();
    Ok(var_grads)
}

fn value_of<T: Numeric>(values: &HashMap<NodeId, Tensor<T>>, id: NodeId) -> Result<&Tensor<T>> {
    values.get(&id).ok_or(RuntimeError::MissingValue(id))
}

fn accumulate<T: Numeric>(
    grads: &mut HashMap<NodeId, Tensor<T>>,
    id: NodeId,
    grad: Tensor<T>,
) -> Result<()> {
    let summed = match grads.remove(&id) {
        Some(existing) => existing.add(&grad)?,
        None => grad,
    };
    grads.insert(id, summed);
    Ok(())
}
