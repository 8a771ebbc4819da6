use crate::tensor::Tensor;

// Aliases kept for readability; a run hands back one tensor per fetch, in fetch order.
pub type TensorList<T> = Vec<Tensor<T>>;
