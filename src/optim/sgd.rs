use crate::tensor::{Numeric, ShapeError, Tensor};

/// Plain gradient descent: `param - learning_rate * grad`.
pub fn sgd_step<T: Numeric>(
    param: &Tensor<T>,
    grad: &Tensor<T>,
    learning_rate: T,
) -> Result<Tensor<T>, ShapeError> {
    if param.shape() != grad.shape() {
        return Err(ShapeError::new("sgd_step", param.shape(), grad.shape()));
    }
    param.zip_with(grad, "sgd_step", |p, g| p - learning_rate * g)
}

#[test]
fn test_sgd_step() {
    let param = Tensor::new(vec![1.0, 2.0], vec![1, 2]);
    let grad = Tensor::new(vec![10.0, -10.0], vec![1, 2]);
    let stepped = sgd_step(&param, &grad, 0.1).unwrap();
    assert_eq!(stepped, Tensor::new(vec![0.0, 3.0], vec![1, 2]));
    assert!(sgd_step(&param, &Tensor::scalar(1.0), 0.1).is_err());
}
