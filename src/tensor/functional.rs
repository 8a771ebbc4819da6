use crate::tensor::{Numeric, Tensor};

pub fn tanh<T: Numeric>(tensor: &Tensor<T>) -> Tensor<T> {
    tensor.map(|x| x.tanh())
}

/// `1 - tanh(x)^2`, written in terms of the already computed output `y = tanh(x)`.
pub fn tanh_derivative<T: Numeric>(output: &Tensor<T>) -> Tensor<T> {
    output.map(|y| T::one() - y * y)
}

pub fn relu<T: Numeric>(tensor: &Tensor<T>) -> Tensor<T> {
    tensor.map(|x| x.max(T::zero()))
}

pub fn relu_derivative<T: Numeric>(input: &Tensor<T>) -> Tensor<T> {
    input.map(|x| if x > T::zero() { T::one() } else { T::zero() })
}

pub fn square<T: Numeric>(tensor: &Tensor<T>) -> Tensor<T> {
    tensor.map(|x| x * x)
}

#[test]
fn test_tanh_derivative() {
    let input = Tensor::new((0..16).map(|i| f64::from(i) / 8.0 - 1.0).collect(), vec![4, 4]);
    let epsilon = 1e-6;
    let output = tanh(&input);
    let perturbed = tanh(&input.map(|x| x + epsilon));
    let numerical = perturbed.sub(&output).unwrap().scale(1.0 / epsilon);
    let calculated = tanh_derivative(&output);

    let abs_diff = numerical.sub(&calculated).unwrap().map(f64::abs);
    assert!(abs_diff.mean() <= 1e-5, "mean abs diff={}", abs_diff.mean());
}

#[test]
fn test_relu() {
    let input: Tensor<f32> = Tensor::from([-1.0, 0.0, 2.5]);
    assert_eq!(relu(&input).array(), &[0.0, 0.0, 2.5]);
    assert_eq!(relu_derivative(&input).array(), &[0.0, 0.0, 1.0]);
}
