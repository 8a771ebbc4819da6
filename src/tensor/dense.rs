use itertools::Itertools;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use std::convert::From;
use std::fmt;
use std::ops::Neg;

use super::numeric::*;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{op}: incompatible shapes {left:?} and {right:?}")]
pub struct ShapeError {
    pub op: &'static str,
    pub left: Vec<usize>,
    pub right: Vec<usize>,
}

impl ShapeError {
    pub fn new(op: &'static str, left: &[usize], right: &[usize]) -> ShapeError {
        ShapeError {
            op,
            left: left.to_vec(),
            right: right.to_vec(),
        }
    }
}

/// Dense, row-major n-dimensional array. A scalar has an empty shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(bound = "T: Numeric")]
pub struct Tensor<T>
where
    T: Numeric,
{
    array: Vec<T>,
    shape: Vec<usize>,
}

impl<T> From<T> for Tensor<T>
where
    T: Numeric,
{
    fn from(value: T) -> Self {
        Tensor::scalar(value)
    }
}

impl<T, U> From<Vec<U>> for Tensor<T>
where
    T: Numeric,
    Tensor<T>: From<U>,
{
    fn from(value: Vec<U>) -> Tensor<T> {
        let tensors: Vec<Tensor<T>> = value.into_iter().map(Tensor::from).collect();
        let inner_shape = tensors
            .first()
            .map(|t| t.shape.clone())
            .unwrap_or_default();
        assert!(
            tensors.iter().all(|t| t.shape == inner_shape),
            "ragged nested input"
        );

        let mut shape = vec![tensors.len()];
        shape.extend_from_slice(&inner_shape);
        let array = tensors.into_iter().flat_map(|t| t.array).collect();
        Tensor { array, shape }
    }
}

impl<T, U, const N: usize> From<[U; N]> for Tensor<T>
where
    T: Numeric,
    Tensor<T>: From<U>,
    U: Clone,
{
    fn from(value: [U; N]) -> Tensor<T> {
        From::from(value.to_vec())
    }
}

impl<T> Tensor<T>
where
    T: Numeric,
{
    /// # Panics
    /// if `array` does not hold exactly `shape.iter().product()` elements.
    pub fn new(array: Vec<T>, shape: Vec<usize>) -> Tensor<T> {
        assert_eq!(
            array.len(),
            shape.iter().product::<usize>(),
            "array length does not match shape {shape:?}"
        );
        Tensor { array, shape }
    }

    pub fn new_with_filler(shape: Vec<usize>, filler: T) -> Tensor<T> {
        let total = shape.iter().product();
        Tensor {
            array: vec![filler; total],
            shape,
        }
    }

    pub fn zeros(shape: Vec<usize>) -> Tensor<T> {
        Tensor::new_with_filler(shape, T::zero())
    }

    pub fn scalar(value: T) -> Tensor<T> {
        Tensor {
            array: vec![value],
            shape: vec![],
        }
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    pub fn array(&self) -> &[T] {
        &self.array
    }

    pub fn into_array(self) -> Vec<T> {
        self.array
    }

    pub fn numel(&self) -> usize {
        self.array.len()
    }

    /// The single element of a one-element tensor of any rank.
    pub fn item(&self) -> Option<T> {
        match self.array.as_slice() {
            [value] => Some(*value),
            _ => None,
        }
    }

    pub fn get(&self, index: &[usize]) -> Option<&T> {
        if index.len() != self.shape.len() {
            return None;
        }
        let mut global_idx = 0;
        let mut multiplier = 1;
        for (&dim, &idx_dim) in self.shape.iter().zip(index.iter()).rev() {
            if idx_dim >= dim {
                return None;
            }
            global_idx += idx_dim * multiplier;
            multiplier *= dim;
        }
        self.array.get(global_idx)
    }

    /// Leading dimension; 1 for scalars.
    pub fn num_rows(&self) -> usize {
        self.shape.first().copied().unwrap_or(1)
    }

    fn row_len(&self) -> usize {
        self.shape.iter().skip(1).product()
    }

    /// Rows `start..end` along the leading dimension.
    pub fn rows(&self, start: usize, end: usize) -> Result<Tensor<T>, ShapeError> {
        if self.shape.is_empty() || start > end || end > self.num_rows() {
            return Err(ShapeError::new("rows", &self.shape, &[start, end]));
        }
        let row_len = self.row_len();
        let mut shape = self.shape.clone();
        shape[0] = end - start;
        Ok(Tensor {
            array: self.array[start * row_len..end * row_len].to_vec(),
            shape,
        })
    }

    /// Picks rows by index, in the given order.
    pub fn gather_rows(&self, indices: &[usize]) -> Result<Tensor<T>, ShapeError> {
        let num_rows = self.num_rows();
        if self.shape.is_empty() || indices.iter().any(|&i| i >= num_rows) {
            return Err(ShapeError::new("gather_rows", &self.shape, indices));
        }
        let row_len = self.row_len();
        let array = indices
            .iter()
            .flat_map(move |&i| self.array[i * row_len..(i + 1) * row_len].iter().copied())
            .collect();
        let mut shape = self.shape.clone();
        shape[0] = indices.len();
        Ok(Tensor { array, shape })
    }

    /// Stacks tensors along the leading dimension.
    pub fn concat_rows(parts: &[Tensor<T>]) -> Result<Tensor<T>, ShapeError> {
        let Some(first) = parts.first() else {
            return Err(ShapeError::new("concat_rows", &[], &[]));
        };
        let mut shape = first.shape.clone();
        if shape.is_empty() {
            return Err(ShapeError::new("concat_rows", &first.shape, &[]));
        }
        shape[0] = 0;
        let mut array = Vec::new();
        for part in parts {
            if part.shape.len() != first.shape.len() || part.shape[1..] != first.shape[1..] {
                return Err(ShapeError::new("concat_rows", &first.shape, &part.shape));
            }
            shape[0] += part.shape[0];
            array.extend_from_slice(&part.array);
        }
        Ok(Tensor { array, shape })
    }

    pub fn map<F>(&self, f: F) -> Tensor<T>
    where
        F: Fn(T) -> T,
    {
        Tensor {
            array: self.array.iter().map(|&x| f(x)).collect(),
            shape: self.shape.clone(),
        }
    }

    /// Elementwise combination. `right` may have the same shape as `self`, hold a single
    /// element, or be a row (`[n]` or `[1, n]`) broadcast over every row of `self`.
    pub fn zip_with<F>(
        &self,
        right: &Tensor<T>,
        op: &'static str,
        f: F,
    ) -> Result<Tensor<T>, ShapeError>
    where
        F: Fn(T, T) -> T,
    {
        let array = if self.shape == right.shape {
            self.array
                .iter()
                .zip_eq(right.array.iter())
                .map(|(&x, &y)| f(x, y))
                .collect()
        } else if let Some(value) = right.item() {
            self.array.iter().map(|&x| f(x, value)).collect()
        } else if self.is_row_broadcast(right) {
            let mut array = Vec::with_capacity(self.array.len());
            for row in self.array.chunks(right.array.len()) {
                array.extend(row.iter().zip_eq(right.array.iter()).map(|(&x, &y)| f(x, y)));
            }
            array
        } else {
            return Err(ShapeError::new(op, &self.shape, &right.shape));
        };
        Ok(Tensor {
            array,
            shape: self.shape.clone(),
        })
    }

    fn is_row_broadcast(&self, row: &Tensor<T>) -> bool {
        let Some(&width) = self.shape.last() else {
            return false;
        };
        let row_shaped = match row.shape.as_slice() {
            [n] => *n == width,
            [1, n] => *n == width,
            _ => false,
        };
        row_shaped && width > 0 && self.shape.len() >= 2
    }

    /// Sums `self` down to `shape`, undoing a broadcast performed by [`Tensor::zip_with`].
    pub fn sum_to_shape(&self, shape: &[usize]) -> Result<Tensor<T>, ShapeError> {
        if self.shape == shape {
            return Ok(self.clone());
        }
        let target_len: usize = shape.iter().product();
        if target_len == 1 {
            return Ok(Tensor {
                array: vec![self.sum()],
                shape: shape.to_vec(),
            });
        }
        let width = self.shape.last().copied().unwrap_or(0);
        if width == 0 || width != target_len || self.shape.len() < 2 {
            return Err(ShapeError::new("sum_to_shape", &self.shape, shape));
        }
        let mut array = vec![T::zero(); width];
        for row in self.array.chunks(width) {
            for (acc, &x) in array.iter_mut().zip_eq(row.iter()) {
                *acc += x;
            }
        }
        Ok(Tensor {
            array,
            shape: shape.to_vec(),
        })
    }

    pub fn add(&self, right: &Tensor<T>) -> Result<Tensor<T>, ShapeError> {
        self.zip_with(right, "add", |x, y| x + y)
    }

    pub fn sub(&self, right: &Tensor<T>) -> Result<Tensor<T>, ShapeError> {
        self.zip_with(right, "sub", |x, y| x - y)
    }

    pub fn mul(&self, right: &Tensor<T>) -> Result<Tensor<T>, ShapeError> {
        self.zip_with(right, "mul", |x, y| x * y)
    }

    pub fn scale(&self, factor: T) -> Tensor<T> {
        self.map(|x| x * factor)
    }

    pub fn sum(&self) -> T {
        self.array.iter().fold(T::zero(), |acc, &x| acc + x)
    }

    /// Mean over every element; zero for an empty tensor.
    pub fn mean(&self) -> T {
        if self.array.is_empty() {
            return T::zero();
        }
        self.sum() / T::from_f64(self.array.len() as f64)
    }

    pub fn transpose(&self) -> Result<Tensor<T>, ShapeError> {
        let &[rows, cols] = self.shape.as_slice() else {
            return Err(ShapeError::new("transpose", &self.shape, &[]));
        };
        let mut array = Vec::with_capacity(self.array.len());
        for j in 0..cols {
            for i in 0..rows {
                array.push(self.array[i * cols + j]);
            }
        }
        Ok(Tensor {
            array,
            shape: vec![cols, rows],
        })
    }

    /// Matrix product of `[m, k]` and `[k, n]`. Output rows are computed in parallel.
    pub fn matmul(&self, right: &Tensor<T>) -> Result<Tensor<T>, ShapeError> {
        let (&[m, k], &[k2, n]) = (self.shape.as_slice(), right.shape.as_slice()) else {
            return Err(ShapeError::new("matmul", &self.shape, &right.shape));
        };
        if k != k2 {
            return Err(ShapeError::new("matmul", &self.shape, &right.shape));
        }

        let mut array = vec![T::zero(); m * n];
        if n > 0 {
            array
                .par_chunks_mut(n)
                .enumerate()
                .for_each(|(i, out_row)| {
                    let left_row = &self.array[i * k..(i + 1) * k];
                    for (p, &a) in left_row.iter().enumerate() {
                        let right_row = &right.array[p * n..(p + 1) * n];
                        for (out, &b) in out_row.iter_mut().zip(right_row.iter()) {
                            *out += a * b;
                        }
                    }
                });
        }
        Ok(Tensor {
            array,
            shape: vec![m, n],
        })
    }
}

impl<T> Neg for &Tensor<T>
where
    T: Numeric,
{
    type Output = Tensor<T>;

    fn neg(self) -> Self::Output {
        self.map(|x| -x)
    }
}

impl<T> fmt::Display for Tensor<T>
where
    T: Numeric,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Tensor[{}]({})",
            self.shape.iter().join("x"),
            self.array.iter().join(", ")
        )
    }
}

#[test]
fn test_get_2x2x2() {
    let matrix = Tensor::new(
        vec![0.0, 1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0],
        vec![2, 2, 2],
    );
    assert_eq!(matrix.get(&[0, 0, 0]), Some(&0.0));
    assert_eq!(matrix.get(&[0, 1, 0]), Some(&2.0));
    assert_eq!(matrix.get(&[1, 1, 1]), Some(&7.0));
    assert_eq!(matrix.get(&[2, 0, 0]), None);
    assert_eq!(matrix.get(&[0, 0]), None);
}

#[test]
fn test_matmul_2x2() {
    let matrix: Tensor<f64> = Tensor::from([[0.0, 1.0], [2.0, 3.0]]);
    let diag: Tensor<f64> = Tensor::from([[1.0], [1.0]]);
    let e1: Tensor<f64> = Tensor::from([[0.0], [1.0]]);

    assert_eq!(
        matrix.matmul(&diag).unwrap(),
        Tensor::new(vec![1.0, 5.0], vec![2, 1])
    );
    assert_eq!(
        matrix.matmul(&e1).unwrap(),
        Tensor::new(vec![1.0, 3.0], vec![2, 1])
    );
    assert!(diag.matmul(&diag).is_err());
}

#[test]
fn test_row_broadcast_and_reduce() {
    let matrix = Tensor::new((0..6).map(f64::from).collect(), vec![3, 2]);
    let bias = Tensor::new(vec![10.0, 20.0], vec![1, 2]);
    let sum = matrix.add(&bias).unwrap();
    assert_eq!(sum.array(), &[10.0, 21.0, 12.0, 23.0, 14.0, 25.0]);

    let reduced = sum.sum_to_shape(&[1, 2]).unwrap();
    assert_eq!(reduced, Tensor::new(vec![36.0, 69.0], vec![1, 2]));
}

#[test]
fn test_transpose() {
    let matrix: Tensor<f32> = Tensor::from([[1.0, 2.0, 3.0], [4.0, 5.0, 6.0]]);
    let t = matrix.transpose().unwrap();
    assert_eq!(t.shape(), &[3, 2]);
    assert_eq!(t.array(), &[1.0, 4.0, 2.0, 5.0, 3.0, 6.0]);
}
