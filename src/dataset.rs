use log::debug;
use rand::seq::SliceRandom;
use rand::Rng;

use crate::tensor::{Numeric, Tensor};
use crate::{Error, Result};

/// Source of training batches, consumed sequentially.
pub trait Dataset<T: Numeric> {
    type Batch;

    /// Number of items (images, samples) the dataset holds.
    fn num_items(&self) -> usize;

    /// Returns the next `batch_size` items, continuing where the previous call stopped.
    fn get_next_batch(&mut self, batch_size: usize) -> Result<Self::Batch>;
}

/// Paired feature and target rows.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureBatch<T: Numeric> {
    pub features: Tensor<T>,
    pub targets: Tensor<T>,
}

impl<T: Numeric> FeatureBatch<T> {
    pub fn len(&self) -> usize {
        self.features.num_rows()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// In-memory dataset of `[n, d_in]` features and `[n, d_out]` targets.
///
/// The read cursor wraps around the end, so a batch may mix the last and the first rows.
#[derive(Debug, Clone)]
pub struct ArrayDataset<T: Numeric> {
    features: Tensor<T>,
    targets: Tensor<T>,
    order: Vec<usize>,
    cursor: usize,
}

impl<T: Numeric> ArrayDataset<T> {
    pub fn new(features: Tensor<T>, targets: Tensor<T>) -> Result<ArrayDataset<T>> {
        if features.shape().len() != 2 || targets.shape().len() != 2 {
            return Err(Error::Dataset(format!(
                "features and targets must be matrices, got shapes {:?} and {:?}",
                features.shape(),
                targets.shape()
            )));
        }
        if features.num_rows() != targets.num_rows() {
            return Err(Error::Dataset(format!(
                "features have {} rows but targets have {}",
                features.num_rows(),
                targets.num_rows()
            )));
        }
        let order = (0..features.num_rows()).collect();
        Ok(ArrayDataset {
            features,
            targets,
            order,
            cursor: 0,
        })
    }

    pub fn features(&self) -> &Tensor<T> {
        &self.features
    }

    pub fn feature_dim(&self) -> usize {
        self.features.shape()[1]
    }

    pub fn target_dim(&self) -> usize {
        self.targets.shape()[1]
    }

    /// Rewinds the cursor without touching the row order.
    pub fn reset(&mut self) {
        self.cursor = 0;
    }

    /// Permutes the row order and rewinds the cursor.
    pub fn shuffle<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        self.order.shuffle(rng);
        self.cursor = 0;
    }
}

impl<T: Numeric> Dataset<T> for ArrayDataset<T> {
    type Batch = FeatureBatch<T>;

    fn num_items(&self) -> usize {
        self.order.len()
    }

    fn get_next_batch(&mut self, batch_size: usize) -> Result<FeatureBatch<T>> {
        let num_items = self.order.len();
        if num_items == 0 {
            return Err(Error::Dataset("cannot draw a batch from an empty dataset".into()));
        }
        let indices: Vec<usize> = (0..batch_size)
            .map(|k| self.order[(self.cursor + k) % num_items])
            .collect();
        self.cursor = (self.cursor + batch_size) % num_items;
        debug!("drew batch of {batch_size}, cursor now at {}", self.cursor);

        Ok(FeatureBatch {
            features: self.features.gather_rows(&indices)?,
            targets: self.targets.gather_rows(&indices)?,
        })
    }
}
