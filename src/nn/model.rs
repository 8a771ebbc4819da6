//! The contract a model implements to be driven by [`crate::driver`].
//!
//! Implementors must provide:
//! * [`Model::saver`]
//! * [`Model::prep_fit`]
//! * [`Model::prep_predict`]
//! * [`Model::get_training_loss`]
//!
//! and may override [`Model::post_predict`] plus any of the defaults, which hand their
//! arguments straight to the [`Session`].

use log::warn;

use std::collections::HashMap;
use std::iter::FusedIterator;
use std::marker::PhantomData;
use std::path::Path;

use crate::dataset::Dataset;
use crate::runtime::{FeedDict, Fetches, NodeId, Saver, Session};
use crate::tensor::{Numeric, Tensor, TensorList};
use crate::{Error, Result};

pub const INPUT: &str = "input";
pub const PREDICTION: &str = "prediction";

/// Named graph nodes a model exposes; [`Model::predict_feats`] needs [`INPUT`] and
/// [`PREDICTION`].
pub type ModelInfo = HashMap<String, NodeId>;

pub trait Model<T: Numeric> {
    /// One batch as handed out by the dataset.
    type Batch;
    /// Ground truth returned alongside the prediction arguments.
    type Truth;

    fn saver(&self) -> &Saver;

    fn model_info(&self) -> Option<&ModelInfo> {
        None
    }

    fn initialize_model<S>(&self, sess: &mut S) -> Result<()>
    where
        S: Session<T> + ?Sized,
    {
        sess.initialize_all_variables()?;
        Ok(())
    }

    fn save<S>(&self, sess: &S, model_output_path: &Path) -> Result<()>
    where
        S: Session<T> + ?Sized,
    {
        self.saver().save::<T, S>(sess, model_output_path)?;
        Ok(())
    }

    fn load<S>(&self, sess: &mut S, model_input_path: &Path) -> Result<()>
    where
        S: Session<T> + ?Sized,
    {
        self.saver().restore::<T, S>(sess, model_input_path)?;
        Ok(())
    }

    /// Lazily yields `prep_fit` of each full batch: `num_items / batch_size` items, the
    /// remainder is never yielded. Each item pulls one batch from `dataset`.
    fn iter_batches<'a, D>(&'a self, dataset: &'a mut D, batch_size: usize) -> Batches<'a, T, Self, D>
    where
        Self: Sized,
        D: Dataset<T, Batch = Self::Batch>,
    {
        Batches::new(self, dataset, batch_size)
    }

    /// Runs the fetches built by [`Model::prep_fit`].
    fn fit<S>(&self, sess: &mut S, fetches: &[NodeId], feed: &FeedDict<T>) -> Result<TensorList<T>>
    where
        S: Session<T> + ?Sized,
    {
        run(sess, fetches, feed)
    }

    /// Predicts straight from raw features, bypassing [`Model::prep_predict`].
    fn predict_feats<S>(&self, sess: &mut S, features: Tensor<T>) -> Result<Tensor<T>>
    where
        S: Session<T> + ?Sized,
    {
        let info = self.model_info().ok_or(Error::MissingModelInfo(INPUT))?;
        let &input = info.get(INPUT).ok_or(Error::MissingModelInfo(INPUT))?;
        let &prediction = info
            .get(PREDICTION)
            .ok_or(Error::MissingModelInfo(PREDICTION))?;

        let feed = FeedDict::from([(input, features)]);
        let mut values = run(sess, &[prediction], &feed)?;
        values.pop().ok_or(Error::MissingFetch { index: 0, got: 0 })
    }

    /// Runs the fetches built by [`Model::prep_predict`].
    fn predict<S>(&self, sess: &mut S, fetches: &[NodeId], feed: &FeedDict<T>) -> Result<TensorList<T>>
    where
        S: Session<T> + ?Sized,
    {
        run(sess, fetches, feed)
    }

    /// Turns one batch into the `(fetches, feed)` handed to [`Model::fit`].
    fn prep_fit(&self, _data: Self::Batch) -> Result<(Fetches, FeedDict<T>)> {
        Err(Error::NotImplemented("prep_fit"))
    }

    /// Builds the `(fetches, feed)` handed to [`Model::predict`], plus the truth used to
    /// score the predictions.
    fn prep_predict<D>(
        &self,
        _dataset: &mut D,
        _cross_eval: bool,
    ) -> Result<(Fetches, FeedDict<T>, Self::Truth)>
    where
        D: Dataset<T, Batch = Self::Batch>,
    {
        Err(Error::NotImplemented("prep_predict"))
    }

    /// Post-processing hook for the values returned by [`Model::predict`]. No-op by default.
    fn post_predict(&self, predict_fetches: TensorList<T>, _cross_eval: bool) -> Result<TensorList<T>> {
        Ok(predict_fetches)
    }

    /// Extracts the training loss from the values returned by [`Model::fit`].
    fn get_training_loss(&self, _fit_fetches: &[Tensor<T>]) -> Result<T> {
        Err(Error::NotImplemented("get_training_loss"))
    }
}

fn run<T, S>(sess: &mut S, fetches: &[NodeId], feed: &FeedDict<T>) -> Result<TensorList<T>>
where
    T: Numeric,
    S: Session<T> + ?Sized,
{
    Ok(sess.run(fetches, feed)?)
}

/// The single element of fetched value `index`.
pub fn fetch_scalar<T: Numeric>(fetches: &[Tensor<T>], index: usize) -> Result<T> {
    let value = fetches.get(index).ok_or(Error::MissingFetch {
        index,
        got: fetches.len(),
    })?;
    value.item().ok_or(Error::NonScalarFetch(index))
}

/// Iterator returned by [`Model::iter_batches`].
pub struct Batches<'a, T, M, D>
where
    T: Numeric,
    M: Model<T>,
    D: Dataset<T, Batch = M::Batch>,
{
    model: &'a M,
    dataset: &'a mut D,
    batch_size: usize,
    remaining: usize,
    _elem: PhantomData<fn() -> T>,
}

impl<'a, T, M, D> Batches<'a, T, M, D>
where
    T: Numeric,
    M: Model<T>,
    D: Dataset<T, Batch = M::Batch>,
{
    fn new(model: &'a M, dataset: &'a mut D, batch_size: usize) -> Self {
        let remaining = match dataset.num_items().checked_div(batch_size) {
            Some(num_batches) => num_batches,
            None => {
                warn!("batch size of 0 requested, no batches will be produced");
                0
            }
        };
        Batches {
            model,
            dataset,
            batch_size,
            remaining,
            _elem: PhantomData,
        }
    }
}

impl<'a, T, M, D> Iterator for Batches<'a, T, M, D>
where
    T: Numeric,
    M: Model<T>,
    D: Dataset<T, Batch = M::Batch>,
{
    type Item = Result<(Fetches, FeedDict<T>)>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        self.remaining -= 1;
        let data = match self.dataset.get_next_batch(self.batch_size) {
            Ok(data) => data,
            Err(e) => return Some(Err(e)),
        };
        Some(self.model.prep_fit(data))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<'a, T, M, D> ExactSizeIterator for Batches<'a, T, M, D>
where
    T: Numeric,
    M: Model<T>,
    D: Dataset<T, Batch = M::Batch>,
{
}

impl<'a, T, M, D> FusedIterator for Batches<'a, T, M, D>
where
    T: Numeric,
    M: Model<T>,
    D: Dataset<T, Batch = M::Batch>,
{
}

/// A model that overrides nothing: every hook fails with [`Error::NotImplemented`].
#[derive(Debug, Clone, Default)]
pub struct BaseModel {
    saver: Saver,
}

impl BaseModel {
    pub fn new() -> BaseModel {
        BaseModel::default()
    }
}

impl<T: Numeric> Model<T> for BaseModel {
    type Batch = ();
    type Truth = ();

    fn saver(&self) -> &Saver {
        &self.saver
    }
}
