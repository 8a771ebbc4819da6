//! Generic training and evaluation loops over any [`Model`].

use log::{debug, info};

use crate::config::TrainConfig;
use crate::dataset::Dataset;
use crate::nn::Model;
use crate::runtime::Session;
use crate::tensor::functional::square;
use crate::tensor::{Numeric, ShapeError, Tensor, TensorList};
use crate::Result;

#[derive(Debug, Clone, PartialEq)]
pub struct TrainReport<T: Numeric> {
    /// Mean training loss of every epoch, in order.
    pub epoch_losses: Vec<T>,
    pub batches_per_epoch: usize,
}

impl<T: Numeric> TrainReport<T> {
    pub fn final_loss(&self) -> Option<T> {
        self.epoch_losses.last().copied()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation<T: Numeric, Truth> {
    pub predictions: TensorList<T>,
    pub truth: Truth,
}

/// Restores or initializes the model, runs `config.epochs` passes over `dataset` and saves
/// the result when `config.model_output_path` is set.
pub fn train<T, M, S, D>(
    model: &M,
    sess: &mut S,
    dataset: &mut D,
    config: &TrainConfig,
) -> Result<TrainReport<T>>
where
    T: Numeric,
    M: Model<T>,
    S: Session<T>,
    D: Dataset<T, Batch = M::Batch>,
{
    config.validate()?;
    match &config.model_input_path {
        Some(path) => {
            info!("restoring model from {}", path.display());
            model.load(sess, path)?;
        }
        None => model.initialize_model(sess)?,
    }

    let mut epoch_losses = Vec::with_capacity(config.epochs);
    let mut batches_per_epoch = 0;
    for epoch in 0..config.epochs {
        let mut total = T::zero();
        let mut count = 0;
        for (batch_idx, batch) in model.iter_batches(dataset, config.batch_size).enumerate() {
            let (fetches, feed) = batch?;
            let fit_fetches = model.fit(sess, &fetches, &feed)?;
            let loss = model.get_training_loss(&fit_fetches)?;
            if config.log_every > 0 && batch_idx % config.log_every == 0 {
                debug!("epoch={epoch} batch={batch_idx} loss={loss}");
            }
            total += loss;
            count += 1;
        }

        let mean_loss = if count == 0 {
            T::zero()
        } else {
            total / T::from_f64(count as f64)
        };
        info!(
            "epoch {}/{}: {count} batches, mean training loss {mean_loss}",
            epoch + 1,
            config.epochs
        );
        epoch_losses.push(mean_loss);
        batches_per_epoch = count;
    }

    if let Some(path) = &config.model_output_path {
        model.save(sess, path)?;
    }
    Ok(TrainReport {
        epoch_losses,
        batches_per_epoch,
    })
}

/// `prep_predict`, then `predict`, then `post_predict`.
pub fn evaluate<T, M, S, D>(
    model: &M,
    sess: &mut S,
    dataset: &mut D,
    cross_eval: bool,
) -> Result<Evaluation<T, M::Truth>>
where
    T: Numeric,
    M: Model<T>,
    S: Session<T>,
    D: Dataset<T, Batch = M::Batch>,
{
    let (fetches, feed, truth) = model.prep_predict(dataset, cross_eval)?;
    let predictions = model.predict(sess, &fetches, &feed)?;
    let predictions = model.post_predict(predictions, cross_eval)?;
    debug!("evaluated {} prediction fetches", predictions.len());
    Ok(Evaluation { predictions, truth })
}

pub fn mean_squared_error<T: Numeric>(predictions: &Tensor<T>, truth: &Tensor<T>) -> Result<T> {
    if predictions.shape() != truth.shape() {
        return Err(ShapeError::new("mean_squared_error", predictions.shape(), truth.shape()).into());
    }
    Ok(square(&predictions.sub(truth)?).mean())
}

#[test]
fn test_mean_squared_error() {
    let predictions = Tensor::new(vec![1.0, 2.0, 3.0, 4.0], vec![2, 2]);
    let truth = Tensor::new(vec![1.0, 0.0, 3.0, 6.0], vec![2, 2]);
    assert_eq!(mean_squared_error(&predictions, &truth).unwrap(), 2.0);
    assert!(mean_squared_error(&predictions, &Tensor::zeros(vec![1, 2])).is_err());
}
