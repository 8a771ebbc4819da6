mod linear;
mod mlp;
pub mod model;

pub use linear::LinearRegression;
pub use mlp::{Activation, Mlp};
pub use model::{BaseModel, Batches, Model, ModelInfo};

use log::debug;

use crate::dataset::{Dataset, FeatureBatch};
use crate::runtime::{FeedDict, Fetches, Graph, NodeId};
use crate::tensor::{Numeric, Tensor};
use crate::Result;

/// Position of the loss among the values [`RegressionHead::prep_fit`] asks for.
pub(crate) const LOSS_FETCH_INDEX: usize = 1;

/// Input/target placeholders, squared-error loss and training op shared by the regressors
/// mapping feature vectors onto target vectors.
#[derive(Debug, Clone)]
pub(crate) struct RegressionHead {
    input: NodeId,
    target: NodeId,
    prediction: NodeId,
    loss: NodeId,
    train_op: NodeId,
    info: ModelInfo,
}

impl RegressionHead {
    pub(crate) fn build<T: Numeric>(
        graph: &mut Graph<T>,
        input: NodeId,
        target: NodeId,
        prediction: NodeId,
        learning_rate: f64,
    ) -> Result<RegressionHead> {
        let diff = graph.sub(prediction, target)?;
        let squared = graph.square(diff)?;
        let loss = graph.mean(squared)?;
        let train_op = graph.minimize(loss, learning_rate)?;

        let info = ModelInfo::from([
            (model::INPUT.to_string(), input),
            (model::PREDICTION.to_string(), prediction),
        ]);
        Ok(RegressionHead {
            input,
            target,
            prediction,
            loss,
            train_op,
            info,
        })
    }

    pub(crate) fn info(&self) -> &ModelInfo {
        &self.info
    }

    pub(crate) fn prediction(&self) -> NodeId {
        self.prediction
    }

    /// Fetches `[train_op, loss]`, the loss at [`LOSS_FETCH_INDEX`].
    pub(crate) fn prep_fit<T: Numeric>(&self, data: FeatureBatch<T>) -> (Fetches, FeedDict<T>) {
        let feed = FeedDict::from([(self.input, data.features), (self.target, data.targets)]);
        (vec![self.train_op, self.loss], feed)
    }

    pub(crate) fn prep_predict<T, D>(
        &self,
        dataset: &mut D,
    ) -> Result<(Fetches, FeedDict<T>, Tensor<T>)>
    where
        T: Numeric,
        D: Dataset<T, Batch = FeatureBatch<T>>,
    {
        let num_items = dataset.num_items();
        let batch = dataset.get_next_batch(num_items)?;
        debug!("prepared prediction over {num_items} items");
        let feed = FeedDict::from([(self.input, batch.features)]);
        Ok((vec![self.prediction], feed, batch.targets))
    }
}
