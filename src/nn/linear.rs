use std::marker::PhantomData;

use crate::dataset::{Dataset, FeatureBatch};
use crate::nn::model::{fetch_scalar, Model, ModelInfo};
use crate::nn::{RegressionHead, LOSS_FETCH_INDEX};
use crate::runtime::{FeedDict, Fetches, Graph, Initializer, NodeId, Saver};
use crate::tensor::{Numeric, Tensor};
use crate::Result;

/// `prediction = input @ weights + bias`, trained on mean squared error.
#[derive(Debug, Clone)]
pub struct LinearRegression<T: Numeric> {
    head: RegressionHead,
    weights: NodeId,
    bias: NodeId,
    saver: Saver,
    _elem: PhantomData<fn() -> T>,
}

impl<T: Numeric> LinearRegression<T> {
    pub fn new(
        graph: &mut Graph<T>,
        input_dim: usize,
        output_dim: usize,
        learning_rate: f64,
    ) -> Result<LinearRegression<T>> {
        let input = graph.placeholder("input");
        let target = graph.placeholder("target");
        let weights = graph.variable(
            "linear/weights",
            vec![input_dim, output_dim],
            Initializer::Normal {
                mean: 0.0,
                std_dev: 0.1,
            },
        )?;
        let bias = graph.variable("linear/bias", vec![1, output_dim], Initializer::Zeros)?;

        let projected = graph.matmul(input, weights)?;
        let prediction = graph.add(projected, bias)?;
        let head = RegressionHead::build(graph, input, target, prediction, learning_rate)?;

        Ok(LinearRegression {
            head,
            weights,
            bias,
            saver: Saver::new(),
            _elem: PhantomData,
        })
    }

    pub fn params(&self) -> [NodeId; 2] {
        [self.weights, self.bias]
    }
}

impl<T: Numeric> Model<T> for LinearRegression<T> {
    type Batch = FeatureBatch<T>;
    type Truth = Tensor<T>;

    fn saver(&self) -> &Saver {
        &self.saver
    }

    fn model_info(&self) -> Option<&ModelInfo> {
        Some(self.head.info())
    }

    fn prep_fit(&self, data: FeatureBatch<T>) -> Result<(Fetches, FeedDict<T>)> {
        Ok(self.head.prep_fit(data))
    }

    fn prep_predict<D>(
        &self,
        dataset: &mut D,
        _cross_eval: bool,
    ) -> Result<(Fetches, FeedDict<T>, Tensor<T>)>
    where
        D: Dataset<T, Batch = FeatureBatch<T>>,
    {
        self.head.prep_predict(dataset)
    }

    fn get_training_loss(&self, fit_fetches: &[Tensor<T>]) -> Result<T> {
        fetch_scalar(fit_fetches, LOSS_FETCH_INDEX)
    }
}

#[test]
fn test_layer_no_grad() {
    use crate::runtime::{GraphSession, Session};

    let mut graph: Graph<f64> = Graph::new();
    let model = LinearRegression::new(&mut graph, 2, 2, 0.1).unwrap();
    let mut sess = GraphSession::new(graph);
    sess.assign("linear/weights", Tensor::new_with_filler(vec![2, 2], 1.0))
        .unwrap();
    sess.assign("linear/bias", Tensor::new_with_filler(vec![1, 2], 1.0))
        .unwrap();

    let input = Tensor::new(vec![1.0, 2.0], vec![1, 2]);
    let res = model.predict_feats(&mut sess, input).unwrap();
    let expected = Tensor::new(vec![4.0, 4.0], vec![1, 2]);

    assert_eq!(res, expected);
}
