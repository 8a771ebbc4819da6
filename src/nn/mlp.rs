use serde::{Deserialize, Serialize};

use std::marker::PhantomData;

use crate::dataset::{Dataset, FeatureBatch};
use crate::nn::model::{fetch_scalar, Model, ModelInfo};
use crate::nn::{RegressionHead, LOSS_FETCH_INDEX};
use crate::runtime::{FeedDict, Fetches, Graph, Initializer, NodeId, Saver};
use crate::tensor::{Numeric, Tensor};
use crate::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Activation {
    Tanh,
    Relu,
}

/// Fully connected network. Hidden layers use `activation`, the output layer is linear.
#[derive(Debug, Clone)]
pub struct Mlp<T: Numeric> {
    head: RegressionHead,
    layers: Vec<(NodeId, NodeId)>,
    saver: Saver,
    _elem: PhantomData<fn() -> T>,
}

impl<T: Numeric> Mlp<T> {
    /// `layer_sizes` lists the width of every layer, input first: `[784, 128, 300]` is one
    /// hidden layer of 128 units.
    pub fn new(
        graph: &mut Graph<T>,
        layer_sizes: &[usize],
        activation: Activation,
        learning_rate: f64,
    ) -> Result<Mlp<T>> {
        let (&input_dim, rest) = layer_sizes
            .split_first()
            .ok_or_else(|| Error::Config("an mlp needs at least an input and an output layer".into()))?;
        if rest.is_empty() {
            return Err(Error::Config(format!(
                "an mlp needs at least an input and an output layer, got {layer_sizes:?}"
            )));
        }

        let input = graph.placeholder("input");
        let target = graph.placeholder("target");

        let mut layers = Vec::with_capacity(rest.len());
        let mut fan_in = input_dim;
        let mut hidden = input;
        for (i, &width) in rest.iter().enumerate() {
            let weights = graph.variable(
                &format!("mlp/layer{i}/weights"),
                vec![fan_in, width],
                Initializer::Normal {
                    mean: 0.0,
                    std_dev: (1.0 / fan_in.max(1) as f64).sqrt(),
                },
            )?;
            let bias = graph.variable(
                &format!("mlp/layer{i}/bias"),
                vec![1, width],
                Initializer::Zeros,
            )?;
            let projected = graph.matmul(hidden, weights)?;
            let pre_activation = graph.add(projected, bias)?;
            hidden = if i + 1 == rest.len() {
                pre_activation
            } else {
                match activation {
                    Activation::Tanh => graph.tanh(pre_activation)?,
                    Activation::Relu => graph.relu(pre_activation)?,
                }
            };
            layers.push((weights, bias));
            fan_in = width;
        }

        let head = RegressionHead::build(graph, input, target, hidden, learning_rate)?;
        Ok(Mlp {
            head,
            layers,
            saver: Saver::new(),
            _elem: PhantomData,
        })
    }

    pub fn params(&self) -> Vec<NodeId> {
        self.layers
            .iter()
            .flat_map(|&(weights, bias)| [weights, bias])
            .collect()
    }

    pub fn num_layers(&self) -> usize {
        self.layers.len()
    }
}

impl<T: Numeric> Model<T> for Mlp<T> {
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
fn test_mlp_creation() {
    let mut graph = Graph::<f32>::new();
    let mlp = Mlp::new(&mut graph, &[2, 4, 2], Activation::Tanh, 1e-2).unwrap();
    assert_eq!(mlp.num_layers(), 2);
    assert_eq!(mlp.params().len(), 4);
    assert_eq!(graph.variables().count(), 4);

    assert!(Mlp::new(&mut Graph::<f32>::new(), &[2], Activation::Relu, 1e-2).is_err());
}

#[test]
fn test_mlp() {
    use crate::dataset::ArrayDataset;
    use crate::runtime::GraphSession;

    let mut graph = Graph::<f64>::new();
    let mlp = Mlp::new(&mut graph, &[2, 8, 2], Activation::Tanh, 0.1).unwrap();
    let mut sess = GraphSession::with_seed(graph, 42);
    mlp.initialize_model(&mut sess).unwrap();

    let features = Tensor::new(vec![1.0, 2.0], vec![1, 2]);
    let targets = Tensor::new(vec![-1.0, 1.0], vec![1, 2]);
    let mut dataset = ArrayDataset::new(features, targets).unwrap();

    let mut losses = Vec::new();
    for _ in 0..100 {
        for batch in mlp.iter_batches(&mut dataset, 1) {
            let (fetches, feed) = batch.unwrap();
            let values = mlp.fit(&mut sess, &fetches, &feed).unwrap();
            losses.push(mlp.get_training_loss(&values).unwrap());
        }
    }
    let (first, last): (f64, f64) = (losses[0], losses[losses.len() - 1]);
    assert!(last < first, "first={first}, last={last}");
    assert!(last < 0.05, "last={last}");
}
