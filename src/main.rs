use attalos::config::TrainConfig;
use attalos::dataset::{ArrayDataset, FeatureBatch};
use attalos::driver::{self, mean_squared_error};
use attalos::nn::{LinearRegression, Mlp, Model};
use attalos::runtime::{Graph, GraphSession};
use attalos::tensor::Tensor;
use attalos::{Error, Result};

use log::info;
use rand::prelude::*;
use rand_distr::Normal;

const INPUT_DIM: usize = 4;
const OUTPUT_DIM: usize = 2;
const NUM_SAMPLES: usize = 512;
const NOISE_STD_DEV: f64 = 0.01;

/// Samples `y = x @ w + 0.5 + noise` with a fixed random `w`.
fn synthetic_dataset(rng: &mut StdRng) -> Result<ArrayDataset<f64>> {
    let noise_dist = Normal::new(0.0, NOISE_STD_DEV).map_err(|e| Error::Config(e.to_string()))?;
    let true_weights = Tensor::new(
        (0..INPUT_DIM * OUTPUT_DIM)
            .map(|_| rng.gen_range(-1.0..1.0))
            .collect(),
        vec![INPUT_DIM, OUTPUT_DIM],
    );
    let features = Tensor::new(
        (0..NUM_SAMPLES * INPUT_DIM)
            .map(|_| rng.gen_range(-1.0..1.0))
            .collect(),
        vec![NUM_SAMPLES, INPUT_DIM],
    );
    let noise = Tensor::new(
        (0..NUM_SAMPLES * OUTPUT_DIM)
            .map(|_| 0.5 + noise_dist.sample(&mut *rng))
            .collect(),
        vec![NUM_SAMPLES, OUTPUT_DIM],
    );
    let targets = features.matmul(&true_weights)?.add(&noise)?;
    ArrayDataset::new(features, targets)
}

fn run<M>(model: M, graph: Graph<f64>, dataset: &mut ArrayDataset<f64>, config: &TrainConfig) -> Result<()>
where
    M: Model<f64, Batch = FeatureBatch<f64>, Truth = Tensor<f64>>,
{
    let mut sess = GraphSession::with_seed(graph, config.seed);
    let report = driver::train(&model, &mut sess, dataset, config)?;
    info!(
        "trained {} epochs of {} batches, final loss {:?}",
        report.epoch_losses.len(),
        report.batches_per_epoch,
        report.final_loss()
    );

    let evaluation = driver::evaluate(&model, &mut sess, dataset, false)?;
    for prediction in &evaluation.predictions {
        info!("mse={}", mean_squared_error(prediction, &evaluation.truth)?);
    }

    let sample = dataset.features().rows(0, 1)?;
    let prediction = model.predict_feats(&mut sess, sample.clone())?;
    info!("input {sample} -> prediction {prediction}");
    Ok(())
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = match std::env::args().nth(1) {
        Some(path) => TrainConfig::from_json_file(path)?,
        None => TrainConfig::default(),
    };
    info!("{config:?}");

    let mut rng = StdRng::seed_from_u64(config.seed);
    let mut dataset = synthetic_dataset(&mut rng)?;
    dataset.shuffle(&mut rng);

    let (input_dim, output_dim) = (dataset.feature_dim(), dataset.target_dim());
    let mut graph = Graph::new();
    if config.hidden_units == 0 {
        let model = LinearRegression::new(&mut graph, input_dim, output_dim, config.learning_rate)?;
        run(model, graph, &mut dataset, &config)
    } else {
        let model = Mlp::new(
            &mut graph,
            &[input_dim, config.hidden_units, output_dim],
            config.activation,
            config.learning_rate,
        )?;
        run(model, graph, &mut dataset, &config)
    }
}
