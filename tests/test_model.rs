use attalos::dataset::Dataset;
use attalos::nn::{BaseModel, Model};
use attalos::runtime::{self, FeedDict, Fetches, Graph, NodeId, Saver, Session};
use attalos::tensor::{Tensor, TensorList};
use attalos::Error;

/// Hands out its batch index as the batch, counting every pull.
struct CountingDataset {
    num_items: usize,
    pulled: usize,
}

impl CountingDataset {
    fn new(num_items: usize) -> CountingDataset {
        CountingDataset {
            num_items,
            pulled: 0,
        }
    }
}

impl Dataset<f64> for CountingDataset {
    type Batch = usize;

    fn num_items(&self) -> usize {
        self.num_items
    }

    fn get_next_batch(&mut self, _batch_size: usize) -> attalos::Result<usize> {
        self.pulled += 1;
        Ok(self.pulled - 1)
    }
}

/// Feeds the batch index into a single placeholder; the training loss hook stays default.
struct IndexModel {
    input: NodeId,
    saver: Saver,
}

impl IndexModel {
    fn new() -> IndexModel {
        let mut graph = Graph::<f64>::new();
        IndexModel {
            input: graph.placeholder("index"),
            saver: Saver::new(),
        }
    }
}

impl Model<f64> for IndexModel {
    type Batch = usize;
    type Truth = ();

    fn saver(&self) -> &Saver {
        &self.saver
    }

    fn prep_fit(&self, data: usize) -> attalos::Result<(Fetches, FeedDict<f64>)> {
        let feed = FeedDict::from([(self.input, Tensor::scalar(data as f64))]);
        Ok((vec![self.input], feed))
    }
}

/// Records every run and answers with one zero scalar per fetch.
#[derive(Default)]
struct RecordingSession {
    runs: Vec<(Vec<NodeId>, FeedDict<f64>)>,
    initialized: usize,
}

impl Session<f64> for RecordingSession {
    fn run(&mut self, fetches: &[NodeId], feed: &FeedDict<f64>) -> runtime::Result<TensorList<f64>> {
        self.runs.push((fetches.to_vec(), feed.clone()));
        Ok(fetches.iter().map(|_| Tensor::scalar(0.0)).collect())
    }

    fn initialize_all_variables(&mut self) -> runtime::Result<()> {
        self.initialized += 1;
        Ok(())
    }

    fn variable_names(&self) -> Vec<String> {
        Vec::new()
    }

    fn variable_shape(&self, _name: &str) -> Option<Vec<usize>> {
        None
    }

    fn variables(&self) -> Vec<(String, Tensor<f64>)> {
        Vec::new()
    }

    fn assign(&mut self, name: &str, _value: Tensor<f64>) -> runtime::Result<()> {
        Err(runtime::RuntimeError::UnknownVariable(name.to_string()))
    }
}

#[test]
fn test_base_model_hooks_not_implemented() {
    let model = BaseModel::new();
    assert!(matches!(
        Model::<f64>::prep_fit(&model, ()),
        Err(Error::NotImplemented("prep_fit"))
    ));
    assert!(matches!(
        Model::<f64>::get_training_loss(&model, &[Tensor::scalar(1.0)]),
        Err(Error::NotImplemented("get_training_loss"))
    ));

    struct Unit;
    impl Dataset<f64> for Unit {
        type Batch = ();
        fn num_items(&self) -> usize {
            4
        }
        fn get_next_batch(&mut self, _batch_size: usize) -> attalos::Result<()> {
            Ok(())
        }
    }
    assert!(matches!(
        Model::<f64>::prep_predict(&model, &mut Unit, true),
        Err(Error::NotImplemented("prep_predict"))
    ));

    // iter_batches surfaces the failing hook on every item
    let items: Vec<_> = Model::<f64>::iter_batches(&model, &mut Unit, 2).collect();
    assert_eq!(items.len(), 2);
    assert!(items
        .iter()
        .all(|item| matches!(item, Err(Error::NotImplemented("prep_fit")))));
}

#[test]
fn test_base_model_post_predict_is_identity() {
    let model = BaseModel::new();
    let fetches = vec![Tensor::new(vec![1.0, 2.0], vec![2]), Tensor::scalar(3.0)];
    for cross_eval in [false, true] {
        let out = Model::<f64>::post_predict(&model, fetches.clone(), cross_eval).unwrap();
        assert_eq!(out, fetches);
    }
    let empty: TensorList<f64> = Vec::new();
    assert!(Model::<f64>::post_predict(&model, empty, false)
        .unwrap()
        .is_empty());
}

#[test]
fn test_base_model_predict_feats_without_info() {
    let model = BaseModel::new();
    let mut sess = RecordingSession::default();
    let res = Model::<f64>::predict_feats(&model, &mut sess, Tensor::zeros(vec![1, 2]));
    assert!(matches!(res, Err(Error::MissingModelInfo(_))));
    assert!(sess.runs.is_empty());
}

#[test]
fn test_iter_batches_drops_remainder() {
    let model = IndexModel::new();
    for (num_items, batch_size, expected) in [(10, 3, 3), (9, 3, 3), (2, 3, 0), (0, 4, 0), (7, 1, 7)] {
        let mut dataset = CountingDataset::new(num_items);
        let batches = model.iter_batches(&mut dataset, batch_size);
        assert_eq!(batches.len(), expected);
        let collected: Vec<_> = batches.map(Result::unwrap).collect();
        assert_eq!(collected.len(), expected);
        assert_eq!(dataset.pulled, expected);

        // batches come out in dataset order
        for (i, (fetches, feed)) in collected.iter().enumerate() {
            assert_eq!(fetches, &vec![model.input]);
            assert_eq!(feed[&model.input], Tensor::scalar(i as f64));
        }
    }
}

#[test]
fn test_iter_batches_is_lazy() {
    let model = IndexModel::new();
    let mut dataset = CountingDataset::new(100);
    {
        let mut batches = model.iter_batches(&mut dataset, 10);
        assert!(batches.next().is_some());
        assert!(batches.next().is_some());
    }
    assert_eq!(dataset.pulled, 2);
}

#[test]
fn test_iter_batches_zero_batch_size() {
    let model = IndexModel::new();
    let mut dataset = CountingDataset::new(5);
    assert_eq!(model.iter_batches(&mut dataset, 0).count(), 0);
    assert_eq!(dataset.pulled, 0);
}

#[test]
fn test_fit_and_predict_forward_to_session() {
    let model = IndexModel::new();
    let mut sess = RecordingSession::default();
    model.initialize_model(&mut sess).unwrap();
    assert_eq!(sess.initialized, 1);

    let feed = FeedDict::from([(model.input, Tensor::new(vec![1.0, 2.0], vec![1, 2]))]);
    let fetches = vec![model.input, model.input];

    let fit = model.fit(&mut sess, &fetches, &feed).unwrap();
    assert_eq!(fit.len(), 2);
    let predict = model.predict(&mut sess, &fetches[..1], &feed).unwrap();
    assert_eq!(predict.len(), 1);

    assert_eq!(sess.runs.len(), 2);
    assert_eq!(sess.runs[0], (fetches.clone(), feed.clone()));
    assert_eq!(sess.runs[1], (fetches[..1].to_vec(), feed));
}

#[test]
fn test_default_training_loss_not_implemented() {
    let model = IndexModel::new();
    assert!(matches!(
        model.get_training_loss(&[Tensor::scalar(0.5)]),
        Err(Error::NotImplemented("get_training_loss"))
    ));
}

#[test]
fn test_load_propagates_saver_errors() {
    let model = IndexModel::new();
    let mut sess = RecordingSession::default();
    let path = std::env::temp_dir().join(format!(
        "attalos-test-{}-no-such-checkpoint.json",
        std::process::id()
    ));
    assert!(matches!(
        model.load(&mut sess, &path),
        Err(Error::Runtime(runtime::RuntimeError::Io(_)))
    ));
}
