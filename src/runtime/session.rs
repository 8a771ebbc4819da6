use log::{debug, trace};
use rand::rngs::StdRng;
use rand::SeedableRng;

use std::collections::HashMap;

use super::error::{Result, RuntimeError};
use super::gradients::backward;
use super::{FeedDict, Graph, NodeId, Op};
use crate::optim::sgd::sgd_step;
use crate::tensor::functional;
use crate::tensor::{Numeric, Tensor, TensorList};

/// Execution context the model interface delegates to.
pub trait Session<T: Numeric> {
    /// Computes `fetches` given `feed`, returning one tensor per fetch in fetch order.
    fn run(&mut self, fetches: &[NodeId], feed: &FeedDict<T>) -> Result<TensorList<T>>;

    fn initialize_all_variables(&mut self) -> Result<()>;

    /// Names of every declared variable, initialized or not.
    fn variable_names(&self) -> Vec<String>;

    /// Declared shape of variable `name`, `None` if there is no such variable.
    fn variable_shape(&self, name: &str) -> Option<Vec<usize>>;

    /// Snapshot of every initialized variable.
    fn variables(&self) -> Vec<(String, Tensor<T>)>;

    fn assign(&mut self, name: &str, value: Tensor<T>) -> Result<()>;
}

/// [`Session`] over an owned [`Graph`].
#[derive(Debug)]
pub struct GraphSession<T: Numeric> {
    graph: Graph<T>,
    variables: HashMap<NodeId, Tensor<T>>,
    rng: StdRng,
}

struct PendingUpdate<T: Numeric> {
    learning_rate: T,
    grads: Vec<(NodeId, Tensor<T>)>,
}

impl<T: Numeric> GraphSession<T> {
    pub fn new(graph: Graph<T>) -> GraphSession<T> {
        GraphSession::with_seed(graph, 0)
    }

    /// The seed drives every random initializer, so two sessions with the same seed start
    /// from the same parameters.
    pub fn with_seed(graph: Graph<T>, seed: u64) -> GraphSession<T> {
        GraphSession {
            graph,
            variables: HashMap::new(),
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn graph(&self) -> &Graph<T> {
        &self.graph
    }

    fn eval(
        &self,
        id: NodeId,
        feed: &FeedDict<T>,
        cache: &mut HashMap<NodeId, Tensor<T>>,
        pending: &mut Vec<PendingUpdate<T>>,
    ) -> Result<Tensor<T>> {
        if let Some(value) = cache.get(&id) {
            return Ok(value.clone());
        }
        if let Some(value) = feed.get(&id) {
            cache.insert(id, value.clone());
            return Ok(value.clone());
        }

        let value = match self.graph.op(id)? {
            Op::Placeholder { name } => return Err(RuntimeError::UnfedPlaceholder(name.clone())),
            Op::Constant(value) => value.clone(),
            Op::Variable { name, .. } => self
                .variables
                .get(&id)
                .cloned()
                .ok_or_else(|| RuntimeError::UninitializedVariable(name.clone()))?,
            &Op::MatMul(a, b) => {
                let (va, vb) = self.eval_pair(a, b, feed, cache, pending)?;
                va.matmul(&vb)?
            }
            &Op::Add(a, b) => {
                let (va, vb) = self.eval_pair(a, b, feed, cache, pending)?;
                va.add(&vb)?
            }
            &Op::Sub(a, b) => {
                let (va, vb) = self.eval_pair(a, b, feed, cache, pending)?;
                va.sub(&vb)?
            }
            &Op::Mul(a, b) => {
                let (va, vb) = self.eval_pair(a, b, feed, cache, pending)?;
                va.mul(&vb)?
            }
            &Op::Tanh(a) => functional::tanh(&self.eval(a, feed, cache, pending)?),
            &Op::Relu(a) => functional::relu(&self.eval(a, feed, cache, pending)?),
            &Op::Square(a) => functional::square(&self.eval(a, feed, cache, pending)?),
            &Op::Mean(a) => Tensor::scalar(self.eval(a, feed, cache, pending)?.mean()),
            &Op::Minimize {
                loss,
                learning_rate,
            } => {
                let loss_value = self.eval(loss, feed, cache, pending)?;
                let grads = backward(&self.graph, loss, cache, feed)?;
                trace!("minimize {id:?}: {} variable gradients", grads.len());
                pending.push(PendingUpdate {
                    learning_rate,
                    grads,
                });
                loss_value
            }
        };
        cache.insert(id, value.clone());
        Ok(value)
    }

    fn eval_pair(
        &self,
        a: NodeId,
        b: NodeId,
        feed: &FeedDict<T>,
        cache: &mut HashMap<NodeId, Tensor<T>>,
        pending: &mut Vec<PendingUpdate<T>>,
    ) -> Result<(Tensor<T>, Tensor<T>)> {
        let va = self.eval(a, feed, cache, pending)?;
        let vb = self.eval(b, feed, cache, pending)?;
        Ok((va, vb))
    }
}

impl<T: Numeric> Session<T> for GraphSession<T> {
    fn run(&mut self, fetches: &[NodeId], feed: &FeedDict<T>) -> Result<TensorList<T>> {
        let mut cache = HashMap::new();
        let mut pending = Vec::new();
        let outputs = fetches
            .iter()
            .map(|&fetch| self.eval(fetch, feed, &mut cache, &mut pending))
            .collect::<Result<TensorList<T>>>()?;

        // Updates land after every fetch is computed, so all fetches see the same parameters.
        for update in pending {
            for (id, grad) in update.grads {
                let param = self
                    .variables
                    .get(&id)
                    .ok_or(RuntimeError::MissingValue(id))?;
                let updated = sgd_step(param, &grad, update.learning_rate)?;
                self.variables.insert(id, updated);
            }
        }
        Ok(outputs)
    }

    fn initialize_all_variables(&mut self) -> Result<()> {
        let mut initialized = HashMap::new();
        for (id, _, shape) in self.graph.variables() {
            let Op::Variable { init, .. } = self.graph.op(id)? else {
                continue;
            };
            initialized.insert(id, init.sample(shape, &mut self.rng)?);
        }
        debug!("initialized {} variables", initialized.len());
        self.variables = initialized;
        Ok(())
    }

    fn variable_names(&self) -> Vec<String> {
        self.graph
            .variables()
            .map(|(_, name, _)| name.to_string())
            .collect()
    }

    fn variable_shape(&self, name: &str) -> Option<Vec<usize>> {
        self.graph
            .variables()
            .find(|(_, var_name, _)| *var_name == name)
            .map(|(_, _, shape)| shape.to_vec())
    }

    fn variables(&self) -> Vec<(String, Tensor<T>)> {
        self.graph
            .variables()
            .filter_map(|(id, name, _)| {
                self.variables
                    .get(&id)
                    .map(|value| (name.to_string(), value.clone()))
            })
            .collect()
    }

    fn assign(&mut self, name: &str, value: Tensor<T>) -> Result<()> {
        let (id, _, shape) = self
            .graph
            .variables()
            .find(|(_, var_name, _)| *var_name == name)
            .ok_or_else(|| RuntimeError::UnknownVariable(name.to_string()))?;
        if value.shape() != shape {
            return Err(RuntimeError::VariableShape {
                name: name.to_string(),
                expected: shape.to_vec(),
                got: value.shape().to_vec(),
            });
        }
        self.variables.insert(id, value);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::Initializer;

    fn affine_graph() -> (Graph<f64>, NodeId, NodeId, NodeId) {
        let mut graph = Graph::new();
        let x = graph.placeholder("x");
        let w = graph
            .variable("w", vec![2, 1], Initializer::Constant(1.0))
            .unwrap();
        let b = graph
            .variable("b", vec![1, 1], Initializer::Constant(0.5))
            .unwrap();
        let xw = graph.matmul(x, w).unwrap();
        let y = graph.add(xw, b).unwrap();
        (graph, x, w, y)
    }

    #[test]
    fn test_run_affine() {
        let (graph, x, _, y) = affine_graph();
        let mut sess = GraphSession::new(graph);
        sess.initialize_all_variables().unwrap();

        let feed: FeedDict<f64> = FeedDict::from([(x, Tensor::from([[1.0, 2.0], [3.0, 4.0]]))]);
        let out = sess.run(&[y], &feed).unwrap();
        assert_eq!(out, vec![Tensor::new(vec![3.5, 7.5], vec![2, 1])]);
    }

    #[test]
    fn test_unfed_placeholder() {
        let (graph, _, _, y) = affine_graph();
        let mut sess = GraphSession::new(graph);
        sess.initialize_all_variables().unwrap();

        let err = sess.run(&[y], &FeedDict::new()).unwrap_err();
        assert!(matches!(err, RuntimeError::UnfedPlaceholder(name) if name == "x"));
    }

    #[test]
    fn test_uninitialized_variable() {
        let (graph, _, w, _) = affine_graph();
        let mut sess = GraphSession::new(graph);
        let err = sess.run(&[w], &FeedDict::new()).unwrap_err();
        assert!(matches!(err, RuntimeError::UninitializedVariable(name) if name == "w"));
    }

    #[test]
    fn test_assign_checks_shape() {
        let (graph, _, _, _) = affine_graph();
        let mut sess = GraphSession::new(graph);
        assert!(sess.assign("w", Tensor::zeros(vec![2, 1])).is_ok());
        assert!(matches!(
            sess.assign("w", Tensor::zeros(vec![1, 2])),
            Err(RuntimeError::VariableShape { .. })
        ));
        assert!(matches!(
            sess.assign("nope", Tensor::zeros(vec![1])),
            Err(RuntimeError::UnknownVariable(_))
        ));
        assert_eq!(sess.variables().len(), 1);
        assert_eq!(sess.variable_names(), vec!["w".to_string(), "b".to_string()]);
        assert_eq!(sess.variable_shape("b"), Some(vec![1, 1]));
        assert_eq!(sess.variable_shape("nope"), None);
    }
}
