use rand::Rng;
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};

use super::error::{Result, RuntimeError};
use crate::tensor::{Numeric, Tensor};

/// Handle to a node of a [`Graph`]. Only meaningful for the graph that issued it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(pub(crate) usize);

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Initializer {
    Zeros,
    Constant(f64),
    Normal { mean: f64, std_dev: f64 },
}

impl Initializer {
    pub fn sample<T, R>(&self, shape: &[usize], rng: &mut R) -> Result<Tensor<T>>
    where
        T: Numeric,
        R: Rng + ?Sized,
    {
        match *self {
            Initializer::Zeros => Ok(Tensor::zeros(shape.to_vec())),
            Initializer::Constant(value) => {
                Ok(Tensor::new_with_filler(shape.to_vec(), T::from_f64(value)))
            }
            Initializer::Normal { mean, std_dev } => {
                if !mean.is_finite() || !(std_dev >= 0.0) {
                    return Err(RuntimeError::Initializer(format!(
                        "normal initializer needs a finite mean and a non-negative std_dev, \
                         got mean={mean} std_dev={std_dev}"
                    )));
                }
                let normal = Normal::new(mean, std_dev)
                    .map_err(|e| RuntimeError::Initializer(e.to_string()))?;
                let total = shape.iter().product::<usize>();
                let array = (0..total)
                    .map(|_| T::from_f64(normal.sample(&mut *rng)))
                    .collect();
                Ok(Tensor::new(array, shape.to_vec()))
            }
        }
    }
}

#[derive(Debug, Clone)]
pub enum Op<T: Numeric> {
    Placeholder {
        name: String,
    },
    Constant(Tensor<T>),
    Variable {
        name: String,
        shape: Vec<usize>,
        init: Initializer,
    },
    MatMul(NodeId, NodeId),
    /// The right operand may be broadcast over the rows of the left one.
    Add(NodeId, NodeId),
    Sub(NodeId, NodeId),
    Mul(NodeId, NodeId),
    Tanh(NodeId),
    Relu(NodeId),
    Square(NodeId),
    /// Mean over every element, producing a scalar.
    Mean(NodeId),
    /// One gradient descent step on every variable `loss` depends on.
    Minimize {
        loss: NodeId,
        learning_rate: T,
    },
}

impl<T: Numeric> Op<T> {
    pub fn inputs(&self) -> Vec<NodeId> {
        match *self {
            Op::Placeholder { .. } | Op::Constant(_) | Op::Variable { .. } => vec![],
            Op::MatMul(a, b) | Op::Add(a, b) | Op::Sub(a, b) | Op::Mul(a, b) => vec![a, b],
            Op::Tanh(a) | Op::Relu(a) | Op::Square(a) | Op::Mean(a) => vec![a],
            Op::Minimize { loss, .. } => vec![loss],
        }
    }
}

/// Append-only list of ops. Inputs always precede the nodes that use them.
#[derive(Debug, Clone)]
pub struct Graph<T: Numeric> {
    nodes: Vec<Op<T>>,
}

impl<T: Numeric> Default for Graph<T> {
    fn default() -> Self {
        Graph { nodes: Vec::new() }
    }
}

impl<T: Numeric> Graph<T> {
    pub fn new() -> Graph<T> {
        Graph::default()
    }

    pub fn op(&self, id: NodeId) -> Result<&Op<T>> {
        self.nodes.get(id.0).ok_or(RuntimeError::UnknownNode(id))
    }

    fn push(&mut self, op: Op<T>) -> Result<NodeId> {
        for input in op.inputs() {
            self.op(input)?;
        }
        self.nodes.push(op);
        Ok(NodeId(self.nodes.len() - 1))
    }

    pub fn placeholder(&mut self, name: &str) -> NodeId {
        self.nodes.push(Op::Placeholder {
            name: name.to_string(),
        });
        NodeId(self.nodes.len() - 1)
    }

    pub fn constant(&mut self, value: Tensor<T>) -> NodeId {
        self.nodes.push(Op::Constant(value));
        NodeId(self.nodes.len() - 1)
    }

    pub fn variable(&mut self, name: &str, shape: Vec<usize>, init: Initializer) -> Result<NodeId> {
        if self.find_variable(name).is_some() {
            return Err(RuntimeError::DuplicateVariable(name.to_string()));
        }
        self.push(Op::Variable {
            name: name.to_string(),
            shape,
            init,
        })
    }

    pub fn matmul(&mut self, a: NodeId, b: NodeId) -> Result<NodeId> {
        self.push(Op::MatMul(a, b))
    }

    pub fn add(&mut self, a: NodeId, b: NodeId) -> Result<NodeId> {
        self.push(Op::Add(a, b))
    }

    pub fn sub(&mut self, a: NodeId, b: NodeId) -> Result<NodeId> {
        self.push(Op::Sub(a, b))
    }

    pub fn mul(&mut self, a: NodeId, b: NodeId) -> Result<NodeId> {
        self.push(Op::Mul(a, b))
    }

    pub fn tanh(&mut self, a: NodeId) -> Result<NodeId> {
        self.push(Op::Tanh(a))
    }

    pub fn relu(&mut self, a: NodeId) -> Result<NodeId> {
        self.push(Op::Relu(a))
    }

    pub fn square(&mut self, a: NodeId) -> Result<NodeId> {
        self.push(Op::Square(a))
    }

    pub fn mean(&mut self, a: NodeId) -> Result<NodeId> {
        self.push(Op::Mean(a))
    }

    pub fn minimize(&mut self, loss: NodeId, learning_rate: f64) -> Result<NodeId> {
        self.push(Op::Minimize {
            loss,
            learning_rate: T::from_f64(learning_rate),
        })
    }

    /// Every variable node with its name and declared shape, in creation order.
    pub fn variables(&self) -> impl Iterator<Item = (NodeId, &str, &[usize])> + '_ {
        self.nodes.iter().enumerate().filter_map(|(i, op)| match op {
            Op::Variable { name, shape, .. } => Some((NodeId(i), name.as_str(), shape.as_slice())),
            _ => None,
        })
    }

    pub fn find_variable(&self, name: &str) -> Option<NodeId> {
        self.variables()
            .find(|(_, var_name, _)| *var_name == name)
            .map(|(id, _, _)| id)
    }
}

#[test]
fn test_duplicate_variable() {
    let mut graph = Graph::<f32>::new();
    graph.variable("w", vec![2, 2], Initializer::Zeros).unwrap();
    let err = graph.variable("w", vec![1], Initializer::Zeros).unwrap_err();
    assert!(matches!(err, RuntimeError::DuplicateVariable(name) if name == "w"));
}

#[test]
fn test_unknown_input() {
    let mut graph = Graph::<f32>::new();
    let x = graph.placeholder("x");
    assert!(graph.tanh(x).is_ok());
    assert!(matches!(
        graph.tanh(NodeId(17)),
        Err(RuntimeError::UnknownNode(NodeId(17)))
    ));
}

#[test]
fn test_normal_initializer() {
    use rand::SeedableRng;

    let mut rng = rand::rngs::StdRng::seed_from_u64(42);
    let init = Initializer::Normal {
        mean: 0.0,
        std_dev: 0.1,
    };
    let sample: Tensor<f64> = init.sample(&[64, 64], &mut rng).unwrap();
    assert_eq!(sample.shape(), &[64, 64]);
    assert!(sample.mean().abs() < 0.01, "mean={}", sample.mean());

    let bad = Initializer::Normal {
        mean: 0.0,
        std_dev: -1.0,
    };
    assert!(matches!(
        bad.sample::<f64, _>(&[1], &mut rng),
        Err(RuntimeError::Initializer(_))
    ));
    let bad = Initializer::Normal {
        mean: f64::NAN,
        std_dev: 1.0,
    };
    assert!(bad.sample::<f64, _>(&[1], &mut rng).is_err());
    let degenerate = Initializer::Normal {
        mean: 2.0,
        std_dev: 0.0,
    };
    let sample: Tensor<f64> = degenerate.sample(&[3], &mut rng).unwrap();
    assert_eq!(sample.array(), &[2.0, 2.0, 2.0]);
}
