use thiserror::Error;

use super::NodeId;
use crate::tensor::ShapeError;

pub type Result<T> = core::result::Result<T, RuntimeError>;

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("unknown node {0:?}")]
    UnknownNode(NodeId),
    #[error("placeholder `{0}` must be fed")]
    UnfedPlaceholder(String),
    #[error("variable `{0}` is not initialized")]
    UninitializedVariable(String),
    #[error("unknown variable `{0}`")]
    UnknownVariable(String),
    #[error("variable `{0}` already exists")]
    DuplicateVariable(String),
    #[error("variable `{name}` has shape {expected:?}, got {got:?}")]
    VariableShape {
        name: String,
        expected: Vec<usize>,
        got: Vec<usize>,
    },
    #[error(transparent)]
    Shape(#[from] ShapeError),
    #[error("loss must hold a single element, got shape {0:?}")]
    NonScalarLoss(Vec<usize>),
    #[error("node {0:?} cannot be differentiated")]
    NotDifferentiable(NodeId),
    #[error("no value computed for node {0:?}")]
    MissingValue(NodeId),
    #[error("invalid initializer: {0}")]
    Initializer(String),
    #[error("checkpoint is missing variable `{0}`")]
    MissingVariable(String),
    #[error("unsupported checkpoint format version {0}")]
    CheckpointVersion(u32),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
}
