use thiserror::Error;

use crate::runtime::RuntimeError;
use crate::tensor::ShapeError;

pub type Result<T> = core::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("`{0}` must be overridden by the model")]
    NotImplemented(&'static str),
    #[error("model info has no `{0}` entry")]
    MissingModelInfo(&'static str),
    #[error("expected a value at fetch index {index}, got {got} fetched values")]
    MissingFetch { index: usize, got: usize },
    #[error("fetch {0} does not hold a single element")]
    NonScalarFetch(usize),
    #[error("dataset error: {0}")]
    Dataset(String),
    #[error("invalid config: {0}")]
    Config(String),
    #[error(transparent)]
    Runtime(#[from] RuntimeError),
    #[error(transparent)]
    Shape(#[from] ShapeError),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}
