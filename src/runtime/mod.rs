//! A small dataflow runtime: build a [`Graph`], hand it to a [`GraphSession`], then `run`
//! fetches against a feed.

mod error;
mod gradients;
mod graph;
mod saver;
mod session;

use std::collections::HashMap;

use crate::tensor::Tensor;

pub use error::{Result, RuntimeError};
pub use graph::*;
pub use saver::*;
pub use session::*;

/// Nodes whose values a run should hand back.
pub type Fetches = Vec<NodeId>;

/// Values supplied for placeholders (or overriding any other node) for one run.
pub type FeedDict<T> = HashMap<NodeId, Tensor<T>>;
